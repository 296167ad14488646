//! Configuration types for synchronization runs

use crate::core::error::{Result, SyncError};
use std::time::Duration;

/// How far local files are trusted before they are fetched again
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StrictLevel {
    /// Always fetch every file
    #[default]
    Off = 0,
    /// Keep files that exist locally and have a published hash, without
    /// reading them
    Presence = 1,
    /// Keep files whose SHA-1 digest equals the published hash
    Digest = 2,
}

impl TryFrom<u8> for StrictLevel {
    type Error = SyncError;

    fn try_from(level: u8) -> Result<Self> {
        match level {
            0 => Ok(StrictLevel::Off),
            1 => Ok(StrictLevel::Presence),
            2 => Ok(StrictLevel::Digest),
            other => Err(SyncError::Configuration {
                message: format!("strict level must be 0, 1 or 2, got {}", other),
                field: Some("strict_level".to_string()),
                suggestion: Some("Use 0 to always fetch, 1 to trust existing files, 2 to verify digests".to_string()),
            }),
        }
    }
}

/// The mirrors serving one build of the asset store
///
/// Every mirror serves identical content under the same content identifier,
/// so a file is addressed as `{mirror}/{content_id}/{path}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorSet {
    mirrors: Vec<String>,
    content_id: String,
}

impl MirrorSet {
    /// Validate the mirror base URLs and pair them with a content identifier.
    ///
    /// Mirrors keep their order; it is the order they are tried in.
    pub fn new<I, S, C>(mirrors: I, content_id: C) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        C: Into<String>,
    {
        let mut validated = Vec::new();
        for mirror in mirrors {
            let mirror = mirror.into();
            url::Url::parse(&mirror).map_err(|source| {
                let mut error = SyncError::from(source);
                if let SyncError::InvalidUrl { url, .. } = &mut error {
                    *url = mirror.clone();
                }
                error
            })?;
            validated.push(mirror.trim_end_matches('/').to_string());
        }

        if validated.is_empty() {
            return Err(SyncError::Configuration {
                message: "at least one mirror URL is required".to_string(),
                field: Some("mirrors".to_string()),
                suggestion: None,
            });
        }

        let content_id = content_id.into();
        if content_id.is_empty() {
            return Err(SyncError::Configuration {
                message: "content identifier must not be empty".to_string(),
                field: Some("content_id".to_string()),
                suggestion: Some("Use the `sha` field of the fingerprint".to_string()),
            });
        }

        Ok(Self {
            mirrors: validated,
            content_id,
        })
    }

    pub fn mirrors(&self) -> &[String] {
        &self.mirrors
    }

    pub fn content_id(&self) -> &str {
        &self.content_id
    }

    /// URLs for `relative_path`, one per mirror, in the order to try them
    pub fn urls_for<'a>(&'a self, relative_path: &'a str) -> impl Iterator<Item = String> + 'a {
        self.mirrors
            .iter()
            .map(move |mirror| format!("{}/{}/{}", mirror, self.content_id, relative_path))
    }
}

/// Configuration for synchronization runs
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Maximum number of workers running at once
    pub max_concurrent_workers: usize,
    /// Maximum number of files handed to one worker
    pub max_batch_size: usize,
    pub strict_level: StrictLevel,
    /// File extensions (without the dot) whose payload is decompressed after download
    pub decompress_extensions: Vec<String>,
    /// Timeout for a single request made by the default HTTP transport
    pub timeout: Duration,
    pub user_agent: String,
}

impl SyncConfig {
    pub fn builder() -> SyncConfigBuilder {
        SyncConfigBuilder::new()
    }

    /// Reject settings the orchestrator cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent_workers == 0 {
            return Err(SyncError::Configuration {
                message: "max_concurrent_workers must be at least 1".to_string(),
                field: Some("max_concurrent_workers".to_string()),
                suggestion: Some("Use 1 for strictly sequential downloads".to_string()),
            });
        }
        if self.max_batch_size == 0 {
            return Err(SyncError::Configuration {
                message: "max_batch_size must be at least 1".to_string(),
                field: Some("max_batch_size".to_string()),
                suggestion: None,
            });
        }
        Ok(())
    }

    /// Whether a file at `relative_path` should be decompressed after download
    pub fn should_decompress(&self, relative_path: &str) -> bool {
        let file_name = relative_path.rsplit('/').next().unwrap_or(relative_path);
        match file_name.rsplit_once('.') {
            Some((stem, extension)) if !stem.is_empty() => self
                .decompress_extensions
                .iter()
                .any(|candidate| candidate.eq_ignore_ascii_case(extension)),
            _ => false,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_concurrent_workers: 8,
            max_batch_size: 50,
            strict_level: StrictLevel::Off,
            decompress_extensions: vec!["csv".to_string(), "toml".to_string()],
            timeout: Duration::from_secs(30),
            user_agent: format!("assetsync/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Builder for [`SyncConfig`]
#[derive(Debug, Clone, Default)]
pub struct SyncConfigBuilder {
    config: SyncConfig,
}

impl SyncConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_concurrent_workers(mut self, workers: usize) -> Self {
        self.config.max_concurrent_workers = workers;
        self
    }

    pub fn max_batch_size(mut self, size: usize) -> Self {
        self.config.max_batch_size = size;
        self
    }

    pub fn strict_level(mut self, level: StrictLevel) -> Self {
        self.config.strict_level = level;
        self
    }

    /// Replace the set of decompressed extensions
    pub fn decompress_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.decompress_extensions = extensions
            .into_iter()
            .map(|ext| ext.into().trim_start_matches('.').to_string())
            .collect();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn user_agent<S: Into<String>>(mut self, user_agent: S) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Validate and return the configuration
    pub fn build(self) -> Result<SyncConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
