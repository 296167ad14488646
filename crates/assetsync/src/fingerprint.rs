//! `fingerprint.json` manifest parsing
//!
//! The fingerprint lists every file of a build with its SHA-1 and carries the
//! content identifier (`sha`) that mirrors serve the build under.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::error::{FileOperation, Result, SyncError};
use crate::core::tree::{AssetNode, AssetTree, Group, Leaf};

/// One file entry of a fingerprint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FingerprintFile {
    /// POSIX path relative to the build root
    pub file: String,
    #[serde(default)]
    pub sha: String,
}

/// A parsed `fingerprint.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint {
    pub files: Vec<FingerprintFile>,
    /// Content identifier of the build
    pub sha: String,
    #[serde(default)]
    pub version: String,
}

impl Fingerprint {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| SyncError::file_system(path, FileOperation::Read, e))?;
        let fingerprint = Self::from_slice(&bytes)?;
        debug!(
            "Loaded fingerprint {} (version {}, {} files)",
            fingerprint.sha,
            fingerprint.version,
            fingerprint.files.len()
        );
        Ok(fingerprint)
    }

    pub fn content_id(&self) -> &str {
        &self.sha
    }

    /// Build the asset tree described by this fingerprint
    pub fn to_tree(&self) -> Result<AssetTree> {
        AssetTree::from_fingerprint(self)
    }
}

impl AssetTree {
    /// Nest the fingerprint's files by their `/`-separated paths.
    ///
    /// Groups and leaves keep the order in which they first appear.
    pub fn from_fingerprint(fingerprint: &Fingerprint) -> Result<Self> {
        let mut root = Group::new("");

        for entry in &fingerprint.files {
            let mut segments: Vec<&str> = entry.file.split('/').collect();
            let name = segments.pop().unwrap_or_default();

            let bad_segment = |s: &str| s.is_empty() || s == "." || s == "..";
            if bad_segment(name) || segments.iter().any(|s| bad_segment(s)) {
                return Err(SyncError::Manifest {
                    message: format!("invalid file path '{}'", entry.file),
                    source: None,
                });
            }

            let mut group = &mut root;
            for segment in segments {
                group = group.group_mut(segment);
            }
            group
                .children
                .push(AssetNode::Leaf(Leaf::new(name, entry.sha.to_ascii_lowercase())));
        }

        Ok(AssetTree::new(root))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "files": [
            {"file": "csv_logic/buildings.csv", "sha": "AA11"},
            {"file": "sc/ui.sc", "sha": "bb22"},
            {"file": "csv_logic/characters.csv", "sha": "cc33"},
            {"file": "logic.toml", "sha": "dd44"},
            {"file": "sc/effects/fx.sc", "sha": "ee55"}
        ],
        "sha": "6a2b1c0f",
        "version": "15.83.7"
    }"#;

    #[test]
    fn test_parse_fingerprint() {
        let fingerprint = Fingerprint::from_json(SAMPLE).unwrap();
        assert_eq!(fingerprint.content_id(), "6a2b1c0f");
        assert_eq!(fingerprint.version, "15.83.7");
        assert_eq!(fingerprint.files.len(), 5);
    }

    #[test]
    fn test_tree_preserves_first_appearance_order() {
        let tree = Fingerprint::from_json(SAMPLE).unwrap().to_tree().unwrap();
        let root = tree.root();

        let names: Vec<_> = root.children.iter().map(AssetNode::name).collect();
        assert_eq!(names, vec!["csv_logic", "sc", "logic.toml"]);

        let csv = root.groups().next().unwrap();
        let files: Vec<_> = csv.leaves().map(|l| l.name.as_str()).collect();
        assert_eq!(files, vec!["buildings.csv", "characters.csv"]);
        assert_eq!(csv.leaves().next().unwrap().expected_hash, "aa11");

        let sc = root.groups().nth(1).unwrap();
        assert_eq!(sc.groups().next().unwrap().name, "effects");
        assert_eq!(tree.leaf_count(), 5);
    }

    #[test]
    fn test_invalid_path_rejected() {
        let json = r#"{"files": [{"file": "csv_logic/", "sha": "aa"}], "sha": "x"}"#;
        let fingerprint = Fingerprint::from_json(json).unwrap();
        assert!(matches!(fingerprint.to_tree(), Err(SyncError::Manifest { .. })));

        let json = r#"{"files": [{"file": "../escape.csv", "sha": "aa"}], "sha": "x"}"#;
        assert!(Fingerprint::from_json(json).unwrap().to_tree().is_err());
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            Fingerprint::from_json("{\"files\": 3}"),
            Err(SyncError::Manifest { source: Some(_), .. })
        ));
    }

    #[tokio::test]
    async fn test_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fingerprint.json");
        tokio::fs::write(&path, SAMPLE).await.unwrap();
        let fingerprint = Fingerprint::load(&path).await.unwrap();
        assert_eq!(fingerprint.files[1].file, "sc/ui.sc");

        let missing = Fingerprint::load(dir.path().join("missing.json")).await;
        assert!(matches!(missing, Err(SyncError::FileSystem { .. })));
    }
}
