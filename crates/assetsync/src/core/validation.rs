//! Local integrity checks that decide whether a file needs fetching

use crate::config::StrictLevel;
use crate::core::error::{FileOperation, Result, SyncError};
use crate::core::tree::Leaf;
use sha1::{Digest, Sha1};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tokio::fs;
use tracing::debug;

/// Buffer size for reading files during digest calculation (64KB).
const BUFFER_SIZE: usize = 64 * 1024;

/// Calculate the SHA-1 digest of a file as lowercase hex.
///
/// Hashing runs on the blocking thread pool.
pub async fn file_digest<P: AsRef<Path>>(path: P) -> Result<String> {
    let path = path.as_ref().to_path_buf();
    let task_path = path.clone();

    tokio::task::spawn_blocking(move || digest_blocking(&task_path))
        .await
        .map_err(|e| {
            SyncError::file_system(path, FileOperation::Read, std::io::Error::other(e))
        })?
}

fn digest_blocking(path: &Path) -> Result<String> {
    let mut file =
        File::open(path).map_err(|e| SyncError::file_system(path, FileOperation::Read, e))?;

    let mut hasher = Sha1::new();
    let mut buffer = vec![0u8; BUFFER_SIZE];

    loop {
        let bytes_read = file
            .read(&mut buffer)
            .map_err(|e| SyncError::file_system(path, FileOperation::Read, e))?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Decide whether the local copy of `leaf` at `path` can be trusted.
///
/// - [`StrictLevel::Off`]: never trusted.
/// - [`StrictLevel::Presence`]: trusted when the file exists and the manifest
///   publishes a hash for it. The content is not inspected, so a corrupt or
///   stale file with a listed hash is kept.
/// - [`StrictLevel::Digest`]: additionally the file's SHA-1 must equal the
///   published hash exactly. A file that cannot be read counts as a mismatch.
pub async fn is_up_to_date(leaf: &Leaf, path: &Path, level: StrictLevel) -> bool {
    if level == StrictLevel::Off {
        return false;
    }

    let exists = match fs::try_exists(path).await {
        Ok(exists) => exists,
        Err(e) => {
            SyncError::file_system(path, FileOperation::Metadata, e).log("Refetching");
            false
        }
    };
    if !exists || !leaf.has_hash() {
        return false;
    }

    if level < StrictLevel::Digest {
        return true;
    }

    match file_digest(path).await {
        Ok(actual) => {
            let matches = actual == leaf.expected_hash;
            debug!(
                "SHA-1 check for {}: expected={}, actual={}, passed={}",
                path.display(),
                leaf.expected_hash,
                actual,
                matches
            );
            matches
        }
        Err(e) => {
            e.log("Could not hash local copy, refetching");
            false
        }
    }
}
