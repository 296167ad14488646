//! Asset Sync Library
//!
//! This library keeps a local directory in step with a remote,
//! content-addressed asset store. It reads the store's manifest, checks
//! which local files can be trusted, and downloads the rest from a list of
//! mirrors with a bounded pool of workers, unpacking compressed tables on
//! the way.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use assetsync::{
//!     ConsoleProgressReporter, Fingerprint, IntoProgressCallback, MirrorSet,
//!     Orchestrator, StrictLevel, SyncConfig,
//! };
//! use std::path::Path;
//!
//! # async fn example() -> assetsync::Result<()> {
//! // Read the manifest and turn it into a tree
//! let fingerprint = Fingerprint::load("fingerprint.json").await?;
//! let tree = fingerprint.to_tree()?.with_unlisted_items();
//!
//! // Mirrors serve the build under the fingerprint's content identifier
//! let mirrors = MirrorSet::new(
//!     ["https://game-assets.example.com", "https://mirror.example.com"],
//!     fingerprint.content_id(),
//! )?;
//!
//! // Verify existing files by digest before fetching them again
//! let config = SyncConfig::builder()
//!     .strict_level(StrictLevel::Digest)
//!     .max_concurrent_workers(8)
//!     .build()?;
//!
//! let orchestrator = Orchestrator::new(config, mirrors)?
//!     .with_progress(ConsoleProgressReporter::new(false).into_callback());
//! let report = orchestrator.synchronize(&tree, Path::new("assets")).await?;
//!
//! for failure in report.failures() {
//!     eprintln!("{}: {}", failure.path, failure.outcome);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - **Mirror fallback**: every file is tried on each mirror in order
//! - **Integrity levels**: always fetch, trust present files, or verify SHA-1 digests
//! - **Bounded concurrency**: a fixed number of workers, one directory batch each
//! - **Cooperative abort**: stop dispatching and drain running workers
//! - **Table decompression**: SC containers with zstd or LZMA payloads
//! - **Binary reader**: big-endian integers, strings and rearranged varints

pub mod config;
pub mod core;
pub mod decompress;
pub mod fingerprint;
pub mod reader;
pub mod sync;
pub mod transport;

// Re-export commonly used types for convenience
pub use config::{MirrorSet, StrictLevel, SyncConfig, SyncConfigBuilder};
pub use crate::core::{
    AssetNode, AssetTree, Batch, ConsoleProgressReporter, FetchOutcome, FetchRecord, Group,
    IntoProgressCallback, Leaf, NullProgressReporter, OutcomeCounts, ProgressCallback,
    ProgressReporter, Result, SyncError, SyncEvent, SyncReport,
};
pub use decompress::{DecompressError, Decompressor, ScDecompressor};
pub use fingerprint::{Fingerprint, FingerprintFile};
pub use reader::{ByteReader, ReadError};
pub use sync::{AbortHandle, Orchestrator};
pub use transport::{HttpTransport, Transport, TransportResponse};
