//! Core types used throughout the synchronization engine
//!
//! This module contains the fundamental types that all other modules depend on.
//! By organizing these in a core module, we make the dependency relationships clear.

pub mod error;
pub mod outcome;
pub mod progress;
pub mod tree;
pub mod validation;

// Re-export main types for convenience
pub use error::{ErrorSeverity, FileOperation, Result, SyncError};
pub use outcome::{FetchOutcome, FetchRecord, OutcomeCounts, SyncReport};
pub use progress::{
    ConsoleProgressReporter, IntoProgressCallback, NullProgressReporter, ProgressCallback,
    ProgressReporter, SyncEvent,
};
pub use tree::{AssetNode, AssetTree, Batch, Group, Leaf, UNLISTED_ITEMS};
pub use validation::{file_digest, is_up_to_date};
