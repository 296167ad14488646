//! Partitioning of a directory's stale files into bounded batches

use crate::core::tree::{Batch, Leaf};

/// Accumulates leaves of one directory and seals a batch each time it
/// reaches the size limit
#[derive(Debug)]
pub struct BatchBuilder {
    dir: String,
    max_batch_size: usize,
    current: Vec<Leaf>,
}

impl BatchBuilder {
    /// `max_batch_size` is clamped to at least 1
    pub fn new<D: Into<String>>(dir: D, max_batch_size: usize) -> Self {
        let max_batch_size = max_batch_size.max(1);
        Self {
            dir: dir.into(),
            max_batch_size,
            current: Vec::with_capacity(max_batch_size),
        }
    }

    /// Add a leaf; returns the sealed batch once it is full
    pub fn push(&mut self, leaf: Leaf) -> Option<Batch> {
        self.current.push(leaf);
        if self.current.len() >= self.max_batch_size {
            Some(self.seal())
        } else {
            None
        }
    }

    /// The trailing partial batch, if any leaves are left over
    pub fn finish(mut self) -> Option<Batch> {
        if self.current.is_empty() {
            None
        } else {
            Some(self.seal())
        }
    }

    fn seal(&mut self) -> Batch {
        let leaves = std::mem::replace(&mut self.current, Vec::with_capacity(self.max_batch_size));
        Batch {
            dir: self.dir.clone(),
            leaves,
        }
    }
}
