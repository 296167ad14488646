//! Per-file outcomes and the aggregate report of a synchronization run

use std::fmt;

/// What happened to a single manifest file during a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The local copy passed the integrity check and was not fetched
    Skipped,
    /// Fetched and written as served
    Downloaded,
    /// Fetched, written and replaced by its decompressed payload
    Decompressed,
    /// No mirror answered with 200; carries the last status received, if any
    DownloadFailed { last_status: Option<u16> },
    /// Fetched and written, but the payload could not be decompressed. The
    /// compressed bytes stay on disk.
    DecompressionFailed { reason: String },
    /// Fetched, but the body could not be written to the destination
    WriteFailed { reason: String },
}

impl FetchOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            FetchOutcome::DownloadFailed { .. }
                | FetchOutcome::DecompressionFailed { .. }
                | FetchOutcome::WriteFailed { .. }
        )
    }
}

impl fmt::Display for FetchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchOutcome::Skipped => write!(f, "verified locally"),
            FetchOutcome::Downloaded => write!(f, "downloaded"),
            FetchOutcome::Decompressed => write!(f, "downloaded and decompressed"),
            FetchOutcome::DownloadFailed {
                last_status: Some(status),
            } => write!(f, "download failed with status {}", status),
            FetchOutcome::DownloadFailed { last_status: None } => {
                write!(f, "download failed: no mirror reachable")
            }
            FetchOutcome::DecompressionFailed { reason } => {
                write!(f, "decompression failed: {}", reason)
            }
            FetchOutcome::WriteFailed { reason } => write!(f, "write failed: {}", reason),
        }
    }
}

/// Outcome of one file, keyed by its POSIX path relative to the destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRecord {
    pub path: String,
    pub outcome: FetchOutcome,
}

impl FetchRecord {
    pub fn new<P: Into<String>>(path: P, outcome: FetchOutcome) -> Self {
        Self {
            path: path.into(),
            outcome,
        }
    }
}

/// Counts of each outcome kind in a report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutcomeCounts {
    pub skipped: usize,
    pub downloaded: usize,
    pub decompressed: usize,
    pub download_failed: usize,
    pub decompression_failed: usize,
    pub write_failed: usize,
}

impl OutcomeCounts {
    pub fn failed(&self) -> usize {
        self.download_failed + self.decompression_failed + self.write_failed
    }

    /// Files that ended up freshly written, decompressed or not
    pub fn fetched(&self) -> usize {
        self.downloaded + self.decompressed + self.decompression_failed
    }

    pub fn total(&self) -> usize {
        self.skipped + self.downloaded + self.decompressed + self.failed()
    }
}

/// Aggregate result of a synchronization run
///
/// Records arrive in completion order, which is unspecified across
/// concurrent workers; within one batch they follow manifest order.
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    pub records: Vec<FetchRecord>,
    /// Set when the run was aborted before every batch was processed
    pub aborted: bool,
    /// Workers that terminated abnormally; their unreported files have no record
    pub crashed_workers: usize,
}

impl SyncReport {
    pub fn counts(&self) -> OutcomeCounts {
        let mut counts = OutcomeCounts::default();
        for record in &self.records {
            match record.outcome {
                FetchOutcome::Skipped => counts.skipped += 1,
                FetchOutcome::Downloaded => counts.downloaded += 1,
                FetchOutcome::Decompressed => counts.decompressed += 1,
                FetchOutcome::DownloadFailed { .. } => counts.download_failed += 1,
                FetchOutcome::DecompressionFailed { .. } => counts.decompression_failed += 1,
                FetchOutcome::WriteFailed { .. } => counts.write_failed += 1,
            }
        }
        counts
    }

    /// Records of files that did not end in a usable state
    pub fn failures(&self) -> impl Iterator<Item = &FetchRecord> {
        self.records.iter().filter(|record| record.outcome.is_failure())
    }

    /// Outcome recorded for `path`, if the file was reached at all
    pub fn outcome_of(&self, path: &str) -> Option<&FetchOutcome> {
        self.records
            .iter()
            .find(|record| record.path == path)
            .map(|record| &record.outcome)
    }

    /// True when the whole tree was processed without a single failure
    pub fn is_success(&self) -> bool {
        !self.aborted && self.crashed_workers == 0 && self.failures().next().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_and_failures() {
        let report = SyncReport {
            records: vec![
                FetchRecord::new("a.csv", FetchOutcome::Decompressed),
                FetchRecord::new("b.sc", FetchOutcome::Downloaded),
                FetchRecord::new("c.sc", FetchOutcome::Skipped),
                FetchRecord::new("d.sc", FetchOutcome::DownloadFailed { last_status: Some(404) }),
                FetchRecord::new(
                    "e.csv",
                    FetchOutcome::DecompressionFailed {
                        reason: "bad header".into(),
                    },
                ),
            ],
            ..Default::default()
        };

        let counts = report.counts();
        assert_eq!(counts.skipped, 1);
        assert_eq!(counts.downloaded, 1);
        assert_eq!(counts.decompressed, 1);
        assert_eq!(counts.download_failed, 1);
        assert_eq!(counts.decompression_failed, 1);
        assert_eq!(counts.failed(), 2);
        assert_eq!(counts.fetched(), 3);
        assert_eq!(counts.total(), 5);

        let failed: Vec<_> = report.failures().map(|r| r.path.as_str()).collect();
        assert_eq!(failed, vec!["d.sc", "e.csv"]);
        assert!(!report.is_success());
        assert_eq!(report.outcome_of("c.sc"), Some(&FetchOutcome::Skipped));
        assert_eq!(report.outcome_of("missing"), None);
    }

    #[test]
    fn test_outcome_display() {
        let outcome = FetchOutcome::DownloadFailed { last_status: Some(503) };
        assert_eq!(outcome.to_string(), "download failed with status 503");
        let outcome = FetchOutcome::DownloadFailed { last_status: None };
        assert!(outcome.to_string().contains("no mirror reachable"));
    }

    #[test]
    fn test_empty_report_is_success() {
        assert!(SyncReport::default().is_success());
        let aborted = SyncReport {
            aborted: true,
            ..Default::default()
        };
        assert!(!aborted.is_success());
    }
}
