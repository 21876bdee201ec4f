use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::scores::RankedTagList;

/// Audio file found under the source folder at batch start.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrackCandidate {
    pub path: PathBuf,
}

impl TrackCandidate {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

#[derive(Clone, Debug, Error, Serialize, Deserialize, PartialEq)]
pub enum SkipReason {
    #[error("too short ({duration:.2}s)")]
    TooShort { duration: f64 },
    #[error("shorter than input window ({duration:.2}s < {window}s)")]
    ShorterThanWindow { duration: f64, window: f64 },
}

#[derive(Clone, Debug, Error, Serialize, Deserialize, PartialEq)]
pub enum FailureReason {
    #[error("could not read track: {0}")]
    Unreadable(String),
    #[error("inference failed: {0}")]
    Inference(String),
    #[error("tag length mismatch: {tags} tag names but rows of width {width}")]
    ShapeMismatch { tags: usize, width: usize },
    #[error("could not write genre: {0}")]
    MetadataWrite(String),
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub enum TrackOutcome {
    Success,
    Skipped(SkipReason),
    Failed(FailureReason),
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TrackResult {
    pub file_name: String,
    pub path: PathBuf,
    pub tags: RankedTagList,
    pub outcome: TrackOutcome,
    /// Set when tagging succeeded but persisting the genre did not.
    pub genre_error: Option<FailureReason>,
}

impl TrackResult {
    pub fn success(candidate: &TrackCandidate, tags: RankedTagList) -> Self {
        Self::with_outcome(candidate, tags, TrackOutcome::Success)
    }

    pub fn skipped(candidate: &TrackCandidate, reason: SkipReason) -> Self {
        Self::with_outcome(candidate, RankedTagList::empty(), TrackOutcome::Skipped(reason))
    }

    pub fn failed(candidate: &TrackCandidate, reason: FailureReason) -> Self {
        Self::with_outcome(candidate, RankedTagList::empty(), TrackOutcome::Failed(reason))
    }

    fn with_outcome(candidate: &TrackCandidate, tags: RankedTagList, outcome: TrackOutcome) -> Self {
        Self {
            file_name: candidate.file_name(),
            path: candidate.path.clone(),
            tags,
            outcome,
            genre_error: None,
        }
    }

    pub fn with_genre_error(mut self, reason: FailureReason) -> Self {
        self.genre_error = Some(reason);
        self
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, TrackOutcome::Success)
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum BatchStatus {
    Completed,
    Stopped,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct BatchSummary {
    pub status: BatchStatus,
    /// Files enumerated at batch start, including those never reached.
    pub total_files: usize,
    pub results: Vec<TrackResult>,
    pub elapsed: Duration,
    pub report_path: Option<PathBuf>,
}

impl BatchSummary {
    pub fn completed(
        total_files: usize,
        results: Vec<TrackResult>,
        elapsed: Duration,
        report_path: Option<PathBuf>,
    ) -> Self {
        Self {
            status: BatchStatus::Completed,
            total_files,
            results,
            elapsed,
            report_path,
        }
    }

    pub fn stopped(total_files: usize, results: Vec<TrackResult>, elapsed: Duration) -> Self {
        Self {
            status: BatchStatus::Stopped,
            total_files,
            results,
            elapsed,
            report_path: None,
        }
    }

    pub fn successes(&self) -> impl Iterator<Item = &TrackResult> {
        self.results.iter().filter(|result| result.is_success())
    }

    pub fn succeeded(&self) -> usize {
        self.successes().count()
    }

    pub fn skipped(&self) -> usize {
        self.results
            .iter()
            .filter(|result| matches!(result.outcome, TrackOutcome::Skipped(_)))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.results
            .iter()
            .filter(|result| matches!(result.outcome, TrackOutcome::Failed(_)))
            .count()
    }
}
