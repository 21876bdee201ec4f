pub mod config;
pub mod error;
pub mod io;
pub mod scores;
pub mod track;

pub use crate::config::{
    BatchConfig, OutputMode, DEFAULT_EXTENSIONS, DEFAULT_MODEL, DEFAULT_OVERLAP, DEFAULT_WINDOW_SECONDS,
};
pub use crate::error::DomainError;
pub use crate::io::{read_report, ReportExporter, ReportRow, XlsxReportExporter};
pub use crate::scores::{RankedTagList, RawScoreMatrix, TagScore, MAX_RANKED_TAGS, TOP_TAGS};
pub use crate::track::{
    BatchStatus, BatchSummary, FailureReason, SkipReason, TrackCandidate, TrackOutcome,
    TrackResult,
};
