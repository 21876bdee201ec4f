use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::DomainError;

pub const DEFAULT_MODEL: &str = "MSD_musicnn";
pub const DEFAULT_WINDOW_SECONDS: f64 = 3.0;
pub const DEFAULT_OVERLAP: f64 = 0.5;
pub const DEFAULT_EXTENSIONS: &[&str] = &["mp3", "flac", "wav", "ogg"];

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    ReportOnly,
    TagOnly,
    TagAndReport,
}

impl OutputMode {
    pub fn writes_metadata(self) -> bool {
        matches!(self, OutputMode::TagOnly | OutputMode::TagAndReport)
    }

    pub fn writes_report(self) -> bool {
        matches!(self, OutputMode::ReportOnly | OutputMode::TagAndReport)
    }
}

/// Immutable settings for one batch run.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct BatchConfig {
    pub source_folder: PathBuf,
    /// Length of each analysed window in seconds.
    #[serde(default = "default_window_seconds")]
    pub window_seconds: f64,
    /// Fraction of a window shared with the previous one, in `[0, 1)`.
    #[serde(default = "default_overlap")]
    pub overlap: f64,
    pub mode: OutputMode,
    #[serde(default)]
    pub top_tags_only: bool,
    /// Where the report lands; the source folder when unset.
    #[serde(default)]
    pub report_folder: Option<PathBuf>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    #[serde(default)]
    pub recursive: bool,
}

fn default_window_seconds() -> f64 {
    DEFAULT_WINDOW_SECONDS
}

fn default_overlap() -> f64 {
    DEFAULT_OVERLAP
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_extensions() -> Vec<String> {
    DEFAULT_EXTENSIONS.iter().map(|ext| ext.to_string()).collect()
}

impl BatchConfig {
    pub fn new(source_folder: impl Into<PathBuf>, mode: OutputMode) -> Self {
        Self {
            source_folder: source_folder.into(),
            window_seconds: DEFAULT_WINDOW_SECONDS,
            overlap: DEFAULT_OVERLAP,
            mode,
            top_tags_only: false,
            report_folder: None,
            model: default_model(),
            extensions: default_extensions(),
            recursive: false,
        }
    }

    pub fn from_json(data: &str) -> Result<Self, DomainError> {
        let config: BatchConfig = serde_json::from_str(data)
            .map_err(|err| DomainError::Serialization(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_window(mut self, seconds: f64, overlap: f64) -> Self {
        self.window_seconds = seconds;
        self.overlap = overlap;
        self
    }

    pub fn with_top_tags_only(mut self, top_tags_only: bool) -> Self {
        self.top_tags_only = top_tags_only;
        self
    }

    pub fn with_report_folder(mut self, folder: impl Into<PathBuf>) -> Self {
        self.report_folder = Some(folder.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if !self.window_seconds.is_finite() || self.window_seconds <= 0.0 {
            return Err(DomainError::validation(
                "window length must be a positive number of seconds",
            ));
        }
        if !(0.0..1.0).contains(&self.overlap) {
            return Err(DomainError::validation(
                "window overlap must be at least 0 and below 1",
            ));
        }
        if self.model.trim().is_empty() {
            return Err(DomainError::validation("model identifier cannot be empty"));
        }
        if self.extensions.is_empty() {
            return Err(DomainError::validation(
                "at least one audio extension is required",
            ));
        }
        Ok(())
    }

    pub fn report_folder(&self) -> &Path {
        self.report_folder
            .as_deref()
            .unwrap_or(self.source_folder.as_path())
    }

    pub fn overlap_percent(&self) -> u32 {
        (self.overlap * 100.0).round() as u32
    }

    pub fn accepts(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                self.extensions
                    .iter()
                    .any(|known| known.trim_start_matches('.').eq_ignore_ascii_case(ext))
            })
            .unwrap_or(false)
    }
}
