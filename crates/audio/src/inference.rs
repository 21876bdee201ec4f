use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};

use dabtag_domain::{BatchConfig, DomainError, FailureReason, RawScoreMatrix};

/// Windowing parameters handed to the model for every track of a batch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WindowSpec {
    pub model: String,
    pub length_seconds: f64,
    pub overlap: f64,
}

impl WindowSpec {
    pub fn from_config(config: &BatchConfig) -> Self {
        Self {
            model: config.model.clone(),
            length_seconds: config.window_seconds,
            overlap: config.overlap,
        }
    }
}

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("failed to launch {program:?}: {source}")]
    Launch {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("inference helper exited with {status}: {stderr}")]
    Exit { status: String, stderr: String },
    #[error("malformed inference output: {0}")]
    Decode(String),
    #[error("tag length mismatch: {tags} tag names but rows of width {width}")]
    ShapeMismatch { tags: usize, width: usize },
    #[error("{0}")]
    Other(String),
}

impl From<DomainError> for InferenceError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::ShapeMismatch { tags, width } => Self::ShapeMismatch { tags, width },
            other => Self::Decode(other.to_string()),
        }
    }
}

impl From<InferenceError> for FailureReason {
    fn from(err: InferenceError) -> Self {
        match err {
            InferenceError::ShapeMismatch { tags, width } => {
                FailureReason::ShapeMismatch { tags, width }
            }
            other => FailureReason::Inference(other.to_string()),
        }
    }
}

/// Black-box tagging model: one call per track, one score row per window.
///
/// Implementations are driven from a single worker and need not support
/// concurrent calls.
pub trait TagInference: Send + Sync {
    fn infer(&self, path: &Path, window: &WindowSpec) -> Result<RawScoreMatrix, InferenceError>;
}

/// Runs an external helper that prints `{"tags": [..], "scores": [[..], ..]}`.
pub struct CommandInference {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandInference {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl TagInference for CommandInference {
    #[instrument(skip(self, window), fields(model = %window.model))]
    fn infer(&self, path: &Path, window: &WindowSpec) -> Result<RawScoreMatrix, InferenceError> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg("--model")
            .arg(&window.model)
            .arg("--input-length")
            .arg(window.length_seconds.to_string())
            .arg("--input-overlap")
            .arg(window.overlap.to_string())
            .arg(path)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| InferenceError::Launch {
                program: self.program.clone(),
                source,
            })?;
        if !output.status.success() {
            return Err(InferenceError::Exit {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        let matrix = parse_output(&output.stdout)?;
        debug!(
            windows = matrix.num_windows(),
            tags = matrix.num_tags(),
            "inference finished"
        );
        Ok(matrix)
    }
}

#[derive(Debug, Deserialize)]
struct HelperOutput {
    tags: Vec<String>,
    scores: Vec<Vec<f32>>,
}

pub fn parse_output(stdout: &[u8]) -> Result<RawScoreMatrix, InferenceError> {
    let output: HelperOutput =
        serde_json::from_slice(stdout).map_err(|err| InferenceError::Decode(err.to_string()))?;
    Ok(RawScoreMatrix::from_rows(output.scores, output.tags)?)
}
