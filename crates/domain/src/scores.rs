use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::DomainError;

/// Longest ranking kept per track.
pub const MAX_RANKED_TAGS: usize = 10;
/// Ranking length with top-tags-only set, and the number of genres written to metadata.
pub const TOP_TAGS: usize = 3;

/// Per-window tag scores for one track, `[windows x tags]`.
#[derive(Clone, Debug, PartialEq)]
pub struct RawScoreMatrix {
    scores: Array2<f32>,
    tag_names: Vec<String>,
}

impl RawScoreMatrix {
    /// Pairs a score array with its vocabulary without checking the shape;
    /// see [`RawScoreMatrix::validate`].
    pub fn new(scores: Array2<f32>, tag_names: Vec<String>) -> Self {
        Self { scores, tag_names }
    }

    pub fn from_rows(rows: Vec<Vec<f32>>, tag_names: Vec<String>) -> Result<Self, DomainError> {
        let tags = tag_names.len();
        if let Some(row) = rows.iter().find(|row| row.len() != tags) {
            return Err(DomainError::ShapeMismatch {
                tags,
                width: row.len(),
            });
        }
        let windows = rows.len();
        let flat: Vec<f32> = rows.into_iter().flatten().collect();
        let scores = Array2::from_shape_vec((windows, tags), flat)
            .map_err(|err| DomainError::Serialization(err.to_string()))?;
        Ok(Self { scores, tag_names })
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.scores.ncols() != self.tag_names.len() {
            return Err(DomainError::ShapeMismatch {
                tags: self.tag_names.len(),
                width: self.scores.ncols(),
            });
        }
        if self.scores.nrows() == 0 {
            return Err(DomainError::validation("score matrix has no windows"));
        }
        Ok(())
    }

    pub fn scores(&self) -> &Array2<f32> {
        &self.scores
    }

    pub fn tag_names(&self) -> &[String] {
        &self.tag_names
    }

    pub fn num_windows(&self) -> usize {
        self.scores.nrows()
    }

    pub fn num_tags(&self) -> usize {
        self.tag_names.len()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TagScore {
    pub tag: String,
    pub score: f32,
}

impl TagScore {
    pub fn new(tag: impl Into<String>, score: f32) -> Self {
        Self {
            tag: tag.into(),
            score,
        }
    }
}

/// Tags of one track, highest score first.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct RankedTagList(Vec<TagScore>);

impl RankedTagList {
    pub fn new(entries: Vec<TagScore>) -> Self {
        Self(entries)
    }

    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn entries(&self) -> &[TagScore] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &TagScore> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn top(&self, count: usize) -> &[TagScore] {
        &self.0[..count.min(self.0.len())]
    }

    pub fn tag_names(&self, count: usize) -> Vec<String> {
        self.top(count).iter().map(|entry| entry.tag.clone()).collect()
    }
}
