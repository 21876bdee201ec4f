use std::cmp::Ordering;

use ndarray::Axis;

use dabtag_domain::{DomainError, RankedTagList, RawScoreMatrix, TagScore, MAX_RANKED_TAGS, TOP_TAGS};

/// Reduces per-window scores to one ranking per track.
#[derive(Default)]
pub struct WindowAggregator;

impl WindowAggregator {
    /// Ranks tags by their mean score over all windows. Ties keep vocabulary
    /// order; NaN means rank after every number.
    pub fn aggregate(
        &self,
        matrix: &RawScoreMatrix,
        top_only: bool,
    ) -> Result<RankedTagList, DomainError> {
        matrix.validate()?;
        let means = matrix
            .scores()
            .mean_axis(Axis(0))
            .ok_or_else(|| DomainError::validation("score matrix has no windows"))?;

        let mut order: Vec<usize> = (0..means.len()).collect();
        order.sort_by(|&a, &b| descending(means[a], means[b]));

        let limit = if top_only { TOP_TAGS } else { MAX_RANKED_TAGS };
        let entries = order
            .into_iter()
            .take(limit)
            .map(|index| TagScore::new(matrix.tag_names()[index].clone(), means[index]))
            .collect();
        Ok(RankedTagList::new(entries))
    }
}

fn descending(a: f32, b: f32) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (true, true) => Ordering::Equal,
    }
}
