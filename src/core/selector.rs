//! Track validator and selector
//!
//! Filters model-recommended IDs down to a legal, ordered selection:
//! deduplicate preserving first-seen order, keep only members of the legal
//! candidate pool, drop excluded IDs, and truncate to the requested count.
//! Underflow is never an error here; the pipeline decides what an empty
//! selection means per mode.

use std::collections::HashSet;

use tracing::warn;

use crate::core::candidates::CandidateUniverse;

/// Ordered, deduplicated, pool-validated track ID list
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidatedSelection {
    pub track_ids: Vec<i64>,
}

impl ValidatedSelection {
    pub fn is_empty(&self) -> bool {
        self.track_ids.is_empty()
    }

    pub fn len(&self) -> usize {
        self.track_ids.len()
    }
}

/// Validate recommended IDs against the legal pool and exclusion set.
///
/// The output order is the model's preference order; truncation keeps the
/// first `requested_count` survivors.
pub fn validate_selection(
    recommended: &[i64],
    pool: &CandidateUniverse,
    exclude: &HashSet<i64>,
    requested_count: usize,
) -> ValidatedSelection {
    let mut seen = HashSet::new();
    let mut dropped_unknown = 0usize;
    let mut dropped_excluded = 0usize;

    let mut track_ids = Vec::new();
    for &id in recommended {
        if !seen.insert(id) {
            continue;
        }
        if !pool.contains(id) {
            dropped_unknown += 1;
            continue;
        }
        if exclude.contains(&id) {
            dropped_excluded += 1;
            continue;
        }
        track_ids.push(id);
        if track_ids.len() == requested_count {
            break;
        }
    }

    if dropped_unknown > 0 {
        warn!(
            "model returned {} id(s) outside the candidate universe",
            dropped_unknown
        );
    }
    if dropped_excluded > 0 {
        warn!("dropped {} excluded id(s) from selection", dropped_excluded);
    }
    if track_ids.len() < requested_count {
        warn!(
            "selection underflow: {} of {} requested tracks survived filtering",
            track_ids.len(),
            requested_count
        );
    }

    ValidatedSelection { track_ids }
}

/// Emergency pick from a top-played pool: ranked order, exclusions dropped,
/// capped at the requested count. Used when history mode cannot use the
/// model output at all.
pub fn emergency_selection(
    pool: &CandidateUniverse,
    exclude: &HashSet<i64>,
    requested_count: usize,
) -> ValidatedSelection {
    let track_ids: Vec<i64> = pool
        .tracks()
        .iter()
        .map(|t| t.id)
        .filter(|id| !exclude.contains(id))
        .take(requested_count)
        .collect();

    ValidatedSelection { track_ids }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::candidates::{CandidateTrack, CandidateUniverse};

    fn universe(ids: &[i64]) -> CandidateUniverse {
        let tracks = ids
            .iter()
            .map(|&id| CandidateTrack {
                id,
                title: format!("t{}", id),
                artist_name: "artist".to_string(),
                artist_ids: vec![1],
                genres: vec![],
                mood: None,
                tempo: None,
                key: None,
                scale: None,
                danceability: None,
                energy: None,
            })
            .collect();
        CandidateUniverse::new(tracks)
    }

    #[test]
    fn test_dedup_and_unknown_drop() {
        let pool = universe(&(1..=500).collect::<Vec<_>>());
        let selection = validate_selection(&[1, 1, 999, 2], &pool, &HashSet::new(), 10);
        assert_eq!(selection.track_ids, vec![1, 2]);
    }

    #[test]
    fn test_exclusion_set_dropped() {
        let pool = universe(&[1, 2, 3, 4]);
        let exclude: HashSet<i64> = [2, 3].into_iter().collect();
        let selection = validate_selection(&[1, 2, 3, 4], &pool, &exclude, 10);
        assert_eq!(selection.track_ids, vec![1, 4]);
    }

    #[test]
    fn test_truncation_preserves_preference_order() {
        let pool = universe(&[1, 2, 3, 4, 5]);
        let selection = validate_selection(&[5, 3, 1, 2, 4], &pool, &HashSet::new(), 3);
        assert_eq!(selection.track_ids, vec![5, 3, 1]);
    }

    #[test]
    fn test_underflow_is_not_an_error() {
        let pool = universe(&[1]);
        let selection = validate_selection(&[1, 2, 3], &pool, &HashSet::new(), 3);
        assert_eq!(selection.track_ids, vec![1]);
    }

    #[test]
    fn test_empty_input_yields_empty_selection() {
        let pool = universe(&[1, 2]);
        let selection = validate_selection(&[], &pool, &HashSet::new(), 5);
        assert!(selection.is_empty());
    }

    #[test]
    fn test_emergency_selection_excludes_history() {
        let pool = universe(&[10, 20, 30, 40, 50, 60]);
        let history: HashSet<i64> = [20, 40].into_iter().collect();
        let selection = emergency_selection(&pool, &history, 5);
        assert_eq!(selection.track_ids, vec![10, 30, 50, 60]);
    }

    #[test]
    fn test_emergency_selection_caps_count() {
        let pool = universe(&[1, 2, 3, 4, 5]);
        let selection = emergency_selection(&pool, &HashSet::new(), 3);
        assert_eq!(selection.track_ids, vec![1, 2, 3]);
    }
}
