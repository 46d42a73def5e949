use crate::storage::models::DuplicatePeer;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusedScore {
    pub final_score: f64,
    /// Best peer similarity on a 0-100 scale.
    pub duplicate_percent: f64,
}

/// Raises a heuristic score toward the duplicate signal in fixed buckets.
#[derive(Debug, Clone)]
pub struct ScoreFuser {
    /// Highest first.
    buckets: Vec<f64>,
}

impl ScoreFuser {
    /// `buckets` are expected in strictly descending order, as produced by
    /// `EngineSettings::validate`.
    pub fn new(buckets: Vec<f64>) -> Self {
        Self { buckets }
    }

    pub fn fuse(&self, deletion_score: f64, peers: &[DuplicatePeer]) -> FusedScore {
        let best = peers
            .iter()
            .map(|p| p.similarity)
            .fold(None, |acc: Option<f64>, s| Some(acc.map_or(s, |a| a.max(s))));
        let duplicate_percent = best.map_or(0.0, |s| (s * 100.0).clamp(0.0, 100.0));

        // The floor is the bucket itself, not the percent: 95% lifts to 90.
        let final_score = self
            .buckets
            .iter()
            .find(|threshold| duplicate_percent > **threshold)
            .map_or(deletion_score, |threshold| deletion_score.max(*threshold));

        FusedScore {
            final_score,
            duplicate_percent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_FLOOR_BUCKETS;

    fn fuser() -> ScoreFuser {
        ScoreFuser::new(DEFAULT_FLOOR_BUCKETS.to_vec())
    }

    fn peers(similarities: &[f64]) -> Vec<DuplicatePeer> {
        similarities
            .iter()
            .enumerate()
            .map(|(i, s)| DuplicatePeer {
                path: format!("/peer/{}", i),
                similarity: *s,
            })
            .collect()
    }

    #[test]
    fn test_no_peers_leaves_score_unchanged() {
        let fused = fuser().fuse(42.5, &[]);
        assert_eq!(fused.final_score, 42.5);
        assert_eq!(fused.duplicate_percent, 0.0);
    }

    #[test]
    fn test_floor_is_the_highest_exceeded_bucket() {
        let fused = fuser().fuse(10.0, &peers(&[0.95]));
        assert!((fused.duplicate_percent - 95.0).abs() < 1e-9);
        assert_eq!(fused.final_score, 90.0);

        let fused = fuser().fuse(5.0, &peers(&[0.91, 0.95, 0.93]));
        assert!((fused.duplicate_percent - 95.0).abs() < 1e-9);
        assert_eq!(fused.final_score, 90.0);
    }

    #[test]
    fn test_bucket_comparison_is_strict() {
        // Exactly 90% does not exceed the 90 bucket, so the 80 bucket applies.
        let fused = fuser().fuse(0.0, &peers(&[0.9]));
        assert_eq!(fused.final_score, 80.0);
    }

    #[test]
    fn test_never_lowers_the_heuristic_score() {
        let fused = fuser().fuse(97.0, &peers(&[0.95]));
        assert_eq!(fused.final_score, 97.0);

        let fused = fuser().fuse(0.0, &peers(&[0.05]));
        assert_eq!(fused.final_score, 0.0);
    }

    #[test]
    fn test_monotonic_in_duplicate_signal() {
        let f = fuser();
        for base in [0.0, 15.0, 55.0, 89.9, 100.0] {
            let mut previous = f64::MIN;
            for step in 0..=100 {
                let similarity = step as f64 / 100.0;
                let fused = f.fuse(base, &peers(&[similarity]));
                assert!(fused.final_score >= base);
                assert!(fused.final_score >= previous);
                assert!((0.0..=100.0).contains(&fused.duplicate_percent));
                previous = fused.final_score;
            }
        }
    }

    #[test]
    fn test_custom_buckets() {
        let fused = ScoreFuser::new(vec![50.0]).fuse(20.0, &peers(&[0.99]));
        assert_eq!(fused.final_score, 50.0);
    }
}
