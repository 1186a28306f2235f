//! Gallery matching via best-sample-wins cosine similarity.

use crate::types::{Descriptor, Identity};

/// Cosine similarity a probe must exceed for a positive match.
///
/// Tuned for the coarse 16-value geometric descriptor this crate builds.
/// It is not a production-grade biometric security threshold and must not
/// be treated as one.
pub const MATCH_THRESHOLD: f32 = 0.93;

/// Score reported when the gallery holds no identities.
pub const EMPTY_GALLERY_SCORE: f32 = -1.0;

/// Result of matching a probe descriptor against a gallery.
///
/// `score` is always the best similarity found (or the empty-gallery
/// sentinel), even when nothing matched; callers surface it for tuning
/// rather than hiding it.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    pub matched: bool,
    pub score: f32,
    /// Name of the matched identity, present only when `matched`.
    pub name: Option<String>,
}

/// Strategy for comparing a probe descriptor against enrolled identities.
pub trait Matcher {
    fn compare(&self, probe: &Descriptor, gallery: &[Identity], threshold: f32) -> MatchResult;
}

/// Best-sample-wins matcher.
///
/// An identity's score is the maximum similarity over its enrolled
/// samples: an identity matches if *any* one of its samples is close, not
/// the average. Ties between identities go to the first one in gallery
/// order (strict `>` on both loops). The tie-break is preserved for
/// compatibility with the original tuning; it is documented behavior, not
/// load-bearing policy.
pub struct BestSampleMatcher;

impl Matcher for BestSampleMatcher {
    fn compare(&self, probe: &Descriptor, gallery: &[Identity], threshold: f32) -> MatchResult {
        let mut best = EMPTY_GALLERY_SCORE;
        let mut best_name: Option<&str> = None;

        for identity in gallery {
            let mut top = EMPTY_GALLERY_SCORE;
            for sample in &identity.descriptors {
                let s = probe.similarity(sample);
                if s > top {
                    top = s;
                }
            }
            if top > best {
                best = top;
                best_name = Some(&identity.name);
            }
        }

        if best > threshold {
            MatchResult {
                matched: true,
                score: best,
                name: best_name.map(str::to_owned),
            }
        } else {
            MatchResult {
                matched: false,
                score: best,
                name: None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DESCRIPTOR_DIM;

    fn desc(head: &[f32]) -> Descriptor {
        let mut values = [0.0f32; DESCRIPTOR_DIM];
        values[..head.len()].copy_from_slice(head);
        Descriptor { values }
    }

    fn identity(name: &str, samples: Vec<Descriptor>) -> Identity {
        Identity {
            name: name.to_string(),
            descriptors: samples,
        }
    }

    #[test]
    fn test_empty_gallery_returns_sentinel() {
        let probe = desc(&[1.0]);
        let result = BestSampleMatcher.compare(&probe, &[], MATCH_THRESHOLD);
        assert!(!result.matched);
        assert_eq!(result.score, EMPTY_GALLERY_SCORE);
        assert!(result.name.is_none());
    }

    #[test]
    fn test_best_sample_wins_over_better_average() {
        // Alice's second sample is identical to the probe; her other two
        // are orthogonal. Bob's two samples both sit at similarity 0.8,
        // so his average beats Alice's — but matching is max-per-identity.
        let probe = desc(&[1.0, 0.0]);
        let gallery = vec![
            identity(
                "Alice",
                vec![desc(&[0.0, 1.0]), desc(&[1.0, 0.0]), desc(&[0.0, 0.0, 1.0])],
            ),
            identity("Bob", vec![desc(&[0.8, 0.6]), desc(&[0.8, -0.6])]),
        ];

        let result = BestSampleMatcher.compare(&probe, &gallery, MATCH_THRESHOLD);
        assert!(result.matched);
        assert_eq!(result.name.as_deref(), Some("Alice"));
        assert!((result.score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_below_threshold_reports_score() {
        let probe = desc(&[1.0, 0.0]);
        let gallery = vec![identity("Carol", vec![desc(&[0.6, 0.8])])];

        let result = BestSampleMatcher.compare(&probe, &gallery, MATCH_THRESHOLD);
        assert!(!result.matched);
        assert!(result.name.is_none());
        assert!((result.score - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_exact_tie_first_identity_wins() {
        let probe = desc(&[1.0]);
        let sample = desc(&[1.0]);
        let gallery = vec![
            identity("First", vec![sample.clone()]),
            identity("Second", vec![sample]),
        ];

        let result = BestSampleMatcher.compare(&probe, &gallery, MATCH_THRESHOLD);
        assert!(result.matched);
        assert_eq!(result.name.as_deref(), Some("First"));
    }

    #[test]
    fn test_score_at_threshold_is_not_a_match() {
        // Decision is strictly greater-than: a score exactly at the
        // threshold stays "unknown".
        let probe = desc(&[1.0]);
        let gallery = vec![identity("Dana", vec![desc(&[1.0])])];

        let result = BestSampleMatcher.compare(&probe, &gallery, 1.0);
        assert!(!result.matched);
        assert!((result.score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_identity_without_samples_never_matches() {
        let probe = desc(&[1.0]);
        let gallery = vec![
            identity("Empty", vec![]),
            identity("Eve", vec![desc(&[1.0])]),
        ];

        let result = BestSampleMatcher.compare(&probe, &gallery, MATCH_THRESHOLD);
        assert!(result.matched);
        assert_eq!(result.name.as_deref(), Some("Eve"));
    }
}
