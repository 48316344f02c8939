use serde::{Deserialize, Serialize};

use super::{SalaryBand, SalaryRange, DEFAULT_TOLERANCE_RATIO};

/// Classification of how a posting's salary relates to the user's expectation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchType {
    BothNegotiable,
    UserNegotiable,
    PostingNegotiable,
    Full,
    High,
    Partial,
    Slight,
    BelowExpectation,
    AboveExpectation,
    NoMatch,
}

impl MatchType {
    pub const fn label(self) -> &'static str {
        match self {
            MatchType::BothNegotiable => "both-negotiable",
            MatchType::UserNegotiable => "user-negotiable",
            MatchType::PostingNegotiable => "posting-negotiable",
            MatchType::Full => "full",
            MatchType::High => "high",
            MatchType::Partial => "partial",
            MatchType::Slight => "slight",
            MatchType::BelowExpectation => "below-expectation",
            MatchType::AboveExpectation => "above-expectation",
            MatchType::NoMatch => "no-match",
        }
    }
}

/// Acceptance decision plus a 0-1 score used for ranking.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SalaryMatch {
    pub accepted: bool,
    pub score: f64,
    pub match_type: MatchType,
}

impl SalaryMatch {
    const fn accepted(score: f64, match_type: MatchType) -> Self {
        Self {
            accepted: true,
            score,
            match_type,
        }
    }

    const fn rejected() -> Self {
        Self {
            accepted: false,
            score: 0.0,
            match_type: MatchType::NoMatch,
        }
    }
}

const BOTH_NEGOTIABLE_SCORE: f64 = 0.5;
const USER_NEGOTIABLE_SCORE: f64 = 0.4;
const POSTING_NEGOTIABLE_SCORE: f64 = 0.3;
const NEAR_MISS_SCORE: f64 = 0.2;

/// Scores a posting's salary against the user's expectation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SalaryScorer {
    tolerance_ratio: f64,
}

impl Default for SalaryScorer {
    fn default() -> Self {
        Self::new(DEFAULT_TOLERANCE_RATIO)
    }
}

impl SalaryScorer {
    pub fn new(tolerance_ratio: f64) -> Self {
        Self {
            tolerance_ratio: tolerance_ratio.max(0.0),
        }
    }

    pub fn tolerance_ratio(&self) -> f64 {
        self.tolerance_ratio
    }

    pub fn score(&self, expected: SalaryBand, actual: SalaryBand) -> SalaryMatch {
        match (expected, actual) {
            (SalaryBand::Negotiable, SalaryBand::Negotiable) => {
                SalaryMatch::accepted(BOTH_NEGOTIABLE_SCORE, MatchType::BothNegotiable)
            }
            (SalaryBand::Negotiable, SalaryBand::Range(_)) => {
                SalaryMatch::accepted(USER_NEGOTIABLE_SCORE, MatchType::UserNegotiable)
            }
            (SalaryBand::Range(_), SalaryBand::Negotiable) => {
                SalaryMatch::accepted(POSTING_NEGOTIABLE_SCORE, MatchType::PostingNegotiable)
            }
            (SalaryBand::Range(expected), SalaryBand::Range(actual)) => {
                self.compare_ranges(expected, actual)
            }
        }
    }

    fn compare_ranges(&self, expected: SalaryRange, actual: SalaryRange) -> SalaryMatch {
        let overlap_min = expected.min().max(actual.min());
        let overlap_max = expected.max().min(actual.max());

        if overlap_min <= overlap_max {
            let ratio = if expected.width() > 0 {
                (overlap_max - overlap_min) as f64 / expected.width() as f64
            } else {
                1.0
            };

            // A zero-width overlap at a shared boundary still lands here as "slight".
            let match_type = if ratio >= 0.8 {
                MatchType::Full
            } else if ratio >= 0.5 {
                MatchType::High
            } else if ratio >= 0.3 {
                MatchType::Partial
            } else {
                MatchType::Slight
            };
            return SalaryMatch::accepted(ratio, match_type);
        }

        if actual.max() < expected.min() {
            let gap = expected.min() - actual.max();
            if gap_fraction(gap, expected.min()) <= self.tolerance_ratio {
                return SalaryMatch::accepted(NEAR_MISS_SCORE, MatchType::BelowExpectation);
            }
        } else {
            let gap = actual.min() - expected.max();
            if gap_fraction(gap, expected.max()) <= self.tolerance_ratio {
                return SalaryMatch::accepted(NEAR_MISS_SCORE, MatchType::AboveExpectation);
            }
        }

        SalaryMatch::rejected()
    }
}

fn gap_fraction(gap: u64, boundary: u64) -> f64 {
    if boundary == 0 {
        1.0
    } else {
        gap as f64 / boundary as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn band(min: u64, max: u64) -> SalaryBand {
        SalaryBand::Range(SalaryRange::new(min, max))
    }

    #[test]
    fn negotiable_combinations() {
        let scorer = SalaryScorer::default();

        let both = scorer.score(SalaryBand::Negotiable, SalaryBand::Negotiable);
        assert!(both.accepted);
        assert_eq!(both.score, 0.5);
        assert_eq!(both.match_type, MatchType::BothNegotiable);

        let user = scorer.score(SalaryBand::Negotiable, band(10_000, 15_000));
        assert_eq!((user.score, user.match_type), (0.4, MatchType::UserNegotiable));

        let posting = scorer.score(band(10_000, 15_000), SalaryBand::Negotiable);
        assert_eq!(
            (posting.score, posting.match_type),
            (0.3, MatchType::PostingNegotiable)
        );
    }

    #[test]
    fn overlap_ratio_ladder() {
        let scorer = SalaryScorer::default();
        let expected = band(10_000, 20_000);

        let full = scorer.score(expected, band(8_000, 30_000));
        assert_eq!(full.match_type, MatchType::Full);
        assert_eq!(full.score, 1.0);

        let high = scorer.score(expected, band(14_000, 25_000));
        assert_eq!(high.match_type, MatchType::High);
        assert!((high.score - 0.6).abs() < 1e-9);

        let partial = scorer.score(expected, band(16_000, 25_000));
        assert_eq!(partial.match_type, MatchType::Partial);

        let slight = scorer.score(expected, band(19_000, 25_000));
        assert_eq!(slight.match_type, MatchType::Slight);
        assert!(slight.accepted);
    }

    #[test]
    fn shared_boundary_counts_as_slight_match() {
        let scorer = SalaryScorer::default();
        let touching = scorer.score(band(10_000, 20_000), band(20_000, 30_000));
        assert!(touching.accepted);
        assert_eq!(touching.score, 0.0);
        assert_eq!(touching.match_type, MatchType::Slight);
    }

    #[test]
    fn point_expectation_inside_posting_is_full() {
        let scorer = SalaryScorer::default();
        let result = scorer.score(band(15_000, 15_000), band(12_000, 18_000));
        assert_eq!((result.score, result.match_type), (1.0, MatchType::Full));
    }

    #[test]
    fn near_misses_within_tolerance() {
        let scorer = SalaryScorer::default();
        let expected = band(15_000, 20_000);

        let below = scorer.score(expected, band(10_000, 13_000));
        assert!(below.accepted);
        assert_eq!(below.score, 0.2);
        assert_eq!(below.match_type, MatchType::BelowExpectation);

        let above = scorer.score(expected, band(23_000, 30_000));
        assert_eq!(above.match_type, MatchType::AboveExpectation);

        let far_below = scorer.score(expected, band(5_000, 8_000));
        assert!(!far_below.accepted);
        assert_eq!(far_below.match_type, MatchType::NoMatch);
        assert_eq!(far_below.score, 0.0);
    }

    #[test]
    fn labels_match_serialized_names() {
        for match_type in [
            MatchType::BothNegotiable,
            MatchType::BelowExpectation,
            MatchType::NoMatch,
            MatchType::Full,
        ] {
            let serialized = serde_json::to_value(match_type).expect("serializes");
            assert_eq!(serialized, serde_json::json!(match_type.label()));
        }
    }

    proptest! {
        #[test]
        fn identical_ranges_are_full_matches(min in 0u64..1_000_000, width in 0u64..1_000_000) {
            let range = band(min, min + width);
            let result = SalaryScorer::default().score(range, range);
            prop_assert!(result.accepted);
            prop_assert_eq!(result.score, 1.0);
            prop_assert_eq!(result.match_type, MatchType::Full);
        }

        #[test]
        fn distant_ranges_are_rejected(
            min in 1_000u64..100_000,
            width in 0u64..50_000,
            gap_percent in 21u64..500,
            posting_width in 0u64..50_000,
        ) {
            let expected = SalaryRange::new(min, min + width);
            let gap = expected.max() * gap_percent / 100 + 1;
            let posting_min = expected.max() + gap;
            let result = SalaryScorer::new(0.2).score(
                SalaryBand::Range(expected),
                band(posting_min, posting_min + posting_width),
            );
            prop_assert!(!result.accepted);
            prop_assert_eq!(result.match_type, MatchType::NoMatch);
        }

        #[test]
        fn scores_stay_within_unit_interval(
            a in 0u64..200_000, b in 0u64..200_000, c in 0u64..200_000, d in 0u64..200_000,
        ) {
            let result = SalaryScorer::default().score(band(a, b), band(c, d));
            prop_assert!((0.0..=1.0).contains(&result.score));
            prop_assert_eq!(result.accepted, result.match_type != MatchType::NoMatch);
        }
    }
}
