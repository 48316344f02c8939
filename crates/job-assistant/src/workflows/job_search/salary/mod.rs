//! Salary expression normalization and expectation matching.
//!
//! Free-text salary expressions ("15-20K", "年薪30万", "面议") are normalized into monthly
//! ranges by [`SalaryParser`] and compared by [`SalaryScorer`]. Both are pure and may be
//! shared across threads.

mod parser;
mod scorer;

pub use parser::SalaryParser;
pub use scorer::{MatchType, SalaryMatch, SalaryScorer};

use serde::{Deserialize, Serialize};

/// Fractional band applied around point estimates and used as the gap allowance when
/// ranges do not overlap.
pub const DEFAULT_TOLERANCE_RATIO: f64 = 0.2;

/// Heuristic ceiling for open-ended "N以上" expressions: the range becomes `[N, N * 3]`.
pub const ABOVE_CEILING_MULTIPLIER: u64 = 3;

/// Normalized monthly salary range in whole currency units. `min <= max` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SalaryRange {
    min: u64,
    max: u64,
}

impl SalaryRange {
    /// Builds a range, swapping bounds written in reverse order.
    pub fn new(a: u64, b: u64) -> Self {
        if a <= b {
            Self { min: a, max: b }
        } else {
            Self { min: b, max: a }
        }
    }

    /// Range spanning `center ± floor(center * ratio)`.
    pub fn banded(center: u64, ratio: f64) -> Self {
        let half = (center as f64 * ratio.max(0.0)).floor() as u64;
        Self::new(center.saturating_sub(half), center.saturating_add(half))
    }

    pub fn point(value: u64) -> Self {
        Self::new(value, value)
    }

    pub const fn min(&self) -> u64 {
        self.min
    }

    pub const fn max(&self) -> u64 {
        self.max
    }

    pub const fn width(&self) -> u64 {
        self.max - self.min
    }

    pub fn midpoint(&self) -> u64 {
        self.min + self.width() / 2
    }
}

/// Comparable salary terms: a numeric range or the negotiable sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SalaryBand {
    Range(SalaryRange),
    Negotiable,
}

/// Outcome of parsing a salary expression.
///
/// `Unparseable` keeps the distinction for display and diagnostics, but ranks exactly
/// like `Negotiable`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SalaryParse {
    Range(SalaryRange),
    Negotiable,
    Unparseable,
}

impl SalaryParse {
    pub fn band(self) -> SalaryBand {
        match self {
            SalaryParse::Range(range) => SalaryBand::Range(range),
            SalaryParse::Negotiable | SalaryParse::Unparseable => SalaryBand::Negotiable,
        }
    }

    pub fn range(self) -> Option<SalaryRange> {
        match self {
            SalaryParse::Range(range) => Some(range),
            _ => None,
        }
    }

    pub const fn is_unparseable(self) -> bool {
        matches!(self, SalaryParse::Unparseable)
    }
}
