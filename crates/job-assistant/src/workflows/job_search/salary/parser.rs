use lazy_static::lazy_static;
use regex::{Captures, Regex};
use tracing::debug;

use super::{SalaryParse, SalaryRange, ABOVE_CEILING_MULTIPLIER, DEFAULT_TOLERANCE_RATIO};

const NUMBER: &str = r"([0-9]+(?:\.[0-9]+)?)";
const SEPARATOR: &str = r"[-~～—–至到]";
const ANNUAL_MARKERS: &[&str] = &["年薪", "年收入"];
const CLAUSE_BREAKS: &[char] = &['，', ',', '；', ';', '。', '/', '|'];

const NEGOTIABLE_PHRASES: &[&str] = &[
    "面议",
    "薪资面议",
    "待遇面议",
    "面谈",
    "negotiable",
    "tbd",
    "open to discussion",
];

/// Patterns for one family of unit suffixes, tried range, above, around, single.
struct UnitFamily {
    range: Regex,
    above: Regex,
    around: Regex,
    single: Regex,
}

impl UnitFamily {
    fn new(lower_unit: &str, upper_unit: &str) -> Self {
        Self {
            range: compile(&format!(
                r"{NUMBER}\s*({lower_unit})?\s*{SEPARATOR}\s*{NUMBER}\s*({upper_unit})?"
            )),
            above: compile(&format!(
                r"{NUMBER}\s*({upper_unit})\s*(?:及以上|以上|起|\+)"
            )),
            around: compile(&format!(
                r"{NUMBER}\s*({upper_unit})\s*(?:左右|上下)"
            )),
            single: compile(&format!(r"{NUMBER}\s*({upper_unit})")),
        }
    }
}

lazy_static! {
    static ref KILO_WAN: UnitFamily = UnitFamily::new("k|万|千", "k|万");
    static ref QIAN: UnitFamily = UnitFamily::new("千", "千");
    static ref MONTHLY: Regex = compile(&format!(r"月薪[:：\s]*{NUMBER}"));
    static ref ANNUAL_RANGE: Regex = compile(&format!(
        r"(?:年薪|年收入)[:：\s]*{NUMBER}\s*(k|万|千)?\s*{SEPARATOR}\s*{NUMBER}\s*(k|万|千)?"
    ));
    static ref ANNUAL_SINGLE: Regex =
        compile(&format!(r"(?:年薪|年收入)[:：\s]*{NUMBER}\s*(k|万|千)?"));
    static ref BARE_RANGE: Regex = compile(&format!(r"{NUMBER}\s*{SEPARATOR}\s*{NUMBER}"));
}

fn compile(source: &str) -> Regex {
    Regex::new(source).expect("salary pattern is a valid regex")
}

type Rule = fn(&SalaryParser, &str) -> Option<SalaryRange>;

/// Evaluated in order; the first rule producing a range wins.
const RULES: [(&str, Rule); 5] = [
    ("kilo_wan", SalaryParser::kilo_wan),
    ("qian", SalaryParser::qian),
    ("monthly", SalaryParser::monthly),
    ("annual", SalaryParser::annual),
    ("bare_range", SalaryParser::bare_range),
];

/// Normalizes free-text salary expressions into monthly ranges.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SalaryParser {
    tolerance_ratio: f64,
}

impl Default for SalaryParser {
    fn default() -> Self {
        Self::new(DEFAULT_TOLERANCE_RATIO)
    }
}

impl SalaryParser {
    pub fn new(tolerance_ratio: f64) -> Self {
        Self {
            tolerance_ratio: tolerance_ratio.max(0.0),
        }
    }

    pub fn tolerance_ratio(&self) -> f64 {
        self.tolerance_ratio
    }

    /// Parse an expression. Never fails: anything without a recognizable amount is
    /// `Unparseable`, empty text and negotiation phrases are `Negotiable`.
    pub fn parse(&self, text: &str) -> SalaryParse {
        let normalized = normalize(text);
        if is_negotiable(&normalized) {
            return SalaryParse::Negotiable;
        }

        for (name, rule) in RULES {
            if let Some(range) = rule(self, &normalized) {
                debug!(rule = name, min = range.min(), max = range.max(), "salary parsed");
                return SalaryParse::Range(range);
            }
        }

        SalaryParse::Unparseable
    }

    fn kilo_wan(&self, text: &str) -> Option<SalaryRange> {
        self.unit_family(&KILO_WAN, text)
    }

    fn qian(&self, text: &str) -> Option<SalaryRange> {
        self.unit_family(&QIAN, text)
    }

    fn unit_family(&self, family: &UnitFamily, text: &str) -> Option<SalaryRange> {
        // A bound without a unit borrows the other bound's; unitless ranges belong to
        // the bare-range rule.
        if let Some(caps) = family
            .range
            .captures_iter(text)
            .filter(|caps| caps.get(2).is_some() || caps.get(4).is_some())
            .find(|caps| is_unmarked(text, caps))
        {
            let lower = caps.get(2).and_then(|unit| unit_multiplier(unit.as_str()));
            let upper = caps.get(4).and_then(|unit| unit_multiplier(unit.as_str()));
            let upper_unit = upper.or(lower)?;
            let lower_unit = lower.unwrap_or(upper_unit);
            let low = scaled_amount(caps.get(1)?.as_str(), lower_unit)?;
            let high = scaled_amount(caps.get(3)?.as_str(), upper_unit)?;
            return Some(SalaryRange::new(low, high));
        }

        if let Some(floor) = unmarked_amount(&family.above, text) {
            return Some(SalaryRange::new(
                floor,
                floor.saturating_mul(ABOVE_CEILING_MULTIPLIER),
            ));
        }

        if let Some(center) = unmarked_amount(&family.around, text) {
            return Some(SalaryRange::banded(center, self.tolerance_ratio));
        }

        unmarked_amount(&family.single, text)
            .map(|center| SalaryRange::banded(center, self.tolerance_ratio))
    }

    fn monthly(&self, text: &str) -> Option<SalaryRange> {
        let caps = MONTHLY.captures(text)?;
        let monthly = scaled_amount(caps.get(1)?.as_str(), 1)?;
        Some(SalaryRange::banded(monthly, self.tolerance_ratio))
    }

    fn annual(&self, text: &str) -> Option<SalaryRange> {
        if let Some(caps) = ANNUAL_RANGE.captures(text) {
            let upper_unit = caps
                .get(4)
                .and_then(|unit| unit_multiplier(unit.as_str()))
                .unwrap_or(1);
            let lower_unit = caps
                .get(2)
                .and_then(|unit| unit_multiplier(unit.as_str()))
                .unwrap_or(upper_unit);
            let low = scaled_amount(caps.get(1)?.as_str(), lower_unit)? / 12;
            let high = scaled_amount(caps.get(3)?.as_str(), upper_unit)? / 12;
            return Some(SalaryRange::new(low, high));
        }

        let caps = ANNUAL_SINGLE.captures(text)?;
        let unit = caps
            .get(2)
            .and_then(|unit| unit_multiplier(unit.as_str()))
            .unwrap_or(1);
        let monthly = scaled_amount(caps.get(1)?.as_str(), unit)? / 12;
        Some(SalaryRange::banded(monthly, self.tolerance_ratio))
    }

    fn bare_range(&self, text: &str) -> Option<SalaryRange> {
        let caps = BARE_RANGE.captures(text)?;
        let low = scaled_amount(caps.get(1)?.as_str(), 1)?;
        let high = scaled_amount(caps.get(2)?.as_str(), 1)?;
        Some(SalaryRange::new(low, high))
    }
}

/// First match whose clause is not annotated as annual income; those amounts are left
/// for the annual rules.
fn first_unmarked<'t>(pattern: &Regex, text: &'t str) -> Option<Captures<'t>> {
    pattern
        .captures_iter(text)
        .find(|caps| is_unmarked(text, caps))
}

fn is_unmarked(text: &str, caps: &Captures<'_>) -> bool {
    let start = caps.get(0).map_or(0, |whole| whole.start());
    let clause = text[..start]
        .rsplit(CLAUSE_BREAKS)
        .next()
        .unwrap_or_default();
    !ANNUAL_MARKERS.iter().any(|marker| clause.contains(marker))
}

fn unmarked_amount(pattern: &Regex, text: &str) -> Option<u64> {
    let caps = first_unmarked(pattern, text)?;
    let unit = unit_multiplier(caps.get(2)?.as_str())?;
    scaled_amount(caps.get(1)?.as_str(), unit)
}

fn unit_multiplier(suffix: &str) -> Option<u64> {
    match suffix {
        "k" | "千" => Some(1_000),
        "万" => Some(10_000),
        _ => None,
    }
}

/// Exact decimal scaling so "2.3k" is 2300 rather than a float artifact.
fn scaled_amount(number: &str, multiplier: u64) -> Option<u64> {
    let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));
    let mut total = whole.parse::<u64>().ok()?.checked_mul(multiplier)?;

    let fraction = &fraction[..fraction.len().min(9)];
    if !fraction.is_empty() {
        let scale = 10u64.pow(fraction.len() as u32);
        let digits = fraction.parse::<u64>().ok()?;
        total = total.checked_add(digits.checked_mul(multiplier)? / scale)?;
    }

    Some(total)
}

fn normalize(text: &str) -> String {
    text.trim()
        .chars()
        .map(|ch| match ch {
            '０'..='９' => char::from_u32(ch as u32 - '０' as u32 + '0' as u32).unwrap_or(ch),
            'Ｋ' | 'ｋ' => 'k',
            '－' => '-',
            '．' => '.',
            other => other,
        })
        .collect::<String>()
        .to_lowercase()
}

fn is_negotiable(normalized: &str) -> bool {
    if normalized.is_empty() {
        return true;
    }

    let bare = normalized.trim_matches(|ch: char| ch.is_ascii_punctuation() || "。，！".contains(ch));
    if NEGOTIABLE_PHRASES.contains(&bare) {
        return true;
    }

    !normalized.chars().any(|ch| ch.is_ascii_digit())
        && NEGOTIABLE_PHRASES
            .iter()
            .any(|phrase| normalized.contains(phrase))
}
