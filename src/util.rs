// Utility helpers for parsing and basic statistics.
//
// This module centralizes all the "dirty" CSV/number handling so the
// aggregators can assume clean, typed values.
use num_format::{Locale, ToFormattedString};
use std::collections::BTreeMap;

/// Parse a string-like value into `f64` while being forgiving about
/// formatting issues that are common in spreadsheet exports.
///
/// - Trims whitespace.
/// - Rejects values that contain alphabetic characters.
/// - Strips thousands separators like `","` before parsing.
/// - Returns `None` for anything that cannot be safely parsed (including NaN).
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    if s.chars().any(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let s = s.replace(',', "");
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse an integer survey code. Spreadsheet exports often write codes as
/// `3.0`, so whole-valued floats are accepted; fractional values are not.
pub fn parse_code_safe(s: Option<&str>) -> Option<i64> {
    let v = parse_f64_safe(s)?;
    if v.fract() == 0.0 {
        Some(v as i64)
    } else {
        None
    }
}

/// Round to one decimal place on the exact binary value; exact ties go to
/// the even digit (6.25 -> 6.2, 0.35 -> 0.3 since it is stored below .35).
pub fn round1(v: f64) -> f64 {
    format!("{:.1}", v).parse().unwrap_or(v)
}

/// Share of `hits` among `total`, as a percentage rounded to one decimal.
/// Zero when `total` is zero.
pub fn pct(hits: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round1(hits as f64 / total as f64 * 100.0)
}

/// Arithmetic mean; `None` for an empty slice so callers never see NaN.
pub fn mean(v: &[f64]) -> Option<f64> {
    if v.is_empty() {
        return None;
    }
    let sum: f64 = v.iter().copied().sum();
    Some(sum / v.len() as f64)
}

pub fn median(mut v: Vec<f64>) -> Option<f64> {
    // Median of a list of numbers. We accept `Vec<f64>` by value so the
    // function can sort in-place without cloning at the call site.
    if v.is_empty() {
        return None;
    }
    v.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = v.len() / 2;
    if v.len() % 2 == 1 {
        Some(v[mid])
    } else {
        Some((v[mid - 1] + v[mid]) / 2.0)
    }
}

/// Most frequent value. Ties resolve to the smallest value.
pub fn mode<I>(values: I) -> Option<i64>
where
    I: IntoIterator<Item = i64>,
{
    let mut counts: BTreeMap<i64, usize> = BTreeMap::new();
    for v in values {
        *counts.entry(v).or_default() += 1;
    }
    let mut best: Option<(i64, usize)> = None;
    for (value, count) in counts {
        // BTreeMap iterates ascending, so strict `>` keeps the smallest tie.
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((value, count));
        }
    }
    best.map(|(v, _)| v)
}

/// Integer yen with thousands separators, e.g. `12,345円`. Fractions are
/// truncated toward zero.
pub fn format_yen(n: f64) -> String {
    let v = n.trunc() as i64;
    format!("{}円", format_int(v))
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    // Thin wrapper around `num-format` for integer-like values. This is used
    // for counts in console messages (e.g., `9,855 rows loaded`).
    n.to_formatted_string(&Locale::en)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_f64_safe() {
        assert_eq!(parse_f64_safe(Some(" 1,200 ")), Some(1200.0));
        assert_eq!(parse_f64_safe(Some("")), None);
        assert_eq!(parse_f64_safe(Some("abc")), None);
        assert_eq!(parse_f64_safe(Some("NaN")), None);
        assert_eq!(parse_f64_safe(None), None);
    }

    #[test]
    fn test_parse_code_safe() {
        assert_eq!(parse_code_safe(Some("3")), Some(3));
        assert_eq!(parse_code_safe(Some("3.0")), Some(3));
        assert_eq!(parse_code_safe(Some("3.5")), None);
        assert_eq!(parse_code_safe(Some("福井県")), None);
    }

    #[test]
    fn test_round1() {
        assert_eq!(round1(10.0 / 3.0), 3.3);
        assert_eq!(round1(-66.66), -66.7);
        assert_eq!(round1(6.25), 6.2);
        assert_eq!(round1(18.75), 18.8);
        assert_eq!(round1(0.35), 0.3);
    }

    #[test]
    fn test_pct_handles_zero_total() {
        assert_eq!(pct(0, 0), 0.0);
        assert_eq!(pct(3, 4), 75.0);
    }

    #[test]
    fn test_median_even_and_odd() {
        assert_eq!(median(vec![3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(vec![4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median(vec![]), None);
    }

    #[test]
    fn test_mode_prefers_smallest_on_tie() {
        assert_eq!(mode(vec![40, 30, 40, 30, 20]), Some(30));
        assert_eq!(mode(Vec::<i64>::new()), None);
    }

    #[test]
    fn test_format_yen() {
        assert_eq!(format_yen(1234567.9), "1,234,567円");
        assert_eq!(format_yen(0.0), "0円");
    }
}
