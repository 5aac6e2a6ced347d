//! Section aggregators.
//!
//! Each function turns one row subset into the metrics of a single report
//! section. They are total: an empty subset yields empty maps, and a metric
//! whose source column holds no usable value is left out rather than
//! reported as zero.

use crate::codes::{age_label, companion_label, INCOME_CODES, MASUZUSHI_VENUE_CODES, SUSHI_VENUE_CODES};
use crate::loader::{SurveySchema, SATISFACTION_COLUMNS, SPEND_COLUMNS};
use crate::types::{Family, Respondent, StatValue, StatsMap};
use crate::util::{format_yen, mean, median, mode, pct, round1};

/// Two independent tables computed by one section.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PairedStats {
    pub first: StatsMap,
    pub second: StatsMap,
}

const UNKNOWN: &str = "不明";

fn count_where<F>(rows: &[&Respondent], pred: F) -> usize
where
    F: Fn(&Respondent) -> bool,
{
    rows.iter().filter(|r| pred(**r)).count()
}

/// Stayed nights of respondents who stayed at least one night.
fn stays(rows: &[&Respondent]) -> Vec<f64> {
    rows.iter()
        .filter_map(|r| r.nights)
        .filter(|n| *n > 0.0)
        .collect()
}

/// Map a mean household income onto the smallest bucket whose ceiling is at
/// or above it. Means past the 1500 ceiling are reported as the
/// 1000-2000 bucket.
pub fn income_bucket(avg: Option<f64>) -> &'static str {
    let Some(avg) = avg else {
        return UNKNOWN;
    };
    if avg > 1500.0 {
        return "1000-2000万円";
    }
    INCOME_CODES
        .iter()
        .find(|(ceiling, _)| *ceiling > 0 && avg <= *ceiling as f64)
        .map(|(_, label)| *label)
        .unwrap_or(UNKNOWN)
}

pub fn basic_stats(rows: &[&Respondent]) -> StatsMap {
    let n = rows.len();
    let mut m = StatsMap::new();
    if n == 0 {
        return m;
    }

    let incomes: Vec<f64> = rows
        .iter()
        .filter_map(|r| r.income)
        .filter(|v| *v > 0.0)
        .collect();
    let avg_stay = mean(&stays(rows)).map(round1).unwrap_or(0.0);
    let companion = mode(rows.iter().filter_map(|r| r.companion))
        .map(|c| companion_label(c).unwrap_or(UNKNOWN))
        .unwrap_or(UNKNOWN);
    let age = mode(
        rows.iter()
            .filter_map(|r| r.age)
            .map(|a| (a / 10.0).floor() as i64 * 10),
    )
    .map(age_label)
    .unwrap_or_else(|| UNKNOWN.to_string());

    m.insert("サンプル数", StatValue::Count(n as u64));
    m.number("男性比率(%)", pct(count_where(rows, |r| r.gender == Some(0)), n));
    m.number("女性比率(%)", pct(count_where(rows, |r| r.gender == Some(1)), n));
    m.insert("最多年代", StatValue::Text(age));
    m.insert("最多同行者", StatValue::Text(companion.to_string()));
    m.number("平均宿泊数（県内）", avg_stay);
    m.insert("平均世帯年収帯", StatValue::Text(income_bucket(mean(&incomes)).to_string()));
    m
}

pub fn travel_stats(rows: &[&Respondent]) -> StatsMap {
    let n = rows.len();
    let mut m = StatsMap::new();
    if n == 0 {
        return m;
    }
    let visits = |pred: fn(f64) -> bool| count_where(rows, |r| r.visits.map_or(false, pred));

    m.number("宿泊率(%)", pct(stays(rows).len(), n));
    m.number("平均宿泊数", mean(&stays(rows)).map(round1).unwrap_or(0.0));
    m.number("初訪問率(%)", pct(visits(|v| v == 1.0), n));
    m.number("リピーター率(%)", pct(visits(|v| v >= 2.0), n));
    m.number("ヘビーリピーター率(%)", pct(visits(|v| v >= 6.0), n));
    m
}

/// Percentage of answering respondents with each indicator of `family` set,
/// in header order. Items nobody answered are omitted.
fn indicator_rates(rows: &[&Respondent], schema: &SurveySchema, family: Family) -> StatsMap {
    let mut m = StatsMap::new();
    if rows.is_empty() {
        return m;
    }
    for (i, item) in schema.items(family).iter().enumerate() {
        let answers: Vec<f64> = rows.iter().filter_map(|r| r.indicator(family, i)).collect();
        if answers.is_empty() {
            continue;
        }
        let set = answers.iter().filter(|v| **v > 0.0).count();
        m.number(item.name.clone(), pct(set, answers.len()));
    }
    m
}

/// Primary transport to the prefecture, then transport within it.
pub fn transport_stats(rows: &[&Respondent], schema: &SurveySchema) -> PairedStats {
    PairedStats {
        first: indicator_rates(rows, schema, Family::PrimaryTransport),
        second: indicator_rates(rows, schema, Family::LocalTransport),
    }
}

/// Visit purposes, highest rate first.
pub fn purpose_stats(rows: &[&Respondent], schema: &SurveySchema) -> StatsMap {
    indicator_rates(rows, schema, Family::Purpose).sorted_desc()
}

/// Digital then non-digital information sources, each highest rate first.
pub fn info_source_stats(rows: &[&Respondent], schema: &SurveySchema) -> PairedStats {
    PairedStats {
        first: indicator_rates(rows, schema, Family::InfoDigital).sorted_desc(),
        second: indicator_rates(rows, schema, Family::InfoNonDigital).sorted_desc(),
    }
}

pub fn visited_stats(rows: &[&Respondent], schema: &SurveySchema) -> StatsMap {
    indicator_rates(rows, schema, Family::Visited).sorted_desc()
}

fn strip_label<'a>(column: &'a str, head: &str) -> &'a str {
    column.trim_start_matches(head).trim_end_matches('）')
}

pub fn expense_stats(rows: &[&Respondent]) -> StatsMap {
    let mut m = StatsMap::new();
    if rows.is_empty() {
        return m;
    }

    // Unanswered categories count as zero spend in the total.
    let totals: Vec<f64> = rows
        .iter()
        .map(|r| r.spend.iter().flatten().sum::<f64>())
        .collect();
    if let Some(avg) = mean(&totals) {
        m.insert("総消費額（平均）", StatValue::Text(format_yen(avg)));
    }
    if let Some(mid) = median(totals) {
        m.insert("総消費額（中央値）", StatValue::Text(format_yen(mid)));
    }

    for (i, col) in SPEND_COLUMNS.iter().enumerate() {
        let values: Vec<f64> = rows.iter().filter_map(|r| r.spend[i]).collect();
        if let Some(avg) = mean(&values) {
            let name = strip_label(col, "消費額（");
            m.insert(format!("{}（平均）", name), StatValue::Text(format_yen(avg)));
        }
    }
    m
}

/// Net Promoter Score: promoters (9-10) minus detractors (0-6), in
/// percentage points of the whole subset.
pub fn nps(rows: &[&Respondent]) -> Option<f64> {
    let n = rows.len();
    if n == 0 {
        return None;
    }
    let promoters = count_where(rows, |r| r.nps.map_or(false, |s| s >= 9.0)) as f64;
    let detractors = count_where(rows, |r| r.nps.map_or(false, |s| s <= 6.0)) as f64;
    Some(round1((promoters - detractors) / n as f64 * 100.0))
}

pub fn satisfaction_stats(rows: &[&Respondent]) -> StatsMap {
    let mut m = StatsMap::new();
    if rows.is_empty() {
        return m;
    }
    for (i, col) in SATISFACTION_COLUMNS.iter().enumerate() {
        let scores: Vec<f64> = rows.iter().filter_map(|r| r.satisfaction[i]).collect();
        if let Some(avg) = mean(&scores) {
            m.number(format!("{}満足度", strip_label(col, "満足度（")), round1(avg));
        }
    }
    if let Some(score) = nps(rows) {
        m.number("NPSスコア", score);
    }
    let revisit: Vec<f64> = rows.iter().filter_map(|r| r.revisit).collect();
    if let Some(avg) = mean(&revisit) {
        m.number("再来訪意向", round1(avg));
    }
    m
}

/// Consumption rate per seafood item, and the share of eaters who were
/// impressed by it.
pub fn seafood_stats(rows: &[&Respondent], schema: &SurveySchema) -> PairedStats {
    let mut out = PairedStats::default();
    if rows.is_empty() {
        return out;
    }
    for pair in schema.seafood() {
        let answers: Vec<f64> = rows
            .iter()
            .filter_map(|r| r.indicator(Family::SeafoodEaten, pair.eaten))
            .collect();
        if answers.is_empty() {
            continue;
        }
        let eaters: Vec<&&Respondent> = rows
            .iter()
            .filter(|r| r.indicator(Family::SeafoodEaten, pair.eaten).map_or(false, |v| v > 0.0))
            .collect();
        out.first.number(pair.name.clone(), pct(eaters.len(), answers.len()));

        if let Some(imp) = pair.impressed {
            let impressed = eaters
                .iter()
                .filter(|r| r.indicator(Family::SeafoodImpressed, imp).map_or(false, |v| v > 0.0))
                .count();
            out.second.number(pair.name.clone(), pct(impressed, eaters.len()));
        }
    }
    out
}

fn venue_stats<F>(rows: &[&Respondent], codes: &[(i64, &str)], venue: F) -> StatsMap
where
    F: Fn(&Respondent) -> Option<i64>,
{
    let n = rows.len();
    let mut m = StatsMap::new();
    m.number("喫食率", pct(count_where(rows, |r| venue(r).map_or(false, |c| c != 0)), n));
    for (code, label) in codes.iter().filter(|(c, _)| *c != 0) {
        m.number(*label, pct(count_where(rows, |r| venue(r) == Some(*code)), n));
    }
    m
}

/// Sushi then masuzushi venue usage.
pub fn sushi_stats(rows: &[&Respondent]) -> PairedStats {
    if rows.is_empty() {
        return PairedStats::default();
    }
    PairedStats {
        first: venue_stats(rows, SUSHI_VENUE_CODES, |r| r.sushi_venue),
        second: venue_stats(rows, MASUZUSHI_VENUE_CODES, |r| r.masuzushi_venue),
    }
}
