use crate::codes::Region;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::cmp::Ordering;
use std::fmt;

/// Indicator families: groups of 0/1 columns sharing a header prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    PrimaryTransport,
    LocalTransport,
    Purpose,
    InfoDigital,
    InfoNonDigital,
    Visited,
    SeafoodEaten,
    SeafoodImpressed,
}

impl Family {
    pub const ALL: [Family; 8] = [
        Family::PrimaryTransport,
        Family::LocalTransport,
        Family::Purpose,
        Family::InfoDigital,
        Family::InfoNonDigital,
        Family::Visited,
        Family::SeafoodEaten,
        Family::SeafoodImpressed,
    ];

    pub fn prefix(self) -> &'static str {
        match self {
            Family::PrimaryTransport => "1次交通_",
            Family::LocalTransport => "県内交通_",
            Family::Purpose => "訪問目的_",
            Family::InfoDigital => "情報源（デジタル）_",
            Family::InfoNonDigital => "情報源（非デジタル）_",
            Family::Visited => "訪問先_",
            Family::SeafoodEaten => "食べた海の幸_",
            Family::SeafoodImpressed => "感動した海の幸_",
        }
    }

    /// Header fragments marking "none of the above" columns that are not items.
    pub fn excluded_markers(self) -> &'static [&'static str] {
        match self {
            Family::SeafoodEaten => &["食べていない"],
            Family::SeafoodImpressed => &["食べていない", "感動していない"],
            _ => &[],
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

/// One survey respondent. Missing or unparsable cells are `None`.
#[derive(Debug, Clone, Default)]
pub struct Respondent {
    /// Resolved home region; `None` rows are excluded from every aggregate.
    pub region: Option<Region>,
    pub gender: Option<i64>,
    pub age: Option<f64>,
    pub income: Option<f64>,
    pub companion: Option<i64>,
    pub nights: Option<f64>,
    pub visits: Option<f64>,
    pub spend: [Option<f64>; 5],
    pub satisfaction: [Option<f64>; 6],
    pub nps: Option<f64>,
    pub revisit: Option<f64>,
    pub sushi_venue: Option<i64>,
    pub masuzushi_venue: Option<i64>,
    /// Indicator cells per family, aligned with `SurveySchema::items(family)`.
    pub indicators: Vec<Vec<Option<f64>>>,
}

impl Respondent {
    pub fn indicator(&self, family: Family, item: usize) -> Option<f64> {
        self.indicators
            .get(family.index())
            .and_then(|cells| cells.get(item))
            .copied()
            .flatten()
    }
}

/// A single metric value.
#[derive(Debug, Clone, PartialEq)]
pub enum StatValue {
    /// Percentage or mean, already rounded to one decimal.
    Number(f64),
    Count(u64),
    /// Preformatted label or currency string.
    Text(String),
}

impl StatValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            StatValue::Number(v) => Some(*v),
            StatValue::Count(c) => Some(*c as f64),
            StatValue::Text(_) => None,
        }
    }
}

impl fmt::Display for StatValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatValue::Number(v) => write!(f, "{:.1}", v),
            StatValue::Count(c) => write!(f, "{}", c),
            StatValue::Text(s) => f.write_str(s),
        }
    }
}

impl Serialize for StatValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            StatValue::Number(v) => serializer.serialize_f64(*v),
            StatValue::Count(c) => serializer.serialize_u64(*c),
            StatValue::Text(s) => serializer.serialize_str(s),
        }
    }
}

/// Metric label → value, in insertion order.
///
/// An empty map means "no data"; aggregators never emit placeholder entries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatsMap {
    entries: Vec<(String, StatValue)>,
}

impl StatsMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces `key`, keeping the original position on replace.
    pub fn insert(&mut self, key: impl Into<String>, value: StatValue) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn number(&mut self, key: impl Into<String>, value: f64) {
        self.insert(key, StatValue::Number(value));
    }

    pub fn get(&self, key: &str) -> Option<&StatValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Stable descending sort by numeric value; ties keep encounter order.
    pub fn sort_desc(&mut self) {
        self.entries.sort_by(|a, b| {
            let (x, y) = (a.1.as_number(), b.1.as_number());
            y.partial_cmp(&x).unwrap_or(Ordering::Equal)
        });
    }

    pub fn sorted_desc(&self) -> StatsMap {
        let mut out = self.clone();
        out.sort_desc();
        out
    }
}

impl Serialize for StatsMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}
