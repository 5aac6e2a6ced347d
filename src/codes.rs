//! Code maps for the survey's integer-coded answers.
//!
//! Every table here is fixed by the questionnaire. Ordered slices keep the
//! questionnaire order for iteration; the `Lazy` maps are lookup indexes over
//! the same slices.

use once_cell::sync::Lazy;
use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Home regions the report recognizes, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Region {
    Toyama,
    Tokyo,
    Ishikawa,
    Aichi,
    Osaka,
    Nagano,
    Fukui,
}

impl Region {
    pub const ALL: [Region; 7] = [
        Region::Toyama,
        Region::Tokyo,
        Region::Ishikawa,
        Region::Aichi,
        Region::Osaka,
        Region::Nagano,
        Region::Fukui,
    ];

    /// Numeric home-location code used by the survey.
    ///
    /// Fukui's 14 is never answered directly; the loader assigns it (see
    /// `loader::resolve_region`).
    pub fn code(self) -> i64 {
        match self {
            Region::Toyama => 1,
            Region::Tokyo => 2,
            Region::Ishikawa => 3,
            Region::Aichi => 4,
            Region::Osaka => 6,
            Region::Nagano => 7,
            Region::Fukui => 14,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Region::Toyama => "富山県",
            Region::Tokyo => "東京都",
            Region::Ishikawa => "石川県",
            Region::Aichi => "愛知県",
            Region::Osaka => "大阪府",
            Region::Nagano => "長野県",
            Region::Fukui => "福井県",
        }
    }

    pub fn id(self) -> &'static str {
        match self {
            Region::Toyama => "toyama",
            Region::Tokyo => "tokyo",
            Region::Ishikawa => "ishikawa",
            Region::Aichi => "aichi",
            Region::Osaka => "osaka",
            Region::Nagano => "nagano",
            Region::Fukui => "fukui",
        }
    }

    pub fn from_code(code: i64) -> Option<Region> {
        REGION_BY_CODE.get(&code).copied()
    }
}

static REGION_BY_CODE: Lazy<HashMap<i64, Region>> =
    Lazy::new(|| Region::ALL.iter().map(|r| (r.code(), *r)).collect());

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for Region {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl FromStr for Region {
    type Err = String;

    /// Accepts the Japanese label, the romanized id or the numeric code.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(r) = Region::ALL
            .iter()
            .find(|r| r.label() == s || r.id().eq_ignore_ascii_case(s))
        {
            return Ok(*r);
        }
        s.parse::<i64>()
            .ok()
            .and_then(Region::from_code)
            .ok_or_else(|| {
                let known: Vec<&str> = Region::ALL.iter().map(|r| r.id()).collect();
                format!("unknown region '{}' (expected one of: {})", s, known.join(", "))
            })
    }
}

/// The ten report topics, in checklist order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Basic,
    Travel,
    Transport,
    Purpose,
    InfoSource,
    Visited,
    Expense,
    Satisfaction,
    Seafood,
    Sushi,
}

impl Section {
    pub const ALL: [Section; 10] = [
        Section::Basic,
        Section::Travel,
        Section::Transport,
        Section::Purpose,
        Section::InfoSource,
        Section::Visited,
        Section::Expense,
        Section::Satisfaction,
        Section::Seafood,
        Section::Sushi,
    ];

    /// Pre-selected when the user picks nothing explicitly.
    pub const DEFAULT: [Section; 3] = [Section::Basic, Section::Purpose, Section::Satisfaction];

    pub fn id(self) -> &'static str {
        match self {
            Section::Basic => "basic",
            Section::Travel => "travel",
            Section::Transport => "transport",
            Section::Purpose => "purpose",
            Section::InfoSource => "info_source",
            Section::Visited => "visited",
            Section::Expense => "expense",
            Section::Satisfaction => "satisfaction",
            Section::Seafood => "seafood",
            Section::Sushi => "sushi",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Section::Basic => "基本属性",
            Section::Travel => "旅行行動",
            Section::Transport => "交通手段",
            Section::Purpose => "訪問目的",
            Section::InfoSource => "情報源",
            Section::Visited => "訪問先",
            Section::Expense => "消費額",
            Section::Satisfaction => "満足度・NPS",
            Section::Seafood => "海の幸",
            Section::Sushi => "寿司・ます寿し",
        }
    }

    /// Looks a section up by id or Japanese label. Unknown names yield `None`.
    pub fn parse(s: &str) -> Option<Section> {
        let s = s.trim();
        Section::ALL
            .iter()
            .copied()
            .find(|sec| sec.id().eq_ignore_ascii_case(s) || sec.label() == s)
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

pub const COMPANION_CODES: &[(i64, &str)] = &[
    (1, "子連れ家族(未就学児)"),
    (2, "子連れ家族(小〜高校生)"),
    (3, "大人の家族"),
    (4, "夫婦"),
    (5, "カップル"),
    (6, "友人・知人"),
    (7, "団体旅行"),
    (8, "ひとり"),
    (0, "その他"),
];

pub const AGE_CODES: &[(i64, &str)] = &[
    (10, "10代"),
    (20, "20代"),
    (30, "30代"),
    (40, "40代"),
    (50, "50代"),
    (60, "60代"),
    (70, "70代"),
    (80, "80代以上"),
];

/// Income answers are bucket ceilings in units of 10,000 yen, ascending.
/// Code 0 means "no answer".
pub const INCOME_CODES: &[(i64, &str)] = &[
    (0, "無回答"),
    (100, "100万円未満"),
    (150, "100-200万円"),
    (250, "200-300万円"),
    (350, "300-400万円"),
    (500, "400-600万円"),
    (700, "600-800万円"),
    (900, "800-1000万円"),
    (1500, "1000-2000万円"),
    (2000, "2000万円以上"),
];

/// Code 0 is "did not eat" in both venue tables.
pub const SUSHI_VENUE_CODES: &[(i64, &str)] = &[
    (0, "食べていない"),
    (1, "回転寿司店（チェーン店）"),
    (2, "回転寿司店（地元）"),
    (3, "居酒屋・レストラン（チェーン店）"),
    (4, "居酒屋・レストラン（地元）"),
    (5, "持ち帰り（道の駅・スーパーなど）"),
    (6, "専門店"),
];

pub const MASUZUSHI_VENUE_CODES: &[(i64, &str)] = &[
    (0, "食べていない"),
    (1, "駅（売店・自販機など）"),
    (2, "専門店"),
    (3, "居酒屋・レストラン（地元）"),
    (4, "居酒屋・レストラン（チェーン店）"),
    (5, "回転寿司店（地元）"),
    (6, "回転寿司店（チェーン店）"),
    (7, "持ち帰り（道の駅・スーパーなど）"),
];

static COMPANION_BY_CODE: Lazy<HashMap<i64, &'static str>> =
    Lazy::new(|| COMPANION_CODES.iter().copied().collect());

static AGE_BY_CODE: Lazy<HashMap<i64, &'static str>> =
    Lazy::new(|| AGE_CODES.iter().copied().collect());

pub fn companion_label(code: i64) -> Option<&'static str> {
    COMPANION_BY_CODE.get(&code).copied()
}

/// Label for an age decade such as 30 → "30代". Decades outside the
/// questionnaire fall back to a generated "<n>代".
pub fn age_label(decade: i64) -> String {
    AGE_BY_CODE
        .get(&decade)
        .map(|s| s.to_string())
        .unwrap_or_else(|| format!("{}代", decade))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_lookup_by_code() {
        assert_eq!(Region::from_code(1), Some(Region::Toyama));
        assert_eq!(Region::from_code(14), Some(Region::Fukui));
        assert_eq!(Region::from_code(5), None);
    }

    #[test]
    fn test_region_from_str_variants() {
        assert_eq!("富山県".parse::<Region>(), Ok(Region::Toyama));
        assert_eq!("Osaka".parse::<Region>(), Ok(Region::Osaka));
        assert_eq!("7".parse::<Region>(), Ok(Region::Nagano));
        assert!("北海道".parse::<Region>().is_err());
    }

    #[test]
    fn test_section_parse() {
        assert_eq!(Section::parse("info_source"), Some(Section::InfoSource));
        assert_eq!(Section::parse("満足度・NPS"), Some(Section::Satisfaction));
        assert_eq!(Section::parse("weather"), None);
    }

    #[test]
    fn test_age_label_fallback() {
        assert_eq!(age_label(80), "80代以上");
        assert_eq!(age_label(90), "90代");
    }

    #[test]
    fn test_companion_label() {
        assert_eq!(companion_label(4), Some("夫婦"));
        assert_eq!(companion_label(0), Some("その他"));
        assert_eq!(companion_label(42), None);
    }
}
