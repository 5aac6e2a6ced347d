use crate::codes::Region;
use crate::error::Result;
use crate::types::{Family, Respondent};
use crate::util::{format_int, parse_code_safe, parse_f64_safe};
use csv::{ReaderBuilder, StringRecord};
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use tracing::{debug, info, warn};

pub const COL_HOME: &str = "居住地";
pub const COL_AREA: &str = "居住エリア";
pub const COL_GENDER: &str = "性別";
pub const COL_AGE: &str = "年代";
pub const COL_INCOME: &str = "世帯年収";
pub const COL_COMPANION: &str = "同行者";
pub const COL_NIGHTS: &str = "宿泊数（県内）";
pub const COL_VISITS: &str = "来県回数";
pub const COL_NPS: &str = "NPS";
pub const COL_REVISIT: &str = "再来訪意向";
pub const COL_SUSHI_VENUE: &str = "訪問した寿司店形態";
pub const COL_MASUZUSHI_VENUE: &str = "訪問したます寿し店形態";

pub const SPEND_COLUMNS: [&str; 5] = [
    "消費額（交通）",
    "消費額（飲食）",
    "消費額（宿泊）",
    "消費額（買い物）",
    "消費額（観光・体験）",
];

pub const SATISFACTION_COLUMNS: [&str; 6] = [
    "満足度（2次交通）",
    "満足度（飲食）",
    "満足度（宿泊）",
    "満足度（買い物）",
    "満足度（観光・体験）",
    "満足度（旅行全体）",
];

/// Area code under which Fukui respondents are filed.
const FUKUI_AREA: i64 = 4;
/// Home codes that legitimately share area 4 with Fukui.
const AREA4_NEIGHBOURS: [i64; 3] = [3, 12, 1];

#[derive(Debug, Clone)]
pub struct FamilyItem {
    pub name: String,
    pub column: usize,
}

/// A seafood item with its position in the eaten family and, when the
/// survey asked about it, in the impressed family.
#[derive(Debug, Clone)]
pub struct SeafoodPair {
    pub name: String,
    pub eaten: usize,
    pub impressed: Option<usize>,
}

/// Column layout discovered once from the header row.
#[derive(Debug, Clone, Default)]
pub struct SurveySchema {
    columns: HashMap<String, usize>,
    families: Vec<Vec<FamilyItem>>,
    seafood: Vec<SeafoodPair>,
}

impl SurveySchema {
    pub fn from_headers(headers: &StringRecord) -> Self {
        let names: Vec<String> = headers
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
            .collect();

        let columns: HashMap<String, usize> = names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.clone(), i))
            .collect();

        let families: Vec<Vec<FamilyItem>> = Family::ALL
            .iter()
            .map(|family| {
                names
                    .iter()
                    .enumerate()
                    .filter_map(|(i, n)| {
                        let item = n.strip_prefix(family.prefix())?;
                        if family.excluded_markers().iter().any(|m| n.contains(m)) {
                            return None;
                        }
                        Some(FamilyItem { name: item.to_string(), column: i })
                    })
                    .collect()
            })
            .collect();

        let impressed = &families[Family::SeafoodImpressed.index()];
        let seafood = families[Family::SeafoodEaten.index()]
            .iter()
            .enumerate()
            .map(|(i, item)| SeafoodPair {
                name: item.name.clone(),
                eaten: i,
                impressed: impressed.iter().position(|p| p.name == item.name),
            })
            .collect();

        let schema = SurveySchema { columns, families, seafood };
        for col in schema.missing_columns() {
            warn!("Survey column '{}' not found; its metrics will be empty", col);
        }
        for family in Family::ALL {
            debug!("{:?}: {} items", family, schema.items(family).len());
        }
        schema
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.columns.get(name).copied()
    }

    pub fn items(&self, family: Family) -> &[FamilyItem] {
        self.families
            .get(family.index())
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn seafood(&self) -> &[SeafoodPair] {
        &self.seafood
    }

    fn missing_columns(&self) -> Vec<&'static str> {
        let fixed = [
            COL_HOME,
            COL_AREA,
            COL_GENDER,
            COL_AGE,
            COL_INCOME,
            COL_COMPANION,
            COL_NIGHTS,
            COL_VISITS,
            COL_NPS,
            COL_REVISIT,
            COL_SUSHI_VENUE,
            COL_MASUZUSHI_VENUE,
        ];
        fixed
            .iter()
            .chain(SPEND_COLUMNS.iter())
            .chain(SATISFACTION_COLUMNS.iter())
            .copied()
            .filter(|c| !self.columns.contains_key(*c))
            .collect()
    }

    fn parse_record(&self, rec: &StringRecord) -> Respondent {
        let cell = |name: &str| self.column(name).and_then(|i| rec.get(i));
        let num = |name: &str| parse_f64_safe(cell(name));
        let code = |name: &str| parse_code_safe(cell(name));

        let indicators = Family::ALL
            .iter()
            .map(|f| {
                self.items(*f)
                    .iter()
                    .map(|item| parse_f64_safe(rec.get(item.column)))
                    .collect()
            })
            .collect();

        Respondent {
            region: resolve_region(cell(COL_HOME), code(COL_AREA)),
            gender: code(COL_GENDER),
            age: num(COL_AGE),
            income: num(COL_INCOME),
            companion: code(COL_COMPANION),
            nights: num(COL_NIGHTS),
            visits: num(COL_VISITS),
            spend: SPEND_COLUMNS.map(num),
            satisfaction: SATISFACTION_COLUMNS.map(num),
            nps: num(COL_NPS),
            revisit: num(COL_REVISIT),
            sushi_venue: code(COL_SUSHI_VENUE),
            masuzushi_venue: code(COL_MASUZUSHI_VENUE),
            indicators,
        }
    }
}

/// Resolve a respondent's home region from the raw home-location cell and
/// the home-area code.
///
/// Fukui is either answered by name or filed under area 4 with a home code
/// that collides with another prefecture's; any area-4 row whose code is not
/// one of the genuine area-4 neighbours is Fukui.
pub fn resolve_region(home: Option<&str>, area: Option<i64>) -> Option<Region> {
    let home = home.map(str::trim);
    let mut code = parse_code_safe(home);
    if home == Some(Region::Fukui.label()) {
        code = Some(Region::Fukui.code());
    }
    let neighbour = code.map_or(false, |c| AREA4_NEIGHBOURS.contains(&c));
    if area == Some(FUKUI_AREA) && !neighbour {
        code = Some(Region::Fukui.code());
    }
    code.and_then(Region::from_code)
}

#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub total_rows: usize,
    pub parse_errors: usize,
    pub unrecognized_region: usize,
    pub per_region: Vec<(Region, usize)>,
}

/// Read-only survey handle. Built once per process and passed by reference
/// to every report request.
#[derive(Debug, Clone, Default)]
pub struct SurveyData {
    pub schema: SurveySchema,
    pub records: Vec<Respondent>,
}

impl SurveyData {
    pub fn from_reader<R: Read>(reader: R) -> Result<(Self, LoadReport)> {
        let mut rdr = ReaderBuilder::new().flexible(true).from_reader(reader);
        let schema = SurveySchema::from_headers(rdr.headers()?);

        let mut report = LoadReport::default();
        let mut records = Vec::new();
        for result in rdr.records() {
            report.total_rows += 1;
            let rec = match result {
                Ok(r) => r,
                Err(e) => {
                    debug!("Skipping row {}: {}", report.total_rows, e);
                    report.parse_errors += 1;
                    continue;
                }
            };
            let respondent = schema.parse_record(&rec);
            if respondent.region.is_none() {
                report.unrecognized_region += 1;
            }
            records.push(respondent);
        }

        let data = SurveyData { schema, records };
        report.per_region = Region::ALL
            .iter()
            .map(|r| (*r, data.region_rows(*r).len()))
            .collect();
        Ok((data, report))
    }

    /// Rows from one home region.
    pub fn region_rows(&self, region: Region) -> Vec<&Respondent> {
        self.records
            .iter()
            .filter(|r| r.region == Some(region))
            .collect()
    }

    /// Rows from any recognized region: the comparison baseline.
    pub fn reference_rows(&self) -> Vec<&Respondent> {
        self.records.iter().filter(|r| r.region.is_some()).collect()
    }
}

fn is_remote(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

/// Load the survey from a local CSV path or an http(s) CSV export URL.
pub fn load(source: &str) -> Result<(SurveyData, LoadReport)> {
    info!("Loading survey from {}", source);
    let (data, report) = if is_remote(source) {
        let body = reqwest::blocking::get(source)?.error_for_status()?.text()?;
        SurveyData::from_reader(body.as_bytes())?
    } else {
        SurveyData::from_reader(File::open(source)?)?
    };

    info!(
        "{} rows read, {} skipped as malformed, {} outside the target regions",
        format_int(report.total_rows),
        format_int(report.parse_errors),
        format_int(report.unrecognized_region)
    );
    for (region, n) in &report.per_region {
        debug!("{}: {} rows", region, n);
    }
    Ok((data, report))
}
