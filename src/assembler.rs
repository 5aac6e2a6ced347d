use crate::codes::{Region, Section};
use crate::error::{Error, Result};
use crate::loader::SurveyData;
use crate::reports::{self, PairedStats};
use crate::types::{Respondent, StatsMap};
use serde::Serialize;
use std::vec;
use tracing::{debug, info, warn};

/// Upper bound on sections per report; later picks are dropped.
pub const MAX_SECTIONS: usize = 5;

/// The user's section picks after deduplication and truncation.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    sections: Vec<Section>,
    warnings: Vec<String>,
}

impl Default for Selection {
    fn default() -> Self {
        Selection::from_sections(Section::DEFAULT)
    }
}

impl Selection {
    /// Keeps first occurrences in pick order, then cuts to `MAX_SECTIONS`.
    pub fn from_sections<I>(picks: I) -> Self
    where
        I: IntoIterator<Item = Section>,
    {
        let mut sections: Vec<Section> = Vec::new();
        for s in picks {
            if !sections.contains(&s) {
                sections.push(s);
            }
        }
        let mut warnings = Vec::new();
        if sections.len() > MAX_SECTIONS {
            warn!(
                "{} sections selected; keeping the first {}",
                sections.len(),
                MAX_SECTIONS
            );
            warnings.push(format!(
                "⚠️ {}項目が選択されています。最初の{}項目のみ表示されます。",
                sections.len(),
                MAX_SECTIONS
            ));
            sections.truncate(MAX_SECTIONS);
        }
        Selection { sections, warnings }
    }

    /// Section ids or labels; unknown names are skipped.
    pub fn parse<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let picks: Vec<Section> = names
            .into_iter()
            .filter_map(|n| {
                let n = n.as_ref();
                let parsed = Section::parse(n);
                if parsed.is_none() && !n.trim().is_empty() {
                    debug!("Ignoring unknown section '{}'", n);
                }
                parsed
            })
            .collect();
        Selection::from_sections(picks)
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// User-facing notices produced while building the selection.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

/// How a table is laid out on screen and in exports.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TableLayout {
    /// Header of the metric column.
    pub item_header: &'static str,
    /// Values are percentages; value headers get a `(%)` suffix.
    pub percent: bool,
    /// Only the first `n` rows are shown.
    pub top_n: Option<usize>,
    /// Rows are re-ranked by the first region's values before cutting.
    pub rerank: bool,
}

impl TableLayout {
    const fn metrics(item_header: &'static str) -> Self {
        TableLayout { item_header, percent: false, top_n: None, rerank: false }
    }

    const fn rates(item_header: &'static str) -> Self {
        TableLayout { item_header, percent: true, top_n: None, rerank: false }
    }

    const fn ranking(item_header: &'static str, top_n: usize, rerank: bool) -> Self {
        TableLayout { item_header, percent: true, top_n: Some(top_n), rerank }
    }
}

/// Table titles and layouts of a section, in display order.
pub fn section_layout(section: Section) -> Vec<(Option<&'static str>, TableLayout)> {
    match section {
        Section::Basic | Section::Travel => vec![(None, TableLayout::metrics("指標"))],
        Section::Expense | Section::Satisfaction => vec![(None, TableLayout::metrics("項目"))],
        Section::Transport => vec![
            (Some("1次交通"), TableLayout::ranking("交通手段", 8, true)),
            (Some("県内交通"), TableLayout::ranking("交通手段", 8, true)),
        ],
        Section::Purpose => vec![(None, TableLayout::ranking("訪問目的", 10, false))],
        Section::InfoSource => vec![
            (Some("デジタル"), TableLayout::ranking("情報源", 8, false)),
            (Some("非デジタル"), TableLayout::ranking("情報源", 8, false)),
        ],
        Section::Visited => vec![(None, TableLayout::ranking("訪問先", 10, false))],
        Section::Seafood => vec![
            (Some("喫食率"), TableLayout::rates("海の幸")),
            (Some("感動率"), TableLayout::rates("海の幸")),
        ],
        Section::Sushi => vec![
            (Some("寿司"), TableLayout::rates("項目")),
            (Some("ます寿し"), TableLayout::rates("項目")),
        ],
    }
}

fn pair(p: PairedStats) -> Vec<StatsMap> {
    vec![p.first, p.second]
}

/// Run the aggregator of `section` over `rows`; one map per table.
pub fn compute(section: Section, data: &SurveyData, rows: &[&Respondent]) -> Vec<StatsMap> {
    let schema = &data.schema;
    match section {
        Section::Basic => vec![reports::basic_stats(rows)],
        Section::Travel => vec![reports::travel_stats(rows)],
        Section::Transport => pair(reports::transport_stats(rows, schema)),
        Section::Purpose => vec![reports::purpose_stats(rows, schema)],
        Section::InfoSource => pair(reports::info_source_stats(rows, schema)),
        Section::Visited => vec![reports::visited_stats(rows, schema)],
        Section::Expense => vec![reports::expense_stats(rows)],
        Section::Satisfaction => vec![reports::satisfaction_stats(rows)],
        Section::Seafood => pair(reports::seafood_stats(rows, schema)),
        Section::Sushi => pair(reports::sushi_stats(rows)),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionTable {
    pub subtitle: Option<&'static str>,
    pub layout: TableLayout,
    pub primary: StatsMap,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary: Option<StatsMap>,
    pub reference: StatsMap,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionResult {
    pub section: Section,
    pub tables: Vec<SectionTable>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleSizes {
    pub primary: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary: Option<usize>,
    pub reference: usize,
}

/// Everything one report request produced, ready for rendering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub primary: Region,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary: Option<Region>,
    pub samples: SampleSizes,
    pub sections: Vec<SectionResult>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl Report {
    pub fn is_comparison(&self) -> bool {
        self.secondary.is_some()
    }
}

/// Build a report for `primary` (and `secondary` in comparison mode) against
/// the reference population of all recognized regions.
pub fn assemble(
    data: &SurveyData,
    selection: &Selection,
    primary: Region,
    secondary: Option<Region>,
) -> Result<Report> {
    if selection.is_empty() {
        return Err(Error::NothingSelected);
    }
    if secondary == Some(primary) {
        return Err(Error::InvalidInput(format!(
            "comparison regions must differ (both are {})",
            primary
        )));
    }

    let rows_a = data.region_rows(primary);
    let rows_b = secondary.map(|r| data.region_rows(r));
    let reference = data.reference_rows();
    info!(
        "Assembling {} section(s) for {}{} ({} rows, reference {})",
        selection.sections().len(),
        primary,
        secondary.map(|r| format!(" vs {}", r)).unwrap_or_default(),
        rows_a.len(),
        reference.len()
    );

    let sections = selection
        .sections()
        .iter()
        .map(|&section| {
            let mut a = compute(section, data, &rows_a).into_iter();
            let mut b: Option<vec::IntoIter<StatsMap>> = rows_b
                .as_ref()
                .map(|rows| compute(section, data, rows).into_iter());
            let mut r = compute(section, data, &reference).into_iter();
            let tables = section_layout(section)
                .into_iter()
                .map(|(subtitle, layout)| SectionTable {
                    subtitle,
                    layout,
                    primary: a.next().unwrap_or_default(),
                    secondary: b.as_mut().map(|it| it.next().unwrap_or_default()),
                    reference: r.next().unwrap_or_default(),
                })
                .collect();
            SectionResult { section, tables }
        })
        .collect();

    Ok(Report {
        primary,
        secondary,
        samples: SampleSizes {
            primary: rows_a.len(),
            secondary: rows_b.as_ref().map(|r| r.len()),
            reference: reference.len(),
        },
        sections,
        warnings: selection.warnings().to_vec(),
    })
}
