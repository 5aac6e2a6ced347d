use crate::assembler::{Report, SectionResult, SectionTable};
use crate::error::Result;
use crate::types::{StatValue, StatsMap};
use crate::util::format_int;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tabled::{builder::Builder, settings::Style};
use tracing::info;

pub const REPORT_TITLE: &str = "富山県観光 セグメント分析レポート";
const FILE_PREFIX: &str = "富山県観光レポート";
const REFERENCE_HEADER: &str = "全体";
const MISSING: &str = "-";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Markdown,
    Json,
    Csv,
    /// Every concrete format.
    All,
}

impl ExportFormat {
    pub const CONCRETE: [ExportFormat; 3] = [ExportFormat::Markdown, ExportFormat::Json, ExportFormat::Csv];

    /// Expand `All` and drop repeats, keeping first-pick order.
    pub fn expand(formats: &[ExportFormat]) -> Vec<ExportFormat> {
        let mut out: Vec<ExportFormat> = Vec::new();
        for f in formats {
            let picks: &[ExportFormat] = match f {
                ExportFormat::All => &Self::CONCRETE,
                other => std::slice::from_ref(other),
            };
            for p in picks {
                if !out.contains(p) {
                    out.push(*p);
                }
            }
        }
        out
    }
}

/// One numbered table row, already formatted.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayRow {
    pub no: usize,
    pub item: String,
    pub values: Vec<String>,
}

fn cell(stats: &StatsMap, key: &str) -> String {
    stats
        .get(key)
        .map(StatValue::to_string)
        .unwrap_or_else(|| MISSING.to_string())
}

/// Rows of one table. Row keys come from the first region, or from the
/// second when the first has no data.
pub fn table_rows(table: &SectionTable) -> Vec<DisplayRow> {
    let source = match &table.secondary {
        Some(b) if table.primary.is_empty() => b,
        _ => &table.primary,
    };
    let ordered;
    let source = if table.layout.rerank {
        ordered = source.sorted_desc();
        &ordered
    } else {
        source
    };
    let limit = table.layout.top_n.unwrap_or(usize::MAX);

    source
        .keys()
        .take(limit)
        .enumerate()
        .map(|(i, key)| {
            let mut values = vec![cell(&table.primary, key)];
            if let Some(b) = &table.secondary {
                values.push(cell(b, key));
            }
            values.push(cell(&table.reference, key));
            DisplayRow { no: i + 1, item: key.to_string(), values }
        })
        .collect()
}

fn value_headers(report: &Report, table: &SectionTable) -> Vec<String> {
    let suffix = if table.layout.percent { "(%)" } else { "" };
    let mut names = vec![report.primary.label()];
    if let Some(b) = report.secondary {
        names.push(b.label());
    }
    names.push(REFERENCE_HEADER);
    names.into_iter().map(|n| format!("{}{}", n, suffix)).collect()
}

/// Markdown table for one section table; `None` when there is nothing to show.
pub fn render_table(report: &Report, table: &SectionTable) -> Option<String> {
    let rows = table_rows(table);
    if rows.is_empty() {
        return None;
    }
    let mut builder = Builder::default();
    let mut header = vec!["No".to_string(), table.layout.item_header.to_string()];
    header.extend(value_headers(report, table));
    builder.push_record(header);
    for row in rows {
        let mut record = vec![row.no.to_string(), row.item];
        record.extend(row.values);
        builder.push_record(record);
    }
    Some(builder.build().with(Style::markdown()).to_string())
}

pub fn section_heading(result: &SectionResult) -> String {
    let top = match result.tables.as_slice() {
        [only] if only.subtitle.is_none() => only.layout.top_n,
        _ => None,
    };
    match top {
        Some(n) => format!("■ {} TOP{}", result.section.label(), n),
        None => format!("■ {}", result.section.label()),
    }
}

fn sample_caption(report: &Report) -> String {
    let s = &report.samples;
    match (report.secondary, s.secondary) {
        (Some(b), Some(nb)) => format!(
            "サンプル数: {}={}件, {}={}件（全体: {}件）",
            report.primary,
            format_int(s.primary),
            b,
            format_int(nb),
            format_int(s.reference)
        ),
        _ => format!(
            "サンプル数: {}件（全体: {}件）",
            format_int(s.primary),
            format_int(s.reference)
        ),
    }
}

/// The full report as Markdown. This is what the terminal shows and what
/// the Markdown export contains.
pub fn render_report(report: &Report) -> String {
    let mut out = String::new();
    match report.secondary {
        Some(b) => {
            let _ = writeln!(out, "# {}（2地域比較）\n", REPORT_TITLE);
            let _ = writeln!(out, "比較対象: {} vs {}\n", report.primary, b);
        }
        None => {
            let _ = writeln!(out, "# {}\n", REPORT_TITLE);
            let _ = writeln!(out, "対象地域: {}\n", report.primary);
        }
    }
    let _ = writeln!(out, "{}\n", sample_caption(report));
    for w in &report.warnings {
        let _ = writeln!(out, "> {}\n", w);
    }

    for result in &report.sections {
        let _ = writeln!(out, "## {}\n", section_heading(result));
        for table in &result.tables {
            if let Some(sub) = table.subtitle {
                let _ = writeln!(out, "**【{}】**\n", sub);
            }
            match render_table(report, table) {
                Some(t) => {
                    let _ = writeln!(out, "{}\n", t);
                }
                None => {
                    let _ = writeln!(out, "(データなし)\n");
                }
            }
        }
    }
    out
}

/// Export document: the rendered report followed by a generation stamp.
pub fn render_document(report: &Report, generated_at: DateTime<Local>) -> String {
    format!(
        "{}---\n\n生成日時: {}\n",
        render_report(report),
        generated_at.format("%Y-%m-%d %H:%M")
    )
}

/// File stem naming the report's region(s).
pub fn export_stem(report: &Report) -> String {
    match report.secondary {
        Some(b) => format!("{}_{}_vs_{}", FILE_PREFIX, report.primary, b),
        None => format!("{}_{}", FILE_PREFIX, report.primary),
    }
}

/// Long-format row for the CSV export: one line per table row.
#[derive(Debug, Serialize)]
pub struct ExportRow {
    #[serde(rename = "Section")]
    pub section: String,
    #[serde(rename = "Table")]
    pub table: String,
    #[serde(rename = "No")]
    pub no: usize,
    #[serde(rename = "Item")]
    pub item: String,
    #[serde(rename = "Primary")]
    pub primary: String,
    #[serde(rename = "Secondary")]
    pub secondary: Option<String>,
    #[serde(rename = "Reference")]
    pub reference: String,
}

pub fn export_rows(report: &Report) -> Vec<ExportRow> {
    let mut out = Vec::new();
    for result in &report.sections {
        for table in &result.tables {
            for row in table_rows(table) {
                let mut values = row.values.into_iter();
                let primary = values.next().unwrap_or_default();
                let secondary = if report.is_comparison() { values.next() } else { None };
                out.push(ExportRow {
                    section: result.section.label().to_string(),
                    table: table.subtitle.unwrap_or_default().to_string(),
                    no: row.no,
                    item: row.item,
                    primary,
                    secondary,
                    reference: values.next().unwrap_or_default(),
                });
            }
        }
    }
    out
}

pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}

/// Write the report in each requested format under `dir`. Returns the
/// written paths.
pub fn export(
    report: &Report,
    dir: &Path,
    formats: &[ExportFormat],
    generated_at: DateTime<Local>,
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;
    let stem = export_stem(report);
    let mut written = Vec::new();
    for format in ExportFormat::expand(formats) {
        let path = match format {
            ExportFormat::Markdown => {
                let path = dir.join(format!("{}.md", stem));
                std::fs::write(&path, render_document(report, generated_at))?;
                path
            }
            ExportFormat::Json => {
                let path = dir.join(format!("{}.json", stem));
                write_json(&path, report)?;
                path
            }
            ExportFormat::Csv => {
                let path = dir.join(format!("{}.csv", stem));
                write_csv(&path, &export_rows(report))?;
                path
            }
            ExportFormat::All => continue,
        };
        info!("Exported {}", path.display());
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::{assemble, Selection};
    use crate::codes::{Region, Section};
    use crate::fixtures::{survey, Row};
    use crate::loader::SurveyData;

    fn data() -> SurveyData {
        let cols = ["1次交通_新幹線", "1次交通_自家用車", "訪問目的_観光", "訪問目的_仕事"];
        let rows = vec![
            Row::toyama().gender(0).nights(1.0).set(cols[0], 0).set(cols[1], 1).set(cols[2], 1).set(cols[3], 0).spend([1000, 2000, 0, 0, 0]),
            Row::toyama().gender(1).nights(2.0).set(cols[0], 0).set(cols[1], 1).set(cols[2], 0).set(cols[3], 1).spend([500, 500, 9000, 0, 0]),
            Row::new().home(2).area(2).gender(1).set(cols[0], 1).set(cols[1], 0).set(cols[2], 1).set(cols[3], 1),
        ];
        survey(&cols, &rows)
    }

    fn report(picks: &[Section], secondary: Option<Region>) -> Report {
        let sel = Selection::from_sections(picks.iter().copied());
        assemble(&data(), &sel, Region::Toyama, secondary).unwrap()
    }

    #[test]
    fn test_rows_are_numbered_with_reference_column() {
        let r = report(&[Section::Travel], None);
        let rows = table_rows(&r.sections[0].tables[0]);
        assert_eq!(rows[0].no, 1);
        assert_eq!(rows[0].item, "宿泊率(%)");
        assert_eq!(rows[0].values, vec!["100.0", "66.7"]);
        assert_eq!(rows.len(), 5);
    }

    #[test]
    fn test_transport_rows_are_reranked() {
        let r = report(&[Section::Transport], None);
        let rows = table_rows(&r.sections[0].tables[0]);
        let items: Vec<&str> = rows.iter().map(|r| r.item.as_str()).collect();
        assert_eq!(items, vec!["自家用車", "新幹線"]);
    }

    #[test]
    fn test_comparison_uses_second_region_keys_when_first_empty() {
        let sel = Selection::from_sections([Section::Purpose]);
        let r = assemble(&data(), &sel, Region::Fukui, Some(Region::Tokyo)).unwrap();
        let rows = table_rows(&r.sections[0].tables[0]);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].values, vec!["-", "100.0", "66.7"]);
    }

    #[test]
    fn test_render_table_headers() {
        let r = report(&[Section::Purpose], Some(Region::Tokyo));
        let table = render_table(&r, &r.sections[0].tables[0]).unwrap();
        let header = table.lines().next().unwrap();
        assert!(header.contains("訪問目的"));
        assert!(header.contains("富山県(%)"));
        assert!(header.contains("東京都(%)"));
        assert!(header.contains("全体(%)"));
    }

    #[test]
    fn test_section_heading() {
        let r = report(&[Section::Purpose, Section::Transport, Section::Basic], None);
        assert_eq!(section_heading(&r.sections[0]), "■ 訪問目的 TOP10");
        assert_eq!(section_heading(&r.sections[1]), "■ 交通手段");
        assert_eq!(section_heading(&r.sections[2]), "■ 基本属性");
    }

    #[test]
    fn test_render_report_titles() {
        let single = render_report(&report(&[Section::Basic], None));
        assert!(single.starts_with("# 富山県観光 セグメント分析レポート\n"));
        assert!(single.contains("対象地域: 富山県"));
        assert!(single.contains("サンプル数: 2件（全体: 3件）"));

        let dual = render_report(&report(&[Section::Basic], Some(Region::Tokyo)));
        assert!(dual.contains("（2地域比較）"));
        assert!(dual.contains("比較対象: 富山県 vs 東京都"));
        assert!(dual.contains("富山県=2件, 東京都=1件"));
    }

    #[test]
    fn test_empty_table_is_marked() {
        let r = report(&[Section::Seafood], None);
        let text = render_report(&r);
        assert!(text.contains("**【喫食率】**\n\n(データなし)"));
    }

    #[test]
    fn test_document_matches_screen() {
        let r = report(&[Section::Basic, Section::Expense], None);
        let doc = render_document(&r, Local::now());
        assert!(doc.starts_with(&render_report(&r)));
        assert!(doc.contains("生成日時: "));
    }

    #[test]
    fn test_export_stem_names_regions() {
        assert_eq!(export_stem(&report(&[Section::Basic], None)), "富山県観光レポート_富山県");
        assert_eq!(
            export_stem(&report(&[Section::Basic], Some(Region::Osaka))),
            "富山県観光レポート_富山県_vs_大阪府"
        );
    }

    #[test]
    fn test_export_rows_cover_every_table_row() {
        let r = report(&[Section::Travel, Section::Transport], Some(Region::Tokyo));
        let rows = export_rows(&r);
        let expected: usize = r
            .sections
            .iter()
            .flat_map(|s| s.tables.iter())
            .map(|t| table_rows(t).len())
            .sum();
        assert_eq!(rows.len(), expected);
        assert!(rows.iter().all(|row| row.secondary.is_some()));
        assert_eq!(rows[0].section, "旅行行動");
    }

    #[test]
    fn test_export_writes_files() {
        let dir = std::env::temp_dir().join(format!("toyama_report_test_{}", std::process::id()));
        let r = report(&[Section::Basic], None);
        let written = export(
            &r,
            &dir,
            &[ExportFormat::Markdown, ExportFormat::Json, ExportFormat::Csv],
            Local::now(),
        )
        .unwrap();
        assert_eq!(written.len(), 3);
        let md = std::fs::read_to_string(&written[0]).unwrap();
        assert!(md.starts_with(&render_report(&r)));
        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&written[1]).unwrap()).unwrap();
        assert_eq!(json["primary"], "富山県");
        assert_eq!(json["sections"][0]["section"], "basic");
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_expand_all_formats() {
        assert_eq!(
            ExportFormat::expand(&[ExportFormat::Json, ExportFormat::All]),
            vec![ExportFormat::Json, ExportFormat::Markdown, ExportFormat::Csv]
        );
        assert_eq!(ExportFormat::expand(&[ExportFormat::Csv, ExportFormat::Csv]), vec![ExportFormat::Csv]);
    }

    #[test]
    fn test_export_all_writes_every_format() {
        let dir = std::env::temp_dir().join(format!("toyama_report_all_{}", std::process::id()));
        let r = report(&[Section::Basic], Some(Region::Tokyo));
        let written = export(&r, &dir, &[ExportFormat::All], Local::now()).unwrap();
        let names: Vec<String> = written
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            vec![
                "富山県観光レポート_富山県_vs_東京都.md",
                "富山県観光レポート_富山県_vs_東京都.json",
                "富山県観光レポート_富山県_vs_東京都.csv",
            ]
        );
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
