//! Configuration resolution.
//!
//! Priority order for every setting:
//! 1. Command-line flag, or its environment variable (`TOYAMA_REPORT_DATA`,
//!    `TOYAMA_REPORT_OUTPUT`) as resolved by clap
//! 2. TOML config file
//! 3. Compiled default

use crate::codes::Section;
use crate::error::{Error, Result};
use crate::output::ExportFormat;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_DATA_SOURCE: &str = "survey.csv";
pub const DEFAULT_OUTPUT_DIR: &str = ".";

/// Contents of the optional TOML config file. Every key may be omitted.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub data_source: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub default_sections: Option<Vec<String>>,
    pub export_formats: Option<Vec<ExportFormat>>,
}

impl FileConfig {
    pub fn from_toml(text: &str) -> Result<Self> {
        let cfg: FileConfig = toml::from_str(text)?;
        if let Some(sections) = &cfg.default_sections {
            if let Some(bad) = sections.iter().find(|s| Section::parse(s).is_none()) {
                return Err(Error::Config(format!("unknown section '{}' in default_sections", bad)));
            }
        }
        Ok(cfg)
    }

    pub fn load(path: &Path) -> Result<Self> {
        debug!("Reading config file {}", path.display());
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }
}

/// Values given on the command line; `None` means "not given".
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub data_source: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub sections: Option<Vec<String>>,
    pub export_formats: Option<Vec<ExportFormat>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub data_source: String,
    pub output_dir: PathBuf,
    /// Section names as given; resolved through `Selection::parse`.
    pub sections: Vec<String>,
    pub export_formats: Vec<ExportFormat>,
}

impl Settings {
    pub fn resolve(cli: CliOverrides, file: FileConfig) -> Self {
        Settings {
            data_source: cli
                .data_source
                .or(file.data_source)
                .unwrap_or_else(|| DEFAULT_DATA_SOURCE.to_string()),
            output_dir: cli
                .output_dir
                .or(file.output_dir)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
            sections: cli.sections.or(file.default_sections).unwrap_or_else(|| {
                Section::DEFAULT.iter().map(|s| s.id().to_string()).collect()
            }),
            export_formats: cli
                .export_formats
                .or(file.export_formats)
                .unwrap_or_else(|| vec![ExportFormat::Markdown]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = Settings::resolve(CliOverrides::default(), FileConfig::default());
        assert_eq!(s.data_source, DEFAULT_DATA_SOURCE);
        assert_eq!(s.output_dir, PathBuf::from("."));
        assert_eq!(s.sections, vec!["basic", "purpose", "satisfaction"]);
        assert_eq!(s.export_formats, vec![ExportFormat::Markdown]);
    }

    #[test]
    fn test_file_overrides_defaults_and_cli_overrides_file() {
        let file = FileConfig::from_toml(
            r#"
            data_source = "https://example.com/survey.csv"
            output_dir = "reports"
            default_sections = ["travel", "海の幸"]
            export_formats = ["json", "csv"]
            "#,
        )
        .unwrap();
        let s = Settings::resolve(CliOverrides::default(), file.clone());
        assert_eq!(s.data_source, "https://example.com/survey.csv");
        assert_eq!(s.output_dir, PathBuf::from("reports"));
        assert_eq!(s.sections, vec!["travel", "海の幸"]);
        assert_eq!(s.export_formats, vec![ExportFormat::Json, ExportFormat::Csv]);

        let cli = CliOverrides {
            data_source: Some("local.csv".into()),
            sections: Some(vec!["sushi".into()]),
            ..Default::default()
        };
        let s = Settings::resolve(cli, file);
        assert_eq!(s.data_source, "local.csv");
        assert_eq!(s.sections, vec!["sushi"]);
        assert_eq!(s.output_dir, PathBuf::from("reports"));
    }

    #[test]
    fn test_rejects_unknown_section_and_key() {
        assert!(matches!(
            FileConfig::from_toml(r#"default_sections = ["weather"]"#),
            Err(Error::Config(_))
        ));
        assert!(matches!(FileConfig::from_toml("colour = 1"), Err(Error::Config(_))));
    }

    #[test]
    fn test_all_export_format_accepted() {
        let file = FileConfig::from_toml(r#"export_formats = ["all"]"#).unwrap();
        assert_eq!(file.export_formats, Some(vec![ExportFormat::All]));
    }
}
