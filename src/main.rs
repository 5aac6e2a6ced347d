// Entry point and high-level CLI flow.
//
// With `--region` the binary builds one report and exits. Without it, an
// interactive menu lets the user load the survey once and generate as many
// reports as they like:
// - Option [1] loads the survey and prints load diagnostics.
// - Option [2] asks for mode, region(s) and sections, prints the report
//   and writes the configured exports.
// - After a report the user can go back to the menu or exit.
mod assembler;
mod codes;
mod config;
mod error;
#[cfg(test)]
mod fixtures;
mod loader;
mod output;
mod reports;
mod types;
mod util;

use anyhow::Context;
use assembler::Selection;
use clap::Parser;
use codes::{Region, Section};
use config::{CliOverrides, FileConfig, Settings};
use loader::SurveyData;
use output::ExportFormat;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "toyama_survey_report")]
#[command(about = "Toyama tourism survey segment report by visitor home region")]
struct Args {
    /// Survey CSV path or http(s) CSV export URL
    #[arg(long, env = "TOYAMA_REPORT_DATA")]
    data: Option<String>,

    /// TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Home region to report on (富山県, toyama or 1); omit for the interactive menu
    #[arg(long)]
    region: Option<Region>,

    /// Second region for a two-region comparison
    #[arg(long, requires = "region")]
    compare: Option<Region>,

    /// Comma-separated section ids or labels (at most 5 are used)
    #[arg(long, value_delimiter = ',')]
    sections: Option<Vec<String>>,

    /// Directory for exported reports
    #[arg(long, env = "TOYAMA_REPORT_OUTPUT")]
    export_dir: Option<PathBuf>,

    /// Export formats, comma-separated (markdown, json, csv or all)
    #[arg(long, value_enum, value_delimiter = ',')]
    format: Option<Vec<ExportFormat>>,

    /// Print the report without writing any export
    #[arg(long)]
    no_export: bool,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// Print `prompt` and read one trimmed line. `None` on end of input.
fn read_input(prompt: &str) -> Option<String> {
    print!("{}", prompt);
    let _ = io::stdout().flush();
    let mut buf = String::new();
    match io::stdin().read_line(&mut buf) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(buf.trim().to_string()),
    }
}

fn read_choice() -> Option<String> {
    read_input("Enter choice: ")
}

/// Ask the user whether to go back to the menu after a report.
///
/// Returns `true` if the user chose `Y`, `false` if they chose `N`.
fn prompt_back_to_menu() -> bool {
    loop {
        let Some(resp) = read_input("Back to Report Selection (Y/N): ") else {
            return false;
        };
        match resp.to_uppercase().as_str() {
            "Y" => return true,
            "N" => return false,
            _ => println!("Invalid choice. Please enter Y or N."),
        }
    }
}

/// Let the user pick one of `regions` by number.
fn prompt_region(title: &str, regions: &[Region]) -> Option<Region> {
    println!("{}", title);
    for (i, r) in regions.iter().enumerate() {
        println!("[{}] {}", i + 1, r);
    }
    loop {
        let choice = read_choice()?;
        match choice.parse::<usize>() {
            Ok(n) if (1..=regions.len()).contains(&n) => return Some(regions[n - 1]),
            _ => println!("Invalid choice. Please enter 1-{}.", regions.len()),
        }
    }
}

fn prompt_sections(settings: &Settings) -> Option<Selection> {
    println!("レポート項目を選択（最大5つ）:");
    for (i, s) in Section::ALL.iter().enumerate() {
        println!("[{}] {}", i + 1, s);
    }
    let line = read_input(&format!(
        "Enter numbers separated by commas (blank = {}): ",
        settings.sections.join(", ")
    ))?;
    if line.is_empty() {
        return Some(Selection::parse(&settings.sections));
    }
    let picks = line.split(',').filter_map(|t| {
        let t = t.trim();
        match t.parse::<usize>() {
            Ok(n) if (1..=Section::ALL.len()).contains(&n) => Some(Section::ALL[n - 1]),
            _ => Section::parse(t),
        }
    });
    Some(Selection::from_sections(picks))
}

/// Build, print and export one report.
fn run_report(
    data: &SurveyData,
    settings: &Settings,
    selection: &Selection,
    primary: Region,
    secondary: Option<Region>,
    write_exports: bool,
) {
    for w in selection.warnings() {
        println!("{}", w);
    }
    let report = match assembler::assemble(data, selection, primary, secondary) {
        Ok(r) => r,
        Err(e) => {
            println!("{}\n", e);
            return;
        }
    };
    println!("{}", output::render_report(&report));

    if write_exports && !settings.export_formats.is_empty() {
        match output::export(
            &report,
            &settings.output_dir,
            &settings.export_formats,
            chrono::Local::now(),
        ) {
            Ok(paths) => {
                for p in paths {
                    println!("(Report exported to {})", p.display());
                }
                println!();
            }
            Err(e) => {
                error!("Export failed: {}", e);
                eprintln!("Write error: {}", e);
            }
        }
    }
}

/// Handle option [1]: load the survey.
fn handle_load(settings: &Settings) -> Option<SurveyData> {
    match loader::load(&settings.data_source) {
        Ok((data, report)) => {
            println!(
                "Processing dataset... ({} rows loaded, {} in the target regions)",
                util::format_int(report.total_rows),
                util::format_int(data.reference_rows().len())
            );
            if report.parse_errors > 0 {
                println!(
                    "Note: {} rows skipped due to parse errors.",
                    util::format_int(report.parse_errors)
                );
            }
            println!();
            Some(data)
        }
        Err(e) => {
            eprintln!("Failed to load survey: {}\n", e);
            None
        }
    }
}

/// Handle option [2]: ask for the report parameters and generate it.
/// Returns `false` when input ended.
fn handle_generate(data: &SurveyData, settings: &Settings) -> bool {
    println!("比較モードを選択:");
    println!("[1] 単一地域レポート");
    println!("[2] 2地域比較レポート");
    let Some(mode) = read_choice() else {
        return false;
    };
    let dual = match mode.as_str() {
        "1" => false,
        "2" => true,
        _ => {
            println!("Invalid choice. Please enter 1 or 2.\n");
            return true;
        }
    };

    let title = if dual { "居住地①を選択:" } else { "居住地を選択:" };
    let Some(primary) = prompt_region(title, &Region::ALL) else {
        return false;
    };
    let secondary = if dual {
        let remaining: Vec<Region> = Region::ALL.iter().copied().filter(|r| *r != primary).collect();
        match prompt_region("居住地②を選択:", &remaining) {
            Some(r) => Some(r),
            None => return false,
        }
    } else {
        None
    };
    let Some(selection) = prompt_sections(settings) else {
        return false;
    };

    println!();
    run_report(data, settings, &selection, primary, secondary, true);
    true
}

fn interactive(settings: &Settings) {
    let mut data: Option<SurveyData> = None;
    loop {
        println!("Select an option:");
        println!("[1] Load the survey data");
        println!("[2] Generate a report\n");
        let Some(choice) = read_choice() else {
            break;
        };
        match choice.as_str() {
            "1" => {
                if let Some(d) = handle_load(settings) {
                    data = Some(d);
                }
            }
            "2" => {
                println!();
                let Some(d) = data.as_ref() else {
                    println!("Error: No data loaded. Please load the survey first (option 1).\n");
                    continue;
                };
                if !handle_generate(d, settings) || !prompt_back_to_menu() {
                    println!("Exiting the program.");
                    break;
                }
            }
            _ => {
                println!("Invalid choice. Please enter 1 or 2.\n");
            }
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let file = match &args.config {
        Some(path) => FileConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => FileConfig::default(),
    };
    let settings = Settings::resolve(
        CliOverrides {
            data_source: args.data.clone(),
            output_dir: args.export_dir.clone(),
            sections: args.sections.clone(),
            export_formats: args.format.clone(),
        },
        file,
    );

    let Some(primary) = args.region else {
        if args.no_export {
            warn!("--no-export only applies together with --region");
        }
        interactive(&settings);
        return Ok(());
    };

    let (data, _) = loader::load(&settings.data_source)
        .with_context(|| format!("loading survey from {}", settings.data_source))?;
    let selection = Selection::parse(&settings.sections);
    run_report(&data, &settings, &selection, primary, args.compare, !args.no_export);
    Ok(())
}
