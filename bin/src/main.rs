//! CLI for the fd-event-study engine.
//!
//! Loads a JSON study configuration, reads daily prices from a directory of
//! `<TICKER>.csv` files and writes one JSON report per window to stdout.

use clap::{Parser, Subcommand, ValueEnum};
use fd_event_study::{
    BatchReport, BatchRunner, CsvDirectorySource, PriceSource, SignificanceTester, SkippedEvent,
    SortKey, StudyConfig, SummaryTable, TestOutcome, WindowSpec,
};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "fd-event-study")]
#[command(about = "Event studies of abnormal returns around corporate events", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the configured study
    Run {
        /// Study configuration (JSON)
        #[arg(long)]
        config: PathBuf,
        /// Directory of `<TICKER>.csv` price files
        #[arg(long)]
        data_dir: PathBuf,
        /// Only run the window with this label
        #[arg(long)]
        window: Option<String>,
        /// Sort each summary table instead of keeping input order
        #[arg(long, value_enum)]
        sort: Option<SortArg>,
    },
    /// Check a configuration without fetching anything
    Validate {
        /// Study configuration (JSON)
        #[arg(long)]
        config: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SortArg {
    Ticker,
    Date,
}

impl From<SortArg> for SortKey {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Ticker => Self::Ticker,
            SortArg::Date => Self::EventDate,
        }
    }
}

/// Report written for one window.
#[derive(Debug, Serialize)]
struct WindowOutput {
    window: WindowSpec,
    summary: SummaryTable,
    skipped: Vec<SkippedEvent>,
    volatility_shift: Option<TestOutcome>,
}

impl WindowOutput {
    fn new(report: BatchReport, sort: Option<SortKey>, tester: &SignificanceTester) -> Self {
        let mut summary = report.summary;
        if let Some(key) = sort {
            summary.sort_by(key);
        }
        let volatility_shift = summary.volatility_shift_test(tester).ok();
        Self {
            window: report.window,
            summary,
            skipped: report.skipped,
            volatility_shift,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fd_event_study=info,fd_event_study_bin=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let outcome = match cli.command {
        Commands::Run {
            config,
            data_dir,
            window,
            sort,
        } => run(config, data_dir, window, sort.map(SortKey::from)).await,
        Commands::Validate { config } => validate(config),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(path: PathBuf) -> fd_event_study::Result<StudyConfig> {
    let config = StudyConfig::from_path(&path)?;
    config.validate()?;
    info!(path = %path.display(), events = config.events.len(), "configuration loaded");
    Ok(config)
}

fn validate(path: PathBuf) -> fd_event_study::Result<()> {
    let config = load_config(path)?;
    let range = config.fetch_range()?;
    println!(
        "ok: {} events, {} windows, history {} to {}",
        config.events.len(),
        config.windows.len(),
        range.start,
        range.end
    );
    Ok(())
}

async fn run(
    config: PathBuf,
    data_dir: PathBuf,
    window: Option<String>,
    sort: Option<SortKey>,
) -> fd_event_study::Result<()> {
    let mut config = load_config(config)?;
    if let Some(label) = window {
        config.windows.retain(|w| w.label == label);
        if config.windows.is_empty() {
            return Err(fd_event_study::EventStudyError::InvalidConfig(format!(
                "no window labelled {label}"
            )));
        }
    }

    let outputs = study(CsvDirectorySource::new(data_dir), config, sort).await?;
    println!("{}", serde_json::to_string_pretty(&outputs)?);
    Ok(())
}

async fn study<S: PriceSource>(
    source: S,
    config: StudyConfig,
    sort: Option<SortKey>,
) -> fd_event_study::Result<Vec<WindowOutput>> {
    let tester = SignificanceTester::new(config.test_direction);
    let runner = BatchRunner::new(source, config)?;
    let reports = runner.run_all().await?;
    Ok(reports
        .into_iter()
        .map(|r| WindowOutput::new(r, sort, &tester))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, NaiveDate};
    use fd_event_study::{DateRange, EventSpec, InMemorySource};
    use polars::df;
    use polars::prelude::DataFrame;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, m, d).unwrap()
    }

    /// Weekday closes from May through July cycling over `pattern`.
    fn prices(pattern: &[f64]) -> DataFrame {
        let days: Vec<NaiveDate> = date(5, 1)
            .iter_days()
            .take_while(|d| *d <= date(7, 31))
            .filter(|d| d.weekday().number_from_monday() <= 5)
            .collect();
        let closes: Vec<f64> = (0..days.len()).map(|i| pattern[i % pattern.len()]).collect();
        let volumes = vec![1_000.0; days.len()];
        df! {
            "date" => days.iter().map(|d| d.to_string()).collect::<Vec<_>>(),
            "close" => closes,
            "volume" => volumes,
        }
        .unwrap()
    }

    #[test]
    fn test_cli_parses_run() {
        let cli = Cli::try_parse_from([
            "fd-event-study",
            "run",
            "--config",
            "study.json",
            "--data-dir",
            "prices",
            "--sort",
            "date",
        ])
        .unwrap();
        match cli.command {
            Commands::Run { sort, window, .. } => {
                assert!(matches!(sort, Some(SortArg::Date)));
                assert!(window.is_none());
            }
            Commands::Validate { .. } => panic!("expected run"),
        }
    }

    #[test]
    fn test_sort_arg_mapping() {
        assert_eq!(SortKey::from(SortArg::Ticker), SortKey::Ticker);
        assert_eq!(SortKey::from(SortArg::Date), SortKey::EventDate);
    }

    #[tokio::test]
    async fn test_study_sorts_and_tests_volatility() {
        let config = StudyConfig {
            events: vec![
                EventSpec::new("B", date(6, 15)),
                EventSpec::new("A", date(6, 22)),
                EventSpec::new("C", date(6, 17)),
                EventSpec::new("NONE", date(6, 15)),
            ],
            history: Some(DateRange::new(date(5, 1), date(7, 31)).unwrap()),
            windows: vec![WindowSpec::new("1w", 7)],
            ..Default::default()
        };
        let source = InMemorySource::new()
            .with("^GSPC", prices(&[3_000.0, 3_010.0, 2_990.0, 3_020.0]))
            .with("A", prices(&[10.0, 10.5, 10.2, 10.9, 11.1]))
            .with("B", prices(&[50.0, 49.0, 51.5, 50.5]))
            .with("C", prices(&[20.0, 20.4, 19.8, 20.1, 20.0, 20.6]));

        let outputs = study(source, config, Some(SortKey::Ticker)).await.unwrap();
        assert_eq!(outputs.len(), 1);
        let tickers: Vec<_> = outputs[0].summary.iter().map(|r| r.ticker.as_str()).collect();
        assert_eq!(tickers, ["A", "B", "C"]);
        assert_eq!(outputs[0].skipped.len(), 1);
        assert_eq!(outputs[0].volatility_shift.unwrap().observations, 3);
    }
}
