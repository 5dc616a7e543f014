//! CLI definition and dispatch.

use clap::{ArgAction, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::adapters::csv_adapter::CsvPanelAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{run_backtest, BacktestResult};
use crate::domain::config_validation::{load_run_config, DataConfig, RunConfig};
use crate::domain::error::MeanrevError;
use crate::domain::features::{compute_feature_table, FeatureParams, FeatureTable};
use crate::domain::metrics::Metrics;
use crate::domain::selector::CompositeRanker;
use crate::ports::panel_port::PanelPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "meanrev", about = "Mean-reversion basket backtester")]
pub struct Cli {
    /// Increase log verbosity (RUST_LOG overrides)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the backtest over a price panel
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Price history CSV, overrides [data] panel
        #[arg(long)]
        panel: Option<PathBuf>,
        /// Symbol-name CSV, overrides [data] names
        #[arg(long)]
        names: Option<PathBuf>,
        /// Where to write the return series
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Where to write the per-step basket
        #[arg(long)]
        selection_log: Option<PathBuf>,
    },
    /// Compute and export the feature table
    Features {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        panel: Option<PathBuf>,
        #[arg(long)]
        names: Option<PathBuf>,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

/// Output files of a backtest run; `None` skips the file.
#[derive(Debug, Clone, Default)]
pub struct Outputs {
    pub returns: Option<PathBuf>,
    pub selection_log: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct BacktestOutcome {
    pub result: BacktestResult,
    pub metrics: Metrics,
}

pub fn init_tracing(verbose: u8) {
    let level = if verbose > 0 { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    // a subscriber may already be installed (tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn run(cli: Cli) -> ExitCode {
    init_tracing(cli.verbose);

    let outcome = match cli.command {
        Command::Backtest {
            config,
            panel,
            names,
            output,
            selection_log,
        } => run_backtest_command(
            &config,
            panel.as_deref(),
            names.as_deref(),
            Outputs {
                returns: output,
                selection_log,
            },
        ),
        Command::Features {
            config,
            panel,
            names,
            output,
        } => run_features_command(&config, panel.as_deref(), names.as_deref(), &output),
        Command::Validate { config } => run_validate(&config),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<RunConfig, MeanrevError> {
    info!(path = %path.display(), "loading config");
    let adapter = FileConfigAdapter::from_file(path)?;
    load_run_config(&adapter)
}

/// Builds the panel adapter from config, with command-line paths taking precedence.
pub fn panel_adapter(
    data: &DataConfig,
    panel: Option<&Path>,
    names: Option<&Path>,
) -> Result<CsvPanelAdapter, MeanrevError> {
    let panel_path = match (panel, &data.panel) {
        (Some(p), _) => p.to_path_buf(),
        (None, Some(p)) => PathBuf::from(p),
        (None, None) => {
            return Err(MeanrevError::ConfigMissing {
                section: "data".into(),
                key: "panel".into(),
            })
        }
    };

    let adapter = CsvPanelAdapter::new(panel_path);
    let names_path = names
        .map(Path::to_path_buf)
        .or_else(|| data.names.as_ref().map(PathBuf::from));
    Ok(match names_path {
        Some(path) => adapter.with_names(path, data.name_column.clone()),
        None => adapter,
    })
}

fn path_str(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

pub fn run_backtest_pipeline(
    panel_port: &dyn PanelPort,
    report: &dyn ReportPort,
    run: &RunConfig,
    outputs: &Outputs,
) -> Result<BacktestOutcome, MeanrevError> {
    let panel = panel_port.load_panel()?;
    let config = &run.backtest;
    let features = compute_feature_table(&panel, &config.features);
    let ranker = CompositeRanker::new(config.selection_size, config.features.clone());

    let result = match run_backtest(&panel, &features, &ranker, config) {
        Ok(result) => result,
        Err(failure) => {
            if !failure.partial.returns.is_empty() {
                if let Some(path) = &outputs.returns {
                    warn!(
                        periods = failure.partial.returns.len(),
                        "writing partial return series"
                    );
                    report.write_returns(&failure.partial.returns, &path_str(path))?;
                }
            }
            return Err(failure.error);
        }
    };

    if let Some(path) = &outputs.returns {
        report.write_returns(&result.returns, &path_str(path))?;
        info!(path = %path.display(), "wrote return series");
    }
    if let Some(path) = &outputs.selection_log {
        report.write_selection_log(&result.steps, &path_str(path))?;
        info!(path = %path.display(), "wrote selection log");
    }

    let metrics = Metrics::compute(&result, run.periods_per_year);
    Ok(BacktestOutcome { result, metrics })
}

pub fn run_features_pipeline(
    panel_port: &dyn PanelPort,
    report: &dyn ReportPort,
    params: &FeatureParams,
    output: &Path,
) -> Result<FeatureTable, MeanrevError> {
    let panel = panel_port.load_panel()?;
    if panel.is_empty() {
        return Err(MeanrevError::EmptyPanel {
            reason: "no price observations".into(),
        });
    }
    let table = compute_feature_table(&panel, params);
    report.write_features(&table, &path_str(output))?;
    info!(path = %output.display(), symbols = table.symbol_count(), "wrote feature table");
    Ok(table)
}

pub fn print_summary(metrics: &Metrics, result: &BacktestResult) {
    println!("=== Backtest Results ===");
    println!("Periods:            {}", metrics.periods);
    println!("Total Return:       {:.2}%", metrics.total_return * 100.0);
    println!("Annualized Return:  {:.2}%", metrics.annualized_return * 100.0);
    println!("Annualized Vol:     {:.2}%", metrics.annualized_volatility * 100.0);
    println!("Sharpe Ratio:       {:.2}", metrics.sharpe_ratio);
    println!("Sortino Ratio:      {:.2}", metrics.sortino_ratio);
    println!("Max Drawdown:       -{:.1}%", metrics.max_drawdown * 100.0);
    println!("Max DD Duration:    {} periods", metrics.max_drawdown_duration);
    println!("Avg Basket Size:    {:.1}", metrics.avg_basket_size);
    println!("Final Value:        {:.4}", result.final_value);
}

fn run_backtest_command(
    config_path: &Path,
    panel: Option<&Path>,
    names: Option<&Path>,
    outputs: Outputs,
) -> Result<(), MeanrevError> {
    let run = load_config(config_path)?;
    let adapter = panel_adapter(&run.data, panel, names)?;
    let outcome = run_backtest_pipeline(&adapter, &CsvReportAdapter, &run, &outputs)?;
    print_summary(&outcome.metrics, &outcome.result);
    Ok(())
}

fn run_features_command(
    config_path: &Path,
    panel: Option<&Path>,
    names: Option<&Path>,
    output: &Path,
) -> Result<(), MeanrevError> {
    let run = load_config(config_path)?;
    let adapter = panel_adapter(&run.data, panel, names)?;
    run_features_pipeline(&adapter, &CsvReportAdapter, &run.backtest.features, output)?;
    Ok(())
}

fn run_validate(config_path: &Path) -> Result<(), MeanrevError> {
    let run = load_config(config_path)?;
    let bt = &run.backtest;
    println!("Config validated successfully");
    println!(
        "  panel:          {}",
        run.data.panel.as_deref().unwrap_or("(not set)")
    );
    println!(
        "  names:          {}",
        run.data.names.as_deref().unwrap_or("(not set)")
    );
    println!("  lookback:       {}", bt.features.lookback_window);
    println!(
        "  macd:           {}/{}/{} (warmup {})",
        bt.features.macd.fast,
        bt.features.macd.slow,
        bt.features.macd.signal,
        bt.features.macd.warmup()
    );
    println!("  selection size: {}", bt.selection_size);
    println!("  position size:  {}", bt.nominal_position_size);
    println!("  liquidation:    {}", bt.liquidation);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_backtest_args() {
        let cli = Cli::parse_from([
            "meanrev",
            "-v",
            "backtest",
            "--config",
            "run.ini",
            "--output",
            "returns.csv",
        ]);
        assert_eq!(cli.verbose, 1);
        match cli.command {
            Command::Backtest {
                config,
                output,
                panel,
                ..
            } => {
                assert_eq!(config, PathBuf::from("run.ini"));
                assert_eq!(output, Some(PathBuf::from("returns.csv")));
                assert_eq!(panel, None);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn features_requires_output() {
        assert!(Cli::try_parse_from(["meanrev", "features", "--config", "run.ini"]).is_err());
    }

    #[test]
    fn panel_adapter_requires_a_panel() {
        let err = panel_adapter(&DataConfig::default(), None, None).err().unwrap();
        assert!(matches!(err, MeanrevError::ConfigMissing { key, .. } if key == "panel"));
    }

    #[test]
    fn panel_adapter_prefers_command_line() {
        let data = DataConfig {
            panel: Some("from_config.csv".into()),
            ..DataConfig::default()
        };
        assert!(panel_adapter(&data, Some(Path::new("cli.csv")), None).is_ok());
        assert!(panel_adapter(&data, None, None).is_ok());
    }
}
