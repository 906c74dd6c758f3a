//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::config::{AppConfig, DEFAULT_BAR_POINT, DataConfig, DataFormat};
use crate::domain::config_validation::validate_replay_config;
use crate::domain::error::ReplayError;
use crate::domain::price_store::PriceStore;
use crate::domain::simulator::{ReplaySummary, Simulator};
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "fxreplay", about = "Deterministic FX replay and paper-trading engine")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replay a price series through the trading kernel
    Replay {
        #[arg(short, long)]
        config: PathBuf,
        /// Overrides `[data] path`
        #[arg(long)]
        data: Option<PathBuf>,
        /// Overrides `[trading] symbol`
        #[arg(long)]
        symbol: Option<String>,
        /// Directory for trades.csv, equity.csv and summary.csv
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a replay configuration
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show tick count and time range of a data file
    Info {
        #[arg(long)]
        data: PathBuf,
        #[arg(long, default_value = "mt5_ticks")]
        format: String,
        #[arg(long)]
        point: Option<f64>,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Replay {
            config,
            data,
            symbol,
            output,
        } => run_replay(&config, data, symbol, output.as_deref()),
        Command::Validate { config } => run_validate(&config),
        Command::Info {
            data,
            format,
            point,
        } => run_info(&data, &format, point),
    }
}

fn fail(err: &ReplayError) -> ExitCode {
    eprintln!("error: {err}");
    ExitCode::from(err)
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ReplayError> {
    FileConfigAdapter::from_file(path)
}

/// Validate the file and build the typed configuration, applying CLI overrides.
pub fn build_app_config(
    adapter: &FileConfigAdapter,
    data_override: Option<PathBuf>,
    symbol_override: Option<String>,
) -> Result<AppConfig, ReplayError> {
    validate_replay_config(adapter)?;
    let mut app = AppConfig::from_port(adapter)?;

    if let Some(path) = data_override {
        app.data = Some(match app.data.take() {
            Some(existing) => DataConfig { path, ..existing },
            None => DataConfig {
                path,
                format: DataFormat::Mt5Ticks,
                point: DEFAULT_BAR_POINT,
            },
        });
    }
    if let Some(symbol) = symbol_override.filter(|s| !s.trim().is_empty()) {
        app.trading.symbol = symbol.trim().to_string();
    }
    Ok(app)
}

/// Load the configured series through `port`, configure and run to exhaustion.
pub fn execute_replay(
    app: &AppConfig,
    port: &dyn DataPort,
) -> Result<(Simulator, ReplaySummary), ReplayError> {
    let data = app.data.as_ref().ok_or_else(|| ReplayError::ConfigMissing {
        section: "data".to_string(),
        key: "path".to_string(),
    })?;
    let ticks = port.load_ticks(&data.path, data.format)?;

    let mut sim = Simulator::from_config(app);
    sim.load_series(ticks, &app.trading.symbol);
    sim.configure(&app.replay)?;
    let summary = sim.run()?;
    Ok((sim, summary))
}

fn run_replay(
    config_path: &Path,
    data: Option<PathBuf>,
    symbol: Option<String>,
    output: Option<&Path>,
) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(e) => return fail(&e),
    };
    let app = match build_app_config(&adapter, data, symbol) {
        Ok(app) => app,
        Err(e) => return fail(&e),
    };

    let point = app.data.as_ref().map_or(DEFAULT_BAR_POINT, |d| d.point);
    if let Some(data) = &app.data {
        eprintln!("Loading {} data from {}", data.format, data.path.display());
    }
    eprintln!(
        "Replaying {} from {} to {} at {}",
        app.trading.symbol, app.replay.start, app.replay.end, app.replay.frequency
    );

    let (sim, summary) = match execute_replay(&app, &CsvAdapter::new(point)) {
        Ok(result) => result,
        Err(e) => return fail(&e),
    };
    print_summary(&summary);

    if let Some(dir) = output {
        let reporter = CsvReportAdapter::new();
        let ledger = sim.ledger();
        if let Err(e) = reporter.write_all(&summary, ledger.trades(), ledger.equity_curve(), dir) {
            return fail(&e);
        }
        eprintln!("\nReports written to: {}", dir.display());
    }
    ExitCode::SUCCESS
}

pub fn print_summary(summary: &ReplaySummary) {
    let m = &summary.metrics;
    eprintln!("\n=== Replay Results ===");
    eprintln!("Steps:            {}", summary.steps);
    eprintln!("Total Trades:     {}", summary.trades);
    eprintln!("Forced Closes:    {}", summary.forced_closes);
    eprintln!("Rejected Actions: {}", summary.rejections);
    eprintln!("Balance:          {:.2}", summary.balance);
    eprintln!("Equity:           {:.2}", summary.equity);
    eprintln!("Realized P&L:     {:.2}", summary.realized_pl);
    eprintln!("Total Return:     {:.2}%", m.total_return * 100.0);
    eprintln!("Max Drawdown:     -{:.1}%", m.max_drawdown * 100.0);
    eprintln!("Win Rate:         {:.1}%", m.win_rate * 100.0);
    eprintln!("Profit Factor:    {:.2}", m.profit_factor);
}

fn run_validate(config_path: &Path) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(e) => return fail(&e),
    };
    let app = match build_app_config(&adapter, None, None) {
        Ok(app) => app,
        Err(e) => return fail(&e),
    };

    eprintln!("\nReplay:");
    eprintln!("  range:     {} to {}", app.replay.start, app.replay.end);
    eprintln!("  frequency: {}", app.replay.frequency);
    match &app.data {
        Some(data) => eprintln!("  data:      {} ({})", data.path.display(), data.format),
        None => eprintln!("  data:      not configured"),
    }

    eprintln!("\nTrading:");
    eprintln!("  symbol:    {}", app.trading.symbol);
    eprintln!("  lot size:  {}", app.trading.lot_size);
    eprintln!(
        "  open:      long >= {}, short <= -{}",
        app.trading.long_open_threshold, app.trading.short_open_threshold
    );
    eprintln!(
        "  close:     long <= -{}, short >= {}",
        app.trading.long_close_threshold, app.trading.short_close_threshold
    );

    eprintln!("\nIndicators:");
    let indicators = app.signal.indicators();
    if indicators.is_empty() {
        eprintln!("  none (every step is \"No signal\")");
    }
    for spec in indicators {
        eprintln!("  {}", spec);
    }

    eprintln!("\nConfig validated successfully");
    ExitCode::SUCCESS
}

fn run_info(data: &Path, format: &str, point: Option<f64>) -> ExitCode {
    let format: DataFormat = match format.parse() {
        Ok(f) => f,
        Err(e) => return fail(&e),
    };
    let adapter = CsvAdapter::new(point.unwrap_or(DEFAULT_BAR_POINT));
    let ticks = match adapter.load_ticks(data, format) {
        Ok(t) => t,
        Err(e) => return fail(&e),
    };

    let label = data.display().to_string();
    let mut store = PriceStore::new();
    store.load(ticks, &label);
    match store.range(&label) {
        Ok(Some((first, last, count))) => {
            println!("{}: {} ticks, {} to {}", label, count, first, last);
            ExitCode::SUCCESS
        }
        Ok(None) => {
            eprintln!("{}: no data found", label);
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e),
    }
}
