//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use log::info;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvMarketAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::config::SimulationConfig;
use crate::domain::error::SimfolioError;
use crate::domain::hooks::RatioAllocation;
use crate::domain::portfolio::Portfolio;
use crate::domain::replay::ReplayMarket;
use crate::domain::simulation::{self, SimulationSummary};

#[derive(Parser, Debug)]
#[command(name = "simfolio", about = "Portfolio accounting simulator")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replay CSV prices through a ratio-allocated portfolio
    Run {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Run { config } => run_simulation(&config).map(|summary| {
            print!("{}", format_summary(&summary));
        }),
        Command::Validate { config } => load_config(&config).map(|c| {
            println!(
                "{}: ok ({} symbols, ratio {})",
                config.display(),
                c.symbols.len(),
                c.ratio
            );
        }),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(&err)
        }
    }
}

pub fn load_config(path: &Path) -> Result<SimulationConfig, SimfolioError> {
    let adapter =
        FileConfigAdapter::from_file(path).map_err(|e| SimfolioError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        })?;
    SimulationConfig::from_config(&adapter)
}

pub fn build_portfolio(config: &SimulationConfig, market: ReplayMarket) -> Portfolio<ReplayMarket> {
    let hooks = RatioAllocation::new(config.symbols.clone(), config.ratio);
    Portfolio::new(
        config.starting_capital,
        config.start_date,
        config.end_date,
        market,
    )
    .with_commission_rate(config.commission_rate)
    .with_hooks(Box::new(hooks))
}

pub fn run_simulation(config_path: &Path) -> Result<SimulationSummary, SimfolioError> {
    info!("loading config from {}", config_path.display());
    let config = load_config(config_path)?;

    let adapter = CsvMarketAdapter::new(config.data_dir.clone());
    let market = adapter.load(&config.symbols, config.start_date, config.end_date)?;

    let mut portfolio = build_portfolio(&config, market);
    simulation::run(&mut portfolio)
}

pub fn format_summary(summary: &SimulationSummary) -> String {
    let period = match (summary.first_tick, summary.last_tick) {
        (Some(first), Some(last)) => format!("{first} to {last}"),
        _ => "no ticks".to_string(),
    };
    format!(
        "period:           {period} ({ticks} ticks)\n\
         cash:             {cash:.2}\n\
         equity:           {equity:.2}\n\
         margin:           {margin:.2}\n\
         positions:        {opened} opened, {active} active\n\
         commission:       {commission:.2}\n\
         nett gain:        {gain:.2}\n",
        ticks = summary.ticks,
        cash = summary.cash,
        equity = summary.equity,
        margin = summary.margin,
        opened = summary.positions_opened,
        active = summary.positions_active,
        commission = summary.total_commission,
        gain = summary.total_nett_gain,
    )
}
