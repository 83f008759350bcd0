//! Routes parsed CLI commands to their handlers.
//!
//! Handlers load the configuration and the local database themselves, print
//! either a table or JSON, and return `anyhow` errors to `main`.

mod rates;
mod sessions;
mod simulate;

use anyhow::Result;
use colored::Colorize;
use rusqlite::Connection;

use crate::cli::{formatters, Commands};
use importa::config::AppConfig;
use importa::db;
use importa::error::SimulationError;
use importa::exchange::{ExchangeRateResolver, QuoteProvider};

/// Route a parsed command to its handler
pub async fn dispatch_command(command: Commands, json_output: bool) -> Result<()> {
    match command {
        Commands::Simulate(args) => simulate::dispatch_simulate(args, json_output).await,
        Commands::Rate {
            currency,
            date,
            offline,
        } => rates::dispatch_rate(&currency, date, offline, json_output).await,
        Commands::RateOverride { action } => rates::dispatch_rate_override(action, json_output),
        Commands::Regimes => dispatch_regimes(json_output),
        Commands::Incentives => dispatch_incentives(json_output),
        Commands::Session { action } => sessions::dispatch_session(action, json_output),
    }
}

fn dispatch_regimes(json_output: bool) -> Result<()> {
    let registry = AppConfig::load()?.regime_registry()?;

    if json_output {
        println!("{}", formatters::to_json(&registry.list_regimes()));
    } else {
        print!("{}", formatters::format_regimes(registry.list_regimes()));
    }
    Ok(())
}

fn dispatch_incentives(json_output: bool) -> Result<()> {
    let catalog = AppConfig::load()?.incentive_catalog()?;

    if json_output {
        println!("{}", formatters::to_json(&catalog.list()));
    } else {
        print!("{}", formatters::format_incentives(catalog.list()));
    }
    Ok(())
}

/// Resolver seeded with the persisted quote cache and retained manual rates
pub(crate) fn build_resolver<P: QuoteProvider>(
    provider: P,
    config: &AppConfig,
    conn: &Connection,
) -> Result<ExchangeRateResolver<P>> {
    let mut resolver = ExchangeRateResolver::new(provider)
        .with_cache(db::load_quote_cache(conn)?)
        .with_max_attempts(config.exchange.max_lookback_days);

    for manual in db::list_manual_rates(conn)? {
        resolver.set_override(&manual.currency, manual.rate)?;
    }
    Ok(resolver)
}

/// Convert a core error, telling the user how to work around missing quotes
pub(crate) fn explain(err: SimulationError, currency: &str) -> anyhow::Error {
    if err.is_recoverable_with_manual_rate() {
        eprintln!(
            "{} Pass {} to simulate with your own rate, or keep one with {}",
            "Hint:".yellow().bold(),
            "--manual-rate <RATE>".bold(),
            format!("importa rate-override set {} <RATE>", currency).bold()
        );
    }
    err.into()
}
