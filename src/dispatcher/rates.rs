use anyhow::{bail, Result};
use chrono::{Local, NaiveDate};
use colored::Colorize;
use rust_decimal::Decimal;
use serde_json::json;

use super::{build_resolver, explain};
use crate::cli::{formatters, RateOverrideCommands};
use importa::config::AppConfig;
use importa::db;
use importa::exchange::{normalize_currency, InMemoryQuoteProvider, PtaxProvider};
use importa::utils::format_rate;

pub async fn dispatch_rate(
    currency: &str,
    date: Option<NaiveDate>,
    offline: bool,
    json_output: bool,
) -> Result<()> {
    let config = AppConfig::load()?;
    let mut conn = db::init_database(None)?;
    let date = date.unwrap_or_else(|| Local::now().date_naive());

    let (quote, cache) = if offline {
        let mut resolver = build_resolver(InMemoryQuoteProvider::new(), &config, &conn)?;
        let quote = resolver.resolve(currency, date).await;
        (quote, resolver.cache().clone())
    } else {
        let provider = PtaxProvider::new(&config.exchange.base_url, config.exchange.timeout())?;
        let mut resolver = build_resolver(provider, &config, &conn)?;
        let quote = resolver.resolve(currency, date).await;
        (quote, resolver.cache().clone())
    };
    db::store_quote_cache(&mut conn, &cache)?;

    let quote = quote.map_err(|e| explain(e, &normalize_currency(currency)))?;
    if json_output {
        println!("{}", formatters::to_json(&quote));
    } else {
        print!("{}", formatters::format_quote(&quote));
    }
    Ok(())
}

pub fn dispatch_rate_override(action: RateOverrideCommands, json_output: bool) -> Result<()> {
    let conn = db::init_database(None)?;

    match action {
        RateOverrideCommands::Set { currency, rate } => {
            if rate <= Decimal::ZERO {
                bail!("Manual rate must be positive, got {}", rate);
            }
            let currency = normalize_currency(&currency);
            db::set_manual_rate(&conn, &currency, rate)?;

            if json_output {
                println!("{}", json!({ "currency": currency, "rate": rate }));
            } else {
                println!(
                    "{} {} will use R$ {} until cleared",
                    "✓".green().bold(),
                    currency,
                    format_rate(rate)
                );
            }
        }
        RateOverrideCommands::Clear { currency } => {
            let currency = normalize_currency(&currency);
            let removed = db::clear_manual_rate(&conn, &currency)?;

            if json_output {
                println!("{}", json!({ "currency": currency, "removed": removed }));
            } else if removed {
                println!("{} {} back to PTAX", "✓".green().bold(), currency);
            } else {
                println!("{} No retained rate for {}", "ℹ".blue().bold(), currency);
            }
        }
        RateOverrideCommands::List => {
            let rates = db::list_manual_rates(&conn)?;

            if json_output {
                let items: Vec<_> = rates
                    .iter()
                    .map(|r| json!({ "currency": r.currency, "rate": r.rate, "set_at": r.set_at }))
                    .collect();
                println!("{}", formatters::to_json(&items));
            } else {
                print!("{}", formatters::format_manual_rates(&rates));
            }
        }
    }
    Ok(())
}
