use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;

use importa::simulation::CustomsExpense;
use importa::tax::TransportMode;
use importa::utils;

pub mod formatters;

#[derive(Parser)]
#[command(name = "importa")]
#[command(version, about = "Brazilian import landed-cost simulator")]
#[command(
    long_about = "Simulate the landed cost of an import into Brazil: PTAX exchange rate with business-day fallback, CIF, II/IPI/PIS/COFINS/ICMS/FCP/AFRMM per customs regime, regional and sectorial incentives, and customs expenses."
)]
pub struct Cli {
    /// Disable colorized/ANSI output
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,

    /// Output results in JSON format
    #[arg(long = "json", global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Simulate the landed cost of an import
    Simulate(SimulateArgs),

    /// Resolve the PTAX rate for a currency and date
    Rate {
        /// ISO currency code (USD, EUR, ...)
        currency: String,

        /// Quote date (YYYY-MM-DD or DD/MM/YYYY), defaults to today
        #[arg(short, long, value_parser = parse_date_arg)]
        date: Option<NaiveDate>,

        /// Do not contact the Banco Central; use cached quotes only
        #[arg(long)]
        offline: bool,
    },

    /// Retained manual exchange rates
    RateOverride {
        #[command(subcommand)]
        action: RateOverrideCommands,
    },

    /// List customs regimes
    Regimes,

    /// List fiscal incentives
    Incentives,

    /// Saved simulation sessions
    Session {
        #[command(subcommand)]
        action: SessionCommands,
    },
}

#[derive(Args, Debug, Clone)]
pub struct SimulateArgs {
    /// Unit price in the foreign currency
    #[arg(long = "value", value_parser = parse_amount_arg)]
    pub product_value: Decimal,

    #[arg(long, default_value = "1", value_parser = parse_amount_arg)]
    pub quantity: Decimal,

    /// International freight in the foreign currency
    #[arg(long, default_value = "0", value_parser = parse_amount_arg)]
    pub freight: Decimal,

    /// Insurance in the foreign currency
    #[arg(long, default_value = "0", value_parser = parse_amount_arg)]
    pub insurance: Decimal,

    #[arg(long, default_value = "USD")]
    pub currency: String,

    /// Quote date (YYYY-MM-DD or DD/MM/YYYY), defaults to today
    #[arg(long, value_parser = parse_date_arg)]
    pub date: Option<NaiveDate>,

    /// Customs regime code (see `importa regimes`)
    #[arg(long, default_value = "COMUM")]
    pub regime: String,

    /// maritime, air, road or rail
    #[arg(long, default_value = "maritime", value_parser = parse_transport_arg)]
    pub transport: TransportMode,

    /// Origin state (UF)
    #[arg(long, default_value = "SP")]
    pub origin: String,

    /// Destination state (UF)
    #[arg(long, default_value = "SP")]
    pub dest: String,

    /// NCM tariff code, used by sectorial incentives
    #[arg(long)]
    pub ncm: Option<String>,

    /// Use this exchange rate instead of resolving PTAX
    #[arg(long, value_parser = parse_amount_arg)]
    pub manual_rate: Option<Decimal>,

    /// Extra customs expense in BRL (repeatable)
    #[arg(long = "expense", value_name = "NAME=AMOUNT", value_parser = parse_expense_arg)]
    pub expenses: Vec<CustomsExpense>,

    /// Save inputs and result under this session id
    #[arg(long)]
    pub session: Option<String>,

    /// Do not contact the Banco Central; use cached quotes only
    #[arg(long)]
    pub offline: bool,
}

#[derive(Subcommand)]
pub enum RateOverrideCommands {
    /// Keep using RATE for CURRENCY until cleared
    Set {
        currency: String,
        #[arg(value_parser = parse_amount_arg)]
        rate: Decimal,
    },

    /// Forget the retained rate for CURRENCY
    Clear { currency: String },

    /// Show retained rates
    List,
}

#[derive(Subcommand)]
pub enum SessionCommands {
    /// Show a saved simulation
    Show { id: String },

    /// List saved simulations
    List,

    /// Delete a saved simulation
    Delete { id: String },
}

fn parse_amount_arg(s: &str) -> Result<Decimal, String> {
    utils::parse_decimal(s).map_err(|e| e.to_string())
}

fn parse_date_arg(s: &str) -> Result<NaiveDate, String> {
    utils::parse_date(s).map_err(|e| e.to_string())
}

fn parse_transport_arg(s: &str) -> Result<TransportMode, String> {
    s.parse()
        .map_err(|_| format!("Invalid transport mode '{}'. Use maritime, air, road or rail", s))
}

fn parse_expense_arg(s: &str) -> Result<CustomsExpense, String> {
    let (name, amount) = s
        .split_once('=')
        .ok_or_else(|| format!("Invalid expense '{}'. Use NAME=AMOUNT", s))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("Invalid expense '{}': missing name", s));
    }
    let amount = parse_amount_arg(amount)?;
    Ok(CustomsExpense::new(name, amount))
}
