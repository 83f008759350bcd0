use anyhow::Result;
use chrono::Local;
use tracing::info;

use super::{build_resolver, explain};
use crate::cli::{formatters, SimulateArgs};
use importa::config::AppConfig;
use importa::db;
use importa::exchange::{InMemoryQuoteProvider, PtaxProvider, QuoteProvider};
use importa::simulation::{SimulationInputs, SimulationResult, Simulator};

pub async fn dispatch_simulate(args: SimulateArgs, json_output: bool) -> Result<()> {
    let config = AppConfig::load()?;
    let simulator = config.simulator()?;
    let mut conn = db::init_database(None)?;

    let inputs = to_inputs(&args);
    info!(
        "Simulating {} x {} {} under {}",
        inputs.quantity, inputs.product_value, inputs.currency, inputs.regime_code
    );

    let result = if args.offline {
        run(&simulator, InMemoryQuoteProvider::new(), &config, &mut conn, &inputs).await?
    } else {
        let provider = PtaxProvider::new(&config.exchange.base_url, config.exchange.timeout())?;
        run(&simulator, provider, &config, &mut conn, &inputs).await?
    };

    if let Some(id) = &args.session {
        db::save_session(&conn, id, &inputs, &result)?;
    }

    if json_output {
        println!("{}", formatters::to_json(&result));
    } else {
        print!("{}", formatters::format_simulation(&result));
        if let Some(id) = &args.session {
            println!("\nSaved as session {}", id);
        }
    }
    Ok(())
}

async fn run<P: QuoteProvider>(
    simulator: &Simulator,
    provider: P,
    config: &AppConfig,
    conn: &mut rusqlite::Connection,
    inputs: &SimulationInputs,
) -> Result<SimulationResult> {
    let mut resolver = build_resolver(provider, config, conn)?;
    let outcome = simulator.simulate(&mut resolver, inputs).await;

    // Persist fetched quotes even when the simulation fails
    db::store_quote_cache(conn, resolver.cache())?;

    outcome.map_err(|e| explain(e, &inputs.currency))
}

fn to_inputs(args: &SimulateArgs) -> SimulationInputs {
    SimulationInputs {
        product_value: args.product_value,
        quantity: args.quantity,
        freight_value: args.freight,
        insurance_value: args.insurance,
        currency: args.currency.trim().to_ascii_uppercase(),
        quote_date: args.date.unwrap_or_else(|| Local::now().date_naive()),
        regime_code: args.regime.clone(),
        transport_mode: args.transport,
        origin_state: args.origin.trim().to_ascii_uppercase(),
        dest_state: args.dest.trim().to_ascii_uppercase(),
        manual_rate_override: args.manual_rate,
        ncm: args.ncm.clone(),
        extra_expenses: args.expenses.clone(),
    }
}
