//! Terminal and JSON rendering for CLI results

use colored::Colorize;
use serde::Serialize;
use tabled::{
    settings::{object::Columns, Alignment, Modify, Style},
    Table, Tabled,
};

use importa::db::{ManualRate, StoredSession};
use importa::exchange::{CurrencyQuote, QuoteSource};
use importa::incentives::FiscalIncentive;
use importa::regimes::CustomsRegime;
use importa::simulation::SimulationResult;
use importa::utils::{format_brl, format_percent, format_rate};

/// Pretty JSON for anything serializable
pub fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| format!(r#"{{"error": "JSON serialization failed: {}"}}"#, e))
}

/// One-line description of where a rate came from
pub fn describe_quote(quote: &CurrencyQuote) -> String {
    let origin = match quote.source {
        QuoteSource::Ptax => "PTAX",
        QuoteSource::Cache => "PTAX (cached)",
        QuoteSource::Manual => "manual",
        QuoteSource::Identity => "identity",
    };

    let mut line = format!(
        "{} = R$ {} ({}, {})",
        quote.currency,
        format_rate(quote.rate),
        origin,
        quote.resolved_date.format("%d/%m/%Y")
    );

    let fallback = quote.fallback_days();
    if fallback > 0 {
        line.push_str(&format!(
            " - requested {}, fell back {} day{}",
            quote.requested_date.format("%d/%m/%Y"),
            fallback,
            if fallback == 1 { "" } else { "s" }
        ));
    }
    line
}

pub fn format_quote(quote: &CurrencyQuote) -> String {
    format!("{} {}\n", "✓".green().bold(), describe_quote(quote))
}

pub fn format_simulation(result: &SimulationResult) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "\n{} Import simulation - {} ({})\n",
        "📦".cyan().bold(),
        result.regime_name,
        result.regime_code
    ));
    output.push_str(&format!("  Rate: {}\n", describe_quote(&result.rate_info)));
    output.push_str(&format!(
        "  CIF:  {} {} = {}\n\n",
        result.rate_info.currency,
        result.cif_foreign,
        format_brl(result.cif_base)
    ));

    #[derive(Tabled)]
    struct TaxRow {
        #[tabled(rename = "Tax")]
        tax: String,
        #[tabled(rename = "Statutory")]
        statutory: String,
        #[tabled(rename = "Effective")]
        effective: String,
    }

    let mut rows: Vec<TaxRow> = result
        .tax_breakdown
        .lines()
        .iter()
        .map(|(line, amount)| TaxRow {
            tax: line.label().to_string(),
            statutory: format_brl(*amount),
            effective: format_brl(result.effective_taxes.get(*line)),
        })
        .collect();
    rows.push(TaxRow {
        tax: "Total".to_string(),
        statutory: format_brl(result.tax_breakdown.total),
        effective: format_brl(result.effective_taxes.total),
    });

    let table = Table::new(rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..)).with(Alignment::right()))
        .to_string();
    output.push_str(&table);
    output.push('\n');

    if !result.incentives_applied.is_empty() {
        output.push_str(&format!("\n{} Incentives\n", "🏷".green().bold()));
        for incentive in &result.incentives_applied {
            output.push_str(&format!(
                "  {:<32} -{}\n",
                incentive.name,
                format_brl(incentive.savings)
            ));
        }
    }

    if !result.customs_expenses.is_empty() {
        output.push_str(&format!("\n{} Customs expenses\n", "🧾".blue().bold()));
        for expense in &result.customs_expenses {
            output.push_str(&format!(
                "  {:<32} {}\n",
                expense.description,
                format_brl(expense.amount)
            ));
        }
    }

    output.push_str(&format!("\n{} Summary", "━".repeat(60).bright_black()));
    let summary = [
        ("CIF:", format_brl(result.cif_base)),
        ("Taxes:", format_brl(result.tax_breakdown.total)),
        ("Incentive savings:", format_brl(-result.incentive_savings)),
        ("Expenses:", format_brl(result.expenses_total)),
    ];
    for (label, value) in summary {
        output.push_str(&format!("\n{:<22} {}", label, value));
    }
    output.push_str(&format!(
        "\n{:<22} {}",
        "Total landed cost:",
        format_brl(result.total_cost).bold()
    ));
    if let Some(unit) = result.cost_per_unit {
        output.push_str(&format!("\n{:<22} {}", "Per unit:", format_brl(unit)));
    }
    output.push_str(&format!(
        "\n{:<22} {}\n",
        "Effective tax rate:",
        format_percent(result.effective_tax_rate)
    ));

    if result.license_required {
        output.push_str(&format!(
            "\n{} Regime {} requires an import license\n",
            "⚠".yellow().bold(),
            result.regime_code
        ));
    }

    output
}

pub fn format_regimes(regimes: &[CustomsRegime]) -> String {
    #[derive(Tabled)]
    struct RegimeRow {
        #[tabled(rename = "Code")]
        code: String,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Method")]
        method: String,
        #[tabled(rename = "License")]
        license: String,
        #[tabled(rename = "Incentives")]
        incentives: String,
    }

    let yes_no = |b: bool| if b { "yes" } else { "no" }.to_string();
    let rows: Vec<RegimeRow> = regimes
        .iter()
        .map(|r| RegimeRow {
            code: r.code.clone(),
            name: r.name.clone(),
            method: r.calculation_method.as_str().to_string(),
            license: yes_no(r.requires_license),
            incentives: yes_no(r.has_incentives),
        })
        .collect();

    format!("{}\n", Table::new(rows).with(Style::rounded()))
}

pub fn format_incentives(incentives: &[FiscalIncentive]) -> String {
    #[derive(Tabled)]
    struct IncentiveRow {
        #[tabled(rename = "Id")]
        id: String,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Scope")]
        scope: String,
        #[tabled(rename = "Applies to")]
        applies_to: String,
        #[tabled(rename = "Multipliers")]
        multipliers: String,
    }

    let rows: Vec<IncentiveRow> = incentives
        .iter()
        .map(|i| {
            let rules = &i.applicability;
            let mut applies_to = Vec::new();
            if !rules.dest_states.is_empty() {
                applies_to.push(format!("dest {}", rules.dest_states.join("/")));
            }
            if !rules.origin_states.is_empty() {
                applies_to.push(format!("origin {}", rules.origin_states.join("/")));
            }
            if !rules.ncm_prefixes.is_empty() {
                applies_to.push(format!("NCM {}", rules.ncm_prefixes.join("/")));
            }

            let multipliers: Vec<String> = i
                .reductions
                .iter()
                .map(|(line, m)| format!("{} x{}", line.label(), m))
                .collect();

            IncentiveRow {
                id: i.id.clone(),
                name: i.name.clone(),
                scope: i.scope.as_str().to_string(),
                applies_to: if applies_to.is_empty() {
                    "any".to_string()
                } else {
                    applies_to.join(", ")
                },
                multipliers: multipliers.join(", "),
            }
        })
        .collect();

    format!("{}\n", Table::new(rows).with(Style::rounded()))
}

pub fn format_manual_rates(rates: &[ManualRate]) -> String {
    if rates.is_empty() {
        return format!("{} No retained manual rates\n", "ℹ".blue().bold());
    }

    #[derive(Tabled)]
    struct RateRow {
        #[tabled(rename = "Currency")]
        currency: String,
        #[tabled(rename = "Rate")]
        rate: String,
        #[tabled(rename = "Set at")]
        set_at: String,
    }

    let rows: Vec<RateRow> = rates
        .iter()
        .map(|r| RateRow {
            currency: r.currency.clone(),
            rate: format_rate(r.rate),
            set_at: r.set_at.format("%d/%m/%Y %H:%M").to_string(),
        })
        .collect();

    format!("{}\n", Table::new(rows).with(Style::rounded()))
}

pub fn format_sessions(sessions: &[StoredSession]) -> String {
    if sessions.is_empty() {
        return format!("{} No saved sessions\n", "ℹ".blue().bold());
    }

    #[derive(Tabled)]
    struct SessionRow {
        #[tabled(rename = "Session")]
        id: String,
        #[tabled(rename = "Regime")]
        regime: String,
        #[tabled(rename = "Currency")]
        currency: String,
        #[tabled(rename = "Total")]
        total: String,
        #[tabled(rename = "Updated")]
        updated_at: String,
    }

    let rows: Vec<SessionRow> = sessions
        .iter()
        .map(|s| SessionRow {
            id: s.id.clone(),
            regime: s.result.regime_code.clone(),
            currency: s.result.rate_info.currency.clone(),
            total: format_brl(s.result.total_cost),
            updated_at: s.updated_at.format("%d/%m/%Y %H:%M").to_string(),
        })
        .collect();

    let table = Table::new(rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(3..4)).with(Alignment::right()))
        .to_string();
    format!("{}\n", table)
}
