//! Landed-cost simulation
//!
//! Orchestrates rate resolution, CIF computation, regime taxes, incentives and
//! customs expenses into a single result. Any error from the resolver or the
//! tax engine aborts the whole simulation; there is no partial result.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Result, SimulationError};
use crate::exchange::{CurrencyQuote, ExchangeRateResolver, QuoteProvider, QuoteSource};
use crate::incentives::{self, IncentiveCatalog, IncentiveContext};
use crate::regimes::RegimeRegistry;
use crate::tax::{self, round_money, TaxBreakdown, TransportMode};

/// A customs or logistics cost in BRL (storage, broker, Siscomex fee...)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CustomsExpense {
    pub description: String,
    pub amount: Decimal,
}

impl CustomsExpense {
    pub fn new(description: &str, amount: Decimal) -> Self {
        Self {
            description: description.to_string(),
            amount,
        }
    }
}

/// Everything a simulation needs from the caller
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SimulationInputs {
    /// Unit price in `currency`
    pub product_value: Decimal,
    pub quantity: Decimal,
    pub freight_value: Decimal,
    pub insurance_value: Decimal,
    pub currency: String,
    pub quote_date: NaiveDate,
    pub regime_code: String,
    pub transport_mode: TransportMode,
    pub origin_state: String,
    pub dest_state: String,
    #[serde(default)]
    pub manual_rate_override: Option<Decimal>,
    /// Tariff code, used by sectorial incentives
    #[serde(default)]
    pub ncm: Option<String>,
    #[serde(default)]
    pub extra_expenses: Vec<CustomsExpense>,
}

/// An incentive that changed the breakdown
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppliedIncentive {
    pub id: String,
    pub name: String,
    pub savings: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SimulationResult {
    /// CIF in the foreign currency
    pub cif_foreign: Decimal,
    /// CIF converted to BRL; the base for every tax
    pub cif_base: Decimal,
    pub rate_info: CurrencyQuote,
    pub regime_code: String,
    pub regime_name: String,
    pub license_required: bool,
    /// Statutory taxes before incentives
    pub tax_breakdown: TaxBreakdown,
    /// Taxes after incentives
    pub effective_taxes: TaxBreakdown,
    pub incentives_applied: Vec<AppliedIncentive>,
    pub incentive_savings: Decimal,
    pub customs_expenses: Vec<CustomsExpense>,
    pub expenses_total: Decimal,
    pub total_cost: Decimal,
    pub cost_per_unit: Option<Decimal>,
    pub effective_tax_rate: Decimal,
}

/// Simulation aggregator
#[derive(Debug, Clone, Default)]
pub struct Simulator {
    registry: RegimeRegistry,
    incentives: IncentiveCatalog,
    expenses: Vec<CustomsExpense>,
}

impl Simulator {
    pub fn new(
        registry: RegimeRegistry,
        incentives: IncentiveCatalog,
        expenses: Vec<CustomsExpense>,
    ) -> Self {
        Self {
            registry,
            incentives,
            expenses,
        }
    }

    /// Run a full simulation, resolving the exchange rate unless a manual
    /// rate is part of the inputs.
    pub async fn simulate<P: QuoteProvider>(
        &self,
        resolver: &mut ExchangeRateResolver<P>,
        inputs: &SimulationInputs,
    ) -> Result<SimulationResult> {
        validate_inputs(inputs)?;

        let quote = match inputs.manual_rate_override {
            Some(rate) => CurrencyQuote::fixed(
                &inputs.currency,
                inputs.quote_date,
                rate,
                QuoteSource::Manual,
            ),
            None => resolver.resolve(&inputs.currency, inputs.quote_date).await?,
        };

        self.simulate_with_quote(inputs, quote)
    }

    /// Everything after rate resolution; pure.
    pub fn simulate_with_quote(
        &self,
        inputs: &SimulationInputs,
        quote: CurrencyQuote,
    ) -> Result<SimulationResult> {
        validate_inputs(inputs)?;
        if quote.rate <= Decimal::ZERO {
            return Err(SimulationError::invalid("exchange_rate", quote.rate));
        }

        let cif_foreign = tax::cif_base(
            inputs.product_value,
            inputs.quantity,
            inputs.freight_value,
            inputs.insurance_value,
        )?;
        let cif_base = round_money(checked(
            cif_foreign.checked_mul(quote.rate),
            "cif_base",
            cif_foreign,
        )?);
        let freight_brl = round_money(checked(
            inputs.freight_value.checked_mul(quote.rate),
            "freight_value",
            inputs.freight_value,
        )?);

        let regime = self.registry.get_regime(&inputs.regime_code)?;
        let tax_breakdown =
            tax::compute_for_regime(regime, cif_base, freight_brl, inputs.transport_mode)?;

        let mut effective_taxes = tax_breakdown;
        let mut incentives_applied = Vec::new();
        if regime.has_incentives {
            let ctx = IncentiveContext {
                origin_state: inputs.origin_state.clone(),
                dest_state: inputs.dest_state.clone(),
                ncm: inputs.ncm.clone(),
            };
            for incentive in self.incentives.list() {
                let outcome = incentives::apply(&effective_taxes, incentive, &ctx)?;
                if outcome.is_applied() {
                    incentives_applied.push(AppliedIncentive {
                        id: incentive.id.clone(),
                        name: incentive.name.clone(),
                        savings: outcome.savings(),
                    });
                }
                effective_taxes = *outcome.breakdown();
            }
        }
        let incentive_savings: Decimal = incentives_applied.iter().map(|i| i.savings).sum();

        let customs_expenses: Vec<CustomsExpense> = self
            .expenses
            .iter()
            .chain(inputs.extra_expenses.iter())
            .cloned()
            .collect();
        let mut expenses_total = Decimal::ZERO;
        for expense in &customs_expenses {
            let field = format!("expense '{}'", expense.description);
            if expense.amount < Decimal::ZERO {
                return Err(SimulationError::invalid(field, expense.amount));
            }
            expenses_total = checked(
                expenses_total.checked_add(expense.amount),
                &field,
                expense.amount,
            )?;
        }

        // Savings never exceed the statutory total
        let total_cost = checked(
            cif_base
                .checked_add(tax_breakdown.total - incentive_savings)
                .and_then(|cost| cost.checked_add(expenses_total)),
            "total_cost",
            cif_base,
        )?;

        let cost_per_unit = if inputs.quantity > Decimal::ZERO {
            Some(round_money(checked(
                total_cost.checked_div(inputs.quantity),
                "quantity",
                inputs.quantity,
            )?))
        } else {
            None
        };
        let effective_tax_rate = if cif_base > Decimal::ZERO {
            (effective_taxes.total / cif_base).round_dp(4)
        } else {
            Decimal::ZERO
        };

        info!(
            "Simulated {} {} ({} rate, {}) under {}: CIF R$ {}, taxes R$ {}, savings R$ {}, total R$ {}",
            cif_foreign,
            quote.currency,
            quote.source.as_str(),
            inputs.transport_mode.as_str(),
            regime.code,
            cif_base,
            tax_breakdown.total,
            incentive_savings,
            total_cost
        );

        Ok(SimulationResult {
            cif_foreign,
            cif_base,
            rate_info: quote,
            regime_code: regime.code.clone(),
            regime_name: regime.name.clone(),
            license_required: regime.requires_license,
            tax_breakdown,
            effective_taxes,
            incentives_applied,
            incentive_savings,
            customs_expenses,
            expenses_total,
            total_cost,
            cost_per_unit,
            effective_tax_rate,
        })
    }
}

/// Reject inputs that would produce a negative tax line
/// Arithmetic that left the `Decimal` range is reported against `field`
fn checked(result: Option<Decimal>, field: &str, value: Decimal) -> Result<Decimal> {
    result.ok_or_else(|| SimulationError::invalid(field, value))
}

fn validate_inputs(inputs: &SimulationInputs) -> Result<()> {
    tax::cif_base(
        inputs.product_value,
        inputs.quantity,
        inputs.freight_value,
        inputs.insurance_value,
    )?;
    if let Some(rate) = inputs.manual_rate_override {
        if rate <= Decimal::ZERO {
            return Err(SimulationError::invalid("manual_rate_override", rate));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::InMemoryQuoteProvider;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn inputs() -> SimulationInputs {
        SimulationInputs {
            product_value: dec!(100),
            quantity: dec!(90),
            freight_value: dec!(800),
            insurance_value: dec!(200),
            currency: "USD".to_string(),
            quote_date: date(2026, 10, 10),
            regime_code: "COMUM".to_string(),
            transport_mode: TransportMode::Air,
            origin_state: "SP".to_string(),
            dest_state: "SP".to_string(),
            manual_rate_override: None,
            ncm: None,
            extra_expenses: Vec::new(),
        }
    }

    fn resolver() -> ExchangeRateResolver<InMemoryQuoteProvider> {
        let provider = InMemoryQuoteProvider::new().with_rate("USD", date(2026, 10, 9), dec!(5));
        ExchangeRateResolver::new(provider).with_today(date(2026, 10, 16))
    }

    fn bare_simulator() -> Simulator {
        Simulator::new(RegimeRegistry::default(), IncentiveCatalog::empty(), Vec::new())
    }

    #[tokio::test]
    async fn test_full_pipeline_with_fallback_rate() {
        let result = bare_simulator()
            .simulate(&mut resolver(), &inputs())
            .await
            .unwrap();

        assert_eq!(result.cif_foreign, dec!(10000));
        assert_eq!(result.rate_info.resolved_date, date(2026, 10, 9));
        assert_eq!(result.cif_base, dec!(50000.00));
        assert_eq!(result.tax_breakdown.total, dec!(27875.00));
        assert_eq!(result.incentive_savings, Decimal::ZERO);
        assert_eq!(result.total_cost, dec!(77875.00));
        assert_eq!(result.cost_per_unit, Some(dec!(865.28)));
        assert_eq!(result.effective_tax_rate, dec!(0.5575));
    }

    #[tokio::test]
    async fn test_manual_rate_skips_resolver() {
        let mut resolver = resolver();
        let mut inputs = inputs();
        inputs.quote_date = date(2027, 1, 1);
        inputs.manual_rate_override = Some(dec!(1));

        let result = bare_simulator().simulate(&mut resolver, &inputs).await.unwrap();
        assert_eq!(result.rate_info.source, QuoteSource::Manual);
        assert_eq!(result.cif_base, dec!(10000));
        assert_eq!(result.tax_breakdown.total, dec!(5575.00));
        assert_eq!(resolver.provider().calls(), 0);
    }

    #[tokio::test]
    async fn test_resolver_errors_abort() {
        let mut inputs = inputs();
        inputs.quote_date = date(2026, 10, 30);

        let err = bare_simulator()
            .simulate(&mut resolver(), &inputs)
            .await
            .unwrap_err();
        assert!(matches!(err, SimulationError::FutureDate { .. }));
    }

    #[tokio::test]
    async fn test_invalid_input_fails_before_resolution() {
        let mut resolver = resolver();
        let mut inputs = inputs();
        inputs.product_value = dec!(-100);

        let err = bare_simulator().simulate(&mut resolver, &inputs).await.unwrap_err();
        assert_eq!(err, SimulationError::invalid("product_value", dec!(-100)));
        assert_eq!(resolver.provider().calls(), 0);
    }

    #[test]
    fn test_unknown_regime_aborts() {
        let mut inputs = inputs();
        inputs.regime_code = "XPTO".to_string();
        let quote = CurrencyQuote::fixed("USD", inputs.quote_date, dec!(5), QuoteSource::Manual);

        let err = bare_simulator().simulate_with_quote(&inputs, quote).unwrap_err();
        assert_eq!(err, SimulationError::UnknownRegime("XPTO".to_string()));
    }

    #[test]
    fn test_incentives_and_expenses() {
        let simulator = Simulator::new(
            RegimeRegistry::default(),
            IncentiveCatalog::default(),
            vec![CustomsExpense::new("Taxa Siscomex", dec!(154.23))],
        );
        let mut inputs = inputs();
        inputs.dest_state = "AM".to_string();
        inputs.extra_expenses = vec![CustomsExpense::new("Armazenagem", dec!(345.77))];
        let quote = CurrencyQuote::fixed("USD", inputs.quote_date, dec!(1), QuoteSource::Manual);

        let result = simulator.simulate_with_quote(&inputs, quote).unwrap();

        // ZFM: II x0.12, IPI and ICMS zeroed
        assert_eq!(result.effective_taxes.ii, dec!(192.00));
        assert_eq!(result.effective_taxes.ipi, dec!(0));
        assert_eq!(result.effective_taxes.icms, dec!(0));
        assert_eq!(result.incentives_applied.len(), 1);
        assert_eq!(result.incentives_applied[0].id, "zfm");
        assert_eq!(result.incentive_savings, dec!(4008.00));
        assert_eq!(result.expenses_total, dec!(500.00));
        assert_eq!(result.total_cost, dec!(12067.00));
    }

    #[test]
    fn test_suspended_regime_ignores_incentives() {
        let simulator = Simulator::new(
            RegimeRegistry::default(),
            IncentiveCatalog::default(),
            Vec::new(),
        );
        let mut inputs = inputs();
        inputs.regime_code = "DRAWBACK".to_string();
        inputs.dest_state = "AM".to_string();
        let quote = CurrencyQuote::fixed("USD", inputs.quote_date, dec!(1), QuoteSource::Manual);

        let result = simulator.simulate_with_quote(&inputs, quote).unwrap();
        assert!(result.tax_breakdown.is_zero());
        assert!(result.incentives_applied.is_empty());
        assert!(result.license_required);
        assert_eq!(result.total_cost, dec!(10000));
    }

    #[test]
    fn test_negative_expense_is_rejected() {
        let mut inputs = inputs();
        inputs.extra_expenses = vec![CustomsExpense::new("Desconto", dec!(-10))];
        let quote = CurrencyQuote::fixed("USD", inputs.quote_date, dec!(1), QuoteSource::Manual);

        let err = bare_simulator().simulate_with_quote(&inputs, quote).unwrap_err();
        assert_eq!(err, SimulationError::invalid("expense 'Desconto'", dec!(-10)));
    }

    #[tokio::test]
    async fn test_out_of_range_amounts_are_errors() {
        let mut huge = inputs();
        huge.product_value = Decimal::MAX;
        huge.quantity = dec!(2);
        huge.freight_value = Decimal::ZERO;
        huge.insurance_value = Decimal::ZERO;

        let mut resolver = resolver();
        let err = bare_simulator()
            .simulate(&mut resolver, &huge)
            .await
            .unwrap_err();
        assert_eq!(err, SimulationError::invalid("product_value", Decimal::MAX));
        assert_eq!(resolver.provider().calls(), 0);

        // Fits in USD, not once converted
        huge.quantity = Decimal::ONE;
        let quote = CurrencyQuote::fixed("USD", huge.quote_date, dec!(5), QuoteSource::Manual);
        let err = bare_simulator().simulate_with_quote(&huge, quote).unwrap_err();
        assert_eq!(err, SimulationError::invalid("cif_base", Decimal::MAX));
    }

    #[test]
    fn test_tiny_quantity_unit_cost_overflow_is_an_error() {
        let mut inputs = inputs();
        inputs.quantity = Decimal::new(1, 28);
        inputs.freight_value = Decimal::ZERO;
        inputs.insurance_value = Decimal::ZERO;
        inputs.extra_expenses = vec![CustomsExpense::new("Armazenagem", dec!(100))];
        let quote = CurrencyQuote::fixed("USD", inputs.quote_date, dec!(1), QuoteSource::Manual);

        let err = bare_simulator().simulate_with_quote(&inputs, quote).unwrap_err();
        assert_eq!(err, SimulationError::invalid("quantity", Decimal::new(1, 28)));
    }

    #[test]
    fn test_zero_quantity_has_no_unit_cost() {
        let mut inputs = inputs();
        inputs.quantity = Decimal::ZERO;
        let quote = CurrencyQuote::fixed("USD", inputs.quote_date, dec!(1), QuoteSource::Manual);

        let result = bare_simulator().simulate_with_quote(&inputs, quote).unwrap();
        assert_eq!(result.cif_base, dec!(1000));
        assert_eq!(result.cost_per_unit, None);
    }
}
