use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::debug;

use super::{TaxBreakdown, TaxLine, TransportMode};
use crate::error::{Result, SimulationError};
use crate::regimes::{CalculationMethod, CustomsRegime, RegimeRegistry};

/// Share of the standard II/IPI charged on reimported goods
const REIMPORT_FACTOR: Decimal = dec!(0.5);

/// Tax calculation engine bound to a regime registry
pub struct TaxEngine<'a> {
    registry: &'a RegimeRegistry,
}

impl<'a> TaxEngine<'a> {
    pub fn new(registry: &'a RegimeRegistry) -> Self {
        Self { registry }
    }

    /// Compute the tax breakdown for a CIF base under the given regime code.
    ///
    /// Unknown regime codes fail before any arithmetic is attempted.
    pub fn compute(
        &self,
        cif_base: Decimal,
        regime_code: &str,
        freight_value: Decimal,
        transport_mode: TransportMode,
    ) -> Result<TaxBreakdown> {
        let regime = self.registry.get_regime(regime_code)?;
        compute_for_regime(regime, cif_base, freight_value, transport_mode)
    }
}

/// Compute the breakdown for an already resolved regime
pub fn compute_for_regime(
    regime: &CustomsRegime,
    cif_base: Decimal,
    freight_value: Decimal,
    transport_mode: TransportMode,
) -> Result<TaxBreakdown> {
    if cif_base < Decimal::ZERO {
        return Err(SimulationError::invalid("cif_base", cif_base));
    }
    if freight_value < Decimal::ZERO {
        return Err(SimulationError::invalid("freight_value", freight_value));
    }

    let rates = &regime.tax_rates;
    // AFRMM only exists for maritime freight
    let afrmm = match transport_mode {
        TransportMode::Maritime => freight_value * rates.afrmm,
        TransportMode::Air | TransportMode::Road | TransportMode::Rail => Decimal::ZERO,
    };

    let standard = || {
        TaxBreakdown::from_lines(
            cif_base * rates.ii,
            cif_base * rates.ipi,
            cif_base * rates.pis,
            cif_base * rates.cofins,
            cif_base * rates.icms,
            cif_base * rates.fcp,
            afrmm,
        )
    };

    let breakdown = match regime.calculation_method {
        CalculationMethod::Temporary | CalculationMethod::Drawback => TaxBreakdown::zero(),
        CalculationMethod::Standard => standard(),
        CalculationMethod::Reimport => {
            // Half of the rounded standard line, rounded again
            let mut breakdown = standard();
            breakdown.set(TaxLine::Ii, breakdown.ii * REIMPORT_FACTOR);
            breakdown.set(TaxLine::Ipi, breakdown.ipi * REIMPORT_FACTOR);
            breakdown
        }
    };

    debug!(
        "Computed taxes for regime {} ({}): base {} -> total {}",
        regime.code,
        regime.calculation_method.as_str(),
        cif_base,
        breakdown.total
    );

    Ok(breakdown)
}
