//! Customs regime registry
//!
//! Static catalog of import regimes. The registry is the runtime boundary that
//! rejects unknown codes; past it, regimes are dispatched on the closed
//! [`CalculationMethod`] enum.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{Result, SimulationError};

/// Formula branch applied by the tax engine
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum CalculationMethod {
    Standard,  // Full statutory rates
    Temporary, // Admissão temporária - all taxes suspended
    Drawback,  // Drawback suspensão - all taxes suspended
    Reimport,  // II/IPI halved
}

impl CalculationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            CalculationMethod::Standard => "standard",
            CalculationMethod::Temporary => "temporary",
            CalculationMethod::Drawback => "drawback",
            CalculationMethod::Reimport => "reimport",
        }
    }

    /// Goods that are not permanently imported pay nothing
    pub fn suspends_taxes(&self) -> bool {
        matches!(
            self,
            CalculationMethod::Temporary | CalculationMethod::Drawback
        )
    }
}

impl FromStr for CalculationMethod {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" => Ok(CalculationMethod::Standard),
            "temporary" => Ok(CalculationMethod::Temporary),
            "drawback" => Ok(CalculationMethod::Drawback),
            "reimport" => Ok(CalculationMethod::Reimport),
            _ => Err(()),
        }
    }
}

/// Statutory rates applied under a regime.
///
/// All rates apply to the CIF base except `afrmm`, which applies to the
/// freight value of maritime shipments.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaxRates {
    pub ii: Decimal,
    pub ipi: Decimal,
    pub pis: Decimal,
    pub cofins: Decimal,
    pub icms: Decimal,
    pub fcp: Decimal,
    pub afrmm: Decimal,
}

impl TaxRates {
    pub fn statutory() -> Self {
        Self {
            ii: dec!(0.16),
            ipi: dec!(0.08),
            pis: dec!(0.021),
            cofins: dec!(0.0965),
            icms: dec!(0.18),
            fcp: dec!(0.02),
            afrmm: dec!(0.25),
        }
    }
}

impl Default for TaxRates {
    fn default() -> Self {
        Self::statutory()
    }
}

/// An import modality
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CustomsRegime {
    pub code: String,
    pub name: String,
    pub calculation_method: CalculationMethod,
    pub tax_rates: TaxRates,
    pub requires_license: bool,
    pub has_incentives: bool,
}

impl CustomsRegime {
    pub fn new(code: &str, name: &str, calculation_method: CalculationMethod) -> Self {
        Self {
            code: code.trim().to_ascii_uppercase(),
            name: name.to_string(),
            calculation_method,
            tax_rates: TaxRates::statutory(),
            requires_license: false,
            has_incentives: !calculation_method.suspends_taxes(),
        }
    }

    pub fn requiring_license(mut self) -> Self {
        self.requires_license = true;
        self
    }
}

/// Ordered collection of known regimes
#[derive(Debug, Clone)]
pub struct RegimeRegistry {
    regimes: Vec<CustomsRegime>,
}

impl Default for RegimeRegistry {
    fn default() -> Self {
        Self {
            regimes: vec![
                CustomsRegime::new("COMUM", "Importação comum", CalculationMethod::Standard),
                CustomsRegime::new(
                    "ADMISSAO_TEMPORARIA",
                    "Admissão temporária",
                    CalculationMethod::Temporary,
                )
                .requiring_license(),
                CustomsRegime::new(
                    "DRAWBACK",
                    "Drawback suspensão",
                    CalculationMethod::Drawback,
                )
                .requiring_license(),
                CustomsRegime::new(
                    "REIMPORTACAO",
                    "Reimportação",
                    CalculationMethod::Reimport,
                ),
            ],
        }
    }
}

impl RegimeRegistry {
    /// Registry with no regimes at all
    pub fn empty() -> Self {
        Self {
            regimes: Vec::new(),
        }
    }

    pub fn list_regimes(&self) -> &[CustomsRegime] {
        &self.regimes
    }

    /// Look up a regime by code (case-insensitive)
    pub fn get_regime(&self, code: &str) -> Result<&CustomsRegime> {
        let wanted = code.trim();
        self.regimes
            .iter()
            .find(|r| r.code.eq_ignore_ascii_case(wanted))
            .ok_or_else(|| SimulationError::UnknownRegime(wanted.to_string()))
    }

    /// Add a regime, replacing any existing entry with the same code in place.
    pub fn register(&mut self, regime: CustomsRegime) {
        match self
            .regimes
            .iter_mut()
            .find(|r| r.code.eq_ignore_ascii_case(&regime.code))
        {
            Some(existing) => *existing = regime,
            None => self.regimes.push(regime),
        }
    }
}
