// Tax module - Brazilian import taxes (II, IPI, PIS, COFINS, ICMS, FCP, AFRMM)

pub mod engine;

pub use engine::{compute_for_regime, TaxEngine};

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{Result, SimulationError};

/// Round a monetary amount to centavos, half-up.
///
/// Amounts reaching this function are never negative, so rounding the
/// midpoint away from zero is the same as rounding it up.
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Customs valuation base: `product_value × quantity + freight + insurance`.
///
/// Rejects negative inputs before doing any arithmetic, and inputs whose
/// total does not fit in a `Decimal`.
pub fn cif_base(
    product_value: Decimal,
    quantity: Decimal,
    freight_value: Decimal,
    insurance_value: Decimal,
) -> Result<Decimal> {
    for (field, value) in [
        ("product_value", product_value),
        ("quantity", quantity),
        ("freight_value", freight_value),
        ("insurance_value", insurance_value),
    ] {
        if value < Decimal::ZERO {
            return Err(SimulationError::invalid(field, value));
        }
    }

    let goods = product_value
        .checked_mul(quantity)
        .ok_or_else(|| SimulationError::invalid("product_value", product_value))?;
    goods
        .checked_add(freight_value)
        .ok_or_else(|| SimulationError::invalid("freight_value", freight_value))?
        .checked_add(insurance_value)
        .ok_or_else(|| SimulationError::invalid("insurance_value", insurance_value))
}

/// How the goods arrive in Brazil
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    Maritime,
    Air,
    Road,
    Rail,
}

impl TransportMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportMode::Maritime => "maritime",
            TransportMode::Air => "air",
            TransportMode::Road => "road",
            TransportMode::Rail => "rail",
        }
    }
}

impl FromStr for TransportMode {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "maritime" | "maritimo" | "marítimo" | "sea" => Ok(TransportMode::Maritime),
            "air" | "aereo" | "aéreo" => Ok(TransportMode::Air),
            "road" | "rodoviario" | "rodoviário" => Ok(TransportMode::Road),
            "rail" | "ferroviario" | "ferroviário" => Ok(TransportMode::Rail),
            _ => Err(()),
        }
    }
}

/// One line of the tax breakdown
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TaxLine {
    Ii,
    Ipi,
    Pis,
    Cofins,
    Icms,
    Fcp,
    Afrmm,
}

impl TaxLine {
    pub const ALL: [TaxLine; 7] = [
        TaxLine::Ii,
        TaxLine::Ipi,
        TaxLine::Pis,
        TaxLine::Cofins,
        TaxLine::Icms,
        TaxLine::Fcp,
        TaxLine::Afrmm,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            TaxLine::Ii => "II",
            TaxLine::Ipi => "IPI",
            TaxLine::Pis => "PIS",
            TaxLine::Cofins => "COFINS",
            TaxLine::Icms => "ICMS",
            TaxLine::Fcp => "FCP",
            TaxLine::Afrmm => "AFRMM",
        }
    }
}

/// Statutory tax breakdown. Every line is non-negative and `total` is the
/// sum of the seven lines.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaxBreakdown {
    pub ii: Decimal,
    pub ipi: Decimal,
    pub pis: Decimal,
    pub cofins: Decimal,
    pub icms: Decimal,
    pub fcp: Decimal,
    pub afrmm: Decimal,
    pub total: Decimal,
}

impl TaxBreakdown {
    pub fn zero() -> Self {
        Self {
            ii: Decimal::ZERO,
            ipi: Decimal::ZERO,
            pis: Decimal::ZERO,
            cofins: Decimal::ZERO,
            icms: Decimal::ZERO,
            fcp: Decimal::ZERO,
            afrmm: Decimal::ZERO,
            total: Decimal::ZERO,
        }
    }

    /// Build a breakdown from unrounded line amounts
    #[allow(clippy::too_many_arguments)]
    pub fn from_lines(
        ii: Decimal,
        ipi: Decimal,
        pis: Decimal,
        cofins: Decimal,
        icms: Decimal,
        fcp: Decimal,
        afrmm: Decimal,
    ) -> Self {
        let mut breakdown = Self {
            ii: round_money(ii),
            ipi: round_money(ipi),
            pis: round_money(pis),
            cofins: round_money(cofins),
            icms: round_money(icms),
            fcp: round_money(fcp),
            afrmm: round_money(afrmm),
            total: Decimal::ZERO,
        };
        breakdown.recompute_total();
        breakdown
    }

    pub fn get(&self, line: TaxLine) -> Decimal {
        match line {
            TaxLine::Ii => self.ii,
            TaxLine::Ipi => self.ipi,
            TaxLine::Pis => self.pis,
            TaxLine::Cofins => self.cofins,
            TaxLine::Icms => self.icms,
            TaxLine::Fcp => self.fcp,
            TaxLine::Afrmm => self.afrmm,
        }
    }

    /// Replace one line (rounded) and refresh the total
    pub fn set(&mut self, line: TaxLine, amount: Decimal) {
        let amount = round_money(amount);
        match line {
            TaxLine::Ii => self.ii = amount,
            TaxLine::Ipi => self.ipi = amount,
            TaxLine::Pis => self.pis = amount,
            TaxLine::Cofins => self.cofins = amount,
            TaxLine::Icms => self.icms = amount,
            TaxLine::Fcp => self.fcp = amount,
            TaxLine::Afrmm => self.afrmm = amount,
        }
        self.recompute_total();
    }

    /// Line amounts in display order
    pub fn lines(&self) -> [(TaxLine, Decimal); 7] {
        TaxLine::ALL.map(|line| (line, self.get(line)))
    }

    pub fn is_zero(&self) -> bool {
        self.total.is_zero()
    }

    fn recompute_total(&mut self) {
        self.total = self.ii + self.ipi + self.pis + self.cofins + self.icms + self.fcp + self.afrmm;
    }
}
