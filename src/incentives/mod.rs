//! Regional and sectorial tax-reduction programs
//!
//! An incentive replaces each affected tax line by `line × multiplier`.
//! Multipliers are restricted to `[0, 1]`, so applying an incentive can never
//! increase the tax total.

pub mod catalog;

pub use catalog::IncentiveCatalog;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, SimulationError};
use crate::tax::{TaxBreakdown, TaxLine};

/// What kind of program an incentive is
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IncentiveScope {
    Regional,  // Tied to the destination (or origin) state
    Sectorial, // Tied to the product's NCM
}

impl IncentiveScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            IncentiveScope::Regional => "regional",
            IncentiveScope::Sectorial => "sectorial",
        }
    }
}

/// Declarative applicability predicate. An empty list matches anything.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Applicability {
    #[serde(default)]
    pub dest_states: Vec<String>,
    #[serde(default)]
    pub origin_states: Vec<String>,
    #[serde(default)]
    pub ncm_prefixes: Vec<String>,
}

/// Facts about a simulation that incentive predicates look at
#[derive(Debug, Clone, Default)]
pub struct IncentiveContext {
    pub origin_state: String,
    pub dest_state: String,
    pub ncm: Option<String>,
}

/// Multiplier per tax line; `None` leaves the line untouched
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ReductionFactors {
    pub ii: Option<Decimal>,
    pub ipi: Option<Decimal>,
    pub pis: Option<Decimal>,
    pub cofins: Option<Decimal>,
    pub icms: Option<Decimal>,
    pub fcp: Option<Decimal>,
    pub afrmm: Option<Decimal>,
}

impl ReductionFactors {
    pub fn get(&self, line: TaxLine) -> Option<Decimal> {
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

    /// Affected lines with their multipliers, in breakdown order
    pub fn iter(&self) -> impl Iterator<Item = (TaxLine, Decimal)> + '_ {
        TaxLine::ALL
            .into_iter()
            .filter_map(|line| self.get(line).map(|m| (line, m)))
    }
}

/// A tax-reduction program
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FiscalIncentive {
    pub id: String,
    pub name: String,
    pub scope: IncentiveScope,
    pub applicability: Applicability,
    pub reductions: ReductionFactors,
}

impl FiscalIncentive {
    /// Check that every multiplier lies in `[0, 1]`
    pub fn validate(&self) -> Result<()> {
        for (line, multiplier) in self.reductions.iter() {
            if multiplier < Decimal::ZERO || multiplier > Decimal::ONE {
                return Err(SimulationError::invalid(
                    format!("{}.{}", self.id, line.label().to_ascii_lowercase()),
                    multiplier,
                ));
            }
        }
        Ok(())
    }

    pub fn is_applicable(&self, ctx: &IncentiveContext) -> bool {
        let rules = &self.applicability;

        let state_matches = |states: &[String], state: &str| {
            states.is_empty() || states.iter().any(|s| s.eq_ignore_ascii_case(state.trim()))
        };

        let ncm_matches = rules.ncm_prefixes.is_empty()
            || ctx.ncm.as_deref().is_some_and(|ncm| {
                let digits: String = ncm.chars().filter(|c| c.is_ascii_digit()).collect();
                rules.ncm_prefixes.iter().any(|p| digits.starts_with(p.as_str()))
            });

        state_matches(&rules.dest_states, &ctx.dest_state)
            && state_matches(&rules.origin_states, &ctx.origin_state)
            && ncm_matches
    }
}

/// Result of applying one incentive
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IncentiveOutcome {
    Applied {
        breakdown: TaxBreakdown,
        savings: Decimal,
    },
    /// Predicate did not match; the breakdown is returned unchanged
    NotApplicable { breakdown: TaxBreakdown },
}

impl IncentiveOutcome {
    pub fn breakdown(&self) -> &TaxBreakdown {
        match self {
            IncentiveOutcome::Applied { breakdown, .. }
            | IncentiveOutcome::NotApplicable { breakdown } => breakdown,
        }
    }

    pub fn savings(&self) -> Decimal {
        match self {
            IncentiveOutcome::Applied { savings, .. } => *savings,
            IncentiveOutcome::NotApplicable { .. } => Decimal::ZERO,
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, IncentiveOutcome::Applied { .. })
    }
}

/// Apply an incentive to a computed breakdown.
///
/// Fails only when the incentive carries a multiplier outside `[0, 1]`.
pub fn apply(
    breakdown: &TaxBreakdown,
    incentive: &FiscalIncentive,
    ctx: &IncentiveContext,
) -> Result<IncentiveOutcome> {
    incentive.validate()?;

    if !incentive.is_applicable(ctx) {
        debug!("Incentive {} not applicable", incentive.id);
        return Ok(IncentiveOutcome::NotApplicable {
            breakdown: *breakdown,
        });
    }

    let mut reduced = *breakdown;
    for (line, multiplier) in incentive.reductions.iter() {
        reduced.set(line, breakdown.get(line) * multiplier);
    }

    let savings = breakdown.total - reduced.total;
    debug_assert!(savings >= Decimal::ZERO);

    Ok(IncentiveOutcome::Applied {
        breakdown: reduced,
        savings,
    })
}
