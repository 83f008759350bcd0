use once_cell::sync::Lazy;
use rust_decimal_macros::dec;

use super::{Applicability, FiscalIncentive, IncentiveScope, ReductionFactors};
use crate::error::Result;

/// Built-in programs, shared read-only across the process.
static BUILT_IN: Lazy<Vec<FiscalIncentive>> = Lazy::new(|| {
    vec![
        FiscalIncentive {
            id: "zfm".to_string(),
            name: "Zona Franca de Manaus".to_string(),
            scope: IncentiveScope::Regional,
            applicability: Applicability {
                dest_states: vec!["AM".to_string()],
                ..Default::default()
            },
            // II reduced by 88%, IPI and ICMS exempt
            reductions: ReductionFactors {
                ii: Some(dec!(0.12)),
                ipi: Some(dec!(0)),
                icms: Some(dec!(0)),
                ..Default::default()
            },
        },
        FiscalIncentive {
            id: "ttd409".to_string(),
            name: "TTD 409 - Santa Catarina".to_string(),
            scope: IncentiveScope::Regional,
            applicability: Applicability {
                dest_states: vec!["SC".to_string()],
                ..Default::default()
            },
            // ICMS collected at 2.6% instead of 18%
            reductions: ReductionFactors {
                icms: Some(dec!(0.1444)),
                ..Default::default()
            },
        },
        FiscalIncentive {
            id: "compete-es".to_string(),
            name: "COMPETE - Espírito Santo".to_string(),
            scope: IncentiveScope::Regional,
            applicability: Applicability {
                dest_states: vec!["ES".to_string()],
                ..Default::default()
            },
            // ICMS collected at 7% instead of 18%
            reductions: ReductionFactors {
                icms: Some(dec!(0.3889)),
                ..Default::default()
            },
        },
        FiscalIncentive {
            id: "lei-informatica".to_string(),
            name: "Lei de Informática".to_string(),
            scope: IncentiveScope::Sectorial,
            applicability: Applicability {
                ncm_prefixes: vec!["8471".to_string(), "8473".to_string(), "8517".to_string()],
                ..Default::default()
            },
            reductions: ReductionFactors {
                ipi: Some(dec!(0.2)),
                ..Default::default()
            },
        },
    ]
});

/// Ordered set of incentives considered by the simulator
#[derive(Debug, Clone)]
pub struct IncentiveCatalog {
    incentives: Vec<FiscalIncentive>,
}

impl Default for IncentiveCatalog {
    fn default() -> Self {
        Self {
            incentives: BUILT_IN.clone(),
        }
    }
}

impl IncentiveCatalog {
    pub fn empty() -> Self {
        Self {
            incentives: Vec::new(),
        }
    }

    pub fn list(&self) -> &[FiscalIncentive] {
        &self.incentives
    }

    pub fn get(&self, id: &str) -> Option<&FiscalIncentive> {
        self.incentives.iter().find(|i| i.id.eq_ignore_ascii_case(id))
    }

    /// Add a validated incentive, replacing one with the same id in place
    pub fn add(&mut self, incentive: FiscalIncentive) -> Result<()> {
        incentive.validate()?;
        match self
            .incentives
            .iter_mut()
            .find(|i| i.id.eq_ignore_ascii_case(&incentive.id))
        {
            Some(existing) => *existing = incentive,
            None => self.incentives.push(incentive),
        }
        Ok(())
    }
}
