//! Application configuration
//!
//! Loaded from `$IMPORTA_CONFIG` or `<config dir>/importa/config.toml`.
//! A missing file means defaults.

use anyhow::{anyhow, bail, Context, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::exchange::{ptax, MAX_LOOKBACK_ATTEMPTS};
use crate::incentives::{FiscalIncentive, IncentiveCatalog};
use crate::regimes::{CalculationMethod, CustomsRegime, RegimeRegistry};
use crate::simulation::{CustomsExpense, Simulator};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExchangeConfig {
    pub max_lookback_days: u32,
    pub timeout_secs: u64,
    pub base_url: String,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            max_lookback_days: MAX_LOOKBACK_ATTEMPTS,
            timeout_secs: ptax::DEFAULT_TIMEOUT_SECS,
            base_url: ptax::DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl ExchangeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Extra regime declared in the config file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegimeConfig {
    pub code: String,
    pub name: String,
    pub method: String,
    #[serde(default)]
    pub requires_license: bool,
    #[serde(default)]
    pub has_incentives: Option<bool>,
}

impl RegimeConfig {
    fn to_regime(&self) -> Result<CustomsRegime> {
        let method: CalculationMethod = self.method.parse().map_err(|_| {
            anyhow!(
                "regime {}: unknown calculation method '{}' (expected standard, temporary, drawback or reimport)",
                self.code,
                self.method
            )
        })?;

        let mut regime = CustomsRegime::new(&self.code, &self.name, method);
        regime.requires_license = self.requires_license;
        if let Some(has_incentives) = self.has_incentives {
            regime.has_incentives = has_incentives;
        }
        Ok(regime)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub exchange: ExchangeConfig,
    pub expenses: Vec<CustomsExpense>,
    pub regimes: Vec<RegimeConfig>,
    pub incentives: Vec<FiscalIncentive>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            exchange: ExchangeConfig::default(),
            expenses: vec![CustomsExpense::new("Taxa Siscomex", dec!(154.23))],
            regimes: Vec::new(),
            incentives: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Parse and validate a TOML document
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(content).context("Invalid configuration file")?;
        config.validate()?;
        Ok(config)
    }

    /// Load from an explicit path; a missing file yields defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read config file {:?}", path))?;
        let config = Self::from_toml(&content)?;
        info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Load from the default location
    pub fn load() -> Result<Self> {
        Self::load_from(&default_config_path()?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.exchange.max_lookback_days == 0 {
            bail!("exchange.max_lookback_days must be at least 1");
        }
        for expense in &self.expenses {
            if expense.amount < Decimal::ZERO {
                bail!(
                    "expense '{}' has a negative amount: {}",
                    expense.description,
                    expense.amount
                );
            }
        }
        for regime in &self.regimes {
            regime.to_regime()?;
        }
        for incentive in &self.incentives {
            incentive
                .validate()
                .context(format!("invalid incentive '{}'", incentive.id))?;
        }
        Ok(())
    }

    /// Built-in regimes plus the ones declared here
    pub fn regime_registry(&self) -> Result<RegimeRegistry> {
        let mut registry = RegimeRegistry::default();
        for regime in &self.regimes {
            registry.register(regime.to_regime()?);
        }
        Ok(registry)
    }

    /// Built-in incentives plus the ones declared here
    pub fn incentive_catalog(&self) -> Result<IncentiveCatalog> {
        let mut catalog = IncentiveCatalog::default();
        for incentive in &self.incentives {
            catalog
                .add(incentive.clone())
                .context(format!("invalid incentive '{}'", incentive.id))?;
        }
        Ok(catalog)
    }

    pub fn simulator(&self) -> Result<Simulator> {
        Ok(Simulator::new(
            self.regime_registry()?,
            self.incentive_catalog()?,
            self.expenses.clone(),
        ))
    }
}

/// `$IMPORTA_CONFIG`, or `<config dir>/importa/config.toml`
pub fn default_config_path() -> Result<PathBuf> {
    if let Some(path) = std::env::var_os("IMPORTA_CONFIG") {
        return Ok(PathBuf::from(path));
    }
    let config_dir = std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(dir_spec::config_home)
        .ok_or_else(|| anyhow!("Could not determine config directory"))?;
    Ok(config_dir.join("importa").join("config.toml"))
}
