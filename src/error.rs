//! Error handling for the simulation core
//!
//! Defines the error kinds surfaced by rate resolution and tax calculation.
//! The CLI layer wraps these in anyhow for context chaining.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors that abort a simulation attempt
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SimulationError {
    #[error("quote date {requested} is after today ({today}); supply a manual rate")]
    FutureDate {
        requested: NaiveDate,
        today: NaiveDate,
    },

    #[error("no {currency} quote found on or up to {attempts} days before {requested}")]
    NoQuoteAvailable {
        currency: String,
        requested: NaiveDate,
        attempts: u32,
    },

    #[error("unknown customs regime: {0}")]
    UnknownRegime(String),

    #[error("invalid value for {field}: {value}")]
    InvalidTaxValue { field: String, value: Decimal },
}

impl SimulationError {
    /// Shorthand for an `InvalidTaxValue` on a named input
    pub fn invalid(field: impl Into<String>, value: Decimal) -> Self {
        SimulationError::InvalidTaxValue {
            field: field.into(),
            value,
        }
    }

    /// True when the caller can retry by supplying a manual exchange rate.
    pub fn is_recoverable_with_manual_rate(&self) -> bool {
        matches!(
            self,
            SimulationError::FutureDate { .. } | SimulationError::NoQuoteAvailable { .. }
        )
    }
}

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, SimulationError>;
