// Exchange module - official (PTAX) rate resolution with trading-day fallback

pub mod memory;
pub mod ptax;
pub mod resolver;

pub use memory::InMemoryQuoteProvider;
pub use ptax::PtaxProvider;
pub use resolver::ExchangeRateResolver;

use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// How many calendar days (the requested one included) are tried before giving up
pub const MAX_LOOKBACK_ATTEMPTS: u32 = 7;

/// Where a quote came from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum QuoteSource {
    Ptax,     // Fetched from the quote provider
    Cache,    // Read from the injected quote cache
    Manual,   // Caller-supplied override
    Identity, // BRL to BRL
}

impl QuoteSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuoteSource::Ptax => "ptax",
            QuoteSource::Cache => "cache",
            QuoteSource::Manual => "manual",
            QuoteSource::Identity => "identity",
        }
    }
}

/// A resolved exchange rate (BRL per unit of `currency`)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CurrencyQuote {
    pub currency: String,
    pub requested_date: NaiveDate,
    pub resolved_date: NaiveDate,
    pub rate: Decimal,
    pub source: QuoteSource,
}

impl CurrencyQuote {
    /// Quote that did not need any lookup (manual or identity)
    pub fn fixed(currency: &str, date: NaiveDate, rate: Decimal, source: QuoteSource) -> Self {
        Self {
            currency: normalize_currency(currency),
            requested_date: date,
            resolved_date: date,
            rate,
            source,
        }
    }

    /// Days between the requested date and the trading day actually used
    pub fn fallback_days(&self) -> i64 {
        (self.requested_date - self.resolved_date).num_days()
    }
}

/// Failure talking to a quote provider. The resolver treats every variant as
/// "no quote for this date".
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("request timed out")]
    Timeout,

    #[error("http error: {0}")]
    Http(String),

    #[error("decode error: {0}")]
    Decode(String),
}

/// Source of daily official rates
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Rate for `currency` on exactly `date`, or `None` when that date has no
    /// quote (weekend, holiday).
    async fn fetch_rate(
        &self,
        currency: &str,
        date: NaiveDate,
    ) -> Result<Option<Decimal>, ProviderError>;
}

/// Read-through quote cache keyed by `(currency, date)`.
///
/// Entries are only ever added; nothing is invalidated while a resolver holds it.
#[derive(Debug, Clone, Default)]
pub struct QuoteCache {
    entries: HashMap<(String, NaiveDate), Decimal>,
}

impl QuoteCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, currency: &str, date: NaiveDate) -> Option<Decimal> {
        self.entries
            .get(&(normalize_currency(currency), date))
            .copied()
    }

    /// Insert a rate unless one is already cached for that key
    pub fn insert(&mut self, currency: &str, date: NaiveDate, rate: Decimal) {
        self.entries
            .entry((normalize_currency(currency), date))
            .or_insert(rate);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, NaiveDate, Decimal)> {
        self.entries
            .iter()
            .map(|((currency, date), rate)| (currency.as_str(), *date, *rate))
    }
}

impl FromIterator<(String, NaiveDate, Decimal)> for QuoteCache {
    fn from_iter<I: IntoIterator<Item = (String, NaiveDate, Decimal)>>(iter: I) -> Self {
        let mut cache = QuoteCache::new();
        for (currency, date, rate) in iter {
            cache.insert(&currency, date, rate);
        }
        cache
    }
}

/// Descending sequence `start, start - 1 day, ...` of at most `max_attempts` dates.
pub fn lookback_dates(start: NaiveDate, max_attempts: u32) -> impl Iterator<Item = NaiveDate> {
    (0..i64::from(max_attempts)).map_while(move |offset| start.checked_sub_signed(Duration::days(offset)))
}

pub fn normalize_currency(currency: &str) -> String {
    currency.trim().to_ascii_uppercase()
}
