//! Exchange rate resolver
//!
//! Resolves the official rate for a currency on a requested date:
//! 1. A manual override for the currency short-circuits everything
//! 2. Dates after today are rejected outright, BRL included
//! 3. BRL is the identity rate
//! 4. Otherwise walk back one calendar day at a time (bounded) until a
//!    trading day with a quote is found
//!
//! Attempts run one after another so the nearest date to the request always
//! wins.

use chrono::{Local, NaiveDate};
use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::{debug, info, warn};

use super::{
    lookback_dates, normalize_currency, CurrencyQuote, QuoteCache, QuoteProvider, QuoteSource,
    MAX_LOOKBACK_ATTEMPTS,
};
use crate::error::{Result, SimulationError};

const BASE_CURRENCY: &str = "BRL";

pub struct ExchangeRateResolver<P> {
    provider: P,
    cache: QuoteCache,
    overrides: HashMap<String, Decimal>,
    max_attempts: u32,
    today: Option<NaiveDate>,
}

impl<P: QuoteProvider> ExchangeRateResolver<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            cache: QuoteCache::new(),
            overrides: HashMap::new(),
            max_attempts: MAX_LOOKBACK_ATTEMPTS,
            today: None,
        }
    }

    /// Start from a pre-populated cache (e.g. loaded from disk)
    pub fn with_cache(mut self, cache: QuoteCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Pin "today" instead of reading the local clock
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    pub fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Local::now().date_naive())
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn cache(&self) -> &QuoteCache {
        &self.cache
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Suspend automatic resolution for `currency` and always use `rate`
    pub fn set_override(&mut self, currency: &str, rate: Decimal) -> Result<()> {
        if rate <= Decimal::ZERO {
            return Err(SimulationError::invalid("manual_rate", rate));
        }
        let currency = normalize_currency(currency);
        info!("Manual {} rate set to {}", currency, rate);
        self.overrides.insert(currency, rate);
        Ok(())
    }

    /// Remove an override, resuming automatic resolution
    pub fn clear_override(&mut self, currency: &str) -> Option<Decimal> {
        self.overrides.remove(&normalize_currency(currency))
    }

    pub fn override_for(&self, currency: &str) -> Option<Decimal> {
        self.overrides.get(&normalize_currency(currency)).copied()
    }

    /// Resolve the rate for `currency` on `date`
    pub async fn resolve(&mut self, currency: &str, date: NaiveDate) -> Result<CurrencyQuote> {
        let currency = normalize_currency(currency);

        if let Some(rate) = self.override_for(&currency) {
            debug!("Using manual {} rate {}", currency, rate);
            return Ok(CurrencyQuote::fixed(&currency, date, rate, QuoteSource::Manual));
        }

        let today = self.today();
        if date > today {
            return Err(SimulationError::FutureDate {
                requested: date,
                today,
            });
        }

        if currency == BASE_CURRENCY {
            return Ok(CurrencyQuote::fixed(
                &currency,
                date,
                Decimal::ONE,
                QuoteSource::Identity,
            ));
        }

        for candidate in lookback_dates(date, self.max_attempts) {
            if let Some(rate) = self.cache.get(&currency, candidate) {
                debug!("Cache hit for {} on {}: {}", currency, candidate, rate);
                return Ok(self.quote(&currency, date, candidate, rate, QuoteSource::Cache));
            }

            debug!(
                "Querying {} for {} on {}",
                self.provider.name(),
                currency,
                candidate
            );
            match self.provider.fetch_rate(&currency, candidate).await {
                Ok(Some(rate)) if rate > Decimal::ZERO => {
                    self.cache.insert(&currency, candidate, rate);
                    return Ok(self.quote(&currency, date, candidate, rate, QuoteSource::Ptax));
                }
                Ok(Some(rate)) => {
                    warn!(
                        "{} returned non-positive {} rate {} for {}, skipping",
                        self.provider.name(),
                        currency,
                        rate,
                        candidate
                    );
                }
                Ok(None) => {
                    debug!("No {} quote on {}", currency, candidate);
                }
                Err(e) => {
                    warn!(
                        "{} lookup for {} on {} failed: {}",
                        self.provider.name(),
                        currency,
                        candidate,
                        e
                    );
                }
            }
        }

        Err(SimulationError::NoQuoteAvailable {
            currency,
            requested: date,
            attempts: self.max_attempts,
        })
    }

    fn quote(
        &self,
        currency: &str,
        requested: NaiveDate,
        resolved: NaiveDate,
        rate: Decimal,
        source: QuoteSource,
    ) -> CurrencyQuote {
        if resolved != requested {
            info!(
                "{} has no quote on {}, using {} from {}",
                currency, requested, rate, resolved
            );
        }
        CurrencyQuote {
            currency: currency.to_string(),
            requested_date: requested,
            resolved_date: resolved,
            rate,
            source,
        }
    }
}
