use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{normalize_currency, ProviderError, QuoteProvider};

/// Quote provider backed by a fixed table. Dates missing from the table behave
/// like non-trading days.
#[derive(Debug, Default)]
pub struct InMemoryQuoteProvider {
    rates: HashMap<(String, NaiveDate), Decimal>,
    calls: AtomicUsize,
}

impl InMemoryQuoteProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rate(mut self, currency: &str, date: NaiveDate, rate: Decimal) -> Self {
        self.rates.insert((normalize_currency(currency), date), rate);
        self
    }

    /// Number of `fetch_rate` calls served so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QuoteProvider for InMemoryQuoteProvider {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn fetch_rate(
        &self,
        currency: &str,
        date: NaiveDate,
    ) -> Result<Option<Decimal>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.rates.get(&(normalize_currency(currency), date)).copied())
    }
}
