use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::{normalize_currency, ProviderError, QuoteProvider};

pub const DEFAULT_BASE_URL: &str = "https://olinda.bcb.gov.br/olinda/servico/PTAX/versao/v1/odata";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Banco Central OData response for `CotacaoMoedaDia`
#[derive(Debug, Deserialize)]
struct PtaxResponse {
    value: Vec<PtaxBulletin>,
}

#[derive(Debug, Deserialize)]
struct PtaxBulletin {
    #[serde(rename = "cotacaoVenda")]
    cotacao_venda: Option<f64>,
    #[serde(rename = "tipoBoletim")]
    tipo_boletim: Option<String>,
}

/// PTAX quotes from the Banco Central do Brasil Olinda API.
///
/// Customs valuation uses the selling rate of the closing bulletin; days
/// without a closing bulletin are reported as having no quote.
pub struct PtaxProvider {
    client: Client,
    base_url: String,
}

impl PtaxProvider {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent("Mozilla/5.0 (compatible; ImportaBot/1.0)")
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client for PTAX")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn url_for(&self, currency: &str, date: NaiveDate) -> String {
        format!(
            "{}/CotacaoMoedaDia(moeda=@moeda,dataCotacao=@dataCotacao)?@moeda='{}'&@dataCotacao='{}'&$format=json",
            self.base_url,
            normalize_currency(currency),
            date.format("%m-%d-%Y")
        )
    }
}

#[async_trait]
impl QuoteProvider for PtaxProvider {
    fn name(&self) -> &'static str {
        "ptax"
    }

    async fn fetch_rate(
        &self,
        currency: &str,
        date: NaiveDate,
    ) -> std::result::Result<Option<Decimal>, ProviderError> {
        let url = self.url_for(currency, date);
        debug!("GET {}", url);

        let response = self.client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout
            } else {
                ProviderError::Http(e.to_string())
            }
        })?;

        if !response.status().is_success() {
            return Err(ProviderError::Http(format!(
                "PTAX returned error status: {}",
                response.status()
            )));
        }

        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout
            } else {
                ProviderError::Http(e.to_string())
            }
        })?;

        parse_closing_rate(&body)
    }
}

/// Extract the closing selling rate from a PTAX response body
pub fn parse_closing_rate(body: &str) -> std::result::Result<Option<Decimal>, ProviderError> {
    let data: PtaxResponse =
        serde_json::from_str(body).map_err(|e| ProviderError::Decode(e.to_string()))?;

    let closing = data.value.iter().rev().find(|b| {
        b.tipo_boletim
            .as_deref()
            .is_some_and(|t| t.starts_with("Fechamento"))
    });

    Ok(closing
        .and_then(|b| b.cotacao_venda)
        .and_then(Decimal::from_f64_retain)
        .map(|rate| rate.round_dp(4)))
}
