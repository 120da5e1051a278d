use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;

use crate::connector::{build_instrument, build_quote, de, Connector};
use crate::errors::Result;
use crate::exchange::ExchangeId;
use crate::http::HttpClient;
use crate::types::{Instrument, Quote};

const GATEIO_BASE_URL: &str = "https://api.gateio.ws";
const SETTLE: &str = "usdt";

pub struct GateioConnector {
    http: HttpClient,
}

/// Contract listing doubles as the funding feed: `funding_rate` and
/// `funding_next_apply` (epoch seconds) ride along with the status.
#[derive(Debug, Deserialize)]
struct ContractItem {
    name: String,
    #[serde(default)]
    status: String,
    #[serde(default, deserialize_with = "de::opt_f64_flex")]
    funding_rate: Option<f64>,
    #[serde(default)]
    funding_next_apply: i64,
}

#[derive(Debug, Deserialize)]
struct TickerItem {
    contract: String,
    #[serde(default, deserialize_with = "de::opt_f64_flex")]
    last: Option<f64>,
}

impl GateioConnector {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    async fn fetch_contracts(&self) -> Result<Vec<ContractItem>> {
        let url = format!("{GATEIO_BASE_URL}/api/v4/futures/{SETTLE}/contracts");
        self.http.get_json(&url).await
    }

    async fn fetch_tickers(&self) -> Result<Vec<TickerItem>> {
        let url = format!("{GATEIO_BASE_URL}/api/v4/futures/{SETTLE}/tickers");
        self.http.get_json(&url).await
    }
}

#[async_trait]
impl Connector for GateioConnector {
    fn id(&self) -> ExchangeId {
        ExchangeId::Gateio
    }

    async fn instruments(&self) -> Result<Vec<Instrument>> {
        let contracts = self.fetch_contracts().await?;
        Ok(contracts
            .into_iter()
            .filter(|c| c.status.eq_ignore_ascii_case("trading"))
            .map(|c| build_instrument(ExchangeId::Gateio, c.name, String::new(), String::new()))
            .collect())
    }

    async fn quotes(&self) -> Result<Vec<Quote>> {
        let (contracts, tickers) =
            tokio::try_join!(self.fetch_contracts(), self.fetch_tickers())?;

        let mut prices: HashMap<String, Option<f64>> = HashMap::with_capacity(tickers.len());
        for t in tickers {
            prices.insert(t.contract, t.last);
        }

        Ok(contracts
            .into_iter()
            .filter(|c| c.status.eq_ignore_ascii_case("trading"))
            .filter_map(|c| {
                let price = prices.remove(&c.name).flatten();
                build_quote(
                    ExchangeId::Gateio,
                    c.name,
                    price,
                    c.funding_rate,
                    Some(c.funding_next_apply * 1000),
                )
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_contracts_array() {
        let body = r#"[
            {"name": "BTC_USDT", "status": "trading", "funding_rate": "0.0001", "funding_next_apply": 1700000000},
            {"name": "DEAD_USDT", "status": "delisting", "funding_rate": "0", "funding_next_apply": 0}
        ]"#;
        let contracts: Vec<ContractItem> = serde_json::from_str(body).unwrap();
        assert_eq!(contracts.len(), 2);
        assert_eq!(contracts[0].funding_rate, Some(0.0001));
        assert_eq!(contracts[0].funding_next_apply, 1_700_000_000);
        assert!(!contracts[1].status.eq_ignore_ascii_case("trading"));
    }

    #[test]
    fn test_parse_tickers_array() {
        let body = r#"[{"contract": "BTC_USDT", "last": "64000.1"}]"#;
        let tickers: Vec<TickerItem> = serde_json::from_str(body).unwrap();
        assert_eq!(tickers[0].last, Some(64000.1));
    }
}
