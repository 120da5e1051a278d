use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;

use crate::connector::{build_instrument, build_quote, de, Connector};
use crate::errors::{ExchangeError, Result};
use crate::exchange::ExchangeId;
use crate::http::HttpClient;
use crate::types::{Instrument, Quote};

const HTX_BASE_URL: &str = "https://api.hbdm.com";

const CONTRACT_STATUS_LIVE: i32 = 1;

pub struct HtxConnector {
    http: HttpClient,
}

#[derive(Debug, Deserialize)]
struct HtxResp<T> {
    status: String,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct ContractItem {
    #[serde(default)]
    symbol: String,
    contract_code: String,
    #[serde(default)]
    contract_status: i32,
    #[serde(default)]
    trade_partition: String,
}

#[derive(Debug, Deserialize)]
struct BatchMergedResp {
    status: String,
    #[serde(default)]
    ticks: Vec<Tick>,
}

#[derive(Debug, Deserialize)]
struct Tick {
    contract_code: String,
    #[serde(default, deserialize_with = "de::opt_f64_flex")]
    close: Option<f64>,
}

/// `funding_time` is the upcoming settlement; `next_funding_time` is the
/// one after that.
#[derive(Debug, Deserialize)]
struct FundingItem {
    contract_code: String,
    #[serde(default, deserialize_with = "de::opt_f64_flex")]
    funding_rate: Option<f64>,
    #[serde(default, deserialize_with = "de::opt_i64_flex")]
    funding_time: Option<i64>,
}

impl HtxConnector {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    async fn fetch_contracts(&self) -> Result<Vec<ContractItem>> {
        let url = format!("{HTX_BASE_URL}/linear-swap-api/v1/swap_contract_info");
        let resp: HtxResp<Vec<ContractItem>> = self.http.get_json(&url).await?;
        if !resp.status.eq_ignore_ascii_case("ok") {
            return Err(ExchangeError::api(ExchangeId::Htx, resp.status));
        }
        Ok(resp.data.unwrap_or_default())
    }

    async fn fetch_ticks(&self) -> Result<Vec<Tick>> {
        let url = format!("{HTX_BASE_URL}/linear-swap-ex/market/detail/batch_merged");
        let resp: BatchMergedResp = self.http.get_json(&url).await?;
        if !resp.status.eq_ignore_ascii_case("ok") {
            return Err(ExchangeError::api(ExchangeId::Htx, resp.status));
        }
        Ok(resp.ticks)
    }

    async fn fetch_funding(&self) -> Result<Vec<FundingItem>> {
        let url = format!("{HTX_BASE_URL}/linear-swap-api/v1/swap_batch_funding_rate");
        let resp: HtxResp<Vec<FundingItem>> = self.http.get_json(&url).await?;
        if !resp.status.eq_ignore_ascii_case("ok") {
            return Err(ExchangeError::api(ExchangeId::Htx, resp.status));
        }
        Ok(resp.data.unwrap_or_default())
    }
}

#[async_trait]
impl Connector for HtxConnector {
    fn id(&self) -> ExchangeId {
        ExchangeId::Htx
    }

    async fn instruments(&self) -> Result<Vec<Instrument>> {
        let contracts = self.fetch_contracts().await?;
        Ok(contracts
            .into_iter()
            .filter(|c| c.contract_status == CONTRACT_STATUS_LIVE)
            .map(|c| {
                build_instrument(ExchangeId::Htx, c.contract_code, c.symbol, c.trade_partition)
            })
            .collect())
    }

    async fn quotes(&self) -> Result<Vec<Quote>> {
        let (contracts, ticks, funding) = tokio::try_join!(
            self.fetch_contracts(),
            self.fetch_ticks(),
            self.fetch_funding()
        )?;

        let mut prices: HashMap<String, Option<f64>> = HashMap::with_capacity(ticks.len());
        for t in ticks {
            prices.insert(t.contract_code, t.close);
        }
        let mut rates: HashMap<String, (Option<f64>, Option<i64>)> =
            HashMap::with_capacity(funding.len());
        for f in funding {
            rates.insert(f.contract_code, (f.funding_rate, f.funding_time));
        }

        Ok(contracts
            .into_iter()
            .filter(|c| c.contract_status == CONTRACT_STATUS_LIVE)
            .filter_map(|c| {
                let price = prices.remove(&c.contract_code).flatten();
                let (funding_rate, next_funding_ts) =
                    rates.remove(&c.contract_code).unwrap_or((None, None));
                build_quote(
                    ExchangeId::Htx,
                    c.contract_code,
                    price,
                    funding_rate,
                    next_funding_ts,
                )
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_contract_info() {
        let body = r#"{
            "status": "ok",
            "data": [
                {"symbol": "BTC", "contract_code": "BTC-USDT", "contract_status": 1, "trade_partition": "USDT"},
                {"symbol": "OLD", "contract_code": "OLD-USDT", "contract_status": 4, "trade_partition": "USDT"}
            ]
        }"#;
        let resp: HtxResp<Vec<ContractItem>> = serde_json::from_str(body).unwrap();
        assert!(resp.status.eq_ignore_ascii_case("ok"));
        let live: Vec<_> = resp
            .data
            .unwrap()
            .into_iter()
            .filter(|c| c.contract_status == CONTRACT_STATUS_LIVE)
            .collect();
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].contract_code, "BTC-USDT");
    }

    #[test]
    fn test_parse_batch_merged_numeric_close() {
        let body = r#"{
            "status": "ok",
            "ticks": [
                {"contract_code": "BTC-USDT", "close": 64123.4},
                {"contract_code": "ETH-USDT", "close": "3201.5"}
            ]
        }"#;
        let resp: BatchMergedResp = serde_json::from_str(body).unwrap();
        assert_eq!(resp.ticks[0].close, Some(64123.4));
        assert_eq!(resp.ticks[1].close, Some(3201.5));
    }

    #[test]
    fn test_parse_batch_funding_string_fields() {
        let body = r#"{
            "status": "ok",
            "data": [
                {"contract_code": "BTC-USDT", "funding_rate": "0.0001", "funding_time": "1700000000000"}
            ]
        }"#;
        let resp: HtxResp<Vec<FundingItem>> = serde_json::from_str(body).unwrap();
        let funding = resp.data.unwrap();
        assert_eq!(funding[0].funding_rate, Some(0.0001));
        assert_eq!(funding[0].funding_time, Some(1_700_000_000_000));
    }
}
