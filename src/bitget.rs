use async_trait::async_trait;
use serde::Deserialize;

use crate::connector::{build_instrument, build_quote, de, Connector};
use crate::errors::{ExchangeError, Result};
use crate::exchange::ExchangeId;
use crate::http::HttpClient;
use crate::types::{Instrument, Quote};
use crate::utils;

const BITGET_BASE_URL: &str = "https://api.bitget.com";
const PRODUCT_TYPE: &str = "umcbl";
const OK_CODE: &str = "00000";

/// Funding settles on the venue every 8 hours on UTC boundaries.
const FUNDING_INTERVAL_HOURS: i64 = 8;

pub struct BitgetConnector {
    http: HttpClient,
}

#[derive(Debug, Deserialize)]
struct BitgetResponse<T> {
    code: String,
    #[serde(default)]
    msg: String,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct ContractItem {
    symbol: String,
    #[serde(rename = "baseCoin", default)]
    base_coin: String,
    #[serde(rename = "quoteCoin", default)]
    quote_coin: String,
    #[serde(rename = "symbolStatus", default)]
    symbol_status: String,
}

/// The ticker feed carries the funding rate; the venue has no batch
/// endpoint for the next settlement time, so that is derived from the
/// 8-hour schedule instead.
#[derive(Debug, Deserialize)]
struct TickerItem {
    symbol: String,
    #[serde(default, deserialize_with = "de::opt_f64_flex")]
    last: Option<f64>,
    #[serde(rename = "fundingRate", default, deserialize_with = "de::opt_f64_flex")]
    funding_rate: Option<f64>,
}

impl BitgetConnector {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Connector for BitgetConnector {
    fn id(&self) -> ExchangeId {
        ExchangeId::Bitget
    }

    async fn instruments(&self) -> Result<Vec<Instrument>> {
        let url =
            format!("{BITGET_BASE_URL}/api/mix/v1/market/contracts?productType={PRODUCT_TYPE}");
        let resp: BitgetResponse<Vec<ContractItem>> = self.http.get_json(&url).await?;
        if resp.code != OK_CODE {
            return Err(ExchangeError::api(ExchangeId::Bitget, resp.msg));
        }
        Ok(resp
            .data
            .unwrap_or_default()
            .into_iter()
            .filter(|c| c.symbol_status.eq_ignore_ascii_case("normal"))
            .map(|c| build_instrument(ExchangeId::Bitget, c.symbol, c.base_coin, c.quote_coin))
            .collect())
    }

    async fn quotes(&self) -> Result<Vec<Quote>> {
        let url =
            format!("{BITGET_BASE_URL}/api/mix/v1/market/tickers?productType={PRODUCT_TYPE}");
        let resp: BitgetResponse<Vec<TickerItem>> = self.http.get_json(&url).await?;
        if resp.code != OK_CODE {
            return Err(ExchangeError::api(ExchangeId::Bitget, resp.msg));
        }
        let next_funding = utils::next_aligned_funding_ms(FUNDING_INTERVAL_HOURS);
        Ok(resp
            .data
            .unwrap_or_default()
            .into_iter()
            .filter_map(|t| {
                let next = t.funding_rate.is_some().then_some(next_funding);
                build_quote(ExchangeId::Bitget, t.symbol, t.last, t.funding_rate, next)
            })
            .collect())
    }
}
