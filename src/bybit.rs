use async_trait::async_trait;
use serde::Deserialize;

use crate::connector::{build_instrument, build_quote, de, Connector};
use crate::errors::{ExchangeError, Result};
use crate::exchange::ExchangeId;
use crate::http::HttpClient;
use crate::types::{Instrument, Quote};

const BYBIT_BASE_URL: &str = "https://api.bybit.com";
const PAGE_LIMIT: u32 = 1000;

pub struct BybitConnector {
    http: HttpClient,
}

#[derive(Debug, Deserialize)]
struct InstrumentsResponse {
    #[serde(rename = "retCode")]
    ret_code: i64,
    #[serde(rename = "retMsg", default)]
    ret_msg: String,
    result: Option<InstrumentsResult>,
}

#[derive(Debug, Deserialize)]
struct InstrumentsResult {
    list: Vec<InstrumentItem>,
    #[serde(rename = "nextPageCursor")]
    next_page_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InstrumentItem {
    symbol: String,
    status: String,
    #[serde(rename = "contractType", default)]
    contract_type: String,
    #[serde(rename = "baseCoin", default)]
    base_coin: String,
    #[serde(rename = "quoteCoin", default)]
    quote_coin: String,
}

#[derive(Debug, Deserialize)]
struct TickersResponse {
    #[serde(rename = "retCode")]
    ret_code: i64,
    #[serde(rename = "retMsg", default)]
    ret_msg: String,
    result: Option<TickersResult>,
}

#[derive(Debug, Deserialize)]
struct TickersResult {
    list: Vec<TickerItem>,
}

#[derive(Debug, Deserialize)]
struct TickerItem {
    symbol: String,
    #[serde(rename = "lastPrice", default, deserialize_with = "de::opt_f64_flex")]
    last_price: Option<f64>,
    #[serde(rename = "fundingRate", default, deserialize_with = "de::opt_f64_flex")]
    funding_rate: Option<f64>,
    #[serde(rename = "nextFundingTime", default, deserialize_with = "de::opt_i64_flex")]
    next_funding_time: Option<i64>,
}

impl BybitConnector {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    async fn instrument_pages(&self) -> Result<Vec<InstrumentItem>> {
        let mut items = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let mut url = format!(
                "{BYBIT_BASE_URL}/v5/market/instruments-info?category=linear&limit={PAGE_LIMIT}"
            );
            if let Some(c) = cursor.as_deref() {
                url.push_str("&cursor=");
                url.push_str(c);
            }
            let resp: InstrumentsResponse = self.http.get_json(&url).await?;
            if resp.ret_code != 0 {
                return Err(ExchangeError::api(ExchangeId::Bybit, resp.ret_msg));
            }
            let result = match resp.result {
                Some(r) => r,
                None => break,
            };
            items.extend(result.list);
            cursor = result.next_page_cursor.filter(|c| !c.is_empty());
            if cursor.is_none() {
                break;
            }
        }
        Ok(items)
    }
}

#[async_trait]
impl Connector for BybitConnector {
    fn id(&self) -> ExchangeId {
        ExchangeId::Bybit
    }

    async fn instruments(&self) -> Result<Vec<Instrument>> {
        let items = self.instrument_pages().await?;
        Ok(items
            .into_iter()
            .filter(|i| i.status.eq_ignore_ascii_case("Trading"))
            // delivery futures share the listing; only keep perpetuals
            .filter(|i| i.contract_type.is_empty() || i.contract_type == "LinearPerpetual")
            .map(|i| build_instrument(ExchangeId::Bybit, i.symbol, i.base_coin, i.quote_coin))
            .collect())
    }

    async fn quotes(&self) -> Result<Vec<Quote>> {
        let url = format!("{BYBIT_BASE_URL}/v5/market/tickers?category=linear");
        let resp: TickersResponse = self.http.get_json(&url).await?;
        if resp.ret_code != 0 {
            return Err(ExchangeError::api(ExchangeId::Bybit, resp.ret_msg));
        }
        let list = resp.result.map(|r| r.list).unwrap_or_default();
        Ok(list
            .into_iter()
            .filter_map(|t| {
                build_quote(
                    ExchangeId::Bybit,
                    t.symbol,
                    t.last_price,
                    t.funding_rate,
                    t.next_funding_time,
                )
            })
            .collect())
    }
}
