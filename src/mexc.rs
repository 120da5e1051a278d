use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;

use crate::connector::{build_instrument, build_quote, de, Connector};
use crate::errors::{ExchangeError, Result};
use crate::exchange::ExchangeId;
use crate::http::HttpClient;
use crate::types::{Instrument, Quote};

const MEXC_BASE_URL: &str = "https://contract.mexc.com";

pub struct MexcConnector {
    http: HttpClient,
}

#[derive(Debug, Deserialize)]
struct ContractDetailResponse {
    code: i64,
    #[serde(default)]
    msg: String,
    #[serde(default)]
    data: Vec<ContractItem>,
}

#[derive(Debug, Deserialize)]
struct ContractItem {
    symbol: String,
    #[serde(rename = "baseCoin", default)]
    base_coin: String,
    #[serde(rename = "quoteCoin", default)]
    quote_coin: String,
    state: i32,
}

#[derive(Debug, Deserialize)]
struct TickerListResponse {
    code: i64,
    #[serde(default)]
    msg: String,
    #[serde(default)]
    data: Vec<TickerItem>,
}

#[derive(Debug, Deserialize)]
struct TickerItem {
    symbol: String,
    #[serde(rename = "lastPrice", default, deserialize_with = "de::opt_f64_flex")]
    last_price: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct FundingListResponse {
    code: i64,
    #[serde(default)]
    msg: String,
    #[serde(default)]
    data: Vec<FundingItem>,
}

#[derive(Debug, Deserialize)]
struct FundingItem {
    symbol: String,
    #[serde(rename = "fundingRate", default, deserialize_with = "de::opt_f64_flex")]
    funding_rate: Option<f64>,
    #[serde(rename = "nextSettleTime", default, deserialize_with = "de::opt_i64_flex")]
    next_settle_time: Option<i64>,
}

impl MexcConnector {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    async fn fetch_tickers(&self) -> Result<Vec<TickerItem>> {
        let url = format!("{MEXC_BASE_URL}/api/v1/contract/ticker");
        let resp: TickerListResponse = self.http.get_json(&url).await?;
        if resp.code != 0 {
            return Err(ExchangeError::api(ExchangeId::Mexc, resp.msg));
        }
        Ok(resp.data)
    }

    async fn fetch_funding(&self) -> Result<Vec<FundingItem>> {
        let url = format!("{MEXC_BASE_URL}/api/v1/contract/funding_rate");
        let resp: FundingListResponse = self.http.get_json(&url).await?;
        if resp.code != 0 {
            return Err(ExchangeError::api(ExchangeId::Mexc, resp.msg));
        }
        Ok(resp.data)
    }
}

#[async_trait]
impl Connector for MexcConnector {
    fn id(&self) -> ExchangeId {
        ExchangeId::Mexc
    }

    async fn instruments(&self) -> Result<Vec<Instrument>> {
        let url = format!("{MEXC_BASE_URL}/api/v1/contract/detail");
        let resp: ContractDetailResponse = self.http.get_json(&url).await?;
        if resp.code != 0 {
            return Err(ExchangeError::api(ExchangeId::Mexc, resp.msg));
        }
        Ok(resp
            .data
            .into_iter()
            // state 0 is live, everything else is paused or delisted
            .filter(|c| c.state == 0)
            .map(|c| build_instrument(ExchangeId::Mexc, c.symbol, c.base_coin, c.quote_coin))
            .collect())
    }

    async fn quotes(&self) -> Result<Vec<Quote>> {
        let (tickers, funding) = tokio::try_join!(self.fetch_tickers(), self.fetch_funding())?;

        let mut rates: HashMap<String, (Option<f64>, Option<i64>)> =
            HashMap::with_capacity(funding.len());
        for f in funding {
            rates.insert(f.symbol, (f.funding_rate, f.next_settle_time));
        }

        let mut quotes = Vec::with_capacity(tickers.len());
        for t in tickers {
            let (funding_rate, next_funding_ts) =
                rates.remove(&t.symbol).unwrap_or((None, None));
            if let Some(quote) = build_quote(
                ExchangeId::Mexc,
                t.symbol,
                t.last_price,
                funding_rate,
                next_funding_ts,
            ) {
                quotes.push(quote);
            }
        }
        // funding prints without a ticker row still matter for the board
        for (symbol, (funding_rate, next_funding_ts)) in rates {
            if let Some(quote) =
                build_quote(ExchangeId::Mexc, symbol, None, funding_rate, next_funding_ts)
            {
                quotes.push(quote);
            }
        }
        Ok(quotes)
    }
}
