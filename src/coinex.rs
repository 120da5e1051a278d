use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;

use crate::connector::{build_instrument, build_quote, de, Connector};
use crate::errors::{ExchangeError, Result};
use crate::exchange::ExchangeId;
use crate::http::HttpClient;
use crate::types::{Instrument, Quote};

const COINEX_BASE_URL: &str = "https://api.coinex.com";

/// Linear (USDT-margined) markets.
const MARKET_TYPE_LINEAR: i32 = 1;

pub struct CoinexConnector {
    http: HttpClient,
}

#[derive(Debug, Deserialize)]
struct CoinexResponse<T> {
    code: i64,
    #[serde(default)]
    message: String,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct MarketItem {
    name: String,
    #[serde(rename = "type")]
    market_type: i32,
    #[serde(default)]
    stock: String,
    #[serde(default)]
    money: String,
    available: bool,
}

#[derive(Debug, Deserialize)]
struct TickerAllData {
    ticker: HashMap<String, TickerItem>,
}

/// `funding_time` is a countdown, not a timestamp. Values under an hour
/// are minutes, anything larger is seconds.
#[derive(Debug, Deserialize)]
struct TickerItem {
    #[serde(default, deserialize_with = "de::opt_f64_flex")]
    last: Option<f64>,
    #[serde(default, deserialize_with = "de::opt_f64_flex")]
    funding_rate_last: Option<f64>,
    #[serde(default)]
    funding_time: i64,
}

fn countdown_to_epoch_ms(funding_time: i64, now_ms: i64) -> i64 {
    if funding_time <= 0 {
        return now_ms;
    }
    let millis = if funding_time < 3600 {
        funding_time * 60_000
    } else {
        funding_time * 1000
    };
    now_ms + millis
}

impl CoinexConnector {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    async fn fetch_markets(&self) -> Result<Vec<MarketItem>> {
        let url = format!("{COINEX_BASE_URL}/perpetual/v1/market/list");
        let resp: CoinexResponse<Vec<MarketItem>> = self.http.get_json(&url).await?;
        if resp.code != 0 {
            return Err(ExchangeError::api(ExchangeId::Coinex, resp.message));
        }
        Ok(resp.data.unwrap_or_default())
    }

    async fn fetch_tickers(&self) -> Result<HashMap<String, TickerItem>> {
        let url = format!("{COINEX_BASE_URL}/perpetual/v1/market/ticker/all");
        let resp: CoinexResponse<TickerAllData> = self.http.get_json(&url).await?;
        if resp.code != 0 {
            return Err(ExchangeError::api(ExchangeId::Coinex, resp.message));
        }
        Ok(resp.data.map(|d| d.ticker).unwrap_or_default())
    }
}

#[async_trait]
impl Connector for CoinexConnector {
    fn id(&self) -> ExchangeId {
        ExchangeId::Coinex
    }

    async fn instruments(&self) -> Result<Vec<Instrument>> {
        let markets = self.fetch_markets().await?;
        Ok(markets
            .into_iter()
            .filter(|m| m.available && m.market_type == MARKET_TYPE_LINEAR)
            .map(|m| build_instrument(ExchangeId::Coinex, m.name, m.stock, m.money))
            .collect())
    }

    async fn quotes(&self) -> Result<Vec<Quote>> {
        let (markets, mut tickers) =
            tokio::try_join!(self.fetch_markets(), self.fetch_tickers())?;

        let now_ms = Utc::now().timestamp_millis();
        let mut quotes = Vec::with_capacity(tickers.len());
        for m in markets {
            if !m.available || m.market_type != MARKET_TYPE_LINEAR {
                continue;
            }
            let Some(t) = tickers.remove(&m.name) else {
                continue;
            };
            let next = t
                .funding_rate_last
                .is_some()
                .then(|| countdown_to_epoch_ms(t.funding_time, now_ms));
            if let Some(quote) =
                build_quote(ExchangeId::Coinex, m.name, t.last, t.funding_rate_last, next)
            {
                quotes.push(quote);
            }
        }
        Ok(quotes)
    }
}
