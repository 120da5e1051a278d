use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;

use crate::connector::{build_instrument, build_quote, de, Connector};
use crate::errors::{ExchangeError, Result};
use crate::exchange::ExchangeId;
use crate::http::HttpClient;
use crate::types::{Instrument, Quote};

const BINGX_BASE_URL: &str = "https://open-api.bingx.com";

pub struct BingxConnector {
    http: HttpClient,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    code: i64,
    #[serde(default)]
    msg: String,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct ContractItem {
    symbol: String,
    // base lives in `asset`, quote in `currency`
    #[serde(default)]
    asset: String,
    #[serde(default)]
    currency: String,
    status: i32,
}

#[derive(Debug, Deserialize)]
struct TickerItem {
    symbol: String,
    #[serde(rename = "lastPrice", default, deserialize_with = "de::opt_f64_flex")]
    last_price: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct PremiumIndexItem {
    symbol: String,
    #[serde(rename = "lastFundingRate", default, deserialize_with = "de::opt_f64_flex")]
    last_funding_rate: Option<f64>,
    #[serde(rename = "nextFundingTime", default, deserialize_with = "de::opt_i64_flex")]
    next_funding_time: Option<i64>,
}

impl BingxConnector {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    async fn get_data<T>(&self, path: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned + Default,
    {
        let url = format!("{BINGX_BASE_URL}{path}");
        let resp: Envelope<T> = self.http.get_json(&url).await?;
        if resp.code != 0 {
            return Err(ExchangeError::api(ExchangeId::Bingx, resp.msg));
        }
        Ok(resp.data.unwrap_or_default())
    }
}

#[async_trait]
impl Connector for BingxConnector {
    fn id(&self) -> ExchangeId {
        ExchangeId::Bingx
    }

    async fn instruments(&self) -> Result<Vec<Instrument>> {
        let contracts: Vec<ContractItem> = self.get_data("/openApi/swap/v2/quote/contracts").await?;
        Ok(contracts
            .into_iter()
            // status 1 is live
            .filter(|c| c.status == 1)
            .map(|c| build_instrument(ExchangeId::Bingx, c.symbol, c.asset, c.currency))
            .collect())
    }

    async fn quotes(&self) -> Result<Vec<Quote>> {
        let (tickers, premium): (Vec<TickerItem>, Vec<PremiumIndexItem>) = tokio::try_join!(
            self.get_data("/openApi/swap/v2/quote/ticker"),
            self.get_data("/openApi/swap/v2/quote/premiumIndex"),
        )?;

        let mut funding: HashMap<String, (Option<f64>, Option<i64>)> =
            HashMap::with_capacity(premium.len());
        for p in premium {
            funding.insert(p.symbol, (p.last_funding_rate, p.next_funding_time));
        }

        let mut quotes = Vec::with_capacity(tickers.len());
        for t in tickers {
            let (funding_rate, next_funding_ts) =
                funding.remove(&t.symbol).unwrap_or((None, None));
            if let Some(quote) = build_quote(
                ExchangeId::Bingx,
                t.symbol,
                t.last_price,
                funding_rate,
                next_funding_ts,
            ) {
                quotes.push(quote);
            }
        }
        for (symbol, (funding_rate, next_funding_ts)) in funding {
            if let Some(quote) =
                build_quote(ExchangeId::Bingx, symbol, None, funding_rate, next_funding_ts)
            {
                quotes.push(quote);
            }
        }
        Ok(quotes)
    }
}
