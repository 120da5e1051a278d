use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;

use crate::connector::{build_instrument, build_quote, de, Connector};
use crate::errors::{ExchangeError, Result};
use crate::exchange::ExchangeId;
use crate::http::HttpClient;
use crate::types::{Instrument, Quote};

const KUCOIN_BASE_URL: &str = "https://api-futures.kucoin.com";
const OK_CODE: &str = "200000";

pub struct KucoinConnector {
    http: HttpClient,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    code: String,
    data: Option<T>,
}

/// Active contracts carry the funding fields, so one call serves both the
/// universe and the funding side of a quote.
#[derive(Debug, Deserialize)]
struct ContractItem {
    symbol: String,
    #[serde(rename = "baseCurrency", default)]
    base_currency: String,
    #[serde(rename = "quoteCurrency", default)]
    quote_currency: String,
    #[serde(default)]
    status: String,
    #[serde(rename = "fundingFeeRate", default, deserialize_with = "de::opt_f64_flex")]
    funding_fee_rate: Option<f64>,
    #[serde(
        rename = "nextFundingRateDateTime",
        default,
        deserialize_with = "de::opt_i64_flex"
    )]
    next_funding_rate_date_time: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct TickerItem {
    symbol: String,
    #[serde(default, deserialize_with = "de::opt_f64_flex")]
    price: Option<f64>,
}

impl KucoinConnector {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    async fn fetch_contracts(&self) -> Result<Vec<ContractItem>> {
        let url = format!("{KUCOIN_BASE_URL}/api/v1/contracts/active");
        let resp: ApiResponse<Vec<ContractItem>> = self.http.get_json(&url).await?;
        if resp.code != OK_CODE {
            return Err(ExchangeError::api(ExchangeId::Kucoin, resp.code));
        }
        Ok(resp.data.unwrap_or_default())
    }

    async fn fetch_tickers(&self) -> Result<Vec<TickerItem>> {
        let url = format!("{KUCOIN_BASE_URL}/api/v1/allTickers");
        let resp: ApiResponse<Vec<TickerItem>> = self.http.get_json(&url).await?;
        if resp.code != OK_CODE {
            return Err(ExchangeError::api(ExchangeId::Kucoin, resp.code));
        }
        Ok(resp.data.unwrap_or_default())
    }
}

#[async_trait]
impl Connector for KucoinConnector {
    fn id(&self) -> ExchangeId {
        ExchangeId::Kucoin
    }

    async fn instruments(&self) -> Result<Vec<Instrument>> {
        let contracts = self.fetch_contracts().await?;
        Ok(contracts
            .into_iter()
            .filter(|c| c.status.eq_ignore_ascii_case("Open"))
            .map(|c| {
                build_instrument(
                    ExchangeId::Kucoin,
                    c.symbol,
                    c.base_currency,
                    c.quote_currency,
                )
            })
            .collect())
    }

    async fn quotes(&self) -> Result<Vec<Quote>> {
        let (contracts, tickers) =
            tokio::try_join!(self.fetch_contracts(), self.fetch_tickers())?;

        let mut prices: HashMap<String, Option<f64>> = HashMap::with_capacity(tickers.len());
        for t in tickers {
            prices.insert(t.symbol, t.price);
        }

        Ok(contracts
            .into_iter()
            .filter(|c| c.status.eq_ignore_ascii_case("Open"))
            .filter_map(|c| {
                let price = prices.remove(&c.symbol).flatten();
                build_quote(
                    ExchangeId::Kucoin,
                    c.symbol,
                    price,
                    c.funding_fee_rate,
                    c.next_funding_rate_date_time,
                )
            })
            .collect())
    }
}
