use std::collections::HashMap;

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use serde::Deserialize;
use tracing::warn;

use crate::connector::{build_instrument, build_quote, de, Connector};
use crate::errors::{ExchangeError, Result};
use crate::exchange::ExchangeId;
use crate::http::HttpClient;
use crate::types::{Instrument, Quote};

const OKX_BASE_URL: &str = "https://www.okx.com";

/// Funding comes from a per-instrument endpoint, so requests are fanned
/// out with a cap to stay inside the venue's rate limits.
const FUNDING_CONCURRENCY: usize = 10;

pub struct OkxConnector {
    http: HttpClient,
}

#[derive(Debug, Deserialize)]
struct OkxResponse<T> {
    code: String,
    #[serde(default)]
    msg: String,
    #[serde(default)]
    data: Vec<T>,
}

#[derive(Debug, Default, Deserialize)]
struct InstrumentItem {
    #[serde(rename = "instId")]
    inst_id: String,
    #[serde(rename = "instType", default)]
    inst_type: String,
    #[serde(default)]
    state: String,
}

#[derive(Debug, Default, Deserialize)]
struct TickerItem {
    #[serde(rename = "instId")]
    inst_id: String,
    #[serde(default, deserialize_with = "de::opt_f64_flex")]
    last: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct FundingItem {
    #[serde(rename = "fundingRate", default, deserialize_with = "de::opt_f64_flex")]
    funding_rate: Option<f64>,
    #[serde(rename = "nextFundingTime", default, deserialize_with = "de::opt_i64_flex")]
    next_funding_time: Option<i64>,
}

impl OkxConnector {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    async fn fetch_instruments(&self) -> Result<Vec<InstrumentItem>> {
        let url = format!("{OKX_BASE_URL}/api/v5/public/instruments?instType=SWAP");
        let resp: OkxResponse<InstrumentItem> = self.http.get_json(&url).await?;
        if resp.code != "0" {
            return Err(ExchangeError::api(ExchangeId::Okx, resp.msg));
        }
        Ok(resp
            .data
            .into_iter()
            .filter(|i| i.inst_type.eq_ignore_ascii_case("SWAP"))
            .filter(|i| i.state.eq_ignore_ascii_case("live"))
            .collect())
    }

    async fn fetch_tickers(&self) -> Result<Vec<TickerItem>> {
        let url = format!("{OKX_BASE_URL}/api/v5/market/tickers?instType=SWAP");
        let resp: OkxResponse<TickerItem> = self.http.get_json(&url).await?;
        if resp.code != "0" {
            return Err(ExchangeError::api(ExchangeId::Okx, resp.msg));
        }
        Ok(resp.data)
    }

    async fn fetch_funding(&self, inst_id: &str) -> Result<(Option<f64>, Option<i64>)> {
        let url = format!("{OKX_BASE_URL}/api/v5/public/funding-rate?instId={inst_id}");
        let resp: OkxResponse<FundingItem> = self.http.get_json(&url).await?;
        if resp.code != "0" {
            return Err(ExchangeError::api(ExchangeId::Okx, resp.msg));
        }
        Ok(resp
            .data
            .into_iter()
            .next()
            .map(|f| (f.funding_rate, f.next_funding_time))
            .unwrap_or((None, None)))
    }

    /// Per-instrument funding with bounded concurrency. A failed lookup
    /// drops that one instrument's funding, never the whole venue.
    async fn fetch_all_funding(
        &self,
        inst_ids: Vec<String>,
    ) -> HashMap<String, (Option<f64>, Option<i64>)> {
        stream::iter(inst_ids)
            .map(|inst_id| async move {
                match self.fetch_funding(&inst_id).await {
                    Ok(parts) => Some((inst_id, parts)),
                    Err(err) => {
                        warn!("okx funding fetch failed for {}: {}", inst_id, err);
                        None
                    }
                }
            })
            .buffer_unordered(FUNDING_CONCURRENCY)
            .filter_map(|entry| async move { entry })
            .collect()
            .await
    }
}

#[async_trait]
impl Connector for OkxConnector {
    fn id(&self) -> ExchangeId {
        ExchangeId::Okx
    }

    async fn instruments(&self) -> Result<Vec<Instrument>> {
        let items = self.fetch_instruments().await?;
        Ok(items
            .into_iter()
            .map(|i| build_instrument(ExchangeId::Okx, i.inst_id, String::new(), String::new()))
            .collect())
    }

    async fn quotes(&self) -> Result<Vec<Quote>> {
        let (instruments, tickers) =
            tokio::try_join!(self.fetch_instruments(), self.fetch_tickers())?;

        let mut prices: HashMap<String, Option<f64>> = HashMap::with_capacity(tickers.len());
        for t in tickers {
            prices.insert(t.inst_id, t.last);
        }

        let inst_ids: Vec<String> = instruments.into_iter().map(|i| i.inst_id).collect();
        let mut funding = self.fetch_all_funding(inst_ids.clone()).await;

        Ok(inst_ids
            .into_iter()
            .filter_map(|inst_id| {
                let price = prices.remove(&inst_id).flatten();
                let (funding_rate, next_funding_ts) =
                    funding.remove(&inst_id).unwrap_or((None, None));
                build_quote(ExchangeId::Okx, inst_id, price, funding_rate, next_funding_ts)
            })
            .collect())
    }
}
