use async_trait::async_trait;

use crate::errors::Result;
use crate::exchange::ExchangeId;
use crate::http::HttpClient;
use crate::types::{Instrument, Quote};
use crate::{bingx, bitget, bybit, coinex, gateio, htx, kucoin, mexc, okx};

/// One venue's public market-data surface.
///
/// `instruments` returns the tradable perpetual universe, `quotes` the
/// current price and funding snapshot for that universe. Both are full
/// listings; no per-symbol calls are exposed.
#[async_trait]
pub trait Connector: Send + Sync {
    fn id(&self) -> ExchangeId;

    async fn instruments(&self) -> Result<Vec<Instrument>>;

    async fn quotes(&self) -> Result<Vec<Quote>>;
}

pub fn connector_for(ex: ExchangeId, http: HttpClient) -> Box<dyn Connector> {
    match ex {
        ExchangeId::Bybit => Box::new(bybit::BybitConnector::new(http)),
        ExchangeId::Mexc => Box::new(mexc::MexcConnector::new(http)),
        ExchangeId::Gateio => Box::new(gateio::GateioConnector::new(http)),
        ExchangeId::Kucoin => Box::new(kucoin::KucoinConnector::new(http)),
        ExchangeId::Bitget => Box::new(bitget::BitgetConnector::new(http)),
        ExchangeId::Coinex => Box::new(coinex::CoinexConnector::new(http)),
        ExchangeId::Htx => Box::new(htx::HtxConnector::new(http)),
        ExchangeId::Okx => Box::new(okx::OkxConnector::new(http)),
        ExchangeId::Bingx => Box::new(bingx::BingxConnector::new(http)),
    }
}

/// Deserializers for venues that flip between JSON numbers and numeric
/// strings for the same field.
pub(crate) mod de {
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flexible {
        Num(f64),
        Str(String),
    }

    pub fn f64_flex<'de, D>(deserializer: D) -> Result<f64, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Flexible::deserialize(deserializer)? {
            Flexible::Num(n) => Ok(n),
            Flexible::Str(s) => s.trim().parse().map_err(serde::de::Error::custom),
        }
    }

    /// Missing, null, empty or malformed values all come back as `None`.
    /// Venues use every one of those spellings for "no data yet".
    pub fn opt_f64_flex<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Flexible>::deserialize(deserializer)?;
        Ok(match value {
            None => None,
            Some(Flexible::Num(n)) => Some(n),
            Some(Flexible::Str(s)) => s.trim().parse().ok(),
        })
    }

    pub fn i64_flex<'de, D>(deserializer: D) -> Result<i64, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Flexible::deserialize(deserializer)? {
            Flexible::Num(n) => Ok(n as i64),
            Flexible::Str(s) => s.trim().parse().map_err(serde::de::Error::custom),
        }
    }

    pub fn opt_i64_flex<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Flexible>::deserialize(deserializer)?;
        Ok(match value {
            None => None,
            Some(Flexible::Num(n)) => Some(n as i64),
            Some(Flexible::Str(s)) => s.trim().parse().ok(),
        })
    }
}

/// Prices at or below zero mean the venue has no trade yet.
pub(crate) fn positive(value: f64) -> Option<f64> {
    (value > 0.0).then_some(value)
}

/// Timestamps at or below zero mean the venue has not scheduled the next
/// funding settlement.
pub(crate) fn future_ts(value: i64) -> Option<i64> {
    (value > 0).then_some(value)
}

/// Builds an instrument from whatever asset fields the venue exposes,
/// falling back to the canonical split when one is missing.
pub(crate) fn build_instrument(
    ex: ExchangeId,
    native: String,
    base: String,
    quote: String,
) -> Instrument {
    let canonical = crate::symbols::canonicalize(&native);
    let base_asset = if base.is_empty() {
        canonical.base().to_string()
    } else {
        base.to_uppercase()
    };
    let quote_asset = if quote.is_empty() {
        canonical.quote().to_string()
    } else {
        quote.to_uppercase()
    };
    Instrument {
        exchange: ex,
        native_symbol: native,
        base_asset,
        quote_asset,
        canonical,
    }
}

/// Builds a quote, sanitizing the price and funding timestamp. Entries
/// carrying neither price nor funding are dropped here so every connector
/// applies the same rule.
pub(crate) fn build_quote(
    ex: ExchangeId,
    native: String,
    price: Option<f64>,
    funding_rate: Option<f64>,
    next_funding_ts: Option<i64>,
) -> Option<Quote> {
    if native.is_empty() {
        return None;
    }
    let price = price.and_then(positive);
    let next_funding_ts = next_funding_ts.and_then(future_ts);
    if price.is_none() && funding_rate.is_none() {
        return None;
    }
    Some(Quote {
        exchange: ex,
        symbol: crate::symbols::canonicalize(&native),
        native_symbol: native,
        price,
        funding_rate,
        next_funding_ts,
    })
}
