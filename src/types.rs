use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::exchange::{ExchangeId, ALL_EXCHANGES};
use crate::symbols::CanonicalSymbol;

/// Perpetual contract listed on one venue, keyed by its canonical form.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Instrument {
    pub exchange: ExchangeId,
    pub native_symbol: String,
    pub base_asset: String,
    pub quote_asset: String,
    pub canonical: CanonicalSymbol,
}

/// One venue's snapshot for one canonical instrument. Price and funding
/// arrive from different endpoints on most venues, so either side may be
/// missing while the other is present.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub exchange: ExchangeId,
    pub symbol: CanonicalSymbol,
    pub native_symbol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub funding_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_funding_ts: Option<i64>,
}

/// What a fan-out over several venues produced. Disabled venues are
/// recorded separately from hard failures so callers can retry without
/// them.
#[derive(Debug)]
pub struct FetchOutcome<T> {
    pub items: Vec<T>,
    pub disabled: Vec<ExchangeId>,
    pub failed: Vec<ExchangeId>,
}

impl<T> Default for FetchOutcome<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            disabled: Vec::new(),
            failed: Vec::new(),
        }
    }
}

/// Quotes grouped per canonical symbol, then per venue. BTree maps keep
/// output ordering stable across runs.
pub type QuoteBook = BTreeMap<CanonicalSymbol, BTreeMap<ExchangeId, Quote>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    pub long_ex: ExchangeId,
    pub short_ex: ExchangeId,
}

/// One cross-venue opportunity row.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArbitrageRow {
    pub token: String,
    pub base: String,
    pub quote: String,
    pub prices: BTreeMap<ExchangeId, f64>,
    pub funding_rates: BTreeMap<ExchangeId, f64>,
    pub next_funding_ts: BTreeMap<ExchangeId, i64>,
    pub price_spread: f64,
    pub funding_spread: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision: Option<Decision>,
    pub links: BTreeMap<ExchangeId, String>,
}

/// One venue's funding print, formatted for display.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FundingRow {
    pub exchange: ExchangeId,
    pub symbol: String,
    pub token: String,
    pub rate: f64,
    pub rate_percent: f64,
    pub next_funding_ts: i64,
    pub next_funding_time: String,
    pub countdown: String,
    pub link: String,
}

fn effective(exchanges: &Option<Vec<ExchangeId>>) -> Vec<ExchangeId> {
    match exchanges {
        Some(list) if !list.is_empty() => {
            let mut seen = Vec::with_capacity(list.len());
            for ex in list {
                if !seen.contains(ex) {
                    seen.push(*ex);
                }
            }
            seen
        }
        _ => ALL_EXCHANGES.to_vec(),
    }
}

/// Venue selection for a universe listing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InstrumentsRequest {
    pub exchanges: Option<Vec<ExchangeId>>,
}

impl InstrumentsRequest {
    pub fn effective_exchanges(&self) -> Vec<ExchangeId> {
        effective(&self.exchanges)
    }
}

/// Filters for the funding board. Rates are fractions, 0.001 is 0.1%.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FundingRequest {
    pub exchanges: Option<Vec<ExchangeId>>,
    pub min_funding_rate: Option<f64>,
    pub time_zone: Option<String>,
}

impl FundingRequest {
    pub fn effective_exchanges(&self) -> Vec<ExchangeId> {
        effective(&self.exchanges)
    }

    pub fn min_fr(&self) -> f64 {
        self.min_funding_rate.unwrap_or(0.0)
    }
}

/// Filters for a cross-venue arbitrage scan. Rates are fractions; the
/// price floor is optional and absolute.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScanRequest {
    pub exchanges: Option<Vec<ExchangeId>>,
    pub time_zone: Option<String>,
    pub min_funding_rate: Option<f64>,
    pub min_perpetual_price: Option<f64>,
}

impl ScanRequest {
    pub fn effective_exchanges(&self) -> Vec<ExchangeId> {
        effective(&self.exchanges)
    }

    pub fn min_fr(&self) -> f64 {
        self.min_funding_rate.unwrap_or(0.0)
    }

    pub fn min_price(&self) -> Option<f64> {
        self.min_perpetual_price.filter(|p| *p > 0.0)
    }
}
