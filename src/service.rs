use chrono::FixedOffset;

use crate::aggregate::aggregate;
use crate::engine::{compute_opportunities, Thresholds};
use crate::errors::Result;
use crate::exchange::ExchangeInfo;
use crate::fetch::Fetcher;
use crate::filter::FilterLists;
use crate::types::{
    ArbitrageRow, FetchOutcome, FundingRequest, FundingRow, Instrument, InstrumentsRequest,
    ScanRequest,
};
use crate::utils;

/// Request-facing surface of the scanner: exchange listing, instrument
/// universe, funding board, and the cross-venue arbitrage scan. One value
/// serves all requests; every call gets its own filter and threshold set.
pub struct ScannerService {
    fetcher: Fetcher,
    filters: FilterLists,
}

impl ScannerService {
    pub fn new(fetcher: Fetcher, filters: FilterLists) -> Self {
        Self { fetcher, filters }
    }

    pub fn list_exchanges(&self) -> Vec<ExchangeInfo> {
        self.fetcher.registry().list()
    }

    pub async fn list_instruments(
        &self,
        request: &InstrumentsRequest,
    ) -> Result<FetchOutcome<Instrument>> {
        let requested = request.effective_exchanges();
        let mut outcome = self.fetcher.fetch_instruments(&requested).await?;
        outcome
            .items
            .retain(|i| self.filters.is_token_allowed(&i.canonical));
        outcome
            .items
            .sort_by(|a, b| a.canonical.cmp(&b.canonical).then(a.exchange.cmp(&b.exchange)));
        Ok(outcome)
    }

    /// Funding board across the requested venues: every print whose
    /// absolute rate clears the threshold, highest magnitude first.
    pub async fn funding_opportunities(
        &self,
        request: &FundingRequest,
    ) -> Result<Vec<FundingRow>> {
        let requested = request.effective_exchanges();
        let outcome = self.fetcher.fetch_quotes(&requested).await?;
        let quotes = self.filters.apply(outcome.items);

        let offset = display_offset(request.time_zone.as_deref());
        let min_rate = request.min_fr().abs();
        let now_ms = utils::now_ms();

        let mut rows: Vec<FundingRow> = quotes
            .into_iter()
            .filter_map(|q| {
                let rate = q.funding_rate?;
                if rate.abs() < min_rate {
                    return None;
                }
                let next_funding_ts = q.next_funding_ts.unwrap_or(0);
                Some(FundingRow {
                    exchange: q.exchange,
                    symbol: q.native_symbol,
                    token: q.symbol.as_str().to_string(),
                    rate,
                    rate_percent: rate * 100.0,
                    next_funding_ts,
                    next_funding_time: utils::format_ts(next_funding_ts, offset),
                    countdown: utils::countdown(now_ms, next_funding_ts),
                    link: q.exchange.trade_link(q.symbol.base(), q.symbol.quote()),
                })
            })
            .collect();

        rows.sort_by(|a, b| {
            b.rate
                .abs()
                .partial_cmp(&a.rate.abs())
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.token.cmp(&b.token))
        });
        Ok(rows)
    }

    /// Full pipeline: fetch, filter, aggregate, compute spreads.
    pub async fn arbitrage_opportunities(
        &self,
        request: &ScanRequest,
    ) -> Result<Vec<ArbitrageRow>> {
        let requested = request.effective_exchanges();
        let outcome = self.fetcher.fetch_quotes(&requested).await?;
        let quotes = self.filters.apply(outcome.items);
        let book = aggregate(quotes);
        let thresholds = Thresholds {
            min_funding_rate: request.min_fr(),
            min_perp_price: request.min_price(),
        };
        Ok(compute_opportunities(&book, thresholds))
    }
}

fn display_offset(time_zone: Option<&str>) -> Option<FixedOffset> {
    time_zone.and_then(utils::parse_display_offset)
}
