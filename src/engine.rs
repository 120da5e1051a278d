use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::exchange::ExchangeId;
use crate::symbols::CanonicalSymbol;
use crate::types::{ArbitrageRow, Decision, Quote, QuoteBook};

/// Row-level thresholds, all expressed as fractions and absolute prices.
#[derive(Debug, Clone, Copy, Default)]
pub struct Thresholds {
    /// Minimum funding spread to keep a row, 0.001 is 0.1%
    pub min_funding_rate: f64,
    /// Keep a row only if at least one venue's price reaches this floor
    pub min_perp_price: Option<f64>,
}

/// Turns the grouped quote book into opportunity rows. Symbols quoted on
/// fewer than two venues are skipped; nothing in here can fail, sparse
/// entries just drop out.
pub fn compute_opportunities(book: &QuoteBook, thresholds: Thresholds) -> Vec<ArbitrageRow> {
    let mut rows: Vec<ArbitrageRow> = book
        .iter()
        .filter(|(_, by_exchange)| by_exchange.len() >= 2)
        .filter_map(|(symbol, by_exchange)| build_row(symbol, by_exchange, thresholds))
        .collect();

    rows.sort_by(|a, b| {
        b.funding_spread
            .partial_cmp(&a.funding_spread)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.token.cmp(&b.token))
    });
    rows
}

fn build_row(
    symbol: &CanonicalSymbol,
    by_exchange: &BTreeMap<ExchangeId, Quote>,
    thresholds: Thresholds,
) -> Option<ArbitrageRow> {
    let mut prices = BTreeMap::new();
    let mut funding_rates = BTreeMap::new();
    let mut next_funding_ts = BTreeMap::new();
    let mut links = BTreeMap::new();

    for (ex, quote) in by_exchange {
        if let Some(price) = quote.price {
            prices.insert(*ex, price);
        }
        if let Some(rate) = quote.funding_rate {
            funding_rates.insert(*ex, rate);
        }
        if let Some(ts) = quote.next_funding_ts {
            next_funding_ts.insert(*ex, ts);
        }
        links.insert(*ex, ex.trade_link(symbol.base(), symbol.quote()));
    }

    if let Some(floor) = thresholds.min_perp_price {
        if !prices.values().any(|p| *p >= floor) {
            return None;
        }
    }

    let price_spread = match (
        prices.values().cloned().reduce(f64::max),
        prices.values().cloned().reduce(f64::min),
    ) {
        (Some(max), Some(min)) if prices.len() >= 2 => max - min,
        _ => 0.0,
    };

    // long where funding is lowest (longs get paid), short where highest
    let decision = if funding_rates.len() >= 2 {
        let (long_ex, long_rate) = funding_rates
            .iter()
            .min_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(Ordering::Equal))
            .map(|(ex, rate)| (*ex, *rate))?;
        let (short_ex, short_rate) = funding_rates
            .iter()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(Ordering::Equal))
            .map(|(ex, rate)| (*ex, *rate))?;
        Some((Decision { long_ex, short_ex }, short_rate - long_rate))
    } else {
        None
    };
    let (decision, funding_spread) = match decision {
        Some((d, spread)) => (Some(d), spread),
        None => (None, 0.0),
    };

    if funding_spread < thresholds.min_funding_rate {
        return None;
    }

    Some(ArbitrageRow {
        token: symbol.as_str().to_string(),
        base: symbol.base().to_string(),
        quote: symbol.quote().to_string(),
        prices,
        funding_rates,
        next_funding_ts,
        price_spread,
        funding_spread,
        decision,
        links,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregate;
    use crate::exchange::ExchangeId;
    use crate::symbols::canonicalize;
    use crate::types::Quote;

    fn quote(
        ex: ExchangeId,
        native: &str,
        price: Option<f64>,
        funding_rate: Option<f64>,
    ) -> Quote {
        Quote {
            exchange: ex,
            symbol: canonicalize(native),
            native_symbol: native.to_string(),
            price,
            funding_rate,
            next_funding_ts: Some(1_700_000_000_000),
        }
    }

    #[test]
    fn test_long_lowest_short_highest() {
        let book = aggregate(vec![
            quote(ExchangeId::Bybit, "BTCUSDT", Some(64000.0), Some(0.001)),
            quote(ExchangeId::Okx, "BTC-USDT-SWAP", Some(64010.0), Some(-0.002)),
            quote(ExchangeId::Mexc, "BTC_USDT", Some(64005.0), Some(0.0005)),
        ]);
        let rows = compute_opportunities(&book, Thresholds::default());
        assert_eq!(rows.len(), 1);

        let row = &rows[0];
        let decision = row.decision.unwrap();
        assert_eq!(decision.long_ex, ExchangeId::Okx);
        assert_eq!(decision.short_ex, ExchangeId::Bybit);
        assert!((row.funding_spread - 0.003).abs() < 1e-12);
        assert!((row.price_spread - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_single_exchange_symbols_are_skipped() {
        let book = aggregate(vec![quote(
            ExchangeId::Bybit,
            "BTCUSDT",
            Some(64000.0),
            Some(0.001),
        )]);
        assert!(compute_opportunities(&book, Thresholds::default()).is_empty());
    }

    #[test]
    fn test_min_funding_rate_excludes_rows() {
        let book = aggregate(vec![
            quote(ExchangeId::Bybit, "BTCUSDT", Some(64000.0), Some(0.0001)),
            quote(ExchangeId::Okx, "BTC-USDT-SWAP", Some(64010.0), Some(0.0002)),
        ]);
        let thresholds = Thresholds {
            min_funding_rate: 0.001,
            min_perp_price: None,
        };
        assert!(compute_opportunities(&book, thresholds).is_empty());

        let thresholds = Thresholds {
            min_funding_rate: 0.0001,
            min_perp_price: None,
        };
        assert_eq!(compute_opportunities(&book, thresholds).len(), 1);
    }

    #[test]
    fn test_min_price_floor() {
        let book = aggregate(vec![
            quote(ExchangeId::Bybit, "PEPEUSDT", Some(0.00001), Some(0.001)),
            quote(ExchangeId::Okx, "PEPE-USDT-SWAP", Some(0.0000101), Some(-0.001)),
        ]);
        let thresholds = Thresholds {
            min_funding_rate: 0.0,
            min_perp_price: Some(1.0),
        };
        assert!(compute_opportunities(&book, thresholds).is_empty());
        assert_eq!(compute_opportunities(&book, Thresholds::default()).len(), 1);
    }

    #[test]
    fn test_single_funding_rate_omits_decision() {
        let book = aggregate(vec![
            quote(ExchangeId::Bybit, "BTCUSDT", Some(64000.0), Some(0.001)),
            quote(ExchangeId::Okx, "BTC-USDT-SWAP", Some(64010.0), None),
        ]);
        let rows = compute_opportunities(&book, Thresholds::default());
        assert_eq!(rows.len(), 1);
        assert!(rows[0].decision.is_none());
        assert_eq!(rows[0].funding_spread, 0.0);
    }

    #[test]
    fn test_rows_sorted_by_funding_spread_desc() {
        let book = aggregate(vec![
            quote(ExchangeId::Bybit, "AUSDT", Some(1.0), Some(0.0001)),
            quote(ExchangeId::Okx, "A-USDT-SWAP", Some(1.0), Some(-0.0001)),
            quote(ExchangeId::Bybit, "BUSDT", Some(1.0), Some(0.002)),
            quote(ExchangeId::Okx, "B-USDT-SWAP", Some(1.0), Some(-0.002)),
        ]);
        let rows = compute_opportunities(&book, Thresholds::default());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].token, "B/USDT");
        assert_eq!(rows[1].token, "A/USDT");
        assert!(rows[0].funding_spread > rows[1].funding_spread);
    }

    #[test]
    fn test_links_follow_the_quoting_exchanges() {
        let book = aggregate(vec![
            quote(ExchangeId::Bybit, "BTCUSDT", Some(64000.0), Some(0.001)),
            quote(ExchangeId::Okx, "BTC-USDT-SWAP", Some(64010.0), Some(-0.001)),
        ]);
        let rows = compute_opportunities(&book, Thresholds::default());
        let links = &rows[0].links;
        assert_eq!(links.len(), 2);
        assert_eq!(
            links[&ExchangeId::Bybit],
            "https://www.bybit.com/trade/usdt/BTCUSDT"
        );
    }
}
