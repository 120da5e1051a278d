use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use tracing::debug;

use crate::types::{Quote, QuoteBook};

/// Groups quotes by canonical symbol, then by venue. Empty canonical keys
/// are dropped. Duplicate `(venue, symbol)` pairs should not occur within
/// one fetch; when they do, the first quote wins and the duplicate is
/// logged and discarded.
pub fn aggregate(quotes: Vec<Quote>) -> QuoteBook {
    let mut book: QuoteBook = BTreeMap::new();
    for quote in quotes {
        if quote.symbol.is_empty() {
            continue;
        }
        let by_exchange = book.entry(quote.symbol.clone()).or_default();
        match by_exchange.entry(quote.exchange) {
            Entry::Vacant(slot) => {
                slot.insert(quote);
            }
            Entry::Occupied(_) => {
                debug!(
                    "duplicate quote for {} on {}, keeping first",
                    quote.symbol, quote.exchange
                );
            }
        }
    }
    book
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::ExchangeId;
    use crate::symbols::canonicalize;

    fn quote(ex: ExchangeId, native: &str, price: f64) -> Quote {
        Quote {
            exchange: ex,
            symbol: canonicalize(native),
            native_symbol: native.to_string(),
            price: Some(price),
            funding_rate: None,
            next_funding_ts: None,
        }
    }

    #[test]
    fn test_groups_by_canonical_then_exchange() {
        let book = aggregate(vec![
            quote(ExchangeId::Bybit, "BTCUSDT", 64000.0),
            quote(ExchangeId::Okx, "BTC-USDT-SWAP", 64010.0),
            quote(ExchangeId::Bybit, "ETHUSDT", 3100.0),
        ]);
        assert_eq!(book.len(), 2);

        let btc = &book[&canonicalize("BTCUSDT")];
        assert_eq!(btc.len(), 2);
        assert_eq!(btc[&ExchangeId::Bybit].price, Some(64000.0));
        assert_eq!(btc[&ExchangeId::Okx].price, Some(64010.0));
    }

    #[test]
    fn test_duplicate_pair_keeps_first() {
        let book = aggregate(vec![
            quote(ExchangeId::Bybit, "BTCUSDT", 64000.0),
            quote(ExchangeId::Bybit, "BTC-USDT", 99999.0),
        ]);
        let btc = &book[&canonicalize("BTCUSDT")];
        assert_eq!(btc.len(), 1);
        assert_eq!(btc[&ExchangeId::Bybit].price, Some(64000.0));
        assert_eq!(btc[&ExchangeId::Bybit].native_symbol, "BTCUSDT");
    }

    #[test]
    fn test_empty_canonical_key_is_dropped() {
        let book = aggregate(vec![quote(ExchangeId::Bybit, "", 1.0)]);
        assert!(book.is_empty());
    }

    #[test]
    fn test_outer_order_is_sorted_by_symbol() {
        let book = aggregate(vec![
            quote(ExchangeId::Bybit, "SOLUSDT", 150.0),
            quote(ExchangeId::Bybit, "BTCUSDT", 64000.0),
            quote(ExchangeId::Bybit, "ETHUSDT", 3100.0),
        ]);
        let keys: Vec<_> = book.keys().map(|k| k.as_str().to_string()).collect();
        assert_eq!(keys, vec!["BTC/USDT", "ETH/USDT", "SOL/USDT"]);
    }
}
