//! Pipeline tests over scripted in-process venues: fan-out degradation,
//! the disabled-venue retry, and the full fetch -> filter -> aggregate ->
//! decision path, all without touching the network.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use spreadscan::connector::Connector;
use spreadscan::errors::{ExchangeError, Result};
use spreadscan::exchange::{ExchangeId, ExchangeRegistry};
use spreadscan::fetch::Fetcher;
use spreadscan::filter::FilterLists;
use spreadscan::service::ScannerService;
use spreadscan::symbols::canonicalize;
use spreadscan::types::{Instrument, Quote, ScanRequest};

#[derive(Clone)]
enum Script {
    Quotes(Vec<Quote>),
    Disabled,
    Fail,
    Hang,
}

struct StubVenue {
    id: ExchangeId,
    script: Script,
    calls: Arc<AtomicUsize>,
    instrument_calls: Arc<AtomicUsize>,
}

impl StubVenue {
    fn new(id: ExchangeId, script: Script) -> (Box<dyn Connector>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let venue = Self {
            id,
            script,
            calls: calls.clone(),
            instrument_calls: Arc::new(AtomicUsize::new(0)),
        };
        (Box::new(venue), calls)
    }

    fn with_instrument_counter(
        id: ExchangeId,
        script: Script,
    ) -> (Box<dyn Connector>, Arc<AtomicUsize>) {
        let instrument_calls = Arc::new(AtomicUsize::new(0));
        let venue = Self {
            id,
            script,
            calls: Arc::new(AtomicUsize::new(0)),
            instrument_calls: instrument_calls.clone(),
        };
        (Box::new(venue), instrument_calls)
    }

    fn run<T: Clone>(&self, ok: &[T]) -> ScriptOutcome<T> {
        match &self.script {
            Script::Quotes(_) => ScriptOutcome::Ok(ok.to_vec()),
            Script::Disabled => ScriptOutcome::Err(ExchangeError::Disabled(self.id)),
            Script::Fail => ScriptOutcome::Err(ExchangeError::api(self.id, "boom")),
            Script::Hang => ScriptOutcome::Hang,
        }
    }
}

enum ScriptOutcome<T> {
    Ok(Vec<T>),
    Err(ExchangeError),
    Hang,
}

#[async_trait]
impl Connector for StubVenue {
    fn id(&self) -> ExchangeId {
        self.id
    }

    async fn instruments(&self) -> Result<Vec<Instrument>> {
        self.instrument_calls.fetch_add(1, Ordering::SeqCst);
        let items = match &self.script {
            Script::Quotes(quotes) => quotes
                .iter()
                .map(|q| Instrument {
                    exchange: self.id,
                    native_symbol: q.native_symbol.clone(),
                    base_asset: q.symbol.base().to_string(),
                    quote_asset: q.symbol.quote().to_string(),
                    canonical: q.symbol.clone(),
                })
                .collect(),
            _ => Vec::new(),
        };
        match self.run(&items) {
            ScriptOutcome::Ok(items) => Ok(items),
            ScriptOutcome::Err(e) => Err(e),
            ScriptOutcome::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(Vec::new())
            }
        }
    }

    async fn quotes(&self) -> Result<Vec<Quote>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let quotes = match &self.script {
            Script::Quotes(quotes) => quotes.clone(),
            _ => Vec::new(),
        };
        match self.run(&quotes) {
            ScriptOutcome::Ok(quotes) => Ok(quotes),
            ScriptOutcome::Err(e) => Err(e),
            ScriptOutcome::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(Vec::new())
            }
        }
    }
}

fn quote(ex: ExchangeId, native: &str, price: f64, funding_rate: f64) -> Quote {
    Quote {
        exchange: ex,
        symbol: canonicalize(native),
        native_symbol: native.to_string(),
        price: Some(price),
        funding_rate: Some(funding_rate),
        next_funding_ts: Some(1_700_000_000_000),
    }
}

fn fetcher(venues: Vec<Box<dyn Connector>>) -> Fetcher {
    Fetcher::with_connectors(
        venues,
        ExchangeRegistry::new(),
        Duration::from_millis(200),
        Duration::from_secs(3600),
    )
}

#[tokio::test]
async fn test_one_venue_times_out_others_still_answer() {
    let (bybit, _) = StubVenue::new(
        ExchangeId::Bybit,
        Script::Quotes(vec![quote(ExchangeId::Bybit, "BTCUSDT", 64000.0, 0.0001)]),
    );
    let (okx, _) = StubVenue::new(
        ExchangeId::Okx,
        Script::Quotes(vec![quote(ExchangeId::Okx, "BTC-USDT-SWAP", 64010.0, -0.0002)]),
    );
    let (htx, _) = StubVenue::new(ExchangeId::Htx, Script::Hang);

    let fetcher = fetcher(vec![bybit, okx, htx]);
    let outcome = fetcher
        .fetch_quotes(&[ExchangeId::Bybit, ExchangeId::Okx, ExchangeId::Htx])
        .await
        .unwrap();

    assert_eq!(outcome.items.len(), 2);
    assert_eq!(outcome.failed, vec![ExchangeId::Htx]);
    assert!(outcome.disabled.is_empty());
}

#[tokio::test]
async fn test_disabled_venue_triggers_exactly_one_retry() {
    let (bybit, bybit_calls) = StubVenue::new(
        ExchangeId::Bybit,
        Script::Quotes(vec![quote(ExchangeId::Bybit, "BTCUSDT", 64000.0, 0.0001)]),
    );
    let (mexc, mexc_calls) = StubVenue::new(
        ExchangeId::Mexc,
        Script::Quotes(vec![quote(ExchangeId::Mexc, "BTC_USDT", 64005.0, 0.0003)]),
    );
    let (okx, okx_calls) = StubVenue::new(ExchangeId::Okx, Script::Disabled);

    let fetcher = fetcher(vec![bybit, mexc, okx]);
    let outcome = fetcher
        .fetch_quotes(&[ExchangeId::Bybit, ExchangeId::Mexc, ExchangeId::Okx])
        .await
        .unwrap();

    // survivors are re-queried once, the disabled venue is not
    assert_eq!(bybit_calls.load(Ordering::SeqCst), 2);
    assert_eq!(mexc_calls.load(Ordering::SeqCst), 2);
    assert_eq!(okx_calls.load(Ordering::SeqCst), 1);

    assert_eq!(outcome.items.len(), 2);
    assert_eq!(outcome.disabled, vec![ExchangeId::Okx]);
    assert!(outcome.failed.is_empty());
}

#[tokio::test]
async fn test_every_venue_disabled_degrades_to_empty() {
    let (bybit, bybit_calls) = StubVenue::new(ExchangeId::Bybit, Script::Disabled);
    let (okx, _) = StubVenue::new(ExchangeId::Okx, Script::Disabled);

    let fetcher = fetcher(vec![bybit, okx]);
    let outcome = fetcher
        .fetch_quotes(&[ExchangeId::Bybit, ExchangeId::Okx])
        .await
        .unwrap();

    assert!(outcome.items.is_empty());
    assert_eq!(outcome.disabled.len(), 2);
    // no second pass once nothing is left to retry
    assert_eq!(bybit_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_every_venue_failing_hard_is_an_error() {
    let (bybit, _) = StubVenue::new(ExchangeId::Bybit, Script::Fail);
    let (okx, _) = StubVenue::new(ExchangeId::Okx, Script::Hang);

    let fetcher = fetcher(vec![bybit, okx]);
    let result = fetcher.fetch_quotes(&[ExchangeId::Bybit, ExchangeId::Okx]).await;
    assert!(matches!(result, Err(ExchangeError::AllSourcesFailed)));
}

#[tokio::test]
async fn test_registry_disabled_venue_is_never_queried() {
    let (bybit, _) = StubVenue::new(
        ExchangeId::Bybit,
        Script::Quotes(vec![quote(ExchangeId::Bybit, "BTCUSDT", 64000.0, 0.0001)]),
    );
    let (okx, okx_calls) = StubVenue::new(
        ExchangeId::Okx,
        Script::Quotes(vec![quote(ExchangeId::Okx, "BTC-USDT-SWAP", 64010.0, -0.0002)]),
    );

    let fetcher = Fetcher::with_connectors(
        vec![bybit, okx],
        ExchangeRegistry::with_disabled(&[ExchangeId::Okx]),
        Duration::from_millis(200),
        Duration::from_secs(3600),
    );
    let outcome = fetcher
        .fetch_quotes(&[ExchangeId::Bybit, ExchangeId::Okx])
        .await
        .unwrap();

    assert_eq!(okx_calls.load(Ordering::SeqCst), 0);
    assert_eq!(outcome.items.len(), 1);
    assert_eq!(outcome.items[0].exchange, ExchangeId::Bybit);
}

#[tokio::test]
async fn test_instrument_listings_are_cached() {
    let (bybit, listings) = StubVenue::with_instrument_counter(
        ExchangeId::Bybit,
        Script::Quotes(vec![quote(ExchangeId::Bybit, "BTCUSDT", 64000.0, 0.0001)]),
    );

    let fetcher = fetcher(vec![bybit]);
    let first = fetcher.fetch_instruments(&[ExchangeId::Bybit]).await.unwrap();
    let second = fetcher.fetch_instruments(&[ExchangeId::Bybit]).await.unwrap();

    assert_eq!(listings.load(Ordering::SeqCst), 1);
    assert_eq!(first.items.len(), 1);
    assert_eq!(second.items.len(), 1);
    assert_eq!(second.items[0].canonical.as_str(), "BTC/USDT");
}

#[tokio::test]
async fn test_end_to_end_scan_with_one_venue_down() {
    let (bybit, _) = StubVenue::new(
        ExchangeId::Bybit,
        Script::Quotes(vec![
            quote(ExchangeId::Bybit, "BTCUSDT", 64000.0, 0.001),
            quote(ExchangeId::Bybit, "ETHUSDT", 3100.0, 0.00001),
        ]),
    );
    let (okx, _) = StubVenue::new(
        ExchangeId::Okx,
        Script::Quotes(vec![
            quote(ExchangeId::Okx, "BTC-USDT-SWAP", 64010.0, -0.002),
            quote(ExchangeId::Okx, "ETH-USDT-SWAP", 3101.0, 0.00002),
        ]),
    );
    let (htx, _) = StubVenue::new(ExchangeId::Htx, Script::Hang);

    let service = ScannerService::new(fetcher(vec![bybit, okx, htx]), FilterLists::default());
    let request = ScanRequest {
        exchanges: Some(vec![ExchangeId::Bybit, ExchangeId::Okx, ExchangeId::Htx]),
        min_funding_rate: Some(0.001),
        ..Default::default()
    };

    let rows = service.arbitrage_opportunities(&request).await.unwrap();

    // ETH's 0.00001 spread is below the threshold; BTC survives
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row.token, "BTC/USDT");
    assert!((row.funding_spread - 0.003).abs() < 1e-12);
    assert!((row.price_spread - 10.0).abs() < 1e-9);

    let decision = row.decision.unwrap();
    assert_eq!(decision.long_ex, ExchangeId::Okx);
    assert_eq!(decision.short_ex, ExchangeId::Bybit);
    assert!(!row.prices.contains_key(&ExchangeId::Htx));
}

#[tokio::test]
async fn test_scan_applies_token_blacklist_before_aggregation() {
    let (bybit, _) = StubVenue::new(
        ExchangeId::Bybit,
        Script::Quotes(vec![
            quote(ExchangeId::Bybit, "BTCUSDT", 64000.0, 0.001),
            quote(ExchangeId::Bybit, "DOGEUSDT", 0.1, 0.005),
        ]),
    );
    let (okx, _) = StubVenue::new(
        ExchangeId::Okx,
        Script::Quotes(vec![
            quote(ExchangeId::Okx, "BTC-USDT-SWAP", 64010.0, -0.002),
            quote(ExchangeId::Okx, "DOGE-USDT-SWAP", 0.101, -0.005),
        ]),
    );

    let filters = FilterLists::with_tokens(None, Some(&["DOGEUSDT".to_string()]));
    let service = ScannerService::new(fetcher(vec![bybit, okx]), filters);

    let rows = service
        .arbitrage_opportunities(&ScanRequest::default())
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].token, "BTC/USDT");
}
