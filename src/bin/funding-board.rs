//! One-shot funding board: prints every funding print across the requested
//! venues whose absolute rate clears the threshold, highest first.

use std::error::Error;

use tracing::info;

use spreadscan::config::AppConfig;
use spreadscan::exchange::ExchangeRegistry;
use spreadscan::fetch::Fetcher;
use spreadscan::filter::FilterLists;
use spreadscan::http::HttpClient;
use spreadscan::service::ScannerService;
use spreadscan::types::FundingRequest;
use spreadscan::utils;

type DynError = Box<dyn Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), DynError> {
    dotenv::dotenv().ok();
    utils::init_logging();

    let config = AppConfig::from_env()?;
    let http = HttpClient::new(config.timeout)?;
    let registry = ExchangeRegistry::with_disabled(&config.disabled_exchanges);
    let fetcher = Fetcher::new(http, registry, config.timeout, config.instrument_ttl);
    let filters = FilterLists::with_tokens(config.whitelist.as_deref(), config.blacklist.as_deref());
    let service = ScannerService::new(fetcher, filters);

    let request = FundingRequest {
        exchanges: config.exchanges.clone(),
        min_funding_rate: Some(config.min_funding_rate),
        time_zone: config.time_zone.clone(),
    };

    let rows = service.funding_opportunities(&request).await?;
    info!("{} funding prints at |rate| >= {}", rows.len(), request.min_fr());

    println!(
        "{:<8} {:<18} {:>10} {:<22} {:<10}",
        "venue", "symbol", "rate %", "next funding", "countdown"
    );
    for row in &rows {
        println!(
            "{:<8} {:<18} {:>10.4} {:<22} {:<10}",
            row.exchange, row.symbol, row.rate_percent, row.next_funding_time, row.countdown
        );
    }
    Ok(())
}
