use std::error::Error;

use tokio::time;
use tracing::{error, info};

use spreadscan::config::AppConfig;
use spreadscan::exchange::ExchangeRegistry;
use spreadscan::fetch::Fetcher;
use spreadscan::filter::FilterLists;
use spreadscan::http::HttpClient;
use spreadscan::service::ScannerService;
use spreadscan::types::{ArbitrageRow, ScanRequest};
use spreadscan::utils;

type DynError = Box<dyn Error + Send + Sync>;

const TOP_ROWS: usize = 20;

#[tokio::main]
async fn main() -> Result<(), DynError> {
    dotenv::dotenv().ok();
    utils::init_logging();

    let config = AppConfig::from_env()?;
    info!(
        "scanner starting: interval {:?}, timeout {:?}, min funding rate {}",
        config.interval, config.timeout, config.min_funding_rate
    );

    let http = HttpClient::new(config.timeout)?;
    let registry = ExchangeRegistry::with_disabled(&config.disabled_exchanges);
    let fetcher = Fetcher::new(http, registry, config.timeout, config.instrument_ttl);
    let filters = FilterLists::with_tokens(config.whitelist.as_deref(), config.blacklist.as_deref());
    let service = ScannerService::new(fetcher, filters);

    let request = ScanRequest {
        exchanges: config.exchanges.clone(),
        time_zone: config.time_zone.clone(),
        min_funding_rate: Some(config.min_funding_rate),
        min_perpetual_price: config.min_perp_price,
    };

    let mut tick = time::interval(config.interval);
    tick.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = tick.tick() => {
                match service.arbitrage_opportunities(&request).await {
                    Ok(rows) => print_rows(&rows),
                    Err(e) => error!("scan failed: {}", e),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down");
                break;
            }
        }
    }
    Ok(())
}

fn print_rows(rows: &[ArbitrageRow]) {
    if rows.is_empty() {
        info!("no opportunities matched the filters");
        return;
    }
    info!("{} opportunities", rows.len());
    println!(
        "{:<14} {:>12} {:>12} {:<24} venues",
        "token", "fund sprd %", "price sprd", "long / short"
    );
    for row in rows.iter().take(TOP_ROWS) {
        let decision = row
            .decision
            .map(|d| format!("{} / {}", d.long_ex, d.short_ex))
            .unwrap_or_else(|| "-".to_string());
        let venues: Vec<String> = row.prices.keys().map(|ex| ex.to_string()).collect();
        println!(
            "{:<14} {:>12.4} {:>12.6} {:<24} {}",
            row.token,
            row.funding_spread * 100.0,
            row.price_spread,
            decision,
            venues.join(",")
        );
    }
}
