use std::collections::HashMap;
use std::future::Future;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use futures_util::future::join_all;
use tokio::time::timeout;
use tracing::{info, warn};

use crate::connector::{connector_for, Connector};
use crate::errors::{ExchangeError, Result};
use crate::exchange::{ExchangeId, ExchangeRegistry, ALL_EXCHANGES};
use crate::http::HttpClient;
use crate::types::{FetchOutcome, Instrument, Quote};

struct CachedInstruments {
    fetched_at: Instant,
    items: Vec<Instrument>,
}

/// One fan-out round: per-venue results plus the venues that dropped out.
struct Pass<T> {
    succeeded: Vec<(ExchangeId, Vec<T>)>,
    disabled: Vec<ExchangeId>,
    failed: Vec<ExchangeId>,
}

impl<T> Pass<T> {
    fn into_outcome(self) -> FetchOutcome<T> {
        let mut items = Vec::new();
        for (_, venue_items) in self.succeeded {
            items.extend(venue_items);
        }
        FetchOutcome {
            items,
            disabled: self.disabled,
            failed: self.failed,
        }
    }
}

/// Fans one request out over every requested venue and joins the results.
///
/// Per-venue failures degrade the result instead of failing it: errors and
/// timeouts drop that venue's data with a warning, a venue reporting itself
/// disabled triggers at most one corrective pass over the remaining venues,
/// and only a round in which every attempted venue fails hard surfaces as
/// an error.
pub struct Fetcher {
    connectors: HashMap<ExchangeId, Box<dyn Connector>>,
    registry: ExchangeRegistry,
    per_source_timeout: Duration,
    instrument_ttl: Duration,
    instrument_cache: DashMap<ExchangeId, CachedInstruments>,
}

impl Fetcher {
    pub fn new(
        http: HttpClient,
        registry: ExchangeRegistry,
        per_source_timeout: Duration,
        instrument_ttl: Duration,
    ) -> Self {
        let connectors = ALL_EXCHANGES
            .iter()
            .map(|ex| (*ex, connector_for(*ex, http.clone())))
            .collect();
        Self {
            connectors,
            registry,
            per_source_timeout,
            instrument_ttl,
            instrument_cache: DashMap::new(),
        }
    }

    /// Builds a fetcher over caller-supplied connectors. Lets tests inject
    /// scripted venues without any network.
    pub fn with_connectors(
        connectors: Vec<Box<dyn Connector>>,
        registry: ExchangeRegistry,
        per_source_timeout: Duration,
        instrument_ttl: Duration,
    ) -> Self {
        Self {
            connectors: connectors.into_iter().map(|c| (c.id(), c)).collect(),
            registry,
            per_source_timeout,
            instrument_ttl,
            instrument_cache: DashMap::new(),
        }
    }

    pub fn registry(&self) -> &ExchangeRegistry {
        &self.registry
    }

    /// Current price/funding snapshot across the requested venues.
    pub async fn fetch_quotes(&self, requested: &[ExchangeId]) -> Result<FetchOutcome<Quote>> {
        let pass = self
            .fetch_with_retry(requested, |connector| connector.quotes())
            .await?;
        Ok(pass.into_outcome())
    }

    /// Tradable perpetual universe across the requested venues. Successful
    /// per-venue listings are cached for the configured TTL.
    pub async fn fetch_instruments(
        &self,
        requested: &[ExchangeId],
    ) -> Result<FetchOutcome<Instrument>> {
        let mut cached_items = Vec::new();
        let mut misses = Vec::new();
        for ex in self.enabled_subset(requested) {
            match self.instrument_cache.get(&ex) {
                Some(entry) if entry.fetched_at.elapsed() < self.instrument_ttl => {
                    cached_items.extend(entry.items.iter().cloned());
                }
                _ => misses.push(ex),
            }
        }

        if misses.is_empty() {
            return Ok(FetchOutcome {
                items: cached_items,
                disabled: Vec::new(),
                failed: Vec::new(),
            });
        }

        let pass = self
            .fetch_with_retry(&misses, |connector| connector.instruments())
            .await?;
        for (ex, items) in &pass.succeeded {
            self.instrument_cache.insert(
                *ex,
                CachedInstruments {
                    fetched_at: Instant::now(),
                    items: items.clone(),
                },
            );
        }

        let mut outcome = pass.into_outcome();
        outcome.items.extend(cached_items);
        Ok(outcome)
    }

    fn enabled_subset(&self, requested: &[ExchangeId]) -> Vec<ExchangeId> {
        requested
            .iter()
            .copied()
            .filter(|ex| self.registry.is_enabled(*ex) && self.connectors.contains_key(ex))
            .collect()
    }

    async fn fetch_with_retry<'a, T, F, Fut>(
        &'a self,
        requested: &[ExchangeId],
        op: F,
    ) -> Result<Pass<T>>
    where
        F: Fn(&'a dyn Connector) -> Fut,
        Fut: Future<Output = Result<Vec<T>>> + 'a,
    {
        let codes = self.enabled_subset(requested);
        if codes.is_empty() {
            return Ok(Pass {
                succeeded: Vec::new(),
                disabled: Vec::new(),
                failed: Vec::new(),
            });
        }

        let first = self.run_pass(&codes, &op).await;
        let pass = if first.disabled.is_empty() {
            first
        } else {
            // one corrective pass without the venues that reported disabled;
            // a second round of failures is final
            let remaining: Vec<ExchangeId> = codes
                .iter()
                .copied()
                .filter(|ex| !first.disabled.contains(ex))
                .collect();
            info!(
                "retrying without disabled venues {:?}, {} remaining",
                first.disabled,
                remaining.len()
            );
            if remaining.is_empty() {
                return Ok(Pass {
                    succeeded: Vec::new(),
                    disabled: first.disabled,
                    failed: Vec::new(),
                });
            }
            let mut second = self.run_pass(&remaining, &op).await;
            second.disabled.extend(first.disabled);
            second
        };

        if pass.succeeded.is_empty() && !pass.failed.is_empty() {
            return Err(ExchangeError::AllSourcesFailed);
        }
        Ok(pass)
    }

    async fn run_pass<'a, T, F, Fut>(&'a self, codes: &[ExchangeId], op: &F) -> Pass<T>
    where
        F: Fn(&'a dyn Connector) -> Fut,
        Fut: Future<Output = Result<Vec<T>>> + 'a,
    {
        let calls = codes.iter().map(|ex| {
            let connector = &self.connectors[ex];
            async move {
                let result = match timeout(self.per_source_timeout, op(connector.as_ref())).await
                {
                    Ok(result) => result,
                    Err(_) => Err(ExchangeError::Timeout(*ex)),
                };
                (*ex, result)
            }
        });

        let mut pass = Pass {
            succeeded: Vec::new(),
            disabled: Vec::new(),
            failed: Vec::new(),
        };
        for (ex, result) in join_all(calls).await {
            match result {
                Ok(items) => {
                    info!("{}: {} entries", ex, items.len());
                    pass.succeeded.push((ex, items));
                }
                Err(ExchangeError::Disabled(code)) => {
                    warn!("{} reports disabled, excluding for this fetch", code);
                    pass.disabled.push(code);
                }
                Err(err) => {
                    warn!("skipping {}: {}", ex, err);
                    pass.failed.push(ex);
                }
            }
        }
        pass
    }
}
