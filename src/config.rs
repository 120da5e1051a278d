use std::time::Duration;

use tracing::warn;

use crate::errors::{ExchangeError, Result};
use crate::exchange::ExchangeId;

/// Scanner configuration loaded from the environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Per-venue HTTP timeout for one scan pass (default: 10s)
    pub timeout: Duration,
    /// Pause between scan passes in the long-running scanner (default: 60s)
    pub interval: Duration,
    /// Venues to scan; `None` means every registered venue
    pub exchanges: Option<Vec<ExchangeId>>,
    /// Venues switched off at startup
    pub disabled_exchanges: Vec<ExchangeId>,
    /// Minimum funding spread as a fraction, 0.001 is 0.1% (default: 0)
    pub min_funding_rate: f64,
    /// Drop rows where no venue's price reaches this floor
    pub min_perp_price: Option<f64>,
    /// How long a venue's instrument universe stays cached (default: 24h)
    pub instrument_ttl: Duration,
    /// Display offset for funding timestamps, e.g. `+03:00`
    pub time_zone: Option<String>,
    /// Only scan these symbols (native or canonical spelling)
    pub whitelist: Option<Vec<String>>,
    /// Never scan these symbols
    pub blacklist: Option<Vec<String>>,
}

impl AppConfig {
    /// Load configuration from `SCAN_*` environment variables with defaults.
    pub fn from_env() -> Result<Self> {
        let config = Self {
            timeout: Duration::from_secs(parse_u64("SCAN_TIMEOUT_SECS", 10)),
            interval: Duration::from_secs(parse_u64("SCAN_INTERVAL_SECS", 60)),
            exchanges: parse_codes("SCAN_EXCHANGES"),
            disabled_exchanges: parse_codes("SCAN_DISABLED_EXCHANGES").unwrap_or_default(),
            min_funding_rate: parse_f64("SCAN_MIN_FUNDING_RATE", 0.0),
            min_perp_price: std::env::var("SCAN_MIN_PERP_PRICE")
                .ok()
                .and_then(|s| s.parse::<f64>().ok()),
            instrument_ttl: Duration::from_secs(parse_u64("SCAN_INSTRUMENT_TTL_SECS", 86_400)),
            time_zone: std::env::var("SCAN_TIME_ZONE").ok().filter(|s| !s.is_empty()),
            whitelist: parse_symbols("SCAN_WHITELIST"),
            blacklist: parse_symbols("SCAN_BLACKLIST"),
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.timeout.is_zero() {
            return Err(ExchangeError::Config(
                "SCAN_TIMEOUT_SECS must be greater than 0".into(),
            ));
        }
        if self.interval.is_zero() {
            return Err(ExchangeError::Config(
                "SCAN_INTERVAL_SECS must be greater than 0".into(),
            ));
        }
        if self.instrument_ttl.is_zero() {
            return Err(ExchangeError::Config(
                "SCAN_INSTRUMENT_TTL_SECS must be greater than 0".into(),
            ));
        }
        if self.min_funding_rate < 0.0 {
            return Err(ExchangeError::Config(
                "SCAN_MIN_FUNDING_RATE must not be negative".into(),
            ));
        }
        if let Some(price) = self.min_perp_price {
            if price <= 0.0 {
                return Err(ExchangeError::Config(
                    "SCAN_MIN_PERP_PRICE must be greater than 0".into(),
                ));
            }
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            interval: Duration::from_secs(60),
            exchanges: None,
            disabled_exchanges: Vec::new(),
            min_funding_rate: 0.0,
            min_perp_price: None,
            instrument_ttl: Duration::from_secs(86_400),
            time_zone: None,
            whitelist: None,
            blacklist: None,
        }
    }
}

fn parse_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(default)
}

fn parse_f64(name: &str, default: f64) -> f64 {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(default)
}

/// Comma-separated exchange codes. Unknown codes are skipped with a warning
/// so one typo does not take the whole scanner down.
fn parse_codes(name: &str) -> Option<Vec<ExchangeId>> {
    let raw = std::env::var(name).ok()?;
    let mut codes = Vec::new();
    for token in raw.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        match token.parse::<ExchangeId>() {
            Ok(ex) => {
                if !codes.contains(&ex) {
                    codes.push(ex);
                }
            }
            Err(_) => warn!("{}: ignoring unknown exchange code {:?}", name, token),
        }
    }
    if codes.is_empty() {
        None
    } else {
        Some(codes)
    }
}

fn parse_symbols(name: &str) -> Option<Vec<String>> {
    let raw = std::env::var(name).ok()?;
    let symbols: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect();
    if symbols.is_empty() {
        None
    } else {
        Some(symbols)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let config = AppConfig {
            timeout: Duration::ZERO,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_negative_min_rate() {
        let config = AppConfig {
            min_funding_rate: -0.001,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_price_floor() {
        let config = AppConfig {
            min_perp_price: Some(0.0),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
