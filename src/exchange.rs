use std::fmt::{self, Display};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};

use crate::errors::ExchangeError;

/// Venues the scanner knows how to query. Wire form is the uppercase code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExchangeId {
    Bybit,
    Mexc,
    Gateio,
    Kucoin,
    Bitget,
    Coinex,
    Htx,
    Okx,
    Bingx,
}

pub const ALL_EXCHANGES: [ExchangeId; 9] = [
    ExchangeId::Bybit,
    ExchangeId::Mexc,
    ExchangeId::Gateio,
    ExchangeId::Kucoin,
    ExchangeId::Bitget,
    ExchangeId::Coinex,
    ExchangeId::Htx,
    ExchangeId::Okx,
    ExchangeId::Bingx,
];

impl ExchangeId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExchangeId::Bybit => "BYBIT",
            ExchangeId::Mexc => "MEXC",
            ExchangeId::Gateio => "GATEIO",
            ExchangeId::Kucoin => "KUCOIN",
            ExchangeId::Bitget => "BITGET",
            ExchangeId::Coinex => "COINEX",
            ExchangeId::Htx => "HTX",
            ExchangeId::Okx => "OKX",
            ExchangeId::Bingx => "BINGX",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ExchangeId::Bybit => "Bybit",
            ExchangeId::Mexc => "MEXC",
            ExchangeId::Gateio => "Gate.io",
            ExchangeId::Kucoin => "KuCoin",
            ExchangeId::Bitget => "Bitget",
            ExchangeId::Coinex => "CoinEx",
            ExchangeId::Htx => "HTX",
            ExchangeId::Okx => "OKX",
            ExchangeId::Bingx => "BingX",
        }
    }

    /// Web trade page for a perpetual contract on this venue.
    pub fn trade_link(&self, base: &str, quote: &str) -> String {
        let base = base.to_uppercase();
        let quote = quote.to_uppercase();
        match self {
            ExchangeId::Bybit => format!("https://www.bybit.com/trade/usdt/{base}{quote}"),
            ExchangeId::Mexc => format!("https://futures.mexc.com/exchange/{base}_{quote}"),
            ExchangeId::Kucoin => format!("https://futures.kucoin.com/trade/{base}{quote}M"),
            ExchangeId::Bitget => format!("https://www.bitget.com/futures/usdt/{base}{quote}"),
            ExchangeId::Htx => format!(
                "https://www.htx.com/futures/linear_swap/exchange/#contract_code={base}-{quote}"
            ),
            ExchangeId::Okx => format!(
                "https://www.okx.com/trade-swap/{}-{}-swap",
                base.to_lowercase(),
                quote.to_lowercase()
            ),
            ExchangeId::Gateio => format!("https://www.gate.io/futures/usdt/{base}_{quote}"),
            ExchangeId::Coinex => format!("https://www.coinex.com/futures/{base}-{quote}"),
            ExchangeId::Bingx => format!("https://bingx.com/perpetual/{base}-{quote}"),
        }
    }
}

impl Display for ExchangeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ExchangeId {
    type Err = ExchangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_uppercase();
        ALL_EXCHANGES
            .iter()
            .find(|ex| ex.as_str() == code)
            .copied()
            .ok_or_else(|| ExchangeError::Config(format!("unknown exchange: {s}")))
    }
}

/// Registry row exposed to callers.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeInfo {
    pub code: ExchangeId,
    pub display_name: &'static str,
    pub enabled: bool,
}

/// Runtime on/off switches for every known venue.
///
/// Flags can flip while a scan is in flight, so reads go through atomics
/// and each fetch re-checks its venue right before issuing requests.
pub struct ExchangeRegistry {
    flags: [AtomicBool; 9],
}

impl ExchangeRegistry {
    pub fn new() -> Self {
        Self {
            flags: std::array::from_fn(|_| AtomicBool::new(true)),
        }
    }

    pub fn with_disabled(disabled: &[ExchangeId]) -> Self {
        let registry = Self::new();
        for ex in disabled {
            registry.set_enabled(*ex, false);
        }
        registry
    }

    pub fn is_enabled(&self, ex: ExchangeId) -> bool {
        self.flags[ex as usize].load(Ordering::Relaxed)
    }

    pub fn set_enabled(&self, ex: ExchangeId, enabled: bool) {
        self.flags[ex as usize].store(enabled, Ordering::Relaxed);
    }

    pub fn enabled(&self) -> Vec<ExchangeId> {
        ALL_EXCHANGES
            .iter()
            .copied()
            .filter(|ex| self.is_enabled(*ex))
            .collect()
    }

    pub fn list(&self) -> Vec<ExchangeInfo> {
        ALL_EXCHANGES
            .iter()
            .map(|ex| ExchangeInfo {
                code: *ex,
                display_name: ex.display_name(),
                enabled: self.is_enabled(*ex),
            })
            .collect()
    }
}

impl Default for ExchangeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
