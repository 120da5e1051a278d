pub mod aggregate;
pub mod config;
pub mod connector;
pub mod engine;
pub mod errors;
pub mod exchange;
pub mod fetch;
pub mod filter;
pub mod http;
pub mod service;
pub mod symbols;
pub mod types;
pub mod utils;

// one flat module per venue
pub mod bingx;
pub mod bitget;
pub mod bybit;
pub mod coinex;
pub mod gateio;
pub mod htx;
pub mod kucoin;
pub mod mexc;
pub mod okx;

pub use errors::{ExchangeError, Result};
pub use exchange::{ExchangeId, ExchangeRegistry, ALL_EXCHANGES};
pub use symbols::{canonicalize, CanonicalSymbol};
