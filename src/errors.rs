use thiserror::Error;

use crate::exchange::ExchangeId;

pub type Result<T> = std::result::Result<T, ExchangeError>;

/// Errors surfaced by exchange connectors and the scan pipeline.
#[derive(Debug, Error)]
pub enum ExchangeError {
    /// The venue is switched off in the registry. Scans treat this as a
    /// signal to retry the remaining venues, never as a hard failure.
    #[error("exchange disabled: {0}")]
    Disabled(ExchangeId),

    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("http status {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("invalid response body from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    /// The venue answered 200 but its envelope carries an error code.
    #[error("{exchange} api error: {message}")]
    Api {
        exchange: ExchangeId,
        message: String,
    },

    #[error("request to {0} timed out")]
    Timeout(ExchangeId),

    /// Every requested venue failed hard. Disabled venues alone do not
    /// trigger this; they degrade to an empty result instead.
    #[error("no exchange data available: all requested sources failed")]
    AllSourcesFailed,

    #[error("config error: {0}")]
    Config(String),
}

impl ExchangeError {
    pub fn api(exchange: ExchangeId, message: impl Into<String>) -> Self {
        ExchangeError::Api {
            exchange,
            message: message.into(),
        }
    }

    pub fn is_disabled(&self) -> bool {
        matches!(self, ExchangeError::Disabled(_))
    }
}
