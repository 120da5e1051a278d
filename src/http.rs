use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::error;

use crate::errors::{ExchangeError, Result};

const BODY_SNIPPET_LEN: usize = 300;

/// Shared HTTP transport for all venue connectors. Public market-data
/// endpoints only, so no auth and GET is the only verb.
#[derive(Clone)]
pub struct HttpClient {
    inner: reqwest::Client,
}

impl HttpClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let inner = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { inner })
    }

    /// GET a URL and decode the JSON body. Non-2xx and undecodable bodies
    /// log a bounded snippet of what the venue actually sent.
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self.inner.get(url).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            error!("GET {} -> {} {}", url, status.as_u16(), snippet(&body));
            return Err(ExchangeError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        serde_json::from_str(&body).map_err(|source| {
            error!("json parse failed for {}: {}", url, snippet(&body));
            ExchangeError::Decode {
                url: url.to_string(),
                source,
            }
        })
    }
}

fn snippet(body: &str) -> &str {
    let mut end = body.len().min(BODY_SNIPPET_LEN);
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}
