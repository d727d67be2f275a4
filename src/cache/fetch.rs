//! Remote resource fetching.

use b12_task::{BlockingBridge, Completion};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// HTTP fetch timeout.
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("HTTP status {0}")]
    Status(u16),

    #[error("request failed: {0}")]
    Transport(String),
}

pub type FetchResult = Result<Vec<u8>, FetchError>;

/// Callback-style source of raw resource bodies.
pub trait Fetcher: Send + Sync + 'static {
    /// Fetch `url` and report the body through `done`, exactly once, from
    /// any thread.
    fn fetch(&self, url: String, done: Completion<FetchResult>);
}

/// Fetcher backed by `reqwest`, running requests on a tokio runtime.
pub struct HttpFetcher {
    client: reqwest::Client,
    runtime: tokio::runtime::Handle,
}

impl HttpFetcher {
    pub fn new(runtime: tokio::runtime::Handle) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .user_agent(concat!("b12/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, runtime })
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: String, done: Completion<FetchResult>) {
        let client = self.client.clone();
        self.runtime.spawn(async move {
            let result = async {
                let response = client
                    .get(&url)
                    .send()
                    .await
                    .map_err(|e| FetchError::Transport(e.to_string()))?;
                let status = response.status();
                if !status.is_success() {
                    return Err(FetchError::Status(status.as_u16()));
                }
                response
                    .bytes()
                    .await
                    .map(|b| b.to_vec())
                    .map_err(|e| FetchError::Transport(e.to_string()))
            }
            .await;
            done.complete(result);
        });
    }
}

#[derive(Deserialize)]
struct Listing {
    count: usize,
}

/// Read the `count` field of a list endpoint, blocking the calling thread.
///
/// Meant for startup only: it must not run on a thread the fetcher itself
/// needs in order to make progress.
pub fn fetch_count(fetcher: &dyn Fetcher, list_url: String) -> Option<usize> {
    let body = match BlockingBridge::run(|done| fetcher.fetch(list_url.clone(), done)) {
        Ok(Ok(body)) => body,
        Ok(Err(e)) => {
            warn!(url = %list_url, error = %e, "Failed to fetch resource count");
            return None;
        }
        Err(e) => {
            warn!(url = %list_url, error = %e, "Resource count request was dropped");
            return None;
        }
    };
    match serde_json::from_slice::<Listing>(&body) {
        Ok(listing) => Some(listing.count),
        Err(e) => {
            warn!(url = %list_url, error = %e, "Resource count response has no count");
            None
        }
    }
}
