//! Retrieval of the raw catalog documents.
//!
//! The fetcher knows nothing about markup: it turns a [`SourceDescriptor`] into the document
//! text or an [`EngineError::Fetch`]. Independent sources are fetched concurrently and the
//! failure of one never holds back the others.
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;

use super::sources::SourceDescriptor;
use crate::{engine_errors::EngineError, env_state::EngineEnv};

/// Anything able to retrieve a catalog document.
#[async_trait]
pub trait CatalogFetcher: Send + Sync {
    /// Retrieve the raw document described by `source`.
    async fn fetch(&self, source: &SourceDescriptor) -> Result<String, EngineError>;
}

/// HTTPS fetcher with a bounded timeout and a single retry.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    env: EngineEnv,
    retry_backoff: Duration,
}

impl HttpFetcher {
    /// Arguments
    /// ---------
    /// * `env`: network environment; its client carries the per-request timeout
    /// * `retry_backoff`: wait before the retry of a failed attempt
    pub fn new(env: EngineEnv, retry_backoff: Duration) -> Self {
        HttpFetcher { env, retry_backoff }
    }
}

#[async_trait]
impl CatalogFetcher for HttpFetcher {
    async fn fetch(&self, source: &SourceDescriptor) -> Result<String, EngineError> {
        let mut last_error = None;

        for attempt in 1..=2 {
            match self.env.get_from_url(&source.url).await {
                Ok(body) => return Ok(body),
                Err(err) => {
                    log::debug!("Fetch of {source} failed (attempt {attempt}): {err}");
                    last_error = Some(err);
                    if attempt == 1 {
                        tokio::time::sleep(self.retry_backoff).await;
                    }
                }
            }
        }

        Err(EngineError::Fetch {
            source_id: source.id.clone(),
            cause: last_error
                .map(|err| err.to_string())
                .unwrap_or_else(|| "no attempt made".into()),
        })
    }
}

/// Fetch every source concurrently.
///
/// Return
/// ------
/// * One result per source, in the order of `sources`
pub async fn fetch_all<'a>(
    fetcher: &dyn CatalogFetcher,
    sources: &'a [SourceDescriptor],
) -> Vec<(&'a SourceDescriptor, Result<String, EngineError>)> {
    let documents = join_all(sources.iter().map(|source| fetcher.fetch(source))).await;
    sources.iter().zip(documents).collect()
}
