//! # Engine environment state
//!
//! This module defines [`crate::env_state::EngineEnv`], the **shared network environment** of the
//! engine. It provides access to:
//!
//! - A persistent **HTTP client** used for the catalog pages and the one-time ephemeris data
//!   download.
//! - Simple utilities for performing HTTP GET requests that surface every failure as an
//!   [`EngineError`] instead of panicking.
//!
//! ## Structure
//!
//! ```text
//! EngineEnv
//! └── http_client  (reqwest::Client: timeout, User-Agent, Accept headers)
//! ```
//!
//! ## Notes
//!
//! - [`EngineEnv`] is cheap to clone (the client is reference counted) and is meant to be shared
//!   by the fetcher and the ephemeris store so that one connection pool serves both.
//! - Only `200 OK` is accepted as a successful catalog response.
use std::time::Duration;

use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE},
    Client, StatusCode,
};

use crate::{constants::USER_AGENT, engine_errors::EngineError};

/// Network environment passed to the components that talk to remote services.
#[derive(Debug, Clone)]
pub struct EngineEnv {
    pub http_client: Client,
}

impl EngineEnv {
    /// Build the environment with a per-request timeout.
    ///
    /// Arguments
    /// ---------
    /// * `timeout`: upper bound on each request, connection included
    ///
    /// Return
    /// ------
    /// * The environment, or the client construction error
    pub fn new(timeout: Duration) -> Result<Self, EngineError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            ),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.7"));

        let http_client = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(EngineEnv { http_client })
    }

    /// GET a document and return its body as text.
    ///
    /// Any status other than `200 OK` is an [`EngineError::Fetch`] naming the URL.
    pub async fn get_from_url(&self, url: &str) -> Result<String, EngineError> {
        let response = self.http_client.get(url).send().await?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(EngineError::Fetch {
                source_id: url.to_string(),
                cause: format!("HTTP {status}"),
            });
        }
        Ok(response.text().await?)
    }
}

#[cfg(test)]
mod env_state_test {
    use super::*;

    #[test]
    fn test_env_builds_with_timeout() {
        let env = EngineEnv::new(Duration::from_secs(10));
        assert!(env.is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_host_is_an_error() {
        let env = EngineEnv::new(Duration::from_millis(500)).unwrap();
        // port 9 (discard) on loopback refuses the connection immediately
        let result = env.get_from_url("http://127.0.0.1:9/SEdecade2021.html").await;
        assert!(matches!(result, Err(EngineError::ReqwestError(_))));
    }
}
