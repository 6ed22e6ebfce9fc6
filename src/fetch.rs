//! HTTP access for scraping and downloads.
//!
//! Every component takes a [`Fetch`] implementation instead of calling
//! `reqwest` directly, so catalogue parsing and linking can run against
//! canned pages.

use crate::error::{LinkerError, Result};
use std::collections::HashMap;
use std::future::Future;
use tracing::debug;

/// Status code and body of a GET request
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body of a successful response; any other status is an error
    pub fn into_success(self, url: &str) -> Result<Vec<u8>> {
        if self.is_success() {
            Ok(self.body)
        } else {
            Err(LinkerError::Http {
                url: url.to_string(),
                status: self.status,
            })
        }
    }

    /// Body of a successful response decoded as (lossy) UTF-8
    pub fn into_text(self, url: &str) -> Result<String> {
        let body = self.into_success(url)?;
        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}

/// Issues GET requests
pub trait Fetch: Sync {
    fn get(&self, url: &str) -> impl Future<Output = Result<HttpResponse>> + Send;
}

/// `reqwest`-backed fetcher sharing one connection pool
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(user_agent: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|e| LinkerError::network("client initialisation", e))?;
        Ok(Self { client })
    }
}

impl Fetch for HttpFetcher {
    async fn get(&self, url: &str) -> Result<HttpResponse> {
        debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| LinkerError::network(url, e))?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| LinkerError::network(url, e))?
            .to_vec();

        debug!("GET {} -> {} ({} bytes)", url, status, body.len());
        Ok(HttpResponse { status, body })
    }
}

/// Serves canned responses by URL; anything else is a 404.
///
/// Used for offline replays of saved pages and in tests.
#[derive(Debug, Clone, Default)]
pub struct StaticFetcher {
    responses: HashMap<String, HttpResponse>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` with status 200 for `url`
    pub fn with_page(mut self, url: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        self.responses.insert(
            url.into(),
            HttpResponse {
                status: 200,
                body: body.into(),
            },
        );
        self
    }

    /// Serve `body` with an arbitrary status for `url`
    pub fn with_response(
        mut self,
        url: impl Into<String>,
        status: u16,
        body: impl Into<Vec<u8>>,
    ) -> Self {
        self.responses.insert(
            url.into(),
            HttpResponse {
                status,
                body: body.into(),
            },
        );
        self
    }
}

impl Fetch for StaticFetcher {
    async fn get(&self, url: &str) -> Result<HttpResponse> {
        Ok(self.responses.get(url).cloned().unwrap_or(HttpResponse {
            status: 404,
            body: b"Not Found".to_vec(),
        }))
    }
}
