//! Remote Backend
//!
//! Talks to a storage node over HTTP (see `models::node` for the protocol).

use std::fmt::Display;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::{Backend, Expiry};
use crate::error::{CacheError, Result};
use crate::models::node::{
    millis, NodeDeleteResponse, NodeInfoResponse, NodePingResponse, NodeSetIfAbsentRequest,
    NodeSetIfAbsentResponse, NodeSetRequest, NodeValueResponse, ENDPOINT_FLUSH, ENDPOINT_INFO,
    ENDPOINT_KEYS, ENDPOINT_PING, ENDPOINT_SET_IF_ABSENT, NODE_PREFIX,
};

/// Default per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(2000);

// == Remote Backend ==
#[derive(Debug, Clone)]
pub struct RemoteBackend {
    name: String,
    base_url: Url,
    http_client: Client,
}

impl RemoteBackend {
    /// Creates a client for the storage node at `base_url`.
    pub fn new(name: impl Into<String>, base_url: &str, timeout: Duration) -> Result<Self> {
        let name = name.into();
        let base_url = Url::parse(base_url)
            .map_err(|e| CacheError::InvalidConfig(format!("node '{}': {}", name, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(CacheError::InvalidConfig(format!(
                "node '{}': '{}' cannot be used as a base url",
                name, base_url
            )));
        }

        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CacheError::InvalidConfig(format!("node '{}': {}", name, e)))?;

        Ok(Self {
            name,
            base_url,
            http_client,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn unavailable(&self, err: impl Display) -> CacheError {
        CacheError::BackendUnavailable(format!("node '{}': {}", self.name, err))
    }

    /// Builds `{base}/node/{segments...}` with each segment percent-encoded.
    ///
    /// `.` and `..` cannot be carried as a segment: URL parsing collapses
    /// them even when percent-encoded, so such keys are refused.
    fn url(&self, segments: &[&str]) -> Result<Url> {
        if let Some(dots) = segments.iter().find(|s| **s == "." || **s == "..") {
            return Err(CacheError::InvalidRequest(format!(
                "node '{}': key '{}' cannot be addressed over HTTP",
                self.name, dots
            )));
        }

        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| self.unavailable("base url cannot carry a path"))?
            .pop_if_empty()
            .push(NODE_PREFIX)
            .extend(segments);
        Ok(url)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        request.send().await.map_err(|e| self.unavailable(e))
    }

    /// Fails on any non-success status.
    fn ensure_success(&self, response: &Response) -> Result<()> {
        if response.status().is_success() {
            Ok(())
        } else {
            Err(self.unavailable(format!("unexpected status {}", response.status())))
        }
    }

    async fn json<T: DeserializeOwned>(&self, response: Response) -> Result<T> {
        self.ensure_success(&response)?;
        response.json::<T>().await.map_err(|e| self.unavailable(e))
    }
}

#[async_trait]
impl Backend for RemoteBackend {
    async fn set(&self, key: &str, value: Value, expiry: Expiry) -> Result<()> {
        let url = self.url(&[ENDPOINT_KEYS, key])?;
        let body = NodeSetRequest::new(value, expiry);
        let response = self.send(self.http_client.put(url).json(&body)).await?;
        self.ensure_success(&response)
    }

    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let url = self.url(&[ENDPOINT_KEYS, key])?;
        let response = self.send(self.http_client.get(url)).await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body: NodeValueResponse = self.json(response).await?;
        Ok(Some(body.value))
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let url = self.url(&[ENDPOINT_KEYS, key])?;
        let response = self.send(self.http_client.delete(url)).await?;
        let body: NodeDeleteResponse = self.json(response).await?;
        Ok(body.existed)
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let url = self.url(&[ENDPOINT_KEYS, key])?;
        let response = self.send(self.http_client.head(url)).await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => Ok(true),
            status => Err(self.unavailable(format!("unexpected status {}", status))),
        }
    }

    async fn set_if_absent(&self, key: &str, value: Value, ttl: Duration) -> Result<bool> {
        let url = self.url(&[ENDPOINT_KEYS, key, ENDPOINT_SET_IF_ABSENT])?;
        let body = NodeSetIfAbsentRequest {
            value,
            ttl_ms: millis(ttl),
        };
        let response = self.send(self.http_client.post(url).json(&body)).await?;
        let body: NodeSetIfAbsentResponse = self.json(response).await?;
        Ok(body.created)
    }

    async fn flush_all(&self) -> Result<()> {
        let url = self.url(&[ENDPOINT_FLUSH])?;
        let response = self.send(self.http_client.post(url)).await?;
        self.ensure_success(&response)
    }

    async fn ping(&self) -> Result<bool> {
        let url = self.url(&[ENDPOINT_PING])?;
        let response = self.send(self.http_client.get(url)).await?;
        let body: NodePingResponse = self.json(response).await?;
        Ok(body.pong)
    }

    async fn key_count(&self) -> Result<u64> {
        let url = self.url(&[ENDPOINT_INFO])?;
        let response = self.send(self.http_client.get(url)).await?;
        let body: NodeInfoResponse = self.json(response).await?;
        Ok(body.key_count)
    }

    async fn memory_used(&self) -> Result<Option<u64>> {
        let url = self.url(&[ENDPOINT_INFO])?;
        let response = self.send(self.http_client.get(url)).await?;
        let body: NodeInfoResponse = self.json(response).await?;
        Ok(body.used_memory)
    }
}
