//! HTTP client port and its reqwest-backed implementation

use crate::message::{Headers, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use transfer_gateway::{Error, Result, TransferError};

/// Sends one request synchronously
///
/// Any response that arrives counts as a successful transfer, whatever its
/// status. Only connection, timeout and protocol failures are errors.
pub trait HttpClient: Send + Sync {
    /// Send `request` and wait for the full response
    fn send_request(&self, request: &HttpRequest) -> std::result::Result<HttpResponse, TransferError>;
}

impl<C: HttpClient + ?Sized> HttpClient for Box<C> {
    fn send_request(&self, request: &HttpRequest) -> std::result::Result<HttpResponse, TransferError> {
        (**self).send_request(request)
    }
}

/// Client settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Whole-request timeout in milliseconds
    pub timeout_ms: u64,

    /// Connect timeout in milliseconds
    pub connect_timeout_ms: u64,

    /// User-Agent sent with every request
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            connect_timeout_ms: 5_000,
            user_agent: concat!("http-gateway/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Blocking reqwest client
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: reqwest::blocking::Client,
}

impl ReqwestClient {
    /// Build a client from settings
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// Wrap an already configured client
    pub fn from_client(client: reqwest::blocking::Client) -> Self {
        Self { client }
    }
}

impl HttpClient for ReqwestClient {
    fn send_request(&self, request: &HttpRequest) -> std::result::Result<HttpResponse, TransferError> {
        let mut builder = self
            .client
            .request(request.method.clone(), request.uri.to_string())
            .body(request.body.to_vec());
        for (name, values) in request.headers.iter() {
            for value in values {
                builder = builder.header(name, value.as_str());
            }
        }

        let response = builder
            .send()
            .map_err(|e| TransferError::new(describe(&e)))?;

        let status = response.status();
        let version = response.version();
        let mut headers = Headers::new();
        for (name, value) in response.headers() {
            headers.append(
                name.as_str(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            );
        }
        let body = response
            .bytes()
            .map_err(|e| TransferError::new(format!("Failed to read response body: {}", e)))?;

        debug!(
            method = %request.method,
            uri = %request.uri,
            status = status.as_u16(),
            body_len = body.len(),
            "HTTP response received"
        );

        Ok(HttpResponse {
            status,
            version,
            headers,
            body,
        })
    }
}

fn describe(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        format!("Request timed out: {}", error)
    } else if error.is_connect() {
        format!("Connection failed: {}", error)
    } else {
        format!("Request failed: {}", error)
    }
}
