//! HTTP specialization of the transfer gateway

use crate::client::{HttpClient, ReqwestClient};
use crate::message::{HttpRequest, HttpResponse};
use crate::serializer::{is_wire_method, HttpSerializer};
use http::{HeaderName, HeaderValue};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use transfer_gateway::{
    Clock, DrainReport, Error, Gateway, GatewayConfig, GatewayOptions, Inbound, QueueDrain,
    Result, Storage, TransferError, Transport,
};

/// [`Transport`] sending [`HttpRequest`]s through an [`HttpClient`]
#[derive(Debug, Clone)]
pub struct HttpTransport<C> {
    client: C,
}

impl<C: HttpClient> HttpTransport<C> {
    /// Wrap `client`
    pub fn new(client: C) -> Self {
        Self { client }
    }

    /// Underlying client
    pub fn client(&self) -> &C {
        &self.client
    }
}

impl<C: HttpClient> Transport for HttpTransport<C> {
    type Request = HttpRequest;
    type Response = HttpResponse;

    fn validate(&self, request: &HttpRequest) -> Result<()> {
        if !is_wire_method(&request.method) {
            return Err(Error::InvalidArgument(format!(
                "Method {} can not be queued for resend",
                request.method
            )));
        }
        if request.uri.scheme().is_none() || request.uri.authority().is_none() {
            return Err(Error::InvalidArgument(format!(
                "Request URI must be absolute, got {}",
                request.uri
            )));
        }
        for (name, values) in request.headers.iter() {
            HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| Error::InvalidArgument(format!("Invalid header name {:?}", name)))?;
            for value in values {
                HeaderValue::from_str(value).map_err(|_| {
                    Error::InvalidArgument(format!("Invalid value for header {}", name))
                })?;
            }
        }
        Ok(())
    }

    fn transfer(&self, request: &HttpRequest) -> std::result::Result<HttpResponse, TransferError> {
        self.client.send_request(request)
    }

    /// Hex SHA-256 of the request URI
    fn hash(&self, request: &HttpRequest) -> Result<String> {
        let digest = Sha256::digest(request.uri.to_string().as_bytes());
        Ok(digest.iter().map(|byte| format!("{:02x}", byte)).collect())
    }

    /// Only successful responses are worth serving from cache
    fn is_cacheable(&self, response: &HttpResponse) -> bool {
        response.status.is_success()
    }
}

/// Gateway for HTTP request/response exchanges
///
/// Successful live responses are written through to the inbound cache, so a
/// later failed request for the same URI is answered from it.
pub struct HttpGateway<C = ReqwestClient>
where
    C: HttpClient,
{
    inner: Gateway<HttpTransport<C>, HttpSerializer>,
}

impl<C: HttpClient> HttpGateway<C> {
    /// Create a write-through gateway over `client`
    pub fn new(id: impl Into<String>, storage: Arc<dyn Storage>, client: C) -> Result<Self> {
        let inner = Gateway::with_serializer(id, storage, HttpTransport::new(client), HttpSerializer)?
            .with_options(GatewayOptions {
                write_through: true,
                ..GatewayOptions::default()
            });
        Ok(Self { inner })
    }

    /// Create a gateway with ID, policies and options taken from `config`
    ///
    /// `default_response` is served when neither the live call nor the cache
    /// can answer.
    pub fn from_config(
        config: &GatewayConfig,
        storage: Arc<dyn Storage>,
        client: C,
        default_response: Option<HttpResponse>,
    ) -> Result<Self> {
        config.validate()?;
        let inner = Gateway::with_serializer(
            config.id.clone(),
            storage,
            HttpTransport::new(client),
            HttpSerializer,
        )?
        .with_options(config.options());
        inner.set_inbound_policy(config.inbound_policy(default_response)?);
        inner.set_outbound_policy(config.outbound_policy()?);
        Ok(Self { inner })
    }

    /// Use `clock` for cache staleness and resend readiness
    pub fn with_clock(self, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: self.inner.with_clock(clock),
        }
    }

    /// Send `request` with fallback to cache, default and the resend queue
    pub fn send_request(&self, request: &HttpRequest) -> Result<HttpResponse> {
        self.inner.perform_transfer(request)
    }

    /// Like [`HttpGateway::send_request`], reporting where the response came from
    pub fn send(&self, request: &HttpRequest) -> Result<Inbound<HttpResponse>> {
        self.inner.transfer(request)
    }

    /// The wrapped generic gateway, for policies and queue control
    pub fn gateway(&self) -> &Gateway<HttpTransport<C>, HttpSerializer> {
        &self.inner
    }

    /// Gateway ID
    pub fn id(&self) -> &str {
        self.inner.id()
    }
}

impl<C: HttpClient> QueueDrain for HttpGateway<C> {
    fn id(&self) -> &str {
        self.inner.id()
    }

    fn drain_queue(&self) -> Result<DrainReport> {
        self.inner.drain_queue()
    }
}

impl<C: HttpClient> std::fmt::Debug for HttpGateway<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpGateway")
            .field("id", &self.inner.id())
            .finish()
    }
}
