//! # HTTP Gateway
//!
//! [`transfer_gateway::Gateway`] specialized for HTTP:
//! - [`HttpRequest`] / [`HttpResponse`] with case-preserving headers
//! - CRLF text wire format for queued requests and cached responses
//! - Cache key is the SHA-256 of the request URI
//! - Successful (2xx) live responses are written through to the cache
//!
//! ## Example
//!
//! ```no_run
//! use http_gateway::{ClientConfig, HttpGateway, HttpRequest, ReqwestClient};
//! use std::sync::Arc;
//! use transfer_gateway::MemoryStorage;
//!
//! # fn main() -> transfer_gateway::Result<()> {
//! let client = ReqwestClient::new(&ClientConfig::default())?;
//! let gateway = HttpGateway::new("rates", Arc::new(MemoryStorage::new()), client)?;
//!
//! let request = HttpRequest::get("https://rates.example.com/latest")?
//!     .with_header("Accept", "application/json");
//! let response = gateway.send_request(&request)?;
//! println!("{} {}", response.status, response.body_text());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

pub mod client;
pub mod gateway;
pub mod message;
pub mod serializer;

pub use client::{ClientConfig, HttpClient, ReqwestClient};
pub use gateway::{HttpGateway, HttpTransport};
pub use message::{Headers, HttpRequest, HttpResponse};
pub use serializer::{HttpMessage, HttpSerializer};
