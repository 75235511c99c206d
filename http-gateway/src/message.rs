//! HTTP message types
//!
//! Headers keep the case and order they were added in, because the wire
//! format written by [`crate::HttpSerializer`] reproduces them verbatim.

use bytes::Bytes;
use http::{Method, StatusCode, Uri, Version};
use transfer_gateway::{Error, Result};

/// Ordered, case-preserving, multi-value header list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, Vec<String>)>,
}

impl Headers {
    /// Empty header list
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(existing, _)| existing.eq_ignore_ascii_case(name))
    }

    /// Add a value, keeping values already present under `name`
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        match self.position(&name) {
            Some(index) => self.entries[index].1.push(value.into()),
            None => self.entries.push((name, vec![value.into()])),
        }
    }

    /// Set `name` to a single value, replacing previous values in place
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        match self.position(&name) {
            Some(index) => self.entries[index].1 = vec![value.into()],
            None => self.entries.push((name, vec![value.into()])),
        }
    }

    /// Values stored under `name`, matched case-insensitively
    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.position(name).map(|index| self.entries[index].1.as_slice())
    }

    /// Values under `name` joined with `", "`
    pub fn get_line(&self, name: &str) -> Option<String> {
        self.get(name).map(|values| values.join(", "))
    }

    /// Whether `name` is present
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Header names and values in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    /// Number of distinct header names
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no header is set
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Outbound HTTP request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// Request method
    pub method: Method,
    /// Request target
    pub uri: Uri,
    /// Protocol version
    pub version: Version,
    /// Request headers
    pub headers: Headers,
    /// Raw body
    pub body: Bytes,
}

impl HttpRequest {
    /// Request with an empty body and no headers
    pub fn new(method: Method, uri: &str) -> Result<Self> {
        let uri: Uri = uri
            .parse()
            .map_err(|e| Error::InvalidArgument(format!("Invalid URI {:?}: {}", uri, e)))?;
        Ok(Self::from_parts(method, uri))
    }

    /// Request from already parsed parts
    pub fn from_parts(method: Method, uri: Uri) -> Self {
        Self {
            method,
            uri,
            version: Version::HTTP_11,
            headers: Headers::new(),
            body: Bytes::new(),
        }
    }

    /// GET request for `uri`
    pub fn get(uri: &str) -> Result<Self> {
        Self::new(Method::GET, uri)
    }

    /// Append a header value
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Replace the body
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Replace the protocol version
    pub fn with_version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }
}

/// Inbound HTTP response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status code
    pub status: StatusCode,
    /// Protocol version
    pub version: Version,
    /// Response headers
    pub headers: Headers,
    /// Raw body
    pub body: Bytes,
}

impl HttpResponse {
    /// Response with an empty body and no headers
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            version: Version::HTTP_11,
            headers: Headers::new(),
            body: Bytes::new(),
        }
    }

    /// Append a header value
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Replace the body
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Body decoded as UTF-8, lossily
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

impl Default for HttpResponse {
    fn default() -> Self {
        Self::new(StatusCode::OK)
    }
}
