//! Text wire format for HTTP messages
//!
//! ```text
//! REQUEST\r\n
//! HTTP/1.1 GET http://example.com/\r\n
//! Host: example.com\r\n
//! Accept: application/json\r\n
//! \r\n
//! <body bytes>
//! ```
//!
//! Responses carry the `RESPONSE` tag and no status line, so a decoded
//! response always has status 200. Multiple values of one header are
//! joined with `", "` on a single line.

use crate::message::{Headers, HttpRequest, HttpResponse};
use bytes::Bytes;
use http::{Method, StatusCode, Uri, Version};
use lazy_static::lazy_static;
use regex::Regex;
use transfer_gateway::{DataSerializer, Error, Result};

const CRLF: &[u8] = b"\r\n";
const REQUEST_TAG: &str = "REQUEST";
const RESPONSE_TAG: &str = "RESPONSE";

lazy_static! {
    static ref REQUEST_LINE: Regex =
        Regex::new(r"^HTTP/(\d\.\d) ([A-Z]+) (.+)$").expect("valid request line pattern");
}

/// Either side of an HTTP exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HttpMessage {
    /// Outbound request
    Request(HttpRequest),
    /// Inbound response
    Response(HttpResponse),
}

/// Serializer for [`HttpRequest`] and [`HttpResponse`]
#[derive(Debug, Default, Clone, Copy)]
pub struct HttpSerializer;

impl HttpSerializer {
    /// Encode either message kind
    pub fn encode(&self, message: &HttpMessage) -> Result<Vec<u8>> {
        match message {
            HttpMessage::Request(request) => encode_request(request),
            HttpMessage::Response(response) => encode_response(response),
        }
    }

    /// Decode bytes of either message kind, dispatching on the type tag
    pub fn decode(&self, bytes: &[u8]) -> Result<HttpMessage> {
        let (tag, rest) = split_line(bytes)
            .ok_or_else(|| Error::Unserialize("Missing message type line".to_string()))?;

        match tag {
            REQUEST_TAG => decode_request(rest).map(HttpMessage::Request),
            RESPONSE_TAG => decode_response(rest).map(HttpMessage::Response),
            other => Err(Error::Unserialize(format!(
                "Unknown message type {:?}",
                other
            ))),
        }
    }
}

impl DataSerializer<HttpRequest> for HttpSerializer {
    fn serialize(&self, value: &HttpRequest) -> Result<Vec<u8>> {
        encode_request(value)
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<HttpRequest> {
        match self.decode(bytes)? {
            HttpMessage::Request(request) => Ok(request),
            HttpMessage::Response(_) => Err(Error::Unserialize(
                "Expected REQUEST, got RESPONSE".to_string(),
            )),
        }
    }
}

impl DataSerializer<HttpResponse> for HttpSerializer {
    fn serialize(&self, value: &HttpResponse) -> Result<Vec<u8>> {
        encode_response(value)
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<HttpResponse> {
        match self.decode(bytes)? {
            HttpMessage::Response(response) => Ok(response),
            HttpMessage::Request(_) => Err(Error::Unserialize(
                "Expected RESPONSE, got REQUEST".to_string(),
            )),
        }
    }
}

/// Whether `method` fits the `[A-Z]+` method token of the request line
pub(crate) fn is_wire_method(method: &Method) -> bool {
    let name = method.as_str();
    !name.is_empty() && name.bytes().all(|b| b.is_ascii_uppercase())
}

fn encode_request(request: &HttpRequest) -> Result<Vec<u8>> {
    if !is_wire_method(&request.method) {
        return Err(Error::Serialize(format!(
            "Method {} can not be written to the request line",
            request.method
        )));
    }

    let mut lines = vec![
        REQUEST_TAG.to_string(),
        format!(
            "HTTP/{} {} {}",
            version_str(request.version)?,
            request.method,
            request.uri
        ),
    ];

    if !request.headers.contains("Host") {
        if let Some(host) = host_header(&request.uri) {
            lines.push(format!("Host: {}", host));
        }
    }
    push_headers(&mut lines, &request.headers)?;

    Ok(finish(lines, &request.body))
}

fn encode_response(response: &HttpResponse) -> Result<Vec<u8>> {
    let mut lines = vec![RESPONSE_TAG.to_string()];
    push_headers(&mut lines, &response.headers)?;
    Ok(finish(lines, &response.body))
}

fn push_headers(lines: &mut Vec<String>, headers: &Headers) -> Result<()> {
    for (name, values) in headers.iter() {
        if name.is_empty() || name.contains(':') || has_line_break(name) {
            return Err(Error::Serialize(format!("Invalid header name {:?}", name)));
        }
        let value = values.join(", ");
        if has_line_break(&value) {
            return Err(Error::Serialize(format!(
                "Header {} contains a line break",
                name
            )));
        }
        lines.push(format!("{}: {}", name, value));
    }
    Ok(())
}

fn finish(mut lines: Vec<String>, body: &[u8]) -> Vec<u8> {
    // Blank line between head and body
    lines.push(String::new());
    let head = lines.join("\r\n");

    let mut out = Vec::with_capacity(head.len() + CRLF.len() + body.len());
    out.extend_from_slice(head.as_bytes());
    out.extend_from_slice(CRLF);
    out.extend_from_slice(body);
    out
}

fn decode_request(bytes: &[u8]) -> Result<HttpRequest> {
    let (line, rest) = split_line(bytes)
        .ok_or_else(|| Error::Unserialize("Missing request line".to_string()))?;

    let captures = REQUEST_LINE
        .captures(line)
        .ok_or_else(|| Error::Unserialize(format!("Malformed request line {:?}", line)))?;

    let version = parse_version(&captures[1])?;
    let method = Method::from_bytes(captures[2].as_bytes())
        .map_err(|e| Error::Unserialize(format!("Invalid method: {}", e)))?;
    let uri: Uri = captures[3]
        .parse()
        .map_err(|e| Error::Unserialize(format!("Invalid URI: {}", e)))?;

    let (headers, body) = decode_head(rest)?;

    Ok(HttpRequest {
        method,
        uri,
        version,
        headers,
        body,
    })
}

fn decode_response(bytes: &[u8]) -> Result<HttpResponse> {
    let (headers, body) = decode_head(bytes)?;
    Ok(HttpResponse {
        status: StatusCode::OK,
        version: Version::HTTP_11,
        headers,
        body,
    })
}

fn decode_head(mut bytes: &[u8]) -> Result<(Headers, Bytes)> {
    let mut headers = Headers::new();
    loop {
        let (line, rest) = split_line(bytes).ok_or_else(|| {
            Error::Unserialize("Missing blank line between headers and body".to_string())
        })?;
        bytes = rest;

        if line.is_empty() {
            break;
        }
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| Error::Unserialize(format!("Malformed header line {:?}", line)))?;
        headers.append(name.trim(), value.trim());
    }
    Ok((headers, Bytes::copy_from_slice(bytes)))
}

/// First CRLF-terminated line as UTF-8, and the bytes after it
fn split_line(bytes: &[u8]) -> Option<(&str, &[u8])> {
    let end = bytes.windows(CRLF.len()).position(|window| window == CRLF)?;
    let line = std::str::from_utf8(&bytes[..end]).ok()?;
    Some((line, &bytes[end + CRLF.len()..]))
}

fn has_line_break(value: &str) -> bool {
    value.contains('\r') || value.contains('\n')
}

fn host_header(uri: &Uri) -> Option<String> {
    let host = uri.host()?;
    Some(match uri.port_u16() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

fn version_str(version: Version) -> Result<&'static str> {
    if version == Version::HTTP_09 {
        Ok("0.9")
    } else if version == Version::HTTP_10 {
        Ok("1.0")
    } else if version == Version::HTTP_11 {
        Ok("1.1")
    } else if version == Version::HTTP_2 {
        Ok("2.0")
    } else if version == Version::HTTP_3 {
        Ok("3.0")
    } else {
        Err(Error::Serialize(format!(
            "Unsupported protocol version {:?}",
            version
        )))
    }
}

fn parse_version(value: &str) -> Result<Version> {
    match value {
        "0.9" => Ok(Version::HTTP_09),
        "1.0" => Ok(Version::HTTP_10),
        "1.1" => Ok(Version::HTTP_11),
        "2.0" => Ok(Version::HTTP_2),
        "3.0" => Ok(Version::HTTP_3),
        other => Err(Error::Unserialize(format!(
            "Unsupported protocol version {:?}",
            other
        ))),
    }
}
