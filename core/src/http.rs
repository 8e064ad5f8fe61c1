//! HTTP data types shared by commands, transports and expectations.
//!
//! # Design
//! Requests and responses are described as plain data. A `Transport` turns
//! them into real I/O; everything in this module stays deterministic so the
//! classification and header parsing rules can be tested without a network.

use std::collections::BTreeMap;
use std::fmt;

use bytes::Bytes;
use serde::Serialize;

/// HTTP method of a declared request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
    /// Any other method token, passed to the transport verbatim.
    Other(String),
}

impl HttpMethod {
    pub fn as_str(&self) -> &str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Other(method) => method,
        }
    }
}

impl From<&str> for HttpMethod {
    fn from(method: &str) -> Self {
        match method {
            "GET" => HttpMethod::Get,
            "POST" => HttpMethod::Post,
            "PUT" => HttpMethod::Put,
            "PATCH" => HttpMethod::Patch,
            "DELETE" => HttpMethod::Delete,
            "HEAD" => HttpMethod::Head,
            "OPTIONS" => HttpMethod::Options,
            other => HttpMethod::Other(other.to_string()),
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single request header. Requests keep headers as an ordered list, so the
/// same name may appear more than once and each pair is sent separately.
pub type Header = (String, String);

pub fn header(name: &str, value: &str) -> Header {
    (name.to_string(), value.to_string())
}

/// Request body together with its MIME type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Body {
    /// No body and no `Content-Type`.
    #[default]
    Empty,
    Content { mime: String, bytes: Bytes },
}

impl Body {
    pub fn empty() -> Self {
        Body::Empty
    }

    pub fn string(mime: &str, text: impl Into<String>) -> Self {
        Body::Content {
            mime: mime.to_string(),
            bytes: Bytes::from(text.into()),
        }
    }

    /// Serialize `value` as an `application/json` body.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, serde_json::Error> {
        let encoded = serde_json::to_vec(value)?;
        Ok(Body::Content {
            mime: "application/json".to_string(),
            bytes: Bytes::from(encoded),
        })
    }

    pub fn bytes(mime: &str, bytes: impl Into<Bytes>) -> Self {
        Body::Content {
            mime: mime.to_string(),
            bytes: bytes.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Body::Empty)
    }
}

/// Response metadata available for both good and bad statuses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    /// Final URL, after any redirects.
    pub url: String,
    pub status_code: u16,
    pub status_text: String,
    /// Repeated header names are merged into one `", "`-joined value.
    pub headers: BTreeMap<String, String>,
}

/// Every way a launched request can end, before the body is decoded.
///
/// Matching on this type must stay exhaustive; adding a variant is meant to
/// break every resolver until it handles the new case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportOutcome<B> {
    BadUrl { url: String },
    Timeout,
    NetworkError,
    BadStatus { metadata: Metadata, body: B },
    GoodStatus { metadata: Metadata, body: B },
}

impl<B> TransportOutcome<B> {
    pub fn map_body<C>(self, f: impl FnOnce(B) -> C) -> TransportOutcome<C> {
        match self {
            TransportOutcome::BadUrl { url } => TransportOutcome::BadUrl { url },
            TransportOutcome::Timeout => TransportOutcome::Timeout,
            TransportOutcome::NetworkError => TransportOutcome::NetworkError,
            TransportOutcome::BadStatus { metadata, body } => TransportOutcome::BadStatus {
                metadata,
                body: f(body),
            },
            TransportOutcome::GoodStatus { metadata, body } => TransportOutcome::GoodStatus {
                metadata,
                body: f(body),
            },
        }
    }
}

/// A completed exchange as reported by a transport.
///
/// `raw_headers` is the unparsed header block (`name: value` entries joined
/// by CRLF), the form browser-style transports expose.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawResponse {
    pub url: String,
    pub status_code: u16,
    pub status_text: String,
    pub raw_headers: String,
    pub body: Bytes,
}

impl RawResponse {
    pub fn metadata(&self) -> Metadata {
        Metadata {
            url: self.url.clone(),
            status_code: self.status_code,
            status_text: self.status_text.clone(),
            headers: parse_headers(&self.raw_headers),
        }
    }

    /// Classify by status: `200..=299` is good, anything else is bad.
    pub fn into_outcome(self) -> TransportOutcome<Bytes> {
        let metadata = self.metadata();
        if (200..=299).contains(&self.status_code) {
            TransportOutcome::GoodStatus {
                metadata,
                body: self.body,
            }
        } else {
            TransportOutcome::BadStatus {
                metadata,
                body: self.body,
            }
        }
    }
}

/// Parse a raw CRLF-separated header block.
///
/// Each entry is split on its first `": "`; entries without one (or with an
/// empty name) are dropped. A repeated name has its value appended, so
/// merged values read in arrival order: `X-A: 1` then `X-A: 2` yields
/// `"1, 2"`.
pub fn parse_headers(raw: &str) -> BTreeMap<String, String> {
    let mut headers: BTreeMap<String, String> = BTreeMap::new();
    if raw.is_empty() {
        return headers;
    }
    for entry in raw.split("\r\n") {
        let Some((name, value)) = entry.split_once(": ") else {
            continue;
        };
        if name.is_empty() {
            continue;
        }
        headers
            .entry(name.to_string())
            .and_modify(|merged| *merged = format!("{merged}, {value}"))
            .or_insert_with(|| value.to_string());
    }
    headers
}
