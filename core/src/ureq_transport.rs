//! `Transport` backed by ureq.
//!
//! # Design
//! ureq is blocking, so each sent channel runs on its own thread with its own
//! agent. The agent never turns statuses into errors; classification is left
//! to `RawResponse::into_outcome` like for any other transport.
//!
//! ureq cannot interrupt a request already on the wire. The reader checks
//! the task's cancel token between body chunks; the token has already
//! silenced the operation by then, so a late response is dropped unread.
//!
//! Request bodies are fully buffered, so their length is always sent as
//! `Content-Length` rather than chunked.

use std::io::{self, Cursor, Read};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use bytes::Bytes;
use serde::Deserialize;
use tracing::{debug, trace};
use ureq::http::{self, Method, Uri};
use ureq::{Agent, ResponseExt, SendBody};

use crate::error::OpenError;
use crate::expect::ResponseMode;
use crate::http::{HttpMethod, RawResponse};
use crate::transport::{Abort, Channel, ProgressSink, Task, Transport};

/// Settings shared by every request of a `UreqTransport`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub max_redirects: u32,
    /// Sent as `User-Agent` when set.
    pub user_agent: Option<String>,
    /// Size of each body read, and so the granularity of download progress.
    pub read_chunk_size: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            max_redirects: 10,
            user_agent: None,
            read_chunk_size: 16 * 1024,
        }
    }
}

impl TransportConfig {
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

#[derive(Debug, Clone, Default)]
pub struct UreqTransport {
    config: Arc<TransportConfig>,
}

impl UreqTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: TransportConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }
}

impl Transport for UreqTransport {
    type Channel = UreqChannel;

    /// Only absolute `http`/`https` URLs with a host are accepted.
    fn open(&self, method: &HttpMethod, url: &str) -> Result<UreqChannel, OpenError> {
        let uri: Uri = url.parse().map_err(|_| OpenError::BadUrl(url.to_string()))?;
        let web_scheme = matches!(uri.scheme_str(), Some("http" | "https"));
        if !web_scheme || uri.host().is_none() {
            return Err(OpenError::BadUrl(url.to_string()));
        }
        let method =
            Method::from_bytes(method.as_str().as_bytes()).map_err(|_| OpenError::BadMethod(method.to_string()))?;

        Ok(UreqChannel {
            config: Arc::clone(&self.config),
            method,
            uri,
            headers: Vec::new(),
            timeout: None,
            mode: ResponseMode::Text,
            allow_cross_origin: false,
        })
    }
}

#[derive(Debug)]
pub struct UreqChannel {
    config: Arc<TransportConfig>,
    method: Method,
    uri: Uri,
    headers: Vec<(String, String)>,
    timeout: Option<Duration>,
    mode: ResponseMode,
    allow_cross_origin: bool,
}

impl Channel for UreqChannel {
    fn set_header(&mut self, name: &str, value: &str) {
        self.headers.push((name.to_string(), value.to_string()));
    }

    fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.timeout = timeout;
    }

    // Bodies are always read as bytes; the expectation converts text.
    fn set_response_mode(&mut self, mode: ResponseMode) {
        self.mode = mode;
    }

    // ureq keeps no cookie store, so there is nothing to share across origins.
    fn set_credentials_policy(&mut self, allow_cross_origin: bool) {
        self.allow_cross_origin = allow_cross_origin;
    }

    fn send(self, body: Option<Bytes>, task: Task) -> Abort {
        let uri = self.uri.clone();
        thread::spawn(move || self.run(body, task));
        Box::new(move || trace!(%uri, "abort requested; reader stops at the next chunk"))
    }
}

impl UreqChannel {
    fn run(self, body: Option<Bytes>, task: Task) {
        let Task {
            completion,
            progress,
            cancel,
        } = task;
        trace!(
            method = %self.method,
            uri = %self.uri,
            mode = ?self.mode,
            allow_cross_origin = self.allow_cross_origin,
            "sending request"
        );

        let agent: Agent = Agent::config_builder()
            .http_status_as_error(false)
            .max_redirects(self.config.max_redirects)
            .timeout_global(self.timeout)
            .build()
            .new_agent();

        let mut builder = http::Request::builder()
            .method(self.method.clone())
            .uri(self.uri.clone());
        if let Some(user_agent) = &self.config.user_agent {
            builder = builder.header(http::header::USER_AGENT, user_agent.as_str());
        }
        for (name, value) in &self.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let send_body = match body {
            Some(body) => {
                let total = body.len() as u64;
                builder = builder.header(http::header::CONTENT_LENGTH, total);
                SendBody::from_owned_reader(Upload {
                    inner: Cursor::new(body),
                    sent: 0,
                    total,
                    progress: progress.clone(),
                })
            }
            None => SendBody::none(),
        };

        let request = match builder.body(send_body) {
            Ok(request) => request,
            Err(err) => {
                debug!(%err, uri = %self.uri, "request rejected before sending");
                completion.network_error();
                return;
            }
        };

        let response = match agent.run(request) {
            Ok(response) => response,
            Err(ureq::Error::Timeout(timeout)) => {
                debug!(?timeout, uri = %self.uri, "request timed out");
                completion.timeout();
                return;
            }
            Err(err) => {
                debug!(%err, uri = %self.uri, "transport failure");
                completion.network_error();
                return;
            }
        };

        let url = response.get_uri().to_string();
        let status = response.status();
        let raw_headers = response
            .headers()
            .iter()
            .map(|(name, value)| format!("{}: {}", name, String::from_utf8_lossy(value.as_bytes())))
            .collect::<Vec<_>>()
            .join("\r\n");
        let length = response
            .headers()
            .get(http::header::CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<u64>().ok());

        let mut reader = response.into_body().into_reader();
        let mut chunk = vec![0u8; self.config.read_chunk_size.max(1)];
        let mut received = Vec::new();
        loop {
            if cancel.is_cancelled() {
                trace!(uri = %self.uri, "aborted while receiving");
                return;
            }
            match reader.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => {
                    received.extend_from_slice(&chunk[..n]);
                    if let Some(progress) = &progress {
                        progress.download(received.len() as u64, length);
                    }
                }
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == io::ErrorKind::TimedOut => {
                    debug!(%err, uri = %self.uri, "body read timed out");
                    completion.timeout();
                    return;
                }
                Err(err) => {
                    debug!(%err, uri = %self.uri, "body read failed");
                    completion.network_error();
                    return;
                }
            }
        }

        completion.load(RawResponse {
            url,
            status_code: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            raw_headers,
            body: Bytes::from(received),
        });
    }
}

/// Request body reader reporting upload progress as ureq pulls bytes.
struct Upload {
    inner: Cursor<Bytes>,
    sent: u64,
    total: u64,
    progress: Option<ProgressSink>,
}

impl Read for Upload {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        if n > 0 {
            self.sent += n as u64;
            if let Some(progress) = &self.progress {
                progress.upload(self.sent, self.total);
            }
        }
        Ok(n)
    }
}
