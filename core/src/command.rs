//! Commands and subscriptions an application declares.
//!
//! # Design
//! A `Command` is an immutable description of work: start a request, or
//! cancel the request registered under a tracker. A `Subscription` asks for
//! progress of a tracker. The application returns these values each cycle and
//! the effect manager makes the live requests match them.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::expect::Expect;
use crate::http::{Body, Header, HttpMethod};
use crate::progress::Progress;

/// A request to start.
#[derive(Debug)]
pub struct Request<A> {
    pub method: HttpMethod,
    pub headers: Vec<Header>,
    pub url: String,
    pub body: Body,
    pub expect: Expect<A>,
    /// `None` or zero means no timeout.
    pub timeout: Option<Duration>,
    /// Requests with a tracker can be cancelled and report progress.
    pub tracker: Option<String>,
    pub allow_cross_origin_credentials: bool,
}

impl<A> Clone for Request<A> {
    fn clone(&self) -> Self {
        Self {
            method: self.method.clone(),
            headers: self.headers.clone(),
            url: self.url.clone(),
            body: self.body.clone(),
            expect: self.expect.clone(),
            timeout: self.timeout,
            tracker: self.tracker.clone(),
            allow_cross_origin_credentials: self.allow_cross_origin_credentials,
        }
    }
}

#[derive(Debug)]
pub enum Command<A> {
    /// Abort the live request registered under `tracker`, if any.
    Cancel { tracker: String },
    Request(Request<A>),
}

impl<A> Clone for Command<A> {
    fn clone(&self) -> Self {
        match self {
            Command::Cancel { tracker } => Command::Cancel {
                tracker: tracker.clone(),
            },
            Command::Request(request) => Command::Request(request.clone()),
        }
    }
}

impl<A: 'static> Command<A> {
    /// Convert the action produced by this command. `Cancel` carries no
    /// action and passes through unchanged.
    pub fn map<B>(self, f: impl Fn(A) -> B + Send + Sync + 'static) -> Command<B> {
        match self {
            Command::Cancel { tracker } => Command::Cancel { tracker },
            Command::Request(request) => Command::Request(Request {
                method: request.method,
                headers: request.headers,
                url: request.url,
                body: request.body,
                expect: request.expect.map(f),
                timeout: request.timeout,
                tracker: request.tracker,
                allow_cross_origin_credentials: request.allow_cross_origin_credentials,
            }),
        }
    }
}

pub fn get<A>(url: &str, expect: Expect<A>) -> Command<A> {
    request(HttpMethod::Get, Vec::new(), url, Body::empty(), expect, None, None)
}

pub fn post<A>(url: &str, body: Body, expect: Expect<A>) -> Command<A> {
    request(HttpMethod::Post, Vec::new(), url, body, expect, None, None)
}

impl<A> Request<A> {
    /// A same-origin request with every other option spelled out.
    pub fn new(
        method: HttpMethod,
        headers: Vec<Header>,
        url: &str,
        body: Body,
        expect: Expect<A>,
        timeout: Option<Duration>,
        tracker: Option<&str>,
    ) -> Self {
        Self {
            method,
            headers,
            url: url.to_string(),
            body,
            expect,
            timeout,
            tracker: tracker.map(str::to_string),
            allow_cross_origin_credentials: false,
        }
    }
}

/// Declare a request with every option spelled out.
pub fn request<A>(
    method: HttpMethod,
    headers: Vec<Header>,
    url: &str,
    body: Body,
    expect: Expect<A>,
    timeout: Option<Duration>,
    tracker: Option<&str>,
) -> Command<A> {
    Command::Request(Request::new(method, headers, url, body, expect, timeout, tracker))
}

/// Like [`request`], but lets the transport send and accept cookies for
/// other origins.
pub fn risky_request<A>(
    method: HttpMethod,
    headers: Vec<Header>,
    url: &str,
    body: Body,
    expect: Expect<A>,
    timeout: Option<Duration>,
    tracker: Option<&str>,
) -> Command<A> {
    Command::Request(Request {
        allow_cross_origin_credentials: true,
        ..Request::new(method, headers, url, body, expect, timeout, tracker)
    })
}

pub fn cancel<A>(tracker: &str) -> Command<A> {
    Command::Cancel {
        tracker: tracker.to_string(),
    }
}

/// A fresh tracker, `"{prefix}-{uuid}"`.
pub fn unique_tracker(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4())
}

/// Interest in the progress of a tracker.
pub struct Subscription<A> {
    tracker: String,
    to_msg: Arc<dyn Fn(Progress) -> A + Send + Sync>,
}

impl<A> Clone for Subscription<A> {
    fn clone(&self) -> Self {
        Self {
            tracker: self.tracker.clone(),
            to_msg: Arc::clone(&self.to_msg),
        }
    }
}

impl<A> fmt::Debug for Subscription<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("tracker", &self.tracker)
            .finish_non_exhaustive()
    }
}

impl<A> Subscription<A> {
    pub fn tracker(&self) -> &str {
        &self.tracker
    }

    pub fn on_progress(&self, progress: Progress) -> A {
        (self.to_msg)(progress)
    }
}

impl<A: 'static> Subscription<A> {
    pub fn map<B>(self, f: impl Fn(A) -> B + Send + Sync + 'static) -> Subscription<B> {
        let to_msg = self.to_msg;
        Subscription {
            tracker: self.tracker,
            to_msg: Arc::new(move |progress| f(to_msg(progress))),
        }
    }
}

/// Subscribe to progress of the request declared with `tracker`.
pub fn track<A>(tracker: &str, to_msg: impl Fn(Progress) -> A + Send + Sync + 'static) -> Subscription<A> {
    Subscription {
        tracker: tracker.to_string(),
        to_msg: Arc::new(to_msg),
    }
}
