//! Response expectations and the outcome resolver.
//!
//! # Design
//! An `Expect<A>` tells the transport how to read the response body
//! (`ResponseMode`) and turns the finished `TransportOutcome` into the
//! application action `A`. The `expect_*` constructors are built from two
//! pieces: `resolve`, which maps an outcome plus a body decoder to
//! `Result<T, Error>`, and a `to_msg` function wrapping that result into `A`.
//!
//! Closures are stored behind `Arc` so commands stay cheap to clone and can
//! be handed to transport threads.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use serde::de::DeserializeOwned;

use crate::error::Error;
use crate::http::TransportOutcome;

/// How the transport should deliver the response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseMode {
    Text,
    Binary,
}

type ToValue<A> = Arc<dyn Fn(TransportOutcome<Bytes>) -> A + Send + Sync>;

/// Describes how a finished request becomes an application action.
pub struct Expect<A> {
    mode: ResponseMode,
    to_value: ToValue<A>,
}

impl<A> Clone for Expect<A> {
    fn clone(&self) -> Self {
        Self {
            mode: self.mode,
            to_value: Arc::clone(&self.to_value),
        }
    }
}

impl<A> fmt::Debug for Expect<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Expect").field("mode", &self.mode).finish_non_exhaustive()
    }
}

impl<A: 'static> Expect<A> {
    pub fn mode(&self) -> ResponseMode {
        self.mode
    }

    /// Turn a raw outcome into the application action.
    pub fn to_value(&self, outcome: TransportOutcome<Bytes>) -> A {
        (self.to_value)(outcome)
    }

    /// Post-process the produced action.
    pub fn map<B>(self, f: impl Fn(A) -> B + Send + Sync + 'static) -> Expect<B> {
        let to_value = self.to_value;
        Expect {
            mode: self.mode,
            to_value: Arc::new(move |outcome| f(to_value(outcome))),
        }
    }
}

/// Build a resolver from a body decoder.
///
/// Transport failures and bad statuses map straight to their `Error`
/// variant; a bad status drops the body. Only a good status runs `decode`,
/// and a decode failure keeps nothing but its message.
pub fn resolve<B, T, D>(decode: D) -> impl Fn(TransportOutcome<B>) -> Result<T, Error> + Send + Sync
where
    D: Fn(B) -> Result<T, String> + Send + Sync,
{
    move |outcome| match outcome {
        TransportOutcome::BadUrl { url } => Err(Error::BadUrl { url }),
        TransportOutcome::Timeout => Err(Error::Timeout),
        TransportOutcome::NetworkError => Err(Error::NetworkError),
        TransportOutcome::BadStatus { metadata, .. } => Err(Error::BadStatus {
            status_code: metadata.status_code,
        }),
        TransportOutcome::GoodStatus { body, .. } => {
            decode(body).map_err(|diagnostic| Error::BadBody { diagnostic })
        }
    }
}

fn text_body(bytes: Bytes) -> String {
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Expect a text body, with full access to metadata and the raw outcome.
pub fn expect_string_response<A, T, X, M, R>(to_msg: M, to_result: R) -> Expect<A>
where
    M: Fn(Result<T, X>) -> A + Send + Sync + 'static,
    R: Fn(TransportOutcome<String>) -> Result<T, X> + Send + Sync + 'static,
{
    Expect {
        mode: ResponseMode::Text,
        to_value: Arc::new(move |outcome| to_msg(to_result(outcome.map_body(text_body)))),
    }
}

/// Expect a binary body, with full access to metadata and the raw outcome.
pub fn expect_bytes_response<A, T, X, M, R>(to_msg: M, to_result: R) -> Expect<A>
where
    M: Fn(Result<T, X>) -> A + Send + Sync + 'static,
    R: Fn(TransportOutcome<Bytes>) -> Result<T, X> + Send + Sync + 'static,
{
    Expect {
        mode: ResponseMode::Binary,
        to_value: Arc::new(move |outcome| to_msg(to_result(outcome))),
    }
}

pub fn expect_string<A, M>(to_msg: M) -> Expect<A>
where
    M: Fn(Result<String, Error>) -> A + Send + Sync + 'static,
{
    expect_string_response(to_msg, resolve(|body: String| Ok(body)))
}

/// Expect a JSON body decoding to `T`. Decode errors surface as
/// `Error::BadBody` carrying serde_json's message.
pub fn expect_json<A, T, M>(to_msg: M) -> Expect<A>
where
    T: DeserializeOwned + 'static,
    M: Fn(Result<T, Error>) -> A + Send + Sync + 'static,
{
    expect_string_response(
        to_msg,
        resolve(|body: String| serde_json::from_str::<T>(&body).map_err(|e| e.to_string())),
    )
}

/// Expect a binary body decoded by `decode`; `None` becomes
/// `Error::BadBody` with a generic diagnostic.
pub fn expect_bytes<A, T, M, D>(to_msg: M, decode: D) -> Expect<A>
where
    T: 'static,
    M: Fn(Result<T, Error>) -> A + Send + Sync + 'static,
    D: Fn(&[u8]) -> Option<T> + Send + Sync + 'static,
{
    expect_bytes_response(
        to_msg,
        resolve(move |body: Bytes| decode(&body).ok_or_else(|| "unexpected bytes".to_string())),
    )
}

/// Ignore the body; only success or failure matters.
pub fn expect_whatever<A, M>(to_msg: M) -> Expect<A>
where
    M: Fn(Result<(), Error>) -> A + Send + Sync + 'static,
{
    expect_bytes_response(to_msg, resolve(|_: Bytes| Ok(())))
}
