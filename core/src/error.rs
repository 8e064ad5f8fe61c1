//! Error types for declared HTTP requests.
//!
//! # Design
//! `Error` is what the application sees. Every failure of a launched request
//! is delivered as a value through the request's `Expect`, never raised:
//! the dispatch boundary only ever carries `Result<T, Error>`.
//!
//! `OpenError` is the narrower failure a `Transport` reports when it refuses
//! to open a channel. The launcher folds every `OpenError` into
//! `Error::BadUrl`, since the request never reached the network.

/// Failure of a declared request, as reported to the application.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The URL could not be opened by the transport.
    #[error("bad url: {url}")]
    BadUrl { url: String },

    /// The per-request timeout elapsed before a response arrived.
    #[error("request timed out")]
    Timeout,

    /// The transport failed, e.g. the connection dropped.
    #[error("network error")]
    NetworkError,

    /// The server answered with a status outside `200..=299`. The body is
    /// discarded; use a raw response expectation to inspect it.
    #[error("bad status: {status_code}")]
    BadStatus { status_code: u16 },

    /// The status was good but the body did not decode.
    #[error("bad body: {diagnostic}")]
    BadBody { diagnostic: String },
}

/// Reasons a transport refuses to open a channel.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OpenError {
    #[error("malformed url: {0}")]
    BadUrl(String),

    #[error("unsupported method: {0}")]
    BadMethod(String),
}
