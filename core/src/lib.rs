//! Declarative HTTP effect manager.
//!
//! # Overview
//! Applications declare the HTTP requests that should be happening as
//! `Command` values and subscribe to progress with `Subscription`s. Each
//! cycle the `EffectManager` reconciles those declarations against the
//! operations already in flight: it starts new requests, cancels the ones
//! whose tracker was cancelled, and routes results and progress back through
//! the host's dispatch callbacks.
//!
//! # Design
//! - The transport sits behind the `Transport`/`Channel` traits; the crate
//!   ships a ureq-backed implementation and stays testable with fakes.
//! - The live-operation table is owned by the host's `State` and passed by
//!   value through every call, so cycles are serialized by construction.
//! - Every outcome reaches the application as `Result<T, Error>` through the
//!   request's `Expect`; nothing is thrown across the dispatch boundary.
//! - Requests and outcomes are sum types matched exhaustively.

pub mod command;
pub mod error;
pub mod expect;
pub mod http;
pub mod launcher;
pub mod manager;
pub mod progress;
pub mod reconciler;
pub mod router;
pub mod transport;
pub mod ureq_transport;

#[cfg(test)]
mod testing;

pub use command::{cancel, get, post, request, risky_request, track, unique_tracker, Command, Request, Subscription};
pub use error::{Error, OpenError};
pub use expect::{
    expect_bytes, expect_bytes_response, expect_json, expect_string, expect_string_response, expect_whatever,
    resolve, Expect, ResponseMode,
};
pub use http::{header, parse_headers, Body, Header, HttpMethod, Metadata, RawResponse, TransportOutcome};
pub use launcher::{launch, CancelHandle};
pub use manager::{EffectManager, State};
pub use progress::{fraction_received, fraction_sent, Progress};
pub use reconciler::{reconcile, LiveTable};
pub use router::{Dispatch, Router, SelfAction};
pub use transport::{Abort, CancelToken, Channel, Completion, OperationId, ProgressSink, Task, Transport};
pub use ureq_transport::{TransportConfig, UreqTransport};
