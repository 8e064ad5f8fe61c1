//! The narrow interface between the effect manager and a real transport.
//!
//! # Design
//! A `Transport` opens a `Channel`, the launcher configures it and calls
//! `send`, handing over a `Task`:
//! - `Completion` resolves the operation. Its methods take `self`, so a
//!   transport can report at most one terminal event.
//! - `ProgressSink` may fire any number of times.
//! - `CancelToken` is shared with the cancel handle kept by the reconciler.
//!
//! The token is a small state machine (pending, settled, aborted). Settling
//! and aborting race through a compare-and-swap, so an aborted operation
//! never dispatches a result and a settled one ignores a late abort.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tracing::trace;
use uuid::Uuid;

use crate::error::OpenError;
use crate::expect::ResponseMode;
use crate::http::{HttpMethod, RawResponse, TransportOutcome};
use crate::progress::Progress;
use crate::router::{Dispatch, SelfAction};

/// Something that can carry out HTTP requests.
pub trait Transport {
    type Channel: Channel;

    /// Prepare a request. Fails when the URL (or method) cannot be used.
    fn open(&self, method: &HttpMethod, url: &str) -> Result<Self::Channel, OpenError>;
}

/// An opened, not yet sent request.
pub trait Channel {
    /// Add a header. Repeated names are sent as separate headers.
    fn set_header(&mut self, name: &str, value: &str);

    /// `None` disables the timeout.
    fn set_timeout(&mut self, timeout: Option<Duration>);

    fn set_response_mode(&mut self, mode: ResponseMode);

    fn set_credentials_policy(&mut self, allow_cross_origin: bool);

    /// Start the request and return the transport's abort capability.
    fn send(self, body: Option<Bytes>, task: Task) -> Abort;
}

/// Asks the transport to stop an in-flight request.
pub type Abort = Box<dyn FnOnce() + Send>;

/// Identifies one launched operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OperationId(Uuid);

impl OperationId {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

const PENDING: u8 = 0;
const SETTLED: u8 = 1;
const ABORTED: u8 = 2;

/// Shared lifecycle flag of one operation.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicU8>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire) == ABORTED
    }

    /// True while neither settled nor aborted.
    pub fn is_pending(&self) -> bool {
        self.0.load(Ordering::Acquire) == PENDING
    }

    /// Returns false if the operation already settled or was aborted.
    pub(crate) fn abort(&self) -> bool {
        self.transition(ABORTED)
    }

    fn settle(&self) -> bool {
        self.transition(SETTLED)
    }

    fn transition(&self, to: u8) -> bool {
        self.0
            .compare_exchange(PENDING, to, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

/// Everything a transport needs to report back on one request.
pub struct Task {
    pub completion: Completion,
    /// Present only for tracked requests.
    pub progress: Option<ProgressSink>,
    pub cancel: CancelToken,
}

type Deliver = Box<dyn FnOnce(TransportOutcome<Bytes>) + Send>;

/// Single-use terminal signal of an operation.
pub struct Completion {
    token: CancelToken,
    deliver: Deliver,
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion")
            .field("token", &self.token)
            .finish_non_exhaustive()
    }
}

impl Completion {
    pub(crate) fn new(
        token: CancelToken,
        deliver: impl FnOnce(TransportOutcome<Bytes>) + Send + 'static,
    ) -> Self {
        Self {
            token,
            deliver: Box::new(deliver),
        }
    }

    pub fn network_error(self) {
        self.settle(TransportOutcome::NetworkError)
    }

    pub fn timeout(self) {
        self.settle(TransportOutcome::Timeout)
    }

    pub fn load(self, response: RawResponse) {
        self.settle(response.into_outcome())
    }

    fn settle(self, outcome: TransportOutcome<Bytes>) {
        if !self.token.settle() {
            trace!("operation aborted before completion; result dropped");
            return;
        }
        (self.deliver)(outcome)
    }
}

/// Progress reporter of a tracked operation.
#[derive(Clone)]
pub struct ProgressSink {
    tracker: Arc<str>,
    token: CancelToken,
    dispatch: Dispatch<SelfAction>,
}

impl fmt::Debug for ProgressSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressSink")
            .field("tracker", &self.tracker)
            .finish_non_exhaustive()
    }
}

impl ProgressSink {
    pub(crate) fn new(tracker: &str, token: CancelToken, dispatch: Dispatch<SelfAction>) -> Self {
        Self {
            tracker: Arc::from(tracker),
            token,
            dispatch,
        }
    }

    pub fn upload(&self, sent: u64, total: u64) {
        self.emit(Progress::Sending { sent, total })
    }

    pub fn download(&self, received: u64, total: Option<u64>) {
        self.emit(Progress::Receiving { received, total })
    }

    fn emit(&self, progress: Progress) {
        if !self.token.is_pending() {
            return;
        }
        (self.dispatch)(SelfAction::Progress {
            tracker: self.tracker.to_string(),
            progress,
        })
    }
}
