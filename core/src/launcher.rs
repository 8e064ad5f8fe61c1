//! Start one transport operation for a `Request` command.

use std::fmt;
use std::time::Duration;

use tracing::{debug, warn};

use crate::command::Request;
use crate::http::{Body, TransportOutcome};
use crate::router::{Router, SelfAction};
use crate::transport::{Abort, CancelToken, Channel, Completion, OperationId, ProgressSink, Task, Transport};

/// Cancel capability of a tracked, in-flight operation.
///
/// Dropping a handle does not cancel anything; the operation keeps running
/// and still reports its result.
pub struct CancelHandle {
    operation: OperationId,
    token: CancelToken,
    abort: Abort,
}

impl fmt::Debug for CancelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelHandle")
            .field("operation", &self.operation)
            .field("token", &self.token)
            .finish_non_exhaustive()
    }
}

impl CancelHandle {
    pub fn operation(&self) -> OperationId {
        self.operation
    }

    /// Suppress any further progress or result, then ask the transport to
    /// abort.
    pub fn cancel(self) {
        if self.token.abort() {
            debug!(operation = %self.operation, "operation aborted");
        }
        (self.abort)()
    }
}

/// Open, configure and send `request`.
///
/// A URL the transport refuses resolves immediately as `BadUrl` through the
/// application dispatch and yields `None`. Otherwise the handle is returned
/// only when the request declares a tracker; untracked requests cannot be
/// cancelled.
pub fn launch<A, T>(transport: &T, router: &Router<A>, request: Request<A>) -> Option<CancelHandle>
where
    A: Send + 'static,
    T: Transport,
{
    let Request {
        method,
        headers,
        url,
        body,
        expect,
        timeout,
        tracker,
        allow_cross_origin_credentials,
    } = request;

    let mut channel = match transport.open(&method, &url) {
        Ok(channel) => channel,
        Err(err) => {
            warn!(%method, %url, %err, "transport refused request");
            router.send_to_app(expect.to_value(TransportOutcome::BadUrl { url }));
            return None;
        }
    };

    for (name, value) in &headers {
        channel.set_header(name, value);
    }
    channel.set_timeout(timeout.filter(|t| *t > Duration::ZERO));
    channel.set_response_mode(expect.mode());
    channel.set_credentials_policy(allow_cross_origin_credentials);

    let payload = match body {
        Body::Empty => None,
        Body::Content { mime, bytes } => {
            if !mime.is_empty() {
                channel.set_header("Content-Type", &mime);
            }
            Some(bytes)
        }
    };

    let operation = OperationId::new();
    let token = CancelToken::new();
    let completion = {
        let app = router.app();
        let self_ = router.self_dispatch();
        let tracker = tracker.clone();
        Completion::new(token.clone(), move |outcome| {
            app(expect.to_value(outcome));
            if let Some(tracker) = tracker {
                self_(SelfAction::Settled { tracker, operation });
            }
        })
    };
    let progress = tracker
        .as_deref()
        .map(|tracker| ProgressSink::new(tracker, token.clone(), router.self_dispatch()));

    debug!(%method, %url, tracker = tracker.as_deref(), %operation, "launching request");
    let abort = channel.send(
        payload,
        Task {
            completion,
            progress,
            cancel: token.clone(),
        },
    );

    tracker.map(|_| CancelHandle {
        operation,
        token,
        abort,
    })
}
