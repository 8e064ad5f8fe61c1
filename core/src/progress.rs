//! Upload/download progress and its routing to subscriptions.

use tracing::trace;

use crate::command::Subscription;
use crate::router::Router;

/// Progress of a tracked request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    Sending { sent: u64, total: u64 },
    /// `total` is `None` when the response length is unknown.
    Receiving { received: u64, total: Option<u64> },
}

/// Fraction of the request body sent, in `[0, 1]`. An empty body counts as
/// fully sent.
pub fn fraction_sent(sent: u64, total: u64) -> f64 {
    if total == 0 {
        1.0
    } else {
        (sent as f64 / total as f64).clamp(0.0, 1.0)
    }
}

/// Fraction of the response body received, in `[0, 1]`. Unknown length
/// reports 0, an empty body reports 1.
pub fn fraction_received(received: u64, total: Option<u64>) -> f64 {
    match total {
        None => 0.0,
        Some(0) => 1.0,
        Some(total) => (received as f64 / total as f64).clamp(0.0, 1.0),
    }
}

/// Deliver `progress` to every subscription declared for `tracker`.
///
/// `subs` must be the subscriptions of the current cycle; an event for a
/// tracker nobody listens to any more is dropped. Returns the number of
/// actions dispatched.
pub fn route<A>(subs: &[Subscription<A>], tracker: &str, progress: Progress, router: &Router<A>) -> usize {
    let mut delivered = 0;
    for sub in subs.iter().filter(|sub| sub.tracker() == tracker) {
        router.send_to_app(sub.on_progress(progress));
        delivered += 1;
    }
    if delivered == 0 {
        trace!(tracker, ?progress, "no subscription for progress");
    }
    delivered
}
