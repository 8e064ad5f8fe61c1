//! Dispatch context handed to the effect manager.
//!
//! # Design
//! The host supplies two callbacks: one feeding actions to the application,
//! one feeding `SelfAction`s back to the effect manager. Both are passed in
//! explicitly on every call; nothing is registered globally.

use std::fmt;
use std::sync::Arc;

use crate::progress::Progress;
use crate::transport::OperationId;

/// A dispatch callback. Transports may call it from their own threads.
pub type Dispatch<A> = Arc<dyn Fn(A) + Send + Sync>;

/// Notifications an operation sends back to the effect manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelfAction {
    Progress { tracker: String, progress: Progress },
    /// The operation under `tracker` delivered its result; its live entry
    /// can go, unless a newer operation already took the tracker.
    Settled { tracker: String, operation: OperationId },
}

pub struct Router<A> {
    app: Dispatch<A>,
    self_: Dispatch<SelfAction>,
}

impl<A> Clone for Router<A> {
    fn clone(&self) -> Self {
        Self {
            app: Arc::clone(&self.app),
            self_: Arc::clone(&self.self_),
        }
    }
}

impl<A> fmt::Debug for Router<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router").finish_non_exhaustive()
    }
}

impl<A> Router<A> {
    pub fn new(
        app: impl Fn(A) + Send + Sync + 'static,
        self_: impl Fn(SelfAction) + Send + Sync + 'static,
    ) -> Self {
        Self {
            app: Arc::new(app),
            self_: Arc::new(self_),
        }
    }

    pub fn send_to_app(&self, action: A) {
        (self.app)(action)
    }

    pub(crate) fn app(&self) -> Dispatch<A> {
        Arc::clone(&self.app)
    }

    pub(crate) fn self_dispatch(&self) -> Dispatch<SelfAction> {
        Arc::clone(&self.self_)
    }
}
