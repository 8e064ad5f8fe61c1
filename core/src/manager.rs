//! Host-facing effect manager.
//!
//! # Design
//! The host calls `on_effects` once per cycle with the commands and
//! subscriptions currently declared, and `on_self_action` for every
//! `SelfAction` it received through the router's self dispatch. Both take the
//! `State` by value and return the next one; the host keeps it between calls
//! and must not run two calls on the same state concurrently.

use crate::command::{Command, Subscription};
use crate::progress;
use crate::reconciler::{reconcile, LiveTable};
use crate::router::{Router, SelfAction};
use crate::transport::Transport;

/// State carried between cycles.
#[derive(Debug)]
pub struct State<A> {
    reqs: LiveTable,
    subs: Vec<Subscription<A>>,
}

impl<A> Default for State<A> {
    fn default() -> Self {
        Self {
            reqs: LiveTable::new(),
            subs: Vec::new(),
        }
    }
}

impl<A> State<A> {
    pub fn live(&self) -> &LiveTable {
        &self.reqs
    }

    pub fn subscriptions(&self) -> &[Subscription<A>] {
        &self.subs
    }
}

/// Translates declared HTTP commands into transport operations.
#[derive(Debug, Clone, Default)]
pub struct EffectManager<T> {
    transport: T,
}

impl<T: Transport> EffectManager<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn init<A>(&self) -> State<A> {
        State::default()
    }

    /// Reconcile this cycle's commands and remember its subscriptions.
    pub fn on_effects<A: Send + 'static>(
        &self,
        router: &Router<A>,
        commands: Vec<Command<A>>,
        subs: Vec<Subscription<A>>,
        state: State<A>,
    ) -> State<A> {
        let reqs = reconcile(&self.transport, router, commands, state.reqs);
        State { reqs, subs }
    }

    /// Route progress to the current subscriptions, or retire a settled
    /// operation.
    pub fn on_self_action<A>(&self, router: &Router<A>, action: SelfAction, mut state: State<A>) -> State<A> {
        match action {
            SelfAction::Progress { tracker, progress } => {
                progress::route(&state.subs, &tracker, progress, router);
            }
            SelfAction::Settled { tracker, operation } => {
                state.reqs.remove_settled(&tracker, operation);
            }
        }
        state
    }
}
