//! Reconcile declared commands against the table of live operations.
//!
//! # Design
//! `LiveTable` maps a tracker to the cancel handle of the operation currently
//! registered under it. It is owned by whoever drives the cycles and passed
//! by value through `reconcile`, so two cycles can never touch it at once.
//!
//! Commands run strictly in the order declared. A `Request` for a tracker
//! that already has a live entry replaces the entry without cancelling the
//! previous operation: it keeps running and reports its result, only the
//! table no longer points at it.

use std::collections::HashMap;

use tracing::{debug, trace};

use crate::command::Command;
use crate::launcher::{launch, CancelHandle};
use crate::router::Router;
use crate::transport::{OperationId, Transport};

/// Live, cancellable operations keyed by tracker.
#[derive(Debug, Default)]
pub struct LiveTable {
    ops: HashMap<String, CancelHandle>,
}

impl LiveTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn contains(&self, tracker: &str) -> bool {
        self.ops.contains_key(tracker)
    }

    /// The operation currently registered under `tracker`.
    pub fn operation(&self, tracker: &str) -> Option<OperationId> {
        self.ops.get(tracker).map(CancelHandle::operation)
    }

    /// Drop the entry for `tracker` if it still belongs to `operation`.
    /// An older operation settling never evicts a newer one.
    pub fn remove_settled(&mut self, tracker: &str, operation: OperationId) -> bool {
        if self.operation(tracker) != Some(operation) {
            trace!(tracker, %operation, "settled operation no longer live");
            return false;
        }
        self.ops.remove(tracker);
        debug!(tracker, %operation, "live operation settled");
        true
    }
}

/// Apply one cycle of declared commands to `table`.
///
/// An empty command list hands `table` back untouched.
pub fn reconcile<A, T>(transport: &T, router: &Router<A>, commands: Vec<Command<A>>, mut table: LiveTable) -> LiveTable
where
    A: Send + 'static,
    T: Transport,
{
    if commands.is_empty() {
        return table;
    }

    for command in commands {
        match command {
            Command::Cancel { tracker } => match table.ops.remove(&tracker) {
                Some(handle) => {
                    debug!(%tracker, operation = %handle.operation(), "cancelling live operation");
                    handle.cancel();
                }
                None => trace!(%tracker, "cancel for unknown tracker ignored"),
            },
            Command::Request(request) => {
                let tracker = request.tracker.clone();
                let Some(handle) = launch(transport, router, request) else {
                    continue;
                };
                let Some(tracker) = tracker else {
                    continue;
                };
                let operation = handle.operation();
                if let Some(previous) = table.ops.insert(tracker.clone(), handle) {
                    debug!(
                        %tracker,
                        previous = %previous.operation(),
                        %operation,
                        "tracker reused while live; previous operation left running"
                    );
                }
            }
        }
    }
    table
}
