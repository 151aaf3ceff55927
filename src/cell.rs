// SPDX-License-Identifier: GPL-3.0-only

//! Single-resolution result cell
//!
//! Bridges a callback-driven hardware operation to a suspended async caller:
//! the resolver half lives inside the service callback and can be fired from
//! any thread, the future half is awaited by the orchestration task. A cell
//! resolves at most once; later resolution attempts are rejected, which
//! guards against a callback delivering both a success and an error.

use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

/// Create a connected resolver/completion pair
pub fn result_cell<T>() -> (Resolver<T>, Completion<T>) {
    let (tx, rx) = oneshot::channel();
    (
        Resolver {
            tx: Arc::new(Mutex::new(Some(tx))),
        },
        Completion { rx },
    )
}

/// Resolving half of a result cell; cheap to clone into callbacks
pub struct Resolver<T> {
    tx: Arc<Mutex<Option<oneshot::Sender<T>>>>,
}

impl<T> Clone for Resolver<T> {
    fn clone(&self) -> Self {
        Self {
            tx: Arc::clone(&self.tx),
        }
    }
}

impl<T> Resolver<T> {
    /// Resolve the cell; returns false if it was already resolved or the
    /// waiter is gone
    pub fn resolve(&self, value: T) -> bool {
        match self.tx.lock().unwrap().take() {
            Some(tx) => tx.send(value).is_ok(),
            None => false,
        }
    }

    /// True while the cell has not been resolved yet
    pub fn is_active(&self) -> bool {
        self.tx.lock().unwrap().is_some()
    }
}

/// Awaitable half of a result cell
pub struct Completion<T> {
    rx: oneshot::Receiver<T>,
}

impl<T> Completion<T> {
    /// Wait for resolution; `None` if every resolver was dropped unresolved
    pub async fn wait(self) -> Option<T> {
        self.rx.await.ok()
    }
}
