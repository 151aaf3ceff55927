// SPDX-License-Identifier: GPL-3.0-only

//! Externally observable capture state
//!
//! Single writer (the controller/orchestrator), many readers. Presentation
//! layers subscribe through a `watch` channel and receive every published
//! transition. Errors are sticky until the next initialization attempt.

use std::path::PathBuf;
use tokio::sync::watch;

/// Observable camera state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CameraState {
    pub is_initialized: bool,
    pub is_capturing: bool,
    pub error: Option<String>,
    pub last_captured_image_path: Option<PathBuf>,
}

/// Publish-on-change store for [`CameraState`]
pub struct StateStore {
    tx: watch::Sender<CameraState>,
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StateStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(CameraState::default());
        Self { tx }
    }

    /// Subscribe to state transitions
    pub fn subscribe(&self) -> watch::Receiver<CameraState> {
        self.tx.subscribe()
    }

    /// Current state snapshot
    pub fn snapshot(&self) -> CameraState {
        self.tx.borrow().clone()
    }

    /// Apply a mutation and publish the new state
    pub fn update(&self, f: impl FnOnce(&mut CameraState)) {
        self.tx.send_modify(f);
    }

    /// Atomically claim the capturing flag
    ///
    /// Returns false if a capture is already outstanding; the check and the
    /// flag write happen under the watch channel's lock, so two concurrent
    /// claims cannot both succeed. A prior error is left in place: errors
    /// stay visible until the next initialization or capture outcome.
    pub fn begin_capture(&self) -> bool {
        let mut claimed = false;
        self.tx.send_modify(|state| {
            if !state.is_capturing {
                state.is_capturing = true;
                claimed = true;
            }
        });
        claimed
    }

    /// Release the capturing flag, recording the outcome
    pub fn end_capture(&self, error: Option<String>) {
        self.tx.send_modify(|state| {
            state.is_capturing = false;
            state.error = error;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn begin_capture_claims_once() {
        let store = StateStore::new();
        assert!(store.begin_capture());
        assert!(!store.begin_capture());
        store.end_capture(None);
        assert!(store.begin_capture());
    }

    #[test]
    fn end_capture_records_error() {
        let store = StateStore::new();
        store.begin_capture();
        store.end_capture(Some("boom".into()));
        let state = store.snapshot();
        assert!(!state.is_capturing);
        assert_eq!(state.error.as_deref(), Some("boom"));
    }

    #[test]
    fn begin_capture_preserves_prior_error() {
        let store = StateStore::new();
        store.update(|s| s.error = Some("fatal device error".into()));
        assert!(store.begin_capture());
        assert_eq!(store.snapshot().error.as_deref(), Some("fatal device error"));
    }

    #[test]
    fn subscribers_observe_updates() {
        let store = StateStore::new();
        let rx = store.subscribe();
        store.update(|s| s.is_initialized = true);
        assert!(rx.borrow().is_initialized);
    }
}
