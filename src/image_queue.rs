// SPDX-License-Identifier: GPL-3.0-only

//! Bounded blocking queue between image delivery and orchestration
//!
//! The only structure in the core with true producer/consumer concurrency:
//! the hardware service's image thread pushes, the orchestration task drains.
//! The queue is capacity-bounded to the image stream's buffer pool; `push`
//! blocks while full so an accepted image is never lost, and `close` wakes
//! both sides when the capture is aborted.

use crate::hardware::RawImage;
use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};
use std::time::Instant;

/// Why a blocking dequeue returned without an image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecvError {
    /// The deadline passed with no image available
    TimedOut,
    /// The queue was closed while waiting
    Closed,
}

struct QueueInner {
    items: VecDeque<RawImage>,
    capacity: usize,
    closed: bool,
}

/// Bounded, blocking, thread-safe image queue
pub struct ImageQueue {
    inner: Mutex<QueueInner>,
    not_empty: Condvar,
    not_full: Condvar,
}

impl ImageQueue {
    /// Create a queue holding at most `capacity` images
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(QueueInner {
                items: VecDeque::with_capacity(capacity),
                capacity,
                closed: false,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
        }
    }

    /// Push an image, blocking while the queue is full
    ///
    /// Returns false if the queue is (or becomes) closed, in which case the
    /// image was not accepted.
    pub fn push(&self, image: RawImage) -> bool {
        let mut inner = self.inner.lock().unwrap();
        while inner.items.len() >= inner.capacity && !inner.closed {
            inner = self.not_full.wait(inner).unwrap();
        }
        if inner.closed {
            return false;
        }
        inner.items.push_back(image);
        drop(inner);
        self.not_empty.notify_one();
        true
    }

    /// Dequeue the next image, blocking until one arrives, the deadline
    /// passes, or the queue is closed
    pub fn recv_deadline(&self, deadline: Instant) -> Result<RawImage, RecvError> {
        let mut inner = self.inner.lock().unwrap();
        loop {
            if let Some(image) = inner.items.pop_front() {
                drop(inner);
                self.not_full.notify_one();
                return Ok(image);
            }
            if inner.closed {
                return Err(RecvError::Closed);
            }
            let now = Instant::now();
            let Some(remaining) = deadline.checked_duration_since(now).filter(|d| !d.is_zero())
            else {
                return Err(RecvError::TimedOut);
            };
            let (guard, timeout) = self.not_empty.wait_timeout(inner, remaining).unwrap();
            inner = guard;
            if timeout.timed_out() && inner.items.is_empty() {
                if inner.closed {
                    return Err(RecvError::Closed);
                }
                return Err(RecvError::TimedOut);
            }
        }
    }

    /// Discard every queued image; returns how many were dropped
    pub fn drain(&self) -> usize {
        let mut inner = self.inner.lock().unwrap();
        let dropped = inner.items.len();
        inner.items.clear();
        drop(inner);
        self.not_full.notify_all();
        dropped
    }

    /// Close the queue, waking blocked producers and consumers
    pub fn close(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.closed = true;
        drop(inner);
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }

    /// Number of queued images
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().items.len()
    }

    /// True if no images are queued
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
