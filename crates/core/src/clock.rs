// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clock abstraction for testable time handling.
//!
//! The cache engine's expiry check (`now - created_at <= max_expired_time`)
//! and the step controller's elapsed-time bookkeeping both need a notion of
//! "now" that a test can pin down; threading a concrete clock through
//! rather than calling `SystemTime::now()` directly keeps expiry tests
//! deterministic.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// A clock that provides the current time, in whole seconds since the
/// epoch (the unit the cache engine's expiry math is specified in).
pub trait Clock: Clone + Send + Sync + 'static {
    fn now_epoch_secs(&self) -> u64;
}

/// Real system clock.
#[derive(Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_epoch_secs(&self) -> u64 {
        SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
    }
}

/// Fake clock for testing with controllable time.
#[derive(Clone)]
pub struct FakeClock {
    epoch_secs: Arc<Mutex<u64>>,
}

impl FakeClock {
    pub fn new(start_epoch_secs: u64) -> Self {
        Self { epoch_secs: Arc::new(Mutex::new(start_epoch_secs)) }
    }

    pub fn advance(&self, secs: u64) {
        *self.epoch_secs.lock() += secs;
    }

    pub fn set(&self, epoch_secs: u64) {
        *self.epoch_secs.lock() = epoch_secs;
    }
}

impl Clock for FakeClock {
    fn now_epoch_secs(&self) -> u64 {
        *self.epoch_secs.lock()
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
