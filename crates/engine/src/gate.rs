// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Admission control: bounds how many steps may be `Running` at once,
//! independent of how many are merely eligible (all of their
//! dependencies have succeeded).

use std::sync::Arc;
use tokio::sync::{Semaphore, SemaphorePermit};

/// A counting semaphore sized to a workflow's `parallelism`.
#[derive(Clone)]
pub struct AdmissionGate {
    semaphore: Arc<Semaphore>,
}

impl AdmissionGate {
    pub fn new(parallelism: u32) -> Self {
        Self { semaphore: Arc::new(Semaphore::new(parallelism.max(1) as usize)) }
    }

    /// Block until a slot is free, then hold it until the returned guard
    /// drops.
    pub async fn acquire(&self) -> AdmissionPermit<'_> {
        let permit = self.semaphore.acquire().await.expect("admission semaphore is never closed");
        AdmissionPermit { _permit: permit }
    }

    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }
}

pub struct AdmissionPermit<'a> {
    _permit: SemaphorePermit<'a>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn bounds_concurrent_holders_to_parallelism() {
        let gate = AdmissionGate::new(2);
        let _a = gate.acquire().await;
        let _b = gate.acquire().await;
        assert_eq!(gate.available_permits(), 0);

        let gate2 = gate.clone();
        let waited = tokio::spawn(async move {
            let _c = gate2.acquire().await;
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waited.is_finished(), "third acquirer should still be waiting");

        drop(_a);
        waited.await.unwrap();
    }

    #[tokio::test]
    async fn zero_parallelism_is_coerced_to_one() {
        let gate = AdmissionGate::new(0);
        assert_eq!(gate.available_permits(), 1);
    }
}
