// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cache lookup: given a step's current fingerprints, find the newest
//! non-expired entry that matches both.

use crate::entry::CacheEntry;
use crate::store::CacheStore;
use flowline_core::Clock;

/// Outcome of a cache lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupResult {
    /// A usable entry was found; the step can skip execution.
    Hit(String),
    /// Entries exist for this step, but none match both fingerprints, or
    /// the ones that match have expired.
    Miss,
}

pub struct CacheEngine<S, C> {
    store: S,
    clock: C,
}

impl<S: CacheStore, C: Clock> CacheEngine<S, C> {
    pub fn new(store: S, clock: C) -> Self {
        Self { store, clock }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Look up a cache hit for `step_name` given its two fingerprints.
    /// Among matching, non-expired entries, the one created most recently
    /// wins; ties break by lexicographic cache id so the outcome never
    /// depends on store iteration order.
    pub fn lookup(&self, step_name: &str, first_fingerprint: &str, second_fingerprint: &str) -> LookupResult {
        let now = self.clock.now_epoch_secs();
        let best = self
            .store
            .list_for_step(step_name)
            .into_iter()
            .filter(|e| e.first_fingerprint == first_fingerprint && e.second_fingerprint == second_fingerprint)
            .filter(|e| !e.is_expired(now))
            .max_by_key(|e| (e.created_at, e.id.as_str().to_string()));

        match best {
            Some(entry) => {
                tracing::debug!(step_name, job_id = %entry.source_job_id, "cache hit");
                LookupResult::Hit(entry.source_job_id.to_string())
            }
            None => {
                tracing::debug!(step_name, "cache miss");
                LookupResult::Miss
            }
        }
    }

    pub fn log(&self, entry: CacheEntry) {
        tracing::debug!(step_name = %entry.step_name, cache_id = %entry.id, "cache entry logged");
        self.store.add(entry);
    }
}
