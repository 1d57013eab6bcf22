// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The cache storage collaborator: a small trait so the lookup engine
//! doesn't care whether entries live in memory or behind the run store's
//! persistence layer.

use crate::entry::CacheEntry;
use flowline_core::CacheId;
use parking_lot::RwLock;
use std::collections::BTreeMap;

pub trait CacheStore: Send + Sync {
    fn add(&self, entry: CacheEntry);
    fn list_for_step(&self, step_name: &str) -> Vec<CacheEntry>;
    fn delete(&self, id: &CacheId);
}

/// In-memory cache store, used by the engine's default configuration and
/// by tests; a durable deployment backs this with
/// [`crate`](crate)-external persistence instead.
#[derive(Default)]
pub struct InMemoryCacheStore {
    entries: RwLock<BTreeMap<String, CacheEntry>>,
}

impl InMemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheStore for InMemoryCacheStore {
    fn add(&self, entry: CacheEntry) {
        self.entries.write().insert(entry.id.to_string(), entry);
    }

    fn list_for_step(&self, step_name: &str) -> Vec<CacheEntry> {
        self.entries.read().values().filter(|e| e.step_name == step_name).cloned().collect()
    }

    fn delete(&self, id: &CacheId) {
        self.entries.write().remove(id.as_str());
    }
}
