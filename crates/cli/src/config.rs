// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine configuration: a plain struct built once from CLI flags and
//! environment, then threaded through command construction — no global
//! singleton.

use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Where persisted run/cache state lives. `None` keeps everything
    /// in memory for the lifetime of this process.
    pub state_dir: Option<PathBuf>,
    /// Kubernetes namespace jobs are submitted into. `None` runs steps
    /// through the in-process simulator instead of a real backend.
    pub kube_namespace: Option<String>,
    /// Hard ceiling on concurrent steps, applied on top of whatever a
    /// workflow document requests via its own `parallelism` field.
    pub max_parallelism: u32,
    /// Base interval, in milliseconds, between Kubernetes Job status
    /// polls; the adapter adds jitter on top of this.
    pub watch_poll_base_ms: u64,
    /// How many times a file store write retries on a transient I/O
    /// error before giving up.
    pub storage_retry_attempts: u32,
}

impl EngineConfig {
    pub fn new(state_dir: Option<PathBuf>, kube_namespace: Option<String>) -> Self {
        Self {
            state_dir,
            kube_namespace,
            max_parallelism: env_or("FLOWLINE_MAX_PARALLELISM", flowline_core::PARALLELISM_MAX),
            watch_poll_base_ms: env_or("FLOWLINE_K8S_POLL_MS", 1_000),
            storage_retry_attempts: env_or("FLOWLINE_STORAGE_RETRY_ATTEMPTS", 3),
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}
