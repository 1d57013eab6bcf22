// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A recorded cache entry and the request shape used to log one.

use crate::fingerprint::Fingerprint;
use flowline_core::{CacheId, JobId, RunId};
use serde::{Deserialize, Serialize};

/// A cache entry previously logged by a successful step, available for a
/// later run to match against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub id: CacheId,
    pub step_name: String,
    pub first_fingerprint: Fingerprint,
    pub second_fingerprint: Fingerprint,
    pub source_run_id: RunId,
    pub source_job_id: JobId,
    pub created_at: u64,
    /// `None` means this entry never expires.
    pub max_expired_time: Option<u64>,
}

impl CacheEntry {
    pub fn is_expired(&self, now: u64) -> bool {
        match self.max_expired_time {
            None => false,
            Some(max_age) => now.saturating_sub(self.created_at) > max_age,
        }
    }
}

/// Request to record a newly produced cache entry, issued by the step
/// controller once a job succeeds with caching enabled.
#[derive(Debug, Clone)]
pub struct LogCacheRequest {
    pub step_name: String,
    pub first_fingerprint: Fingerprint,
    pub second_fingerprint: Fingerprint,
    pub source_run_id: RunId,
    pub source_job_id: JobId,
    pub max_expired_time: Option<u64>,
}
