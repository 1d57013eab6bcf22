// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wires the engine's collaborators (job adapter, cache engine, fs probe,
//! run store) into a [`WorkflowRuntime`] from an [`EngineConfig`]. Kept
//! separate from the per-subcommand handlers so `validate` doesn't need
//! to pull in storage/job machinery it never touches.

use crate::config::EngineConfig;
use flowline_cache::{CacheEngine, InMemoryCacheStore, WalkingFsScopeProbe};
use flowline_core::SystemClock;
use flowline_engine::WorkflowRuntime;
use flowline_job::{JobAdapter, KubernetesJobAdapter};
use flowline_storage::{FileRunStore, InMemoryRunStore, RunStore};
use std::sync::Arc;

pub type Runtime = WorkflowRuntime<InMemoryCacheStore, SystemClock>;

pub async fn build_runtime(config: &EngineConfig, simulate: bool) -> anyhow::Result<(Arc<Runtime>, Arc<dyn RunStore>)> {
    let store: Arc<dyn RunStore> = match &config.state_dir {
        Some(dir) => Arc::new(FileRunStore::open_with_retries(dir, config.storage_retry_attempts)?),
        None => Arc::new(InMemoryRunStore::new()),
    };

    let adapter: Arc<dyn JobAdapter> = build_adapter(config, simulate).await?;

    let cache = Arc::new(CacheEngine::new(InMemoryCacheStore::new(), SystemClock));
    let probe = Arc::new(WalkingFsScopeProbe);
    let runtime = Arc::new(WorkflowRuntime::with_max_parallelism(adapter, cache, probe, store.clone(), SystemClock, config.max_parallelism));
    Ok((runtime, store))
}

#[cfg(not(feature = "test-support"))]
async fn build_adapter(config: &EngineConfig, simulate: bool) -> anyhow::Result<Arc<dyn JobAdapter>> {
    if simulate {
        anyhow::bail!("--simulate requires the cli's test-support feature");
    }
    let namespace = config.kube_namespace.clone().unwrap_or_else(|| "default".to_string());
    Ok(Arc::new(KubernetesJobAdapter::connect(namespace, config.watch_poll_base_ms).await?))
}

#[cfg(feature = "test-support")]
async fn build_adapter(config: &EngineConfig, simulate: bool) -> anyhow::Result<Arc<dyn JobAdapter>> {
    if simulate {
        return Ok(Arc::new(flowline_job::SimulatedJobAdapter::new()));
    }
    let namespace = config.kube_namespace.clone().unwrap_or_else(|| "default".to_string());
    Ok(Arc::new(KubernetesJobAdapter::connect(namespace, config.watch_poll_base_ms).await?))
}
