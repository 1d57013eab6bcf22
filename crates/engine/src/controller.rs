// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The step controller: one spawned task per step, driving it from
//! `Pending` through cache lookup or job submission to a terminal state
//! and reporting every transition back to the dispatcher.

use crate::events::{StepEvent, StepOutcome};
use crate::gate::AdmissionGate;
use crate::resolve::{artifact_path, resolve_command};
use flowline_cache::{compute_first_fingerprint, compute_second_fingerprint, fingerprint_artifacts, CacheEngine, CacheStore, Fingerprint, FsScopeProbe, LookupResult};
use flowline_core::{Clock, JobId, JobStatus, RunId};
use flowline_job::{JobAdapter, JobSubmission};
use flowline_storage::{ArtifactRecord, RunStore};
use flowline_validator::BaseWorkflow;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

/// Everything one step's controller task needs, bundled so
/// [`crate::runtime::WorkflowRuntime`] can spawn it without threading a
/// dozen separate arguments through.
pub struct StepRunContext<S, C> {
    pub run_id: RunId,
    pub step_name: String,
    pub job_id: JobId,
    pub adapter: Arc<dyn JobAdapter>,
    pub cache: Arc<CacheEngine<S, C>>,
    pub probe: Arc<dyn FsScopeProbe>,
    pub store: Arc<dyn RunStore>,
    pub gate: AdmissionGate,
    pub events: mpsc::Sender<StepEvent>,
    pub stop: watch::Receiver<bool>,
    /// Reattach to `job_id` via [`JobAdapter::reattach`] instead of
    /// resolving and submitting a fresh job — set for a step rehydrated
    /// across a restart whose job was still in flight.
    pub reattach: bool,
}

/// Fold each direct dependency's logged output artifacts into a single
/// fingerprint per dependency, in the same order [`resolve_command`] walks
/// them, so a step's second fingerprint changes if and only if an
/// upstream dependency's actual output changed.
async fn collect_upstream_fingerprints(store: &dyn RunStore, run_id: RunId, direct_deps: &[&String]) -> Vec<Fingerprint> {
    let mut fingerprints = Vec::with_capacity(direct_deps.len());
    for dep in direct_deps {
        let artifacts = store.list_artifacts(dep).await.unwrap_or_default();
        let pairs: Vec<(String, String)> = artifacts.into_iter().filter(|a| a.run_id == run_id).map(|a| (a.name, a.path)).collect();
        fingerprints.push(fingerprint_artifacts(&pairs));
    }
    fingerprints
}

/// Record a step's declared output artifacts at their fixed, deterministic
/// paths — called both when the step actually ran and on a cache hit, since
/// [`artifact_path`] produces the same path either way.
async fn log_output_artifacts(store: &dyn RunStore, run_id: RunId, step_name: &str, outputs: &std::collections::BTreeSet<String>, logged_at: u64) {
    for name in outputs {
        let record = ArtifactRecord { run_id, step_name: step_name.to_string(), name: name.clone(), path: artifact_path(step_name, name), logged_at };
        if let Err(e) = store.log_artifact(record).await {
            tracing::warn!(step = step_name, artifact = name.as_str(), error = %e, "failed to log output artifact");
        }
    }
}

pub async fn run_step<S, C>(workflow: Arc<BaseWorkflow>, ctx: StepRunContext<S, C>)
where
    S: CacheStore + 'static,
    C: Clock + 'static,
{
    let StepRunContext { run_id, step_name, job_id, adapter, cache, probe, store, gate, events, mut stop, reattach } = ctx;

    let step_spec = match workflow.source.entry_points.get(&step_name) {
        Some(s) => s.clone(),
        None => {
            let _ = events.send(StepEvent::Finished { step: step_name, outcome: StepOutcome::Failed("step missing from validated workflow".to_string()) }).await;
            return;
        }
    };

    if *stop.borrow() {
        let _ = events.send(StepEvent::Finished { step: step_name, outcome: StepOutcome::Cancelled }).await;
        return;
    }

    let resolved_command = match resolve_command(&workflow, &step_name, &run_id) {
        Ok(c) => c,
        Err(e) => {
            let _ = events.send(StepEvent::Finished { step: step_name, outcome: StepOutcome::Failed(e.to_string()) }).await;
            return;
        }
    };

    let image = step_spec.resolved_image(&workflow.source.docker_env);
    let env: Vec<(String, String)> = step_spec.env.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
    let params: Vec<(String, String)> = step_spec.parameters.iter().map(|(k, v)| (k.clone(), v.effective().to_string())).collect();
    let first_fingerprint = compute_first_fingerprint(&resolved_command, &image, &env, &params);

    let cache_config = step_spec.cache.clone().unwrap_or_else(|| workflow.source.cache.clone()).with_defaults_applied();
    let direct_deps: Vec<&String> = workflow.topo_order.iter().filter(|d| step_spec.deps.contains(*d)).collect();

    if !reattach && cache_config.enabled {
        let scope_paths = cache_config.scope_paths();
        let scope_entries = probe.probe(&scope_paths);
        let upstream_fingerprints = collect_upstream_fingerprints(store.as_ref(), run_id, &direct_deps).await;
        let second_fingerprint = compute_second_fingerprint(&first_fingerprint, &scope_entries, &upstream_fingerprints);

        if let LookupResult::Hit(source_job_id) = cache.lookup(&step_name, &first_fingerprint, &second_fingerprint) {
            let source_job_id = JobId::from_string(source_job_id);
            log_output_artifacts(store.as_ref(), run_id, &step_name, &step_spec.artifacts.output, cache.clock().now_epoch_secs()).await;
            let _ = events.send(StepEvent::CacheHit { step: step_name.clone(), source_job_id }).await;
            let _ = events.send(StepEvent::Finished { step: step_name, outcome: StepOutcome::Succeeded }).await;
            return;
        }
    }

    let permit = if reattach { None } else { Some(gate.acquire().await) };

    let handle = if reattach {
        adapter.reattach(job_id, &step_name)
    } else {
        let submission = JobSubmission { job_id, step_name: step_name.clone(), image, command: resolved_command, env: step_spec.env.clone() };
        match adapter.start(submission).await {
            Ok(h) => h,
            Err(e) => {
                drop(permit);
                let _ = events.send(StepEvent::Finished { step: step_name, outcome: StepOutcome::Failed(e.to_string()) }).await;
                return;
            }
        }
    };
    if !reattach {
        let _ = events.send(StepEvent::Started { step: step_name.clone(), job_id }).await;
    }

    let (status_tx, mut status_rx) = mpsc::channel(8);
    let watch_adapter = adapter.clone();
    let watch_handle = handle.clone();
    let watch_task = tokio::spawn(async move { watch_adapter.watch(&watch_handle, status_tx).await });

    let mut last_status = JobStatus::Pending;
    let mut stop_channel_open = true;
    let outcome = loop {
        tokio::select! {
            biased;
            changed = stop.changed(), if stop_channel_open => {
                match changed {
                    Ok(()) => {
                        if *stop.borrow() {
                            let _ = adapter.stop(&handle).await;
                        }
                    }
                    Err(_) => stop_channel_open = false,
                }
            }
            status = status_rx.recv() => {
                match status {
                    Some(status) => {
                        last_status = status;
                        let _ = events.send(StepEvent::StatusChanged { step: step_name.clone(), status }).await;
                        if status.is_ended() {
                            break status;
                        }
                    }
                    None => break last_status,
                }
            }
        }
    };
    let _ = watch_task.await;
    drop(permit);

    let step_outcome = match outcome {
        JobStatus::Succeeded => {
            let logged_at = cache.clock().now_epoch_secs();
            if cache_config.enabled {
                let scope_paths = cache_config.scope_paths();
                let scope_entries = probe.probe(&scope_paths);
                let upstream_fingerprints = collect_upstream_fingerprints(store.as_ref(), run_id, &direct_deps).await;
                let second_fingerprint = compute_second_fingerprint(&first_fingerprint, &scope_entries, &upstream_fingerprints);
                let entry = flowline_cache::CacheEntry {
                    id: flowline_core::CacheId::new(),
                    step_name: step_name.clone(),
                    first_fingerprint,
                    second_fingerprint,
                    source_run_id: run_id,
                    source_job_id: job_id,
                    created_at: logged_at,
                    max_expired_time: cache_config.max_expired_time,
                };
                cache.log(entry.clone());
                let _ = store.log_cache(entry).await;
            }
            log_output_artifacts(store.as_ref(), run_id, &step_name, &step_spec.artifacts.output, logged_at).await;
            StepOutcome::Succeeded
        }
        JobStatus::Terminated => StepOutcome::Cancelled,
        _ => StepOutcome::Failed(format!("job ended in unexpected status: {last_status}")),
    };

    let _ = events.send(StepEvent::Finished { step: step_name, outcome: step_outcome }).await;
}
