// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The workflow runtime: the single-writer dispatcher that owns a run's
//! step map, decides which steps are eligible to start, and persists
//! every transition through the [`RunStore`] collaborator.

use crate::controller::{run_step, StepRunContext};
use crate::events::{StepEvent, StepOutcome};
use crate::gate::AdmissionGate;
use flowline_cache::{CacheEngine, CacheStore, FsScopeProbe};
use flowline_core::{Clock, EngineError, JobId, Run, RunId, RunStatus, StepStatus};
use flowline_job::JobAdapter;
use flowline_storage::RunStore;
use flowline_validator::BaseWorkflow;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

struct ActiveRun {
    stop_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

/// Drives workflow runs to completion. One instance is shared (behind an
/// `Arc`) across every concurrent run of the same engine configuration —
/// the per-run state lives in [`flowline_core::Run`], not here.
pub struct WorkflowRuntime<S, C> {
    adapter: Arc<dyn JobAdapter>,
    cache: Arc<CacheEngine<S, C>>,
    probe: Arc<dyn FsScopeProbe>,
    store: Arc<dyn RunStore>,
    clock: C,
    max_parallelism: u32,
    active: Mutex<HashMap<RunId, ActiveRun>>,
}

impl<S, C> WorkflowRuntime<S, C>
where
    S: CacheStore + 'static,
    C: Clock + 'static,
{
    pub fn new(adapter: Arc<dyn JobAdapter>, cache: Arc<CacheEngine<S, C>>, probe: Arc<dyn FsScopeProbe>, store: Arc<dyn RunStore>, clock: C) -> Self {
        Self::with_max_parallelism(adapter, cache, probe, store, clock, flowline_core::PARALLELISM_MAX)
    }

    /// Like [`Self::new`], but caps every run's effective parallelism at
    /// `max_parallelism` regardless of what the workflow document asks
    /// for — an engine-wide ceiling layered on top of the per-workflow
    /// request.
    pub fn with_max_parallelism(adapter: Arc<dyn JobAdapter>, cache: Arc<CacheEngine<S, C>>, probe: Arc<dyn FsScopeProbe>, store: Arc<dyn RunStore>, clock: C, max_parallelism: u32) -> Self {
        Self { adapter, cache, probe, store, clock, max_parallelism: max_parallelism.clamp(1, flowline_core::PARALLELISM_MAX), active: Mutex::new(HashMap::new()) }
    }

    /// Submit a freshly validated workflow for execution and return its
    /// run id immediately; the run proceeds in the background.
    pub async fn start(self: &Arc<Self>, workflow: Arc<BaseWorkflow>) -> Result<RunId, EngineError> {
        let run_id = RunId::new();
        let run = Run::new(run_id, workflow.source.name.clone(), workflow.topo_order.iter().cloned(), self.clock.now_epoch_secs());
        self.store.update_run(&run).await.map_err(|e| EngineError::Storage(e.to_string()))?;
        tracing::info!(%run_id, workflow = %workflow.source.name, "run started");
        self.spawn_drive(workflow, run, Vec::new());
        Ok(run_id)
    }

    /// Resume a previously submitted run: steps that already ended
    /// successfully stay done; a step whose job was still in flight is
    /// reattached rather than resubmitted when the adapter supports it
    /// ([`flowline_core::StepState::job_not_ended`]); every other
    /// unfinished step is reset to `Init` and resubmitted fresh.
    pub async fn restart(self: &Arc<Self>, workflow: Arc<BaseWorkflow>, run_id: RunId) -> Result<(), EngineError> {
        if self.active.lock().contains_key(&run_id) {
            return Err(EngineError::RestartWhileRunning(run_id.to_string()));
        }
        let mut run = self.store.get_run(&run_id).await.map_err(|e| EngineError::Storage(e.to_string()))?.ok_or_else(|| EngineError::RunNotFound(run_id.to_string()))?;

        let mut reattach_steps = Vec::new();
        for (name, step) in run.steps.iter_mut() {
            if step.status.is_successful_terminal() {
                continue;
            }
            if step.job_not_ended() && self.adapter.supports_reattach() {
                reattach_steps.push(name.clone());
                continue;
            }
            step.status = StepStatus::Init;
            step.job_id = None;
        }
        run.stop_requested = false;
        run.ended_at = None;
        self.store.update_run(&run).await.map_err(|e| EngineError::Storage(e.to_string()))?;
        tracing::info!(%run_id, workflow = %workflow.source.name, reattached = reattach_steps.len(), "run restarted");
        self.spawn_drive(workflow, run, reattach_steps);
        Ok(())
    }

    /// Signal every in-flight step of `run_id` to stop. A no-op if the
    /// run isn't currently active in this process.
    pub fn stop(&self, run_id: RunId) {
        if let Some(active) = self.active.lock().get(&run_id) {
            tracing::info!(%run_id, "stop requested");
            let _ = active.stop_tx.send(true);
        }
    }

    pub async fn status(&self, run_id: RunId) -> Result<RunStatus, EngineError> {
        let run = self.store.get_run(&run_id).await.map_err(|e| EngineError::Storage(e.to_string()))?.ok_or_else(|| EngineError::RunNotFound(run_id.to_string()))?;
        Ok(run.derive_status())
    }

    fn spawn_drive(self: &Arc<Self>, workflow: Arc<BaseWorkflow>, run: Run, reattach_steps: Vec<String>) {
        let run_id = run.id;
        let (stop_tx, stop_rx) = watch::channel(false);
        let runtime = self.clone();
        let join = tokio::spawn(async move {
            runtime.clone().drive(workflow, run, stop_rx, reattach_steps).await;
            runtime.active.lock().remove(&run_id);
        });
        self.active.lock().insert(run_id, ActiveRun { stop_tx, join });
    }

    async fn drive(self: Arc<Self>, workflow: Arc<BaseWorkflow>, mut run: Run, stop_rx: watch::Receiver<bool>, reattach_steps: Vec<String>) {
        let (events_tx, mut events_rx) = mpsc::channel::<StepEvent>(64);
        let budget = workflow.source.coerced_parallelism().min(self.max_parallelism);
        let gate = AdmissionGate::new(budget.saturating_sub(reattach_steps.len() as u32));
        let mut spawned: HashMap<String, JoinHandle<()>> = HashMap::new();

        self.spawn_reattached_steps(&workflow, &run, &gate, &events_tx, &stop_rx, &mut spawned, reattach_steps);

        loop {
            if *stop_rx.borrow() {
                run.stop_requested = true;
            }
            self.launch_eligible_steps(&workflow, &mut run, &gate, &events_tx, &stop_rx, &mut spawned);
            let _ = self.store.update_run(&run).await;

            if run.is_ended() {
                break;
            }

            match events_rx.recv().await {
                Some(event) => self.apply_event(&mut run, event),
                None => break,
            }
        }

        for join in spawned.into_values() {
            let _ = join.await;
        }
        run.ended_at = Some(self.clock.now_epoch_secs());
        tracing::info!(run_id = %run.id, status = ?run.derive_status(), "run ended");
        let _ = self.store.update_run(&run).await;
    }

    /// Spawn a controller task for each step [`Self::restart`] decided to
    /// reattach rather than resubmit — bypassing the admission gate (its
    /// budget was already reduced to account for these) and using the
    /// step's already-persisted job id instead of minting a new one.
    fn spawn_reattached_steps(
        &self,
        workflow: &Arc<BaseWorkflow>,
        run: &Run,
        gate: &AdmissionGate,
        events_tx: &mpsc::Sender<StepEvent>,
        stop_rx: &watch::Receiver<bool>,
        spawned: &mut HashMap<String, JoinHandle<()>>,
        reattach_steps: Vec<String>,
    ) {
        for name in reattach_steps {
            let Some(job_id) = run.steps.get(&name).and_then(|s| s.job_id) else { continue };
            let ctx = StepRunContext {
                run_id: run.id,
                step_name: name.clone(),
                job_id,
                adapter: self.adapter.clone(),
                cache: self.cache.clone(),
                probe: self.probe.clone(),
                store: self.store.clone(),
                gate: gate.clone(),
                events: events_tx.clone(),
                stop: stop_rx.clone(),
                reattach: true,
            };
            let workflow = workflow.clone();
            let handle = tokio::spawn(run_step(workflow, ctx));
            spawned.insert(name, handle);
        }
    }

    fn launch_eligible_steps(
        &self,
        workflow: &Arc<BaseWorkflow>,
        run: &mut Run,
        gate: &AdmissionGate,
        events_tx: &mpsc::Sender<StepEvent>,
        stop_rx: &watch::Receiver<bool>,
        spawned: &mut HashMap<String, JoinHandle<()>>,
    ) {
        let step_names: Vec<String> = run.steps.keys().cloned().collect();
        for name in step_names {
            if run.steps[&name].status != StepStatus::Init {
                continue;
            }
            let deps = workflow.direct_deps(&name);
            let any_dep_unsuccessful = deps.iter().any(|d| {
                let dep_status = run.steps.get(d).map(|s| s.status);
                matches!(dep_status, Some(StepStatus::Failed) | Some(StepStatus::Cancelled) | Some(StepStatus::Terminated))
            });
            if any_dep_unsuccessful || *stop_rx.borrow() {
                run.steps.get_mut(&name).unwrap().status = StepStatus::Cancelled;
                continue;
            }
            let all_deps_done = deps.iter().all(|d| run.steps.get(d).map(|s| s.status.is_successful_terminal()).unwrap_or(false));
            if !all_deps_done {
                continue;
            }

            let job_id = JobId::new();
            let step_state = run.steps.get_mut(&name).unwrap();
            step_state.status = StepStatus::Pending;
            step_state.job_id = Some(job_id);

            let ctx = StepRunContext {
                run_id: run.id,
                step_name: name.clone(),
                job_id,
                adapter: self.adapter.clone(),
                cache: self.cache.clone(),
                probe: self.probe.clone(),
                store: self.store.clone(),
                gate: gate.clone(),
                events: events_tx.clone(),
                stop: stop_rx.clone(),
                reattach: false,
            };
            let workflow = workflow.clone();
            let handle = tokio::spawn(run_step(workflow, ctx));
            spawned.insert(name, handle);
        }
    }

    fn apply_event(&self, run: &mut Run, event: StepEvent) {
        match event {
            StepEvent::Started { step, job_id } => {
                if let Some(s) = run.steps.get_mut(&step) {
                    s.status = StepStatus::Running;
                    s.job_id = Some(job_id);
                    s.started_at = Some(self.clock.now_epoch_secs());
                }
            }
            StepEvent::CacheHit { step, .. } => {
                if let Some(s) = run.steps.get_mut(&step) {
                    s.cache_outcome = flowline_core::CacheOutcome::Hit;
                }
            }
            StepEvent::StatusChanged { step, status } => {
                if let Some(s) = run.steps.get_mut(&step) {
                    if status == flowline_core::JobStatus::Terminating {
                        s.status = StepStatus::Terminating;
                    }
                }
            }
            StepEvent::Finished { step, outcome } => {
                if let Some(s) = run.steps.get_mut(&step) {
                    s.status = match outcome {
                        StepOutcome::Succeeded => StepStatus::Succeeded,
                        StepOutcome::Failed(msg) => {
                            s.message = Some(msg);
                            StepStatus::Failed
                        }
                        StepOutcome::Cancelled => StepStatus::Cancelled,
                    };
                    s.ended_at = Some(self.clock.now_epoch_secs());
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "runtime_tests.rs"]
mod tests;
