use super::*;
use flowline_cache::{CacheStore, FixedFsScopeProbe, InMemoryCacheStore};
use flowline_core::{ArtifactSpec, CacheConfig, FakeClock, StepSpec, WorkflowSource};
use flowline_job::{ScriptedOutcome, SimulatedJobAdapter};
use flowline_storage::{InMemoryRunStore, RunStore};
use std::collections::BTreeMap;
use std::time::Duration;

fn step(command: &str, deps: &[&str]) -> StepSpec {
    StepSpec { image: "img".to_string(), command: command.to_string(), env: BTreeMap::new(), parameters: BTreeMap::new(), artifacts: ArtifactSpec::default(), deps: deps.iter().map(|s| s.to_string()).collect(), cache: None }
}

fn workflow(entries: BTreeMap<String, StepSpec>) -> Arc<BaseWorkflow> {
    let source = WorkflowSource { name: "wf".to_string(), desc: None, docker_env: "default".to_string(), parallelism: 4, entry_points: entries, cache: CacheConfig::default() };
    Arc::new(BaseWorkflow::new(source).unwrap())
}

fn new_runtime(adapter: Arc<SimulatedJobAdapter>) -> (Arc<WorkflowRuntime<InMemoryCacheStore, FakeClock>>, Arc<InMemoryRunStore>) {
    let store = Arc::new(InMemoryRunStore::new());
    let cache = Arc::new(CacheEngine::new(InMemoryCacheStore::new(), FakeClock::new(0)));
    let probe = Arc::new(FixedFsScopeProbe::default());
    let runtime = Arc::new(WorkflowRuntime::new(adapter, cache, probe, store.clone(), FakeClock::new(0)));
    (runtime, store)
}

async fn wait_for_end(store: &InMemoryRunStore, run_id: RunId) -> Run {
    for _ in 0..200 {
        if let Some(run) = store.get_run(&run_id).await.unwrap() {
            if run.is_ended() {
                return run;
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("run did not end in time");
}

#[tokio::test]
async fn linear_pipeline_runs_to_success() {
    let mut entries = BTreeMap::new();
    entries.insert("a".to_string(), step("a", &[]));
    entries.insert("b".to_string(), step("b", &["a"]));
    entries.insert("c".to_string(), step("c", &["b"]));
    let wf = workflow(entries);

    let adapter = Arc::new(SimulatedJobAdapter::new());
    let (runtime, store) = new_runtime(adapter);
    let run_id = runtime.start(wf).await.unwrap();

    let run = wait_for_end(&store, run_id).await;
    assert_eq!(run.derive_status(), RunStatus::Succeeded);
}

#[tokio::test]
async fn diamond_runs_fanout_before_join() {
    let mut entries = BTreeMap::new();
    entries.insert("a".to_string(), step("a", &[]));
    entries.insert("b".to_string(), step("b", &["a"]));
    entries.insert("c".to_string(), step("c", &["a"]));
    entries.insert("d".to_string(), step("d", &["b", "c"]));
    let wf = workflow(entries);

    let adapter = Arc::new(SimulatedJobAdapter::new());
    let (runtime, store) = new_runtime(adapter);
    let run_id = runtime.start(wf).await.unwrap();

    let run = wait_for_end(&store, run_id).await;
    assert_eq!(run.derive_status(), RunStatus::Succeeded);
    for name in ["a", "b", "c", "d"] {
        assert_eq!(run.steps[name].status, StepStatus::Succeeded, "step {name} should have succeeded");
    }
}

#[tokio::test]
async fn failed_step_cancels_downstream_and_fails_run() {
    let mut entries = BTreeMap::new();
    entries.insert("a".to_string(), step("a", &[]));
    entries.insert("b".to_string(), step("b", &["a"]));
    let wf = workflow(entries);

    let adapter = Arc::new(SimulatedJobAdapter::new());
    adapter.script("a", ScriptedOutcome::fails_after(Duration::from_millis(1)));
    let (runtime, store) = new_runtime(adapter);
    let run_id = runtime.start(wf).await.unwrap();

    let run = wait_for_end(&store, run_id).await;
    assert_eq!(run.derive_status(), RunStatus::Failed);
    assert_eq!(run.steps["b"].status, StepStatus::Cancelled);
}

#[tokio::test]
async fn stop_during_running_terminates_the_run() {
    let mut entries = BTreeMap::new();
    entries.insert("a".to_string(), step("a", &[]));
    entries.insert("b".to_string(), step("b", &["a"]));
    let wf = workflow(entries);

    let adapter = Arc::new(SimulatedJobAdapter::new());
    adapter.script("a", ScriptedOutcome::succeeds_after(Duration::from_millis(100)));
    let (runtime, store) = new_runtime(adapter);
    let run_id = runtime.start(wf).await.unwrap();

    tokio::time::sleep(Duration::from_millis(20)).await;
    runtime.stop(run_id);

    let run = wait_for_end(&store, run_id).await;
    assert_eq!(run.derive_status(), RunStatus::Terminated);
}

#[tokio::test]
async fn restart_resubmits_only_unfinished_steps() {
    let mut entries = BTreeMap::new();
    entries.insert("a".to_string(), step("a", &[]));
    entries.insert("b".to_string(), step("b", &["a"]));
    let wf = workflow(entries);

    let adapter = Arc::new(SimulatedJobAdapter::new());
    adapter.script("b", ScriptedOutcome::fails_after(Duration::from_millis(1)));
    let (runtime, store) = new_runtime(adapter);
    let run_id = runtime.start(wf.clone()).await.unwrap();
    let first = wait_for_end(&store, run_id).await;
    assert_eq!(first.derive_status(), RunStatus::Failed);
    assert_eq!(first.steps["a"].status, StepStatus::Succeeded);

    let a_job_id_before = first.steps["a"].job_id;

    let adapter2 = Arc::new(SimulatedJobAdapter::new());
    let (runtime2, store2) = new_runtime(adapter2);
    store2.update_run(&first).await.unwrap();
    runtime2.restart(wf, run_id).await.unwrap();

    let second = wait_for_end(&store2, run_id).await;
    assert_eq!(second.derive_status(), RunStatus::Succeeded);
    assert_eq!(second.steps["a"].job_id, a_job_id_before, "already-succeeded step should not be resubmitted");
}

#[tokio::test]
async fn restart_reattaches_an_in_flight_step_instead_of_resubmitting() {
    let mut entries = BTreeMap::new();
    entries.insert("a".to_string(), step("a", &[]));
    let wf = workflow(entries);

    let run_id = RunId::new();
    let mut run = Run::new(run_id, "wf", ["a".to_string()], 0);
    let stuck_job_id = flowline_core::JobId::new();
    run.steps.get_mut("a").unwrap().status = StepStatus::Running;
    run.steps.get_mut("a").unwrap().job_id = Some(stuck_job_id);

    let adapter = Arc::new(SimulatedJobAdapter::new());
    adapter.enable_reattach();
    adapter.script("a", ScriptedOutcome::succeeds_after(Duration::from_millis(1)));
    let (runtime, store) = new_runtime(adapter);
    store.update_run(&run).await.unwrap();

    runtime.restart(wf, run_id).await.unwrap();
    let ended = wait_for_end(&store, run_id).await;

    assert_eq!(ended.derive_status(), RunStatus::Succeeded);
    assert_eq!(ended.steps["a"].job_id, Some(stuck_job_id), "reattached step keeps its original job id");
}

#[tokio::test]
async fn cache_hit_short_circuits_a_step() {
    let mut entries = BTreeMap::new();
    entries.insert("a".to_string(), step("a", &[]));
    let mut source_entries = entries.clone();
    source_entries.get_mut("a").unwrap().cache = Some(CacheConfig { enabled: true, max_expired_time: None, fs_scope: "/data".to_string() });
    let wf = workflow(source_entries);

    let adapter = Arc::new(SimulatedJobAdapter::new());
    let cache_store = InMemoryCacheStore::new();
    let first = flowline_cache::compute_first_fingerprint("a", "img", &[], &[]);
    let second = flowline_cache::compute_second_fingerprint(&first, &[], &[]);
    cache_store.add(flowline_cache::CacheEntry {
        id: flowline_core::CacheId::new(),
        step_name: "a".to_string(),
        first_fingerprint: first,
        second_fingerprint: second,
        source_run_id: RunId::new(),
        source_job_id: flowline_core::JobId::new(),
        created_at: 0,
        max_expired_time: None,
    });

    let store = Arc::new(InMemoryRunStore::new());
    let cache = Arc::new(CacheEngine::new(cache_store, FakeClock::new(0)));
    let probe = Arc::new(FixedFsScopeProbe::default());
    let runtime = Arc::new(WorkflowRuntime::new(adapter.clone(), cache, probe, store.clone(), FakeClock::new(0)));

    let run_id = runtime.start(wf).await.unwrap();
    let run = wait_for_end(&store, run_id).await;
    assert_eq!(run.derive_status(), RunStatus::Succeeded);
    assert_eq!(run.steps["a"].cache_outcome, flowline_core::CacheOutcome::Hit);
}
