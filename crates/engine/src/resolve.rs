// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Turn a validated step's `{{...}}` references into the literal command
//! the job adapter will run, now that concrete parameter values and
//! upstream artifact locations are known.

use flowline_core::{is_system_param, EngineError, RunId};
use flowline_validator::{interpolate, BaseWorkflow};

/// Where a step's declared output artifact lives once produced — fixed
/// per the step/artifact name pair so a downstream step's qualified
/// reference always resolves to the same path a cache hit would have
/// produced it at.
pub fn artifact_path(step_name: &str, artifact_name: &str) -> String {
    format!("/flowline/artifacts/{step_name}/{artifact_name}")
}

/// Resolve a system parameter reference (`PF_RUN_ID`, `PF_FS_ID`,
/// `PF_FS_NAME`, `PF_STEP_NAME`, `PF_USER_NAME`) to its concrete value for
/// this run and step. Only called for names [`is_system_param`] already
/// accepted at validation time.
fn resolve_system_param(name: &str, workflow: &BaseWorkflow, run_id: &RunId, step_name: &str) -> Option<String> {
    match name {
        "PF_RUN_ID" => Some(run_id.to_string()),
        "PF_FS_ID" => Some(workflow.extra.fs_id.clone()),
        "PF_FS_NAME" => Some(workflow.extra.fs_name.clone()),
        "PF_STEP_NAME" => Some(step_name.to_string()),
        "PF_USER_NAME" => Some(workflow.extra.user_name.clone()),
        _ => None,
    }
}

/// Resolve every `{{...}}` reference in `step_name`'s command: an
/// unqualified `{{name}}` resolves against the system parameter set
/// first, then the step's own parameters, then its direct dependencies'
/// parameters/outputs in topological order; a qualified `{{dep.name}}`
/// resolves against that dependency specifically.
///
/// `run_id` is the run's actually allocated id, not necessarily
/// [`BaseWorkflow::run_id`] — validation may have run before a run id was
/// minted (e.g. `flowline validate`), so the runtime passes the id of the
/// run actually being driven.
pub fn resolve_command(workflow: &BaseWorkflow, step_name: &str, run_id: &RunId) -> Result<String, EngineError> {
    let step = workflow
        .source
        .entry_points
        .get(step_name)
        .ok_or_else(|| EngineError::Internal(format!("step[{step_name}] missing from validated workflow")))?;

    let direct_deps: Vec<&String> = workflow.topo_order.iter().filter(|d| step.deps.contains(d)).collect();

    interpolate(&step.command, |reference| {
        if let Some(qualifier) = &reference.qualifier {
            let dep_step = workflow.source.entry_points.get(qualifier)?;
            if let Some(param) = dep_step.parameters.get(&reference.name) {
                return Some(param.effective().to_string());
            }
            if dep_step.artifacts.output.contains(&reference.name) {
                return Some(artifact_path(qualifier, &reference.name));
            }
            return None;
        }

        if is_system_param(&reference.name) {
            return resolve_system_param(&reference.name, workflow, run_id, step_name);
        }

        if let Some(param) = step.parameters.get(&reference.name) {
            return Some(param.effective().to_string());
        }
        for dep_name in &direct_deps {
            let dep_step = &workflow.source.entry_points[*dep_name];
            if let Some(param) = dep_step.parameters.get(&reference.name) {
                return Some(param.effective().to_string());
            }
            if dep_step.artifacts.output.contains(&reference.name) {
                return Some(artifact_path(dep_name, &reference.name));
            }
        }
        None
    })
    .map_err(|unresolved| EngineError::Internal(format!("step[{step_name}] has unresolved reference [{unresolved}] despite passing validation")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowline_core::{ArtifactSpec, CacheConfig, ParamValue, ScalarValue, StepSpec, WorkflowSource};
    use std::collections::BTreeMap;

    fn step(command: &str, deps: &[&str]) -> StepSpec {
        StepSpec {
            image: String::new(),
            command: command.to_string(),
            env: BTreeMap::new(),
            parameters: BTreeMap::new(),
            artifacts: ArtifactSpec::default(),
            deps: deps.iter().map(|s| s.to_string()).collect(),
            cache: None,
        }
    }

    #[test]
    fn resolves_own_parameter() {
        let mut entries = BTreeMap::new();
        let mut a = step("echo {{mode}}", &[]);
        a.parameters.insert("mode".to_string(), ParamValue::Scalar(ScalarValue::String("fast".to_string())));
        entries.insert("a".to_string(), a);
        let source = WorkflowSource { name: "wf".to_string(), desc: None, docker_env: "default".to_string(), parallelism: 1, entry_points: entries, cache: CacheConfig::default() };
        let workflow = BaseWorkflow::new(source).unwrap();
        let run_id = flowline_core::RunId::new();
        assert_eq!(resolve_command(&workflow, "a", &run_id).unwrap(), "echo fast");
    }

    #[test]
    fn resolves_qualified_artifact_to_fixed_path() {
        let mut entries = BTreeMap::new();
        let mut prep = step("prep", &[]);
        prep.artifacts.output = std::collections::BTreeSet::from(["out_dir".to_string()]);
        entries.insert("prep".to_string(), prep);
        entries.insert("train".to_string(), step("train --in {{prep.out_dir}}", &["prep"]));
        let source = WorkflowSource { name: "wf".to_string(), desc: None, docker_env: "default".to_string(), parallelism: 1, entry_points: entries, cache: CacheConfig::default() };
        let workflow = BaseWorkflow::new(source).unwrap();
        let run_id = flowline_core::RunId::new();
        assert_eq!(resolve_command(&workflow, "train", &run_id).unwrap(), "train --in /flowline/artifacts/prep/out_dir");
    }

    #[test]
    fn resolves_system_parameters_to_the_runs_identity() {
        let mut entries = BTreeMap::new();
        entries.insert("a".to_string(), step("echo {{PF_RUN_ID}} {{PF_STEP_NAME}} {{PF_USER_NAME}}", &[]));
        let source = WorkflowSource { name: "wf".to_string(), desc: None, docker_env: "default".to_string(), parallelism: 1, entry_points: entries, cache: CacheConfig::default() };
        let extra = flowline_core::RunContext { user_name: "ada".to_string(), fs_id: "fs-1".to_string(), fs_name: "data".to_string() };
        let workflow = BaseWorkflow::new_for_run(source, flowline_core::RunId::new(), None, BTreeMap::new(), extra).unwrap();
        let run_id = flowline_core::RunId::new();
        assert_eq!(resolve_command(&workflow, "a", &run_id).unwrap(), format!("echo {run_id} a ada"));
    }
}
