// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Whole-workflow validation: [`BaseWorkflow::new`] runs every check the
//! runtime depends on having already passed — identifiers, acyclicity,
//! and template references — and memoizes each step's transitive
//! dependency closure so the runtime never recomputes it.

use crate::identifier::is_valid_identifier;
use crate::template::{find_refs, TemplateRef};
use crate::topo::topological_sort;
use flowline_core::{
    is_system_param, EnumeratedParam, ParamType, ParamValue, RunContext, RunId, ScalarValue, ValidationError, WorkflowSource,
};
use std::collections::BTreeMap;

/// A [`WorkflowSource`] that has passed every structural and referential
/// check, with its topological order and per-step transitive dependency
/// closures precomputed, scoped to one run's entry restriction and
/// parameter overrides.
#[derive(Debug, Clone)]
pub struct BaseWorkflow {
    pub source: WorkflowSource,
    pub topo_order: Vec<String>,
    pub run_id: RunId,
    pub entry: Option<String>,
    pub params: BTreeMap<String, ScalarValue>,
    pub extra: RunContext,
    run_steps: BTreeMap<String, Vec<String>>,
}

impl BaseWorkflow {
    /// Validate a document with no run-level overrides: every step is in
    /// scope, no parameter is overridden, a fresh run id is minted.
    pub fn new(source: WorkflowSource) -> Result<Self, ValidationError> {
        Self::new_for_run(source, RunId::new(), None, BTreeMap::new(), RunContext::default())
    }

    /// Validate a document the way one run of it sees it: `entry`
    /// restricts execution to that step's transitive dependency closure
    /// (including itself), `params` overrides step-declared parameter
    /// defaults before templates are checked, and `extra` carries the
    /// run's identity for system parameter resolution.
    pub fn new_for_run(
        mut source: WorkflowSource,
        run_id: RunId,
        entry: Option<String>,
        params: BTreeMap<String, ScalarValue>,
        extra: RunContext,
    ) -> Result<Self, ValidationError> {
        if source.entry_points.is_empty() {
            return Err(ValidationError::EmptyWorkflow);
        }
        if !is_valid_identifier(&source.name) {
            return Err(ValidationError::InvalidIdentifier(source.name.clone()));
        }
        for name in source.entry_points.keys() {
            if !is_valid_identifier(name) {
                return Err(ValidationError::InvalidIdentifier(name.clone()));
            }
        }

        let deps: BTreeMap<String, Vec<String>> =
            source.entry_points.iter().map(|(name, step)| (name.clone(), step.deps.clone())).collect();
        let full_topo_order = topological_sort(&deps)?;
        let full_run_steps = build_run_steps(&full_topo_order, &deps);

        if let Some(entry_name) = &entry {
            if !source.entry_points.contains_key(entry_name) {
                return Err(ValidationError::UnknownEntry(entry_name.clone()));
            }
        }

        apply_param_overrides(&mut source, &full_topo_order, &params)?;

        let topo_order = match &entry {
            Some(entry_name) => compute_entry_steps(entry_name, &full_topo_order, &full_run_steps),
            None => full_topo_order,
        };
        let run_steps = build_run_steps(&topo_order, &deps);
        validate_templates(&source, &topo_order, &run_steps)?;

        Ok(Self { source, topo_order, run_id, entry, params, extra, run_steps })
    }

    /// The transitive closure of dependencies a step needs to have run
    /// before it can start, in topological order, not including the step
    /// itself.
    pub fn run_steps(&self, step: &str) -> &[String] {
        self.run_steps.get(step).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn direct_deps(&self, step: &str) -> &[String] {
        self.source.entry_points.get(step).map(|s| s.deps.as_slice()).unwrap_or(&[])
    }
}

/// Recursively (but iteratively, walking the already-acyclic topo order)
/// compute each step's full upstream closure, memoizing as we go so a
/// step with many shared ancestors isn't re-walked per descendant.
fn build_run_steps(topo_order: &[String], deps: &BTreeMap<String, Vec<String>>) -> BTreeMap<String, Vec<String>> {
    let mut memo: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for name in topo_order {
        let mut closure: Vec<String> = Vec::new();
        let mut seen = std::collections::BTreeSet::new();
        for dep in deps.get(name).into_iter().flatten() {
            if seen.insert(dep.clone()) {
                closure.push(dep.clone());
            }
            for ancestor in memo.get(dep).into_iter().flatten() {
                if seen.insert(ancestor.clone()) {
                    closure.push(ancestor.clone());
                }
            }
        }
        closure.sort_by_key(|n| topo_order.iter().position(|x| x == n).unwrap_or(usize::MAX));
        memo.insert(name.clone(), closure);
    }
    memo
}

/// Restrict execution to `entry`'s transitive dependency closure
/// (including `entry` itself), preserving the full workflow's topo
/// order.
fn compute_entry_steps(entry: &str, full_topo_order: &[String], full_run_steps: &BTreeMap<String, Vec<String>>) -> Vec<String> {
    let mut in_scope: std::collections::BTreeSet<&str> = full_run_steps.get(entry).into_iter().flatten().map(String::as_str).collect();
    in_scope.insert(entry);
    full_topo_order.iter().filter(|name| in_scope.contains(name.as_str())).cloned().collect()
}

/// Apply every run-level parameter override to `source` before templates
/// are checked, so a rejected override (unknown step, unknown parameter,
/// bad type, out-of-options value) surfaces as a validation error rather
/// than silently keeping the step's declared default.
///
/// A qualified key (`step.param`) targets exactly that step. An
/// unqualified key scans every step in topological order and overrides
/// the first one declaring that parameter — deterministic, unlike the
/// original's raw map iteration.
fn apply_param_overrides(source: &mut WorkflowSource, topo_order: &[String], overrides: &BTreeMap<String, ScalarValue>) -> Result<(), ValidationError> {
    for (key, value) in overrides {
        match key.split_once('.') {
            Some((step_name, param_name)) => override_qualified(source, step_name, param_name, value)?,
            None => override_unqualified(source, topo_order, key, value)?,
        }
    }
    Ok(())
}

fn override_qualified(source: &mut WorkflowSource, step_name: &str, param_name: &str, value: &ScalarValue) -> Result<(), ValidationError> {
    let step = source
        .entry_points
        .get(step_name)
        .ok_or_else(|| ValidationError::UnknownOverrideStep { step: step_name.to_string() })?;
    let current = step
        .parameters
        .get(param_name)
        .ok_or_else(|| ValidationError::UndefinedParam { step: step_name.to_string(), param: param_name.to_string() })?;
    let replaced = apply_override_value(step_name, param_name, current, value)?;
    source.entry_points.get_mut(step_name).unwrap().parameters.insert(param_name.to_string(), replaced);
    Ok(())
}

fn override_unqualified(source: &mut WorkflowSource, topo_order: &[String], param_name: &str, value: &ScalarValue) -> Result<(), ValidationError> {
    for step_name in topo_order {
        let Some(current) = source.entry_points[step_name].parameters.get(param_name) else { continue };
        let replaced = apply_override_value(step_name, param_name, current, value)?;
        source.entry_points.get_mut(step_name).unwrap().parameters.insert(param_name.to_string(), replaced);
        return Ok(());
    }
    Err(ValidationError::UnknownParameter { param: param_name.to_string() })
}

fn apply_override_value(step_name: &str, param_name: &str, current: &ParamValue, value: &ScalarValue) -> Result<ParamValue, ValidationError> {
    match current {
        ParamValue::Scalar(_) => Ok(ParamValue::Scalar(value.clone())),
        ParamValue::Enumerated(e) => {
            if !scalar_type_matches(e.param_type, value) {
                return Err(ValidationError::InvalidParamOverride {
                    step: step_name.to_string(),
                    param: param_name.to_string(),
                    reason: format!("expects a {:?} value", e.param_type),
                });
            }
            if let Some(options) = &e.options {
                if !options.contains(value) {
                    return Err(ValidationError::InvalidParamOverride {
                        step: step_name.to_string(),
                        param: param_name.to_string(),
                        reason: "value is not one of the declared options".to_string(),
                    });
                }
            }
            Ok(ParamValue::Enumerated(EnumeratedParam { param_type: e.param_type, default: value.clone(), options: e.options.clone() }))
        }
    }
}

fn scalar_type_matches(param_type: ParamType, value: &ScalarValue) -> bool {
    matches!(
        (param_type, value),
        (ParamType::String, ScalarValue::String(_))
            | (ParamType::Int, ScalarValue::Int(_))
            | (ParamType::Float, ScalarValue::Float(_))
            | (ParamType::Bool, ScalarValue::Bool(_))
    )
}

/// Check every `{{...}}` reference in every step's command, env values,
/// parameter values, and artifact names resolves to a real parameter,
/// upstream artifact/parameter, or system parameter.
///
/// An unqualified reference (`{{name}}`) is resolved by searching, in
/// order: the system parameter set, the step's own parameters, then each
/// direct dependency's outputs and parameters in topological order. The
/// first match wins — this mirrors the ambiguity the original templating
/// carries, made deterministic by fixing the search order to the topo
/// sort rather than raw map iteration.
fn validate_templates(
    source: &WorkflowSource,
    topo_order: &[String],
    run_steps: &BTreeMap<String, Vec<String>>,
) -> Result<(), ValidationError> {
    for step_name in topo_order {
        let step = &source.entry_points[step_name];
        let direct_deps = &step.deps;
        let sorted_deps: Vec<&String> = topo_order.iter().filter(|d| direct_deps.contains(d)).collect();

        for reference in find_refs(&step.command) {
            resolve_one(source, step_name, &reference, &sorted_deps, run_steps)?;
        }
        for value in step.env.values() {
            for reference in find_refs(value) {
                resolve_one(source, step_name, &reference, &sorted_deps, run_steps)?;
            }
        }
        for param in step.parameters.values() {
            if let ScalarValue::String(raw) = param.effective() {
                for reference in find_refs(raw) {
                    resolve_one(source, step_name, &reference, &sorted_deps, run_steps)?;
                }
            }
        }
        for artifact_name in step.artifacts.input.iter().chain(step.artifacts.output.iter()) {
            for reference in find_refs(artifact_name) {
                resolve_one(source, step_name, &reference, &sorted_deps, run_steps)?;
            }
        }
    }
    Ok(())
}

fn resolve_one(
    source: &WorkflowSource,
    step_name: &str,
    reference: &TemplateRef,
    sorted_direct_deps: &[&String],
    run_steps: &BTreeMap<String, Vec<String>>,
) -> Result<(), ValidationError> {
    let step = &source.entry_points[step_name];

    if let Some(qualifier) = &reference.qualifier {
        if !run_steps.get(step_name).map(|deps| deps.iter().any(|d| d == qualifier)).unwrap_or(false) {
            return Err(ValidationError::UndefinedDependency { step: step_name.to_string(), dep: qualifier.clone() });
        }
        let dep_step = source.entry_points.get(qualifier).ok_or_else(|| ValidationError::UndefinedDependency {
            step: step_name.to_string(),
            dep: qualifier.clone(),
        })?;
        if dep_step.artifacts.output.contains(&reference.name) || dep_step.parameters.contains_key(&reference.name) {
            return Ok(());
        }
        return Err(ValidationError::UnresolvedTemplate { step: step_name.to_string(), reference: reference.raw.clone() });
    }

    if is_system_param(&reference.name) {
        return Ok(());
    }

    if step.parameters.contains_key(&reference.name) {
        return Ok(());
    }
    for dep_name in sorted_direct_deps {
        let dep_step = &source.entry_points[*dep_name];
        if dep_step.artifacts.output.contains(&reference.name) || dep_step.parameters.contains_key(&reference.name) {
            return Ok(());
        }
    }

    Err(ValidationError::UnresolvedTemplate { step: step_name.to_string(), reference: reference.raw.clone() })
}

#[cfg(test)]
#[path = "validate_tests.rs"]
mod tests;
