// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Topological ordering of the step DAG, with cycle detection.
//!
//! Ported from the iterative parent-removal sort: repeatedly peel off
//! steps with no remaining unresolved dependency, in deterministic
//! (sorted-name) order at each round rather than raw map iteration order,
//! so restarts and reruns see the same step order every time.

use flowline_core::ValidationError;
use std::collections::{BTreeMap, BTreeSet};

/// Topologically sort `deps` (step name -> its direct dependency names).
///
/// Returns the names in an order where every step follows all of its
/// dependencies. Errors with [`ValidationError::CycleDetected`] if no such
/// order exists, or [`ValidationError::UndefinedDependency`] if a step
/// depends on a name that isn't itself a key of `deps`.
pub fn topological_sort(deps: &BTreeMap<String, Vec<String>>) -> Result<Vec<String>, ValidationError> {
    for (step, step_deps) in deps {
        for dep in step_deps {
            if !deps.contains_key(dep) {
                return Err(ValidationError::UndefinedDependency { step: step.clone(), dep: dep.clone() });
            }
        }
    }

    let mut remaining: BTreeMap<String, BTreeSet<String>> =
        deps.iter().map(|(name, d)| (name.clone(), d.iter().cloned().collect())).collect();
    let mut order = Vec::with_capacity(deps.len());

    while !remaining.is_empty() {
        let ready: Vec<String> = remaining
            .iter()
            .filter(|(_, unresolved)| unresolved.is_empty())
            .map(|(name, _)| name.clone())
            .collect();

        if ready.is_empty() {
            return Err(ValidationError::CycleDetected);
        }

        for name in &ready {
            remaining.remove(name);
        }
        for unresolved in remaining.values_mut() {
            for name in &ready {
                unresolved.remove(name);
            }
        }
        order.extend(ready);
    }

    Ok(order)
}
