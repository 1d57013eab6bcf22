// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Two-tier fingerprinting: a first fingerprint over everything static
//! about a step (its resolved command, image, env, and parameters), and a
//! second fingerprint that folds in the data a rerun would actually
//! depend on — the filesystem scope's contents and upstream steps'
//! fingerprints.

use sha2::{Digest, Sha256};

/// A SHA-256 fingerprint, rendered as a lowercase hex string.
pub type Fingerprint = String;

fn hash_sorted_lines(lines: &mut Vec<String>) -> Fingerprint {
    lines.sort();
    let mut hasher = Sha256::new();
    for line in lines {
        hasher.update(line.as_bytes());
        hasher.update(b"\n");
    }
    format!("{:x}", hasher.finalize())
}

/// The structural fingerprint: the step's resolved (template-substituted)
/// command, image, and sorted `key=value` env/parameter pairs.
///
/// Two steps with identical structure produce the same first fingerprint
/// regardless of step name or position in the DAG, so a step can be
/// renamed without losing its cache history.
pub fn compute_first_fingerprint(resolved_command: &str, image: &str, env: &[(String, String)], params: &[(String, String)]) -> Fingerprint {
    let mut lines = Vec::with_capacity(env.len() + params.len() + 2);
    lines.push(format!("command={resolved_command}"));
    lines.push(format!("image={image}"));
    for (k, v) in env {
        lines.push(format!("env.{k}={v}"));
    }
    for (k, v) in params {
        lines.push(format!("param.{k}={v}"));
    }
    hash_sorted_lines(&mut lines)
}

/// Fold a step's recorded output artifacts (name, path pairs) into a single
/// fingerprint, for folding a dependency's artifacts into a downstream
/// step's second fingerprint — sorted by name, so the artifact logging
/// order never affects the result.
pub fn fingerprint_artifacts(artifacts: &[(String, String)]) -> Fingerprint {
    let mut lines: Vec<String> = artifacts.iter().map(|(name, path)| format!("{name}={path}")).collect();
    hash_sorted_lines(&mut lines)
}

/// One probed filesystem entry: its path and a modification marker
/// (mtime, content hash, or size — whatever the probe backend considers
/// authoritative for "did this change").
#[derive(Debug, Clone)]
pub struct ScopeEntry {
    pub path: String,
    pub marker: String,
}

/// The data-dependent fingerprint: folds in every entry the
/// [`FsScopeProbe`](crate::probe::FsScopeProbe) found under the step's
/// `fs_scope`, plus the first fingerprint of every upstream step this
/// step transitively depends on.
///
/// Upstream fingerprints are included by *value*, not by step name: if an
/// upstream step's output hasn't changed, this step's second fingerprint
/// doesn't change either, even if the upstream step reran.
pub fn compute_second_fingerprint(first_fingerprint: &Fingerprint, scope_entries: &[ScopeEntry], upstream_fingerprints: &[Fingerprint]) -> Fingerprint {
    let mut lines = Vec::with_capacity(scope_entries.len() + upstream_fingerprints.len() + 1);
    lines.push(format!("first={first_fingerprint}"));
    for entry in scope_entries {
        lines.push(format!("fs.{}={}", entry.path, entry.marker));
    }
    for (i, fp) in upstream_fingerprints.iter().enumerate() {
        lines.push(format!("upstream.{i}={fp}"));
    }
    hash_sorted_lines(&mut lines)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_fingerprint_is_order_independent() {
        let env_a = vec![("B".to_string(), "2".to_string()), ("A".to_string(), "1".to_string())];
        let env_b = vec![("A".to_string(), "1".to_string()), ("B".to_string(), "2".to_string())];
        let a = compute_first_fingerprint("echo hi", "img", &env_a, &[]);
        let b = compute_first_fingerprint("echo hi", "img", &env_b, &[]);
        assert_eq!(a, b);
    }

    #[test]
    fn first_fingerprint_changes_with_command() {
        let a = compute_first_fingerprint("echo hi", "img", &[], &[]);
        let b = compute_first_fingerprint("echo bye", "img", &[], &[]);
        assert_ne!(a, b);
    }

    #[test]
    fn second_fingerprint_changes_when_scope_entry_changes() {
        let first = compute_first_fingerprint("echo hi", "img", &[], &[]);
        let entries_a = vec![ScopeEntry { path: "/data/a".to_string(), marker: "v1".to_string() }];
        let entries_b = vec![ScopeEntry { path: "/data/a".to_string(), marker: "v2".to_string() }];
        let a = compute_second_fingerprint(&first, &entries_a, &[]);
        let b = compute_second_fingerprint(&first, &entries_b, &[]);
        assert_ne!(a, b);
    }

    #[test]
    fn second_fingerprint_is_stable_when_nothing_changes() {
        let first = compute_first_fingerprint("echo hi", "img", &[], &[]);
        let entries = vec![ScopeEntry { path: "/data/a".to_string(), marker: "v1".to_string() }];
        let a = compute_second_fingerprint(&first, &entries, &["up1".to_string()]);
        let b = compute_second_fingerprint(&first, &entries, &["up1".to_string()]);
        assert_eq!(a, b);
    }

    #[test]
    fn fingerprint_artifacts_is_order_independent() {
        let a = vec![("out_dir".to_string(), "/a".to_string()), ("log".to_string(), "/b".to_string())];
        let b = vec![("log".to_string(), "/b".to_string()), ("out_dir".to_string(), "/a".to_string())];
        assert_eq!(fingerprint_artifacts(&a), fingerprint_artifacts(&b));
    }

    #[test]
    fn fingerprint_artifacts_changes_with_path() {
        let a = fingerprint_artifacts(&[("out_dir".to_string(), "/a".to_string())]);
        let b = fingerprint_artifacts(&[("out_dir".to_string(), "/b".to_string())]);
        assert_ne!(a, b);
    }

    #[test]
    fn second_fingerprint_reflects_upstream_value_not_position() {
        let first = compute_first_fingerprint("echo hi", "img", &[], &[]);
        let a = compute_second_fingerprint(&first, &[], &["x".to_string(), "y".to_string()]);
        let b = compute_second_fingerprint(&first, &[], &["x".to_string(), "y".to_string()]);
        assert_eq!(a, b);
        let c = compute_second_fingerprint(&first, &[], &["y".to_string(), "x".to_string()]);
        assert_ne!(a, c, "upstream order is part of the identity of a step's inputs");
    }
}
