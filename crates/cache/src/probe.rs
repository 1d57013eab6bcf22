// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Abstraction over reading the modification state of a step's
//! `fs_scope`, so the fingerprinting logic never touches a filesystem
//! directly and tests can supply a fixed scope without a tempdir.

use crate::fingerprint::ScopeEntry;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::SystemTime;

/// Reports the current modification marker for every entry under a set of
/// scope paths.
pub trait FsScopeProbe: Send + Sync {
    fn probe(&self, scope_paths: &[&str]) -> Vec<ScopeEntry>;
}

/// Walks the real filesystem, using each regular file's modification time
/// (seconds since the epoch) as its marker.
#[derive(Debug, Default, Clone, Copy)]
pub struct WalkingFsScopeProbe;

impl FsScopeProbe for WalkingFsScopeProbe {
    fn probe(&self, scope_paths: &[&str]) -> Vec<ScopeEntry> {
        let mut entries = Vec::new();
        for root in scope_paths {
            walk(Path::new(root), &mut entries);
        }
        entries
    }
}

fn walk(path: &Path, out: &mut Vec<ScopeEntry>) {
    let Ok(metadata) = std::fs::symlink_metadata(path) else { return };
    if metadata.is_file() {
        let mtime = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(SystemTime::UNIX_EPOCH).ok())
            .map(|d| d.as_secs())
            .unwrap_or_default();
        out.push(ScopeEntry { path: path.to_string_lossy().into_owned(), marker: mtime.to_string() });
        return;
    }
    if metadata.is_dir() {
        let Ok(read_dir) = std::fs::read_dir(path) else { return };
        for entry in read_dir.flatten() {
            walk(&entry.path(), out);
        }
    }
}

/// A fixed scope for tests: a map of path -> marker, handed back
/// verbatim regardless of `scope_paths`.
#[derive(Debug, Default, Clone)]
pub struct FixedFsScopeProbe {
    pub entries: BTreeMap<String, String>,
}

impl FixedFsScopeProbe {
    pub fn new(entries: impl IntoIterator<Item = (String, String)>) -> Self {
        Self { entries: entries.into_iter().collect() }
    }
}

impl FsScopeProbe for FixedFsScopeProbe {
    fn probe(&self, _scope_paths: &[&str]) -> Vec<ScopeEntry> {
        self.entries.iter().map(|(path, marker)| ScopeEntry { path: path.clone(), marker: marker.clone() }).collect()
    }
}
