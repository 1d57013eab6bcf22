// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The source data model: [`WorkflowSource`] and [`StepSpec`], immutable
//! once loaded and validated.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Hard ceiling on `parallelism`; values above this are coerced down.
pub const PARALLELISM_MAX: u32 = 256;

/// Sentinel accepted on the wire for "cache entries never expire".
pub const CACHE_NEVER_EXPIRE: &str = "never";

/// A pipeline parameter value: either a bare scalar default, or a
/// `{type, default, options}` dict describing a typed/enumerated
/// parameter.
///
/// Modeled as a tagged variant rather than an opaque `any`, per the
/// Design Notes: parsing a dict-shaped value into [`ParamValue::Enumerated`]
/// happens once, explicitly, in the validator (`TryParseDictParam`),
/// rather than being probed ad hoc at every use site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Scalar(ScalarValue),
    Enumerated(EnumeratedParam),
}

/// A primitive scalar parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScalarValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl std::fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScalarValue::String(s) => f.write_str(s),
            ScalarValue::Int(i) => write!(f, "{i}"),
            ScalarValue::Float(v) => write!(f, "{v}"),
            ScalarValue::Bool(b) => write!(f, "{b}"),
        }
    }
}

/// Declared type for an [`EnumeratedParam`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Int,
    Float,
    Bool,
}

/// A typed, optionally enum-constrained parameter: `{type, default, options}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumeratedParam {
    #[serde(rename = "type")]
    pub param_type: ParamType,
    pub default: ScalarValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<ScalarValue>>,
}

impl ParamValue {
    /// The value currently in effect: for a scalar, itself; for an
    /// enumerated param, its default.
    pub fn effective(&self) -> &ScalarValue {
        match self {
            ParamValue::Scalar(s) => s,
            ParamValue::Enumerated(e) => &e.default,
        }
    }

    pub fn is_enumerated(&self) -> bool {
        matches!(self, ParamValue::Enumerated(_))
    }
}

/// Artifact name sets declared by a step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArtifactSpec {
    #[serde(default)]
    pub input: BTreeSet<String>,
    #[serde(default)]
    pub output: BTreeSet<String>,
}

/// Per-step or workflow-level cache overlay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,
    /// `None` means "never expire"; otherwise seconds since creation.
    #[serde(default)]
    pub max_expired_time: Option<u64>,
    #[serde(default = "default_fs_scope")]
    pub fs_scope: String,
}

fn default_cache_enabled() -> bool {
    false
}

fn default_fs_scope() -> String {
    "/".to_string()
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { enabled: default_cache_enabled(), max_expired_time: None, fs_scope: default_fs_scope() }
    }
}

impl CacheConfig {
    /// Parse the wire form of `max_expired_time`: `"never"`, `"-1"`, empty,
    /// or a non-negative integer string.
    pub fn parse_max_expired_time(raw: &str) -> Result<Option<u64>, String> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed == CACHE_NEVER_EXPIRE || trimmed == "-1" {
            return Ok(None);
        }
        trimmed
            .parse::<u64>()
            .map(Some)
            .map_err(|_| format!("max_expired_time[{raw}] of cache not correct"))
    }

    /// Fill in workflow-level defaults for fields the step/workflow author
    /// left unset on the wire (empty string fs_scope, empty max_expired_time).
    pub fn with_defaults_applied(mut self) -> Self {
        if self.fs_scope.trim().is_empty() {
            self.fs_scope = default_fs_scope();
        }
        self
    }

    /// The comma-separated path prefixes in `fs_scope`.
    pub fn scope_paths(&self) -> Vec<&str> {
        self.fs_scope.split(',').map(str::trim).filter(|s| !s.is_empty()).collect()
    }
}

/// One node in the workflow DAG.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepSpec {
    /// Container image; inherits `WorkflowSource::docker_env` when empty.
    #[serde(default)]
    pub image: String,
    pub command: String,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    #[serde(default)]
    pub parameters: BTreeMap<String, ParamValue>,
    #[serde(default)]
    pub artifacts: ArtifactSpec,
    #[serde(default)]
    pub deps: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache: Option<CacheConfig>,
}

impl StepSpec {
    pub fn resolved_image(&self, docker_env: &str) -> String {
        if self.image.is_empty() { docker_env.to_string() } else { self.image.clone() }
    }
}

/// The immutable, submitted workflow document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowSource {
    pub name: String,
    #[serde(default)]
    pub desc: Option<String>,
    #[serde(default = "default_docker_env")]
    pub docker_env: String,
    #[serde(default = "default_parallelism")]
    pub parallelism: u32,
    pub entry_points: BTreeMap<String, StepSpec>,
    #[serde(default)]
    pub cache: CacheConfig,
}

fn default_docker_env() -> String {
    "default".to_string()
}

fn default_parallelism() -> u32 {
    1
}

impl WorkflowSource {
    /// Coerce `parallelism` into `[1, PARALLELISM_MAX]`.
    pub fn coerced_parallelism(&self) -> u32 {
        self.parallelism.clamp(1, PARALLELISM_MAX)
    }
}

#[cfg(test)]
#[path = "model_tests.rs"]
mod tests;
