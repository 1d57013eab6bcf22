// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Source validation: identifier grammar, template reference resolution,
//! topological ordering, and the [`BaseWorkflow`] wrapper that bundles
//! all three for the runtime.

pub mod identifier;
pub mod template;
pub mod topo;
pub mod validate;

pub use identifier::is_valid_identifier;
pub use template::{find_refs, interpolate, TemplateRef};
pub use topo::topological_sort;
pub use validate::BaseWorkflow;
