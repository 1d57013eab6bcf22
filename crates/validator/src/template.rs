// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Template reference substitution: `{{name}}` for a workflow parameter,
//! `{{step.name}}` for another step's output artifact or parameter.

use regex::Regex;
use std::sync::LazyLock;

static TEMPLATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([a-zA-Z_][a-zA-Z0-9_-]*(?:\.[a-zA-Z_][a-zA-Z0-9_-]*)?)\s*\}\}")
        .expect("template regex is valid")
});

/// A single `{{...}}` reference as it appears in a command or parameter
/// string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateRef {
    pub raw: String,
    pub qualifier: Option<String>,
    pub name: String,
}

impl TemplateRef {
    fn parse(full: &str) -> Self {
        match full.split_once('.') {
            Some((qualifier, name)) => TemplateRef { raw: full.to_string(), qualifier: Some(qualifier.to_string()), name: name.to_string() },
            None => TemplateRef { raw: full.to_string(), qualifier: None, name: full.to_string() },
        }
    }
}

/// Every `{{...}}` reference found in `text`, in order of appearance.
pub fn find_refs(text: &str) -> Vec<TemplateRef> {
    TEMPLATE_RE.captures_iter(text).map(|c| TemplateRef::parse(&c[1])).collect()
}

/// Substitute every `{{...}}` occurrence using `resolve`, which receives
/// the raw reference text (e.g. `"prep.out_dir"`) and returns the
/// replacement, or `None` if it can't resolve it.
///
/// Returns the first unresolved reference's raw text as `Err` so the
/// caller can report which one failed.
pub fn interpolate<F>(text: &str, mut resolve: F) -> Result<String, String>
where
    F: FnMut(&TemplateRef) -> Option<String>,
{
    let mut first_error = None;
    let replaced = TEMPLATE_RE.replace_all(text, |caps: &regex::Captures| {
        let reference = TemplateRef::parse(&caps[1]);
        match resolve(&reference) {
            Some(value) => value,
            None => {
                if first_error.is_none() {
                    first_error = Some(reference.raw.clone());
                }
                String::new()
            }
        }
    });
    match first_error {
        Some(raw) => Err(raw),
        None => Ok(replaced.into_owned()),
    }
}
