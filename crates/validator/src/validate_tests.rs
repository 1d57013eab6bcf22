use super::*;
use flowline_core::{ArtifactSpec, CacheConfig, ParamValue, ScalarValue, StepSpec};
use std::collections::{BTreeMap, BTreeSet};

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

fn source(entry_points: BTreeMap<String, StepSpec>) -> WorkflowSource {
    WorkflowSource {
        name: "demo".to_string(),
        desc: None,
        docker_env: "default".to_string(),
        parallelism: 4,
        entry_points,
        cache: CacheConfig::default(),
    }
}

#[test]
fn rejects_empty_workflow() {
    let src = source(BTreeMap::new());
    assert_eq!(BaseWorkflow::new(src).unwrap_err(), ValidationError::EmptyWorkflow);
}

#[test]
fn rejects_invalid_step_name() {
    let mut entries = BTreeMap::new();
    entries.insert("1bad".to_string(), step("echo hi", &[]));
    let src = source(entries);
    assert_eq!(BaseWorkflow::new(src).unwrap_err(), ValidationError::InvalidIdentifier("1bad".to_string()));
}

#[test]
fn computes_transitive_run_steps_for_diamond() {
    let mut entries = BTreeMap::new();
    entries.insert("a".to_string(), step("echo a", &[]));
    entries.insert("b".to_string(), step("echo b", &["a"]));
    entries.insert("c".to_string(), step("echo c", &["a"]));
    entries.insert("d".to_string(), step("echo d", &["b", "c"]));
    let wf = BaseWorkflow::new(source(entries)).unwrap();
    let mut closure = wf.run_steps("d").to_vec();
    closure.sort();
    assert_eq!(closure, vec!["a", "b", "c"]);
}

#[test]
fn resolves_qualified_artifact_reference() {
    let mut entries = BTreeMap::new();
    let mut prep = step("prep", &[]);
    prep.artifacts.output = BTreeSet::from(["out_dir".to_string()]);
    entries.insert("prep".to_string(), prep);
    entries.insert("train".to_string(), step("train --in {{prep.out_dir}}", &["prep"]));
    assert!(BaseWorkflow::new(source(entries)).is_ok());
}

#[test]
fn unresolved_qualified_reference_to_undeclared_dep_is_rejected() {
    let mut entries = BTreeMap::new();
    entries.insert("prep".to_string(), step("prep", &[]));
    entries.insert("train".to_string(), step("train {{other.out}}", &["prep"]));
    let err = BaseWorkflow::new(source(entries)).unwrap_err();
    assert_eq!(err, ValidationError::UndefinedDependency { step: "train".to_string(), dep: "other".to_string() });
}

#[test]
fn unqualified_reference_prefers_own_parameter_over_upstream() {
    let mut entries = BTreeMap::new();
    let mut prep = step("prep", &[]);
    prep.artifacts.output = BTreeSet::from(["mode".to_string()]);
    entries.insert("prep".to_string(), prep);
    let mut train = step("train --mode {{mode}}", &["prep"]);
    train.parameters.insert("mode".to_string(), ParamValue::Scalar(ScalarValue::String("fast".to_string())));
    entries.insert("train".to_string(), train);
    assert!(BaseWorkflow::new(source(entries)).is_ok());
}

#[test]
fn undefined_unqualified_reference_is_rejected() {
    let mut entries = BTreeMap::new();
    entries.insert("a".to_string(), step("echo {{ghost}}", &[]));
    let err = BaseWorkflow::new(source(entries)).unwrap_err();
    assert_eq!(err, ValidationError::UnresolvedTemplate { step: "a".to_string(), reference: "ghost".to_string() });
}

#[test]
fn parses_and_validates_a_raw_json_document() {
    let raw = r#"{
        "name": "ingest",
        "entry_points": {
            "fetch": { "command": "fetch --url {{url}}", "parameters": { "url": "https://example.test/data" } },
            "train": { "command": "train --in {{fetch.dataset}}", "deps": ["fetch"] }
        }
    }"#;
    let mut source: WorkflowSource = serde_json::from_str(raw).unwrap();
    source.entry_points.get_mut("fetch").unwrap().artifacts.output = BTreeSet::from(["dataset".to_string()]);

    let wf = BaseWorkflow::new(source).unwrap();
    assert_eq!(wf.topo_order, vec!["fetch".to_string(), "train".to_string()]);
}

#[test]
fn cycle_still_rejected_through_base_workflow() {
    let mut entries = BTreeMap::new();
    entries.insert("a".to_string(), step("echo a", &["b"]));
    entries.insert("b".to_string(), step("echo b", &["a"]));
    assert_eq!(BaseWorkflow::new(source(entries)).unwrap_err(), ValidationError::CycleDetected);
}

#[test]
fn system_parameter_reference_resolves_without_being_declared() {
    let mut entries = BTreeMap::new();
    entries.insert("a".to_string(), step("echo {{PF_RUN_ID}} {{PF_USER_NAME}}", &[]));
    assert!(BaseWorkflow::new(source(entries)).is_ok());
}

#[test]
fn entry_restricts_topo_order_to_its_dependency_closure() {
    let mut entries = BTreeMap::new();
    entries.insert("a".to_string(), step("echo a", &[]));
    entries.insert("b".to_string(), step("echo b", &["a"]));
    entries.insert("c".to_string(), step("echo c", &["b"]));
    entries.insert("unrelated".to_string(), step("echo u", &[]));
    let wf = BaseWorkflow::new_for_run(source(entries), flowline_core::RunId::new(), Some("b".to_string()), BTreeMap::new(), flowline_core::RunContext::default()).unwrap();
    assert_eq!(wf.topo_order, vec!["a".to_string(), "b".to_string()]);
}

#[test]
fn unknown_entry_is_rejected() {
    let mut entries = BTreeMap::new();
    entries.insert("a".to_string(), step("echo a", &[]));
    let err = BaseWorkflow::new_for_run(source(entries), flowline_core::RunId::new(), Some("ghost".to_string()), BTreeMap::new(), flowline_core::RunContext::default()).unwrap_err();
    assert_eq!(err, ValidationError::UnknownEntry("ghost".to_string()));
}

#[test]
fn qualified_override_replaces_a_step_parameter() {
    let mut entries = BTreeMap::new();
    let mut a = step("echo {{mode}}", &[]);
    a.parameters.insert("mode".to_string(), ParamValue::Scalar(ScalarValue::String("slow".to_string())));
    entries.insert("a".to_string(), a);
    let mut overrides = BTreeMap::new();
    overrides.insert("a.mode".to_string(), ScalarValue::String("fast".to_string()));
    let wf = BaseWorkflow::new_for_run(source(entries), flowline_core::RunId::new(), None, overrides, flowline_core::RunContext::default()).unwrap();
    assert_eq!(wf.source.entry_points["a"].parameters["mode"].effective(), &ScalarValue::String("fast".to_string()));
}

#[test]
fn qualified_override_of_unknown_step_is_rejected() {
    let mut entries = BTreeMap::new();
    entries.insert("a".to_string(), step("echo a", &[]));
    let mut overrides = BTreeMap::new();
    overrides.insert("ghost.mode".to_string(), ScalarValue::String("fast".to_string()));
    let err = BaseWorkflow::new_for_run(source(entries), flowline_core::RunId::new(), None, overrides, flowline_core::RunContext::default()).unwrap_err();
    assert_eq!(err, ValidationError::UnknownOverrideStep { step: "ghost".to_string() });
}

#[test]
fn unqualified_override_applies_to_first_step_in_topo_order_declaring_it() {
    let mut entries = BTreeMap::new();
    let mut a = step("echo a", &[]);
    a.parameters.insert("mode".to_string(), ParamValue::Scalar(ScalarValue::String("slow".to_string())));
    entries.insert("a".to_string(), a);
    let mut b = step("echo b", &["a"]);
    b.parameters.insert("mode".to_string(), ParamValue::Scalar(ScalarValue::String("slow".to_string())));
    entries.insert("b".to_string(), b);
    let mut overrides = BTreeMap::new();
    overrides.insert("mode".to_string(), ScalarValue::String("fast".to_string()));
    let wf = BaseWorkflow::new_for_run(source(entries), flowline_core::RunId::new(), None, overrides, flowline_core::RunContext::default()).unwrap();
    assert_eq!(wf.source.entry_points["a"].parameters["mode"].effective(), &ScalarValue::String("fast".to_string()));
    assert_eq!(wf.source.entry_points["b"].parameters["mode"].effective(), &ScalarValue::String("slow".to_string()));
}

#[test]
fn unqualified_override_of_undeclared_parameter_is_rejected() {
    let mut entries = BTreeMap::new();
    entries.insert("a".to_string(), step("echo a", &[]));
    let mut overrides = BTreeMap::new();
    overrides.insert("ghost".to_string(), ScalarValue::String("fast".to_string()));
    let err = BaseWorkflow::new_for_run(source(entries), flowline_core::RunId::new(), None, overrides, flowline_core::RunContext::default()).unwrap_err();
    assert_eq!(err, ValidationError::UnknownParameter { param: "ghost".to_string() });
}

#[test]
fn enumerated_override_outside_declared_options_is_rejected() {
    let mut entries = BTreeMap::new();
    let mut a = step("echo {{mode}}", &[]);
    a.parameters.insert(
        "mode".to_string(),
        ParamValue::Enumerated(flowline_core::EnumeratedParam {
            param_type: flowline_core::ParamType::String,
            default: ScalarValue::String("slow".to_string()),
            options: Some(vec![ScalarValue::String("slow".to_string()), ScalarValue::String("fast".to_string())]),
        }),
    );
    entries.insert("a".to_string(), a);
    let mut overrides = BTreeMap::new();
    overrides.insert("a.mode".to_string(), ScalarValue::String("turbo".to_string()));
    let err = BaseWorkflow::new_for_run(source(entries), flowline_core::RunId::new(), None, overrides, flowline_core::RunContext::default()).unwrap_err();
    assert!(matches!(err, ValidationError::InvalidParamOverride { .. }));
}

#[test]
fn templated_parameter_value_is_scanned_for_references() {
    let mut entries = BTreeMap::new();
    entries.insert("a".to_string(), step("echo hi", &[]));
    let mut b = step("echo {{suffix}}", &["a"]);
    b.parameters.insert("suffix".to_string(), ParamValue::Scalar(ScalarValue::String("{{ghost}}".to_string())));
    entries.insert("b".to_string(), b);
    let err = BaseWorkflow::new(source(entries)).unwrap_err();
    assert_eq!(err, ValidationError::UnresolvedTemplate { step: "b".to_string(), reference: "ghost".to_string() });
}

#[test]
fn templated_artifact_name_is_scanned_for_references() {
    let mut entries = BTreeMap::new();
    let mut a = step("echo a", &[]);
    a.artifacts.output = BTreeSet::from(["{{ghost}}".to_string()]);
    entries.insert("a".to_string(), a);
    let err = BaseWorkflow::new(source(entries)).unwrap_err();
    assert_eq!(err, ValidationError::UnresolvedTemplate { step: "a".to_string(), reference: "ghost".to_string() });
}
