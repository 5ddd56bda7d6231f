use super::*;

fn run(json: &str) -> ScenarioReport {
    let mut scenario = parse_scenario(json).unwrap();
    scenario.options.parallel = false;
    run_scenario(&scenario).unwrap()
}

const APPLY: &str = r#"{
    "declarations": [{
        "name": "apply",
        "typeParams": [{ "name": "T" }, { "name": "R" }],
        "params": [{ "name": "x", "type": "T" }, { "name": "f", "type": "(T) -> R" }],
        "returns": "R"
    }],
    "calls": [{
        "label": "apply-it",
        "call": {
            "name": "apply",
            "args": [{ "int": 5 }],
            "lambda": { "body": [{ "binary": { "op": "+", "lhs": { "name": "it" }, "rhs": { "int": 1 } } }] }
        }
    }]
}"#;

#[test]
fn test_lambda_call_reports_inferred_type_arguments() {
    let report = run(APPLY);
    assert_eq!(report.calls.len(), 1);
    let call = &report.calls[0];
    assert_eq!(call.label, "apply-it");
    assert_eq!(call.outcome, "resolved");
    let resolved = call.resolved.as_ref().unwrap();
    assert_eq!(resolved.signature, "apply(x: T, f: (T) -> R): R");
    assert_eq!(resolved.result_type, "Int");
    assert_eq!(resolved.applicability, CandidateApplicability::Resolved);
    let arguments: Vec<(&str, &str)> = resolved
        .type_arguments
        .iter()
        .map(|arg| (arg.parameter.as_str(), arg.ty.as_str()))
        .collect();
    assert_eq!(arguments, vec![("T", "Int"), ("R", "Int")]);
    assert!(call.candidates.is_empty());
    assert!(!call.diagnostics.iter().any(Diagnostic::is_error));
    assert!(!report.has_errors());
}

#[test]
fn test_identical_overloads_are_ambiguous() {
    let report = run(
        r#"{
            "declarations": [
                { "name": "foo", "params": [{ "name": "x", "type": "Int" }] },
                { "name": "foo", "params": [{ "name": "y", "type": "Int" }] }
            ],
            "calls": [{ "call": { "name": "foo", "args": [{ "int": 1 }] } }]
        }"#,
    );
    let call = &report.calls[0];
    assert_eq!(call.label, "#1 foo");
    assert_eq!(call.outcome, "ambiguous");
    assert!(call.resolved.is_none());
    let signatures: Vec<&str> = call.candidates.iter().map(|c| c.signature.as_str()).collect();
    assert_eq!(signatures, vec!["foo(x: Int): Unit", "foo(y: Int): Unit"]);
    assert_eq!(call.diagnostics.len(), 1);
    assert!(report.has_errors());
}

#[test]
fn test_safe_call_on_nullable_receiver() {
    let report = run(
        r#"{
            "declarations": [{ "name": "len", "receiver": "String", "returns": "Int" }],
            "calls": [{ "call": { "name": "len", "receiver": { "typed": "String?" }, "safe": true } }]
        }"#,
    );
    let resolved = report.calls[0].resolved.as_ref().unwrap();
    assert_eq!(resolved.signature, "String.len(): Int");
    assert_eq!(resolved.result_type, "Int?");
}

#[test]
fn test_unresolved_and_cancelled_calls() {
    let report = run(
        r#"{
            "declarations": [{ "name": "foo" }],
            "calls": [
                { "call": { "name": "nothing" } },
                { "cancelled": true, "call": { "name": "foo" } }
            ]
        }"#,
    );
    assert_eq!(report.calls[0].outcome, "inapplicable");
    assert_eq!(
        report.calls[0].diagnostics[0].message_text,
        "Unresolved reference: nothing."
    );
    assert_eq!(report.calls[1].outcome, "cancelled");
    assert!(report.calls[1].diagnostics.is_empty());
    assert!(report.has_errors());
}

#[test]
fn test_local_level_shadows_outer_level() {
    let report = run(
        r#"{
            "declarations": [
                { "name": "pick", "label": "outer", "params": [{ "name": "x", "type": "Int" }], "returns": "String" },
                { "name": "pick", "label": "inner", "params": [{ "name": "x", "type": "Any" }], "returns": "Boolean" }
            ],
            "calls": [{
                "levels": [
                    { "local": true, "declarations": ["inner"] },
                    { "declarations": ["outer"] }
                ],
                "call": { "name": "pick", "args": [{ "int": 1 }] }
            }]
        }"#,
    );
    let resolved = report.calls[0].resolved.as_ref().unwrap();
    assert_eq!(resolved.result_type, "Boolean");
}

#[test]
fn test_move_check_reports_broken_usage() {
    let report = run(
        r#"{
            "containers": [
                { "kind": "package", "name": "p" },
                { "kind": "package", "name": "q" },
                { "kind": "function", "name": "userBody", "parent": "p", "owner": "user" }
            ],
            "declarations": [
                { "name": "helper", "container": "p", "visibility": "private" },
                { "name": "user", "container": "p" }
            ],
            "moveCheck": {
                "declarations": ["helper"],
                "target": "q",
                "references": [{ "site": "userBody", "target": "helper" }]
            }
        }"#,
    );
    assert!(report.calls.is_empty());
    assert_eq!(report.move_conflicts.len(), 1);
    assert_eq!(
        report.move_conflicts[0].message_text,
        "Function 'user' uses function 'helper' which will be inaccessible after move."
    );
    assert!(report.has_errors());
}

#[test]
fn test_bad_scenarios_fail_with_context() {
    let mut scenario = parse_scenario(
        r#"{ "calls": [{ "levels": [{ "declarations": ["missing"] }], "call": { "name": "f" } }] }"#,
    )
    .unwrap();
    scenario.options.parallel = false;
    let error = run_scenario(&scenario).unwrap_err();
    let message = format!("{error:#}");
    assert!(message.contains("call #1 (f)"), "{message}");
    assert!(message.contains("unknown declaration 'missing'"), "{message}");

    let bad_op = parse_scenario(
        r#"{ "calls": [{ "call": { "name": "f", "args": [{ "binary": { "op": "**", "lhs": { "int": 1 }, "rhs": { "int": 2 } } }] } }] }"#,
    )
    .unwrap();
    assert!(run_scenario(&bad_op).is_err());
}
