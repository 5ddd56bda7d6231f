//! End-to-end runs over scenario files on disk.

use calltower_cli::reporter::Reporter;
use calltower_cli::run_file;
use std::io::Write;
use tempfile::NamedTempFile;

fn scenario_file(json: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(json.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

const RUN_AND_OVERLOADS: &str = r#"{
    "options": { "parallel": false },
    "declarations": [
        { "name": "run", "typeParams": [{ "name": "R" }], "params": [{ "name": "block", "type": "() -> R" }], "returns": "R" },
        { "name": "show", "params": [{ "name": "x", "type": "Any" }], "returns": "String" },
        { "name": "show", "params": [{ "name": "x", "type": "Int" }], "returns": "Int" }
    ],
    "calls": [
        { "label": "block", "call": { "name": "run", "lambda": { "body": [{ "int": 1 }, { "string": "s" }] } } },
        { "label": "narrow", "call": { "name": "show", "args": [{ "int": 3 }] } },
        { "label": "wide", "call": { "name": "show", "args": [{ "string": "x" }] } }
    ]
}"#;

#[test]
fn test_json_report_for_scenario_file() {
    let file = scenario_file(RUN_AND_OVERLOADS);
    let report = run_file(file.path(), |_| {}).unwrap();
    let json = serde_json::to_value(&report).unwrap();

    let calls = json["calls"].as_array().unwrap();
    assert_eq!(calls.len(), 3);
    assert_eq!(calls[0]["label"], "block");
    assert_eq!(calls[0]["resolved"]["resultType"], "String");
    assert_eq!(calls[0]["resolved"]["typeArguments"][0]["type"], "String");
    assert_eq!(calls[1]["resolved"]["signature"], "show(x: Int): Int");
    assert_eq!(calls[2]["resolved"]["signature"], "show(x: Any): String");
    assert_eq!(calls[2]["resolved"]["applicability"], "Resolved");
    assert!(json.get("moveConflicts").is_none());
    assert!(!report.has_errors());
}

#[test]
fn test_command_line_overrides_enable_dynamic_fallback() {
    let file = scenario_file(
        r#"{ "options": { "parallel": false }, "calls": [{ "call": { "name": "anything", "args": [{ "int": 1 }] } }] }"#,
    );

    let strict = run_file(file.path(), |_| {}).unwrap();
    assert_eq!(strict.calls[0].outcome, "inapplicable");

    let dynamic = run_file(file.path(), |options| options.allow_dynamic = true).unwrap();
    let resolved = dynamic.calls[0].resolved.as_ref().unwrap();
    assert_eq!(resolved.result_type, "dynamic");
}

#[test]
fn test_text_report_lists_candidates_and_diagnostics() {
    let file = scenario_file(
        r#"{
            "options": { "parallel": false },
            "declarations": [{ "name": "need", "params": [{ "name": "x", "type": "Int" }] }],
            "calls": [{ "label": "mismatch", "call": { "name": "need", "args": [{ "string": "no" }] } }]
        }"#,
    );
    let report = run_file(file.path(), |_| {}).unwrap();
    let text = Reporter::new(false).render(&report);

    assert!(text.starts_with("mismatch - "), "{text}");
    assert!(text.contains("need(x: Int): Unit"), "{text}");
    assert!(text.contains(" - error"), "{text}");
    assert!(report.has_errors());
}

#[test]
fn test_missing_file_and_malformed_json_are_errors() {
    let dir = tempfile::tempdir().unwrap();
    assert!(run_file(&dir.path().join("absent.json"), |_| {}).is_err());

    let file = scenario_file("{ not json");
    let error = run_file(file.path(), |_| {}).unwrap_err();
    assert!(format!("{error:#}").contains("invalid scenario file"));
}
