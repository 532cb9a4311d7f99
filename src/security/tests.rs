// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Framebridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Framebridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::BTreeSet;

use rstest::{fixture, rstest};
use serde_json::json;

use super::*;

fn validator_with(config: Config) -> Validator {
    Validator::new(Arc::new(config))
}

#[fixture]
fn restricted() -> Validator {
    validator_with(Config {
        allowed_origins: BTreeSet::from(["https://app.example".to_owned()]),
        ..Config::default()
    })
}

fn kind_of(result: Result<(), Rejection>) -> Option<ErrorKind> {
    result.err().map(|rejection| rejection.kind)
}

#[rstest]
#[case(None)]
#[case(Some(""))]
#[case(Some("https://evil.example"))]
fn unknown_or_missing_origin_is_denied(restricted: Validator, #[case] origin: Option<&str>) {
    let payload = json!({"action": "generateMermaid", "mermaid": "flowchart TD\nA-->B"});
    assert_eq!(kind_of(restricted.validate(origin, &payload)), Some(ErrorKind::OriginDenied));
}

#[rstest]
fn origin_check_runs_before_format_checks(restricted: Validator) {
    let payload = json!("not an object");
    assert_eq!(
        kind_of(restricted.validate(Some("https://evil.example"), &payload)),
        Some(ErrorKind::OriginDenied)
    );
}

#[rstest]
fn listed_origin_is_admitted(restricted: Validator) {
    let payload = json!({"action": "generateMermaid", "mermaid": "flowchart TD\nA-->B"});
    assert_eq!(restricted.validate(Some("https://app.example"), &payload), Ok(()));
}

#[test]
fn wildcard_admits_any_origin() {
    let validator = validator_with(Config::default());
    assert!(validator.is_origin_allowed("https://anything.example"));
}

#[rstest]
#[case(json!([1, 2]), ErrorKind::InvalidFormat)]
#[case(json!({"mermaid": "graph TD"}), ErrorKind::InvalidFormat)]
#[case(json!({"action": 7}), ErrorKind::InvalidFormat)]
#[case(json!({"action": "generateMermaid"}), ErrorKind::InvalidFormat)]
#[case(json!({"action": "generateMermaid", "mermaid": null}), ErrorKind::InvalidFormat)]
#[case(json!({"action": "generateMermaid", "mermaid": 42}), ErrorKind::InvalidFormat)]
#[case(json!({"action": "generateMermaid", "mermaid": "  \n\t"}), ErrorKind::EmptyMermaid)]
fn structural_failures_are_classified(#[case] payload: Value, #[case] expected: ErrorKind) {
    let validator = validator_with(Config::default());
    assert_eq!(kind_of(validator.validate(Some("https://a.example"), &payload)), Some(expected));
}

#[test]
fn size_limit_is_inclusive() {
    let payload = json!({"action": "generateMermaid", "mermaid": "flowchart TD\nA-->B"});
    let size = serialized_size(&payload);

    let exact = validator_with(Config { max_message_size: size, ..Config::default() });
    assert_eq!(exact.validate(Some("https://a.example"), &payload), Ok(()));

    let one_short = validator_with(Config { max_message_size: size - 1, ..Config::default() });
    assert_eq!(
        kind_of(one_short.validate(Some("https://a.example"), &payload)),
        Some(ErrorKind::SizeExceeded)
    );
}

#[test]
fn size_limit_applies_to_style_requests() {
    let payload = json!({"action": "modifyStyle", "target": "all", "styles": {"fillColor": "#fff"}});
    let validator = validator_with(Config { max_message_size: 10, ..Config::default() });
    assert_eq!(
        kind_of(validator.validate(Some("https://a.example"), &payload)),
        Some(ErrorKind::SizeExceeded)
    );
}

#[test]
fn empty_check_runs_before_size_check() {
    let payload = json!({"action": "generateMermaid", "mermaid": "   "});
    let validator = validator_with(Config { max_message_size: 1, ..Config::default() });
    assert_eq!(
        kind_of(validator.validate(Some("https://a.example"), &payload)),
        Some(ErrorKind::EmptyMermaid)
    );
}

#[rstest]
#[case("flowchart TD\nA-->B", false)]
#[case("flowchart TD\nA[connection=ok]-->B", false)]
#[case("flowchart TD\n<script>alert(1)</script>", true)]
#[case("flowchart TD\n<SCRIPT type=\"x\">\nalert(1)\n</SCRIPT>", true)]
#[case("click A \"JavaScript:alert(1)\"", true)]
#[case("A[<img src=x onerror=alert(1)>]", true)]
#[case("A[<b on click = x>]", true)]
#[case("A[<iframe src=x>]", true)]
#[case("A[<script src=//evil/x.js>]", true)]
#[case("A[describe scripting]", false)]
fn injection_scan(#[case] text: &str, #[case] expected: bool) {
    assert_eq!(contains_xss(text), expected, "text: {text:?}");
}

#[test]
fn xss_in_mermaid_is_rejected_last() {
    let validator = validator_with(Config::default());
    let payload = json!({"action": "generateMermaid", "mermaid": "<script>alert(1)</script>"});
    assert_eq!(
        kind_of(validator.validate(Some("https://a.example"), &payload)),
        Some(ErrorKind::XssDetected)
    );
}

#[test]
fn style_requests_skip_mermaid_checks() {
    let validator = validator_with(Config::default());
    let payload = json!({"action": "modifyStyle", "target": "all", "styles": {"fontColor": "javascript:"}});
    assert_eq!(validator.validate(Some("https://a.example"), &payload), Ok(()));
}

#[rstest]
#[case(json!({"action": "insertMermaid", "mermaid": "<script>alert(1)</script>"}))]
#[case(json!({"action": "importMermaid", "data": "A[x] --> B[\"javascript:alert(1)\"]"}))]
#[case(json!({"action": "importMermaid", "mermaid": "", "data": "<iframe src=x>"}))]
fn legacy_text_is_scanned_for_injection(#[case] payload: Value) {
    let validator = validator_with(Config::default());
    assert_eq!(
        kind_of(validator.validate(Some("https://a.example"), &payload)),
        Some(ErrorKind::XssDetected)
    );
}

#[test]
fn legacy_requests_without_text_pass_validation() {
    let validator = validator_with(Config::default());
    let payload = json!({"action": "insertMermaid", "mermaid": 42});
    assert_eq!(validator.validate(Some("https://a.example"), &payload), Ok(()));
}

#[test]
fn legacy_text_prefers_mermaid_then_data() {
    let pick = |value: Value| match value {
        Value::Object(map) => legacy_mermaid_text(&map).map(ToOwned::to_owned),
        _ => None,
    };
    assert_eq!(pick(json!({"mermaid": "a", "data": "b"})), Some("a".to_owned()));
    assert_eq!(pick(json!({"mermaid": "", "data": "b"})), Some("b".to_owned()));
    assert_eq!(pick(json!({"mermaid": null, "data": 0})), None);
}
