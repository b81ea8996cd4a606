#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use livepolicy_core::bundle::Bundle;
use serde_json::json;

const ALLOW_ALICE_BOB: &str = r#"
{
  "revision": "1",
  "rules": {
    "policy/allow": {
      "default": false,
      "when": [
        { "if": [ { "input": "name", "in": ["alice", "bob"] } ], "then": true }
      ]
    }
  }
}
"#;

#[test]
fn membership_rule_allows_listed_subjects() {
    let b = Bundle::from_slice(ALLOW_ALICE_BOB.as_bytes()).expect("must parse");
    assert_eq!(b.revision.as_deref(), Some("1"));

    let alice = b.evaluate("/policy/allow", &json!({"name": "alice"})).unwrap();
    let amy = b.evaluate("/policy/allow", &json!({"name": "amy"})).unwrap();
    assert_eq!(alice, json!(true));
    assert_eq!(amy, json!(false));
}

#[test]
fn missing_input_falls_back_to_default() {
    let b = Bundle::from_slice(ALLOW_ALICE_BOB.as_bytes()).unwrap();
    assert_eq!(b.evaluate("policy/allow", &json!({})).unwrap(), json!(false));
}

#[test]
fn first_matching_clause_wins() {
    let doc = r#"
{
  "rules": {
    "authz/level": {
      "when": [
        { "if": [ { "input": "user.role", "equals": "admin" } ], "then": "full" },
        { "if": [ { "input": "user.role", "exists": true },
                  { "input": "user.team", "in": ["core"] } ], "then": "partial" }
      ]
    }
  }
}
"#;
    let b = Bundle::from_slice(doc.as_bytes()).unwrap();

    let admin = json!({"user": {"role": "admin", "team": "core"}});
    let dev = json!({"user": {"role": "dev", "team": "core"}});
    assert_eq!(b.evaluate("authz/level", &admin).unwrap(), json!("full"));
    assert_eq!(b.evaluate("authz/level", &dev).unwrap(), json!("partial"));

    // no default and nothing matched
    let err = b.evaluate("authz/level", &json!({"user": {"role": "dev"}})).unwrap_err();
    assert_eq!(err.client_code().as_str(), "EVAL_FAILED");
}

#[test]
fn unknown_path_is_eval_error() {
    let b = Bundle::from_slice(ALLOW_ALICE_BOB.as_bytes()).unwrap();
    let err = b.evaluate("/policy/deny", &json!({})).unwrap_err();
    assert_eq!(err.client_code().as_str(), "EVAL_FAILED");
}

#[test]
fn malformed_bundles_are_rejected() {
    let cases = [
        "not json",
        r#"{"rules": {"/": {"default": true}}}"#,
        r#"{"rules": {"p": {"when": [{"if": [], "then": true}]}}}"#,
        r#"{"rules": {"/p": {"default": true}, "p/": {"default": false}}}"#,
        r#"{"rulez": {}}"#,
    ];
    for c in cases {
        let err = Bundle::from_slice(c.as_bytes()).expect_err(c);
        assert_eq!(err.client_code().as_str(), "BAD_REQUEST", "{c}");
    }
}
