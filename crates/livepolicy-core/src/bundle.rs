//! Rule bundle document and evaluator.
//!
//! A bundle maps decision paths (`policy/allow`) to rules. A rule yields the
//! `then` value of its first clause whose conditions all hold, otherwise its
//! `default`. Bundles are immutable once parsed; engines swap whole bundles.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use crate::error::{LivePolicyError, Result};

/// A parsed, validated rule bundle.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Bundle {
    #[serde(default)]
    pub revision: Option<String>,
    #[serde(default)]
    rules: BTreeMap<String, Rule>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Rule {
    #[serde(default)]
    pub default: Option<Value>,
    #[serde(default)]
    pub when: Vec<Clause>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Clause {
    #[serde(rename = "if")]
    pub conditions: Vec<Condition>,
    pub then: Value,
}

/// One test against a value in the input document.
#[derive(Debug, Clone, Deserialize)]
pub struct Condition {
    /// Dot-separated path into the input document.
    pub input: String,
    #[serde(flatten)]
    pub test: Test,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Test {
    In(Vec<Value>),
    Equals(Value),
    Exists(bool),
}

impl Bundle {
    /// Parse and validate a JSON bundle document.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let raw: Bundle = serde_json::from_slice(bytes)
            .map_err(|e| LivePolicyError::BadRequest(format!("invalid bundle: {e}")))?;

        let mut rules = BTreeMap::new();
        for (path, rule) in raw.rules {
            let key = normalize_path(&path);
            if key.is_empty() {
                return Err(LivePolicyError::BadRequest("bundle rule path must not be empty".into()));
            }
            if let Some(i) = rule.when.iter().position(|c| c.conditions.is_empty()) {
                return Err(LivePolicyError::BadRequest(format!(
                    "rule {key}: clause {i} has no conditions"
                )));
            }
            if rules.insert(key.to_string(), rule).is_some() {
                return Err(LivePolicyError::BadRequest(format!("rule {key} defined twice")));
            }
        }

        Ok(Self {
            revision: raw.revision,
            rules,
        })
    }

    /// Decision paths defined by this bundle.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }

    /// Evaluate the rule at `path` against `input`.
    pub fn evaluate(&self, path: &str, input: &Value) -> Result<Value> {
        let key = normalize_path(path);
        let rule = self
            .rules
            .get(key)
            .ok_or_else(|| LivePolicyError::Eval(format!("no rule defined at {path}")))?;

        rule.evaluate(input)
            .ok_or_else(|| LivePolicyError::Eval(format!("decision at {path} is undefined")))
    }
}

impl Rule {
    fn evaluate(&self, input: &Value) -> Option<Value> {
        self.when
            .iter()
            .find(|clause| clause.conditions.iter().all(|c| c.matches(input)))
            .map(|clause| clause.then.clone())
            .or_else(|| self.default.clone())
    }
}

impl Condition {
    fn matches(&self, input: &Value) -> bool {
        let found = lookup(input, &self.input);
        match &self.test {
            Test::In(values) => found.map_or(false, |v| values.contains(v)),
            Test::Equals(expected) => found == Some(expected),
            Test::Exists(want) => found.is_some() == *want,
        }
    }
}

fn normalize_path(path: &str) -> &str {
    path.trim_matches('/')
}

fn lookup<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(doc);
    }
    path.split('.').try_fold(doc, |cur, seg| match cur {
        Value::Object(map) => map.get(seg),
        Value::Array(items) => seg.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}
