//! Condition evaluation: a single field comparison against a trigger
//! context.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::Context;

/// Comparison applied between the resolved field value and
/// [`Condition::value`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOperator {
    /// Field value equals the comparison value.
    Equals,
    /// Field value does not equal the comparison value.
    NotEquals,
    /// Field value (as a number) is greater than the comparison value.
    GreaterThan,
    /// Field value (as a number) is less than the comparison value.
    LessThan,
    /// Field value (a string or array) contains the comparison value.
    Contains,
    /// Field value (a string) matches the comparison value as a regex.
    MatchesRegex,
    /// The field path resolves to a value at all.
    Exists,
    /// The field path does not resolve to a value.
    NotExists,
}

/// A single condition: `field <operator> value`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Dot-path into the trigger context.
    pub field: String,
    /// The comparison to apply.
    pub operator: ConditionOperator,
    /// The comparison value. Unused for `Exists`/`NotExists`.
    #[serde(default)]
    pub value: Option<Value>,
}

impl Condition {
    /// Evaluate this condition against `context`.
    ///
    /// Never panics: an invalid regex or a type mismatch (e.g. comparing
    /// a string field with `GreaterThan`) evaluates to `false` rather
    /// than erroring, since a condition is a boolean gate, not a
    /// validated pipeline stage.
    pub fn evaluate(&self, context: &Context) -> bool {
        let resolved = context.get(&self.field);

        match self.operator {
            ConditionOperator::Exists => resolved.is_some(),
            ConditionOperator::NotExists => resolved.is_none(),
            ConditionOperator::Equals => resolved == self.value.as_ref(),
            ConditionOperator::NotEquals => resolved != self.value.as_ref(),
            ConditionOperator::GreaterThan => compare_numbers(resolved, &self.value, |a, b| a > b),
            ConditionOperator::LessThan => compare_numbers(resolved, &self.value, |a, b| a < b),
            ConditionOperator::Contains => contains(resolved, &self.value),
            ConditionOperator::MatchesRegex => matches_regex(resolved, &self.value),
        }
    }
}

fn compare_numbers(resolved: Option<&Value>, expected: &Option<Value>, cmp: impl Fn(f64, f64) -> bool) -> bool {
    let (Some(a), Some(b)) = (resolved.and_then(Value::as_f64), expected.as_ref().and_then(Value::as_f64)) else {
        return false;
    };
    cmp(a, b)
}

fn contains(resolved: Option<&Value>, expected: &Option<Value>) -> bool {
    let Some(expected) = expected else { return false };
    match resolved {
        Some(Value::String(s)) => expected.as_str().map(|needle| s.contains(needle)).unwrap_or(false),
        Some(Value::Array(items)) => items.contains(expected),
        _ => false,
    }
}

/// Evaluate a regex condition. Returns `false` — never panics or
/// propagates an error — when the resolved value isn't a string or the
/// pattern fails to compile.
fn matches_regex(resolved: Option<&Value>, pattern: &Option<Value>) -> bool {
    let Some(Value::String(haystack)) = resolved else {
        return false;
    };
    let Some(pattern) = pattern.as_ref().and_then(Value::as_str) else {
        return false;
    };
    Regex::new(pattern)
        .map(|re| re.is_match(haystack))
        .unwrap_or(false)
}
