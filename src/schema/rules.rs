//! Declarative validation rules.
//!
//! Rules are the serializable half of a field's validator chain: the
//! host schema document lists them per field, and each rule checks one
//! raw string cell value.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::Verdict;

/// Date formats accepted by [`Rule::Date`] when no explicit format is
/// configured, and by the header detector's cell classification.
pub const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d/%m/%Y",
    "%m/%d/%Y",
    "%d-%m-%Y",
    "%d.%m.%Y",
];

/// Try the accepted formats in order.
pub fn parse_date_any(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
}

/// All available declarative rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Rule {
    /// Value must be non-empty after trimming.
    NonEmpty,

    /// Value must parse as a number.
    Number,

    /// Value must parse as a whole number.
    Integer,

    /// Value must parse as a number greater than zero.
    Positive,

    /// Value must be "true" or "false", case-insensitive.
    Boolean,

    /// Value must parse as a date.
    Date {
        /// chrono format string; when absent, [`DATE_FORMATS`] apply.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        format: Option<String>,
    },

    /// Value must be at least this many characters.
    MinLen { length: usize },

    /// Value must be at most this many characters.
    MaxLen { length: usize },

    /// Value must match the regex pattern.
    Pattern { pattern: String },

    /// Value must contain the given substring.
    Contains { value: String },

    /// Value must equal one of the given strings.
    OneOf { values: Vec<String> },
}

impl Rule {
    /// Check this rule against a raw cell value.
    pub fn check(&self, value: &str) -> Verdict {
        let passed = match self {
            Rule::NonEmpty => !value.trim().is_empty(),
            Rule::Number => value.trim().parse::<f64>().is_ok(),
            Rule::Integer => value.trim().parse::<i64>().is_ok(),
            Rule::Positive => value.trim().parse::<f64>().is_ok_and(|n| n > 0.0),
            Rule::Boolean => {
                let v = value.trim();
                v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("false")
            }
            Rule::Date { format } => match format {
                Some(fmt) => NaiveDate::parse_from_str(value.trim(), fmt).is_ok(),
                None => parse_date_any(value).is_some(),
            },
            Rule::MinLen { length } => value.chars().count() >= *length,
            Rule::MaxLen { length } => value.chars().count() <= *length,
            Rule::Pattern { pattern } => regex::Regex::new(pattern)
                .map(|re| re.is_match(value))
                .unwrap_or(false),
            Rule::Contains { value: needle } => value.contains(needle.as_str()),
            Rule::OneOf { values } => values.iter().any(|v| v == value.trim()),
        };

        if passed {
            Verdict::ok()
        } else {
            Verdict::fail(self.default_message())
        }
    }

    /// The message reported when this rule fails and no override is set.
    pub fn default_message(&self) -> String {
        match self {
            Rule::NonEmpty => "This field is required".to_string(),
            Rule::Number => "Must be a number".to_string(),
            Rule::Integer => "Must be a whole number".to_string(),
            Rule::Positive => "Must be greater than zero".to_string(),
            Rule::Boolean => "Must be true or false".to_string(),
            Rule::Date { format } => match format {
                Some(fmt) => format!("Must be a date in format {}", fmt),
                None => "Must be a valid date".to_string(),
            },
            Rule::MinLen { length } => format!("Must be at least {} characters", length),
            Rule::MaxLen { length } => format!("Must be at most {} characters", length),
            Rule::Pattern { .. } => "Invalid format".to_string(),
            Rule::Contains { value } => format!("Must contain \"{}\"", value),
            Rule::OneOf { values } => format!("Must be one of: {}", values.join(", ")),
        }
    }

    /// Human-readable rule name, as it appears in schema documents.
    pub fn name(&self) -> &'static str {
        match self {
            Rule::NonEmpty => "non_empty",
            Rule::Number => "number",
            Rule::Integer => "integer",
            Rule::Positive => "positive",
            Rule::Boolean => "boolean",
            Rule::Date { .. } => "date",
            Rule::MinLen { .. } => "min_len",
            Rule::MaxLen { .. } => "max_len",
            Rule::Pattern { .. } => "pattern",
            Rule::Contains { .. } => "contains",
            Rule::OneOf { .. } => "one_of",
        }
    }
}

/// A rule plus an optional per-field message override.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldRule {
    #[serde(flatten)]
    pub rule: Rule,

    /// Message reported instead of the rule's default on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl FieldRule {
    pub fn new(rule: Rule) -> Self {
        Self { rule, message: None }
    }

    pub fn with_message(rule: Rule, message: impl Into<String>) -> Self {
        Self { rule, message: Some(message.into()) }
    }

    pub fn check(&self, value: &str) -> Verdict {
        let verdict = self.rule.check(value);
        match (verdict.is_valid, &self.message) {
            (false, Some(message)) => Verdict::fail(message.clone()),
            _ => verdict,
        }
    }
}

/// One-line description of every available rule, for CLI help.
pub fn rules_description() -> String {
    [
        "non_empty          Value must be non-empty after trimming",
        "number             Value must parse as a number",
        "integer            Value must parse as a whole number",
        "positive           Value must be a number greater than zero",
        "boolean            Value must be \"true\" or \"false\" (case-insensitive)",
        "date               Value must parse as a date (optional chrono `format`)",
        "min_len            Value must be at least `length` characters",
        "max_len            Value must be at most `length` characters",
        "pattern            Value must match the regex `pattern`",
        "contains           Value must contain the substring `value`",
        "one_of             Value must equal one of `values`",
        "",
        "Every rule accepts an optional `message` override reported on failure.",
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_empty() {
        assert!(Rule::NonEmpty.check("Alice").is_valid);
        assert!(!Rule::NonEmpty.check("").is_valid);
        assert!(!Rule::NonEmpty.check("   ").is_valid);
    }

    #[test]
    fn test_number_and_integer() {
        assert!(Rule::Number.check("3.5").is_valid);
        assert!(Rule::Number.check(" -5 ").is_valid);
        assert!(!Rule::Number.check("thirty").is_valid);
        assert!(!Rule::Number.check("").is_valid);

        assert!(Rule::Integer.check("42").is_valid);
        assert!(!Rule::Integer.check("3.5").is_valid);
    }

    #[test]
    fn test_positive() {
        assert!(Rule::Positive.check("0.1").is_valid);
        assert!(!Rule::Positive.check("0").is_valid);
        assert!(!Rule::Positive.check("-5").is_valid);
        assert_eq!(
            Rule::Positive.check("-5").message.unwrap(),
            "Must be greater than zero"
        );
    }

    #[test]
    fn test_boolean() {
        assert!(Rule::Boolean.check("true").is_valid);
        assert!(Rule::Boolean.check("FALSE").is_valid);
        assert!(!Rule::Boolean.check("yes").is_valid);
    }

    #[test]
    fn test_date_default_formats() {
        assert!(Rule::Date { format: None }.check("2024-03-01").is_valid);
        assert!(Rule::Date { format: None }.check("01/03/2024").is_valid);
        assert!(!Rule::Date { format: None }.check("not a date").is_valid);
    }

    #[test]
    fn test_date_explicit_format() {
        let rule = Rule::Date { format: Some("%d.%m.%Y".into()) };
        assert!(rule.check("01.03.2024").is_valid);
        assert!(!rule.check("2024-03-01").is_valid);
        assert!(rule.check("x").message.unwrap().contains("%d.%m.%Y"));
    }

    #[test]
    fn test_lengths() {
        assert!(Rule::MinLen { length: 3 }.check("abc").is_valid);
        assert!(!Rule::MinLen { length: 3 }.check("ab").is_valid);
        assert!(Rule::MaxLen { length: 3 }.check("abc").is_valid);
        assert!(!Rule::MaxLen { length: 3 }.check("abcd").is_valid);
    }

    #[test]
    fn test_pattern() {
        let rule = Rule::Pattern { pattern: "^[A-Z]{2}[0-9]+$".into() };
        assert!(rule.check("AB123").is_valid);
        assert!(!rule.check("ab123").is_valid);
    }

    #[test]
    fn test_contains_and_one_of() {
        assert!(Rule::Contains { value: "@".into() }.check("a@b.com").is_valid);
        assert!(!Rule::Contains { value: "@".into() }.check("abexample.com").is_valid);

        let rule = Rule::OneOf { values: vec!["red".into(), "blue".into()] };
        assert!(rule.check("red").is_valid);
        assert!(!rule.check("green").is_valid);
        assert!(rule.check("green").message.unwrap().contains("red, blue"));
    }

    #[test]
    fn test_message_override() {
        let rule = FieldRule::with_message(Rule::Positive, "Age must be greater than zero");
        assert_eq!(
            rule.check("-5").message.unwrap(),
            "Age must be greater than zero"
        );
        assert!(rule.check("12").is_valid);
    }

    #[test]
    fn test_rule_serde_tagging() {
        let json = r#"[
            { "type": "non_empty" },
            { "type": "positive", "message": "Age must be greater than zero" },
            { "type": "pattern", "pattern": "^T[0-9]+$" }
        ]"#;

        let rules: Vec<FieldRule> = serde_json::from_str(json).unwrap();
        assert_eq!(rules.len(), 3);
        assert_eq!(rules[0].rule, Rule::NonEmpty);
        assert_eq!(rules[1].message.as_deref(), Some("Age must be greater than zero"));

        let round = serde_json::to_string(&rules).unwrap();
        let parsed: Vec<FieldRule> = serde_json::from_str(&round).unwrap();
        assert_eq!(parsed, rules);
    }

    #[test]
    fn test_parse_date_any() {
        assert!(parse_date_any("2024-12-31").is_some());
        assert!(parse_date_any("31.12.2024").is_some());
        assert!(parse_date_any("").is_none());
        assert!(parse_date_any("tomorrow").is_none());
    }
}
