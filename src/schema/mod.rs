//! Host-supplied schema: target fields and their validator chains.
//!
//! The schema is the sole configuration input to the core. It arrives
//! either as a JSON document ([`SchemaConfig`], validated against an
//! embedded JSON Schema before deserialization) or built
//! programmatically with [`FieldSpec`] builders, which additionally
//! accept custom sync/async validator functions.
//!
//! # Example
//!
//! ```rust,ignore
//! use sheetload::schema::{FieldSpec, FieldType, Rule, Schema};
//!
//! let schema = Schema::new()
//!     .with_field("name", FieldSpec::new("Name", FieldType::String)
//!         .with_rule(Rule::NonEmpty))
//!     .with_field("age", FieldSpec::new("Age", FieldType::Number)
//!         .with_rule(Rule::Number)
//!         .with_rule_message(Rule::Positive, "Age must be greater than zero"));
//! ```

pub mod rules;

use futures::future::BoxFuture;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::future::ready;
use std::sync::Arc;

use crate::error::ConfigError;
use crate::models::Verdict;

pub use rules::{parse_date_any, rules_description, FieldRule, Rule, DATE_FORMATS};

// =============================================================================
// Validator Trait
// =============================================================================

/// One step of a field's validator chain.
///
/// A validator takes a raw string cell value and produces a
/// [`Verdict`]. The boxed future lets a step suspend (a lookup against
/// an external service, say); the chain awaits each step before
/// invoking the next, so fail-fast ordering is preserved either way.
pub trait Validate: Send + Sync {
    fn validate<'a>(&'a self, value: &'a str) -> BoxFuture<'a, Verdict>;
}

impl Validate for FieldRule {
    fn validate<'a>(&'a self, value: &'a str) -> BoxFuture<'a, Verdict> {
        Box::pin(ready(self.check(value)))
    }
}

/// Adapter for a synchronous custom validator function.
pub struct FnValidator<F>(pub F);

impl<F> Validate for FnValidator<F>
where
    F: Fn(&str) -> Verdict + Send + Sync,
{
    fn validate<'a>(&'a self, value: &'a str) -> BoxFuture<'a, Verdict> {
        Box::pin(ready((self.0)(value)))
    }
}

/// Adapter for an asynchronous custom validator function.
pub struct AsyncValidator<F>(pub F);

impl<F, Fut> Validate for AsyncValidator<F>
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = Verdict> + Send + 'static,
{
    fn validate<'a>(&'a self, value: &'a str) -> BoxFuture<'a, Verdict> {
        Box::pin((self.0)(value.to_string()))
    }
}

/// Run a validator chain in order, stopping at the first failure.
pub async fn run_chain(validators: &[Arc<dyn Validate>], value: &str) -> Verdict {
    for validator in validators {
        let verdict = validator.validate(value).await;
        if !verdict.is_valid {
            return verdict;
        }
    }
    Verdict::ok()
}

// =============================================================================
// Field Types
// =============================================================================

/// Declared type of a target field. Metadata for hosts (grid widgets,
/// auto-generated forms); validation is exclusively the rule chain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    #[default]
    String,
    Number,
    Date,
    Boolean,
}

// =============================================================================
// Configuration Surface
// =============================================================================

/// One field definition as it appears in the host's JSON document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldConfig {
    /// Human-readable column name.
    pub label: String,

    #[serde(rename = "type", default)]
    pub field_type: FieldType,

    /// Ordered validator chain.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<FieldRule>,

    /// Alternate header names to assist auto-mapping.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternates: Vec<String>,
}

/// The host schema document: field key → definition.
pub type SchemaConfig = BTreeMap<String, FieldConfig>;

static CONFIG_VALIDATOR: Lazy<jsonschema::Validator> = Lazy::new(|| {
    let schema: Value = serde_json::from_str(include_str!("../../schemas/schema-config.json"))
        .expect("Invalid embedded schema");
    jsonschema::draft7::new(&schema).expect("Invalid embedded schema")
});

/// Validate a host schema document against the embedded JSON Schema.
///
/// # Returns
/// * `Ok(())` if the document is well-formed
/// * `Err(Vec<String>)` with the schema violations otherwise
pub fn validate_config_document(document: &Value) -> Result<(), Vec<String>> {
    let errors: Vec<String> = CONFIG_VALIDATOR
        .iter_errors(document)
        .map(|e| e.to_string())
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

// =============================================================================
// Runtime Schema
// =============================================================================

/// A target field with its compiled validator chain.
#[derive(Clone)]
pub struct FieldSpec {
    pub label: String,
    pub field_type: FieldType,
    pub alternates: Vec<String>,
    validators: Vec<Arc<dyn Validate>>,
}

impl FieldSpec {
    pub fn new(label: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            label: label.into(),
            field_type,
            alternates: Vec::new(),
            validators: Vec::new(),
        }
    }

    /// Append a declarative rule to the chain.
    pub fn with_rule(self, rule: Rule) -> Self {
        self.with_validator(Arc::new(FieldRule::new(rule)))
    }

    /// Append a declarative rule with a message override.
    pub fn with_rule_message(self, rule: Rule, message: impl Into<String>) -> Self {
        self.with_validator(Arc::new(FieldRule::with_message(rule, message)))
    }

    /// Append a custom validator to the chain.
    pub fn with_validator(mut self, validator: Arc<dyn Validate>) -> Self {
        self.validators.push(validator);
        self
    }

    pub fn with_alternates(mut self, alternates: Vec<String>) -> Self {
        self.alternates = alternates;
        self
    }

    /// The chain, in invocation order.
    pub fn validators(&self) -> &[Arc<dyn Validate>] {
        &self.validators
    }
}

impl fmt::Debug for FieldSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSpec")
            .field("label", &self.label)
            .field("field_type", &self.field_type)
            .field("alternates", &self.alternates)
            .field("validators", &self.validators.len())
            .finish()
    }
}

/// The compiled schema: field key → [`FieldSpec`], key-ordered so every
/// derived listing (missing fields, transformed row keys) is
/// deterministic.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    fields: BTreeMap<String, FieldSpec>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field(mut self, key: impl Into<String>, spec: FieldSpec) -> Self {
        self.fields.insert(key.into(), spec);
        self
    }

    /// Compile a parsed configuration document.
    pub fn from_config(config: SchemaConfig) -> Result<Self, ConfigError> {
        if config.is_empty() {
            return Err(ConfigError::EmptySchema);
        }

        let mut fields = BTreeMap::new();
        for (key, field) in config {
            if field.label.trim().is_empty() {
                return Err(ConfigError::InvalidSchema {
                    errors: vec![format!("field '{}' has an empty label", key)],
                });
            }

            for rule in &field.rules {
                if let Rule::Pattern { pattern } = &rule.rule {
                    regex::Regex::new(pattern).map_err(|e| ConfigError::InvalidPattern {
                        field: key.clone(),
                        message: e.to_string(),
                    })?;
                }
            }

            let mut spec = FieldSpec::new(field.label, field.field_type)
                .with_alternates(field.alternates);
            for rule in field.rules {
                spec = spec.with_validator(Arc::new(rule));
            }
            fields.insert(key, spec);
        }

        Ok(Self { fields })
    }

    /// Parse and compile a host schema document.
    ///
    /// The document is checked against the embedded JSON Schema first,
    /// so a malformed configuration fails fast as a [`ConfigError`]
    /// instead of surfacing later as spurious data errors.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let document: Value = serde_json::from_str(json)?;
        validate_config_document(&document)
            .map_err(|errors| ConfigError::InvalidSchema { errors })?;
        let config: SchemaConfig = serde_json::from_value(document)?;
        Self::from_config(config)
    }

    pub fn get(&self, key: &str) -> Option<&FieldSpec> {
        self.fields.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Label for a field key, falling back to the key itself.
    pub fn label_of<'a>(&'a self, key: &'a str) -> &'a str {
        self.fields.get(key).map(|f| f.label.as_str()).unwrap_or(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.fields.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldSpec)> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Generate an example schema configuration for documentation and the
/// CLI `example-schema` command.
pub fn example_config() -> SchemaConfig {
    let mut config = SchemaConfig::new();

    config.insert(
        "name".to_string(),
        FieldConfig {
            label: "Name".to_string(),
            field_type: FieldType::String,
            rules: vec![FieldRule::with_message(Rule::NonEmpty, "Name is required")],
            alternates: vec!["full name".to_string()],
        },
    );

    config.insert(
        "age".to_string(),
        FieldConfig {
            label: "Age".to_string(),
            field_type: FieldType::Number,
            rules: vec![
                FieldRule::with_message(Rule::Number, "Age must be a number"),
                FieldRule::with_message(Rule::Positive, "Age must be greater than zero"),
            ],
            alternates: vec![],
        },
    );

    config.insert(
        "email".to_string(),
        FieldConfig {
            label: "Email".to_string(),
            field_type: FieldType::String,
            rules: vec![
                FieldRule::new(Rule::NonEmpty),
                FieldRule::with_message(Rule::Contains { value: "@".to_string() }, "Invalid email address"),
            ],
            alternates: vec!["e-mail".to_string(), "mail".to_string()],
        },
    );

    config
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example_schema() -> Schema {
        Schema::from_config(example_config()).unwrap()
    }

    #[test]
    fn test_from_config() {
        let schema = example_schema();
        assert_eq!(schema.len(), 3);
        assert_eq!(schema.label_of("age"), "Age");
        assert_eq!(schema.label_of("missing"), "missing");
        assert_eq!(schema.get("email").unwrap().validators().len(), 2);
    }

    #[test]
    fn test_from_json_round_trip() {
        let json = serde_json::to_string(&example_config()).unwrap();
        let schema = Schema::from_json(&json).unwrap();
        assert!(schema.contains_key("name"));
        assert_eq!(schema.get("email").unwrap().alternates, vec!["e-mail", "mail"]);
    }

    #[test]
    fn test_from_json_rejects_malformed_document() {
        // label is required per the embedded JSON Schema
        let result = Schema::from_json(r#"{ "name": { "type": "string" } }"#);
        assert!(matches!(result, Err(ConfigError::InvalidSchema { .. })));

        // unknown field type
        let result = Schema::from_json(r#"{ "name": { "label": "Name", "type": "uuid" } }"#);
        assert!(matches!(result, Err(ConfigError::InvalidSchema { .. })));
    }

    #[test]
    fn test_from_json_rejects_empty_document() {
        assert!(Schema::from_json("{}").is_err());
    }

    #[test]
    fn test_from_config_rejects_bad_pattern() {
        let mut config = SchemaConfig::new();
        config.insert(
            "code".to_string(),
            FieldConfig {
                label: "Code".to_string(),
                field_type: FieldType::String,
                rules: vec![FieldRule::new(Rule::Pattern { pattern: "([".to_string() })],
                alternates: vec![],
            },
        );

        assert!(matches!(
            Schema::from_config(config),
            Err(ConfigError::InvalidPattern { .. })
        ));
    }

    #[tokio::test]
    async fn test_run_chain_fail_fast() {
        let schema = example_schema();
        let chain = schema.get("email").unwrap().validators();

        // Empty value: non_empty fails first, contains("@") never runs.
        let verdict = run_chain(chain, "").await;
        assert!(!verdict.is_valid);
        assert_eq!(verdict.message.unwrap(), "This field is required");

        // Non-empty but missing '@': second validator's message.
        let verdict = run_chain(chain, "bobexample.com").await;
        assert_eq!(verdict.message.unwrap(), "Invalid email address");

        let verdict = run_chain(chain, "bob@example.com").await;
        assert!(verdict.is_valid);
    }

    #[tokio::test]
    async fn test_custom_async_validator_in_chain() {
        let spec = FieldSpec::new("Code", FieldType::String)
            .with_rule(Rule::NonEmpty)
            .with_validator(Arc::new(AsyncValidator(|value: String| async move {
                if value.starts_with('T') {
                    Verdict::ok()
                } else {
                    Verdict::fail("Must start with T")
                }
            })));

        let verdict = run_chain(spec.validators(), "X123").await;
        assert_eq!(verdict.message.unwrap(), "Must start with T");

        // Fail-fast: the async step never sees an empty value.
        let verdict = run_chain(spec.validators(), "").await;
        assert_eq!(verdict.message.unwrap(), "This field is required");
    }
}
