use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use validator::Validate;

use crate::schema::error::{FieldViolation, SchemaError, collect_violations};

pub const MIN_REASONING_ITEMS: usize = 3;
pub const MAX_REASONING_ITEMS: usize = 5;

/// A decision request as submitted by the caller.
///
/// Instances only exist in a validated state: both the constructor and
/// deserialization run the same checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DecisionInputFields")]
pub struct DecisionInput {
    decision_type: String,
    context: String,
    constraints: Vec<String>,
    preferences: Map<String, Value>,
}

#[derive(Debug, Deserialize, Validate)]
struct DecisionInputFields {
    #[validate(length(min = 1))]
    decision_type: String,
    context: String,
    #[serde(default)]
    constraints: Option<Vec<String>>,
    #[serde(default)]
    preferences: Option<Map<String, Value>>,
}

impl TryFrom<DecisionInputFields> for DecisionInput {
    type Error = SchemaError;

    fn try_from(fields: DecisionInputFields) -> Result<Self, Self::Error> {
        let mut violations = match fields.validate() {
            Ok(()) => Vec::new(),
            Err(errors) => collect_violations(&errors),
        };
        if !fields.decision_type.is_empty() && fields.decision_type.trim().is_empty() {
            violations.push(FieldViolation::new("decision_type", "blank"));
        }
        if !violations.is_empty() {
            return Err(SchemaError::Invalid(violations));
        }

        Ok(Self {
            decision_type: fields.decision_type,
            context: fields.context,
            constraints: fields.constraints.unwrap_or_default(),
            preferences: fields.preferences.unwrap_or_default(),
        })
    }
}

impl DecisionInput {
    pub fn new(
        decision_type: impl Into<String>,
        context: impl Into<String>,
    ) -> Result<Self, SchemaError> {
        Self::try_from(DecisionInputFields {
            decision_type: decision_type.into(),
            context: context.into(),
            constraints: None,
            preferences: None,
        })
    }

    pub fn with_constraints(mut self, constraints: Vec<String>) -> Self {
        self.constraints = constraints;
        self
    }

    pub fn with_preference(mut self, key: impl Into<String>, value: Value) -> Self {
        self.preferences.insert(key.into(), value);
        self
    }

    /// Decodes and validates a JSON value, keeping shape errors and field
    /// violations apart.
    pub fn from_value(value: Value) -> Result<Self, SchemaError> {
        let fields: DecisionInputFields = serde_json::from_value(value)
            .map_err(|err| SchemaError::malformed("decision input", err))?;
        Self::try_from(fields)
    }

    pub fn decision_type(&self) -> &str {
        &self.decision_type
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn constraints(&self) -> &[String] {
        &self.constraints
    }

    pub fn preferences(&self) -> &Map<String, Value> {
        &self.preferences
    }
}

/// The recommendation returned for every decision request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DecisionOutputFields")]
pub struct DecisionOutput {
    recommendation: String,
    reasoning: Vec<String>,
    confidence_score: f64,
    alternative_option: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
struct DecisionOutputFields {
    #[validate(length(min = 1))]
    recommendation: String,
    #[validate(length(min = 3, max = 5))]
    reasoning: Vec<String>,
    #[validate(range(min = 0.0, max = 1.0))]
    confidence_score: f64,
    #[serde(default)]
    alternative_option: Option<String>,
}

impl TryFrom<DecisionOutputFields> for DecisionOutput {
    type Error = SchemaError;

    fn try_from(fields: DecisionOutputFields) -> Result<Self, Self::Error> {
        let mut violations = match fields.validate() {
            Ok(()) => Vec::new(),
            Err(errors) => collect_violations(&errors),
        };
        if !fields.recommendation.is_empty() && fields.recommendation.trim().is_empty() {
            violations.push(FieldViolation::new("recommendation", "blank"));
        }
        // NaN slips through range comparisons.
        if !fields.confidence_score.is_finite() {
            violations.push(FieldViolation::new("confidence_score", "finite"));
        }
        if !violations.is_empty() {
            return Err(SchemaError::Invalid(violations));
        }

        Ok(Self {
            recommendation: fields.recommendation,
            reasoning: fields.reasoning,
            confidence_score: fields.confidence_score,
            alternative_option: fields.alternative_option,
        })
    }
}

impl DecisionOutput {
    pub fn new(
        recommendation: impl Into<String>,
        reasoning: Vec<String>,
        confidence_score: f64,
        alternative_option: Option<String>,
    ) -> Result<Self, SchemaError> {
        Self::try_from(DecisionOutputFields {
            recommendation: recommendation.into(),
            reasoning,
            confidence_score,
            alternative_option,
        })
    }

    /// Infallible constructor for compile-time constant outputs. The
    /// constants are covered by tests, so validation is only re-checked in
    /// debug builds.
    pub(crate) fn from_constants(
        recommendation: &'static str,
        reasoning: &[&'static str],
        confidence_score: f64,
        alternative_option: Option<&'static str>,
    ) -> Self {
        let output = Self {
            recommendation: recommendation.to_string(),
            reasoning: reasoning.iter().map(|r| r.to_string()).collect(),
            confidence_score,
            alternative_option: alternative_option.map(str::to_string),
        };
        debug_assert!(
            Self::new(
                output.recommendation.clone(),
                output.reasoning.clone(),
                output.confidence_score,
                output.alternative_option.clone(),
            )
            .is_ok(),
            "constant decision output must satisfy the schema"
        );
        output
    }

    /// Builds an output from an untyped key/value mapping, as produced by a
    /// model that answered with a loose JSON object.
    pub fn from_mapping(mapping: Map<String, Value>) -> Result<Self, SchemaError> {
        let fields: DecisionOutputFields = serde_json::from_value(Value::Object(mapping))
            .map_err(|err| SchemaError::malformed("decision output", err))?;
        Self::try_from(fields)
    }

    pub fn recommendation(&self) -> &str {
        &self.recommendation
    }

    pub fn reasoning(&self) -> &[String] {
        &self.reasoning
    }

    pub fn confidence_score(&self) -> f64 {
        self.confidence_score
    }

    pub fn alternative_option(&self) -> Option<&str> {
        self.alternative_option.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRequest {
    pub decision_input: DecisionInput,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionResponse {
    pub decision_output: DecisionOutput,
}
