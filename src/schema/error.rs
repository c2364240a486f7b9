use std::fmt;

use serde::Serialize;
use validator::ValidationErrors;

/// One violated field constraint, e.g. `confidence_score` / `range(max=1.0, min=0.0)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    pub field: String,
    pub constraint: String,
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, constraint: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            constraint: constraint.into(),
        }
    }
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} violates {}", self.field, self.constraint)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchemaError {
    #[error("validation failed: {}", join_violations(.0))]
    Invalid(Vec<FieldViolation>),
    #[error("malformed {shape}: {detail}")]
    Malformed { shape: &'static str, detail: String },
}

impl SchemaError {
    pub fn malformed(shape: &'static str, detail: impl fmt::Display) -> Self {
        Self::Malformed {
            shape,
            detail: detail.to_string(),
        }
    }

    pub fn violations(&self) -> &[FieldViolation] {
        match self {
            Self::Invalid(violations) => violations,
            Self::Malformed { .. } => &[],
        }
    }

    /// True when any violation (or the decoder detail) names `field`.
    pub fn mentions_field(&self, field: &str) -> bool {
        match self {
            Self::Invalid(violations) => violations.iter().any(|v| v.field == field),
            Self::Malformed { detail, .. } => detail.contains(field),
        }
    }
}

pub(crate) fn collect_violations(errors: &ValidationErrors) -> Vec<FieldViolation> {
    let mut violations = Vec::new();
    for (field, field_errors) in errors.field_errors() {
        for error in field_errors.iter() {
            let mut params = error
                .params
                .iter()
                .filter(|(name, _)| name.as_ref() != "value")
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>();
            params.sort();
            let constraint = if params.is_empty() {
                error.code.to_string()
            } else {
                format!("{}({})", error.code, params.join(", "))
            };
            violations.push(FieldViolation::new(field.to_string(), constraint));
        }
    }
    violations.sort_by(|a, b| a.field.cmp(&b.field).then(a.constraint.cmp(&b.constraint)));
    violations
}

fn join_violations(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
