//! Error, validation and warning types shared by every module.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::ids::{ExemptionId, TaxTarget};

/// Errors returned by the engine. A failing item in a bulk call is reported
/// per item; the batch itself continues.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum EngineError {
    /// Non-positive quantity or price, out-of-range values, ceilings exceeded.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A referenced product, customer, rate or group is absent from the snapshot.
    #[error("{kind} {id} not found")]
    NotFound { kind: EntityKind, id: String },

    /// Snapshot validation failed. Carries every problem found, not just the first.
    #[error("validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),

    /// Inconsistent engine configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// JSON decoding error.
    #[error("JSON error: {0}")]
    Json(String),
}

impl EngineError {
    pub fn not_found(kind: EntityKind, id: impl std::fmt::Display) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    /// Coarse classification, used in bulk responses.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) | Self::Validation(_) => ErrorKind::InvalidInput,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Config(_) | Self::Json(_) => ErrorKind::Config,
        }
    }
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Kind of entity a [`EngineError::NotFound`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Product,
    Customer,
    TaxRate,
    TaxGroup,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Product => "product",
            Self::Customer => "customer",
            Self::TaxRate => "tax rate",
            Self::TaxGroup => "tax group",
        })
    }
}

/// Serializable error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidInput,
    NotFound,
    Config,
}

/// A single validation error with field path and message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    /// Dot-separated path to the invalid field (e.g. "rules[2].adjustment_value").
    pub field: String,
    /// Human-readable error description.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Non-fatal conditions attached to a calculation result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CalculationWarning {
    /// More than one exemption matched a target; resolved to the one most
    /// favorable to the payer.
    AmbiguousExemption {
        target: TaxTarget,
        exemption_ids: Vec<ExemptionId>,
        chosen: ExemptionId,
    },
    /// No jurisdiction matched the location; tax defaults to zero.
    NoJurisdictionMatched,
}
