//! Bulk calculation and its wire shapes.
//!
//! Every item is evaluated independently against the same snapshot; a
//! failing item is reported in its slot and never aborts the batch. Output
//! order always equals input order. With the `parallel` feature, items are
//! spread across the rayon thread pool.

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::calculate::PricingEngine;
use super::result::CalculationResult;
use crate::core::*;

impl PricingEngine {
    /// Calculate every context, preserving order.
    pub fn calculate_bulk(
        &self,
        contexts: &[CalculationContext],
    ) -> Vec<Result<CalculationResult, EngineError>> {
        #[cfg(feature = "parallel")]
        let results: Vec<_> = contexts.par_iter().map(|ctx| self.calculate(ctx)).collect();
        #[cfg(not(feature = "parallel"))]
        let results: Vec<_> = contexts.iter().map(|ctx| self.calculate(ctx)).collect();

        debug!(
            items = results.len(),
            failed = results.iter().filter(|r| r.is_err()).count(),
            "bulk calculation complete"
        );
        results
    }
}

/// Batch of calculation contexts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkRequest {
    pub items: Vec<CalculationContext>,
}

impl BulkRequest {
    #[cfg(feature = "json")]
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        serde_json::from_str(json).map_err(|e| EngineError::Json(e.to_string()))
    }
}

/// Outcome of one bulk item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BulkItem {
    Ok {
        result: CalculationResult,
    },
    Error {
        kind: ErrorKind,
        message: String,
    },
}

impl From<Result<CalculationResult, EngineError>> for BulkItem {
    fn from(outcome: Result<CalculationResult, EngineError>) -> Self {
        match outcome {
            Ok(result) => Self::Ok { result },
            Err(err) => Self::Error {
                kind: err.kind(),
                message: err.to_string(),
            },
        }
    }
}

/// Per-item bulk outcomes, in request order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkResponse {
    pub items: Vec<BulkItem>,
}

impl BulkResponse {
    pub fn from_results(results: Vec<Result<CalculationResult, EngineError>>) -> Self {
        Self {
            items: results.into_iter().map(BulkItem::from).collect(),
        }
    }

    pub fn failed(&self) -> usize {
        self.items
            .iter()
            .filter(|item| matches!(item, BulkItem::Error { .. }))
            .count()
    }

    #[cfg(feature = "json")]
    pub fn to_json(&self) -> Result<String, EngineError> {
        serde_json::to_string(self).map_err(|e| EngineError::Json(e.to_string()))
    }
}
