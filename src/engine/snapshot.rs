//! Immutable configuration snapshot the engine evaluates against.
//!
//! A snapshot holds the product and customer catalogs plus every pricing and
//! tax entity. It is built once (programmatically or from JSON), validated,
//! and then shared read-only by all calculations.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::validation::validate_snapshot;
use crate::core::*;
use crate::pricing::{DiscountTier, PricingRule};
use crate::tax::{TaxExemption, TaxGroup, TaxJurisdiction, TaxRate};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingSnapshot {
    /// Known products. Calculations for other products fail with `NotFound`.
    pub products: BTreeSet<ProductId>,
    /// Known customers. A context naming another customer fails with `NotFound`.
    pub customers: BTreeSet<CustomerId>,
    pub rules: Vec<PricingRule>,
    pub tiers: Vec<DiscountTier>,
    pub tax_rates: Vec<TaxRate>,
    pub tax_groups: Vec<TaxGroup>,
    pub jurisdictions: Vec<TaxJurisdiction>,
    pub exemptions: Vec<TaxExemption>,
}

impl PricingSnapshot {
    pub fn has_product(&self, id: ProductId) -> bool {
        self.products.contains(&id)
    }

    pub fn has_customer(&self, id: CustomerId) -> bool {
        self.customers.contains(&id)
    }

    pub fn tax_rate(&self, id: TaxRateId) -> Option<&TaxRate> {
        self.tax_rates.iter().find(|r| r.id == id)
    }

    pub fn tax_group(&self, id: TaxGroupId) -> Option<&TaxGroup> {
        self.tax_groups.iter().find(|g| g.id == id)
    }

    /// Validate against the default engine limits.
    pub fn validate(&self) -> Result<(), EngineError> {
        self.validate_with(&EngineConfig::default())
    }

    /// Validate against the limits of `config`.
    pub fn validate_with(&self, config: &EngineConfig) -> Result<(), EngineError> {
        let errors = validate_snapshot(self, config);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(EngineError::Validation(errors))
        }
    }

    /// Deserialize and validate a snapshot from JSON.
    #[cfg(feature = "json")]
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        let snapshot: Self =
            serde_json::from_str(json).map_err(|e| EngineError::Json(e.to_string()))?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    #[cfg(feature = "json")]
    pub fn to_json(&self) -> Result<String, EngineError> {
        serde_json::to_string_pretty(self).map_err(|e| EngineError::Json(e.to_string()))
    }
}

/// Builder for [`PricingSnapshot`].
///
/// ```
/// use tarif::*;
/// use tarif::engine::PricingSnapshotBuilder;
/// use tarif::tax::TaxRateBuilder;
/// use rust_decimal_macros::dec;
///
/// let snapshot = PricingSnapshotBuilder::new()
///     .product(ProductId(1))
///     .tax_rate(TaxRateBuilder::new(TaxRateId(1), dec!(7)).build())
///     .build()
///     .unwrap();
/// assert!(snapshot.has_product(ProductId(1)));
/// ```
#[derive(Debug, Default)]
pub struct PricingSnapshotBuilder {
    snapshot: PricingSnapshot,
}

impl PricingSnapshotBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn product(mut self, id: ProductId) -> Self {
        self.snapshot.products.insert(id);
        self
    }

    pub fn products(mut self, ids: impl IntoIterator<Item = ProductId>) -> Self {
        self.snapshot.products.extend(ids);
        self
    }

    pub fn customer(mut self, id: CustomerId) -> Self {
        self.snapshot.customers.insert(id);
        self
    }

    pub fn rule(mut self, rule: PricingRule) -> Self {
        self.snapshot.rules.push(rule);
        self
    }

    pub fn tier(mut self, tier: DiscountTier) -> Self {
        self.snapshot.tiers.push(tier);
        self
    }

    pub fn tax_rate(mut self, rate: TaxRate) -> Self {
        self.snapshot.tax_rates.push(rate);
        self
    }

    pub fn tax_group(mut self, group: TaxGroup) -> Self {
        self.snapshot.tax_groups.push(group);
        self
    }

    pub fn jurisdiction(mut self, jurisdiction: TaxJurisdiction) -> Self {
        self.snapshot.jurisdictions.push(jurisdiction);
        self
    }

    pub fn exemption(mut self, exemption: TaxExemption) -> Self {
        self.snapshot.exemptions.push(exemption);
        self
    }

    /// Build and validate the snapshot.
    pub fn build(self) -> Result<PricingSnapshot, EngineError> {
        self.snapshot.validate()?;
        Ok(self.snapshot)
    }

    /// Build without validation.
    pub fn build_unchecked(self) -> PricingSnapshot {
        self.snapshot
    }
}
