//! # tarif
//!
//! Pricing and tax rule evaluation engine. Given a product, quantity,
//! customer context, location and point in time, `tarif` computes the
//! adjusted unit price after pricing rules and quantity tiers, and the tax
//! liability on that price after resolving jurisdictions, tax groups and
//! exemptions.
//!
//! All monetary values use [`rust_decimal::Decimal`], never floating point.
//! The engine is pure: rule snapshots and the evaluation timestamp are passed
//! in, nothing is read from ambient state.
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::NaiveDate;
//! use rust_decimal_macros::dec;
//! use tarif::core::*;
//! use tarif::engine::*;
//! use tarif::pricing::*;
//! use tarif::tax::*;
//!
//! let now = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap().and_hms_opt(12, 0, 0).unwrap();
//!
//! let snapshot = PricingSnapshotBuilder::new()
//!     .product(ProductId(1))
//!     .rule(PricingRuleBuilder::new(RuleId(1), PricingMethod::Discount)
//!         .adjustment(AdjustmentType::Percentage, dec!(10))
//!         .build())
//!     .tax_rate(TaxRateBuilder::new(TaxRateId(1), dec!(19)).build())
//!     .jurisdiction(TaxJurisdictionBuilder::new(JurisdictionId(1), TaxTarget::Rate(TaxRateId(1)))
//!         .country("DE")
//!         .build())
//!     .build()
//!     .unwrap();
//!
//! let engine = PricingEngine::new(snapshot, EngineConfig::default()).unwrap();
//! let ctx = CalculationContextBuilder::new(ProductId(1), dec!(2), dec!(50), now)
//!     .location(LocationDescriptor::country("DE"))
//!     .build();
//!
//! let result = engine.calculate(&ctx).unwrap();
//! assert_eq!(result.unit_price, dec!(45.00));
//! assert_eq!(result.subtotal, dec!(90.00));
//! assert_eq!(result.tax_total, dec!(17.10));
//! assert_eq!(result.grand_total, dec!(107.10));
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `json` | JSON loaders for config, snapshots and requests |
//! | `parallel` | Bulk calculation fanned out over the rayon thread pool |
//! | `all` | Everything |

pub mod core;
pub mod engine;
pub mod pricing;
pub mod tax;

// Re-export core types at crate root for convenience
pub use crate::core::*;
