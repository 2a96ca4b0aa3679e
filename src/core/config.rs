//! Engine configuration.
//!
//! Built programmatically via [`EngineConfig::default`] and the `with_*`
//! setters, or deserialized from JSON (feature `json`). Every field has a
//! default, so partial documents are accepted:
//!
//! ```json
//! {
//!   "time_window_mode": "wrap_midnight",
//!   "jurisdiction_mode": "top_ranked",
//!   "max_amount": "250000"
//! }
//! ```

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::error::EngineError;
use super::numeric::{CURRENCY_SCALE, INTERNAL_SCALE};

/// Largest supported decimal scale for either rounding setting.
pub const MAX_SCALE: u32 = 12;

/// How time-of-day windows whose start lies after their end are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeWindowMode {
    /// `time_from <= t <= time_to`; a window crossing midnight never matches.
    #[default]
    Literal,
    /// `time_from > time_to` means the window wraps past midnight.
    WrapMidnight,
}

/// Which of the ranked matching jurisdictions contribute tax.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JurisdictionMode {
    /// Every matching jurisdiction contributes (e.g. federal + state).
    #[default]
    All,
    /// Only the highest ranked jurisdiction contributes.
    TopRanked,
}

/// Engine-wide settings. Immutable once handed to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub time_window_mode: TimeWindowMode,
    pub jurisdiction_mode: JurisdictionMode,
    /// Attach a `NoJurisdictionMatched` warning when no jurisdiction matched.
    pub require_jurisdiction: bool,
    /// Ceiling for base prices, fixed prices, flat adjustments, fixed tax
    /// amounts and subtotals.
    pub max_amount: Decimal,
    /// Ceiling for markup percentages.
    pub max_markup_percentage: Decimal,
    /// Ceiling for quantities.
    pub max_quantity: Decimal,
    /// Decimal places of every amount in a calculation result.
    pub currency_scale: u32,
    /// Decimal places kept for division results during calculation.
    pub internal_scale: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            time_window_mode: TimeWindowMode::Literal,
            jurisdiction_mode: JurisdictionMode::All,
            require_jurisdiction: false,
            max_amount: dec!(1_000_000_000),
            max_markup_percentage: dec!(10_000),
            max_quantity: dec!(1_000_000),
            currency_scale: CURRENCY_SCALE,
            internal_scale: INTERNAL_SCALE,
        }
    }
}

impl EngineConfig {
    pub fn with_time_window_mode(mut self, mode: TimeWindowMode) -> Self {
        self.time_window_mode = mode;
        self
    }

    pub fn with_jurisdiction_mode(mut self, mode: JurisdictionMode) -> Self {
        self.jurisdiction_mode = mode;
        self
    }

    pub fn with_require_jurisdiction(mut self, required: bool) -> Self {
        self.require_jurisdiction = required;
        self
    }

    pub fn with_max_amount(mut self, max: Decimal) -> Self {
        self.max_amount = max;
        self
    }

    pub fn with_max_markup_percentage(mut self, max: Decimal) -> Self {
        self.max_markup_percentage = max;
        self
    }

    pub fn with_max_quantity(mut self, max: Decimal) -> Self {
        self.max_quantity = max;
        self
    }

    pub fn with_scales(mut self, currency_scale: u32, internal_scale: u32) -> Self {
        self.currency_scale = currency_scale;
        self.internal_scale = internal_scale;
        self
    }

    /// Check the settings for consistency.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.internal_scale > MAX_SCALE {
            return Err(EngineError::Config(format!(
                "internal_scale {} exceeds maximum of {MAX_SCALE}",
                self.internal_scale
            )));
        }
        if self.currency_scale > self.internal_scale {
            return Err(EngineError::Config(format!(
                "currency_scale {} must not exceed internal_scale {}",
                self.currency_scale, self.internal_scale
            )));
        }
        if self.max_amount <= Decimal::ZERO {
            return Err(EngineError::Config("max_amount must be positive".into()));
        }
        if self.max_markup_percentage <= Decimal::ZERO {
            return Err(EngineError::Config(
                "max_markup_percentage must be positive".into(),
            ));
        }
        if self.max_quantity <= Decimal::ZERO {
            return Err(EngineError::Config("max_quantity must be positive".into()));
        }
        Ok(())
    }

    /// Parse and validate a JSON configuration document.
    #[cfg(feature = "json")]
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| EngineError::Json(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}
