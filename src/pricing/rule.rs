//! Pricing rules and quantity discount tiers, with their builders.

use std::collections::BTreeSet;

use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::core::*;

/// How a pricing rule changes the running price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PricingMethod {
    /// Replace the price with `fixed_price`.
    Fixed,
    /// Increase the price by the adjustment.
    Markup,
    /// Decrease the price by the adjustment.
    Markdown,
    /// Decrease the price by the adjustment.
    Discount,
}

/// Whether an adjustment value is an amount or a percentage of the price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentType {
    Flat,
    Percentage,
}

/// Which side of a trade a discount tier applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TierType {
    Buying,
    Selling,
}

impl TierType {
    pub fn for_side(side: TradeSide) -> Self {
        match side {
            TradeSide::Buying => Self::Buying,
            TradeSide::Selling => Self::Selling,
        }
    }
}

/// Owner of a discount tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum TierScope {
    /// Applies whenever the product matches.
    Product(ProductId),
    /// Applies only when the owning rule was applied.
    Rule(RuleId),
}

/// A priority-ordered price adjustment with applicability predicates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingRule {
    pub id: RuleId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub product_id: Option<ProductId>,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub customer_id: Option<CustomerId>,
    #[serde(default)]
    pub customer_group: Option<String>,
    /// Higher wins.
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub validity: ValidityWindow,
    #[serde(default)]
    pub time_from: Option<NaiveTime>,
    #[serde(default)]
    pub time_to: Option<NaiveTime>,
    /// 0 = Sunday … 6 = Saturday.
    #[serde(default)]
    pub days_of_week: Option<BTreeSet<u8>>,
    #[serde(default)]
    pub min_quantity: Option<Decimal>,
    #[serde(default)]
    pub max_quantity: Option<Decimal>,
    pub pricing_method: PricingMethod,
    pub adjustment_type: AdjustmentType,
    #[serde(default)]
    pub adjustment_value: Decimal,
    #[serde(default)]
    pub fixed_price: Option<Decimal>,
    #[serde(default)]
    pub can_compound: bool,
    /// Rules that may not be applied together with this one.
    #[serde(default)]
    pub exclude_rules: BTreeSet<RuleId>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl PricingRule {
    /// The time-of-day window, when both ends are set.
    pub fn time_window(&self) -> Option<TimeOfDayWindow> {
        match (self.time_from, self.time_to) {
            (Some(from), Some(to)) => Some(TimeOfDayWindow::new(from, to)),
            _ => None,
        }
    }

    /// Whether the rule carries any customer scoping.
    pub fn is_customer_scoped(&self) -> bool {
        self.customer_id.is_some() || self.customer_group.is_some()
    }
}

/// A quantity-banded discount applied after pricing rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscountTier {
    pub id: TierId,
    pub scope: TierScope,
    pub tier_type: TierType,
    pub min_quantity: Decimal,
    #[serde(default)]
    pub max_quantity: Option<Decimal>,
    pub discount_type: AdjustmentType,
    #[serde(default)]
    pub discount_value: Decimal,
    #[serde(default)]
    pub fixed_price: Option<Decimal>,
    #[serde(default)]
    pub display_order: i32,
}

impl DiscountTier {
    pub fn covers(&self, qty: Decimal) -> bool {
        quantity_in_window(qty, Some(self.min_quantity), self.max_quantity)
    }
}

fn default_true() -> bool {
    true
}

/// Builder for [`PricingRule`].
///
/// ```
/// use rust_decimal_macros::dec;
/// use tarif::core::*;
/// use tarif::pricing::*;
///
/// let rule = PricingRuleBuilder::new(RuleId(1), PricingMethod::Discount)
///     .adjustment(AdjustmentType::Percentage, dec!(15))
///     .category(CategoryId(4))
///     .priority(10)
///     .quantity_range(Some(dec!(5)), None)
///     .build();
///
/// assert!(!rule.can_compound);
/// ```
pub struct PricingRuleBuilder {
    rule: PricingRule,
}

impl PricingRuleBuilder {
    pub fn new(id: RuleId, method: PricingMethod) -> Self {
        Self {
            rule: PricingRule {
                id,
                name: None,
                product_id: None,
                category_id: None,
                customer_id: None,
                customer_group: None,
                priority: 0,
                validity: ValidityWindow::ALWAYS,
                time_from: None,
                time_to: None,
                days_of_week: None,
                min_quantity: None,
                max_quantity: None,
                pricing_method: method,
                adjustment_type: AdjustmentType::Flat,
                adjustment_value: Decimal::ZERO,
                fixed_price: None,
                can_compound: false,
                exclude_rules: BTreeSet::new(),
                is_active: true,
            },
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.rule.name = Some(name.into());
        self
    }

    pub fn product(mut self, id: ProductId) -> Self {
        self.rule.product_id = Some(id);
        self
    }

    pub fn category(mut self, id: CategoryId) -> Self {
        self.rule.category_id = Some(id);
        self
    }

    pub fn customer(mut self, id: CustomerId) -> Self {
        self.rule.customer_id = Some(id);
        self
    }

    pub fn customer_group(mut self, group: impl Into<String>) -> Self {
        self.rule.customer_group = Some(group.into());
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.rule.priority = priority;
        self
    }

    pub fn valid(mut self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        self.rule.validity = ValidityWindow::new(from, to);
        self
    }

    pub fn time_of_day(mut self, from: NaiveTime, to: NaiveTime) -> Self {
        self.rule.time_from = Some(from);
        self.rule.time_to = Some(to);
        self
    }

    pub fn days_of_week(mut self, days: impl IntoIterator<Item = u8>) -> Self {
        self.rule.days_of_week = Some(days.into_iter().collect());
        self
    }

    pub fn quantity_range(mut self, min: Option<Decimal>, max: Option<Decimal>) -> Self {
        self.rule.min_quantity = min;
        self.rule.max_quantity = max;
        self
    }

    pub fn adjustment(mut self, kind: AdjustmentType, value: Decimal) -> Self {
        self.rule.adjustment_type = kind;
        self.rule.adjustment_value = value;
        self
    }

    pub fn fixed_price(mut self, price: Decimal) -> Self {
        self.rule.fixed_price = Some(price);
        self
    }

    pub fn compounding(mut self) -> Self {
        self.rule.can_compound = true;
        self
    }

    pub fn excludes(mut self, ids: impl IntoIterator<Item = RuleId>) -> Self {
        self.rule.exclude_rules.extend(ids);
        self
    }

    pub fn inactive(mut self) -> Self {
        self.rule.is_active = false;
        self
    }

    pub fn build(self) -> PricingRule {
        self.rule
    }
}

/// Builder for [`DiscountTier`].
pub struct DiscountTierBuilder {
    tier: DiscountTier,
}

impl DiscountTierBuilder {
    /// A selling tier starting at `min_quantity` with no upper bound.
    pub fn new(id: TierId, scope: TierScope, min_quantity: Decimal) -> Self {
        Self {
            tier: DiscountTier {
                id,
                scope,
                tier_type: TierType::Selling,
                min_quantity,
                max_quantity: None,
                discount_type: AdjustmentType::Percentage,
                discount_value: Decimal::ZERO,
                fixed_price: None,
                display_order: 0,
            },
        }
    }

    pub fn tier_type(mut self, tier_type: TierType) -> Self {
        self.tier.tier_type = tier_type;
        self
    }

    pub fn max_quantity(mut self, max: Decimal) -> Self {
        self.tier.max_quantity = Some(max);
        self
    }

    pub fn discount(mut self, kind: AdjustmentType, value: Decimal) -> Self {
        self.tier.discount_type = kind;
        self.tier.discount_value = value;
        self
    }

    pub fn fixed_price(mut self, price: Decimal) -> Self {
        self.tier.fixed_price = Some(price);
        self
    }

    pub fn display_order(mut self, order: i32) -> Self {
        self.tier.display_order = order;
        self
    }

    pub fn build(self) -> DiscountTier {
        self.tier
    }
}
