//! Price resolver.
//!
//! Candidates are applied in priority order (highest first, ties by lower
//! rule id). Compounding rules layer on top of each other and exclude the
//! rules listed in their `exclude_rules`. The first non-compounding rule
//! reached is applied and ends the scan. The best matching quantity tier is
//! applied afterwards. The running price never drops below zero; a price
//! that no longer fits a decimal is an [`EngineError::InvalidInput`].

use std::collections::BTreeSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::rule::{AdjustmentType, DiscountTier, PricingMethod, PricingRule, TierScope};
use crate::core::numeric::{add_percent, checked_add, checked_sub, floor_zero, sub_percent};
use crate::core::*;

/// Outcome of price resolution, before rounding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceResolution {
    pub unit_price: Decimal,
    /// Rules in the order they were applied.
    pub applied_rule_ids: Vec<RuleId>,
    pub applied_tier_id: Option<TierId>,
}

/// Order candidates by priority descending, then rule id ascending.
pub fn sort_by_priority<'a>(candidates: &[&'a PricingRule]) -> Vec<&'a PricingRule> {
    let mut sorted = candidates.to_vec();
    sorted.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.id.cmp(&b.id)));
    sorted
}

/// Apply rules, then the best tier, to `base_price`.
///
/// `tiers` should already be filtered for side, scope and quantity; tiers
/// scoped to a rule are only considered when that rule was applied.
pub fn resolve_price(
    candidates: &[&PricingRule],
    tiers: &[&DiscountTier],
    base_price: Decimal,
    qty: Decimal,
) -> Result<PriceResolution, EngineError> {
    let mut price = floor_zero(base_price);
    let mut applied_rule_ids = Vec::new();
    let mut excluded: BTreeSet<RuleId> = BTreeSet::new();

    for rule in sort_by_priority(candidates) {
        if excluded.contains(&rule.id) {
            trace!(rule_id = %rule.id, "rule excluded by an applied rule");
            continue;
        }
        price = apply_rule(rule, price)?;
        applied_rule_ids.push(rule.id);
        excluded.extend(rule.exclude_rules.iter().copied());

        if !rule.can_compound {
            break;
        }
    }

    let tier = select_tier(tiers, qty, &applied_rule_ids);
    if let Some(tier) = tier {
        price = apply_tier(tier, price)?;
    }

    debug!(
        base = %base_price,
        price = %price,
        rules = ?applied_rule_ids,
        tier = ?tier.map(|t| t.id),
        "resolved unit price"
    );

    Ok(PriceResolution {
        unit_price: price,
        applied_rule_ids,
        applied_tier_id: tier.map(|t| t.id),
    })
}

/// Apply one rule's pricing method to the running price.
pub fn apply_rule(rule: &PricingRule, price: Decimal) -> Result<Decimal, EngineError> {
    let value = rule.adjustment_value;
    let next = match rule.pricing_method {
        PricingMethod::Fixed => rule.fixed_price.unwrap_or(price),
        PricingMethod::Markup => match rule.adjustment_type {
            AdjustmentType::Flat => checked_add(price, value)?,
            AdjustmentType::Percentage => add_percent(price, value)?,
        },
        PricingMethod::Markdown | PricingMethod::Discount => {
            decrease(price, rule.adjustment_type, value)?
        }
    };
    Ok(floor_zero(next))
}

/// Pick the tier whose window contains `qty`, preferring the largest
/// `min_quantity`, then the lowest display order, then the lowest id.
pub fn select_tier<'a>(
    tiers: &[&'a DiscountTier],
    qty: Decimal,
    applied_rule_ids: &[RuleId],
) -> Option<&'a DiscountTier> {
    tiers
        .iter()
        .copied()
        .filter(|tier| tier.covers(qty))
        .filter(|tier| match tier.scope {
            TierScope::Product(_) => true,
            TierScope::Rule(id) => applied_rule_ids.contains(&id),
        })
        .max_by(|a, b| {
            a.min_quantity
                .cmp(&b.min_quantity)
                .then(b.display_order.cmp(&a.display_order))
                .then(b.id.cmp(&a.id))
        })
}

/// Apply a tier's discount, or replace the price with its fixed price.
pub fn apply_tier(tier: &DiscountTier, price: Decimal) -> Result<Decimal, EngineError> {
    match tier.fixed_price {
        Some(fixed) => Ok(floor_zero(fixed)),
        None => decrease(price, tier.discount_type, tier.discount_value),
    }
}

fn decrease(price: Decimal, kind: AdjustmentType, value: Decimal) -> Result<Decimal, EngineError> {
    match kind {
        AdjustmentType::Flat => Ok(floor_zero(checked_sub(price, value)?)),
        AdjustmentType::Percentage => sub_percent(price, value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::rule::*;
    use rust_decimal_macros::dec;

    fn rule(
        id: u64,
        method: PricingMethod,
        kind: AdjustmentType,
        value: Decimal,
    ) -> PricingRuleBuilder {
        PricingRuleBuilder::new(RuleId(id), method).adjustment(kind, value)
    }

    fn resolve(rules: &[PricingRule], base: Decimal) -> PriceResolution {
        let refs: Vec<&PricingRule> = rules.iter().collect();
        resolve_price(&refs, &[], base, dec!(1)).unwrap()
    }

    #[test]
    fn fixed_replaces_price() {
        let r = PricingRuleBuilder::new(RuleId(1), PricingMethod::Fixed)
            .fixed_price(dec!(42))
            .build();
        assert_eq!(apply_rule(&r, dec!(100)).unwrap(), dec!(42));
    }

    #[test]
    fn fixed_without_price_is_noop() {
        let r = PricingRuleBuilder::new(RuleId(1), PricingMethod::Fixed).build();
        assert_eq!(apply_rule(&r, dec!(100)).unwrap(), dec!(100));
    }

    #[test]
    fn markup_flat_and_percentage() {
        let flat = rule(1, PricingMethod::Markup, AdjustmentType::Flat, dec!(5)).build();
        let pct = rule(2, PricingMethod::Markup, AdjustmentType::Percentage, dec!(20)).build();
        assert_eq!(apply_rule(&flat, dec!(100)).unwrap(), dec!(105));
        assert_eq!(apply_rule(&pct, dec!(100)).unwrap(), dec!(120));
    }

    #[test]
    fn markdown_floors_at_zero() {
        let r = rule(1, PricingMethod::Markdown, AdjustmentType::Flat, dec!(150)).build();
        assert_eq!(apply_rule(&r, dec!(100)).unwrap(), dec!(0));
    }

    #[test]
    fn highest_priority_non_compounding_wins_alone() {
        let rules = vec![
            rule(1, PricingMethod::Discount, AdjustmentType::Percentage, dec!(10))
                .priority(5)
                .build(),
            rule(2, PricingMethod::Discount, AdjustmentType::Flat, dec!(3))
                .priority(9)
                .build(),
        ];
        let res = resolve(&rules, dec!(100));
        assert_eq!(res.unit_price, dec!(97));
        assert_eq!(res.applied_rule_ids, vec![RuleId(2)]);
    }

    #[test]
    fn equal_priority_breaks_ties_by_id() {
        let rules = vec![
            rule(8, PricingMethod::Discount, AdjustmentType::Flat, dec!(8)).build(),
            rule(3, PricingMethod::Discount, AdjustmentType::Flat, dec!(3)).build(),
        ];
        let res = resolve(&rules, dec!(100));
        assert_eq!(res.applied_rule_ids, vec![RuleId(3)]);
        assert_eq!(res.unit_price, dec!(97));
    }

    #[test]
    fn compounding_rules_layer_in_priority_order() {
        let rules = vec![
            rule(1, PricingMethod::Discount, AdjustmentType::Flat, dec!(10))
                .priority(1)
                .compounding()
                .build(),
            rule(2, PricingMethod::Discount, AdjustmentType::Percentage, dec!(10))
                .priority(2)
                .compounding()
                .build(),
        ];
        // 100 - 10% = 90, then - 10 = 80
        let res = resolve(&rules, dec!(100));
        assert_eq!(res.unit_price, dec!(80));
        assert_eq!(res.applied_rule_ids, vec![RuleId(2), RuleId(1)]);
    }

    #[test]
    fn compounding_rule_excludes_listed_rules() {
        let rules = vec![
            rule(1, PricingMethod::Discount, AdjustmentType::Flat, dec!(5))
                .priority(3)
                .compounding()
                .excludes([RuleId(2)])
                .build(),
            rule(2, PricingMethod::Discount, AdjustmentType::Flat, dec!(50))
                .priority(2)
                .compounding()
                .build(),
            rule(3, PricingMethod::Markup, AdjustmentType::Flat, dec!(1))
                .priority(1)
                .compounding()
                .build(),
        ];
        let res = resolve(&rules, dec!(100));
        assert_eq!(res.applied_rule_ids, vec![RuleId(1), RuleId(3)]);
        assert_eq!(res.unit_price, dec!(96));
    }

    #[test]
    fn non_compounding_rule_stops_the_scan() {
        let rules = vec![
            rule(1, PricingMethod::Discount, AdjustmentType::Flat, dec!(5))
                .priority(3)
                .compounding()
                .build(),
            rule(2, PricingMethod::Discount, AdjustmentType::Flat, dec!(10))
                .priority(2)
                .build(),
            rule(3, PricingMethod::Discount, AdjustmentType::Flat, dec!(1))
                .priority(1)
                .compounding()
                .build(),
        ];
        let res = resolve(&rules, dec!(100));
        assert_eq!(res.applied_rule_ids, vec![RuleId(1), RuleId(2)]);
        assert_eq!(res.unit_price, dec!(85));
    }

    fn tier(id: u64, min: Decimal, max: Option<Decimal>) -> DiscountTierBuilder {
        let b = DiscountTierBuilder::new(TierId(id), TierScope::Product(ProductId(1)), min);
        match max {
            Some(max) => b.max_quantity(max),
            None => b,
        }
    }

    #[test]
    fn tier_boundary_selection() {
        let a = tier(1, dec!(1), Some(dec!(9))).build();
        let b = tier(2, dec!(10), None).build();
        let tiers = vec![&a, &b];
        assert_eq!(select_tier(&tiers, dec!(9), &[]).map(|t| t.id), Some(TierId(1)));
        assert_eq!(select_tier(&tiers, dec!(10), &[]).map(|t| t.id), Some(TierId(2)));
        assert_eq!(select_tier(&tiers, dec!(0.5), &[]), None);
    }

    #[test]
    fn overlapping_tiers_prefer_largest_minimum() {
        let a = tier(1, dec!(1), None).build();
        let b = tier(2, dec!(5), None).build();
        let c = tier(3, dec!(5), None).display_order(-1).build();
        let tiers = vec![&a, &b, &c];
        assert_eq!(select_tier(&tiers, dec!(7), &[]).map(|t| t.id), Some(TierId(3)));
    }

    #[test]
    fn rule_scoped_tier_needs_applied_rule() {
        let t = DiscountTierBuilder::new(TierId(1), TierScope::Rule(RuleId(4)), dec!(1)).build();
        let tiers = vec![&t];
        assert!(select_tier(&tiers, dec!(3), &[]).is_none());
        assert!(select_tier(&tiers, dec!(3), &[RuleId(4)]).is_some());
    }

    #[test]
    fn tier_applies_after_rules() {
        let rules =
            vec![rule(1, PricingMethod::Discount, AdjustmentType::Flat, dec!(20)).build()];
        let t = tier(1, dec!(10), None)
            .discount(AdjustmentType::Percentage, dec!(10))
            .build();
        let refs: Vec<&PricingRule> = rules.iter().collect();
        let res = resolve_price(&refs, &[&t], dec!(100), dec!(12)).unwrap();
        // (100 - 20) - 10% = 72
        assert_eq!(res.unit_price, dec!(72));
        assert_eq!(res.applied_tier_id, Some(TierId(1)));
    }

    #[test]
    fn tier_fixed_price_replaces() {
        let t = tier(1, dec!(1), None).fixed_price(dec!(9.50)).build();
        assert_eq!(apply_tier(&t, dec!(12)).unwrap(), dec!(9.50));
    }

    #[test]
    fn tier_flat_discount_floors_at_zero() {
        let t = tier(1, dec!(1), None)
            .discount(AdjustmentType::Flat, dec!(500))
            .build();
        assert_eq!(apply_tier(&t, dec!(12)).unwrap(), dec!(0));
    }

    #[test]
    fn overflowing_markups_are_an_error() {
        let huge = dec!(100_000_000_000_000_000_000);
        let rules = vec![
            rule(1, PricingMethod::Markup, AdjustmentType::Percentage, huge)
                .priority(2)
                .compounding()
                .build(),
            rule(2, PricingMethod::Markup, AdjustmentType::Percentage, huge)
                .priority(1)
                .compounding()
                .build(),
        ];
        let refs: Vec<&PricingRule> = rules.iter().collect();
        let err = resolve_price(&refs, &[], dec!(100), dec!(1)).unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));

        let flat = rule(3, PricingMethod::Markup, AdjustmentType::Flat, Decimal::MAX).build();
        assert!(apply_rule(&flat, dec!(1)).is_err());
    }

    #[test]
    fn no_rules_keeps_base_price() {
        let res = resolve(&[], dec!(19.99));
        assert_eq!(res.unit_price, dec!(19.99));
        assert!(res.applied_rule_ids.is_empty());
    }
}
