//! Rule candidate filter.
//!
//! Pure predicates over an already-fetched rule snapshot. A rule is a
//! candidate when it is active, valid on the evaluation day, inside its
//! weekday and time-of-day windows, inside its quantity window, and scoped to
//! the context's product/category and customer/customer group.

use chrono::NaiveDateTime;
use tracing::debug;

use super::rule::{DiscountTier, PricingRule, TierScope, TierType};
use crate::core::*;

/// Select the pricing rules whose applicability predicates all hold.
pub fn filter_rules<'a>(
    rules: &'a [PricingRule],
    ctx: &CalculationContext,
    now: NaiveDateTime,
    mode: TimeWindowMode,
) -> Vec<&'a PricingRule> {
    let candidates: Vec<&PricingRule> = rules
        .iter()
        .filter(|rule| is_candidate(rule, ctx, now, mode))
        .collect();
    debug!(
        total = rules.len(),
        candidates = candidates.len(),
        "filtered pricing rules"
    );
    candidates
}

/// Whether a single rule applies to the context at `now`.
pub fn is_candidate(
    rule: &PricingRule,
    ctx: &CalculationContext,
    now: NaiveDateTime,
    mode: TimeWindowMode,
) -> bool {
    rule.is_active
        && rule.validity.contains(now)
        && matches_day(rule, now)
        && matches_time(rule, now, mode)
        && quantity_in_window(ctx.quantity, rule.min_quantity, rule.max_quantity)
        && matches_product_scope(rule, ctx)
        && matches_customer_scope(rule, ctx)
}

fn matches_day(rule: &PricingRule, now: NaiveDateTime) -> bool {
    match &rule.days_of_week {
        Some(days) => days.contains(&day_of_week(now)),
        None => true,
    }
}

// Only enforced when both bounds are set.
fn matches_time(rule: &PricingRule, now: NaiveDateTime, mode: TimeWindowMode) -> bool {
    rule.time_window()
        .is_none_or(|window| window.contains(now, mode))
}

fn matches_product_scope(rule: &PricingRule, ctx: &CalculationContext) -> bool {
    if rule.product_id.is_none() && rule.category_id.is_none() {
        return true;
    }
    rule.product_id == Some(ctx.product_id)
        || (rule.category_id.is_some() && rule.category_id == ctx.category_id)
}

fn matches_customer_scope(rule: &PricingRule, ctx: &CalculationContext) -> bool {
    if !rule.is_customer_scoped() {
        return true;
    }
    let by_id = rule.customer_id.is_some() && rule.customer_id == ctx.customer_id;
    let by_group = match (&rule.customer_group, &ctx.customer_group) {
        (Some(rule_group), Some(ctx_group)) => rule_group == ctx_group,
        _ => false,
    };
    by_id || by_group
}

/// Select the discount tiers of the context's side whose quantity window
/// contains the quantity and whose scope is the context product or one of
/// `rule_ids`.
pub fn filter_tiers<'a>(
    tiers: &'a [DiscountTier],
    ctx: &CalculationContext,
    rule_ids: &[RuleId],
) -> Vec<&'a DiscountTier> {
    let tier_type = TierType::for_side(ctx.side);
    tiers
        .iter()
        .filter(|tier| tier.tier_type == tier_type && tier.covers(ctx.quantity))
        .filter(|tier| match tier.scope {
            TierScope::Product(id) => id == ctx.product_id,
            TierScope::Rule(id) => rule_ids.contains(&id),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::rule::*;
    use chrono::{NaiveDate, NaiveTime};
    use rust_decimal_macros::dec;

    // 2024-06-12 is a Wednesday (day 3)
    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 12)
            .unwrap()
            .and_hms_opt(18, 30, 0)
            .unwrap()
    }

    fn ctx() -> CalculationContext {
        CalculationContextBuilder::new(ProductId(1), dec!(5), dec!(100), now())
            .category(CategoryId(10))
            .customer(CustomerId(100))
            .customer_group("retail")
            .build()
    }

    fn discount(id: u64) -> PricingRuleBuilder {
        PricingRuleBuilder::new(RuleId(id), PricingMethod::Discount)
            .adjustment(AdjustmentType::Flat, dec!(1))
    }

    fn passes(rule: PricingRule) -> bool {
        is_candidate(&rule, &ctx(), now(), TimeWindowMode::Literal)
    }

    #[test]
    fn wildcard_rule_matches() {
        assert!(passes(discount(1).build()));
    }

    #[test]
    fn inactive_rule_rejected() {
        assert!(!passes(discount(1).inactive().build()));
    }

    #[test]
    fn validity_window_respected() {
        let d = |y, m, day| NaiveDate::from_ymd_opt(y, m, day);
        assert!(passes(discount(1).valid(d(2024, 6, 1), d(2024, 6, 12)).build()));
        assert!(!passes(discount(1).valid(d(2024, 6, 13), None).build()));
        assert!(!passes(discount(1).valid(None, d(2024, 6, 11)).build()));
    }

    #[test]
    fn weekday_respected() {
        assert!(passes(discount(1).days_of_week([3]).build()));
        assert!(!passes(discount(1).days_of_week([0, 6]).build()));
    }

    #[test]
    fn time_of_day_respected() {
        let t = |h| NaiveTime::from_hms_opt(h, 0, 0).unwrap();
        assert!(passes(discount(1).time_of_day(t(17), t(19)).build()));
        assert!(!passes(discount(1).time_of_day(t(8), t(12)).build()));
    }

    #[test]
    fn single_time_bound_is_ignored() {
        let mut rule = discount(1).build();
        rule.time_from = Some(NaiveTime::from_hms_opt(23, 0, 0).unwrap());
        assert!(passes(rule));
    }

    #[test]
    fn quantity_window_respected() {
        assert!(passes(discount(1).quantity_range(Some(dec!(5)), Some(dec!(5))).build()));
        assert!(!passes(discount(1).quantity_range(Some(dec!(6)), None).build()));
        assert!(!passes(discount(1).quantity_range(None, Some(dec!(4))).build()));
    }

    #[test]
    fn product_or_category_scope() {
        assert!(passes(discount(1).product(ProductId(1)).build()));
        assert!(passes(discount(1).category(CategoryId(10)).build()));
        assert!(!passes(discount(1).product(ProductId(2)).build()));
        assert!(!passes(discount(1).category(CategoryId(11)).build()));
        // either selector matching is enough
        assert!(passes(
            discount(1)
                .product(ProductId(2))
                .category(CategoryId(10))
                .build()
        ));
    }

    #[test]
    fn category_rule_needs_context_category() {
        let rule = discount(1).category(CategoryId(10)).build();
        let mut no_category = ctx();
        no_category.category_id = None;
        assert!(!is_candidate(&rule, &no_category, now(), TimeWindowMode::Literal));
    }

    #[test]
    fn customer_scope() {
        assert!(passes(discount(1).customer(CustomerId(100)).build()));
        assert!(passes(discount(1).customer_group("retail").build()));
        assert!(!passes(discount(1).customer(CustomerId(101)).build()));
        assert!(!passes(discount(1).customer_group("wholesale").build()));
        assert!(passes(
            discount(1)
                .customer(CustomerId(101))
                .customer_group("retail")
                .build()
        ));
    }

    #[test]
    fn anonymous_context_skips_customer_rules() {
        let rule = discount(1).customer(CustomerId(100)).build();
        let anonymous =
            CalculationContextBuilder::new(ProductId(1), dec!(5), dec!(100), now()).build();
        assert!(!is_candidate(&rule, &anonymous, now(), TimeWindowMode::Literal));
    }

    #[test]
    fn filter_keeps_input_order() {
        let rules = vec![
            discount(3).build(),
            discount(1).inactive().build(),
            discount(2).build(),
        ];
        let ids: Vec<RuleId> = filter_rules(&rules, &ctx(), now(), TimeWindowMode::Literal)
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec![RuleId(3), RuleId(2)]);
    }

    #[test]
    fn tiers_filtered_by_side_scope_and_quantity() {
        let tiers = vec![
            DiscountTierBuilder::new(TierId(1), TierScope::Product(ProductId(1)), dec!(1))
                .max_quantity(dec!(9))
                .build(),
            DiscountTierBuilder::new(TierId(2), TierScope::Product(ProductId(1)), dec!(10)).build(),
            DiscountTierBuilder::new(TierId(3), TierScope::Product(ProductId(2)), dec!(1)).build(),
            DiscountTierBuilder::new(TierId(4), TierScope::Rule(RuleId(7)), dec!(1)).build(),
            DiscountTierBuilder::new(TierId(5), TierScope::Product(ProductId(1)), dec!(1))
                .tier_type(TierType::Buying)
                .build(),
        ];
        let ids: Vec<TierId> = filter_tiers(&tiers, &ctx(), &[RuleId(7)])
            .iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec![TierId(1), TierId(4)]);

        let without_rule: Vec<TierId> = filter_tiers(&tiers, &ctx(), &[])
            .iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(without_rule, vec![TierId(1)]);
    }
}
