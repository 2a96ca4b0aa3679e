//! Snapshot and context validation.
//!
//! Snapshot checks collect every problem as a [`ValidationError`] with a
//! dotted field path. Context checks stop at the first problem.

use std::collections::HashSet;
use std::hash::Hash;

use rust_decimal::Decimal;

use super::snapshot::PricingSnapshot;
use crate::core::numeric::is_valid_percentage;
use crate::core::*;
use crate::pricing::{AdjustmentType, DiscountTier, PricingMethod, PricingRule};
use crate::tax::{ExemptionType, TaxExemption, TaxGroup, TaxJurisdiction, TaxRate};

/// Validate a snapshot for internal consistency.
/// Returns all validation errors found (not just the first).
pub fn validate_snapshot(
    snapshot: &PricingSnapshot,
    config: &EngineConfig,
) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    check_unique(snapshot.rules.iter().map(|r| r.id), "rules", &mut errors);
    check_unique(snapshot.tiers.iter().map(|t| t.id), "tiers", &mut errors);
    check_unique(snapshot.tax_rates.iter().map(|r| r.id), "tax_rates", &mut errors);
    check_unique(snapshot.tax_groups.iter().map(|g| g.id), "tax_groups", &mut errors);
    check_unique(
        snapshot.jurisdictions.iter().map(|j| j.id),
        "jurisdictions",
        &mut errors,
    );
    check_unique(snapshot.exemptions.iter().map(|e| e.id), "exemptions", &mut errors);

    for (i, rule) in snapshot.rules.iter().enumerate() {
        validate_rule(rule, &format!("rules[{i}]"), config, &mut errors);
    }
    for (i, tier) in snapshot.tiers.iter().enumerate() {
        validate_tier(tier, &format!("tiers[{i}]"), config, &mut errors);
    }
    for (i, rate) in snapshot.tax_rates.iter().enumerate() {
        validate_rate(rate, &format!("tax_rates[{i}]"), config, &mut errors);
    }
    for (i, group) in snapshot.tax_groups.iter().enumerate() {
        validate_group(group, snapshot, &format!("tax_groups[{i}]"), &mut errors);
    }
    for (i, jurisdiction) in snapshot.jurisdictions.iter().enumerate() {
        let prefix = format!("jurisdictions[{i}]");
        validate_jurisdiction(jurisdiction, snapshot, &prefix, &mut errors);
    }
    for (i, exemption) in snapshot.exemptions.iter().enumerate() {
        validate_exemption(exemption, snapshot, &format!("exemptions[{i}]"), &mut errors);
    }

    errors
}

/// Validate a calculation context against engine limits.
pub fn validate_context(
    ctx: &CalculationContext,
    config: &EngineConfig,
) -> Result<(), EngineError> {
    if ctx.quantity <= Decimal::ZERO {
        return Err(EngineError::InvalidInput(format!(
            "quantity must be positive, got {}",
            ctx.quantity
        )));
    }
    if ctx.quantity > config.max_quantity {
        return Err(EngineError::InvalidInput(format!(
            "quantity {} exceeds maximum of {}",
            ctx.quantity, config.max_quantity
        )));
    }
    if ctx.base_price <= Decimal::ZERO {
        return Err(EngineError::InvalidInput(format!(
            "base price must be positive, got {}",
            ctx.base_price
        )));
    }
    if ctx.base_price > config.max_amount {
        return Err(EngineError::InvalidInput(format!(
            "base price {} exceeds maximum of {}",
            ctx.base_price, config.max_amount
        )));
    }
    Ok(())
}

fn check_unique<T: Copy + Eq + Hash + std::fmt::Display>(
    ids: impl Iterator<Item = T>,
    collection: &str,
    errors: &mut Vec<ValidationError>,
) {
    let mut seen = HashSet::new();
    for (i, id) in ids.enumerate() {
        if !seen.insert(id) {
            errors.push(ValidationError::new(
                format!("{collection}[{i}].id"),
                format!("duplicate id {id}"),
            ));
        }
    }
}

fn validate_rule(
    rule: &PricingRule,
    prefix: &str,
    config: &EngineConfig,
    errors: &mut Vec<ValidationError>,
) {
    let value = rule.adjustment_value;
    let field = format!("{prefix}.adjustment_value");

    match rule.adjustment_type {
        AdjustmentType::Flat => check_amount(value, &field, config, errors),
        AdjustmentType::Percentage if value.is_sign_negative() => {
            errors.push(ValidationError::new(
                field.as_str(),
                "adjustment value must not be negative",
            ));
        }
        AdjustmentType::Percentage => {}
    }

    match rule.pricing_method {
        PricingMethod::Fixed => {
            if let Some(price) = rule.fixed_price {
                check_amount(price, &format!("{prefix}.fixed_price"), config, errors);
            }
        }
        PricingMethod::Markup | PricingMethod::Markdown | PricingMethod::Discount => {
            if rule.fixed_price.is_some() {
                errors.push(ValidationError::new(
                    format!("{prefix}.fixed_price"),
                    "fixed price is only meaningful for the fixed pricing method",
                ));
            }
        }
    }

    if rule.adjustment_type == AdjustmentType::Percentage {
        match rule.pricing_method {
            PricingMethod::Markdown | PricingMethod::Discount if !is_valid_percentage(value) => {
                errors.push(ValidationError::new(
                    field.as_str(),
                    format!("percentage must be between 0 and 100, got {value}"),
                ));
            }
            PricingMethod::Markup if value > config.max_markup_percentage => {
                errors.push(ValidationError::new(
                    field.as_str(),
                    format!(
                        "markup percentage {value} exceeds maximum of {}",
                        config.max_markup_percentage
                    ),
                ));
            }
            _ => {}
        }
    }

    if rule.validity.is_inverted() {
        errors.push(ValidationError::new(
            format!("{prefix}.validity"),
            "valid_from must not be after valid_to",
        ));
    }

    if rule.time_from.is_some() != rule.time_to.is_some() {
        errors.push(ValidationError::new(
            format!("{prefix}.time_from"),
            "time_from and time_to must be set together",
        ));
    }

    if let Some(days) = &rule.days_of_week {
        if let Some(day) = days.iter().find(|d| **d > 6) {
            errors.push(ValidationError::new(
                format!("{prefix}.days_of_week"),
                format!("day of week must be 0 (Sunday) to 6 (Saturday), got {day}"),
            ));
        }
    }

    check_quantity_window(rule.min_quantity, rule.max_quantity, prefix, errors);
}

fn validate_tier(
    tier: &DiscountTier,
    prefix: &str,
    config: &EngineConfig,
    errors: &mut Vec<ValidationError>,
) {
    let field = format!("{prefix}.discount_value");
    match tier.discount_type {
        AdjustmentType::Flat => check_amount(tier.discount_value, &field, config, errors),
        AdjustmentType::Percentage if !is_valid_percentage(tier.discount_value) => {
            errors.push(ValidationError::new(
                field.as_str(),
                format!(
                    "percentage must be between 0 and 100, got {}",
                    tier.discount_value
                ),
            ));
        }
        AdjustmentType::Percentage => {}
    }

    if let Some(price) = tier.fixed_price {
        check_amount(price, &format!("{prefix}.fixed_price"), config, errors);
        if !tier.discount_value.is_zero() {
            errors.push(ValidationError::new(
                format!("{prefix}.fixed_price"),
                "tier cannot carry both a fixed price and a discount value",
            ));
        }
    }

    if tier.min_quantity.is_sign_negative() {
        errors.push(ValidationError::new(
            format!("{prefix}.min_quantity"),
            "minimum quantity must not be negative",
        ));
    }
    check_quantity_window(Some(tier.min_quantity), tier.max_quantity, prefix, errors);
}

fn validate_rate(
    rate: &TaxRate,
    prefix: &str,
    config: &EngineConfig,
    errors: &mut Vec<ValidationError>,
) {
    let field = format!("{prefix}.rate");
    if rate.is_fixed() {
        check_amount(rate.rate, &field, config, errors);
    } else if !is_valid_percentage(rate.rate) {
        errors.push(ValidationError::new(
            field.as_str(),
            format!("percentage must be between 0 and 100, got {}", rate.rate),
        ));
    }

    if rate.validity.is_inverted() {
        errors.push(ValidationError::new(
            format!("{prefix}.validity"),
            "valid_from must not be after valid_to",
        ));
    }
}

fn validate_group(
    group: &TaxGroup,
    snapshot: &PricingSnapshot,
    prefix: &str,
    errors: &mut Vec<ValidationError>,
) {
    for (i, member) in group.members.iter().enumerate() {
        if snapshot.tax_rate(member.rate_id).is_none() {
            errors.push(ValidationError::new(
                format!("{prefix}.members[{i}].rate_id"),
                format!("tax rate {} not found", member.rate_id),
            ));
        }
    }

    if group.validity.is_inverted() {
        errors.push(ValidationError::new(
            format!("{prefix}.validity"),
            "valid_from must not be after valid_to",
        ));
    }
}

fn validate_jurisdiction(
    jurisdiction: &TaxJurisdiction,
    snapshot: &PricingSnapshot,
    prefix: &str,
    errors: &mut Vec<ValidationError>,
) {
    if let Some(code) = &jurisdiction.country_code {
        if !is_known_country_code(code) {
            errors.push(ValidationError::new(
                format!("{prefix}.country_code"),
                format!("'{code}' is not a known ISO 3166-1 alpha-2 country code"),
            ));
        }
    }
    check_target(jurisdiction.target, snapshot, &format!("{prefix}.target"), errors);
}

fn validate_exemption(
    exemption: &TaxExemption,
    snapshot: &PricingSnapshot,
    prefix: &str,
    errors: &mut Vec<ValidationError>,
) {
    match (exemption.exemption_type, exemption.exemption_rate) {
        (ExemptionType::Partial, None) => {
            errors.push(ValidationError::new(
                format!("{prefix}.exemption_rate"),
                "partial exemption requires an exemption rate",
            ));
        }
        (_, Some(rate)) if !is_valid_percentage(rate) => {
            errors.push(ValidationError::new(
                format!("{prefix}.exemption_rate"),
                format!("percentage must be between 0 and 100, got {rate}"),
            ));
        }
        _ => {}
    }

    if exemption.validity.is_inverted() {
        errors.push(ValidationError::new(
            format!("{prefix}.validity"),
            "valid_from must not be after valid_to",
        ));
    }

    if let Some(target) = exemption.target {
        check_target(target, snapshot, &format!("{prefix}.target"), errors);
    }
}

fn check_target(
    target: TaxTarget,
    snapshot: &PricingSnapshot,
    field: &str,
    errors: &mut Vec<ValidationError>,
) {
    let exists = match target {
        TaxTarget::Rate(id) => snapshot.tax_rate(id).is_some(),
        TaxTarget::Group(id) => snapshot.tax_group(id).is_some(),
    };
    if !exists {
        errors.push(ValidationError::new(field, format!("{target} not found")));
    }
}

fn check_amount(
    amount: Decimal,
    field: &str,
    config: &EngineConfig,
    errors: &mut Vec<ValidationError>,
) {
    if amount.is_sign_negative() {
        errors.push(ValidationError::new(field, "amount must not be negative"));
    } else if amount > config.max_amount {
        errors.push(ValidationError::new(
            field,
            format!("amount {amount} exceeds maximum of {}", config.max_amount),
        ));
    }
}

fn check_quantity_window(
    min: Option<Decimal>,
    max: Option<Decimal>,
    prefix: &str,
    errors: &mut Vec<ValidationError>,
) {
    if let (Some(min), Some(max)) = (min, max) {
        if min > max {
            errors.push(ValidationError::new(
                format!("{prefix}.min_quantity"),
                format!("minimum quantity {min} exceeds maximum quantity {max}"),
            ));
        }
    }
}
