//! Exemption evaluator.
//!
//! An exemption applies when its entity matches, it is active and valid on
//! the evaluation day, and it is either unbound or bound to exactly the rate
//! or group being evaluated. A full exemption wins over partial ones; among
//! partial exemptions the one waiving the most applies (ties: lowest id).
//! Partial exemptions are never combined.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::types::{ExemptionType, TaxExemption};
use crate::core::numeric::{floor_zero, percent_of};
use crate::core::*;

/// Effect of the exemptions that apply to one tax target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExemptionEffect {
    #[default]
    None,
    Full {
        exemption_id: ExemptionId,
    },
    Partial {
        exemption_id: ExemptionId,
        /// Percentage of the tax waived.
        rate: Decimal,
    },
}

impl ExemptionEffect {
    pub fn exemption_id(&self) -> Option<ExemptionId> {
        match self {
            Self::None => None,
            Self::Full { exemption_id } | Self::Partial { exemption_id, .. } => Some(*exemption_id),
        }
    }

    /// Split a computed tax amount into `(payable, exempted)`.
    pub fn apply(&self, amount: Decimal) -> Result<(Decimal, Decimal), EngineError> {
        Ok(match self {
            Self::None => (amount, Decimal::ZERO),
            Self::Full { .. } => (Decimal::ZERO, amount),
            Self::Partial { rate, .. } => {
                let exempted = percent_of(amount, *rate)?.min(amount);
                (floor_zero(amount - exempted), exempted)
            }
        })
    }
}

/// Effect plus every exemption that matched, for audit and ambiguity reporting.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExemptionDecision {
    pub effect: ExemptionEffect,
    /// Matching exemption ids in ascending order.
    pub matched: Vec<ExemptionId>,
}

impl ExemptionDecision {
    /// More than one exemption matched the target.
    pub fn is_ambiguous(&self) -> bool {
        self.matched.len() > 1
    }
}

/// Whether a single exemption applies to `entity` and `target` at `now`.
pub fn exemption_applies(
    exemption: &TaxExemption,
    entity: &EntityRef,
    target: TaxTarget,
    now: NaiveDateTime,
) -> bool {
    exemption.is_active
        && exemption.entity == *entity
        && exemption.validity.contains(now)
        && exemption.target.is_none_or(|bound| bound == target)
}

/// Evaluate exemptions for a single entity reference.
pub fn evaluate_exemption(
    exemptions: &[TaxExemption],
    entity: &EntityRef,
    target: TaxTarget,
    now: NaiveDateTime,
) -> ExemptionEffect {
    evaluate_exemptions(exemptions, std::slice::from_ref(entity), target, now).effect
}

/// Evaluate exemptions for every entity a calculation involves (customer,
/// product, category, vendor) against one target.
pub fn evaluate_exemptions(
    exemptions: &[TaxExemption],
    entities: &[EntityRef],
    target: TaxTarget,
    now: NaiveDateTime,
) -> ExemptionDecision {
    let mut matching: Vec<&TaxExemption> = exemptions
        .iter()
        .filter(|e| entities.iter().any(|entity| exemption_applies(e, entity, target, now)))
        .collect();
    matching.sort_by_key(|e| e.id);

    let effect = choose_effect(&matching);
    let matched: Vec<ExemptionId> = matching.iter().map(|e| e.id).collect();

    if matched.len() > 1 {
        warn!(
            tax_target = %target,
            exemptions = ?matched,
            chosen = ?effect.exemption_id(),
            "multiple exemptions match; applying the most favorable"
        );
    }

    ExemptionDecision { effect, matched }
}

// `matching` is sorted by id, so `max_by` ties resolve to the lowest id via
// the reversed id comparison.
fn choose_effect(matching: &[&TaxExemption]) -> ExemptionEffect {
    if let Some(full) = matching
        .iter()
        .find(|e| e.exemption_type == ExemptionType::Full)
    {
        return ExemptionEffect::Full {
            exemption_id: full.id,
        };
    }

    matching
        .iter()
        .filter(|e| e.exemption_type == ExemptionType::Partial)
        .map(|e| (e.id, e.exemption_rate.unwrap_or(Decimal::ZERO)))
        .max_by(|(a_id, a_rate), (b_id, b_rate)| a_rate.cmp(b_rate).then(b_id.cmp(a_id)))
        .map(|(exemption_id, rate)| ExemptionEffect::Partial { exemption_id, rate })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tax::types::TaxExemptionBuilder;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 15)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    const CUSTOMER: EntityRef = EntityRef::Customer(CustomerId(1));
    const RATE: TaxTarget = TaxTarget::Rate(TaxRateId(1));

    #[test]
    fn no_exemptions_no_effect() {
        assert_eq!(evaluate_exemption(&[], &CUSTOMER, RATE, now()), ExemptionEffect::None);
    }

    #[test]
    fn entity_must_match() {
        let other_customer = EntityRef::Customer(CustomerId(2));
        let list = vec![TaxExemptionBuilder::full(ExemptionId(1), other_customer).build()];
        assert_eq!(evaluate_exemption(&list, &CUSTOMER, RATE, now()), ExemptionEffect::None);
        // same numeric id, different entity kind
        let product = EntityRef::Product(ProductId(1));
        let list = vec![TaxExemptionBuilder::full(ExemptionId(1), product).build()];
        assert_eq!(evaluate_exemption(&list, &CUSTOMER, RATE, now()), ExemptionEffect::None);
    }

    #[test]
    fn bound_exemption_only_for_its_target() {
        let list = vec![
            TaxExemptionBuilder::full(ExemptionId(1), CUSTOMER)
                .target(TaxTarget::Group(TaxGroupId(1)))
                .build(),
        ];
        assert_eq!(evaluate_exemption(&list, &CUSTOMER, RATE, now()), ExemptionEffect::None);
        assert_eq!(
            evaluate_exemption(&list, &CUSTOMER, TaxTarget::Group(TaxGroupId(1)), now()),
            ExemptionEffect::Full {
                exemption_id: ExemptionId(1)
            }
        );
    }

    #[test]
    fn expired_or_inactive_ignored() {
        let list = vec![
            TaxExemptionBuilder::full(ExemptionId(1), CUSTOMER)
                .valid(None, NaiveDate::from_ymd_opt(2024, 6, 14))
                .build(),
            TaxExemptionBuilder::full(ExemptionId(2), CUSTOMER).inactive().build(),
        ];
        assert_eq!(evaluate_exemption(&list, &CUSTOMER, RATE, now()), ExemptionEffect::None);
    }

    #[test]
    fn full_wins_over_partial() {
        let list = vec![
            TaxExemptionBuilder::partial(ExemptionId(1), CUSTOMER, dec!(80)).build(),
            TaxExemptionBuilder::full(ExemptionId(2), CUSTOMER).build(),
        ];
        let decision = evaluate_exemptions(&list, &[CUSTOMER], RATE, now());
        assert_eq!(
            decision.effect,
            ExemptionEffect::Full {
                exemption_id: ExemptionId(2)
            }
        );
        assert!(decision.is_ambiguous());
    }

    #[test]
    fn largest_partial_wins_without_combining() {
        let list = vec![
            TaxExemptionBuilder::partial(ExemptionId(1), CUSTOMER, dec!(20)).build(),
            TaxExemptionBuilder::partial(ExemptionId(2), CUSTOMER, dec!(50)).build(),
            TaxExemptionBuilder::partial(ExemptionId(3), CUSTOMER, dec!(50)).build(),
        ];
        let effect = evaluate_exemption(&list, &CUSTOMER, RATE, now());
        assert_eq!(
            effect,
            ExemptionEffect::Partial {
                exemption_id: ExemptionId(2),
                rate: dec!(50)
            }
        );
    }

    #[test]
    fn matches_across_context_entities() {
        let category = EntityRef::Category(CategoryId(9));
        let list = vec![TaxExemptionBuilder::partial(ExemptionId(4), category, dec!(25)).build()];
        let entities = [CUSTOMER, EntityRef::Product(ProductId(3)), category];
        let decision = evaluate_exemptions(&list, &entities, RATE, now());
        assert_eq!(decision.matched, vec![ExemptionId(4)]);
        assert!(!decision.is_ambiguous());
    }

    #[test]
    fn apply_effects() {
        let full = ExemptionEffect::Full {
            exemption_id: ExemptionId(1),
        };
        assert_eq!(full.apply(dec!(19)).unwrap(), (dec!(0), dec!(19)));

        let partial = ExemptionEffect::Partial {
            exemption_id: ExemptionId(1),
            rate: dec!(25),
        };
        assert_eq!(partial.apply(dec!(100)).unwrap(), (dec!(75), dec!(25)));
        assert_eq!(ExemptionEffect::None.apply(dec!(5)).unwrap(), (dec!(5), dec!(0)));
    }
}
