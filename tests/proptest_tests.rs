//! Property-based tests for the tarif crate.
//!
//! Run with: `cargo test --test proptest_tests`

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tarif::core::*;
use tarif::engine::*;
use tarif::pricing::*;
use tarif::tax::*;

fn engine(rules: Vec<PricingRule>, group: ApplicationType, inclusive: bool) -> PricingEngine {
    let mut group = TaxGroupBuilder::new(TaxGroupId(1), group)
        .member(TaxRateId(1))
        .member_on_previous(TaxRateId(2))
        .member(TaxRateId(3));
    if inclusive {
        group = group.inclusive();
    }
    let mut builder = PricingSnapshotBuilder::new()
        .product(ProductId(1))
        .tax_rate(TaxRateBuilder::new(TaxRateId(1), dec!(19)).build())
        .tax_rate(TaxRateBuilder::new(TaxRateId(2), dec!(7.5)).build())
        .tax_rate(TaxRateBuilder::new(TaxRateId(3), dec!(0.50)).fixed().build())
        .tax_group(group.build())
        .jurisdiction(
            TaxJurisdictionBuilder::new(JurisdictionId(1), TaxTarget::Group(TaxGroupId(1))).build(),
        );
    for rule in rules {
        builder = builder.rule(rule);
    }
    PricingEngine::new(builder.build().unwrap(), EngineConfig::default()).unwrap()
}

fn context(qty: Decimal, price: Decimal) -> CalculationContext {
    let now = NaiveDate::from_ymd_opt(2024, 6, 15)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap();
    CalculationContextBuilder::new(ProductId(1), qty, price, now).build()
}

// ── Proptest Strategies ─────────────────────────────────────────────────────

/// Price from 0.01 to 99999.99.
fn arb_price() -> impl Strategy<Value = Decimal> {
    (1u64..10_000_000u64).prop_map(|cents| Decimal::new(cents as i64, 2))
}

/// Quantity from 0.001 to 100.
fn arb_quantity() -> impl Strategy<Value = Decimal> {
    (1u64..=100_000u64).prop_map(|milli| Decimal::new(milli as i64, 3))
}

/// Percentage from 0.00 to 100.00.
fn arb_percentage() -> impl Strategy<Value = Decimal> {
    (0u64..=10_000u64).prop_map(|bp| Decimal::new(bp as i64, 2))
}

fn arb_rule(id: u64) -> impl Strategy<Value = PricingRule> {
    (
        prop_oneof![
            Just(PricingMethod::Markup),
            Just(PricingMethod::Markdown),
            Just(PricingMethod::Discount),
            Just(PricingMethod::Fixed),
        ],
        any::<bool>(),
        arb_percentage(),
        arb_price(),
        -5i32..5,
        any::<bool>(),
    )
        .prop_map(move |(method, flat, pct, amount, priority, compounding)| {
            let mut builder = PricingRuleBuilder::new(RuleId(id), method).priority(priority);
            builder = match method {
                PricingMethod::Fixed => builder.fixed_price(amount),
                _ if flat => builder.adjustment(AdjustmentType::Flat, amount),
                _ => builder.adjustment(AdjustmentType::Percentage, pct),
            };
            if compounding {
                builder = builder.compounding();
            }
            builder.build()
        })
}

fn arb_rules() -> impl Strategy<Value = Vec<PricingRule>> {
    (0u64..=4).prop_flat_map(|n| (1..=n).map(arb_rule).collect::<Vec<_>>())
}

fn arb_mode() -> impl Strategy<Value = ApplicationType> {
    prop_oneof![
        Just(ApplicationType::Compound),
        Just(ApplicationType::Stacked),
        Just(ApplicationType::Highest),
        Just(ApplicationType::Average),
    ]
}

// ── Property Tests ──────────────────────────────────────────────────────────

proptest! {
    /// Unit price, every tax amount and the grand total are never negative.
    #[test]
    fn amounts_are_non_negative(
        rules in arb_rules(),
        mode in arb_mode(),
        inclusive in any::<bool>(),
        qty in arb_quantity(),
        price in arb_price(),
    ) {
        let e = engine(rules, mode, inclusive);
        let result = e.calculate(&context(qty, price)).unwrap();
        prop_assert!(result.unit_price >= Decimal::ZERO);
        prop_assert!(result.grand_total >= Decimal::ZERO);
        for line in &result.tax_breakdown {
            prop_assert!(line.amount >= Decimal::ZERO, "{:?}", line);
        }
    }

    /// Repeated calculation yields identical serialized results.
    #[test]
    fn calculation_is_idempotent(
        rules in arb_rules(),
        mode in arb_mode(),
        qty in arb_quantity(),
        price in arb_price(),
    ) {
        let e = engine(rules, mode, false);
        let ctx = context(qty, price);
        let first = serde_json::to_string(&e.calculate(&ctx).unwrap()).unwrap();
        let second = serde_json::to_string(&e.calculate(&ctx).unwrap()).unwrap();
        prop_assert_eq!(first, second);
    }

    /// tax_total is the sum of the rounded breakdown and grand_total adds
    /// only exclusive tax.
    #[test]
    fn totals_match_breakdown(
        mode in arb_mode(),
        inclusive in any::<bool>(),
        qty in arb_quantity(),
        price in arb_price(),
    ) {
        let e = engine(Vec::new(), mode, inclusive);
        let result = e.calculate(&context(qty, price)).unwrap();
        let sum: Decimal = result.tax_breakdown.iter().map(|l| l.amount).sum();
        prop_assert_eq!(result.tax_total, sum);
        let expected = if inclusive { result.subtotal } else { result.subtotal + sum };
        prop_assert_eq!(result.grand_total, expected);
        prop_assert_eq!(result.grand_total.scale(), 2);
    }

    /// A flat and a percentage adjustment do not commute: swapping their
    /// priorities changes the price whenever both are non-trivial.
    #[test]
    fn flat_and_percentage_do_not_commute(
        flat in 1u64..10_000u64,
        pct in 1u64..=99u64,
        price in arb_price(),
    ) {
        let flat = Decimal::new(flat as i64, 2);
        let pct = Decimal::from(pct);
        let rules = |flat_priority: i32, pct_priority: i32| {
            vec![
                PricingRuleBuilder::new(RuleId(1), PricingMethod::Markup)
                    .adjustment(AdjustmentType::Flat, flat)
                    .priority(flat_priority)
                    .compounding()
                    .build(),
                PricingRuleBuilder::new(RuleId(2), PricingMethod::Markup)
                    .adjustment(AdjustmentType::Percentage, pct)
                    .priority(pct_priority)
                    .compounding()
                    .build(),
            ]
        };
        let flat_first = rules(2, 1);
        let pct_first = rules(1, 2);
        let flat_first: Vec<&PricingRule> = flat_first.iter().collect();
        let pct_first: Vec<&PricingRule> = pct_first.iter().collect();
        let a = resolve_price(&flat_first, &[], price, dec!(1)).unwrap();
        let b = resolve_price(&pct_first, &[], price, dec!(1)).unwrap();
        // (p + f)(1 + r) - (p(1 + r) + f) = f * r
        prop_assert_eq!(a.unit_price - b.unit_price, flat * pct / dec!(100));
    }

    /// A full exemption always zeroes the tax and reports the waived amount.
    #[test]
    fn full_exemption_zeroes_tax(mode in arb_mode(), price in arb_price()) {
        let mut snapshot = engine(Vec::new(), mode, false).snapshot().clone();
        snapshot.customers.insert(CustomerId(1));
        snapshot.exemptions.push(
            TaxExemptionBuilder::full(ExemptionId(1), EntityRef::Customer(CustomerId(1))).build(),
        );
        let e = PricingEngine::new(snapshot, EngineConfig::default()).unwrap();

        let taxed = e.calculate(&context(dec!(1), price)).unwrap();
        let mut ctx = context(dec!(1), price);
        ctx.customer_id = Some(CustomerId(1));
        let exempt = e.calculate(&ctx).unwrap();

        prop_assert_eq!(exempt.tax_total, Decimal::ZERO);
        prop_assert_eq!(exempt.tax_breakdown[0].exempted_amount, taxed.tax_total);
    }
}
