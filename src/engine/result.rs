//! Calculation results and their plain-text summary.

use std::fmt::Write as _;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::core::*;
use crate::tax::TaxComponent;

/// Tax contributed by one rate or group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxBreakdownLine {
    /// Id of the rate or group.
    pub source_id: u64,
    /// `"rate"` or `"group"`.
    pub source_type: String,
    pub target: TaxTarget,
    /// Jurisdiction that selected this source; `None` for a group override.
    pub jurisdiction_id: Option<JurisdictionId>,
    /// Amount the tax was computed from (the gross subtotal when inclusive).
    pub base: Decimal,
    /// Tax after exemptions, rounded to currency scale.
    pub amount: Decimal,
    /// Whether `amount` is contained in the subtotal.
    pub inclusive: bool,
    /// Tax waived by exemptions.
    pub exempted_amount: Decimal,
    /// Payable by the buyer; excluded from the grand total.
    pub reverse_charge: bool,
    /// Per-member amounts; unrounded.
    pub components: Vec<TaxComponent>,
}

/// Output of one calculation. All amounts are rounded half-up to the
/// configured currency scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationResult {
    pub tenant_id: Option<TenantId>,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
    pub tax_breakdown: Vec<TaxBreakdownLine>,
    /// Sum of the breakdown amounts.
    pub tax_total: Decimal,
    /// Portion of `tax_total` under reverse charge.
    pub reverse_charge_total: Decimal,
    /// Subtotal plus exclusive, non reverse-charge tax.
    pub grand_total: Decimal,
    pub applied_rule_ids: Vec<RuleId>,
    pub applied_tier_id: Option<TierId>,
    pub applied_exemption_ids: Vec<ExemptionId>,
    pub no_jurisdiction_matched: bool,
    #[serde(default)]
    pub warnings: Vec<CalculationWarning>,
}

impl CalculationResult {
    /// Tax contained in the subtotal.
    pub fn inclusive_tax(&self) -> Decimal {
        self.tax_breakdown
            .iter()
            .filter(|line| line.inclusive)
            .map(|line| line.amount)
            .sum()
    }

    /// Human-readable multi-line summary, stable across runs.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "unit_price: {}", self.unit_price);
        let _ = writeln!(out, "subtotal: {}", self.subtotal);
        let rules: Vec<String> = self.applied_rule_ids.iter().map(|id| id.to_string()).collect();
        let _ = writeln!(out, "rules: [{}]", rules.join(", "));
        if let Some(tier) = self.applied_tier_id {
            let _ = writeln!(out, "tier: {tier}");
        }
        for line in &self.tax_breakdown {
            let _ = write!(out, "tax {}: {} on {}", line.target, line.amount, line.base);
            if line.inclusive {
                out.push_str(" (inclusive)");
            }
            if line.reverse_charge {
                out.push_str(" (reverse charge)");
            }
            if !line.exempted_amount.is_zero() {
                let _ = write!(out, " exempted {}", line.exempted_amount);
            }
            out.push('\n');
        }
        if self.no_jurisdiction_matched {
            out.push_str("no jurisdiction matched\n");
        }
        let _ = writeln!(out, "tax_total: {}", self.tax_total);
        let _ = write!(out, "grand_total: {}", self.grand_total);
        out
    }
}
