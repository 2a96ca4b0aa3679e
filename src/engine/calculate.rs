//! Calculation orchestrator.
//!
//! A calculation runs in fixed order: validate the context, filter rule and
//! tier candidates, resolve the unit price, compute the subtotal, resolve the
//! tax sources (override group or matching jurisdictions), evaluate
//! exemptions per source, aggregate tax, and assemble the rounded result.
//! The engine is read-only after construction and can be shared across
//! threads.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use tracing::{debug, debug_span, warn};

use super::result::{CalculationResult, TaxBreakdownLine};
use super::snapshot::PricingSnapshot;
use super::validation::validate_context;
use crate::core::numeric::{checked_add, round_to_scale};
use crate::core::*;
use crate::pricing::{PriceResolution, filter_rules, filter_tiers, resolve_price};
use crate::tax::{
    ExemptionEffect, ResolvedGroup, TaxGroup, TaxJurisdiction, TaxSource, compute_taxes,
    evaluate_exemptions, resolve_jurisdictions,
};

/// Evaluates calculation contexts against a validated snapshot.
#[derive(Debug, Clone)]
pub struct PricingEngine {
    snapshot: PricingSnapshot,
    config: EngineConfig,
}

/// A tax source together with the jurisdiction that selected it.
struct SelectedSource<'a> {
    jurisdiction: Option<&'a TaxJurisdiction>,
    source: TaxSource<'a>,
}

impl PricingEngine {
    /// Validate `config` and `snapshot` (against the config's limits) and
    /// build an engine.
    pub fn new(snapshot: PricingSnapshot, config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        snapshot.validate_with(&config)?;
        debug!(
            rules = snapshot.rules.len(),
            tiers = snapshot.tiers.len(),
            tax_rates = snapshot.tax_rates.len(),
            tax_groups = snapshot.tax_groups.len(),
            jurisdictions = snapshot.jurisdictions.len(),
            exemptions = snapshot.exemptions.len(),
            "pricing engine ready"
        );
        Ok(Self { snapshot, config })
    }

    pub fn snapshot(&self) -> &PricingSnapshot {
        &self.snapshot
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Resolve only the unit price (rules and tier), without tax.
    pub fn resolve_unit_price(
        &self,
        ctx: &CalculationContext,
    ) -> Result<PriceResolution, EngineError> {
        validate_context(ctx, &self.config)?;
        self.check_references(ctx)?;
        self.price(ctx)
    }

    /// Run a full price and tax calculation.
    pub fn calculate(&self, ctx: &CalculationContext) -> Result<CalculationResult, EngineError> {
        let span = debug_span!(
            "calculate",
            product_id = %ctx.product_id,
            tenant_id = ?ctx.tenant_id.map(|t| t.0)
        );
        let _guard = span.enter();

        validate_context(ctx, &self.config)?;
        self.check_references(ctx)?;

        let scale = self.config.currency_scale;
        let resolution = self.price(ctx)?;

        let raw_subtotal = resolution
            .unit_price
            .checked_mul(ctx.quantity)
            .ok_or_else(|| EngineError::InvalidInput("subtotal overflows".into()))?;
        if raw_subtotal > self.config.max_amount {
            return Err(EngineError::InvalidInput(format!(
                "subtotal {raw_subtotal} exceeds maximum of {}",
                self.config.max_amount
            )));
        }
        let unit_price = round_to_scale(resolution.unit_price, scale);
        let subtotal = round_to_scale(raw_subtotal, scale);

        let now = ctx.evaluated_at;
        let (sources, no_jurisdiction_matched) = self.tax_sources(ctx, now)?;

        let mut warnings = Vec::new();
        if no_jurisdiction_matched {
            debug!("no tax jurisdiction matched; tax is zero");
            if self.config.require_jurisdiction {
                warn!(location = ?ctx.location, "no tax jurisdiction matched the location");
                warnings.push(CalculationWarning::NoJurisdictionMatched);
            }
        }

        let entities = ctx.entity_refs();
        let mut applied_exemption_ids: Vec<ExemptionId> = Vec::new();
        let mut requests: Vec<(&TaxSource<'_>, ExemptionEffect)> =
            Vec::with_capacity(sources.len());

        for selected in &sources {
            let target = selected.source.target();
            let decision = evaluate_exemptions(&self.snapshot.exemptions, &entities, target, now);
            if decision.is_ambiguous() {
                if let Some(chosen) = decision.effect.exemption_id() {
                    warnings.push(CalculationWarning::AmbiguousExemption {
                        target,
                        exemption_ids: decision.matched.clone(),
                        chosen,
                    });
                }
            }
            if let Some(id) = decision.effect.exemption_id() {
                if !applied_exemption_ids.contains(&id) {
                    applied_exemption_ids.push(id);
                }
            }
            requests.push((&selected.source, decision.effect));
        }

        let computed = compute_taxes(subtotal, &requests, self.config.internal_scale)?;
        let tax_breakdown: Vec<TaxBreakdownLine> = sources
            .iter()
            .zip(computed)
            .map(|(selected, computed)| TaxBreakdownLine {
                source_id: computed.target.source_id(),
                source_type: computed.target.source_type().to_string(),
                target: computed.target,
                jurisdiction_id: selected.jurisdiction.map(|j| j.id),
                base: round_to_scale(computed.base, scale),
                amount: round_to_scale(computed.amount, scale),
                inclusive: computed.inclusive,
                exempted_amount: round_to_scale(computed.exempted_amount, scale),
                reverse_charge: selected.jurisdiction.is_some_and(|j| j.is_reverse_charge),
                components: computed.components,
            })
            .collect();

        let tax_total = line_total(&tax_breakdown, |_| true)?;
        let reverse_charge_total = line_total(&tax_breakdown, |line| line.reverse_charge)?;
        let exclusive_tax =
            line_total(&tax_breakdown, |line| !line.inclusive && !line.reverse_charge)?;
        let tax_total = round_to_scale(tax_total, scale);
        let reverse_charge_total = round_to_scale(reverse_charge_total, scale);
        let grand_total = round_to_scale(checked_add(subtotal, exclusive_tax)?, scale);

        debug!(
            unit_price = %unit_price,
            subtotal = %subtotal,
            tax_total = %tax_total,
            grand_total = %grand_total,
            "calculation complete"
        );

        Ok(CalculationResult {
            tenant_id: ctx.tenant_id,
            unit_price,
            subtotal,
            tax_breakdown,
            tax_total,
            reverse_charge_total,
            grand_total,
            applied_rule_ids: resolution.applied_rule_ids,
            applied_tier_id: resolution.applied_tier_id,
            applied_exemption_ids,
            no_jurisdiction_matched,
            warnings,
        })
    }

    fn check_references(&self, ctx: &CalculationContext) -> Result<(), EngineError> {
        if !self.snapshot.has_product(ctx.product_id) {
            return Err(EngineError::not_found(EntityKind::Product, ctx.product_id));
        }
        if let Some(customer) = ctx.customer_id {
            if !self.snapshot.has_customer(customer) {
                return Err(EngineError::not_found(EntityKind::Customer, customer));
            }
        }
        if let Some(group) = ctx.tax_group_override_id {
            if self.snapshot.tax_group(group).is_none() {
                return Err(EngineError::not_found(EntityKind::TaxGroup, group));
            }
        }
        Ok(())
    }

    fn price(&self, ctx: &CalculationContext) -> Result<PriceResolution, EngineError> {
        let candidates = filter_rules(
            &self.snapshot.rules,
            ctx,
            ctx.evaluated_at,
            self.config.time_window_mode,
        );
        let candidate_ids: Vec<RuleId> = candidates.iter().map(|r| r.id).collect();
        let tiers = filter_tiers(&self.snapshot.tiers, ctx, &candidate_ids);
        resolve_price(&candidates, &tiers, ctx.base_price, ctx.quantity)
    }

    /// Tax sources for the context, and whether no jurisdiction matched.
    fn tax_sources(
        &self,
        ctx: &CalculationContext,
        now: NaiveDateTime,
    ) -> Result<(Vec<SelectedSource<'_>>, bool), EngineError> {
        if let Some(group_id) = ctx.tax_group_override_id {
            let group = self
                .snapshot
                .tax_group(group_id)
                .ok_or_else(|| EngineError::not_found(EntityKind::TaxGroup, group_id))?;
            let sources = self
                .resolve_group(group, now)
                .map(|resolved| SelectedSource {
                    jurisdiction: None,
                    source: TaxSource::Group(resolved),
                })
                .into_iter()
                .collect();
            return Ok((sources, false));
        }

        let mut matched = resolve_jurisdictions(&self.snapshot.jurisdictions, &ctx.location);
        if self.config.jurisdiction_mode == JurisdictionMode::TopRanked {
            matched.truncate(1);
        }
        let no_match = matched.is_empty();

        let mut sources = Vec::with_capacity(matched.len());
        for jurisdiction in matched {
            let source = match jurisdiction.target {
                TaxTarget::Rate(rate_id) => {
                    let rate = self
                        .snapshot
                        .tax_rate(rate_id)
                        .ok_or_else(|| EngineError::not_found(EntityKind::TaxRate, rate_id))?;
                    if !rate.is_effective(now) {
                        debug!(rate_id = %rate_id, "tax rate not effective; skipped");
                        continue;
                    }
                    TaxSource::Rate {
                        rate,
                        inclusive: ctx.prices_include_tax,
                    }
                }
                TaxTarget::Group(group_id) => {
                    let group = self
                        .snapshot
                        .tax_group(group_id)
                        .ok_or_else(|| EngineError::not_found(EntityKind::TaxGroup, group_id))?;
                    match self.resolve_group(group, now) {
                        Some(resolved) => TaxSource::Group(resolved),
                        None => continue,
                    }
                }
            };
            sources.push(SelectedSource {
                jurisdiction: Some(jurisdiction),
                source,
            });
        }
        Ok((sources, no_match))
    }

    /// The group with its effective members, or `None` if the group itself
    /// is inactive or outside its validity window.
    fn resolve_group<'a>(
        &'a self,
        group: &'a TaxGroup,
        now: NaiveDateTime,
    ) -> Option<ResolvedGroup<'a>> {
        if !group.is_effective(now) {
            debug!(group_id = %group.id, "tax group not effective; skipped");
            return None;
        }
        let members = group
            .ordered_members()
            .into_iter()
            .filter_map(|membership| {
                self.snapshot
                    .tax_rate(membership.rate_id)
                    .filter(|rate| rate.is_effective(now))
                    .map(|rate| (membership, rate))
            })
            .collect();
        Some(ResolvedGroup { group, members })
    }
}

fn line_total(
    lines: &[TaxBreakdownLine],
    include: impl Fn(&TaxBreakdownLine) -> bool,
) -> Result<Decimal, EngineError> {
    lines
        .iter()
        .filter(|line| include(line))
        .try_fold(Decimal::ZERO, |acc, line| checked_add(acc, line.amount))
}
