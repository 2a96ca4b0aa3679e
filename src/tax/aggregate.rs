//! Tax aggregator.
//!
//! Every aggregation mode produces tax as an affine function of the net
//! amount, `tax = proportional * net + fixed`. Exclusive pricing evaluates
//! it at the base; inclusive pricing solves `gross = net + tax(net)` for the
//! net amount and extracts the difference. When several sources share one
//! gross amount, their inclusive levies are summed and solved together, and
//! exclusive sources are levied on the resulting net amount. Exemptions apply
//! after the raw amount is known.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::trace;

use super::exemption::ExemptionEffect;
use super::types::{ApplicationType, RateType, TaxGroup, TaxGroupRate, TaxRate};
use crate::core::numeric::{
    HUNDRED, checked_add, checked_mul, checked_sub, div_exact, div_scaled, floor_zero,
};
use crate::core::*;

/// Tax owed as a function of the net amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Levy {
    /// Fraction of the net amount (0.19 for 19%).
    pub proportional: Decimal,
    /// Amount independent of the net amount.
    pub fixed: Decimal,
}

impl Levy {
    /// The net amount itself, the starting running base of a compound group.
    const NET: Self = Self {
        proportional: Decimal::ONE,
        fixed: Decimal::ZERO,
    };

    /// Tax levied by `rate` on a running base.
    fn of_rate(rate: &TaxRate, running: Levy) -> Result<Self, EngineError> {
        Ok(match rate.rate_type {
            RateType::Fixed => Self {
                proportional: Decimal::ZERO,
                fixed: rate.rate,
            },
            RateType::Percentage => Self {
                proportional: div_exact(checked_mul(running.proportional, rate.rate)?, HUNDRED)?,
                fixed: div_exact(checked_mul(running.fixed, rate.rate)?, HUNDRED)?,
            },
        })
    }

    pub fn at(&self, net: Decimal) -> Result<Decimal, EngineError> {
        checked_add(checked_mul(self.proportional, net)?, self.fixed)
    }

    fn plus(self, other: Levy) -> Result<Self, EngineError> {
        Ok(Self {
            proportional: checked_add(self.proportional, other.proportional)?,
            fixed: checked_add(self.fixed, other.fixed)?,
        })
    }

    fn divided_by(self, n: Decimal) -> Result<Self, EngineError> {
        Ok(Self {
            proportional: div_exact(self.proportional, n)?,
            fixed: div_exact(self.fixed, n)?,
        })
    }

    fn sum<'a>(levies: impl IntoIterator<Item = &'a Levy>) -> Result<Self, EngineError> {
        levies
            .into_iter()
            .try_fold(Levy::default(), |acc, levy| acc.plus(*levy))
    }
}

/// One member rate's share of a group's tax.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxComponent {
    pub rate_id: TaxRateId,
    pub rate: Decimal,
    pub rate_type: RateType,
    pub amount: Decimal,
}

/// A group together with its effective member rates, in sequence order.
#[derive(Debug, Clone)]
pub struct ResolvedGroup<'a> {
    pub group: &'a TaxGroup,
    pub members: Vec<(&'a TaxGroupRate, &'a TaxRate)>,
}

/// What tax is computed for.
#[derive(Debug, Clone)]
pub enum TaxSource<'a> {
    /// A single rate; `inclusive` comes from the calculation context.
    Rate { rate: &'a TaxRate, inclusive: bool },
    /// A group; inclusiveness comes from the group.
    Group(ResolvedGroup<'a>),
}

impl TaxSource<'_> {
    pub fn target(&self) -> TaxTarget {
        match self {
            Self::Rate { rate, .. } => TaxTarget::Rate(rate.id),
            Self::Group(resolved) => TaxTarget::Group(resolved.group.id),
        }
    }

    pub fn is_inclusive(&self) -> bool {
        match self {
            Self::Rate { inclusive, .. } => *inclusive,
            Self::Group(resolved) => resolved.group.is_inclusive,
        }
    }
}

/// Unrounded tax computed for one source.
#[derive(Debug, Clone, PartialEq)]
pub struct TaxComputation {
    pub target: TaxTarget,
    /// Amount the tax was computed from (gross when inclusive).
    pub base: Decimal,
    /// Net amount the tax is levied on.
    pub taxable: Decimal,
    /// Tax before exemptions.
    pub raw_amount: Decimal,
    /// Tax after exemptions.
    pub amount: Decimal,
    /// Tax waived by exemptions.
    pub exempted_amount: Decimal,
    pub inclusive: bool,
    pub components: Vec<TaxComponent>,
}

/// Compute the tax for `base` under `source`, then apply `effect`.
///
/// `internal_scale` bounds the precision of the extracted net amount for
/// inclusive pricing.
pub fn compute_tax(
    base: Decimal,
    source: &TaxSource<'_>,
    effect: ExemptionEffect,
    internal_scale: u32,
) -> Result<TaxComputation, EngineError> {
    compute_taxes(base, &[(source, effect)], internal_scale)?
        .pop()
        .ok_or_else(|| EngineError::InvalidInput("no tax source to compute".into()))
}

/// Compute the tax of every source levied on the same `base`, in order.
///
/// Inclusive sources are extracted together: the net amount solves
/// `base = net + sum(inclusive levies)(net)`, and the last inclusive source
/// takes the rounding residual so that net plus inclusive tax equals `base`.
/// Exclusive sources are levied on that net amount.
pub fn compute_taxes(
    base: Decimal,
    sources: &[(&TaxSource<'_>, ExemptionEffect)],
    internal_scale: u32,
) -> Result<Vec<TaxComputation>, EngineError> {
    let base = floor_zero(base);
    let parts = sources
        .iter()
        .map(|(source, _)| member_levies(source))
        .collect::<Result<Vec<_>, _>>()?;
    let totals = parts
        .iter()
        .map(|members| Levy::sum(members.iter().map(|(_, levy)| levy)))
        .collect::<Result<Vec<_>, _>>()?;

    let last_inclusive = sources.iter().rposition(|(source, _)| source.is_inclusive());
    let net = match last_inclusive {
        Some(_) => {
            let inclusive = Levy::sum(
                sources
                    .iter()
                    .zip(&totals)
                    .filter(|((source, _), _)| source.is_inclusive())
                    .map(|(_, total)| total),
            )?;
            floor_zero(div_scaled(
                checked_sub(base, inclusive.fixed)?,
                checked_add(Decimal::ONE, inclusive.proportional)?,
                internal_scale,
            )?)
        }
        None => base,
    };

    let mut extracted = Decimal::ZERO;
    let mut computed = Vec::with_capacity(sources.len());
    for (i, ((source, effect), (members, total))) in
        sources.iter().zip(parts.iter().zip(&totals)).enumerate()
    {
        let inclusive = source.is_inclusive();
        let raw_amount = if last_inclusive == Some(i) {
            floor_zero(base - net - extracted)
        } else {
            total.at(net)?
        };
        if inclusive {
            extracted = checked_add(extracted, raw_amount)?;
        }

        let components = members
            .iter()
            .map(|(rate, levy)| -> Result<TaxComponent, EngineError> {
                Ok(TaxComponent {
                    rate_id: rate.id,
                    rate: rate.rate,
                    rate_type: rate.rate_type,
                    amount: levy.at(net)?,
                })
            })
            .collect::<Result<Vec<_>, EngineError>>()?;
        for c in &components {
            trace!(rate_id = %c.rate_id, rate = %c.rate, amount = %c.amount, "tax component");
        }

        let (amount, exempted_amount) = effect.apply(raw_amount)?;
        computed.push(TaxComputation {
            target: source.target(),
            base: if inclusive { base } else { net },
            taxable: net,
            raw_amount,
            amount,
            exempted_amount,
            inclusive,
            components,
        });
    }
    Ok(computed)
}

/// Each contributing rate and the levy it adds to the total.
fn member_levies<'a>(source: &TaxSource<'a>) -> Result<Vec<(&'a TaxRate, Levy)>, EngineError> {
    match source {
        TaxSource::Rate { rate, .. } => Ok(vec![(*rate, Levy::of_rate(rate, Levy::NET)?)]),
        TaxSource::Group(resolved) => match resolved.group.application_type {
            ApplicationType::Compound => compound(&resolved.members),
            ApplicationType::Stacked => stacked(&resolved.members),
            ApplicationType::Highest => highest(&resolved.members),
            ApplicationType::Average => average(&resolved.members),
        },
    }
}

type Members<'a> = [(&'a TaxGroupRate, &'a TaxRate)];
type Share<'a> = Result<(&'a TaxRate, Levy), EngineError>;
type Levies<'a> = Result<Vec<(&'a TaxRate, Levy)>, EngineError>;

// The running base accumulates every previous member's tax; members with
// `apply_on_previous` are levied on it, the others on the net amount.
fn compound<'a>(members: &Members<'a>) -> Levies<'a> {
    let mut running = Levy::NET;
    members
        .iter()
        .map(|(membership, rate)| -> Share<'a> {
            let on = if membership.apply_on_previous {
                running
            } else {
                Levy::NET
            };
            let levy = Levy::of_rate(rate, on)?;
            running = running.plus(levy)?;
            Ok((*rate, levy))
        })
        .collect()
}

fn stacked<'a>(members: &Members<'a>) -> Levies<'a> {
    members
        .iter()
        .map(|(_, rate)| -> Share<'a> { Ok((*rate, Levy::of_rate(rate, Levy::NET)?)) })
        .collect()
}

// Ties keep the member with the lower sequence.
fn highest<'a>(members: &Members<'a>) -> Levies<'a> {
    let mut best: Option<&'a TaxRate> = None;
    for (_, rate) in members {
        if best.is_none_or(|b| rate.rate > b.rate) {
            best = Some(*rate);
        }
    }
    best.map(|rate| -> Share<'a> { Ok((rate, Levy::of_rate(rate, Levy::NET)?)) })
        .into_iter()
        .collect()
}

// Each member contributes 1/n of its stand-alone levy, which for percentage
// members equals levying the mean rate.
fn average<'a>(members: &Members<'a>) -> Levies<'a> {
    if members.is_empty() {
        return Ok(Vec::new());
    }
    let n = Decimal::from(members.len());
    members
        .iter()
        .map(|(_, rate)| -> Share<'a> {
            Ok((*rate, Levy::of_rate(rate, Levy::NET)?.divided_by(n)?))
        })
        .collect()
}
