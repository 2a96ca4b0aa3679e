//! Tax rates, groups, jurisdictions and exemptions.
//!
//! Rates, groups and exemptions carry an activity flag and a validity
//! window; `is_effective` combines both for rates and groups.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::core::*;

/// Whether a tax rate is a percentage of the base or a fixed amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateType {
    #[default]
    Percentage,
    Fixed,
}

/// A single tax rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxRate {
    pub id: TaxRateId,
    #[serde(default)]
    pub name: Option<String>,
    /// Percentage (e.g. 19 for 19%), or an amount for [`RateType::Fixed`].
    pub rate: Decimal,
    #[serde(default, rename = "type")]
    pub rate_type: RateType,
    #[serde(default)]
    pub validity: ValidityWindow,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl TaxRate {
    pub fn is_fixed(&self) -> bool {
        self.rate_type == RateType::Fixed
    }

    /// Active and valid on the day of `now`.
    pub fn is_effective(&self, now: chrono::NaiveDateTime) -> bool {
        self.is_active && self.validity.contains(now)
    }
}

/// How the member rates of a tax group combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationType {
    /// Members in sequence order; `apply_on_previous` members tax the running base.
    Compound,
    /// Every member taxes the original base; amounts are summed.
    Stacked,
    /// Only the member with the highest rate applies.
    Highest,
    /// The mean of the member rates applies.
    Average,
}

/// Membership of a tax rate in a group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxGroupRate {
    pub rate_id: TaxRateId,
    pub sequence: u32,
    #[serde(default)]
    pub apply_on_previous: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

/// An ordered bundle of tax rates evaluated under one aggregation algorithm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxGroup {
    pub id: TaxGroupId,
    #[serde(default)]
    pub name: Option<String>,
    pub members: Vec<TaxGroupRate>,
    pub application_type: ApplicationType,
    #[serde(default)]
    pub is_inclusive: bool,
    #[serde(default)]
    pub validity: ValidityWindow,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl TaxGroup {
    pub fn is_effective(&self, now: chrono::NaiveDateTime) -> bool {
        self.is_active && self.validity.contains(now)
    }

    /// Active memberships ordered by sequence (stable for equal sequences).
    pub fn ordered_members(&self) -> Vec<&TaxGroupRate> {
        let mut members: Vec<&TaxGroupRate> = self.members.iter().filter(|m| m.is_active).collect();
        members.sort_by_key(|m| m.sequence);
        members
    }
}

/// Location-scoped binding from a geographic predicate to a rate or group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxJurisdiction {
    pub id: JurisdictionId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub country_code: Option<String>,
    #[serde(default)]
    pub state_code: Option<String>,
    #[serde(default)]
    pub city_name: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub priority: i32,
    pub target: TaxTarget,
    /// Liability shifts to the buyer; the amount is still computed and flagged.
    #[serde(default)]
    pub is_reverse_charge: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl TaxJurisdiction {
    /// Number of non-wildcard location predicates.
    pub fn specificity(&self) -> usize {
        [
            &self.country_code,
            &self.state_code,
            &self.city_name,
            &self.postal_code,
        ]
        .iter()
        .filter(|field| field.is_some())
        .count()
    }
}

/// Full or partial waiver of tax.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExemptionType {
    Full,
    Partial,
}

/// Tax waiver granted to a customer, product, category or vendor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxExemption {
    pub id: ExemptionId,
    pub entity: EntityRef,
    pub exemption_type: ExemptionType,
    /// Percentage of the tax waived, for partial exemptions.
    #[serde(default)]
    pub exemption_rate: Option<Decimal>,
    #[serde(default)]
    pub validity: ValidityWindow,
    /// Restricts the exemption to one rate or group; `None` applies to all.
    #[serde(default)]
    pub target: Option<TaxTarget>,
    /// Certificate or reference number, for audit.
    #[serde(default)]
    pub certificate: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

/// Builder for [`TaxRate`]. Defaults to an always-valid percentage rate.
pub struct TaxRateBuilder {
    rate: TaxRate,
}

impl TaxRateBuilder {
    pub fn new(id: TaxRateId, rate: Decimal) -> Self {
        Self {
            rate: TaxRate {
                id,
                name: None,
                rate,
                rate_type: RateType::Percentage,
                validity: ValidityWindow::ALWAYS,
                is_active: true,
            },
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.rate.name = Some(name.into());
        self
    }

    pub fn fixed(mut self) -> Self {
        self.rate.rate_type = RateType::Fixed;
        self
    }

    pub fn valid(mut self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        self.rate.validity = ValidityWindow::new(from, to);
        self
    }

    pub fn inactive(mut self) -> Self {
        self.rate.is_active = false;
        self
    }

    pub fn build(self) -> TaxRate {
        self.rate
    }
}

/// Builder for [`TaxGroup`]. Members get sequence numbers in insertion order.
///
/// ```
/// use rust_decimal_macros::dec;
/// use tarif::core::*;
/// use tarif::tax::*;
///
/// let group = TaxGroupBuilder::new(TaxGroupId(1), ApplicationType::Compound)
///     .member(TaxRateId(1))
///     .member_on_previous(TaxRateId(2))
///     .build();
///
/// assert_eq!(group.members[1].sequence, 2);
/// assert!(group.members[1].apply_on_previous);
/// ```
pub struct TaxGroupBuilder {
    group: TaxGroup,
}

impl TaxGroupBuilder {
    pub fn new(id: TaxGroupId, application_type: ApplicationType) -> Self {
        Self {
            group: TaxGroup {
                id,
                name: None,
                members: Vec::new(),
                application_type,
                is_inclusive: false,
                validity: ValidityWindow::ALWAYS,
                is_active: true,
            },
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.group.name = Some(name.into());
        self
    }

    fn push(mut self, rate_id: TaxRateId, apply_on_previous: bool) -> Self {
        let sequence = self.group.members.len() as u32 + 1;
        self.group.members.push(TaxGroupRate {
            rate_id,
            sequence,
            apply_on_previous,
            is_active: true,
        });
        self
    }

    pub fn member(self, rate_id: TaxRateId) -> Self {
        self.push(rate_id, false)
    }

    /// Add a member that taxes the running base including previous members' tax.
    pub fn member_on_previous(self, rate_id: TaxRateId) -> Self {
        self.push(rate_id, true)
    }

    pub fn membership(mut self, membership: TaxGroupRate) -> Self {
        self.group.members.push(membership);
        self
    }

    pub fn inclusive(mut self) -> Self {
        self.group.is_inclusive = true;
        self
    }

    pub fn valid(mut self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        self.group.validity = ValidityWindow::new(from, to);
        self
    }

    pub fn inactive(mut self) -> Self {
        self.group.is_active = false;
        self
    }

    pub fn build(self) -> TaxGroup {
        self.group
    }
}

/// Builder for [`TaxJurisdiction`]. Without location predicates it matches everywhere.
pub struct TaxJurisdictionBuilder {
    jurisdiction: TaxJurisdiction,
}

impl TaxJurisdictionBuilder {
    pub fn new(id: JurisdictionId, target: TaxTarget) -> Self {
        Self {
            jurisdiction: TaxJurisdiction {
                id,
                name: None,
                country_code: None,
                state_code: None,
                city_name: None,
                postal_code: None,
                priority: 0,
                target,
                is_reverse_charge: false,
                is_active: true,
            },
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.jurisdiction.name = Some(name.into());
        self
    }

    pub fn country(mut self, code: impl Into<String>) -> Self {
        self.jurisdiction.country_code = Some(code.into());
        self
    }

    pub fn state(mut self, code: impl Into<String>) -> Self {
        self.jurisdiction.state_code = Some(code.into());
        self
    }

    pub fn city(mut self, name: impl Into<String>) -> Self {
        self.jurisdiction.city_name = Some(name.into());
        self
    }

    pub fn postal_code(mut self, code: impl Into<String>) -> Self {
        self.jurisdiction.postal_code = Some(code.into());
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.jurisdiction.priority = priority;
        self
    }

    pub fn reverse_charge(mut self) -> Self {
        self.jurisdiction.is_reverse_charge = true;
        self
    }

    pub fn inactive(mut self) -> Self {
        self.jurisdiction.is_active = false;
        self
    }

    pub fn build(self) -> TaxJurisdiction {
        self.jurisdiction
    }
}

/// Builder for [`TaxExemption`].
pub struct TaxExemptionBuilder {
    exemption: TaxExemption,
}

impl TaxExemptionBuilder {
    /// A full exemption for `entity`, unbound to any rate or group.
    pub fn full(id: ExemptionId, entity: EntityRef) -> Self {
        Self::with_type(id, entity, ExemptionType::Full, None)
    }

    /// A partial exemption waiving `rate` percent of the tax.
    pub fn partial(id: ExemptionId, entity: EntityRef, rate: Decimal) -> Self {
        Self::with_type(id, entity, ExemptionType::Partial, Some(rate))
    }

    fn with_type(
        id: ExemptionId,
        entity: EntityRef,
        exemption_type: ExemptionType,
        exemption_rate: Option<Decimal>,
    ) -> Self {
        Self {
            exemption: TaxExemption {
                id,
                entity,
                exemption_type,
                exemption_rate,
                validity: ValidityWindow::ALWAYS,
                target: None,
                certificate: None,
                is_active: true,
            },
        }
    }

    pub fn target(mut self, target: TaxTarget) -> Self {
        self.exemption.target = Some(target);
        self
    }

    pub fn valid(mut self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        self.exemption.validity = ValidityWindow::new(from, to);
        self
    }

    pub fn certificate(mut self, reference: impl Into<String>) -> Self {
        self.exemption.certificate = Some(reference.into());
        self
    }

    pub fn inactive(mut self) -> Self {
        self.exemption.is_active = false;
        self
    }

    pub fn build(self) -> TaxExemption {
        self.exemption
    }
}
