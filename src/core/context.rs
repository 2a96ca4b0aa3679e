//! The per-calculation input: product, buyer, quantity, price, location and time.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::ids::*;

/// Which side of a trade is being priced. Selects the discount tier type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeSide {
    /// Selling to a customer.
    #[default]
    Selling,
    /// Buying from a vendor.
    Buying,
}

/// Location used to resolve tax jurisdictions. Unset fields are unknown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationDescriptor {
    /// ISO 3166-1 alpha-2 country code.
    pub country_code: Option<String>,
    /// State, province or other subdivision code.
    pub state_code: Option<String>,
    pub city_name: Option<String>,
    pub postal_code: Option<String>,
}

impl LocationDescriptor {
    /// Location known only by country.
    pub fn country(code: impl Into<String>) -> Self {
        Self {
            country_code: Some(code.into()),
            ..Self::default()
        }
    }

    pub fn with_state(mut self, code: impl Into<String>) -> Self {
        self.state_code = Some(code.into());
        self
    }

    pub fn with_city(mut self, name: impl Into<String>) -> Self {
        self.city_name = Some(name.into());
        self
    }

    pub fn with_postal_code(mut self, code: impl Into<String>) -> Self {
        self.postal_code = Some(code.into());
        self
    }
}

/// Input of a single calculation, constructed per call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationContext {
    /// Tenant the calculation runs for. Carried into the result for audit.
    #[serde(default)]
    pub tenant_id: Option<TenantId>,
    pub product_id: ProductId,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub customer_id: Option<CustomerId>,
    #[serde(default)]
    pub customer_group: Option<String>,
    #[serde(default)]
    pub vendor_id: Option<VendorId>,
    #[serde(default)]
    pub side: TradeSide,
    pub quantity: Decimal,
    /// Unit price before pricing rules.
    pub base_price: Decimal,
    #[serde(default)]
    pub location: LocationDescriptor,
    /// Evaluation timestamp. Never read from the system clock.
    pub evaluated_at: NaiveDateTime,
    /// Tax group to apply instead of resolving jurisdictions.
    #[serde(default)]
    pub tax_group_override_id: Option<TaxGroupId>,
    /// Whether prices already contain single-rate taxes. Tax groups carry
    /// their own inclusive flag.
    #[serde(default)]
    pub prices_include_tax: bool,
}

impl CalculationContext {
    /// Every entity reference this context carries, in exemption lookup order.
    pub fn entity_refs(&self) -> Vec<EntityRef> {
        let mut refs = Vec::with_capacity(4);
        if let Some(id) = self.customer_id {
            refs.push(EntityRef::Customer(id));
        }
        refs.push(EntityRef::Product(self.product_id));
        if let Some(id) = self.category_id {
            refs.push(EntityRef::Category(id));
        }
        if let Some(id) = self.vendor_id {
            refs.push(EntityRef::Vendor(id));
        }
        refs
    }
}

/// Builder for [`CalculationContext`].
///
/// ```
/// use chrono::NaiveDate;
/// use rust_decimal_macros::dec;
/// use tarif::core::*;
///
/// let now = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap().and_hms_opt(9, 30, 0).unwrap();
/// let ctx = CalculationContextBuilder::new(ProductId(7), dec!(3), dec!(19.99), now)
///     .category(CategoryId(2))
///     .customer(CustomerId(11))
///     .customer_group("wholesale")
///     .location(LocationDescriptor::country("US").with_state("CA"))
///     .build();
///
/// assert_eq!(ctx.entity_refs().len(), 3);
/// ```
pub struct CalculationContextBuilder {
    tenant_id: Option<TenantId>,
    product_id: ProductId,
    category_id: Option<CategoryId>,
    customer_id: Option<CustomerId>,
    customer_group: Option<String>,
    vendor_id: Option<VendorId>,
    side: TradeSide,
    quantity: Decimal,
    base_price: Decimal,
    location: LocationDescriptor,
    evaluated_at: NaiveDateTime,
    tax_group_override_id: Option<TaxGroupId>,
    prices_include_tax: bool,
}

impl CalculationContextBuilder {
    pub fn new(
        product_id: ProductId,
        quantity: Decimal,
        base_price: Decimal,
        evaluated_at: NaiveDateTime,
    ) -> Self {
        Self {
            tenant_id: None,
            product_id,
            category_id: None,
            customer_id: None,
            customer_group: None,
            vendor_id: None,
            side: TradeSide::Selling,
            quantity,
            base_price,
            location: LocationDescriptor::default(),
            evaluated_at,
            tax_group_override_id: None,
            prices_include_tax: false,
        }
    }

    pub fn tenant(mut self, id: TenantId) -> Self {
        self.tenant_id = Some(id);
        self
    }

    pub fn category(mut self, id: CategoryId) -> Self {
        self.category_id = Some(id);
        self
    }

    pub fn customer(mut self, id: CustomerId) -> Self {
        self.customer_id = Some(id);
        self
    }

    pub fn customer_group(mut self, group: impl Into<String>) -> Self {
        self.customer_group = Some(group.into());
        self
    }

    /// Price a purchase from `id`; selects buying tiers.
    pub fn vendor(mut self, id: VendorId) -> Self {
        self.vendor_id = Some(id);
        self.side = TradeSide::Buying;
        self
    }

    pub fn side(mut self, side: TradeSide) -> Self {
        self.side = side;
        self
    }

    pub fn location(mut self, location: LocationDescriptor) -> Self {
        self.location = location;
        self
    }

    pub fn tax_group_override(mut self, id: TaxGroupId) -> Self {
        self.tax_group_override_id = Some(id);
        self
    }

    pub fn prices_include_tax(mut self, inclusive: bool) -> Self {
        self.prices_include_tax = inclusive;
        self
    }

    pub fn build(self) -> CalculationContext {
        CalculationContext {
            tenant_id: self.tenant_id,
            product_id: self.product_id,
            category_id: self.category_id,
            customer_id: self.customer_id,
            customer_group: self.customer_group,
            vendor_id: self.vendor_id,
            side: self.side,
            quantity: self.quantity,
            base_price: self.base_price,
            location: self.location,
            evaluated_at: self.evaluated_at,
            tax_group_override_id: self.tax_group_override_id,
            prices_include_tax: self.prices_include_tax,
        }
    }
}
