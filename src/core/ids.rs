//! Typed identifiers and the entity and tax target references built on them.

use serde::{Deserialize, Serialize};

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }
    };
}

define_id!(
    /// Pricing rule identifier.
    RuleId
);
define_id!(
    /// Discount tier identifier.
    TierId
);
define_id!(
    /// Tax rate identifier.
    TaxRateId
);
define_id!(
    /// Tax group identifier.
    TaxGroupId
);
define_id!(
    /// Tax jurisdiction identifier.
    JurisdictionId
);
define_id!(
    /// Tax exemption identifier.
    ExemptionId
);
define_id!(
    /// Product identifier.
    ProductId
);
define_id!(
    /// Product category identifier.
    CategoryId
);
define_id!(
    /// Customer identifier.
    CustomerId
);
define_id!(
    /// Vendor (supplier) identifier.
    VendorId
);
define_id!(
    /// Tenant identifier. Carried for audit only; the engine never filters by it.
    TenantId
);

/// Reference to the entity a tax exemption is granted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum EntityRef {
    Customer(CustomerId),
    Product(ProductId),
    Category(CategoryId),
    Vendor(VendorId),
}

impl std::fmt::Display for EntityRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Customer(id) => write!(f, "customer:{id}"),
            Self::Product(id) => write!(f, "product:{id}"),
            Self::Category(id) => write!(f, "category:{id}"),
            Self::Vendor(id) => write!(f, "vendor:{id}"),
        }
    }
}

/// The tax source a jurisdiction, exemption or breakdown line points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum TaxTarget {
    Rate(TaxRateId),
    Group(TaxGroupId),
}

impl TaxTarget {
    /// Wire name of the source type (`"rate"` or `"group"`).
    pub fn source_type(&self) -> &'static str {
        match self {
            Self::Rate(_) => "rate",
            Self::Group(_) => "group",
        }
    }

    /// Numeric id of the underlying rate or group.
    pub fn source_id(&self) -> u64 {
        match self {
            Self::Rate(id) => id.0,
            Self::Group(id) => id.0,
        }
    }
}

impl std::fmt::Display for TaxTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.source_type(), self.source_id())
    }
}
