//! Tax rates, groups, jurisdictions and exemptions.
//!
//! Resolves which jurisdictions apply to a location, evaluates exemptions for
//! the entities involved, and aggregates the tax of a rate or group under the
//! compound, stacked, highest or average algorithms, exclusive or inclusive.

mod aggregate;
mod exemption;
mod jurisdiction;
mod types;

pub use aggregate::*;
pub use exemption::*;
pub use jurisdiction::*;
pub use types::*;
