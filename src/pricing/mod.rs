//! Pricing rules, quantity tiers, candidate filtering and price resolution.

mod filter;
mod resolver;
mod rule;

pub use filter::*;
pub use resolver::*;
pub use rule::*;
