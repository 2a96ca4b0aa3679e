//! Core types shared by every engine component.
//!
//! Identifiers, the calculation context, validity windows, the numeric core,
//! engine configuration and errors.

mod config;
mod context;
pub mod countries;
mod error;
mod ids;
pub mod numeric;
mod window;

pub use config::*;
pub use context::*;
pub use countries::is_known_country_code;
pub use error::*;
pub use ids::*;
pub use window::*;
