//! Calculation engine: snapshot, orchestrator, results and bulk evaluation.

mod bulk;
mod calculate;
mod result;
mod snapshot;
mod validation;

pub use bulk::*;
pub use calculate::*;
pub use result::*;
pub use snapshot::*;
pub use validation::*;
