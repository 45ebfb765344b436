//! Data types crossing the resolver's boundaries.

mod records;
mod resolved;
mod unified;

pub use records::{ListingRecord, LookupRecord, UnitRecord};
pub use resolved::ResolvedResource;
pub use unified::{Alternative, ResolveOptions, UnifiedResult};
