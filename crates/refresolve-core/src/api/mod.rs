//! API implementation submodules.
//!
//! Each submodule contains `impl ReferenceResolver` blocks that extend the
//! public API. The struct definition remains in `lib.rs`.

mod builder;
mod cache;
mod resolve;

pub use builder::ReferenceResolverBuilder;
