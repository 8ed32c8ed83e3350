//! Per-run context shared by the stages of a pipeline.
//!
//! This module provides:
//! - The mutable run context passed through the chain
//! - Ordered stores for results, statistics and attributes
//! - The prioritized generic lookup
//! - Run identity for correlation

mod identity;
mod lookup;
mod run;
mod stores;

pub use identity::RunIdentity;
pub use lookup::ContextScope;
pub use run::RunContext;
pub use stores::ContextStore;
