//! Tier routing: complexity scoring and tier selection.

pub mod analyzer;
pub mod selector;

pub use analyzer::{analyze, ComplexityScore};
pub use selector::{select, RoutingDecision};
