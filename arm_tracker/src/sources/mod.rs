//! Edge source implementations.
//!
//! - [`simulation`] - Synthetic quadrature edges for development and testing
//!
//! A hardware source implements `EdgeSource` from `arm_common`, calls the
//! sink from its interrupt or GPIO thread, and is registered below.

pub mod simulation;

use crate::source_registry::SourceRegistry;

/// Register every built-in source.
pub fn register_all_sources(registry: &mut SourceRegistry) {
    registry.register(simulation::SOURCE_NAME, simulation::create_source);
}
