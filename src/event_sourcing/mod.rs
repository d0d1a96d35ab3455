// ============================================================================
// Event Sourcing Infrastructure
// ============================================================================
//
// Generic, reusable event sourcing infrastructure.
// Domain-specific code is in src/domain/
//
// ============================================================================

pub mod bus;
mod core;
mod store;

// Re-export core infrastructure
pub use bus::{handler, EventBus, EventHandler};
pub use self::core::*;
pub use self::store::*;
