// ============================================================================
// Read Model Layer - Queryable Projections of the Event Log
// ============================================================================
//
// Denormalized rows, the stores that hold them, and the projection
// handlers that keep them eventually consistent with the event log.
//
// ============================================================================

pub mod postgres;
pub mod projections;
pub mod store;
pub mod structures;

pub use postgres::*;
pub use projections::*;
pub use store::*;
pub use structures::*;
