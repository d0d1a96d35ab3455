// ============================================================================
// Event Sourcing Core - Generic Infrastructure Abstractions
// ============================================================================
//
// This module contains GENERIC, reusable event sourcing infrastructure
// that works with ANY domain aggregate.
//
// Key Principles:
// - No domain-specific code (no Device, User, Organization, etc.)
// - Generic over aggregate and event types
// - The codec is the only construction path from raw payloads to typed
//   events
//
// ============================================================================

pub mod aggregate;
pub mod codec;
pub mod event;

// Re-export core types for convenience
pub use aggregate::AggregateRoot;
pub use codec::{decode_payload, CodecError, EventCodec, FieldGuard};
pub use event::{DomainEvent, EventEnvelope};
