//! In-memory reference implementations of the port traits in [`crate::ports`].
//!
//! These back the crate's own contract tests and the service crate's
//! non-production default wiring (`persistence.provider = "in_memory"`).
//! Durable production adapters (Postgres, Redis, the filesystem) live
//! outside this crate.

mod in_memory;

pub use in_memory::{InMemoryDeadLetterStore, InMemoryDeliveryStore, InMemoryIdempotencyStore};
