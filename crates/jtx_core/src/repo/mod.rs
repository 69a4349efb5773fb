//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts.
//! - Isolate SQLite query details from view-models and services.
//!
//! # Invariants
//! - Repository writes enforce `ICalObject::validate()` before persistence.
//! - Reads return `None`/empty when nothing matches; writes against missing
//!   rows return `NotFound`.

pub mod collection_repo;
pub mod ical_repo;
mod property_repo;
pub mod settings_repo;
