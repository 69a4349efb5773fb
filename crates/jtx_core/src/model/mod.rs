//! Journal/note/task domain model.
//!
//! # Responsibility
//! - Define the records persisted by the store and read by view-models.
//!
//! # Invariants
//! - Every property record belongs to exactly one `ICalObject`.
//! - Every `ICalObject` belongs to exactly one `ICalCollection`.

pub mod collection;
pub mod entity;
pub mod ical_object;
pub mod property;
