//! Use-case services that sit between view-models and repositories.
//!
//! # Responsibility
//! - Quick-add parsing and entry composition.
//! - The review prompt time gate.

pub mod quick_add;
pub mod review;
