//! Flutter-facing bindings for jtx Board core.

pub mod api;
