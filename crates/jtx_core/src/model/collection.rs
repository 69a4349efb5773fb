//! Collection model.
//!
//! A collection groups objects of one account (the on-device account or a
//! remote one) and declares which components it accepts.

use super::ical_object::Module;
use serde::{Deserialize, Serialize};

/// Account type of the on-device collection.
pub const LOCAL_ACCOUNT_TYPE: &str = "LOCAL";

/// Id of the local collection seeded by the first migration.
pub const LOCAL_COLLECTION_ID: i64 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ICalCollection {
    pub collection_id: i64,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub account_name: Option<String>,
    pub account_type: String,
    /// ARGB color.
    pub color: Option<i32>,
    pub supports_vjournal: bool,
    pub supports_vtodo: bool,
    pub read_only: bool,
}

impl ICalCollection {
    /// A writable on-device collection supporting both components.
    pub fn local(display_name: impl Into<String>) -> Self {
        Self {
            collection_id: 0,
            display_name: Some(display_name.into()),
            description: None,
            account_name: None,
            account_type: LOCAL_ACCOUNT_TYPE.to_string(),
            color: None,
            supports_vjournal: true,
            supports_vtodo: true,
            read_only: false,
        }
    }

    pub fn is_local(&self) -> bool {
        self.account_type == LOCAL_ACCOUNT_TYPE
    }

    /// Whether new objects of `module` may be stored here.
    pub fn supports(&self, module: Module) -> bool {
        match module {
            Module::Journal | Module::Note => self.supports_vjournal,
            Module::Todo => self.supports_vtodo,
        }
    }
}
