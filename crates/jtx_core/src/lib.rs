//! Core domain logic for jtx Board.
//! This crate is the single source of truth for journal, note and task
//! invariants, and for the screen state derived from them.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod store;
pub mod viewmodel;

pub use config::{ConfigError, CoreConfig, ReviewPolicy, TodoDefaults};
pub use logging::{default_log_level, init_logging, init_logging_from_config, logging_status};
pub use model::collection::{ICalCollection, LOCAL_COLLECTION_ID};
pub use model::entity::ICalEntity;
pub use model::ical_object::{
    now_epoch_ms, Component, ICalObject, ICalObjectId, Module, ValidationError, TZ_ALLDAY,
};
pub use model::property::{
    Attachment, Attendee, Category, Comment, Organizer, RelType, Relatedto, Resource,
};
pub use repo::ical_repo::{
    ICalObjectRepository, ListQuery, NewEntry, RepoError, RepoResult, SqliteICalRepository,
};
pub use service::quick_add::{parse_quick_add, ParsedQuickAdd};
pub use service::review::{
    ReviewError, ReviewInfo, ReviewOutcome, ReviewPlatform, ReviewScheduler,
};
pub use store::{EntityStore, LiveData, StoreError, StoreResult};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
