//! ICalObject domain model.
//!
//! # Responsibility
//! - Define the canonical journal/note/task record.
//! - Provide module-specific constructors and write-side validation.
//!
//! # Invariants
//! - `uid` is stable and never reused for another object.
//! - `module` and `component` agree: JOURNAL/NOTE are VJOURNAL, TODO is VTODO.
//! - `percent` is within `0..=100`, `priority` within `0..=9`.
//! - A note never carries `dtstart`.

use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Row id of a persisted object. `0` means "not yet persisted".
pub type ICalObjectId = i64;

/// Timezone marker for date-only (all-day) values.
pub const TZ_ALLDAY: &str = "ALLDAY";

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// iCalendar component backing an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Component {
    Journal,
    Todo,
}

impl Component {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Journal => "JOURNAL",
            Self::Todo => "TODO",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "JOURNAL" => Some(Self::Journal),
            "TODO" => Some(Self::Todo),
            _ => None,
        }
    }
}

/// User-facing module an object is listed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Module {
    Journal,
    Note,
    Todo,
}

impl Module {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Journal => "JOURNAL",
            Self::Note => "NOTE",
            Self::Todo => "TODO",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "JOURNAL" => Some(Self::Journal),
            "NOTE" => Some(Self::Note),
            "TODO" | "TASK" => Some(Self::Todo),
            _ => None,
        }
    }

    /// Component used to store objects of this module.
    pub fn component(self) -> Component {
        match self {
            Self::Journal | Self::Note => Component::Journal,
            Self::Todo => Component::Todo,
        }
    }
}

/// Status values used by the constructors.
pub mod status {
    pub const FINAL: &str = "FINAL";
    pub const DRAFT: &str = "DRAFT";
    pub const CANCELLED: &str = "CANCELLED";
    pub const NEEDS_ACTION: &str = "NEEDS-ACTION";
    pub const IN_PROCESS: &str = "IN-PROCESS";
    pub const COMPLETED: &str = "COMPLETED";
}

/// Write-side validation failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    PercentOutOfRange(i32),
    PriorityOutOfRange(i32),
    ComponentMismatch { module: Module, component: Component },
    NoteWithStart,
    BlankUid,
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PercentOutOfRange(value) => write!(f, "percent must be 0..=100, got {value}"),
            Self::PriorityOutOfRange(value) => write!(f, "priority must be 0..=9, got {value}"),
            Self::ComponentMismatch { module, component } => write!(
                f,
                "module {} cannot be stored as component {}",
                module.as_str(),
                component.as_str()
            ),
            Self::NoteWithStart => write!(f, "notes must not carry dtstart"),
            Self::BlankUid => write!(f, "uid must not be blank"),
        }
    }
}

impl Error for ValidationError {}

/// Canonical journal/note/task record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ICalObject {
    pub id: ICalObjectId,
    pub uid: String,
    pub component: Component,
    pub module: Module,
    pub summary: Option<String>,
    pub description: Option<String>,
    /// Epoch milliseconds.
    pub dtstart: Option<i64>,
    pub dtstart_timezone: Option<String>,
    /// Epoch milliseconds.
    pub due: Option<i64>,
    pub due_timezone: Option<String>,
    pub completed: Option<i64>,
    pub percent: Option<i32>,
    pub priority: Option<i32>,
    pub status: Option<String>,
    pub classification: Option<String>,
    pub url: Option<String>,
    pub contact: Option<String>,
    pub location: Option<String>,
    pub collection_id: i64,
    pub created: i64,
    pub last_modified: i64,
    pub sequence: i64,
    /// Changed locally since the last sync.
    pub dirty: bool,
    /// Soft-delete flag kept for account-backed collections.
    pub deleted: bool,
}

impl ICalObject {
    fn blank(module: Module, now_ms: i64) -> Self {
        Self {
            id: 0,
            uid: Uuid::new_v4().to_string(),
            component: module.component(),
            module,
            summary: None,
            description: None,
            dtstart: None,
            dtstart_timezone: None,
            due: None,
            due_timezone: None,
            completed: None,
            percent: None,
            priority: None,
            status: None,
            classification: Some("PUBLIC".to_string()),
            url: None,
            contact: None,
            location: None,
            collection_id: super::collection::LOCAL_COLLECTION_ID,
            created: now_ms,
            last_modified: now_ms,
            sequence: 0,
            dirty: true,
            deleted: false,
        }
    }

    /// Journal entry dated today, as an all-day value.
    pub fn create_journal(now_ms: i64) -> Self {
        let mut object = Self::blank(Module::Journal, now_ms);
        object.dtstart = Some(start_of_day_utc(now_ms));
        object.dtstart_timezone = Some(TZ_ALLDAY.to_string());
        object.status = Some(status::FINAL.to_string());
        object
    }

    pub fn create_note(now_ms: i64) -> Self {
        let mut object = Self::blank(Module::Note, now_ms);
        object.status = Some(status::FINAL.to_string());
        object
    }

    pub fn create_todo(now_ms: i64) -> Self {
        let mut object = Self::blank(Module::Todo, now_ms);
        object.status = Some(status::NEEDS_ACTION.to_string());
        object
    }

    /// Creates an empty object for `module`.
    pub fn for_module(module: Module, now_ms: i64) -> Self {
        match module {
            Module::Journal => Self::create_journal(now_ms),
            Module::Note => Self::create_note(now_ms),
            Module::Todo => Self::create_todo(now_ms),
        }
    }

    /// Applies configured default start/due offsets to a task.
    ///
    /// Offsets are whole days from the start of today and are stored as
    /// all-day values. Non-task objects are left untouched.
    pub fn apply_todo_defaults(&mut self, start_in_days: Option<u32>, due_in_days: Option<u32>) {
        if self.module != Module::Todo {
            return;
        }
        let today = start_of_day_utc(self.created);
        if let Some(days) = start_in_days {
            self.dtstart = Some(today.saturating_add(i64::from(days) * DAY_MS));
            self.dtstart_timezone = Some(TZ_ALLDAY.to_string());
        }
        if let Some(days) = due_in_days {
            self.due = Some(today.saturating_add(i64::from(days) * DAY_MS));
            self.due_timezone = Some(TZ_ALLDAY.to_string());
        }
    }

    /// Marks a local modification: bumps `last_modified`, `sequence`, `dirty`.
    pub fn touch(&mut self, now_ms: i64) {
        self.last_modified = now_ms;
        self.sequence += 1;
        self.dirty = true;
    }

    /// Sets task progress and keeps `status`/`completed` consistent with it.
    pub fn set_progress(&mut self, percent: i32, now_ms: i64) {
        self.percent = Some(percent);
        if self.module == Module::Todo {
            match percent {
                100 => {
                    self.status = Some(status::COMPLETED.to_string());
                    self.completed = Some(now_ms);
                }
                0 => {
                    self.status = Some(status::NEEDS_ACTION.to_string());
                    self.completed = None;
                }
                _ => {
                    self.status = Some(status::IN_PROCESS.to_string());
                    self.completed = None;
                }
            }
        }
        self.touch(now_ms);
    }

    /// Checks write-side invariants.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.uid.trim().is_empty() {
            return Err(ValidationError::BlankUid);
        }
        if self.module.component() != self.component {
            return Err(ValidationError::ComponentMismatch {
                module: self.module,
                component: self.component,
            });
        }
        if let Some(percent) = self.percent {
            if !(0..=100).contains(&percent) {
                return Err(ValidationError::PercentOutOfRange(percent));
            }
        }
        if let Some(priority) = self.priority {
            if !(0..=9).contains(&priority) {
                return Err(ValidationError::PriorityOutOfRange(priority));
            }
        }
        if self.module == Module::Note && self.dtstart.is_some() {
            return Err(ValidationError::NoteWithStart);
        }
        Ok(())
    }

    /// Whether the start value is date-only.
    pub fn is_all_day(&self) -> bool {
        self.dtstart_timezone.as_deref() == Some(TZ_ALLDAY)
    }
}

/// Truncates epoch milliseconds to 00:00 UTC of the same day.
pub fn start_of_day_utc(epoch_ms: i64) -> i64 {
    match Utc.timestamp_millis_opt(epoch_ms).single() {
        Some(value) => value
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .map(|midnight| midnight.and_utc().timestamp_millis())
            .unwrap_or(epoch_ms),
        None => epoch_ms,
    }
}

/// Current time in epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    Utc::now().timestamp_millis()
}
