//! Per-screen state derived from live store queries.
//!
//! # Responsibility
//! - List, detail and quick-add screen state.
//! - Dictation glue between the platform recognizer and quick-add text.
//!
//! # Invariants
//! - View-models never touch SQLite directly on the caller's thread; all
//!   store access goes through [`crate::store::EntityStore`].

pub mod detail;
pub mod dictation;
pub mod format;
pub mod list;
pub mod quick_add;

pub use detail::{DetailSnapshot, DetailState, DetailViewModel, NEW_ENTITY_ID};
pub use dictation::{
    DictationSession, DictationStart, RecognitionListener, RecognitionRequest, SpeechError,
    SpeechRecognizer,
};
pub use format::DateFormatter;
pub use list::ListViewModel;
pub use quick_add::{QuickAddEntry, QuickAddViewModel, SaveOutcome};
