//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose stable, use-case-level functions to Dart via FRB.
//! - Map core results into plain response envelopes.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - Every call opens its own connection; the host never holds core state.
//! - Ids cross the boundary as `i64` row ids.

use jtx_core::db::open_db;
use jtx_core::repo::collection_repo::{CollectionRepository, SqliteCollectionRepository};
use jtx_core::repo::settings_repo::SqliteSettingsRepository;
use jtx_core::service::review::ReviewGate;
use jtx_core::viewmodel::{
    DateFormatter, DetailSnapshot, DetailState, QuickAddViewModel, SaveOutcome,
};
use jtx_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, ping as ping_inner,
    CoreConfig, ICalObject, ICalObjectRepository, ListQuery, Module, ReviewScheduler,
    SqliteICalRepository, TodoDefaults,
};
use log::warn;
use rusqlite::Connection;
use std::sync::OnceLock;

const ENTRY_DEFAULT_LIMIT: u32 = 50;
const ENTRY_LIMIT_MAX: u32 = 200;
static CORE_CONFIG: OnceLock<CoreConfig> = OnceLock::new();

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir` (idempotent).
/// - Reconfiguration attempts with different level or directory return error.
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// List row for the board screens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryListItem {
    pub entry_id: i64,
    /// `journal|note|todo`.
    pub module: String,
    pub summary: String,
    pub status: Option<String>,
    pub percent: Option<i32>,
    pub last_modified: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryListResponse {
    pub items: Vec<EntryListItem>,
    /// Human-readable response message for diagnostics.
    pub message: String,
    pub applied_limit: u32,
}

/// Detail projection with derived display flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryDetail {
    pub entry_id: i64,
    pub module: String,
    pub summary: String,
    pub description: String,
    pub url: Option<String>,
    pub categories: Vec<String>,
    pub percent: Option<i32>,
    pub dtstart_formatted: String,
    pub created_formatted: String,
    pub last_modified_formatted: String,
    pub date_visible: bool,
    pub time_visible: bool,
    pub url_visible: bool,
    pub progress_visible: bool,
    pub related_note_ids: Vec<i64>,
    pub subtask_ids: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryDetailResponse {
    pub ok: bool,
    pub item: Option<EntryDetail>,
    pub message: String,
}

/// Generic action response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryActionResponse {
    /// Whether operation succeeded.
    pub ok: bool,
    pub entry_id: Option<i64>,
    /// Human-readable response message for diagnostics/UI.
    pub message: String,
}

impl EntryActionResponse {
    fn success(message: impl Into<String>, entry_id: i64) -> Self {
        Self {
            ok: true,
            entry_id: Some(entry_id),
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            entry_id: None,
            message: message.into(),
        }
    }
}

/// Review gate answer for the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewCheckResponse {
    /// The host should run the platform review flow now.
    pub should_request: bool,
    pub next_request_on: Option<i64>,
    pub message: String,
}

/// Creates an entry from quick-add text.
///
/// Input semantics:
/// - `module`: `journal|note|todo|task`; unknown values fall back to journal.
///   The module is coerced to what the target collection supports.
/// - `collection_id`: `None` saves into the first writable collection.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Read-only or unknown collections are rejected.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn entry_quick_add(
    text: String,
    module: String,
    collection_id: Option<i64>,
    now_epoch_ms: i64,
) -> EntryActionResponse {
    let module = Module::parse(&module).unwrap_or(Module::Journal);
    let todo_defaults = resolve_core_config().todo_defaults;
    match with_connection(|conn| {
        save_quick_add(conn, text, module, collection_id, todo_defaults, now_epoch_ms)
    }) {
        Ok(id) => EntryActionResponse::success("Entry saved.", id),
        Err(err) => EntryActionResponse::failure(format!("entry_quick_add failed: {err}")),
    }
}

fn save_quick_add(
    conn: &Connection,
    text: String,
    module: Module,
    collection_id: Option<i64>,
    todo_defaults: TodoDefaults,
    now_epoch_ms: i64,
) -> Result<i64, String> {
    let collections = SqliteCollectionRepository::new(conn)
        .list_collections()
        .map_err(|err| err.to_string())?;
    let mut view_model =
        QuickAddViewModel::new(collections, Some(module), collection_id, todo_defaults);
    if let Some(requested) = collection_id {
        let selected = view_model.current_collection().map(|c| c.collection_id);
        if selected != Some(requested) {
            return Err(format!("collection {requested} is missing or read-only"));
        }
    }

    view_model.set_text(text);
    let mut saved = None;
    match view_model.save(false, now_epoch_ms, |entry| saved = Some(entry)) {
        SaveOutcome::NoText => return Err("text is empty".to_string()),
        SaveOutcome::NoCollection => return Err("no writable collection".to_string()),
        SaveOutcome::Saved { .. } => {}
    }
    let entry = saved.ok_or_else(|| "nothing was composed".to_string())?;
    SqliteICalRepository::new(conn)
        .insert_entry(&entry.into_new_entry())
        .map_err(|err| err.to_string())
}

/// Lists entries whose summary or description contains `filter`.
///
/// # FFI contract
/// - Blank filter or `%` lists everything.
/// - Never panics; returns deterministic envelope with applied limit.
#[flutter_rust_bridge::frb(sync)]
pub fn entry_list(filter: String, limit: Option<u32>) -> EntryListResponse {
    let applied_limit = normalize_entry_limit(limit);
    let query = ListQuery {
        limit: Some(applied_limit),
        ..ListQuery::with_filter(filter)
    };

    match with_connection(|conn| {
        SqliteICalRepository::new(conn)
            .list(&query)
            .map_err(|err| err.to_string())
    }) {
        Ok(objects) => {
            let items = objects.into_iter().map(to_list_item).collect::<Vec<_>>();
            let message = if items.is_empty() {
                "No entries.".to_string()
            } else {
                format!("Found {} entr(ies).", items.len())
            };
            EntryListResponse {
                items,
                message,
                applied_limit,
            }
        }
        Err(err) => EntryListResponse {
            items: Vec::new(),
            message: format!("entry_list failed: {err}"),
            applied_limit,
        },
    }
}

/// Loads one entry with its derived detail flags.
#[flutter_rust_bridge::frb(sync)]
pub fn entry_get(entry_id: i64) -> EntryDetailResponse {
    let snapshot = with_connection(|conn| {
        let repo = SqliteICalRepository::new(conn);
        let load = || -> jtx_core::RepoResult<DetailSnapshot> {
            Ok(DetailSnapshot {
                entity: repo.get(entry_id)?,
                related_notes: repo.related_notes(entry_id)?,
                related_todos: repo.related_todos(entry_id)?,
            })
        };
        load().map_err(|err| err.to_string())
    });

    match snapshot {
        Ok(snapshot) => match to_detail(&snapshot) {
            Some(item) => EntryDetailResponse {
                ok: true,
                item: Some(item),
                message: String::new(),
            },
            None => EntryDetailResponse {
                ok: false,
                item: None,
                message: format!("entry not found: {entry_id}"),
            },
        },
        Err(err) => EntryDetailResponse {
            ok: false,
            item: None,
            message: format!("entry_get failed: {err}"),
        },
    }
}

/// Deletes an entry and everything attached to it.
#[flutter_rust_bridge::frb(sync)]
pub fn entry_delete(entry_id: i64) -> EntryActionResponse {
    match with_connection(|conn| {
        SqliteICalRepository::new(conn)
            .delete(entry_id)
            .map_err(|err| err.to_string())
    }) {
        Ok(()) => EntryActionResponse::success("Entry deleted.", entry_id),
        Err(err) => EntryActionResponse::failure(format!("entry_delete failed: {err}")),
    }
}

/// Sets task progress (`0..=100`).
#[flutter_rust_bridge::frb(sync)]
pub fn entry_update_progress(
    entry_id: i64,
    percent: i32,
    now_epoch_ms: i64,
) -> EntryActionResponse {
    let result = with_connection(|conn| {
        let repo = SqliteICalRepository::new(conn);
        let mut object: ICalObject = repo
            .get_object(entry_id)
            .map_err(|err| err.to_string())?
            .ok_or_else(|| format!("entry not found: {entry_id}"))?;
        object.set_progress(percent, now_epoch_ms);
        repo.update(&object).map_err(|err| err.to_string())
    });
    match result {
        Ok(()) => EntryActionResponse::success("Progress updated.", entry_id),
        Err(err) => EntryActionResponse::failure(format!("entry_update_progress failed: {err}")),
    }
}

/// Checks whether the in-app review flow should be requested now.
///
/// The first check only schedules the first prompt.
#[flutter_rust_bridge::frb(sync)]
pub fn review_check(now_epoch_ms: i64) -> ReviewCheckResponse {
    let policy = resolve_core_config().review;
    let result = with_connection(|conn| {
        ReviewScheduler::new(SqliteSettingsRepository::new(conn), policy)
            .evaluate(now_epoch_ms)
            .map_err(|err| err.to_string())
    });
    match result {
        Ok(ReviewGate::Due) => ReviewCheckResponse {
            should_request: true,
            next_request_on: None,
            message: "Review due.".to_string(),
        },
        Ok(ReviewGate::FirstScheduled { next_request_on }) => ReviewCheckResponse {
            should_request: false,
            next_request_on: Some(next_request_on),
            message: "First review scheduled.".to_string(),
        },
        Ok(ReviewGate::NotYet { next_request_on }) => ReviewCheckResponse {
            should_request: false,
            next_request_on: Some(next_request_on),
            message: "Review not due yet.".to_string(),
        },
        Err(err) => ReviewCheckResponse {
            should_request: false,
            next_request_on: None,
            message: format!("review_check failed: {err}"),
        },
    }
}

/// Records that the platform review flow was requested successfully.
///
/// Returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn review_completed(now_epoch_ms: i64) -> String {
    let policy = resolve_core_config().review;
    let result = with_connection(|conn| {
        ReviewScheduler::new(SqliteSettingsRepository::new(conn), policy)
            .record_review_requested(now_epoch_ms)
            .map_err(|err| err.to_string())
    });
    match result {
        Ok(_) => String::new(),
        Err(err) => format!("review_completed failed: {err}"),
    }
}

fn normalize_entry_limit(limit: Option<u32>) -> u32 {
    match limit {
        Some(0) | None => ENTRY_DEFAULT_LIMIT,
        Some(value) if value > ENTRY_LIMIT_MAX => ENTRY_LIMIT_MAX,
        Some(value) => value,
    }
}

fn resolve_core_config() -> &'static CoreConfig {
    CORE_CONFIG.get_or_init(|| {
        CoreConfig::from_env().unwrap_or_else(|err| {
            warn!("event=config_load module=ffi status=error error={err}");
            CoreConfig::default()
        })
    })
}

fn with_connection<T>(f: impl FnOnce(&Connection) -> Result<T, String>) -> Result<T, String> {
    let db_path = &resolve_core_config().db_path;
    let conn = open_db(db_path).map_err(|err| format!("entry DB open failed: {err}"))?;
    f(&conn)
}

fn to_list_item(object: ICalObject) -> EntryListItem {
    EntryListItem {
        entry_id: object.id,
        module: module_label(object.module).to_string(),
        summary: object.summary.unwrap_or_default(),
        status: object.status,
        percent: object.percent,
        last_modified: object.last_modified,
    }
}

fn to_detail(snapshot: &DetailSnapshot) -> Option<EntryDetail> {
    let state = DetailState::derive(snapshot, &DateFormatter::utc());
    let entity = state.entity?;
    let object = entity.property;
    Some(EntryDetail {
        entry_id: object.id,
        module: module_label(object.module).to_string(),
        summary: object.summary.unwrap_or_default(),
        description: object.description.unwrap_or_default(),
        url: object.url,
        categories: entity.categories.into_iter().map(|c| c.text).collect(),
        percent: object.percent,
        dtstart_formatted: state.dtstart_formatted,
        created_formatted: state.created_formatted,
        last_modified_formatted: state.last_modified_formatted,
        date_visible: state.date_visible,
        time_visible: state.time_visible,
        url_visible: state.url_visible,
        progress_visible: state.progress_visible,
        related_note_ids: state.related_notes.iter().map(|note| note.id).collect(),
        subtask_ids: state.related_todos.iter().map(|todo| todo.id).collect(),
    })
}

fn module_label(module: Module) -> &'static str {
    match module {
        Module::Journal => "journal",
        Module::Note => "note",
        Module::Todo => "todo",
    }
}

#[cfg(test)]
mod tests {
    use super::{
        core_version, entry_delete, entry_get, entry_list, entry_quick_add,
        entry_update_progress, init_logging, ping, review_check, save_quick_add,
    };
    use jtx_core::db::open_db_in_memory;
    use jtx_core::repo::collection_repo::{CollectionRepository, SqliteCollectionRepository};
    use jtx_core::{
        ICalCollection, ICalObjectRepository, ListQuery, Module, SqliteICalRepository,
        TodoDefaults,
    };
    use std::time::{SystemTime, UNIX_EPOCH};

    const NOW: i64 = 1_709_649_000_000;

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn init_logging_rejects_empty_log_dir() {
        let error = init_logging("info".to_string(), String::new());
        assert!(!error.is_empty());
    }

    #[test]
    fn init_logging_rejects_unsupported_level() {
        let error = init_logging("verbose".to_string(), "tmp/logs".to_string());
        assert!(!error.is_empty());
    }

    #[test]
    fn quick_add_then_list_and_get() {
        let token = unique_token("quick-add");
        let created = entry_quick_add(
            format!("Buy {token} #errand https://example.com"),
            "todo".to_string(),
            None,
            NOW,
        );
        assert!(created.ok, "{}", created.message);
        let entry_id = created.entry_id.expect("created entry id");

        let listed = entry_list(token.clone(), Some(500));
        assert_eq!(listed.applied_limit, 200);
        assert_eq!(listed.items.len(), 1);
        assert_eq!(listed.items[0].entry_id, entry_id);
        assert_eq!(listed.items[0].module, "todo");

        let detail = entry_get(entry_id);
        assert!(detail.ok, "{}", detail.message);
        let item = detail.item.expect("detail item");
        assert_eq!(item.summary, format!("Buy {token}"));
        assert_eq!(item.categories, vec!["errand".to_string()]);
        assert!(item.url_visible);
        assert!(!item.date_visible);
    }

    #[test]
    fn quick_add_rejects_blank_text() {
        let response = entry_quick_add("   ".to_string(), "note".to_string(), None, NOW);
        assert!(!response.ok);
        assert!(response.message.contains("empty"));
    }

    #[test]
    fn quick_add_skips_read_only_collection_and_coerces_module() {
        let conn = open_db_in_memory().expect("in-memory db");
        let collections = SqliteCollectionRepository::new(&conn);
        let mut shared = ICalCollection::local("Shared");
        shared.read_only = true;
        shared.supports_vtodo = false;
        let shared_id = collections.create_collection(&shared).expect("shared");
        let mut journals = ICalCollection::local("Journals");
        journals.supports_vtodo = false;
        let journals_id = collections.create_collection(&journals).expect("journals");

        let err = save_quick_add(
            &conn,
            "Pay rent".to_string(),
            Module::Todo,
            Some(shared_id),
            TodoDefaults::default(),
            NOW,
        )
        .unwrap_err();
        assert!(err.contains("read-only"), "{err}");
        let repo = SqliteICalRepository::new(&conn);
        assert!(repo.list(&ListQuery::default()).unwrap().is_empty());

        let id = save_quick_add(
            &conn,
            "Pay rent".to_string(),
            Module::Todo,
            Some(journals_id),
            TodoDefaults::default(),
            NOW,
        )
        .expect("saved into writable collection");
        let saved = repo.get(id).unwrap().expect("saved entity");
        assert_eq!(saved.property.module, Module::Note);
        assert_eq!(saved.property.collection_id, journals_id);
    }

    #[test]
    fn progress_and_delete_report_missing_entries() {
        let token = unique_token("progress");
        let created = entry_quick_add(token, "task".to_string(), None, NOW);
        let entry_id = created.entry_id.expect("created entry id");

        let updated = entry_update_progress(entry_id, 100, NOW + 1);
        assert!(updated.ok, "{}", updated.message);
        let detail = entry_get(entry_id).item.expect("detail item");
        assert_eq!(detail.percent, Some(100));
        assert!(detail.progress_visible);

        assert!(entry_delete(entry_id).ok);
        assert!(!entry_delete(entry_id).ok);
        assert!(!entry_update_progress(entry_id, 10, NOW).ok);
        assert!(!entry_get(entry_id).ok);
    }

    #[test]
    fn review_check_schedules_before_requesting() {
        let first = review_check(NOW);
        assert!(!first.should_request, "{}", first.message);
        let again = review_check(NOW);
        assert!(!again.should_request, "{}", again.message);
        assert!(again.next_request_on.is_some_and(|next| next > NOW));
    }

    fn unique_token(prefix: &str) -> String {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time went backwards")
            .as_nanos();
        format!("{prefix}-{nanos}")
    }
}
