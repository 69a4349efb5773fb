//! Detail screen state.
//!
//! # Responsibility
//! - Observe one entity together with its related notes and subtasks.
//! - Derive display fields and visibility flags from every emission.
//! - Run the screen's mutations through the store.
//!
//! # Invariants
//! - Derivation is pure: the same snapshot always yields the same state.
//! - Id `0` stands for an entity that is not stored yet.

use super::format::DateFormatter;
use crate::model::entity::ICalEntity;
use crate::model::ical_object::{Component, ICalObject, ICalObjectId, Module, TZ_ALLDAY};
use crate::repo::collection_repo::{CollectionRepository, SqliteCollectionRepository};
use crate::repo::ical_repo::{ICalObjectRepository, RepoError, SqliteICalRepository};
use crate::store::{EntityStore, LiveData, StoreResult};
use log::info;
use tokio::sync::watch;

/// Id of an entity that has not been saved yet.
pub const NEW_ENTITY_ID: ICalObjectId = 0;

/// Consistent read of everything the detail screen shows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetailSnapshot {
    pub entity: Option<ICalEntity>,
    pub related_notes: Vec<ICalObject>,
    pub related_todos: Vec<ICalObject>,
}

/// Display-ready detail state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetailState {
    pub entity: Option<ICalEntity>,
    pub related_notes: Vec<ICalObject>,
    pub related_todos: Vec<ICalObject>,
    pub date_visible: bool,
    pub time_visible: bool,
    pub dtstart_formatted: String,
    pub created_formatted: String,
    pub last_modified_formatted: String,
    pub url_visible: bool,
    pub attendees_visible: bool,
    pub organizer_visible: bool,
    pub contact_visible: bool,
    pub comments_visible: bool,
    pub relatedto_visible: bool,
    pub progress_visible: bool,
    pub priority_visible: bool,
    pub subtasks_visible: bool,
}

impl DetailState {
    /// Derives display fields; a missing entity yields the empty state.
    pub fn derive(snapshot: &DetailSnapshot, formatter: &DateFormatter) -> Self {
        let Some(entity) = snapshot.entity.as_ref() else {
            return Self::default();
        };
        let object = &entity.property;
        let is_journal = object.component == Component::Journal;

        Self {
            entity: Some(entity.clone()),
            related_notes: snapshot.related_notes.clone(),
            related_todos: snapshot.related_todos.clone(),
            date_visible: is_journal,
            time_visible: is_journal && object.dtstart_timezone.as_deref() != Some(TZ_ALLDAY),
            dtstart_formatted: formatter.dtstart(object),
            created_formatted: formatter.date_time(object.created),
            last_modified_formatted: formatter.date_time(object.last_modified),
            url_visible: is_present(object.url.as_deref()),
            attendees_visible: !entity.attendees.is_empty(),
            organizer_visible: entity
                .organizer
                .as_ref()
                .is_some_and(|organizer| is_present(Some(&organizer.caladdress))),
            contact_visible: is_present(object.contact.as_deref()),
            comments_visible: !entity.comments.is_empty(),
            relatedto_visible: !entity.relatedto.is_empty(),
            progress_visible: object.percent.is_some() && object.component == Component::Todo,
            priority_visible: object.priority.is_some(),
            subtasks_visible: !snapshot.related_todos.is_empty(),
        }
    }
}

fn is_present(value: Option<&str>) -> bool {
    value.is_some_and(|value| !value.trim().is_empty())
}

pub struct DetailViewModel {
    store: EntityStore,
    id: ICalObjectId,
    snapshot: LiveData<DetailSnapshot>,
    state: LiveData<DetailState>,
    editing: watch::Sender<bool>,
}

impl DetailViewModel {
    /// Starts observing `id`; `NEW_ENTITY_ID` shows a fresh unsaved note.
    pub async fn new(
        store: EntityStore,
        id: ICalObjectId,
        formatter: DateFormatter,
        now_ms: i64,
    ) -> StoreResult<Self> {
        let snapshot = if id == NEW_ENTITY_ID {
            LiveData::constant(DetailSnapshot {
                entity: Some(ICalEntity::bare(ICalObject::create_note(now_ms))),
                ..DetailSnapshot::default()
            })
        } else {
            store
                .observe(move |conn| {
                    let repo = SqliteICalRepository::new(conn);
                    Ok(DetailSnapshot {
                        entity: repo.get(id)?,
                        related_notes: repo.related_notes(id)?,
                        related_todos: repo.related_todos(id)?,
                    })
                })
                .await?
        };
        let state = snapshot.map(move |snapshot| DetailState::derive(snapshot, &formatter));

        Ok(Self {
            store,
            id,
            snapshot,
            state,
            editing: watch::channel(false).0,
        })
    }

    pub fn id(&self) -> ICalObjectId {
        self.id
    }

    pub fn state(&self) -> LiveData<DetailState> {
        self.state.clone()
    }

    pub fn snapshot(&self) -> LiveData<DetailSnapshot> {
        self.snapshot.clone()
    }

    /// Stores `note` and links it as a child of this entity.
    pub async fn insert_related_note(&self, note: ICalObject) -> StoreResult<ICalObjectId> {
        let id = self.store.insert_related_note(self.id, note).await?;
        info!("event=related_note_insert module=viewmodel status=ok");
        Ok(id)
    }

    /// Quick related note from text typed on the detail screen.
    pub async fn insert_related_text(
        &self,
        text: &str,
        now_ms: i64,
    ) -> StoreResult<Option<ICalObjectId>> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }
        let parent_collection = self
            .snapshot
            .get()
            .entity
            .map(|entity| entity.property.collection_id);
        let mut note = ICalObject::for_module(Module::Note, now_ms);
        note.summary = Some(text.to_string());
        if let Some(collection_id) = parent_collection {
            note.collection_id = collection_id;
        }
        self.insert_related_note(note).await.map(Some)
    }

    /// Deletes a note: removed outright in local collections, flagged for
    /// sync in account-backed ones.
    pub async fn delete_note(&self, note_id: ICalObjectId, now_ms: i64) -> StoreResult<()> {
        self.store
            .write("delete_note", move |conn| {
                let repo = SqliteICalRepository::new(conn);
                let note = repo.get_object(note_id)?.ok_or(RepoError::NotFound(note_id))?;
                let collection = SqliteCollectionRepository::new(conn)
                    .get_collection(note.collection_id)?
                    .ok_or(RepoError::CollectionNotFound(note.collection_id))?;
                if collection.is_local() {
                    repo.delete(note_id)
                } else {
                    repo.mark_deleted(note_id, now_ms)
                }
            })
            .await
    }

    /// Sets the progress of this entity.
    pub async fn update_progress(&self, percent: i32, now_ms: i64) -> StoreResult<ICalObject> {
        self.store.update_progress(self.id, percent, now_ms).await
    }

    pub fn editing_clicked(&self) {
        self.editing.send_replace(true);
    }

    pub fn editing_done(&self) {
        self.editing.send_replace(false);
    }

    pub fn is_editing(&self) -> bool {
        *self.editing.borrow()
    }
}
