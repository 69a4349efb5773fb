//! ICalObject repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD and list/filter APIs over `icalobject` and its properties.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Write paths call `ICalObject::validate()` before SQL mutations.
//! - Multi-row writes (entry + properties, note + relation, delete + inbound
//!   relations) commit in one transaction.
//! - List order is `last_modified DESC, id ASC`.

use crate::db::DbError;
use crate::model::entity::ICalEntity;
use crate::model::ical_object::{Component, ICalObject, ICalObjectId, Module, ValidationError};
use crate::model::property::{
    Attachment, Attendee, Category, Comment, Organizer, RelType, Relatedto, Resource,
};
use crate::repo::property_repo;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};

const ICALOBJECT_SELECT_SQL: &str = "SELECT
    id,
    uid,
    component,
    module,
    summary,
    description,
    dtstart,
    dtstart_timezone,
    due,
    due_timezone,
    completed,
    percent,
    priority,
    status,
    classification,
    url,
    contact,
    location,
    collection_id,
    created,
    last_modified,
    sequence,
    dirty,
    deleted
FROM icalobject";

/// Filter value that matches everything, kept from the list screen contract.
pub const FILTER_WILDCARD: &str = "%";

pub type RepoResult<T> = Result<T, RepoError>;

#[derive(Debug)]
pub enum RepoError {
    Validation(ValidationError),
    Db(DbError),
    NotFound(ICalObjectId),
    CollectionNotFound(i64),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "icalobject not found: {id}"),
            Self::CollectionNotFound(id) => write!(f, "collection not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound(_) | Self::CollectionNotFound(_) | Self::InvalidData(_) => None,
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Query options for listing objects.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    /// Substring matched against summary and description.
    pub filter: Option<String>,
    pub module: Option<Module>,
    /// Exact (case-insensitive) category name.
    pub category: Option<String>,
    pub include_deleted: bool,
    pub limit: Option<u32>,
}

impl ListQuery {
    pub fn with_filter(filter: impl Into<String>) -> Self {
        Self {
            filter: Some(filter.into()),
            ..Self::default()
        }
    }
}

/// Returns the effective filter text, or `None` when everything matches.
///
/// Surrounding whitespace is part of the substring; it only matters for
/// the blank/wildcard check.
pub fn normalize_filter(filter: Option<&str>) -> Option<String> {
    let filter = filter?;
    let trimmed = filter.trim();
    if trimmed.is_empty() || trimmed == FILTER_WILDCARD {
        None
    } else {
        Some(filter.to_string())
    }
}

/// A quick-add style entry: object plus the properties saved with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEntry {
    pub object: ICalObject,
    pub categories: Vec<Category>,
    pub attachment: Option<Attachment>,
}

/// Repository interface for object and property operations.
pub trait ICalObjectRepository {
    fn insert(&self, object: &ICalObject) -> RepoResult<ICalObjectId>;
    fn insert_entry(&self, entry: &NewEntry) -> RepoResult<ICalObjectId>;
    fn update(&self, object: &ICalObject) -> RepoResult<()>;
    fn delete(&self, id: ICalObjectId) -> RepoResult<()>;
    fn mark_deleted(&self, id: ICalObjectId, now_ms: i64) -> RepoResult<()>;
    fn get(&self, id: ICalObjectId) -> RepoResult<Option<ICalEntity>>;
    fn get_object(&self, id: ICalObjectId) -> RepoResult<Option<ICalObject>>;
    fn list(&self, query: &ListQuery) -> RepoResult<Vec<ICalObject>>;
    fn related_notes(&self, parent_id: ICalObjectId) -> RepoResult<Vec<ICalObject>>;
    fn related_todos(&self, parent_id: ICalObjectId) -> RepoResult<Vec<ICalObject>>;
    fn all_categories(&self) -> RepoResult<Vec<String>>;
    fn insert_related_note(&self, parent_id: ICalObjectId, note: &ICalObject)
        -> RepoResult<ICalObjectId>;
    fn replace_categories(&self, id: ICalObjectId, categories: &[Category]) -> RepoResult<()>;
    fn add_attendee(&self, id: ICalObjectId, attendee: &Attendee) -> RepoResult<i64>;
    fn add_comment(&self, id: ICalObjectId, comment: &Comment) -> RepoResult<i64>;
    fn set_organizer(&self, id: ICalObjectId, organizer: &Organizer) -> RepoResult<i64>;
    fn add_resource(&self, id: ICalObjectId, resource: &Resource) -> RepoResult<i64>;
    fn add_attachment(&self, id: ICalObjectId, attachment: &Attachment) -> RepoResult<i64>;
    fn upsert_relatedto(&self, relation: &Relatedto) -> RepoResult<i64>;
}

/// SQLite-backed object repository.
pub struct SqliteICalRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteICalRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn ensure_exists(&self, id: ICalObjectId) -> RepoResult<()> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM icalobject WHERE id = ?1);",
            [id],
            |row| row.get(0),
        )?;
        if exists == 1 {
            Ok(())
        } else {
            Err(RepoError::NotFound(id))
        }
    }

    fn ensure_collection_exists(&self, collection_id: i64) -> RepoResult<()> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM collection WHERE collection_id = ?1);",
            [collection_id],
            |row| row.get(0),
        )?;
        if exists == 1 {
            Ok(())
        } else {
            Err(RepoError::CollectionNotFound(collection_id))
        }
    }

    fn insert_object_row(&self, object: &ICalObject) -> RepoResult<ICalObjectId> {
        object.validate()?;
        self.ensure_collection_exists(object.collection_id)?;

        self.conn.execute(
            "INSERT INTO icalobject (
                uid, component, module, summary, description,
                dtstart, dtstart_timezone, due, due_timezone, completed,
                percent, priority, status, classification, url,
                contact, location, collection_id, created, last_modified,
                sequence, dirty, deleted
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12,
                ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23
            );",
            params![
                object.uid,
                object.component.as_str(),
                object.module.as_str(),
                object.summary,
                object.description,
                object.dtstart,
                object.dtstart_timezone,
                object.due,
                object.due_timezone,
                object.completed,
                object.percent,
                object.priority,
                object.status,
                object.classification,
                object.url,
                object.contact,
                object.location,
                object.collection_id,
                object.created,
                object.last_modified,
                object.sequence,
                object.dirty,
                object.deleted,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn related_with_modules(
        &self,
        parent_id: ICalObjectId,
        modules: &[Module],
    ) -> RepoResult<Vec<ICalObject>> {
        let placeholders = vec!["?"; modules.len()].join(", ");
        let sql = format!(
            "{ICALOBJECT_SELECT_SQL}
             WHERE deleted = 0
               AND module IN ({placeholders})
               AND id IN (
                   SELECT linked_icalobject_id FROM relatedto
                   WHERE icalobject_id = ? AND reltype = 'CHILD'
               )
             ORDER BY last_modified DESC, id ASC"
        );
        let mut bind_values: Vec<Value> = modules
            .iter()
            .map(|module| Value::Text(module.as_str().to_string()))
            .collect();
        bind_values.push(Value::Integer(parent_id));

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut objects = Vec::new();
        while let Some(row) = rows.next()? {
            objects.push(parse_icalobject_row(row)?);
        }
        Ok(objects)
    }
}

impl ICalObjectRepository for SqliteICalRepository<'_> {
    fn insert(&self, object: &ICalObject) -> RepoResult<ICalObjectId> {
        self.insert_object_row(object)
    }

    fn insert_entry(&self, entry: &NewEntry) -> RepoResult<ICalObjectId> {
        let tx = self.conn.unchecked_transaction()?;
        let id = self.insert_object_row(&entry.object)?;
        for category in &entry.categories {
            property_repo::insert_category(&tx, id, category)?;
        }
        if let Some(attachment) = entry.attachment.as_ref() {
            property_repo::insert_attachment(&tx, id, attachment)?;
        }
        tx.commit()?;
        Ok(id)
    }

    fn update(&self, object: &ICalObject) -> RepoResult<()> {
        object.validate()?;
        self.ensure_collection_exists(object.collection_id)?;

        let changed = self.conn.execute(
            "UPDATE icalobject
             SET
                component = ?2,
                module = ?3,
                summary = ?4,
                description = ?5,
                dtstart = ?6,
                dtstart_timezone = ?7,
                due = ?8,
                due_timezone = ?9,
                completed = ?10,
                percent = ?11,
                priority = ?12,
                status = ?13,
                classification = ?14,
                url = ?15,
                contact = ?16,
                location = ?17,
                collection_id = ?18,
                last_modified = ?19,
                sequence = ?20,
                dirty = ?21,
                deleted = ?22
             WHERE id = ?1;",
            params![
                object.id,
                object.component.as_str(),
                object.module.as_str(),
                object.summary,
                object.description,
                object.dtstart,
                object.dtstart_timezone,
                object.due,
                object.due_timezone,
                object.completed,
                object.percent,
                object.priority,
                object.status,
                object.classification,
                object.url,
                object.contact,
                object.location,
                object.collection_id,
                object.last_modified,
                object.sequence,
                object.dirty,
                object.deleted,
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(object.id));
        }
        Ok(())
    }

    fn delete(&self, id: ICalObjectId) -> RepoResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        // Inbound edges have no FK on the linked end.
        tx.execute(
            "DELETE FROM relatedto WHERE linked_icalobject_id = ?1;",
            [id],
        )?;
        let changed = tx.execute("DELETE FROM icalobject WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        tx.commit()?;
        Ok(())
    }

    fn mark_deleted(&self, id: ICalObjectId, now_ms: i64) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE icalobject
             SET deleted = 1, dirty = 1, sequence = sequence + 1, last_modified = ?2
             WHERE id = ?1;",
            params![id, now_ms],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }

    fn get(&self, id: ICalObjectId) -> RepoResult<Option<ICalEntity>> {
        match self.get_object(id)? {
            Some(object) => Ok(Some(property_repo::load_entity(self.conn, object)?)),
            None => Ok(None),
        }
    }

    fn get_object(&self, id: ICalObjectId) -> RepoResult<Option<ICalObject>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{ICALOBJECT_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_icalobject_row(row)?));
        }
        Ok(None)
    }

    fn list(&self, query: &ListQuery) -> RepoResult<Vec<ICalObject>> {
        let mut sql = format!("{ICALOBJECT_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if !query.include_deleted {
            sql.push_str(" AND deleted = 0");
        }

        if let Some(filter) = normalize_filter(query.filter.as_deref()) {
            sql.push_str(
                " AND (instr(lower(coalesce(summary, '')), lower(?)) > 0
                    OR instr(lower(coalesce(description, '')), lower(?)) > 0)",
            );
            bind_values.push(Value::Text(filter.clone()));
            bind_values.push(Value::Text(filter));
        }

        if let Some(module) = query.module {
            sql.push_str(" AND module = ?");
            bind_values.push(Value::Text(module.as_str().to_string()));
        }

        if let Some(category) = query.category.as_deref().map(str::trim) {
            if !category.is_empty() {
                sql.push_str(
                    " AND EXISTS (
                        SELECT 1 FROM category c
                        WHERE c.icalobject_id = icalobject.id
                          AND c.text = ? COLLATE NOCASE
                    )",
                );
                bind_values.push(Value::Text(category.to_string()));
            }
        }

        sql.push_str(" ORDER BY last_modified DESC, id ASC");

        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            bind_values.push(Value::Integer(i64::from(limit)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut objects = Vec::new();
        while let Some(row) = rows.next()? {
            objects.push(parse_icalobject_row(row)?);
        }
        Ok(objects)
    }

    fn related_notes(&self, parent_id: ICalObjectId) -> RepoResult<Vec<ICalObject>> {
        self.related_with_modules(parent_id, &[Module::Journal, Module::Note])
    }

    fn related_todos(&self, parent_id: ICalObjectId) -> RepoResult<Vec<ICalObject>> {
        self.related_with_modules(parent_id, &[Module::Todo])
    }

    fn all_categories(&self) -> RepoResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT c.text
             FROM category c
             INNER JOIN icalobject o ON o.id = c.icalobject_id
             WHERE o.deleted = 0
             ORDER BY c.text COLLATE NOCASE ASC;",
        )?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut names: Vec<String> = Vec::new();
        for name in rows {
            let name = name?;
            if !names.iter().any(|known| known.eq_ignore_ascii_case(&name)) {
                names.push(name);
            }
        }
        Ok(names)
    }

    fn insert_related_note(
        &self,
        parent_id: ICalObjectId,
        note: &ICalObject,
    ) -> RepoResult<ICalObjectId> {
        let tx = self.conn.unchecked_transaction()?;
        self.ensure_exists(parent_id)?;
        let note_id = self.insert_object_row(note)?;
        property_repo::upsert_relatedto(
            &tx,
            &Relatedto {
                id: 0,
                icalobject_id: parent_id,
                linked_icalobject_id: note_id,
                reltype: RelType::Child,
                text: note.uid.clone(),
            },
        )?;
        tx.commit()?;
        Ok(note_id)
    }

    fn replace_categories(&self, id: ICalObjectId, categories: &[Category]) -> RepoResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        self.ensure_exists(id)?;
        tx.execute("DELETE FROM category WHERE icalobject_id = ?1;", [id])?;
        for category in categories {
            if !category.text.trim().is_empty() {
                property_repo::insert_category(&tx, id, category)?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn add_attendee(&self, id: ICalObjectId, attendee: &Attendee) -> RepoResult<i64> {
        self.ensure_exists(id)?;
        property_repo::insert_attendee(self.conn, id, attendee)
    }

    fn add_comment(&self, id: ICalObjectId, comment: &Comment) -> RepoResult<i64> {
        self.ensure_exists(id)?;
        property_repo::insert_comment(self.conn, id, comment)
    }

    fn set_organizer(&self, id: ICalObjectId, organizer: &Organizer) -> RepoResult<i64> {
        self.ensure_exists(id)?;
        property_repo::upsert_organizer(self.conn, id, organizer)
    }

    fn add_resource(&self, id: ICalObjectId, resource: &Resource) -> RepoResult<i64> {
        self.ensure_exists(id)?;
        property_repo::insert_resource(self.conn, id, resource)
    }

    fn add_attachment(&self, id: ICalObjectId, attachment: &Attachment) -> RepoResult<i64> {
        self.ensure_exists(id)?;
        property_repo::insert_attachment(self.conn, id, attachment)
    }

    fn upsert_relatedto(&self, relation: &Relatedto) -> RepoResult<i64> {
        self.ensure_exists(relation.icalobject_id)?;
        self.ensure_exists(relation.linked_icalobject_id)?;
        property_repo::upsert_relatedto(self.conn, relation)
    }
}

fn parse_icalobject_row(row: &Row<'_>) -> RepoResult<ICalObject> {
    let component_text: String = row.get("component")?;
    let component = Component::parse(&component_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid component `{component_text}` in icalobject.component"
        ))
    })?;

    let module_text: String = row.get("module")?;
    let module = Module::parse(&module_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid module `{module_text}` in icalobject.module"))
    })?;

    Ok(ICalObject {
        id: row.get("id")?,
        uid: row.get("uid")?,
        component,
        module,
        summary: row.get("summary")?,
        description: row.get("description")?,
        dtstart: row.get("dtstart")?,
        dtstart_timezone: row.get("dtstart_timezone")?,
        due: row.get("due")?,
        due_timezone: row.get("due_timezone")?,
        completed: row.get("completed")?,
        percent: row.get("percent")?,
        priority: row.get("priority")?,
        status: row.get("status")?,
        classification: row.get("classification")?,
        url: row.get("url")?,
        contact: row.get("contact")?,
        location: row.get("location")?,
        collection_id: row.get("collection_id")?,
        created: row.get("created")?,
        last_modified: row.get("last_modified")?,
        sequence: row.get("sequence")?,
        dirty: row.get("dirty")?,
        deleted: row.get("deleted")?,
    })
}

