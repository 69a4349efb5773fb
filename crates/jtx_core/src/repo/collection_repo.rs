//! Collection repository.
//!
//! # Invariants
//! - Deleting a collection cascades to its objects and their properties.
//! - Listing order is `collection_id ASC`, so the seeded local collection
//!   comes first.

use crate::model::collection::ICalCollection;
use crate::repo::ical_repo::{RepoError, RepoResult};
use rusqlite::{params, Connection, Row};

const COLLECTION_SELECT_SQL: &str = "SELECT
    collection_id,
    display_name,
    description,
    account_name,
    account_type,
    color,
    supports_vjournal,
    supports_vtodo,
    read_only
FROM collection";

pub trait CollectionRepository {
    fn create_collection(&self, collection: &ICalCollection) -> RepoResult<i64>;
    fn get_collection(&self, collection_id: i64) -> RepoResult<Option<ICalCollection>>;
    fn list_collections(&self) -> RepoResult<Vec<ICalCollection>>;
    fn delete_collection(&self, collection_id: i64) -> RepoResult<()>;
}

pub struct SqliteCollectionRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCollectionRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl CollectionRepository for SqliteCollectionRepository<'_> {
    fn create_collection(&self, collection: &ICalCollection) -> RepoResult<i64> {
        self.conn.execute(
            "INSERT INTO collection (
                display_name, description, account_name, account_type,
                color, supports_vjournal, supports_vtodo, read_only
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                collection.display_name,
                collection.description,
                collection.account_name,
                collection.account_type,
                collection.color,
                collection.supports_vjournal,
                collection.supports_vtodo,
                collection.read_only,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_collection(&self, collection_id: i64) -> RepoResult<Option<ICalCollection>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{COLLECTION_SELECT_SQL} WHERE collection_id = ?1;"))?;
        let mut rows = stmt.query([collection_id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_collection_row(row)?));
        }
        Ok(None)
    }

    fn list_collections(&self) -> RepoResult<Vec<ICalCollection>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{COLLECTION_SELECT_SQL} ORDER BY collection_id ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut collections = Vec::new();
        while let Some(row) = rows.next()? {
            collections.push(parse_collection_row(row)?);
        }
        Ok(collections)
    }

    fn delete_collection(&self, collection_id: i64) -> RepoResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "DELETE FROM relatedto
             WHERE linked_icalobject_id IN (
                 SELECT id FROM icalobject WHERE collection_id = ?1
             );",
            [collection_id],
        )?;
        let changed = tx.execute(
            "DELETE FROM collection WHERE collection_id = ?1;",
            [collection_id],
        )?;
        if changed == 0 {
            return Err(RepoError::CollectionNotFound(collection_id));
        }
        tx.commit()?;
        Ok(())
    }
}

fn parse_collection_row(row: &Row<'_>) -> RepoResult<ICalCollection> {
    Ok(ICalCollection {
        collection_id: row.get("collection_id")?,
        display_name: row.get("display_name")?,
        description: row.get("description")?,
        account_name: row.get("account_name")?,
        account_type: row.get("account_type")?,
        color: row.get("color")?,
        supports_vjournal: row.get("supports_vjournal")?,
        supports_vtodo: row.get("supports_vtodo")?,
        read_only: row.get("read_only")?,
    })
}
