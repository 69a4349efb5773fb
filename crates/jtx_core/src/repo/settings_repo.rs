//! Key/value application settings persisted next to the entities.

use crate::repo::ical_repo::{RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension};

/// Storage for small scalar settings.
pub trait SettingsRepository {
    fn get_i64(&self, key: &str) -> RepoResult<Option<i64>>;
    fn set_i64(&self, key: &str, value: i64) -> RepoResult<()>;
}

pub struct SqliteSettingsRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteSettingsRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl SettingsRepository for SqliteSettingsRepository<'_> {
    fn get_i64(&self, key: &str) -> RepoResult<Option<i64>> {
        let value: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM app_settings WHERE key = ?1;",
                [key],
                |row| row.get(0),
            )
            .optional()?;
        match value {
            Some(text) => text.parse::<i64>().map(Some).map_err(|_| {
                RepoError::InvalidData(format!("setting `{key}` is not an integer: `{text}`"))
            }),
            None => Ok(None),
        }
    }

    fn set_i64(&self, key: &str, value: i64) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO app_settings (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![key, value.to_string()],
        )?;
        Ok(())
    }
}
