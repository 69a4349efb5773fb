//! Property record persistence helpers.
//!
//! # Responsibility
//! - Load and write the records owned by one object (categories, attendees,
//!   comments, organizer, resources, attachments, relations).
//!
//! # Invariants
//! - Callers run multi-row writes inside their own transaction.
//! - Cascading deletes are left to the schema; nothing here deletes owners.

use crate::model::entity::ICalEntity;
use crate::model::ical_object::{ICalObject, ICalObjectId};
use crate::model::property::{
    Attachment, Attendee, Category, Comment, Organizer, RelType, Relatedto, Resource,
};
use crate::repo::ical_repo::{RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension};

pub(crate) fn load_entity(conn: &Connection, object: ICalObject) -> RepoResult<ICalEntity> {
    let id = object.id;
    Ok(ICalEntity {
        categories: load_categories(conn, id)?,
        attendees: load_attendees(conn, id)?,
        comments: load_comments(conn, id)?,
        organizer: load_organizer(conn, id)?,
        resources: load_resources(conn, id)?,
        attachments: load_attachments(conn, id)?,
        relatedto: load_relatedto(conn, id)?,
        property: object,
    })
}

pub(crate) fn load_categories(conn: &Connection, id: ICalObjectId) -> RepoResult<Vec<Category>> {
    let mut stmt = conn.prepare(
        "SELECT id, icalobject_id, text FROM category WHERE icalobject_id = ?1 ORDER BY id ASC;",
    )?;
    let rows = stmt.query_map([id], |row| {
        Ok(Category {
            id: row.get("id")?,
            icalobject_id: row.get("icalobject_id")?,
            text: row.get("text")?,
        })
    })?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

fn load_attendees(conn: &Connection, id: ICalObjectId) -> RepoResult<Vec<Attendee>> {
    let mut stmt = conn.prepare(
        "SELECT id, icalobject_id, caladdress, cn, role, partstat
         FROM attendee WHERE icalobject_id = ?1 ORDER BY id ASC;",
    )?;
    let rows = stmt.query_map([id], |row| {
        Ok(Attendee {
            id: row.get("id")?,
            icalobject_id: row.get("icalobject_id")?,
            caladdress: row.get("caladdress")?,
            cn: row.get("cn")?,
            role: row.get("role")?,
            partstat: row.get("partstat")?,
        })
    })?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

fn load_comments(conn: &Connection, id: ICalObjectId) -> RepoResult<Vec<Comment>> {
    let mut stmt = conn.prepare(
        "SELECT id, icalobject_id, text FROM comment WHERE icalobject_id = ?1 ORDER BY id ASC;",
    )?;
    let rows = stmt.query_map([id], |row| {
        Ok(Comment {
            id: row.get("id")?,
            icalobject_id: row.get("icalobject_id")?,
            text: row.get("text")?,
        })
    })?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

fn load_organizer(conn: &Connection, id: ICalObjectId) -> RepoResult<Option<Organizer>> {
    let organizer = conn
        .query_row(
            "SELECT id, icalobject_id, caladdress, cn FROM organizer WHERE icalobject_id = ?1;",
            [id],
            |row| {
                Ok(Organizer {
                    id: row.get("id")?,
                    icalobject_id: row.get("icalobject_id")?,
                    caladdress: row.get("caladdress")?,
                    cn: row.get("cn")?,
                })
            },
        )
        .optional()?;
    Ok(organizer)
}

fn load_resources(conn: &Connection, id: ICalObjectId) -> RepoResult<Vec<Resource>> {
    let mut stmt = conn.prepare(
        "SELECT id, icalobject_id, text, reltype
         FROM resource WHERE icalobject_id = ?1 ORDER BY id ASC;",
    )?;
    let rows = stmt.query_map([id], |row| {
        Ok(Resource {
            id: row.get("id")?,
            icalobject_id: row.get("icalobject_id")?,
            text: row.get("text")?,
            reltype: row.get("reltype")?,
        })
    })?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

fn load_attachments(conn: &Connection, id: ICalObjectId) -> RepoResult<Vec<Attachment>> {
    let mut stmt = conn.prepare(
        "SELECT id, icalobject_id, uri, filename, fmttype
         FROM attachment WHERE icalobject_id = ?1 ORDER BY id ASC;",
    )?;
    let rows = stmt.query_map([id], |row| {
        Ok(Attachment {
            id: row.get("id")?,
            icalobject_id: row.get("icalobject_id")?,
            uri: row.get("uri")?,
            filename: row.get("filename")?,
            fmttype: row.get("fmttype")?,
        })
    })?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

fn load_relatedto(conn: &Connection, id: ICalObjectId) -> RepoResult<Vec<Relatedto>> {
    let mut stmt = conn.prepare(
        "SELECT id, icalobject_id, linked_icalobject_id, reltype, text
         FROM relatedto WHERE icalobject_id = ?1 ORDER BY id ASC;",
    )?;
    let mut rows = stmt.query([id])?;
    let mut relations = Vec::new();
    while let Some(row) = rows.next()? {
        let reltype_text: String = row.get("reltype")?;
        let reltype = RelType::parse(&reltype_text).ok_or_else(|| {
            RepoError::InvalidData(format!("invalid reltype `{reltype_text}` in relatedto"))
        })?;
        relations.push(Relatedto {
            id: row.get("id")?,
            icalobject_id: row.get("icalobject_id")?,
            linked_icalobject_id: row.get("linked_icalobject_id")?,
            reltype,
            text: row.get("text")?,
        });
    }
    Ok(relations)
}

pub(crate) fn insert_category(
    conn: &Connection,
    id: ICalObjectId,
    category: &Category,
) -> RepoResult<i64> {
    conn.execute(
        "INSERT INTO category (icalobject_id, text) VALUES (?1, ?2);",
        params![id, category.text.trim()],
    )?;
    Ok(conn.last_insert_rowid())
}

pub(crate) fn insert_attendee(
    conn: &Connection,
    id: ICalObjectId,
    attendee: &Attendee,
) -> RepoResult<i64> {
    conn.execute(
        "INSERT INTO attendee (icalobject_id, caladdress, cn, role, partstat)
         VALUES (?1, ?2, ?3, ?4, ?5);",
        params![
            id,
            attendee.caladdress,
            attendee.cn,
            attendee.role,
            attendee.partstat
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub(crate) fn insert_comment(conn: &Connection, id: ICalObjectId, comment: &Comment) -> RepoResult<i64> {
    conn.execute(
        "INSERT INTO comment (icalobject_id, text) VALUES (?1, ?2);",
        params![id, comment.text],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Replaces the single organizer row of an object.
pub(crate) fn upsert_organizer(
    conn: &Connection,
    id: ICalObjectId,
    organizer: &Organizer,
) -> RepoResult<i64> {
    conn.execute(
        "INSERT INTO organizer (icalobject_id, caladdress, cn) VALUES (?1, ?2, ?3)
         ON CONFLICT(icalobject_id) DO UPDATE SET caladdress = excluded.caladdress, cn = excluded.cn;",
        params![id, organizer.caladdress, organizer.cn],
    )?;
    let row_id = conn.query_row(
        "SELECT id FROM organizer WHERE icalobject_id = ?1;",
        [id],
        |row| row.get(0),
    )?;
    Ok(row_id)
}

pub(crate) fn insert_resource(
    conn: &Connection,
    id: ICalObjectId,
    resource: &Resource,
) -> RepoResult<i64> {
    conn.execute(
        "INSERT INTO resource (icalobject_id, text, reltype) VALUES (?1, ?2, ?3);",
        params![id, resource.text, resource.reltype],
    )?;
    Ok(conn.last_insert_rowid())
}

pub(crate) fn insert_attachment(
    conn: &Connection,
    id: ICalObjectId,
    attachment: &Attachment,
) -> RepoResult<i64> {
    conn.execute(
        "INSERT INTO attachment (icalobject_id, uri, filename, fmttype) VALUES (?1, ?2, ?3, ?4);",
        params![id, attachment.uri, attachment.filename, attachment.fmttype],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Inserts a relation unless an identical edge already exists.
pub(crate) fn upsert_relatedto(conn: &Connection, relation: &Relatedto) -> RepoResult<i64> {
    let existing: Option<i64> = conn
        .query_row(
            "SELECT id FROM relatedto
             WHERE icalobject_id = ?1 AND linked_icalobject_id = ?2 AND reltype = ?3;",
            params![
                relation.icalobject_id,
                relation.linked_icalobject_id,
                relation.reltype.as_str()
            ],
            |row| row.get(0),
        )
        .optional()?;
    if let Some(row_id) = existing {
        conn.execute(
            "UPDATE relatedto SET text = ?2 WHERE id = ?1;",
            params![row_id, relation.text],
        )?;
        return Ok(row_id);
    }

    conn.execute(
        "INSERT INTO relatedto (icalobject_id, linked_icalobject_id, reltype, text)
         VALUES (?1, ?2, ?3, ?4);",
        params![
            relation.icalobject_id,
            relation.linked_icalobject_id,
            relation.reltype.as_str(),
            relation.text
        ],
    )?;
    Ok(conn.last_insert_rowid())
}
