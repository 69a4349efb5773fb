use jtx_core::db::open_db_in_memory;
use jtx_core::repo::collection_repo::{CollectionRepository, SqliteCollectionRepository};
use jtx_core::{
    Attachment, Attendee, Category, Comment, ICalCollection, ICalObject, ICalObjectRepository,
    Module, NewEntry, Organizer, RelType, Relatedto, RepoError, Resource, SqliteICalRepository,
    ValidationError,
};
use rusqlite::Connection;

const NOW: i64 = 1_709_649_000_000;

fn count(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| {
        row.get(0)
    })
    .unwrap()
}

fn attendee(address: &str) -> Attendee {
    Attendee {
        id: 0,
        icalobject_id: 0,
        caladdress: address.to_string(),
        cn: None,
        role: None,
        partstat: None,
    }
}

#[test]
fn insert_and_get_roundtrip() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteICalRepository::new(&conn);

    let mut journal = ICalObject::create_journal(NOW);
    journal.summary = Some("Morning pages".to_string());
    let id = repo.insert(&journal).unwrap();

    let entity = repo.get(id).unwrap().unwrap();
    assert_eq!(entity.property.id, id);
    assert_eq!(entity.property.uid, journal.uid);
    assert_eq!(entity.property.module, Module::Journal);
    assert_eq!(entity.property.summary.as_deref(), Some("Morning pages"));
    assert!(entity.categories.is_empty());
    assert!(entity.organizer.is_none());
}

#[test]
fn get_missing_returns_none() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteICalRepository::new(&conn);
    assert!(repo.get(42).unwrap().is_none());
}

#[test]
fn insert_entry_stores_categories_and_attachment_together() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteICalRepository::new(&conn);

    let id = repo
        .insert_entry(&NewEntry {
            object: ICalObject::create_note(NOW),
            categories: vec![Category::new("errand"), Category::new("home")],
            attachment: Some(Attachment::from_uri("content://photo/1")),
        })
        .unwrap();

    let entity = repo.get(id).unwrap().unwrap();
    let names: Vec<_> = entity.categories.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(names, vec!["errand", "home"]);
    assert_eq!(entity.attachments.len(), 1);
    assert_eq!(
        entity.attachments[0].uri.as_deref(),
        Some("content://photo/1")
    );
}

#[test]
fn update_bumps_fields_and_missing_update_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteICalRepository::new(&conn);

    let mut todo = ICalObject::create_todo(NOW);
    todo.id = repo.insert(&todo).unwrap();
    todo.summary = Some("Call plumber".to_string());
    todo.touch(NOW + 1_000);
    repo.update(&todo).unwrap();

    let loaded = repo.get_object(todo.id).unwrap().unwrap();
    assert_eq!(loaded.summary.as_deref(), Some("Call plumber"));
    assert_eq!(loaded.last_modified, NOW + 1_000);
    assert_eq!(loaded.sequence, 1);

    let mut ghost = ICalObject::create_todo(NOW);
    ghost.id = 9_999;
    assert!(matches!(repo.update(&ghost), Err(RepoError::NotFound(9_999))));
    assert!(matches!(repo.delete(9_999), Err(RepoError::NotFound(9_999))));
}

#[test]
fn invalid_objects_are_rejected() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteICalRepository::new(&conn);

    let mut todo = ICalObject::create_todo(NOW);
    todo.percent = Some(101);
    assert!(matches!(
        repo.insert(&todo),
        Err(RepoError::Validation(ValidationError::PercentOutOfRange(101)))
    ));

    let mut orphan = ICalObject::create_note(NOW);
    orphan.collection_id = 77;
    assert!(matches!(
        repo.insert(&orphan),
        Err(RepoError::CollectionNotFound(77))
    ));
    assert_eq!(count(&conn, "icalobject"), 0);
}

#[test]
fn delete_cascades_to_every_property_record() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteICalRepository::new(&conn);

    let parent = repo.insert(&ICalObject::create_journal(NOW)).unwrap();
    let id = repo
        .insert_entry(&NewEntry {
            object: ICalObject::create_todo(NOW),
            categories: vec![Category::new("work")],
            attachment: Some(Attachment::from_uri("https://example.com/a.pdf")),
        })
        .unwrap();
    repo.add_attendee(id, &attendee("mailto:a@example.com"))
        .unwrap();
    repo.add_comment(
        id,
        &Comment {
            id: 0,
            icalobject_id: 0,
            text: "bring notes".to_string(),
        },
    )
    .unwrap();
    repo.set_organizer(
        id,
        &Organizer {
            id: 0,
            icalobject_id: 0,
            caladdress: "mailto:boss@example.com".to_string(),
            cn: None,
        },
    )
    .unwrap();
    repo.add_resource(
        id,
        &Resource {
            id: 0,
            icalobject_id: 0,
            text: "projector".to_string(),
            reltype: None,
        },
    )
    .unwrap();
    let child_uid = repo.get_object(id).unwrap().unwrap().uid;
    repo.upsert_relatedto(&Relatedto {
        id: 0,
        icalobject_id: parent,
        linked_icalobject_id: id,
        reltype: RelType::Child,
        text: child_uid,
    })
    .unwrap();

    repo.delete(id).unwrap();

    for table in [
        "category",
        "attendee",
        "comment",
        "organizer",
        "resource",
        "attachment",
        "relatedto",
    ] {
        assert_eq!(count(&conn, table), 0, "leftover rows in `{table}`");
    }
    assert!(repo.get(id).unwrap().is_none());
    assert!(repo.get(parent).unwrap().is_some());
}

#[test]
fn insert_related_note_links_child_and_is_atomic() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteICalRepository::new(&conn);

    let parent = repo.insert(&ICalObject::create_todo(NOW)).unwrap();
    let mut note = ICalObject::create_note(NOW);
    note.summary = Some("remember the keys".to_string());
    let note_id = repo.insert_related_note(parent, &note).unwrap();

    let related = repo.related_notes(parent).unwrap();
    assert_eq!(related.len(), 1);
    assert_eq!(related[0].id, note_id);
    assert!(repo.related_todos(parent).unwrap().is_empty());

    let parent_entity = repo.get(parent).unwrap().unwrap();
    assert_eq!(parent_entity.relatedto.len(), 1);
    assert_eq!(parent_entity.relatedto[0].reltype, RelType::Child);
    assert_eq!(parent_entity.relatedto[0].text, note.uid);

    let before = count(&conn, "icalobject");
    let err = repo
        .insert_related_note(12_345, &ICalObject::create_note(NOW))
        .unwrap_err();
    assert!(matches!(err, RepoError::NotFound(12_345)));
    assert_eq!(count(&conn, "icalobject"), before);
}

#[test]
fn mark_deleted_hides_object_from_lists() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteICalRepository::new(&conn);

    let id = repo.insert(&ICalObject::create_note(NOW)).unwrap();
    repo.mark_deleted(id, NOW + 5).unwrap();

    let loaded = repo.get_object(id).unwrap().unwrap();
    assert!(loaded.deleted);
    assert_eq!(loaded.last_modified, NOW + 5);
    assert!(repo.list(&Default::default()).unwrap().is_empty());
}

#[test]
fn deleting_collection_cascades_to_its_objects() {
    let conn = open_db_in_memory().unwrap();
    let collections = SqliteCollectionRepository::new(&conn);
    let repo = SqliteICalRepository::new(&conn);

    let mut remote = ICalCollection::local("Work");
    remote.account_type = "DAVx5".to_string();
    let collection_id = collections.create_collection(&remote).unwrap();

    let mut todo = ICalObject::create_todo(NOW);
    todo.collection_id = collection_id;
    let todo_id = repo.insert(&todo).unwrap();
    repo.replace_categories(todo_id, &[Category::new("work")])
        .unwrap();
    let local_id = repo.insert(&ICalObject::create_note(NOW)).unwrap();

    collections.delete_collection(collection_id).unwrap();

    assert!(repo.get(todo_id).unwrap().is_none());
    assert!(repo.get(local_id).unwrap().is_some());
    assert_eq!(count(&conn, "category"), 0);
    assert_eq!(collections.list_collections().unwrap().len(), 1);
}

#[test]
fn replace_categories_overwrites_previous_set() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteICalRepository::new(&conn);

    let id = repo.insert(&ICalObject::create_note(NOW)).unwrap();
    repo.replace_categories(id, &[Category::new("a"), Category::new("b")])
        .unwrap();
    repo.replace_categories(id, &[Category::new("c"), Category::new("  ")])
        .unwrap();

    let entity = repo.get(id).unwrap().unwrap();
    let names: Vec<_> = entity.categories.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(names, vec!["c"]);
    assert_eq!(repo.all_categories().unwrap(), vec!["c".to_string()]);
}
