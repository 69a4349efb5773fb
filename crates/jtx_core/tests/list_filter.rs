use jtx_core::db::open_db_in_memory;
use jtx_core::{
    Category, ICalObject, ICalObjectRepository, ListQuery, Module, NewEntry, SqliteICalRepository,
};
use rusqlite::Connection;

const NOW: i64 = 1_709_649_000_000;

fn insert(
    repo: &SqliteICalRepository<'_>,
    module: Module,
    summary: &str,
    description: Option<&str>,
    last_modified: i64,
    categories: &[&str],
) -> i64 {
    let mut object = ICalObject::for_module(module, NOW);
    object.summary = Some(summary.to_string());
    object.description = description.map(str::to_string);
    object.last_modified = last_modified;
    repo.insert_entry(&NewEntry {
        object,
        categories: categories.iter().map(|name| Category::new(*name)).collect(),
        attachment: None,
    })
    .unwrap()
}

fn summaries(objects: &[ICalObject]) -> Vec<&str> {
    objects
        .iter()
        .map(|object| object.summary.as_deref().unwrap_or_default())
        .collect()
}

fn seeded() -> Connection {
    let conn = open_db_in_memory().unwrap();
    {
        let repo = SqliteICalRepository::new(&conn);
        insert(&repo, Module::Todo, "Buy MILK", None, NOW + 1, &["errand"]);
        insert(
            &repo,
            Module::Journal,
            "Garden diary",
            Some("planted milkweed"),
            NOW + 3,
            &["garden"],
        );
        insert(&repo, Module::Note, "Recipe", Some("flour, sugar"), NOW + 2, &[]);
    }
    conn
}

#[test]
fn filter_matches_summary_or_description_ignoring_case() {
    let conn = seeded();
    let repo = SqliteICalRepository::new(&conn);

    let hits = repo.list(&ListQuery::with_filter("milk")).unwrap();
    assert_eq!(summaries(&hits), vec!["Garden diary", "Buy MILK"]);

    let hits = repo.list(&ListQuery::with_filter("SUGAR")).unwrap();
    assert_eq!(summaries(&hits), vec!["Recipe"]);

    assert!(repo.list(&ListQuery::with_filter("nothing")).unwrap().is_empty());
}

#[test]
fn blank_filter_and_wildcard_list_everything_newest_first() {
    let conn = seeded();
    let repo = SqliteICalRepository::new(&conn);

    let expected = vec!["Garden diary", "Recipe", "Buy MILK"];
    for filter in ["", "   ", "%"] {
        let hits = repo.list(&ListQuery::with_filter(filter)).unwrap();
        assert_eq!(summaries(&hits), expected, "filter `{filter}`");
    }
    assert_eq!(
        summaries(&repo.list(&ListQuery::default()).unwrap()),
        expected
    );
}

#[test]
fn filter_is_literal_substring() {
    let conn = seeded();
    let repo = SqliteICalRepository::new(&conn);

    assert!(repo.list(&ListQuery::with_filter("b_y")).unwrap().is_empty());
    assert!(repo.list(&ListQuery::with_filter("flour sugar")).unwrap().is_empty());
    assert_eq!(
        summaries(&repo.list(&ListQuery::with_filter("flour, s")).unwrap()),
        vec!["Recipe"]
    );
}

#[test]
fn equal_timestamps_fall_back_to_id_order() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteICalRepository::new(&conn);
    let first = insert(&repo, Module::Note, "one", None, NOW, &[]);
    let second = insert(&repo, Module::Note, "two", None, NOW, &[]);

    let ids: Vec<_> = repo
        .list(&ListQuery::default())
        .unwrap()
        .iter()
        .map(|object| object.id)
        .collect();
    assert_eq!(ids, vec![first, second]);
}

#[test]
fn module_category_and_limit_narrow_results() {
    let conn = seeded();
    let repo = SqliteICalRepository::new(&conn);

    let todos = repo
        .list(&ListQuery {
            module: Some(Module::Todo),
            ..ListQuery::default()
        })
        .unwrap();
    assert_eq!(summaries(&todos), vec!["Buy MILK"]);

    let garden = repo
        .list(&ListQuery {
            category: Some("GARDEN".to_string()),
            ..ListQuery::default()
        })
        .unwrap();
    assert_eq!(summaries(&garden), vec!["Garden diary"]);

    let limited = repo
        .list(&ListQuery {
            limit: Some(1),
            ..ListQuery::default()
        })
        .unwrap();
    assert_eq!(summaries(&limited), vec!["Garden diary"]);
}

#[test]
fn all_categories_are_distinct_and_sorted() {
    let conn = seeded();
    let repo = SqliteICalRepository::new(&conn);
    insert(&repo, Module::Note, "extra", None, NOW, &["errand", "admin"]);

    assert_eq!(
        repo.all_categories().unwrap(),
        vec!["admin".to_string(), "errand".to_string(), "garden".to_string()]
    );
}

#[test]
fn filter_keeps_surrounding_spaces() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteICalRepository::new(&conn);
    insert(&repo, Module::Note, "buttermilk", None, NOW, &[]);
    insert(&repo, Module::Note, "oat milk", None, NOW + 1, &[]);

    let hits = repo.list(&ListQuery::with_filter(" milk")).unwrap();
    assert_eq!(summaries(&hits), vec!["oat milk"]);

    let padded_wildcard = repo.list(&ListQuery::with_filter("  %  ")).unwrap();
    assert_eq!(padded_wildcard.len(), 2);
}
