use jtx_core::viewmodel::{QuickAddViewModel, RecognitionListener, SaveOutcome};
use jtx_core::{
    parse_quick_add, Attachment, EntityStore, ICalCollection, Module, TodoDefaults,
    LOCAL_COLLECTION_ID,
};

const NOW: i64 = 1_709_649_000_000;
const DAY_MS: i64 = 24 * 60 * 60 * 1000;

#[test]
fn parse_extracts_summary_category_and_url() {
    let parsed = parse_quick_add("Buy milk #errand https://example.com");
    assert_eq!(parsed.summary.as_deref(), Some("Buy milk"));
    assert_eq!(parsed.url.as_deref(), Some("https://example.com"));
    assert_eq!(parsed.categories.len(), 1);
    assert_eq!(parsed.categories[0].text, "errand");
}

#[test]
fn parse_keeps_hashtag_order_and_drops_duplicates() {
    let parsed = parse_quick_add("#b plan #a trip #B\nsee https://x.test/#anchor");
    let names: Vec<_> = parsed.categories.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(names, vec!["b", "a"]);
    assert_eq!(parsed.summary.as_deref(), Some("plan trip"));
    assert_eq!(parsed.url.as_deref(), Some("https://x.test/#anchor"));
    assert_eq!(
        parsed.description.as_deref(),
        Some("see https://x.test/#anchor")
    );
}

#[tokio::test]
async fn save_into_store_persists_parsed_fields() {
    let store = EntityStore::open_in_memory().unwrap();
    let mut view_model = QuickAddViewModel::load(
        &store,
        Some(Module::Todo),
        None,
        TodoDefaults {
            start_in_days: None,
            due_in_days: Some(1),
        },
    )
    .await
    .unwrap();
    assert_eq!(
        view_model.current_collection().map(|c| c.collection_id),
        Some(LOCAL_COLLECTION_ID)
    );

    view_model.set_text("Buy milk #errand https://example.com");
    view_model.set_attachment(Some(Attachment::from_uri("content://media/7")));
    let id = view_model
        .save_into(&store, NOW)
        .await
        .unwrap()
        .expect("entry saved");

    let entity = store.get(id).await.unwrap().unwrap();
    assert_eq!(entity.property.module, Module::Todo);
    assert_eq!(entity.property.summary.as_deref(), Some("Buy milk"));
    assert_eq!(entity.property.url.as_deref(), Some("https://example.com"));
    assert_eq!(entity.categories[0].text, "errand");
    assert_eq!(entity.attachments.len(), 1);
    let due = entity.property.due.expect("due default applied");
    assert_eq!(due % DAY_MS, 0);
    assert!(due > NOW);
    assert_eq!(view_model.text(), "");
}

#[tokio::test]
async fn dictated_text_is_saved() {
    let store = EntityStore::open_in_memory().unwrap();
    let mut view_model = QuickAddViewModel::load(&store, None, None, TodoDefaults::default())
        .await
        .unwrap();

    view_model.on_beginning_of_speech();
    view_model.on_partial_results(&["water".to_string()]);
    view_model.on_results(&["water the plants #home".to_string()]);
    assert_eq!(view_model.dictation().transcript(), "");

    let mut saved = None;
    let outcome = view_model.save(false, NOW, |entry| saved = Some(entry));
    assert_eq!(outcome, SaveOutcome::Saved { dismiss: false });
    let entry = saved.unwrap();
    assert_eq!(entry.object.module, Module::Journal);
    assert_eq!(entry.object.summary.as_deref(), Some("water the plants"));

    let id = store.insert_entry(entry.into_new_entry()).await.unwrap();
    assert_eq!(store.get(id).await.unwrap().unwrap().categories.len(), 1);
}

#[test]
fn no_writable_collection_cannot_save() {
    let mut read_only = ICalCollection::local("Shared");
    read_only.collection_id = 3;
    read_only.read_only = true;
    let mut view_model =
        QuickAddViewModel::new(vec![read_only], None, Some(3), TodoDefaults::default());
    view_model.set_text("anything");

    assert!(view_model.current_collection().is_none());
    assert_eq!(
        view_model.save(false, NOW, |_| {}),
        SaveOutcome::NoCollection
    );
    assert_eq!(view_model.text(), "anything");
}
