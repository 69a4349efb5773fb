//! Quick-add dialog state.
//!
//! # Responsibility
//! - Track the selected module and collection, the text and its dictation.
//! - Keep the module compatible with the selected collection.
//! - Turn the text into an entry on save.
//!
//! # Invariants
//! - Only writable collections are offered.
//! - The selected module is always supported by the selected collection.

use super::dictation::{
    DictationSession, DictationStart, RecognitionListener, RecognitionRequest, SpeechError,
    SpeechRecognizer,
};
use crate::config::TodoDefaults;
use crate::model::collection::ICalCollection;
use crate::model::ical_object::{ICalObject, ICalObjectId, Module};
use crate::model::property::{Attachment, Category};
use crate::repo::ical_repo::NewEntry;
use crate::service::quick_add::compose_entry;
use crate::store::{EntityStore, StoreResult};
use log::info;

/// What the save callback receives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuickAddEntry {
    pub object: ICalObject,
    pub categories: Vec<Category>,
    pub attachment: Option<Attachment>,
    /// Open the detail screen in edit mode after saving.
    pub edit_after_saving: bool,
}

impl QuickAddEntry {
    pub fn into_new_entry(self) -> NewEntry {
        NewEntry {
            object: self.object,
            categories: self.categories,
            attachment: self.attachment,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Text was blank; `no_text_error` is raised and the dialog stays.
    NoText,
    /// No writable collection to save into.
    NoCollection,
    /// The entry was handed over. The dialog stays open for the next entry
    /// unless the caller is moving on to the editor.
    Saved { dismiss: bool },
}

pub struct QuickAddViewModel {
    collections: Vec<ICalCollection>,
    collection_id: Option<i64>,
    module: Module,
    dictation: DictationSession,
    attachment: Option<Attachment>,
    no_text_error: bool,
    todo_defaults: TodoDefaults,
}

impl QuickAddViewModel {
    /// Builds the dialog state from known collections.
    ///
    /// `preset_collection` wins when it is writable; otherwise the first
    /// writable collection is selected.
    pub fn new(
        collections: Vec<ICalCollection>,
        preset_module: Option<Module>,
        preset_collection: Option<i64>,
        todo_defaults: TodoDefaults,
    ) -> Self {
        let collections: Vec<ICalCollection> = collections
            .into_iter()
            .filter(|collection| !collection.read_only)
            .collect();
        let collection_id = preset_collection
            .filter(|id| collections.iter().any(|c| c.collection_id == *id))
            .or_else(|| collections.first().map(|c| c.collection_id));

        let mut view_model = Self {
            collections,
            collection_id: None,
            module: preset_module.unwrap_or(Module::Journal),
            dictation: DictationSession::default(),
            attachment: None,
            no_text_error: false,
            todo_defaults,
        };
        if let Some(id) = collection_id {
            view_model.select_collection(id);
        }
        view_model
    }

    /// Loads collections from the store.
    pub async fn load(
        store: &EntityStore,
        preset_module: Option<Module>,
        preset_collection: Option<i64>,
        todo_defaults: TodoDefaults,
    ) -> StoreResult<Self> {
        let collections = store.collections().await?;
        Ok(Self::new(
            collections,
            preset_module,
            preset_collection,
            todo_defaults,
        ))
    }

    pub fn collections(&self) -> &[ICalCollection] {
        &self.collections
    }

    pub fn current_collection(&self) -> Option<&ICalCollection> {
        let id = self.collection_id?;
        self.collections.iter().find(|c| c.collection_id == id)
    }

    pub fn current_module(&self) -> Module {
        self.module
    }

    /// Whether `module` can be picked for the current collection.
    pub fn module_enabled(&self, module: Module) -> bool {
        self.current_collection()
            .is_some_and(|collection| collection.supports(module))
    }

    /// Selects a module; ignored when the collection does not support it.
    pub fn select_module(&mut self, module: Module) -> bool {
        if !self.module_enabled(module) {
            return false;
        }
        self.module = module;
        true
    }

    /// Selects a writable collection and coerces the module to fit it.
    pub fn select_collection(&mut self, collection_id: i64) -> bool {
        let Some(collection) = self
            .collections
            .iter()
            .find(|c| c.collection_id == collection_id)
        else {
            return false;
        };
        self.module = match self.module {
            Module::Journal | Module::Note if !collection.supports_vjournal => Module::Todo,
            Module::Todo if !collection.supports_vtodo => Module::Note,
            module => module,
        };
        self.collection_id = Some(collection_id);
        true
    }

    pub fn text(&self) -> &str {
        self.dictation.text()
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.dictation.set_text(text);
        if !self.dictation.text().trim().is_empty() {
            self.no_text_error = false;
        }
    }

    pub fn no_text_error(&self) -> bool {
        self.no_text_error
    }

    pub fn set_attachment(&mut self, attachment: Option<Attachment>) {
        self.attachment = attachment;
    }

    pub fn dictation(&self) -> &DictationSession {
        &self.dictation
    }

    pub fn start_dictation<R: SpeechRecognizer + ?Sized>(
        &mut self,
        recognizer: &mut R,
        permission_granted: bool,
    ) -> DictationStart {
        self.dictation
            .start(recognizer, permission_granted, &RecognitionRequest::default())
    }

    pub fn stop_dictation<R: SpeechRecognizer + ?Sized>(&mut self, recognizer: &mut R) {
        self.dictation.stop(recognizer);
    }

    pub fn permission_request_handled(&mut self) {
        self.dictation.permission_request_handled();
    }

    /// Composes the entry and hands it to `on_save`, then clears the text.
    pub fn save(
        &mut self,
        edit_after_saving: bool,
        now_ms: i64,
        on_save: impl FnOnce(QuickAddEntry),
    ) -> SaveOutcome {
        let Some(collection_id) = self.collection_id else {
            return SaveOutcome::NoCollection;
        };
        let Some(entry) = compose_entry(
            self.module,
            collection_id,
            self.dictation.text(),
            self.attachment.clone(),
            self.todo_defaults,
            now_ms,
        ) else {
            self.no_text_error = true;
            return SaveOutcome::NoText;
        };

        on_save(QuickAddEntry {
            object: entry.object,
            categories: entry.categories,
            attachment: entry.attachment,
            edit_after_saving,
        });
        self.dictation.clear_text();
        self.attachment = None;
        self.no_text_error = false;
        info!(
            "event=quick_add_save module=viewmodel status=ok kind={}",
            self.module.as_str()
        );
        SaveOutcome::Saved {
            dismiss: edit_after_saving,
        }
    }

    /// Saves straight into `store`; returns the new id when something was
    /// saved.
    pub async fn save_into(
        &mut self,
        store: &EntityStore,
        now_ms: i64,
    ) -> StoreResult<Option<ICalObjectId>> {
        let mut saved = None;
        if !matches!(
            self.save(false, now_ms, |entry| saved = Some(entry)),
            SaveOutcome::Saved { .. }
        ) {
            return Ok(None);
        }
        match saved {
            Some(entry) => store.insert_entry(entry.into_new_entry()).await.map(Some),
            None => Ok(None),
        }
    }
}

impl RecognitionListener for QuickAddViewModel {
    fn on_beginning_of_speech(&mut self) {
        self.dictation.on_beginning_of_speech();
    }

    fn on_end_of_speech(&mut self) {
        self.dictation.on_end_of_speech();
    }

    fn on_partial_results(&mut self, candidates: &[String]) {
        self.dictation.on_partial_results(candidates);
    }

    fn on_results(&mut self, candidates: &[String]) {
        self.dictation.on_results(candidates);
        if !self.dictation.text().trim().is_empty() {
            self.no_text_error = false;
        }
    }

    fn on_error(&mut self, error: SpeechError) {
        self.dictation.on_error(error);
    }
}
