//! List screen state.
//!
//! # Responsibility
//! - Keep one live list subscription for the current query, replacing it
//!   whenever the query changes.
//! - Expose the live category names and the focused item.
//!
//! # Invariants
//! - `items()` always reflects the most recently set query.
//! - The background task stops once the view-model and every handed-out
//!   `items()` receiver are dropped.

use crate::model::ical_object::{ICalObject, ICalObjectId, Module};
use crate::repo::ical_repo::{normalize_filter, ListQuery};
use crate::store::{publish_if_changed, EntityStore, LiveData, StoreResult};
use log::{debug, warn};
use tokio::sync::watch;

pub struct ListViewModel {
    query: watch::Sender<ListQuery>,
    items: LiveData<Vec<ICalObject>>,
    categories: LiveData<Vec<String>>,
    focus: watch::Sender<Option<ICalObjectId>>,
}

impl ListViewModel {
    /// Starts observing `initial` and the category names.
    pub async fn new(store: EntityStore, initial: ListQuery) -> StoreResult<Self> {
        let mut current = store.observe_list(initial.clone()).await?;
        let categories = store.observe_categories().await?;
        let (query, mut queries) = watch::channel(initial);
        let (items_tx, items_rx) = watch::channel(current.get());

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    changed = queries.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let next_query = queries.borrow_and_update().clone();
                        match store.observe_list(next_query).await {
                            Ok(live) => {
                                current = live;
                                publish_if_changed(&items_tx, current.get());
                            }
                            Err(err) => {
                                warn!("event=list_query module=viewmodel status=error error={err}");
                            }
                        }
                    }
                    alive = current.changed() => {
                        if !alive {
                            break;
                        }
                        publish_if_changed(&items_tx, current.get());
                    }
                    _ = items_tx.closed() => break,
                }
            }
            debug!("event=list_query module=viewmodel status=closed");
        });

        Ok(Self {
            query,
            items: LiveData::from_receiver(items_rx),
            categories,
            focus: watch::channel(None).0,
        })
    }

    pub fn items(&self) -> LiveData<Vec<ICalObject>> {
        self.items.clone()
    }

    pub fn all_categories(&self) -> LiveData<Vec<String>> {
        self.categories.clone()
    }

    pub fn query(&self) -> ListQuery {
        self.query.borrow().clone()
    }

    /// Sets the search text; blank text or `%` lists everything.
    pub fn set_filter(&self, filter: &str) {
        let filter = normalize_filter(Some(filter));
        self.query.send_if_modified(|query| {
            if query.filter == filter {
                return false;
            }
            query.filter = filter;
            true
        });
    }

    pub fn set_module(&self, module: Option<Module>) {
        self.query.send_if_modified(|query| {
            if query.module == module {
                return false;
            }
            query.module = module;
            true
        });
    }

    /// Replaces the whole query.
    pub fn set_query(&self, next: ListQuery) {
        publish_if_changed(&self.query, next);
    }

    /// Remembers the item the list should scroll to.
    pub fn set_focus_item(&self, id: Option<ICalObjectId>) {
        self.focus.send_replace(id);
    }

    pub fn focus_item(&self) -> Option<ICalObjectId> {
        *self.focus.borrow()
    }

    /// Index of the focused item in the current list.
    pub fn focus_item_position(&self) -> Option<usize> {
        let focused = self.focus_item()?;
        self.items.get().iter().position(|item| item.id == focused)
    }
}
