//! Live query results.
//!
//! A [`LiveData`] wraps a `tokio::sync::watch` receiver whose sender is owned
//! by a background task. The task ends as soon as every receiver is dropped,
//! which is how a screen stops observing.

use tokio::sync::watch;

/// Automatically updating value produced by the store or derived from
/// another live value.
#[derive(Debug, Clone)]
pub struct LiveData<T> {
    rx: watch::Receiver<T>,
}

impl<T> LiveData<T> {
    pub(crate) fn from_receiver(rx: watch::Receiver<T>) -> Self {
        Self { rx }
    }

    /// A value that never changes.
    pub fn constant(value: T) -> Self {
        let (_tx, rx) = watch::channel(value);
        Self { rx }
    }

    /// Latest value.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.rx.borrow().clone()
    }

    /// Waits for the next emission. Returns `false` once the producer is gone.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }

    /// Waits until the latest value satisfies `predicate` and returns it.
    ///
    /// Returns `None` when the producer stops before that happens.
    pub async fn wait_for(&mut self, mut predicate: impl FnMut(&T) -> bool) -> Option<T>
    where
        T: Clone,
    {
        self.rx
            .wait_for(|value| predicate(value))
            .await
            .ok()
            .map(|value| value.clone())
    }

    pub fn into_receiver(self) -> watch::Receiver<T> {
        self.rx
    }

    /// Derives a live value recomputed on every upstream emission.
    ///
    /// Equal consecutive results are not re-emitted. Must be called inside a
    /// tokio runtime.
    pub fn map<U, F>(&self, f: F) -> LiveData<U>
    where
        T: Send + Sync + 'static,
        U: PartialEq + Send + Sync + 'static,
        F: Fn(&T) -> U + Send + 'static,
    {
        let mut upstream = self.rx.clone();
        let initial = {
            let value = upstream.borrow_and_update();
            f(&*value)
        };
        let (tx, rx) = watch::channel(initial);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    changed = upstream.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                    _ = tx.closed() => break,
                }
                let next = {
                    let value = upstream.borrow_and_update();
                    f(&*value)
                };
                publish_if_changed(&tx, next);
            }
        });

        LiveData { rx }
    }
}

/// Sends `next` unless it equals the current value.
pub(crate) fn publish_if_changed<T: PartialEq>(tx: &watch::Sender<T>, next: T) -> bool {
    tx.send_if_modified(|current| {
        if *current == next {
            false
        } else {
            *current = next;
            true
        }
    })
}
