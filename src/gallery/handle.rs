//! Single-writer access to the [`GalleryStore`].
//!
//! The store lives on one tokio task. Every mutation (user actions, optimizer
//! results, upload callbacks) is a closure sent to that task over an
//! unbounded channel and applied in arrival order, so no two writers ever
//! race on an item.

use super::store::GalleryStore;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

type Command = Box<dyn FnOnce(&mut GalleryStore) + Send>;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("gallery store is closed")]
pub struct StoreClosed;

/// Cloneable sender side of the store task.
#[derive(Debug, Clone)]
pub struct GalleryHandle {
    tx: mpsc::UnboundedSender<Command>,
}

impl GalleryHandle {
    /// Move `store` onto its own task. Must be called inside a tokio runtime.
    ///
    /// The task exits once every handle has been dropped.
    pub fn spawn(mut store: GalleryStore) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Command>();
        tokio::spawn(async move {
            while let Some(command) = rx.recv().await {
                command(&mut store);
            }
            tracing::debug!(items = store.len(), "gallery store closed");
        });
        Self { tx }
    }

    /// Run `f` against the store and wait for its result.
    pub async fn call<R, F>(&self, f: F) -> Result<R, StoreClosed>
    where
        F: FnOnce(&mut GalleryStore) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(Box::new(move |store: &mut GalleryStore| {
                let _ = reply_tx.send(f(store));
            }))
            .map_err(|_| StoreClosed)?;
        reply_rx.await.map_err(|_| StoreClosed)
    }

    /// Queue `f` without waiting. Returns `false` if the store is gone.
    pub fn post<F>(&self, f: F) -> bool
    where
        F: FnOnce(&mut GalleryStore) + Send + 'static,
    {
        self.tx.send(Box::new(f)).is_ok()
    }
}
