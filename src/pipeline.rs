//! Ingestion orchestration.
//!
//! ```text
//! add_files ─▶ validate_batch ─▶ insert (Pending)
//!                                   │  one task per item
//!                                   ▼
//!                      optimize_async (Optimizing)
//!                                   │
//!                                   ▼
//!                  RetryPolicy(Transport::upload) (Uploading)
//!                                   │
//!                       ┌───────────┴───────────┐
//!                       ▼                       ▼
//!                   Uploaded                  Failed ──retry()──▶ Uploading
//! ```
//!
//! Every store access goes through the [`GalleryHandle`], so progress
//! callbacks and completions from concurrent tasks are applied one at a
//! time. Results for items removed in the meantime come back as
//! [`StoreError::UnknownItem`] and are dropped.

use crate::config::{GalleryConfig, LimitsConfig};
use crate::gallery::{
    CommittedPhotos, FormSink, GalleryHandle, GalleryStore, ItemId, ItemState, ItemView,
    Provenance, StoreClosed, StoreError, Transition,
};
use crate::media::{
    ImageBackend, JPEG_MIME, OptimizeOutcome, OptimizeSettings, Quality, optimize_async,
};
use crate::reorder::ReorderController;
use crate::types::ImageFile;
use crate::upload::{ProgressFn, RetryPolicy, Transport, TransportError, UploadRequest};
use crate::validate::{ValidationError, validate_batch};
use crate::variants::VariantGenerator;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tokio::task::JoinHandle;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Closed(#[from] StoreClosed),
    #[error("item {id} is {state}; only failed items can be retried")]
    NotRetryable { id: ItemId, state: ItemState },
}

/// Result of [`Pipeline::add_files`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddReport {
    /// Ids of the accepted files, in input order.
    pub added: Vec<ItemId>,
    pub rejected: Vec<ValidationError>,
    /// The one message to show for the batch, if anything was rejected.
    pub summary: Option<String>,
}

/// Result of [`Pipeline::complete_gallery`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionReport {
    pub planned: usize,
    /// Ids of derived items that entered the gallery.
    pub added: Vec<ItemId>,
    /// Planned derivations that produced nothing (fetch or transform failure, or no room).
    pub skipped: usize,
}

/// Returned by [`Pipeline::leave_warning`] while uploads are still running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaveWarning {
    pub in_flight: usize,
}

impl fmt::Display for LeaveWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let noun = if self.in_flight == 1 {
            "photo is"
        } else {
            "photos are"
        };
        write!(
            f,
            "{} {noun} still being processed. Leaving now will abandon them.",
            self.in_flight
        )
    }
}

enum ItemJob {
    /// Fresh item: optimize, then upload.
    Ingest(ImageFile),
    /// Manual retry: the payload is already optimized.
    Upload(ImageFile),
}

/// Percentage of `sent` over `total`, clamped to 0–100.
fn percent_of(sent: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    (sent.min(total) * 100 / total) as u8
}

/// Last path segment of `url`, used to name derived files.
fn name_from_url(url: &str) -> &str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.rsplit('/').find(|s| !s.is_empty()).unwrap_or("photo")
}

struct Shared<B: ImageBackend, T> {
    gallery: GalleryHandle,
    backend: Arc<B>,
    transport: T,
    limits: LimitsConfig,
    optimize: OptimizeSettings,
    retry: RetryPolicy,
    variants: Arc<VariantGenerator<B>>,
    reorder: ReorderController,
    group_code: Mutex<Option<String>>,
    tasks: Mutex<HashMap<ItemId, (u64, JoinHandle<()>)>>,
    generation: AtomicU64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<B: ImageBackend + 'static, T: Transport> Shared<B, T> {
    fn spawn_item(self: &Arc<Self>, id: ItemId, job: ItemJob) {
        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let shared = Arc::clone(self);
        let mut tasks = lock(&self.tasks);
        let handle = tokio::spawn(shared.run_item(id, generation, job));
        tasks.insert(id, (generation, handle));
    }

    /// Forget the task handle, unless a newer task for `id` replaced it.
    fn finish(&self, id: ItemId, generation: u64) {
        let mut tasks = lock(&self.tasks);
        if tasks.get(&id).is_some_and(|(g, _)| *g == generation) {
            tasks.remove(&id);
        }
    }

    /// Apply a transition; `false` if the item is gone or the edge is invalid.
    async fn transition(&self, id: ItemId, transition: Transition) -> bool {
        match self
            .gallery
            .call(move |store| store.apply(id, transition))
            .await
        {
            Ok(Ok(_)) => true,
            Ok(Err(StoreError::UnknownItem(_))) => {
                tracing::debug!(%id, "item removed, discarding result");
                false
            }
            Ok(Err(e)) => {
                tracing::warn!(%id, error = %e, "transition rejected");
                false
            }
            Err(StoreClosed) => false,
        }
    }

    async fn run_item(self: Arc<Self>, id: ItemId, generation: u64, job: ItemJob) {
        let payload = match job {
            ItemJob::Ingest(file) => {
                if !self.transition(id, Transition::StartOptimizing).await {
                    self.finish(id, generation);
                    return;
                }
                let optimized =
                    optimize_async(Arc::clone(&self.backend), file, self.optimize.clone()).await;
                if let OptimizeOutcome::Fallback(reason) = &optimized.outcome {
                    tracing::debug!(%id, %reason, "uploading unoptimized original");
                }
                let file = optimized.file;
                if !self
                    .transition(id, Transition::StartUploading(file.clone()))
                    .await
                {
                    self.finish(id, generation);
                    return;
                }
                file
            }
            ItemJob::Upload(file) => file,
        };

        let result = self.upload(id, payload).await;
        let transition = match result {
            Ok(url) => {
                tracing::info!(%id, %url, "upload complete");
                Transition::Succeeded { url }
            }
            Err(e) => {
                tracing::warn!(%id, error = %e, "upload failed");
                Transition::Failed {
                    error: e.to_string(),
                }
            }
        };
        self.transition(id, transition).await;
        // Released only once the final state is in the store.
        self.finish(id, generation);
    }

    async fn upload(&self, id: ItemId, file: ImageFile) -> Result<String, TransportError> {
        let group_code = lock(&self.group_code).clone();
        let label = format!("upload {id}");
        self.retry
            .run(&label, |attempt| {
                if attempt > 0 {
                    self.gallery.post(move |store| {
                        let _ = store.apply(id, Transition::Progress(0));
                    });
                }
                let request = UploadRequest {
                    file: file.clone(),
                    group_code: group_code.clone(),
                };
                self.transport.upload(request, self.progress_reporter(id))
            })
            .await
    }

    /// Progress callback that posts a store update whenever the percentage changes.
    fn progress_reporter(&self, id: ItemId) -> ProgressFn {
        let gallery = self.gallery.clone();
        let last = AtomicU8::new(u8::MAX);
        Arc::new(move |sent, total| {
            let percent = percent_of(sent, total);
            if last.swap(percent, Ordering::Relaxed) != percent {
                gallery.post(move |store| {
                    let _ = store.apply(id, Transition::Progress(percent));
                });
            }
        })
    }
}

/// Entry point for the photo step: owns the gallery and drives every item.
///
/// Must be created inside a tokio runtime. Cloning is cheap and every clone
/// drives the same gallery.
pub struct Pipeline<B: ImageBackend, T> {
    shared: Arc<Shared<B, T>>,
}

impl<B: ImageBackend, T> Clone for Pipeline<B, T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<B: ImageBackend + 'static, T: Transport> Pipeline<B, T> {
    pub fn new(
        config: &GalleryConfig,
        backend: Arc<B>,
        transport: T,
        sink: impl FormSink + 'static,
    ) -> Self {
        let store = GalleryStore::new(config.limits.max_items, sink);
        let variants = VariantGenerator::new(
            Arc::clone(&backend),
            &config.completion,
            &config.processing,
            Quality::new(config.optimize.quality),
        );
        Self {
            shared: Arc::new(Shared {
                gallery: GalleryHandle::spawn(store),
                backend,
                transport,
                limits: config.limits.clone(),
                optimize: OptimizeSettings::from(&config.optimize),
                retry: RetryPolicy::from(&config.upload),
                variants: Arc::new(variants),
                reorder: ReorderController::new(config.limits.drag_policy),
                group_code: Mutex::new(None),
                tasks: Mutex::new(HashMap::new()),
                generation: AtomicU64::new(0),
            }),
        }
    }

    /// Listing group code sent with every subsequent upload.
    pub fn set_group_code(&self, code: Option<String>) {
        *lock(&self.shared.group_code) = code;
    }

    /// Validate a batch, insert the accepted files and start their uploads.
    pub async fn add_files(&self, files: Vec<ImageFile>) -> Result<AddReport, PipelineError> {
        let limits = self.shared.limits.clone();
        let (inserted, rejected, summary) = self
            .shared
            .gallery
            .call(move |store| {
                let batch = validate_batch(files, store.len(), &limits);
                let summary = batch.summary();
                let mut inserted = Vec::with_capacity(batch.accepted.len());
                for file in batch.accepted {
                    match store.insert(file.clone(), Provenance::User) {
                        Ok(id) => inserted.push((id, file)),
                        Err(e) => tracing::warn!(file = %file.name, error = %e, "insert refused"),
                    }
                }
                (inserted, batch.rejected, summary)
            })
            .await?;

        if let Some(summary) = &summary {
            tracing::info!(rejected = rejected.len(), "{summary}");
        }
        let mut added = Vec::with_capacity(inserted.len());
        for (id, file) in inserted {
            self.shared.spawn_item(id, ItemJob::Ingest(file));
            added.push(id);
        }
        Ok(AddReport {
            added,
            rejected,
            summary,
        })
    }

    /// Send a `Failed` item back to `Uploading` with its stored payload.
    pub async fn retry(&self, id: ItemId) -> Result<(), PipelineError> {
        let payload = self
            .shared
            .gallery
            .call(move |store| -> Result<ImageFile, PipelineError> {
                let item = store.get(id).ok_or(StoreError::UnknownItem(id))?;
                let state = item.state();
                let payload = match (state, item.source()) {
                    (ItemState::Failed, Some(source)) => source.clone(),
                    _ => return Err(PipelineError::NotRetryable { id, state }),
                };
                store.apply(id, Transition::Retry)?;
                Ok(payload)
            })
            .await??;
        tracing::info!(%id, "manual retry");
        self.shared.spawn_item(id, ItemJob::Upload(payload));
        Ok(())
    }

    /// Remove an item in any state, aborting its task if one is running.
    pub async fn remove(&self, id: ItemId) -> Result<(), PipelineError> {
        let task = lock(&self.shared.tasks).remove(&id);
        if let Some((_, handle)) = task {
            handle.abort();
        }
        self.shared
            .gallery
            .call(move |store| store.remove(id).map(|_| ()))
            .await??;
        Ok(())
    }

    /// Drag `id` to position `target`.
    pub async fn reorder(&self, id: ItemId, target: usize) -> Result<(), PipelineError> {
        let controller = self.shared.reorder;
        self.shared
            .gallery
            .call(move |store| controller.drag(store, id, target))
            .await??;
        Ok(())
    }

    /// Make `id` the cover photo.
    pub async fn set_cover(&self, id: ItemId) -> Result<(), PipelineError> {
        let controller = self.shared.reorder;
        self.shared
            .gallery
            .call(move |store| controller.set_cover(store, id))
            .await??;
        Ok(())
    }

    pub async fn snapshot(&self) -> Result<Vec<ItemView>, PipelineError> {
        Ok(self.shared.gallery.call(|store| store.snapshot()).await?)
    }

    pub async fn committed(&self) -> Result<CommittedPhotos, PipelineError> {
        Ok(self.shared.gallery.call(|store| store.committed()).await?)
    }

    /// `Some` while any item is still pending, optimizing or uploading.
    pub async fn leave_warning(&self) -> Result<Option<LeaveWarning>, PipelineError> {
        let in_flight = self.shared.gallery.call(|store| store.in_flight()).await?;
        Ok((in_flight > 0).then_some(LeaveWarning { in_flight }))
    }

    /// Wait until every running item task has finished.
    ///
    /// Tasks awaited here can no longer be aborted by [`remove`](Self::remove).
    pub async fn settle(&self) {
        loop {
            let pending: Vec<JoinHandle<()>> = lock(&self.shared.tasks)
                .drain()
                .map(|(_, (_, handle))| handle)
                .collect();
            if pending.is_empty() {
                break;
            }
            for handle in pending {
                let _ = handle.await;
            }
        }
    }

    /// Pad the gallery toward the completion target with derived variants.
    ///
    /// Sources are the currently uploaded photos, fetched back from the host.
    /// Does nothing when no photo is uploaded yet.
    pub async fn complete_gallery(&self) -> Result<CompletionReport, PipelineError> {
        let (sources, room) = self
            .shared
            .gallery
            .call(|store| (store.uploaded_sources(), store.room()))
            .await?;
        let ids: Vec<ItemId> = sources.iter().map(|source| source.id).collect();
        let plans = self.shared.variants.plan(&ids, room);
        let planned = plans.len();
        if planned == 0 {
            tracing::info!(uploaded = ids.len(), room, "gallery completion not needed");
            return Ok(CompletionReport::default());
        }

        let needed: HashSet<ItemId> = plans.iter().map(|plan| plan.source).collect();
        let mut fetched = HashMap::with_capacity(needed.len());
        for source in sources.iter().filter(|source| needed.contains(&source.id)) {
            match self.shared.transport.fetch(&source.url).await {
                Ok(bytes) => {
                    let file = ImageFile::new(name_from_url(&source.url), JPEG_MIME, bytes);
                    fetched.insert(source.id, file);
                }
                Err(e) => {
                    tracing::warn!(
                        source = %source.id,
                        url = %source.url,
                        error = %e,
                        "cannot fetch variant source"
                    );
                }
            }
        }

        let variants = Arc::clone(&self.shared.variants);
        let derived = match tokio::task::spawn_blocking(move || {
            variants.derive_all(&plans, &fetched)
        })
        .await
        {
            Ok(derived) => derived,
            Err(e) => {
                tracing::warn!(error = %e, "variant derivation task failed");
                Vec::new()
            }
        };

        let inserted = self
            .shared
            .gallery
            .call(move |store| {
                let mut inserted = Vec::with_capacity(derived.len());
                for image in derived {
                    let provenance = Provenance::Derived {
                        derived_from: image.source,
                        transform: image.transform,
                    };
                    match store.insert(image.file.clone(), provenance) {
                        Ok(id) => inserted.push((id, image.file)),
                        Err(e) => {
                            tracing::debug!(error = %e, "no room left for derived photos");
                            break;
                        }
                    }
                }
                inserted
            })
            .await?;

        let mut added = Vec::with_capacity(inserted.len());
        for (id, file) in inserted {
            self.shared.spawn_item(id, ItemJob::Ingest(file));
            added.push(id);
        }
        tracing::info!(planned, added = added.len(), "gallery completion scheduled");
        Ok(CompletionReport {
            planned,
            skipped: planned - added.len(),
            added,
        })
    }
}
