//! Gallery completion: pad the gallery toward a target photo count.
//!
//! Planning is pure. Given the uploaded photos and the free room, the
//! shortfall `min(target - uploaded, room)` is filled round-robin: slot `i`
//! derives from source `i % n` with transform `cycle[(i / n) % 4]`, so every
//! source gets a crop before any source gets a mirror.
//!
//! Derivation runs on a dedicated rayon pool (sized by
//! [`effective_threads`](crate::config::effective_threads)). A transform that
//! fails is logged and skipped; the rest of the batch goes on.

use crate::config::{CompletionConfig, ProcessingConfig, effective_threads};
use crate::gallery::ItemId;
use crate::media::{ImageBackend, ImageTransform, Quality, derive_variant};
use crate::types::ImageFile;
use rayon::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;

/// One derived photo to produce.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VariantPlan {
    pub source: ItemId,
    pub transform: ImageTransform,
}

/// How many derived photos are needed: never more than `target - uploaded`,
/// never more than the free room.
pub fn shortfall(target: usize, uploaded: usize, room: usize) -> usize {
    target.saturating_sub(uploaded).min(room)
}

/// Schedule derivations over `sources`. Empty when there is no source.
pub fn plan_variants(
    sources: &[ItemId],
    target: usize,
    room: usize,
    cycle: &[ImageTransform; 4],
) -> Vec<VariantPlan> {
    let n = sources.len();
    if n == 0 {
        return Vec::new();
    }
    (0..shortfall(target, n, room))
        .map(|i| VariantPlan {
            source: sources[i % n],
            transform: cycle[(i / n) % cycle.len()],
        })
        .collect()
}

/// A derived image ready to enter the gallery.
#[derive(Debug, Clone)]
pub struct DerivedImage {
    pub source: ItemId,
    pub transform: ImageTransform,
    pub file: ImageFile,
}

/// Produces derived images with an [`ImageBackend`].
pub struct VariantGenerator<B: ImageBackend> {
    backend: Arc<B>,
    pool: Option<rayon::ThreadPool>,
    quality: Quality,
    cycle: [ImageTransform; 4],
    target: usize,
}

impl<B: ImageBackend> VariantGenerator<B> {
    pub fn new(
        backend: Arc<B>,
        completion: &CompletionConfig,
        processing: &ProcessingConfig,
        quality: Quality,
    ) -> Self {
        let threads = effective_threads(processing);
        let pool = match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
            Ok(pool) => Some(pool),
            Err(e) => {
                tracing::warn!(error = %e, "variant pool unavailable, using the global pool");
                None
            }
        };
        Self {
            backend,
            pool,
            quality,
            cycle: ImageTransform::cycle(completion),
            target: completion.target,
        }
    }

    pub fn target(&self) -> usize {
        self.target
    }

    /// Plan against this generator's target and transform cycle.
    pub fn plan(&self, sources: &[ItemId], room: usize) -> Vec<VariantPlan> {
        plan_variants(sources, self.target, room, &self.cycle)
    }

    /// Run every plan whose source bytes are in `sources`. Output keeps plan order.
    pub fn derive_all(
        &self,
        plans: &[VariantPlan],
        sources: &HashMap<ItemId, ImageFile>,
    ) -> Vec<DerivedImage> {
        let job = || {
            plans
                .par_iter()
                .filter_map(|plan| self.derive_one(plan, sources))
                .collect::<Vec<_>>()
        };
        let derived = match &self.pool {
            Some(pool) => pool.install(job),
            None => job(),
        };
        tracing::debug!(
            planned = plans.len(),
            derived = derived.len(),
            "variants derived"
        );
        derived
    }

    fn derive_one(
        &self,
        plan: &VariantPlan,
        sources: &HashMap<ItemId, ImageFile>,
    ) -> Option<DerivedImage> {
        let Some(source) = sources.get(&plan.source) else {
            tracing::warn!(
                source = %plan.source,
                transform = %plan.transform,
                "source unavailable, skipping variant"
            );
            return None;
        };
        match derive_variant(self.backend.as_ref(), source, plan.transform, self.quality) {
            Ok(file) => Some(DerivedImage {
                source: plan.source,
                transform: plan.transform,
                file,
            }),
            Err(e) => {
                tracing::warn!(
                    source = %plan.source,
                    transform = %plan.transform,
                    error = %e,
                    "variant derivation failed, skipping"
                );
                None
            }
        }
    }
}
