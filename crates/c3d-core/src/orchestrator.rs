use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use futures::FutureExt;
use log::{debug, error, info, warn};
use rand::Rng;
use tracing::{Instrument, info_span, instrument};

use crate::error::{Error, Result};
use crate::generation::{GenerationResult, ImageGenerator, ModelGenerator};
use crate::scene_object::{ImageState, ModelState, ObjectId, SceneObject};
use crate::store::{SceneObjectStore, Snapshot};

const SEED_RANGE: std::ops::RangeInclusive<u32> = 1..=999_999;

/// Everything the image phase needs once the card has been locked.
#[derive(Debug, Clone)]
pub struct ImageTicket {
    pub id: ObjectId,
    pub title: String,
    pub prompt: String,
    pub seed: u32,
}

#[derive(Debug, Clone)]
pub struct ModelTicket {
    pub id: ObjectId,
    pub title: String,
    pub image: PathBuf,
}

/// Objects locked by stage A of a "convert all" pass.
#[derive(Debug, Clone)]
pub struct BatchTicket {
    ids: Vec<ObjectId>,
}

impl BatchTicket {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Drives image and 3D generation against the store.
///
/// Single-object operations come in two phases: a synchronous `begin_*` that
/// publishes the optimistic lock and hands back a ticket, and an async
/// `finish_*` that calls the collaborator and settles. Settles look the
/// object up by id, so results for deleted or replaced objects are dropped.
#[derive(Clone)]
pub struct GenerationOrchestrator {
    store: SceneObjectStore,
    images: Arc<dyn ImageGenerator>,
    models: Arc<dyn ModelGenerator>,
}

impl GenerationOrchestrator {
    pub fn new(store: SceneObjectStore, images: Arc<dyn ImageGenerator>, models: Arc<dyn ModelGenerator>) -> Self {
        Self { store, images, models }
    }

    pub fn store(&self) -> &SceneObjectStore {
        &self.store
    }

    // --- image ---

    pub fn begin_refresh(&self, index: usize) -> Result<ImageTicket> {
        self.store.try_modify(|objects| {
            let obj = objects.get_mut(index).ok_or(Error::IndexOutOfRange(index))?;
            ensure_unlocked(obj)?;
            Ok(lock_image(obj))
        })
    }

    pub fn begin_edit(&self, index: usize, text: &str) -> Result<ImageTicket> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::BlankInput("Please enter a description."));
        }

        self.store.try_modify(|objects| {
            let obj = objects.get_mut(index).ok_or(Error::IndexOutOfRange(index))?;
            ensure_unlocked(obj)?;
            obj.description = text.to_string();
            Ok(lock_image(obj))
        })
    }

    /// Locks every object that has no image yet; used right after a scene
    /// has been planned.
    pub fn begin_initial_images(&self) -> Vec<ImageTicket> {
        let mut tickets = Vec::new();
        self.store.update_all(|obj| {
            if obj.image_state == ImageState::Empty && !obj.is_processing() {
                tickets.push(lock_image(obj));
            }
        });
        tickets
    }

    pub async fn finish_image(&self, ticket: ImageTicket) -> Snapshot {
        info!("Generating image for '{}' with seed {}", ticket.title, ticket.seed);
        let result = self.call_image(&ticket).await;
        debug!("{} Image call for '{}' returned", result.icon(), ticket.title);
        self.settle_image(&ticket, result);
        self.store.snapshot()
    }

    #[instrument(skip_all, fields(count = tickets.len()))]
    pub async fn generate_images(&self, tickets: Vec<ImageTicket>) -> Snapshot {
        for ticket in tickets {
            self.finish_image(ticket).await;
        }
        self.store.snapshot()
    }

    #[instrument(skip(self))]
    pub async fn refresh_image(&self, index: usize) -> Snapshot {
        match self.begin_refresh(index) {
            Ok(ticket) => self.finish_image(ticket).await,
            Err(e) => {
                warn!("Refresh rejected for card {}: {}", index, e);
                self.store.snapshot()
            }
        }
    }

    #[instrument(skip(self, text))]
    pub async fn edit_description(&self, index: usize, text: &str) -> Snapshot {
        match self.begin_edit(index, text) {
            Ok(ticket) => self.finish_image(ticket).await,
            Err(e) => {
                warn!("Edit rejected for card {}: {}", index, e);
                self.store.snapshot()
            }
        }
    }

    async fn call_image(&self, ticket: &ImageTicket) -> GenerationResult {
        let call = self.images.generate(&ticket.title, &ticket.prompt, ticket.seed);
        match AssertUnwindSafe(call).catch_unwind().await {
            Ok(result) => result,
            Err(_) => {
                error!("Image generation for '{}' panicked", ticket.title);
                GenerationResult::failure("image generation panicked")
            }
        }
    }

    fn settle_image(&self, ticket: &ImageTicket, result: GenerationResult) {
        let now = Utc::now();
        let applied = self.store.update_if(ticket.id, |obj| {
            if !obj.image_state.is_generating() {
                return false;
            }
            match result {
                GenerationResult::Success(path) => {
                    info!("✅ Image ready for '{}': {}", obj.title, path.display());
                    obj.image_state = ImageState::Ready(path);
                    obj.seed = Some(ticket.seed);
                    obj.image_generated_at = Some(now);
                    obj.invalidate_model("image update");
                }
                GenerationResult::ContentFiltered => {
                    info!("🚫 Prompt content filtered for '{}'", obj.title);
                    obj.image_state = ImageState::PromptFiltered;
                    obj.image_generated_at = Some(now);
                    obj.invalidate_model("2D prompt content filtered");
                }
                GenerationResult::Failure(message) => {
                    warn!("❌ Image generation failed for '{}': {}", obj.title, message);
                    obj.image_state = ImageState::Failed(message);
                    obj.invalidate_model("image generation failed");
                }
            }
            true
        });

        if !applied {
            debug!("Discarding stale image result for '{}' ({})", ticket.title, ticket.id);
        }
    }

    // --- 3D ---

    pub fn begin_generate_3d(&self, index: usize) -> Result<ModelTicket> {
        self.store.try_modify(|objects| {
            let obj = objects.get_mut(index).ok_or(Error::IndexOutOfRange(index))?;
            ensure_unlocked(obj)?;
            lock_model(obj)
        })
    }

    pub async fn finish_3d(&self, ticket: ModelTicket) -> Snapshot {
        info!("Converting '{}' to 3D", ticket.title);
        let result = self.call_model(&ticket.title, &ticket.image).await;
        debug!("{} 3D call for '{}' returned", result.icon(), ticket.title);
        self.settle_model(&ticket, result);
        self.store.snapshot()
    }

    #[instrument(skip(self))]
    pub async fn generate_3d(&self, index: usize) -> Snapshot {
        match self.begin_generate_3d(index) {
            Ok(ticket) => self.finish_3d(ticket).await,
            Err(e) => {
                warn!("3D generation rejected for card {}: {}", index, e);
                self.store.snapshot()
            }
        }
    }

    async fn call_model(&self, title: &str, image: &Path) -> GenerationResult {
        match AssertUnwindSafe(self.models.generate(image)).catch_unwind().await {
            Ok(result) => result,
            Err(_) => {
                error!("3D generation for '{}' panicked", title);
                GenerationResult::failure("3D generation panicked")
            }
        }
    }

    fn settle_model(&self, ticket: &ModelTicket, result: GenerationResult) {
        let now = Utc::now();
        let applied = self.store.update_if(ticket.id, |obj| {
            if !obj.model_state.is_generating() {
                return false;
            }
            match result {
                GenerationResult::Success(path) => {
                    info!("✅ 3D model ready for '{}': {}", obj.title, path.display());
                    obj.model_state = ModelState::Ready(path);
                    obj.model_generated_at = Some(now);
                }
                GenerationResult::ContentFiltered => {
                    info!("🚫 3D content filtered for '{}'", obj.title);
                    obj.model_state = ModelState::ContentFiltered;
                    obj.model_generated_at = Some(now);
                }
                GenerationResult::Failure(message) => {
                    warn!("❌ 3D generation failed for '{}': {}", obj.title, message);
                    obj.model_state = ModelState::Empty;
                }
            }
            true
        });

        if !applied {
            debug!("Discarding stale 3D result for '{}' ({})", ticket.title, ticket.id);
        }
    }

    // --- delete ---

    pub fn delete(&self, index: usize) -> Snapshot {
        if let Some(obj) = self.store.delete_at(index) {
            info!("🗑️ Deleted card {} '{}'", index, obj.title);
            if let Some(glb) = obj.model_path() {
                info!("🗑️ Dropped 3D asset {}", glb.display());
            }
        }
        self.store.snapshot()
    }

    // --- convert all ---

    /// Stage A: lock every card so the UI disables all controls before any
    /// slow work starts.
    pub fn begin_convert_all(&self) -> Result<BatchTicket> {
        self.store.try_modify(|objects| {
            if objects.is_empty() {
                return Err(Error::EmptyGallery);
            }
            if objects.iter().any(|obj| obj.batch_processing) {
                return Err(Error::BatchActive);
            }
            objects.iter_mut().for_each(|obj| obj.batch_processing = true);
            info!("🔒 Locked {} cards for batch 3D conversion", objects.len());
            Ok(BatchTicket {
                ids: objects.iter().map(|obj| obj.id).collect(),
            })
        })
    }

    /// Stage B: convert every eligible locked card, one at a time, in store
    /// order. The unlock guard is armed before the first poll, so the batch
    /// flags are cleared on every exit path, including a dropped future.
    pub fn run_convert_all(&self, ticket: BatchTicket) -> impl Future<Output = Snapshot> + Send + '_ {
        let mut unlock = BatchUnlock {
            store: self.store.clone(),
            ids: ticket.ids.clone(),
            in_flight: None,
        };
        let span = info_span!("run_convert_all", cards = ticket.len());

        async move {
            let eligible = self.store.snapshot().iter().filter(|obj| obj.is_convertible()).count();
            info!("Converting {} of {} cards to 3D", eligible, ticket.len());

            let mut converted = 0;
            let mut attempted = 0;
            for id in &ticket.ids {
                let Some(model_ticket) = self.lock_for_batch(*id) else {
                    continue;
                };
                attempted += 1;
                unlock.in_flight = Some(model_ticket.id);

                let result = self.call_model(&model_ticket.title, &model_ticket.image).await;
                if result.is_success() {
                    converted += 1;
                }
                info!("{} [{}/{}] {}", result.icon(), attempted, eligible, model_ticket.title);
                self.settle_model(&model_ticket, result);
                unlock.in_flight = None;
            }

            drop(unlock);
            info!("✅ Batch 3D conversion complete: {}/{} converted", converted, attempted);
            self.store.snapshot()
        }
        .instrument(span)
    }

    pub async fn convert_all(&self) -> Snapshot {
        match self.begin_convert_all() {
            Ok(ticket) => self.run_convert_all(ticket).await,
            Err(e) => {
                info!("Convert all skipped: {}", e);
                self.store.snapshot()
            }
        }
    }

    fn lock_for_batch(&self, id: ObjectId) -> Option<ModelTicket> {
        let locked = self.store.try_modify(|objects| {
            let obj = objects.iter_mut().find(|obj| obj.id == id).ok_or(Error::UnknownObject(id))?;
            lock_model(obj)
        });
        match locked {
            Ok(ticket) => Some(ticket),
            Err(e) => {
                debug!("Skipping card in batch: {}", e);
                None
            }
        }
    }
}

/// Clears the batch flag on every card a pass locked, and resets the 3D
/// state of the card the pass was converting if it never settled.
struct BatchUnlock {
    store: SceneObjectStore,
    ids: Vec<ObjectId>,
    in_flight: Option<ObjectId>,
}

impl Drop for BatchUnlock {
    fn drop(&mut self) {
        let ids = &self.ids;
        let in_flight = self.in_flight;
        self.store.update_all(|obj| {
            if !ids.contains(&obj.id) {
                return;
            }
            obj.batch_processing = false;
            if Some(obj.id) == in_flight && obj.model_state.is_generating() {
                warn!("Resetting interrupted 3D generation for '{}'", obj.title);
                obj.model_state = ModelState::Empty;
            }
        });
        info!("🔓 Unlocked {} cards after batch 3D conversion", ids.len());
    }
}

fn ensure_unlocked(obj: &SceneObject) -> Result<()> {
    let reason = if obj.image_state.is_generating() {
        "image generation in progress"
    } else if obj.model_state.is_generating() {
        "3D generation in progress"
    } else if obj.batch_processing {
        "batch conversion in progress"
    } else {
        return Ok(());
    };
    Err(Error::Busy {
        title: obj.title.clone(),
        reason,
    })
}

fn lock_image(obj: &mut SceneObject) -> ImageTicket {
    let seed = draw_seed(obj.seed);
    obj.image_state = ImageState::Generating;
    ImageTicket {
        id: obj.id,
        title: obj.title.clone(),
        prompt: obj.description.clone(),
        seed,
    }
}

fn lock_model(obj: &mut SceneObject) -> Result<ModelTicket> {
    if !obj.is_convertible() {
        return Err(Error::NotConvertible {
            title: obj.title.clone(),
        });
    }
    let image = obj.image_path().map(Path::to_path_buf).ok_or_else(|| Error::NotConvertible {
        title: obj.title.clone(),
    })?;
    obj.model_state = ModelState::Generating;
    Ok(ModelTicket {
        id: obj.id,
        title: obj.title.clone(),
        image,
    })
}

/// Fresh seed, never equal to the previous one.
fn draw_seed(previous: Option<u32>) -> u32 {
    let mut rng = rand::thread_rng();
    loop {
        let seed = rng.gen_range(SEED_RANGE);
        if Some(seed) != previous {
            return seed;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_stays_in_range_and_changes() {
        for _ in 0..1000 {
            let seed = draw_seed(Some(42));
            assert!(SEED_RANGE.contains(&seed));
            assert_ne!(seed, 42);
        }
    }

    #[test]
    fn test_lock_model_requires_ready_image() {
        let mut obj = SceneObject::new("Lamp", "a lamp");
        assert!(matches!(lock_model(&mut obj), Err(Error::NotConvertible { .. })));

        obj.image_state = ImageState::Ready("/lamp.png".into());
        let ticket = lock_model(&mut obj).unwrap();
        assert_eq!(ticket.image, PathBuf::from("/lamp.png"));
        assert_eq!(obj.model_state, ModelState::Generating);
    }

    #[test]
    fn test_ensure_unlocked_reports_reason() {
        let mut obj = SceneObject::new("Lamp", "a lamp");
        assert!(ensure_unlocked(&obj).is_ok());

        obj.batch_processing = true;
        let err = ensure_unlocked(&obj).unwrap_err();
        assert_eq!(err.to_string(), "'Lamp' is busy: batch conversion in progress");
    }
}
