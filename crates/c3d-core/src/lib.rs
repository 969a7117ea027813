pub mod error;
pub mod export;
pub mod generation;
pub mod orchestrator;
pub mod planning;
pub mod scene_object;
pub mod store;
pub mod view;
pub mod workspace;

#[cfg(test)]
mod testing;

pub use error::{Error, Result};
pub use export::{ExportCollector, ExportItem, ExportPreview, ExportReport};
pub use generation::{GenerationResult, ImageGenerator, ModelGenerator};
pub use orchestrator::{BatchTicket, GenerationOrchestrator, ImageTicket, ModelTicket};
pub use planning::{PlannerService, ScenePlan, ScenePlanner};
pub use scene_object::{ImageState, ModelState, ObjectId, ObjectProposal, SceneObject};
pub use store::{SceneObjectStore, Snapshot};
pub use view::{StatusProjector, ViewState};
pub use workspace::{Mode, SubmitOutcome, WorkspaceController};
