use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identity of a gallery entry. Display position is just the index
/// in the store; async completions always look objects up by this id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectId(Uuid);

impl ObjectId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// 2D image stage
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum ImageState {
    #[default]
    Empty,
    Generating,
    Ready(PathBuf),
    Failed(String),
    PromptFiltered,
}

impl ImageState {
    pub fn is_generating(&self) -> bool {
        matches!(self, Self::Generating)
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Ready(path) => Some(path),
            _ => None,
        }
    }
}

/// 3D model stage. A failed conversion settles back to `Empty`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum ModelState {
    #[default]
    Empty,
    Generating,
    Ready(PathBuf),
    ContentFiltered,
}

impl ModelState {
    pub fn is_generating(&self) -> bool {
        matches!(self, Self::Generating)
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Ready(path) => Some(path),
            _ => None,
        }
    }
}

/// One entry proposed by the scene planner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectProposal {
    pub title: String,
    pub description: String,
}

impl ObjectProposal {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneObject {
    pub id: ObjectId,
    pub title: String,
    pub description: String,
    pub image_state: ImageState,
    pub model_state: ModelState,
    pub batch_processing: bool,
    pub image_generated_at: Option<DateTime<Utc>>,
    pub model_generated_at: Option<DateTime<Utc>>,
    pub seed: Option<u32>,
}

impl SceneObject {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: ObjectId::new(),
            title: title.into(),
            description: description.into(),
            image_state: ImageState::Empty,
            model_state: ModelState::Empty,
            batch_processing: false,
            image_generated_at: None,
            model_generated_at: None,
            seed: None,
        }
    }

    pub fn image_path(&self) -> Option<&Path> {
        self.image_state.path()
    }

    pub fn model_path(&self) -> Option<&Path> {
        self.model_state.path()
    }

    /// A processing object is fully locked except for observation.
    pub fn is_processing(&self) -> bool {
        self.image_state.is_generating() || self.model_state.is_generating() || self.batch_processing
    }

    /// Has a finished image and nothing on the 3D side yet.
    pub fn is_convertible(&self) -> bool {
        self.image_state.is_ready() && self.model_state == ModelState::Empty
    }

    /// Drops any 3D result because the image it was built from is gone.
    pub(crate) fn invalidate_model(&mut self, reason: &str) {
        match &self.model_state {
            ModelState::Empty => {}
            ModelState::Ready(path) => {
                info!("Invalidating 3D model {} for '{}' due to {}", path.display(), self.title, reason);
            }
            ModelState::ContentFiltered => {
                info!("Clearing 3D content filter for '{}' due to {}", self.title, reason);
            }
            ModelState::Generating => {
                info!("Dropping in-flight 3D state for '{}' due to {}", self.title, reason);
            }
        }
        self.model_state = ModelState::Empty;
        self.model_generated_at = None;
    }
}

impl From<ObjectProposal> for SceneObject {
    fn from(proposal: ObjectProposal) -> Self {
        Self::new(proposal.title, proposal.description)
    }
}
