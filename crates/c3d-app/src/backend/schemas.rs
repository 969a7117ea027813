use c3d_core::{Mode, ViewState};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// `accepts_scene` is true only while planning with a live planner.
#[derive(Debug, Clone, Serialize)]
pub struct PlannerStatus {
    pub ready: bool,
    pub accepts_scene: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct GalleryResponse {
    pub mode: Mode,
    pub view: ViewState,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SceneRequest {
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SceneResponse {
    pub mode: Mode,
    pub hint: Option<String>,
    pub view: ViewState,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DescriptionRequest {
    pub text: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExportRequest {
    pub folder: String,
}
