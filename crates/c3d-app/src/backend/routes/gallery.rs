use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use c3d_core::{Mode, SceneObject, SubmitOutcome};
use log::info;

use crate::backend::schemas::{
    DescriptionRequest, GalleryResponse, HealthResponse, PlannerStatus, SceneRequest, SceneResponse,
};
use crate::backend::state::AppState;
use crate::error::AppError;

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

pub async fn planner(State(state): State<Arc<AppState>>) -> Json<PlannerStatus> {
    let ready = state.planner_ready().await;
    Json(PlannerStatus {
        ready,
        accepts_scene: ready && state.mode() == Mode::Planning,
    })
}

pub async fn gallery(State(state): State<Arc<AppState>>) -> Json<GalleryResponse> {
    Json(GalleryResponse {
        mode: state.mode(),
        view: state.view(),
    })
}

pub async fn objects(State(state): State<Arc<AppState>>) -> Json<Vec<SceneObject>> {
    Json(state.orchestrator.store().snapshot().to_vec())
}

/// Plans the scene, then starts the first image pass in the background.
pub async fn submit_scene(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SceneRequest>,
) -> Json<SceneResponse> {
    let mut controller = state.controller.lock().await;
    let outcome = controller.submit_scene(&req.text).await;
    state.set_mode(controller.mode());
    drop(controller);

    let hint = match outcome {
        SubmitOutcome::Entered(snapshot) => {
            info!("Scene planned with {} objects", snapshot.len());
            state.spawn_images(state.orchestrator.begin_initial_images());
            None
        }
        SubmitOutcome::Hint(hint) => Some(hint),
    };

    Json(SceneResponse {
        mode: state.mode(),
        hint,
        view: state.view(),
    })
}

pub async fn start_over(State(state): State<Arc<AppState>>) -> Json<GalleryResponse> {
    let mut controller = state.controller.lock().await;
    controller.start_over().await;
    state.set_mode(controller.mode());
    drop(controller);

    Json(GalleryResponse {
        mode: state.mode(),
        view: state.view(),
    })
}

pub async fn refresh_image(
    State(state): State<Arc<AppState>>,
    Path(index): Path<usize>,
) -> Result<Json<GalleryResponse>, AppError> {
    let ticket = state.orchestrator.begin_refresh(index)?;
    let orchestrator = state.orchestrator.clone();
    tokio::spawn(async move {
        orchestrator.finish_image(ticket).await;
    });
    Ok(gallery(State(state)).await)
}

pub async fn edit_description(
    State(state): State<Arc<AppState>>,
    Path(index): Path<usize>,
    Json(req): Json<DescriptionRequest>,
) -> Result<Json<GalleryResponse>, AppError> {
    let ticket = state.orchestrator.begin_edit(index, &req.text)?;
    let orchestrator = state.orchestrator.clone();
    tokio::spawn(async move {
        orchestrator.finish_image(ticket).await;
    });
    Ok(gallery(State(state)).await)
}

pub async fn generate_3d(
    State(state): State<Arc<AppState>>,
    Path(index): Path<usize>,
) -> Result<Json<GalleryResponse>, AppError> {
    let ticket = state.orchestrator.begin_generate_3d(index)?;
    let orchestrator = state.orchestrator.clone();
    tokio::spawn(async move {
        orchestrator.finish_3d(ticket).await;
    });
    Ok(gallery(State(state)).await)
}

pub async fn delete_object(
    State(state): State<Arc<AppState>>,
    Path(index): Path<usize>,
) -> Result<Json<GalleryResponse>, AppError> {
    if index >= state.orchestrator.store().len() {
        return Err(c3d_core::Error::IndexOutOfRange(index).into());
    }
    state.orchestrator.delete(index);
    Ok(gallery(State(state)).await)
}

pub async fn convert_all(State(state): State<Arc<AppState>>) -> Result<Json<GalleryResponse>, AppError> {
    let ticket = state.orchestrator.begin_convert_all()?;
    let orchestrator = state.orchestrator.clone();
    tokio::spawn(async move {
        orchestrator.run_convert_all(ticket).await;
    });
    Ok(gallery(State(state)).await)
}
