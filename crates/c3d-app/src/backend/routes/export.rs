use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::IntoResponse;
use c3d_core::{ExportPreview, ExportReport};

use crate::backend::schemas::ExportRequest;
use crate::backend::state::AppState;
use crate::error::AppError;
use crate::thumbnails::render_thumbnail;

pub async fn export_preview(State(state): State<Arc<AppState>>) -> Json<ExportPreview> {
    Json(state.exporter.preview(&state.orchestrator.store().snapshot()))
}

pub async fn export_thumbnail(
    State(state): State<Arc<AppState>>,
    Path(index): Path<usize>,
) -> Result<impl IntoResponse, AppError> {
    let preview = state.exporter.preview(&state.orchestrator.store().snapshot());
    let image = preview
        .items
        .into_iter()
        .nth(index)
        .and_then(|item| item.image_path)
        .ok_or_else(|| AppError::NotFound(format!("no thumbnail for export entry {index}")))?;

    let png = tokio::task::spawn_blocking(move || render_thumbnail(&image))
        .await
        .map_err(std::io::Error::other)??;

    Ok(([(header::CONTENT_TYPE, "image/png")], png))
}

pub async fn export_models(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ExportRequest>,
) -> Result<Json<ExportReport>, AppError> {
    let snapshot = state.orchestrator.store().snapshot();
    let report = state.exporter.export(&snapshot, &req.folder).await?;
    Ok(Json(report))
}
