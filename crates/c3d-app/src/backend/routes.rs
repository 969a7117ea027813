use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, post};

use crate::backend::routes::export::{export_models, export_preview, export_thumbnail};
use crate::backend::routes::gallery::{
    convert_all, delete_object, edit_description, gallery, generate_3d, health, objects, planner, refresh_image,
    start_over, submit_scene,
};
use crate::backend::state::AppState;

mod export;
mod gallery;

pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health))
        .route("/planner", get(planner))
        .route("/gallery", get(gallery))
        .route("/objects", get(objects))
        .route("/scene", post(submit_scene))
        .route("/start-over", post(start_over))
        .route("/objects/{index}", delete(delete_object))
        .route("/objects/{index}/refresh", post(refresh_image))
        .route("/objects/{index}/description", post(edit_description))
        .route("/objects/{index}/model", post(generate_3d))
        .route("/convert-all", post(convert_all))
        .route("/export", get(export_preview).post(export_models))
        .route("/export/{index}/thumbnail", get(export_thumbnail))
}
