mod backend;
mod config;
mod error;
mod services;
mod thumbnails;

use std::sync::Arc;

use c3d_core::{ExportCollector, GenerationOrchestrator, SceneObjectStore, StatusProjector, WorkspaceController};
use log::{info, warn};

use crate::backend::AppState;
use crate::config::AppConfig;
use crate::services::{AgentPlanner, DiffusionClient, LlmContainer, TrellisClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = AppConfig::load()?;
    config.ensure_dirs().await?;

    let http = reqwest::Client::new();
    let store = SceneObjectStore::new();

    let trellis = Arc::new(TrellisClient::new(http.clone(), &config.trellis_base_url, &config.models_dir));
    if trellis.is_healthy().await {
        info!("✅ 3D generation service is healthy");
    } else {
        warn!("❌ 3D generation service is not available at {}", config.trellis_base_url);
    }

    let images = Arc::new(DiffusionClient::new(
        http.clone(),
        &config.image_service_url,
        &config.generated_images_dir,
    ));
    let orchestrator = GenerationOrchestrator::new(store.clone(), images, trellis);

    let planner = Arc::new(AgentPlanner::new(
        http.clone(),
        &config.agent_base_url,
        &config.agent_model,
        config.num_objects,
    ));
    let llm = Arc::new(LlmContainer::new(
        http,
        &config.agent_base_url,
        config.llm_start_command.clone(),
        config.llm_stop_command.clone(),
    ));
    let mut controller =
        WorkspaceController::new(store, planner, llm).with_release_on_enter(config.stop_llm_in_workspace);
    controller.bootstrap().await;

    let projector = StatusProjector::new(
        config.max_cards,
        &config.generating_placeholder,
        &config.filtered_placeholder,
    );
    let exporter = ExportCollector::new(&config.export_root);
    info!("Exports go to {}", exporter.root().display());

    let state = Arc::new(AppState::new(orchestrator, controller, projector, exporter));
    backend::serve(state.clone(), config.port).await?;

    state.controller.lock().await.shutdown().await;
    info!("Bye");
    Ok(())
}
