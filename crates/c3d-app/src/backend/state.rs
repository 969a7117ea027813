use std::sync::Arc;

use c3d_core::{
    ExportCollector, GenerationOrchestrator, ImageTicket, Mode, PlannerService, StatusProjector, ViewState,
    WorkspaceController,
};
use log::info;
use tokio::sync::{Mutex, watch};

pub struct AppState {
    pub orchestrator: GenerationOrchestrator,
    pub controller: Mutex<WorkspaceController>,
    pub projector: StatusProjector,
    pub exporter: ExportCollector,
    planner_service: Arc<dyn PlannerService>,
    mode: watch::Sender<Mode>,
}

impl AppState {
    pub fn new(
        orchestrator: GenerationOrchestrator,
        controller: WorkspaceController,
        projector: StatusProjector,
        exporter: ExportCollector,
    ) -> Self {
        let (mode, _) = watch::channel(controller.mode());
        let planner_service = controller.service();
        Self {
            orchestrator,
            controller: Mutex::new(controller),
            projector,
            exporter,
            planner_service,
            mode,
        }
    }

    pub async fn planner_ready(&self) -> bool {
        self.planner_service.is_ready().await
    }

    /// Readable while a scene submission holds the controller.
    pub fn mode(&self) -> Mode {
        *self.mode.borrow()
    }

    pub fn set_mode(&self, mode: Mode) {
        self.mode.send_replace(mode);
    }

    pub fn view(&self) -> ViewState {
        self.projector.project(&self.orchestrator.store().snapshot())
    }

    pub fn spawn_images(&self, tickets: Vec<ImageTicket>) {
        if tickets.is_empty() {
            return;
        }
        info!("🎨 Generating images for {} objects", tickets.len());
        let orchestrator = self.orchestrator.clone();
        tokio::spawn(async move {
            orchestrator.generate_images(tickets).await;
        });
    }
}
