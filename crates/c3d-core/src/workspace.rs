use std::sync::Arc;

use log::{info, warn};
use serde::Serialize;

use crate::planning::{PlannerService, ScenePlan, ScenePlanner};
use crate::scene_object::SceneObject;
use crate::store::{SceneObjectStore, Snapshot};

const BLANK_SCENE_HINT: &str = "Please enter a scene description.";
const NO_OBJECTS_HINT: &str = "No objects could be identified in that scene. Please add more detail.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Planning,
    Workspace,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// The store was seeded and the controller is now in workspace mode.
    Entered(Snapshot),
    /// Nothing changed; show this to the user.
    Hint(String),
}

/// Switches between scene planning and the object workspace, and keeps the
/// language-model service running only while it is needed.
pub struct WorkspaceController {
    mode: Mode,
    bootstrap_started: bool,
    owns_service: bool,
    release_on_enter: bool,
    store: SceneObjectStore,
    planner: Arc<dyn ScenePlanner>,
    service: Arc<dyn PlannerService>,
}

impl WorkspaceController {
    pub fn new(store: SceneObjectStore, planner: Arc<dyn ScenePlanner>, service: Arc<dyn PlannerService>) -> Self {
        Self {
            mode: Mode::Planning,
            bootstrap_started: false,
            owns_service: false,
            release_on_enter: true,
            store,
            planner,
            service,
        }
    }

    /// Whether entering the workspace stops the planner service.
    pub fn with_release_on_enter(mut self, release: bool) -> Self {
        self.release_on_enter = release;
        self
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn store(&self) -> &SceneObjectStore {
        &self.store
    }

    /// Handle for readiness checks that must not wait on the controller.
    pub fn service(&self) -> Arc<dyn PlannerService> {
        self.service.clone()
    }

    /// Best-effort start of the planner service. Failures are logged only.
    pub async fn bootstrap(&mut self) {
        if self.bootstrap_started {
            return;
        }
        self.bootstrap_started = true;

        if self.service.is_ready().await {
            info!("Planner service already running");
            return;
        }

        info!("Starting planner service");
        match self.service.start().await {
            Ok(()) => self.owns_service = true,
            Err(e) => warn!("Could not start planner service: {}", e),
        }
    }

    pub async fn submit_scene(&mut self, text: &str) -> SubmitOutcome {
        let text = text.trim();
        if text.is_empty() {
            return SubmitOutcome::Hint(BLANK_SCENE_HINT.to_string());
        }

        let proposals = match self.planner.propose(text).await {
            Ok(ScenePlan::Scene(proposals)) => proposals,
            Ok(ScenePlan::NotScene { hint }) => {
                info!("Input rejected as not a scene");
                return SubmitOutcome::Hint(hint);
            }
            Err(e) => {
                warn!("Scene planning failed: {}", e);
                return SubmitOutcome::Hint(e.to_string());
            }
        };

        if proposals.is_empty() {
            return SubmitOutcome::Hint(NO_OBJECTS_HINT.to_string());
        }

        let snapshot = self
            .store
            .replace_all(proposals.into_iter().map(SceneObject::from).collect());
        self.mode = Mode::Workspace;
        info!("Entered workspace with {} objects", snapshot.len());

        if self.release_on_enter {
            self.release_service().await;
        }

        SubmitOutcome::Entered(snapshot)
    }

    /// Clears everything and goes back to planning. Allowed at any time.
    pub async fn start_over(&mut self) -> Snapshot {
        let snapshot = self.store.clear();
        self.mode = Mode::Planning;
        info!("Starting over");
        self.bootstrap_started = false;
        self.bootstrap().await;
        snapshot
    }

    pub async fn shutdown(&mut self) {
        if self.owns_service {
            self.release_service().await;
        }
    }

    async fn release_service(&mut self) {
        info!("Stopping planner service");
        if let Err(e) = self.service.stop().await {
            warn!("Could not stop planner service: {}", e);
        }
        self.owns_service = false;
        self.bootstrap_started = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene_object::ObjectProposal;
    use crate::testing::{MockPlanner, MockService};

    fn controller(planner: MockPlanner, service: Arc<MockService>) -> WorkspaceController {
        WorkspaceController::new(SceneObjectStore::new(), Arc::new(planner), service)
    }

    fn beach() -> ScenePlan {
        ScenePlan::Scene(vec![
            ObjectProposal::new("Beach Chair", "a striped beach chair"),
            ObjectProposal::new("Umbrella", "a red umbrella"),
        ])
    }

    #[tokio::test]
    async fn test_bootstrap_starts_service_once() {
        let service = Arc::new(MockService::down());
        let mut ctl = controller(MockPlanner::new(beach()), service.clone());

        ctl.bootstrap().await;
        ctl.bootstrap().await;

        assert_eq!(service.starts(), 1);
        assert!(service.is_ready().await);
    }

    #[tokio::test]
    async fn test_bootstrap_skips_running_service() {
        let service = Arc::new(MockService::up());
        let mut ctl = controller(MockPlanner::new(beach()), service.clone());

        ctl.bootstrap().await;
        ctl.shutdown().await;

        assert_eq!(service.starts(), 0);
        assert_eq!(service.stops(), 0);
    }

    #[tokio::test]
    async fn test_blank_scene_is_a_hint() {
        let service = Arc::new(MockService::up());
        let planner = MockPlanner::new(beach());
        let calls = planner.calls();
        let mut ctl = controller(planner, service);

        let outcome = ctl.submit_scene("   ").await;

        assert_eq!(outcome, SubmitOutcome::Hint(BLANK_SCENE_HINT.to_string()));
        assert_eq!(ctl.mode(), Mode::Planning);
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_not_a_scene_keeps_planning_mode() {
        let service = Arc::new(MockService::up());
        let plan = ScenePlan::NotScene {
            hint: "Try describing a place.".into(),
        };
        let mut ctl = controller(MockPlanner::new(plan), service);

        let outcome = ctl.submit_scene("hello").await;

        assert_eq!(outcome, SubmitOutcome::Hint("Try describing a place.".into()));
        assert_eq!(ctl.mode(), Mode::Planning);
        assert!(ctl.store().is_empty());
    }

    #[tokio::test]
    async fn test_planner_error_becomes_hint() {
        let service = Arc::new(MockService::up());
        let mut ctl = controller(MockPlanner::failing("connection refused"), service);

        let SubmitOutcome::Hint(hint) = ctl.submit_scene("a beach").await else {
            panic!("expected a hint");
        };
        assert!(hint.contains("connection refused"));
        assert_eq!(ctl.mode(), Mode::Planning);
    }

    #[tokio::test]
    async fn test_empty_proposal_list_is_a_hint() {
        let service = Arc::new(MockService::up());
        let mut ctl = controller(MockPlanner::new(ScenePlan::Scene(vec![])), service);

        let outcome = ctl.submit_scene("a beach").await;

        assert_eq!(outcome, SubmitOutcome::Hint(NO_OBJECTS_HINT.to_string()));
    }

    #[tokio::test]
    async fn test_scene_enters_workspace_and_releases_service() {
        let service = Arc::new(MockService::down());
        let mut ctl = controller(MockPlanner::new(beach()), service.clone());
        ctl.bootstrap().await;

        let SubmitOutcome::Entered(snapshot) = ctl.submit_scene("a sunny beach").await else {
            panic!("expected to enter the workspace");
        };

        let titles: Vec<_> = snapshot.iter().map(|o| o.title.as_str()).collect();
        assert_eq!(titles, vec!["Beach Chair", "Umbrella"]);
        assert_eq!(ctl.mode(), Mode::Workspace);
        assert_eq!(service.stops(), 1);
    }

    #[tokio::test]
    async fn test_release_can_be_disabled() {
        let service = Arc::new(MockService::up());
        let mut ctl = controller(MockPlanner::new(beach()), service.clone()).with_release_on_enter(false);

        ctl.submit_scene("a sunny beach").await;

        assert_eq!(ctl.mode(), Mode::Workspace);
        assert_eq!(service.stops(), 0);
    }

    #[tokio::test]
    async fn test_start_over_clears_and_restarts_service() {
        let service = Arc::new(MockService::down());
        let mut ctl = controller(MockPlanner::new(beach()), service.clone());
        ctl.bootstrap().await;
        ctl.submit_scene("a sunny beach").await;

        let snapshot = ctl.start_over().await;

        assert!(snapshot.is_empty());
        assert!(ctl.store().is_empty());
        assert_eq!(ctl.mode(), Mode::Planning);
        assert_eq!(service.starts(), 2);
    }

    #[tokio::test]
    async fn test_shutdown_stops_owned_service() {
        let service = Arc::new(MockService::down());
        let mut ctl = controller(MockPlanner::new(beach()), service.clone());
        ctl.bootstrap().await;

        ctl.shutdown().await;
        ctl.shutdown().await;

        assert_eq!(service.stops(), 1);
    }
}
