use async_trait::async_trait;

use crate::error::Result;
use crate::scene_object::ObjectProposal;

/// What the planner made of a piece of user text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScenePlan {
    Scene(Vec<ObjectProposal>),
    NotScene { hint: String },
}

#[async_trait]
pub trait ScenePlanner: Send + Sync {
    async fn propose(&self, scene_text: &str) -> Result<ScenePlan>;
}

/// Lifecycle of the language-model service backing the planner.
#[async_trait]
pub trait PlannerService: Send + Sync {
    async fn is_ready(&self) -> bool;

    async fn start(&self) -> Result<()>;

    async fn stop(&self) -> Result<()>;
}
