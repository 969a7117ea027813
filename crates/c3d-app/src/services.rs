mod agent;
mod image_service;
mod llm_container;
mod trellis;

pub use agent::AgentPlanner;
pub use image_service::DiffusionClient;
pub use llm_container::LlmContainer;
pub use trellis::TrellisClient;
