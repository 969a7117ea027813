use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Outcome of one image or 3D generation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum GenerationResult {
    Success(PathBuf),
    ContentFiltered,
    Failure(String),
}

impl GenerationResult {
    pub fn failure(message: impl Into<String>) -> Self {
        Self::Failure(message.into())
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn icon(&self) -> &str {
        match self {
            Self::Success(_) => "✅",
            Self::ContentFiltered => "🚫",
            Self::Failure(_) => "❌",
        }
    }
}

/// Text-to-image collaborator.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate(&self, title: &str, prompt: &str, seed: u32) -> GenerationResult;
}

/// Image-to-3D collaborator. Returns the path of a GLB file on success.
#[async_trait]
pub trait ModelGenerator: Send + Sync {
    async fn generate(&self, image: &Path) -> GenerationResult;
}
