use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use c3d_core::{GenerationResult, ModelGenerator};
use chrono::Local;
use log::{error, info, warn};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

const INFER_TIMEOUT: Duration = Duration::from_secs(300);
const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
struct InferResponse {
    #[serde(default)]
    artifacts: Vec<Artifact>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Artifact {
    finish_reason: String,
    #[serde(default)]
    base64: Option<String>,
}

#[derive(Debug, PartialEq, Eq)]
enum Reply {
    Glb(Vec<u8>),
    Filtered,
    Failed(String),
}

#[derive(Serialize)]
struct InferRequest {
    image: String,
}

/// Client for the TRELLIS image-to-3D inference service.
pub struct TrellisClient {
    client: reqwest::Client,
    base_url: String,
    models_dir: PathBuf,
}

impl TrellisClient {
    pub fn new(client: reqwest::Client, base_url: &str, models_dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            models_dir: models_dir.into(),
        }
    }

    pub async fn is_healthy(&self) -> bool {
        let url = format!("{}/health/ready", self.base_url);
        match self.client.get(&url).timeout(HEALTH_TIMEOUT).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                warn!("3D service health check failed: {}", e);
                false
            }
        }
    }

    async fn infer(&self, image: &Path) -> Result<Reply, AppError> {
        let data_uri = encode_image(image).await?;
        let url = format!("{}/infer", self.base_url);
        info!("Making 3D generation request to: {}", url);

        let response = self
            .client
            .post(&url)
            .json(&InferRequest { image: data_uri })
            .timeout(INFER_TIMEOUT)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::BackendError(format!("HTTP {}: {}", status, body)));
        }

        Ok(decode(response.json().await?))
    }

    async fn save_glb(&self, glb: &[u8], image: &Path) -> Result<PathBuf, AppError> {
        let stem = image.file_stem().and_then(|s| s.to_str()).unwrap_or("model");
        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        let path = self.models_dir.join(format!("{stem}_{timestamp}.glb"));

        tokio::fs::create_dir_all(&self.models_dir).await?;
        tokio::fs::write(&path, glb).await?;
        info!("Saved 3D model to: {}", path.display());
        Ok(path)
    }
}

#[async_trait]
impl ModelGenerator for TrellisClient {
    async fn generate(&self, image: &Path) -> GenerationResult {
        let reply = match self.infer(image).await {
            Ok(reply) => reply,
            Err(e) => {
                error!("3D request for {} failed: {}", image.display(), e);
                return GenerationResult::failure(e.to_string());
            }
        };

        match reply {
            Reply::Glb(bytes) => match self.save_glb(&bytes, image).await {
                Ok(path) => GenerationResult::Success(path),
                Err(e) => GenerationResult::failure(format!("Failed to save GLB file: {}", e)),
            },
            Reply::Filtered => {
                warn!("Content filtered by 3D generation service");
                GenerationResult::ContentFiltered
            }
            Reply::Failed(message) => GenerationResult::failure(message),
        }
    }
}

async fn encode_image(path: &Path) -> Result<String, AppError> {
    let bytes = tokio::fs::read(path).await?;
    Ok(format!("data:{};base64,{}", mime_for(path), STANDARD.encode(bytes)))
}

fn mime_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "webp" => "image/webp",
        _ => "image/png",
    }
}

fn decode(response: InferResponse) -> Reply {
    let Some(artifact) = response.artifacts.into_iter().next() else {
        return Reply::Failed("No artifacts in API response".to_string());
    };

    match artifact.finish_reason.as_str() {
        "SUCCESS" => match artifact.base64.as_deref().filter(|b| !b.is_empty()) {
            Some(encoded) => match STANDARD.decode(encoded) {
                Ok(bytes) => Reply::Glb(bytes),
                Err(e) => Reply::Failed(format!("Invalid GLB payload: {}", e)),
            },
            None => Reply::Failed("No GLB data in API response".to_string()),
        },
        "CONTENT_FILTERED" => Reply::Filtered,
        other => Reply::Failed(format!("API request failed: {}", other)),
    }
}
