use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use c3d_core::{GenerationResult, ImageGenerator};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Serialize)]
struct GenerateRequest<'a> {
    object_name: &'a str,
    prompt: &'a str,
    seed: u32,
    output_dir: &'a Path,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    status: String,
    output_path: Option<PathBuf>,
    error: Option<String>,
}

/// Client for the text-to-image diffusion service.
pub struct DiffusionClient {
    client: reqwest::Client,
    url: String,
    output_dir: PathBuf,
}

impl DiffusionClient {
    pub fn new(client: reqwest::Client, base_url: &str, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            url: format!("{}/generate", base_url.trim_end_matches('/')),
            output_dir: output_dir.into(),
        }
    }

    async fn request(&self, title: &str, prompt: &str, seed: u32) -> Result<GenerateResponse, AppError> {
        let body = GenerateRequest {
            object_name: title,
            prompt,
            seed,
            output_dir: &self.output_dir,
        };

        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::BackendError(format!("HTTP {}: {}", status, body)));
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl ImageGenerator for DiffusionClient {
    async fn generate(&self, title: &str, prompt: &str, seed: u32) -> GenerationResult {
        info!("Requesting image for '{}' (seed {})", title, seed);
        match self.request(title, prompt, seed).await {
            Ok(response) => interpret(response),
            Err(e) => {
                warn!("Image service call failed for '{}': {}", title, e);
                GenerationResult::failure(e.to_string())
            }
        }
    }
}

fn interpret(response: GenerateResponse) -> GenerationResult {
    match response.status.as_str() {
        "success" => match response.output_path {
            Some(path) if path.is_file() => GenerationResult::Success(path),
            Some(path) => GenerationResult::failure(format!("Generated file not found at: {}", path.display())),
            None => GenerationResult::failure("No output path returned"),
        },
        "content_filtered" => GenerationResult::ContentFiltered,
        "error" => GenerationResult::failure(response.error.unwrap_or_else(|| "Unknown error".to_string())),
        other => GenerationResult::failure(format!("Unexpected status: {}", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(json: &str) -> GenerateResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_success_requires_file_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("chair_42.png");
        std::fs::write(&image, b"png").unwrap();

        let ok = interpret(GenerateResponse {
            status: "success".into(),
            output_path: Some(image.clone()),
            error: None,
        });
        assert_eq!(ok, GenerationResult::Success(image));

        let missing = interpret(response(r#"{"status": "success", "output_path": "/nope/lamp.png"}"#));
        assert!(matches!(missing, GenerationResult::Failure(msg) if msg.contains("/nope/lamp.png")));
    }

    #[test]
    fn test_filtered_and_errors() {
        assert_eq!(
            interpret(response(r#"{"status": "content_filtered"}"#)),
            GenerationResult::ContentFiltered
        );
        assert_eq!(
            interpret(response(r#"{"status": "error", "error": "CUDA out of memory"}"#)),
            GenerationResult::failure("CUDA out of memory")
        );
        assert_eq!(
            interpret(response(r#"{"status": "queued"}"#)),
            GenerationResult::failure("Unexpected status: queued")
        );
    }

    #[test]
    fn test_request_shape() {
        let body = GenerateRequest {
            object_name: "Beach Chair",
            prompt: "a striped beach chair",
            seed: 42,
            output_dir: Path::new("assets/images"),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["object_name"], "Beach Chair");
        assert_eq!(json["seed"], 42);
        assert_eq!(json["output_dir"], "assets/images");
    }
}
