use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use log::info;

use crate::error::AppError;

const ENV_FILE: &str = ".env";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub agent_base_url: String,
    pub agent_model: String,
    pub image_service_url: String,
    pub trellis_base_url: String,
    pub generated_images_dir: PathBuf,
    pub models_dir: PathBuf,
    pub export_root: PathBuf,
    pub generating_placeholder: PathBuf,
    pub filtered_placeholder: PathBuf,
    pub max_cards: usize,
    pub num_objects: usize,
    pub llm_start_command: Option<String>,
    pub llm_stop_command: Option<String>,
    /// Stop the language model once the workspace is entered, to free VRAM
    /// for the image and 3D services.
    pub stop_llm_in_workspace: bool,
}

impl AppConfig {
    /// Reads `.env` if present, then the process environment.
    pub fn load() -> anyhow::Result<Self> {
        match dotenvy::from_path(ENV_FILE) {
            Ok(()) => info!("Loaded environment from {}", ENV_FILE),
            Err(e) if e.not_found() => {}
            Err(e) => return Err(e.into()),
        }

        Ok(Self::from_lookup(|key| env::var(key).ok())?)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());
        let optional = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let export_root = match lookup("EXPORT_ROOT") {
            Some(root) => PathBuf::from(root),
            None => lookup("HOME")
                .map(|home| PathBuf::from(home).join(".trellis").join("scene"))
                .unwrap_or_else(|| PathBuf::from("scene")),
        };

        Ok(Self {
            port: parse(&lookup, "PORT", 7860)?,
            agent_base_url: var("AGENT_BASE_URL", "http://localhost:19002/v1"),
            agent_model: var("AGENT_MODEL", "meta/llama-3.1-8b-instruct"),
            image_service_url: var("IMAGE_SERVICE_URL", "http://localhost:5000"),
            trellis_base_url: var("TRELLIS_BASE_URL", "http://localhost:8000/v1"),
            generated_images_dir: var("GENERATED_IMAGES_DIR", "assets/images").into(),
            models_dir: var("MODELS_DIR", "assets/models").into(),
            export_root,
            generating_placeholder: var("GENERATING_PLACEHOLDER", "static/images/generating.svg").into(),
            filtered_placeholder: var("FILTERED_PLACEHOLDER", "static/images/content_filtered.svg").into(),
            max_cards: parse(&lookup, "MAX_CARDS", 20)?,
            num_objects: parse(&lookup, "NUM_OF_OBJECTS", 20)?,
            llm_start_command: optional("LLM_START_COMMAND"),
            llm_stop_command: optional("LLM_STOP_COMMAND"),
            stop_llm_in_workspace: parse_flag(&lookup, "STOP_LLM_IN_WORKSPACE", true)?,
        })
    }

    pub async fn ensure_dirs(&self) -> std::io::Result<()> {
        for dir in [&self.generated_images_dir, &self.models_dir, &self.export_root] {
            tokio::fs::create_dir_all(dir).await?;
        }
        Ok(())
    }
}

fn parse<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T, AppError> {
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::Config(format!("{key} must be a number, got {raw:?}"))),
    }
}

fn parse_flag(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: bool) -> Result<bool, AppError> {
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(AppError::Config(format!("{key} must be a boolean, got {raw:?}"))),
    }
}
