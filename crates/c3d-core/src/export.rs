use std::path::{Component, Path, PathBuf};

use log::{error, info, warn};
use serde::Serialize;

use crate::error::Result;
use crate::scene_object::SceneObject;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportItem {
    pub title: String,
    pub model_path: PathBuf,
    pub image_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportPreview {
    pub count: usize,
    pub items: Vec<ExportItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportReport {
    pub copied: usize,
    pub destination: Option<PathBuf>,
}

impl ExportReport {
    fn nothing() -> Self {
        Self {
            copied: 0,
            destination: None,
        }
    }
}

/// Copies finished 3D assets out of the gallery into a named folder under
/// `root`.
#[derive(Debug, Clone)]
pub struct ExportCollector {
    root: PathBuf,
}

impl ExportCollector {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Objects whose 3D model is ready and whose file is still on disk.
    pub fn exportable<'a>(&self, snapshot: &'a [SceneObject]) -> Vec<&'a SceneObject> {
        snapshot
            .iter()
            .filter(|obj| obj.model_path().is_some_and(Path::is_file))
            .collect()
    }

    pub fn preview(&self, snapshot: &[SceneObject]) -> ExportPreview {
        let items: Vec<ExportItem> = self
            .exportable(snapshot)
            .into_iter()
            .filter_map(|obj| {
                Some(ExportItem {
                    title: obj.title.clone(),
                    model_path: obj.model_path()?.to_path_buf(),
                    image_path: obj.image_path().map(Path::to_path_buf),
                })
            })
            .collect();
        ExportPreview {
            count: items.len(),
            items,
        }
    }

    pub async fn export(&self, snapshot: &[SceneObject], folder_name: &str) -> Result<ExportReport> {
        let Some(folder) = sanitize_folder(folder_name) else {
            warn!("Export skipped: invalid folder name {:?}", folder_name);
            return Ok(ExportReport::nothing());
        };

        let items = self.preview(snapshot).items;
        if items.is_empty() {
            info!("Export skipped: no finished 3D models");
            return Ok(ExportReport::nothing());
        }

        let destination = self.root.join(folder);
        tokio::fs::create_dir_all(&destination).await?;

        let mut copied = 0;
        for item in &items {
            let target = destination.join(format!("{}.glb", sanitize_file_stem(&item.title)));
            match tokio::fs::copy(&item.model_path, &target).await {
                Ok(_) => {
                    info!("📦 Exported '{}' to {}", item.title, target.display());
                    copied += 1;
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    warn!("Skipping '{}': {} is gone", item.title, item.model_path.display());
                }
                Err(e) => {
                    error!("❌ Failed to export '{}' to {}: {}", item.title, target.display(), e);
                }
            }
        }

        info!("✅ Exported {} models to {}", copied, destination.display());
        Ok(ExportReport {
            copied,
            destination: Some(destination),
        })
    }
}

/// Title → file stem: whitespace becomes `_`, path separators are dropped.
pub fn sanitize_file_stem(title: &str) -> String {
    let stem: String = title
        .trim()
        .chars()
        .filter(|c| !matches!(c, '/' | '\\'))
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect();
    match stem.trim_matches('.') {
        "" => "object".to_string(),
        _ => stem,
    }
}

/// Single normal path component, or `None` when nothing usable is left.
fn sanitize_folder(name: &str) -> Option<String> {
    let cleaned: String = name.trim().chars().filter(|c| !matches!(c, '/' | '\\')).collect();
    let cleaned = cleaned.trim();
    let mut components = Path::new(cleaned).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Some(cleaned.to_string()),
        _ => None,
    }
}
