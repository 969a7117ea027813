//! Scripted collaborators for unit tests.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::error::{Error, Result};
use crate::generation::{GenerationResult, ImageGenerator, ModelGenerator};
use crate::planning::{PlannerService, ScenePlan, ScenePlanner};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageCall {
    pub title: String,
    pub prompt: String,
    pub seed: u32,
}

/// Returns queued results in order, then succeeds with `/images/<title>.png`.
#[derive(Default)]
pub struct ScriptedImages {
    script: Mutex<VecDeque<GenerationResult>>,
    calls: Mutex<Vec<ImageCall>>,
}

impl ScriptedImages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then(self, result: GenerationResult) -> Self {
        self.script.lock().unwrap().push_back(result);
        self
    }

    pub fn calls(&self) -> Vec<ImageCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageGenerator for ScriptedImages {
    async fn generate(&self, title: &str, prompt: &str, seed: u32) -> GenerationResult {
        self.calls.lock().unwrap().push(ImageCall {
            title: title.to_string(),
            prompt: prompt.to_string(),
            seed,
        });
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| GenerationResult::Success(PathBuf::from(format!("/images/{title}.png"))))
    }
}

pub enum ModelStep {
    Return(GenerationResult),
    Panic,
    Hang,
    Gate(Arc<Notify>),
}

/// Like [`ScriptedImages`] for 3D, with the option to panic mid-call.
#[derive(Default)]
pub struct ScriptedModels {
    script: Mutex<VecDeque<ModelStep>>,
    calls: Mutex<Vec<PathBuf>>,
}

impl ScriptedModels {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then(self, result: GenerationResult) -> Self {
        self.script.lock().unwrap().push_back(ModelStep::Return(result));
        self
    }

    pub fn then_panic(self) -> Self {
        self.script.lock().unwrap().push_back(ModelStep::Panic);
        self
    }

    /// The call never completes; used to cancel a pass mid-flight.
    pub fn then_hang(self) -> Self {
        self.script.lock().unwrap().push_back(ModelStep::Hang);
        self
    }

    /// Holds the call until `gate` is notified, then succeeds.
    pub fn then_wait(self, gate: Arc<Notify>) -> Self {
        self.script.lock().unwrap().push_back(ModelStep::Gate(gate));
        self
    }

    pub fn calls(&self) -> Vec<PathBuf> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelGenerator for ScriptedModels {
    async fn generate(&self, image: &Path) -> GenerationResult {
        self.calls.lock().unwrap().push(image.to_path_buf());
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(ModelStep::Return(result)) => result,
            Some(ModelStep::Panic) => panic!("scripted 3D panic"),
            Some(ModelStep::Hang) => std::future::pending().await,
            Some(ModelStep::Gate(gate)) => {
                gate.notified().await;
                GenerationResult::Success(image.with_extension("glb"))
            }
            None => GenerationResult::Success(image.with_extension("glb")),
        }
    }
}

pub struct MockPlanner {
    reply: std::result::Result<ScenePlan, String>,
    calls: Arc<AtomicUsize>,
}

impl MockPlanner {
    pub fn new(plan: ScenePlan) -> Self {
        Self {
            reply: Ok(plan),
            calls: Arc::default(),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            reply: Err(message.to_string()),
            calls: Arc::default(),
        }
    }

    pub fn calls(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }
}

#[async_trait]
impl ScenePlanner for MockPlanner {
    async fn propose(&self, _scene_text: &str) -> Result<ScenePlan> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.reply.clone().map_err(Error::Planner)
    }
}

#[derive(Default)]
pub struct MockService {
    ready: AtomicBool,
    starts: AtomicUsize,
    stops: AtomicUsize,
}

impl MockService {
    pub fn up() -> Self {
        Self {
            ready: AtomicBool::new(true),
            ..Self::default()
        }
    }

    pub fn down() -> Self {
        Self::default()
    }

    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PlannerService for MockService {
    async fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    async fn start(&self) -> Result<()> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        self.ready.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        self.ready.store(false, Ordering::SeqCst);
        Ok(())
    }
}
