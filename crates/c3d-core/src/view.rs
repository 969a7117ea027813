use std::path::PathBuf;

use serde::Serialize;

use crate::scene_object::{ImageState, ModelState, ObjectId, SceneObject};

pub const DEFAULT_MAX_CARDS: usize = 20;

/// State of the per-card "→ 3D" button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreeDButton {
    Convert,
    AwaitingImage,
    Generating,
    Completed,
    Filtered,
}

impl ThreeDButton {
    /// Priority table, first match wins.
    pub fn for_object(obj: &SceneObject) -> Self {
        match (&obj.model_state, &obj.image_state) {
            (ModelState::Ready(_), _) => Self::Completed,
            (ModelState::ContentFiltered, _) => Self::Filtered,
            (ModelState::Generating, _) => Self::Generating,
            _ if obj.batch_processing => Self::Generating,
            (_, ImageState::Ready(_)) => Self::Convert,
            _ => Self::AwaitingImage,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Convert | Self::AwaitingImage => "→ 3D",
            Self::Generating => "⏳ 3D",
            Self::Completed => "✓ 3D",
            Self::Filtered => "🚫 3D",
        }
    }

    pub fn interactive(&self) -> bool {
        matches!(self, Self::Convert)
    }

    /// Style hook used by the web front end
    pub fn css_class(&self) -> &'static str {
        match self {
            Self::Convert => "action-btn",
            Self::AwaitingImage => "disabled-btn",
            Self::Generating => "three-d-generating",
            Self::Completed => "three-d-completed",
            Self::Filtered => "content-filtered",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "path", rename_all = "snake_case")]
pub enum DisplayImage {
    Artifact(PathBuf),
    Generating(PathBuf),
    Filtered(PathBuf),
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ButtonView {
    pub label: &'static str,
    pub interactive: bool,
    pub class: &'static str,
}

impl From<ThreeDButton> for ButtonView {
    fn from(button: ThreeDButton) -> Self {
        Self {
            label: button.label(),
            interactive: button.interactive(),
            class: button.css_class(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardView {
    pub index: usize,
    pub id: ObjectId,
    pub title: String,
    pub image: DisplayImage,
    pub image_error: Option<String>,
    pub refresh_enabled: bool,
    pub edit_enabled: bool,
    pub delete_enabled: bool,
    pub three_d: ThreeDButton,
    pub three_d_button: ButtonView,
}

/// One slot of the fixed card pool. Unused slots are hidden, not removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotView {
    pub visible: bool,
    pub card: Option<CardView>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ControlView {
    pub visible: bool,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewState {
    pub slots: Vec<SlotView>,
    pub placeholder_visible: bool,
    pub convert_all: ControlView,
    pub start_over_enabled: bool,
    /// Objects beyond the slot pool, not rendered
    pub overflow: usize,
}

impl ViewState {
    pub fn cards(&self) -> impl Iterator<Item = &CardView> {
        self.slots.iter().filter_map(|slot| slot.card.as_ref())
    }

    pub fn card(&self, index: usize) -> Option<&CardView> {
        self.slots.get(index).and_then(|slot| slot.card.as_ref())
    }
}

/// Derives everything the gallery UI shows from a store snapshot.
#[derive(Debug, Clone)]
pub struct StatusProjector {
    max_cards: usize,
    generating_placeholder: PathBuf,
    filtered_placeholder: PathBuf,
}

impl StatusProjector {
    pub fn new(max_cards: usize, generating_placeholder: impl Into<PathBuf>, filtered_placeholder: impl Into<PathBuf>) -> Self {
        Self {
            max_cards,
            generating_placeholder: generating_placeholder.into(),
            filtered_placeholder: filtered_placeholder.into(),
        }
    }

    pub fn filtered_placeholder(&self) -> &PathBuf {
        &self.filtered_placeholder
    }

    pub fn project(&self, objects: &[SceneObject]) -> ViewState {
        let slots = (0..self.max_cards)
            .map(|idx| match objects.get(idx) {
                Some(obj) => SlotView {
                    visible: true,
                    card: Some(self.card(idx, obj)),
                },
                None => SlotView {
                    visible: false,
                    card: None,
                },
            })
            .collect();

        let has_items = !objects.is_empty();
        let any_batch = objects.iter().any(|o| o.batch_processing);
        let any_image_generating = objects.iter().any(|o| o.image_state.is_generating());
        let any_model_generating = objects.iter().any(|o| o.model_state.is_generating());
        let any_convertible = objects.iter().any(SceneObject::is_convertible);

        ViewState {
            slots,
            placeholder_visible: !has_items,
            convert_all: ControlView {
                visible: has_items,
                enabled: has_items && !any_batch && !any_image_generating && !any_model_generating && any_convertible,
            },
            start_over_enabled: has_items && !objects.iter().any(SceneObject::is_processing),
            overflow: objects.len().saturating_sub(self.max_cards),
        }
    }

    fn card(&self, index: usize, obj: &SceneObject) -> CardView {
        let image = match &obj.image_state {
            ImageState::Ready(path) => DisplayImage::Artifact(path.clone()),
            ImageState::Generating => DisplayImage::Generating(self.generating_placeholder.clone()),
            ImageState::PromptFiltered => DisplayImage::Filtered(self.filtered_placeholder.clone()),
            ImageState::Empty | ImageState::Failed(_) => DisplayImage::Empty,
        };
        let image_error = match &obj.image_state {
            ImageState::Failed(message) => Some(message.clone()),
            _ => None,
        };

        let unlocked = !obj.is_processing();
        let three_d = ThreeDButton::for_object(obj);

        CardView {
            index,
            id: obj.id,
            title: obj.title.clone(),
            image,
            image_error,
            refresh_enabled: unlocked,
            edit_enabled: unlocked,
            delete_enabled: unlocked,
            three_d,
            three_d_button: three_d.into(),
        }
    }
}

impl Default for StatusProjector {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CARDS, "static/images/generating.svg", "static/images/content_filtered.svg")
    }
}
