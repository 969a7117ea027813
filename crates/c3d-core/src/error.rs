use thiserror::Error;

use crate::scene_object::ObjectId;

/// Reasons a gallery action is turned away, plus the few genuine failures
/// the core can surface (planner errors, export I/O).
#[derive(Error, Debug)]
pub enum Error {
    #[error("object index {0} is out of range")]
    IndexOutOfRange(usize),

    #[error("object {0} no longer exists")]
    UnknownObject(ObjectId),

    #[error("'{title}' is busy: {reason}")]
    Busy {
        title: String,
        reason: &'static str,
    },

    #[error("'{title}' is not eligible for 3D conversion")]
    NotConvertible { title: String },

    #[error("{0}")]
    BlankInput(&'static str),

    #[error("the gallery is empty")]
    EmptyGallery,

    #[error("a batch conversion is already running")]
    BatchActive,

    #[error("scene planner failed: {0}")]
    Planner(String),

    #[error("service error: {0}")]
    Service(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Rejections are user-facing hints, never faults.
    pub fn is_rejection(&self) -> bool {
        !matches!(self, Self::Planner(_) | Self::Service(_) | Self::Io(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
