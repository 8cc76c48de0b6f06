//! Viewer error type

use thiserror::Error;

use crate::manager::ViewerState;

#[derive(Error, Debug)]
pub enum ViewerError {
    /// The mount had no area when the viewer was constructed
    #[error("Mount has a degenerate size {width}x{height}")]
    DegenerateMount { width: u32, height: u32 },

    #[error("Cannot {operation} while the viewer is {state:?}")]
    InvalidState {
        operation: &'static str,
        state: ViewerState,
    },

    /// The host panel's mount lifetime has ended
    #[error("Host panel is unmounted")]
    Unmounted,

    #[error("Frame catalog needs at least one location")]
    EmptyCatalog,

    #[error("Invalid options: {0}")]
    Options(String),

    #[error(transparent)]
    Core(#[from] pcdscope_core::Error),
}

pub type Result<T> = std::result::Result<T, ViewerError>;
