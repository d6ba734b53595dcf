use thiserror::Error;

/// Errors reported by the plot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlotError {
    #[error("The instance was already destroyed")]
    AlreadyDestroyed,
    #[error("Points have not been drawn")]
    PointsNotDrawn,
    #[error("unknown selection type {0:?}")]
    UnknownSelectionType(String),
    #[error("invalid color {0:?}")]
    InvalidColor(String),
}

pub type Result<T, E = PlotError> = std::result::Result<T, E>;
