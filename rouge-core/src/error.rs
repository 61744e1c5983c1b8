//! Error types for the overlay geometry pipeline.

use thiserror::Error;

/// Failures that can occur while turning landmarks into an overlay mesh.
///
/// Every variant is local to a single frame or a single input; none of them
/// leave the pipeline in a broken state.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("insufficient points for {region}: found {found}, need at least 3")]
    InsufficientPoints { region: String, found: usize },

    #[error("degenerate {region} ring: signed area is zero")]
    DegenerateRing { region: String },

    #[error("triangulation failed: {0}")]
    Triangulation(String),

    #[error("invalid color: {0}")]
    InvalidColor(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("anchor sheet error: {0}")]
    AnchorSheet(String),
}

pub type Result<T> = std::result::Result<T, GeometryError>;
