pub mod anchor;
pub mod config;
pub mod contour;
pub mod error;
pub mod imggpu;
pub mod landmarks;
pub mod mask;
pub mod mesh;
pub mod pipeline;
pub mod regions;
pub mod shading;
pub mod shapes;
pub mod triangulate;

pub use config::{LipLayout, MeshKind, PipelineConfig, TriangulatorKind};
pub use error::GeometryError;
pub use landmarks::{Landmark, LandmarkSmoother};
pub use mesh::OverlayMesh;
pub use pipeline::{DetectionStatus, FrameReport, Session};
