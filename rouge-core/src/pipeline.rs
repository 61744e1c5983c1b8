use crate::config::{MeshKind, MeshSpec, PipelineConfig};
use crate::contour::{boundary_uvs, extract_points};
use crate::error::Result;
use crate::landmarks::{Landmark, LandmarkSmoother};
use crate::mask::compute_mask;
use crate::mesh::{OverlayMesh, assemble};
use crate::shading::{ShadingState, SkinShading, Slider};
use crate::shapes::polygon::Polygon;
use crate::triangulate::{self, Triangulate};
use serde::Serialize;
use std::fmt::Display;
use tracing::{Level, debug, error, info, span, trace};
use web_time::Instant;

pub mod driver;
pub mod slot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionStatus {
    #[default]
    Waiting,
    NoFace,
    FaceFound,
    DetectorError,
}

/// The live mesh for one overlay region. Hiding keeps the last mesh around;
/// only a successful rebuild replaces it.
#[derive(Debug, Clone)]
pub struct MeshSlot {
    spec: MeshSpec,
    mesh: Option<OverlayMesh>,
    visible: bool,
    generation: u64,
}

impl MeshSlot {
    fn new(spec: MeshSpec) -> Self {
        Self {
            spec,
            mesh: None,
            visible: false,
            generation: 0,
        }
    }

    fn replace(&mut self, mesh: OverlayMesh) {
        self.mesh = Some(mesh);
        self.visible = true;
        self.generation += 1;
    }

    fn hide(&mut self) {
        self.visible = false;
    }

    pub fn spec(&self) -> &MeshSpec {
        &self.spec
    }

    pub fn kind(&self) -> MeshKind {
        self.spec.kind
    }

    pub fn mesh(&self) -> Option<&OverlayMesh> {
        self.mesh.as_ref()
    }

    pub fn is_visible(&self) -> bool {
        self.visible && self.mesh.is_some()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeshStats {
    pub kind: MeshKind,
    pub visible: bool,
    pub vertices: usize,
    pub triangles: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeshOutcome {
    pub kind: MeshKind,
    pub visible: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameReport {
    pub frame: u64,
    pub status: DetectionStatus,
    pub meshes: Vec<MeshOutcome>,
}

impl FrameReport {
    pub fn visible_count(&self) -> usize {
        self.meshes.iter().filter(|m| m.visible).count()
    }
}

/// Running counters for the debug overlay.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FrameStats {
    pub frames: u64,
    pub frames_with_face: u64,
    pub detector_errors: u64,
    pub last_status: DetectionStatus,
    pub last_frame_ms: Option<f32>,
}

/// All per-session state: smoothing, shading and the live meshes. Frames
/// and user input are applied through `&mut self`, one at a time.
pub struct Session {
    config: PipelineConfig,
    smoother: LandmarkSmoother,
    shading: ShadingState,
    triangulator: Box<dyn Triangulate>,
    slots: Vec<MeshSlot>,
    stats: FrameStats,
    debug: bool,
}

impl Session {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;

        let mut shading = ShadingState {
            skin: SkinShading::new(
                config.skin_smoothing,
                config.skin_brightening,
                config.skin_pinking,
            ),
            ..Default::default()
        };
        shading.set_color(&config.lip_color)?;

        let triangulator = triangulate::for_kind(config.triangulator);
        let slots = config.mesh_specs().into_iter().map(MeshSlot::new).collect();

        info!(
            "Session started: {:?} lips, skin overlay {}, {} triangulation, alpha {}",
            config.lip_layout,
            config.skin_overlay,
            triangulator.name(),
            config.smoothing_alpha
        );

        Ok(Self {
            smoother: LandmarkSmoother::new(config.smoothing_alpha),
            debug: config.debug,
            config,
            shading,
            triangulator,
            slots,
            stats: FrameStats::default(),
        })
    }

    /// Runs one detector result through the pipeline. `None` (or an empty
    /// set) means no face: every mesh is hidden and the smoothed landmarks
    /// are left untouched.
    pub fn process(&mut self, detection: Option<&[Landmark]>) -> FrameReport {
        let span = span!(Level::DEBUG, "session:process");
        let _guard = span.enter();
        let start = Instant::now();

        self.stats.frames += 1;

        let report = match detection {
            Some(raw) if !raw.is_empty() => {
                self.stats.frames_with_face += 1;
                let aspect = self.config.aspect();
                let falloff = self.config.mask_falloff;
                let landmarks = self.smoother.smooth(raw);

                let meshes = self
                    .slots
                    .iter_mut()
                    .map(|slot| {
                        match build_mesh(slot.spec(), landmarks, aspect, falloff, &*self.triangulator)
                        {
                            Ok(mesh) => {
                                slot.replace(mesh);
                                MeshOutcome {
                                    kind: slot.kind(),
                                    visible: true,
                                    error: None,
                                }
                            }
                            Err(e) => {
                                debug!("Hiding {} this frame: {e}", slot.kind());
                                slot.hide();
                                MeshOutcome {
                                    kind: slot.kind(),
                                    visible: false,
                                    error: Some(e.to_string()),
                                }
                            }
                        }
                    })
                    .collect();

                FrameReport {
                    frame: self.stats.frames,
                    status: DetectionStatus::FaceFound,
                    meshes,
                }
            }
            _ => {
                trace!("No face in frame {}", self.stats.frames);
                self.hide_all(DetectionStatus::NoFace)
            }
        };

        self.stats.last_status = report.status;
        self.stats.last_frame_ms = Some(start.elapsed().as_secs_f32() * 1000.);
        report
    }

    /// Records a failed detector call. Meshes keep their current state; the
    /// next frame is the retry.
    pub fn record_detector_error(&mut self, err: &dyn Display) -> FrameReport {
        error!("Face detection failed: {err}");
        self.stats.frames += 1;
        self.stats.detector_errors += 1;
        self.stats.last_status = DetectionStatus::DetectorError;

        FrameReport {
            frame: self.stats.frames,
            status: DetectionStatus::DetectorError,
            meshes: self
                .slots
                .iter()
                .map(|s| MeshOutcome {
                    kind: s.kind(),
                    visible: s.is_visible(),
                    error: None,
                })
                .collect(),
        }
    }

    fn hide_all(&mut self, status: DetectionStatus) -> FrameReport {
        let meshes = self
            .slots
            .iter_mut()
            .map(|slot| {
                slot.hide();
                MeshOutcome {
                    kind: slot.kind(),
                    visible: false,
                    error: None,
                }
            })
            .collect();

        FrameReport {
            frame: self.stats.frames,
            status,
            meshes,
        }
    }

    pub fn reset_tracking(&mut self) {
        debug!("Resetting landmark tracking");
        self.smoother.reset();
    }

    pub fn set_color(&mut self, hex: &str) -> Result<()> {
        self.shading.set_color(hex)
    }

    pub fn set_slider(&mut self, slider: Slider, v: f32) {
        self.shading.set_slider(slider, v);
    }

    pub fn set_debug(&mut self, debug: bool) {
        self.debug = debug;
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn shading(&self) -> &ShadingState {
        &self.shading
    }

    pub fn smoothed_landmarks(&self) -> Option<&[Landmark]> {
        self.smoother.current()
    }

    pub fn slots(&self) -> &[MeshSlot] {
        &self.slots
    }

    pub fn slot(&self, kind: MeshKind) -> Option<&MeshSlot> {
        self.slots.iter().find(|s| s.kind() == kind)
    }

    pub fn mesh(&self, kind: MeshKind) -> Option<&OverlayMesh> {
        self.slot(kind).filter(|s| s.is_visible()).and_then(|s| s.mesh())
    }

    pub fn visible_meshes(&self) -> impl Iterator<Item = (&MeshSpec, &OverlayMesh)> {
        self.slots
            .iter()
            .filter(|s| s.is_visible())
            .filter_map(|s| s.mesh().map(|m| (s.spec(), m)))
    }

    pub fn stats(&self) -> &FrameStats {
        &self.stats
    }

    pub fn mesh_stats(&self) -> Vec<MeshStats> {
        self.slots
            .iter()
            .map(|s| MeshStats {
                kind: s.kind(),
                visible: s.is_visible(),
                vertices: s.mesh().map(|m| m.vertex_count()).unwrap_or(0),
                triangles: s.mesh().map(|m| m.triangle_count()).unwrap_or(0),
            })
            .collect()
    }

    /// Ends the session, releasing every mesh.
    pub fn close(self) -> FrameStats {
        info!(
            "Session closed after {} frames ({} with a face, {} detector errors)",
            self.stats.frames, self.stats.frames_with_face, self.stats.detector_errors
        );
        self.stats
    }
}

pub fn build_mesh(
    spec: &MeshSpec,
    landmarks: &[Landmark],
    aspect: f32,
    falloff: f32,
    triangulator: &dyn Triangulate,
) -> Result<OverlayMesh> {
    let outer = extract_points(spec.outer, landmarks, aspect)?;
    let hole = spec
        .hole
        .map(|region| extract_points(region, landmarks, aspect))
        .transpose()?;

    let polygon = Polygon::build(outer, hole)?;
    let mut mesh = assemble(&polygon, aspect, triangulator)?;

    if let Some(region) = spec.mask_boundary {
        let boundary = boundary_uvs(region, landmarks, aspect)?;
        mesh.masks = compute_mask(&mesh, &boundary, falloff);
    }

    Ok(mesh)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LipLayout;

    fn flat_face() -> Vec<Landmark> {
        // a 468 point face where every lip index sits on a circle
        let mut lms = vec![Landmark::new(0.5, 0.5, 0.); 468];
        let place = |lms: &mut Vec<Landmark>, idxs: &[usize], r: f32| {
            for (n, i) in idxs.iter().enumerate() {
                let t = n as f32 / idxs.len() as f32 * std::f32::consts::TAU;
                lms[*i] = Landmark::new(0.5 + r * t.cos(), 0.5 + r * t.sin(), 0.);
            }
        };
        place(&mut lms, crate::regions::Region::FaceOval.indices(), 0.3);
        place(&mut lms, crate::regions::Region::LipOuter.indices(), 0.1);
        place(&mut lms, crate::regions::Region::LipInner.indices(), 0.05);
        lms
    }

    #[test]
    fn test_face_then_no_face() {
        let mut session = Session::new(PipelineConfig::default()).unwrap();
        let face = flat_face();

        let report = session.process(Some(&face));
        assert_eq!(report.status, DetectionStatus::FaceFound);
        assert_eq!(report.visible_count(), 2);
        assert!(session.mesh(MeshKind::Lips).is_some());
        assert!(session.mesh(MeshKind::Skin).is_some());

        let generation = session.slot(MeshKind::Lips).unwrap().generation();
        let report = session.process(None);
        assert_eq!(report.status, DetectionStatus::NoFace);
        assert_eq!(report.visible_count(), 0);
        assert!(session.mesh(MeshKind::Lips).is_none());
        // hidden, not destroyed
        let slot = session.slot(MeshKind::Lips).unwrap();
        assert!(slot.mesh().is_some());
        assert_eq!(slot.generation(), generation);
    }

    #[test]
    fn test_insufficient_points_hides_only_that_mesh() {
        let mut session = Session::new(PipelineConfig::default()).unwrap();
        // too short for the face oval and the lips beyond index 17
        let lms = vec![Landmark::new(0.5, 0.5, 0.); 18];
        let report = session.process(Some(&lms));
        assert_eq!(report.status, DetectionStatus::FaceFound);
        assert_eq!(report.visible_count(), 0);
        assert!(report.meshes.iter().all(|m| m.error.is_some()));
    }

    #[test]
    fn test_detector_error_counts() {
        let mut session = Session::new(PipelineConfig::default()).unwrap();
        let report = session.record_detector_error(&"model not loaded");
        assert_eq!(report.status, DetectionStatus::DetectorError);
        assert_eq!(session.stats().detector_errors, 1);
        assert_eq!(session.stats().frames, 1);
    }

    #[test]
    fn test_split_layout_meshes() {
        let config = PipelineConfig {
            lip_layout: LipLayout::Split,
            skin_overlay: false,
            ..Default::default()
        };
        let mut session = Session::new(config).unwrap();
        let kinds: Vec<MeshKind> = session.slots().iter().map(|s| s.kind()).collect();
        assert_eq!(kinds, [MeshKind::UpperLip, MeshKind::LowerLip]);

        session.process(None);
        assert_eq!(session.visible_meshes().count(), 0);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = PipelineConfig {
            lip_color: "#nothex".to_string(),
            ..Default::default()
        };
        assert!(Session::new(config).is_err());
    }

    #[test]
    fn test_reset_tracking() {
        let mut session = Session::new(PipelineConfig::default()).unwrap();
        session.process(Some(&flat_face()));
        assert!(session.smoothed_landmarks().is_some());
        session.reset_tracking();
        assert!(session.smoothed_landmarks().is_none());
    }
}
