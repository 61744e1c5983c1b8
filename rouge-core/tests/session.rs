use rouge_core::config::{LipLayout, MeshKind, PipelineConfig, TriangulatorKind};
use rouge_core::landmarks::{FACE_MESH_POINTS, Landmark};
use rouge_core::mesh::OverlayMesh;
use rouge_core::pipeline::{DetectionStatus, Session};
use rouge_core::regions::Region;
use std::f32::consts::{PI, TAU};

const MOUTH: (f32, f32) = (0.5, 0.7);

const OUTER_UPPER: [usize; 11] = [61, 185, 40, 39, 37, 0, 267, 269, 270, 409, 291];
const OUTER_LOWER: [usize; 11] = [61, 146, 91, 181, 84, 17, 314, 405, 321, 375, 291];
const INNER_UPPER: [usize; 11] = [78, 191, 80, 81, 82, 13, 312, 311, 310, 415, 308];
const INNER_LOWER: [usize; 11] = [78, 95, 88, 178, 87, 14, 317, 402, 318, 324, 308];

/// Places `idxs` left to right along half of an ellipse around the mouth.
fn arc(lms: &mut [Landmark], idxs: &[usize], rx: f32, ry: f32, upper: bool, shift: f32) {
    let sign = if upper { -1. } else { 1. };
    for (k, i) in idxs.iter().enumerate() {
        let t = PI * (1. - k as f32 / (idxs.len() - 1) as f32);
        lms[*i] = Landmark::new(
            MOUTH.0 + shift + rx * t.cos(),
            MOUTH.1 + sign * ry * t.sin(),
            0.,
        );
    }
}

fn synthetic_face(shift: f32) -> Vec<Landmark> {
    let mut lms = vec![Landmark::new(0.5 + shift, 0.5, 0.); FACE_MESH_POINTS];

    let oval = Region::FaceOval.indices();
    for (n, i) in oval.iter().enumerate() {
        let t = n as f32 / oval.len() as f32 * TAU;
        lms[*i] = Landmark::new(0.5 + shift + 0.3 * t.sin(), 0.5 - 0.4 * t.cos(), 0.);
    }

    arc(&mut lms, &OUTER_UPPER, 0.08, 0.04, true, shift);
    arc(&mut lms, &OUTER_LOWER, 0.08, 0.04, false, shift);
    arc(&mut lms, &INNER_UPPER, 0.05, 0.015, true, shift);
    arc(&mut lms, &INNER_LOWER, 0.05, 0.015, false, shift);
    lms
}

fn assert_well_formed(mesh: &OverlayMesh) {
    assert!(mesh.is_consistent());
    assert!(mesh.triangle_count() > 0);
    assert!(mesh.indices.iter().all(|i| (*i as usize) < mesh.vertex_count()));

    for uv in &mesh.uvs {
        assert!((0. ..=1.).contains(&uv[0]) && (0. ..=1.).contains(&uv[1]));
    }
    for m in &mesh.masks {
        assert!((0. ..=1.).contains(m));
    }
    for n in &mesh.normals {
        let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
        assert!((len - 1.).abs() < 1e-4);
    }

    // counter-clockwise in render space
    for t in mesh.indices.chunks_exact(3) {
        let [a, b, c] = [t[0], t[1], t[2]].map(|i| mesh.positions[i as usize].map(f64::from));
        let cross = (b[0] - a[0]) * (c[1] - a[1]) - (b[1] - a[1]) * (c[0] - a[0]);
        assert!(cross > 0.);
    }
}

#[test]
fn test_hollow_lips_and_skin() {
    let mut session = Session::new(PipelineConfig::default()).unwrap();
    let report = session.process(Some(&synthetic_face(0.)));

    assert_eq!(report.status, DetectionStatus::FaceFound);
    assert!(report.meshes.iter().all(|m| m.visible && m.error.is_none()));

    let lips = session.mesh(MeshKind::Lips).unwrap();
    assert_eq!(
        lips.vertex_count(),
        Region::LipOuter.indices().len() + Region::LipInner.indices().len()
    );
    assert_well_formed(lips);

    // hole vertices sit on the mask boundary
    let hole_start = Region::LipOuter.indices().len();
    for m in &lips.masks[hole_start..] {
        assert!(*m > 0.999);
    }

    let skin = session.mesh(MeshKind::Skin).unwrap();
    assert_well_formed(skin);
    assert!(skin.masks.iter().all(|m| *m == 1.));

    let order: Vec<MeshKind> = session.visible_meshes().map(|(spec, _)| spec.kind).collect();
    assert_eq!(order, [MeshKind::Skin, MeshKind::Lips]);
}

#[test]
fn test_nearly_closed_mouth_keeps_lips_visible() {
    let mut face = synthetic_face(0.);
    arc(&mut face, &INNER_UPPER, 0.05, 0.003, true, 0.);
    arc(&mut face, &INNER_LOWER, 0.05, 0.003, false, 0.);
    // jitter pushes the middle of the upper inner lip below the lower one
    face[13].y = MOUTH.1 + 0.004;
    face[14].y = MOUTH.1 - 0.004;

    let mut session = Session::new(PipelineConfig::default()).unwrap();
    let report = session.process(Some(&face));
    assert!(report.meshes.iter().all(|m| m.visible && m.error.is_none()));

    // the folded mouth opening is filled rather than cut out
    let lips = session.mesh(MeshKind::Lips).unwrap();
    assert_eq!(lips.vertex_count(), Region::LipOuter.indices().len());
    assert_well_formed(lips);
}

#[test]
fn test_earcut_backend_matches_vertex_layout() {
    let config = PipelineConfig {
        triangulator: TriangulatorKind::Earcut,
        ..Default::default()
    };
    let mut session = Session::new(config).unwrap();
    session.process(Some(&synthetic_face(0.)));

    let lips = session.mesh(MeshKind::Lips).unwrap();
    assert_eq!(lips.vertex_count(), 36);
    assert_well_formed(lips);
}

#[test]
fn test_no_face_frames_keep_tracking_state() {
    let mut session = Session::new(PipelineConfig::default()).unwrap();
    let face = synthetic_face(0.);
    session.process(Some(&face));
    let before = session.smoothed_landmarks().unwrap().to_vec();
    let generation = session.slot(MeshKind::Lips).unwrap().generation();

    for _ in 0..5 {
        let report = session.process(None);
        assert_eq!(report.status, DetectionStatus::NoFace);
        assert_eq!(report.visible_count(), 0);
    }

    assert_eq!(session.visible_meshes().count(), 0);
    assert_eq!(session.smoothed_landmarks().unwrap(), &before[..]);
    assert_eq!(session.slot(MeshKind::Lips).unwrap().generation(), generation);

    // tracking resumes from the held state
    let moved = synthetic_face(0.1);
    session.process(Some(&moved));
    let smoothed = session.smoothed_landmarks().unwrap();
    let expected = 0.4 * moved[0].x + 0.6 * face[0].x;
    assert!((smoothed[0].x - expected).abs() < 1e-5);
    assert!(session.mesh(MeshKind::Lips).is_some());
    assert!(session.slot(MeshKind::Lips).unwrap().generation() > generation);

    let stats = session.close();
    assert_eq!(stats.frames, 7);
    assert_eq!(stats.frames_with_face, 2);
}

#[test]
fn test_split_layout() {
    let config = PipelineConfig {
        lip_layout: LipLayout::Split,
        ..Default::default()
    };
    let mut session = Session::new(config).unwrap();
    let report = session.process(Some(&synthetic_face(0.)));
    assert_eq!(report.visible_count(), 3);

    for kind in [MeshKind::UpperLip, MeshKind::LowerLip] {
        let mesh = session.mesh(kind).unwrap();
        assert_eq!(mesh.vertex_count(), 22);
        assert_eq!(mesh.triangle_count(), 20);
        assert_well_formed(mesh);
    }
}

#[test]
fn test_color_change_applies_to_next_frame() {
    let mut session = Session::new(PipelineConfig::default()).unwrap();
    session.set_color("#6E3A57").unwrap();
    assert_eq!(session.shading().lip.primary.to_hex(), "#6E3A57");
    assert!(session.set_color("plum").is_err());
    assert_eq!(session.shading().lip.primary.to_hex(), "#6E3A57");
}

#[test]
fn test_config_from_json() {
    let config = PipelineConfig::from_json(
        r#"{"smoothing_alpha": 0.5, "lip_layout": "split", "skin_overlay": false}"#,
    )
    .unwrap();
    let session = Session::new(config).unwrap();
    let kinds: Vec<MeshKind> = session.slots().iter().map(|s| s.kind()).collect();
    assert_eq!(kinds, [MeshKind::UpperLip, MeshKind::LowerLip]);
}
