#![warn(unused_extern_crates)]
use anyhow::{Error, Result};
use clap::{Args, Parser};
use pollster::FutureExt;
use recording::{Recording, RecordingDetector};
use rouge_core::anchor::{AnchorSheet, Placement};
use rouge_core::config::{LipLayout, PipelineConfig, TriangulatorKind};
use rouge_core::mesh::OverlayMesh;
use rouge_core::pipeline::{DetectionStatus, FrameStats, MeshStats, Session, driver};
use serde::Serialize;
use std::collections::BTreeMap;
use std::ops::ControlFlow;
use std::path::PathBuf;
use tracing::{Level, debug, info, span, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

mod recording;
mod render;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct CmdArgs {
    /// Recorded landmark stream, one JSON object per frame
    #[arg(short, long, value_name = "FILE")]
    recording: PathBuf,

    /// JSON pipeline config. Flags below override its values
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: Overrides,

    /// Stop after this many frames
    #[arg(long)]
    max_frames: Option<u64>,

    /// Anchor sheet for the mustache overlay
    #[arg(short, long, value_name = "FILE")]
    anchors: Option<PathBuf>,

    /// Write the last frame's visible meshes as JSON
    #[arg(short, long, value_name = "FILE")]
    meshes: Option<PathBuf>,

    #[command(flatten)]
    snapshot: Snapshot,
}

#[derive(Args, Debug)]
struct Overrides {
    /// Lip color as #RRGGBB
    #[arg(long)]
    color: Option<String>,

    /// Lip meshing: hollow or split
    #[arg(long)]
    layout: Option<LipLayout>,

    /// Triangulation backend: ear_clip or earcut
    #[arg(long)]
    triangulator: Option<TriangulatorKind>,

    /// Landmark smoothing factor in (0, 1]
    #[arg(long)]
    alpha: Option<f32>,

    /// Soft mask falloff in UV units
    #[arg(long)]
    falloff: Option<f32>,

    /// Skip the skin overlay mesh
    #[arg(long)]
    no_skin: bool,

    /// Render wireframes and log per-mesh counters
    #[arg(short, long)]
    debug: bool,
}

#[derive(Args, Debug)]
struct Snapshot {
    /// Background image the last frame is rendered over
    #[arg(short, long, value_name = "FILE", requires = "output")]
    background: Option<PathBuf>,

    /// PNG to write the rendered frame to
    #[arg(short, long, value_name = "FILE", requires = "background")]
    output: Option<PathBuf>,
}

#[derive(Serialize)]
struct Summary {
    stats: FrameStats,
    meshes: Vec<MeshStats>,
    placement: Option<Placement>,
}

fn main() -> Result<()> {
    let filter = EnvFilter::from_default_env();
    tracing_subscriber::fmt()
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_env_filter(filter)
        .init();

    let args = CmdArgs::parse();

    let mut config = load_config(&args)?;
    let background = match &args.snapshot.background {
        Some(path) => {
            let img = image::open(path)?.to_rgba8();
            config.video_width = img.width();
            config.video_height = img.height();
            Some(img)
        }
        None => None,
    };
    config.validate()?;

    let sheet = match &args.anchors {
        Some(path) => Some(AnchorSheet::parse(&std::fs::read_to_string(path)?)?),
        None => None,
    };

    let recording = Recording::load(&args.recording)?;
    info!("Replaying {} recorded frames", recording.len());

    let mut session = Session::new(config)?;
    let mut detector = RecordingDetector;
    let mut placement = None;
    let max_frames = args.max_frames.unwrap_or(u64::MAX);

    let processed = driver::run(
        &mut session,
        recording.stream(),
        &mut detector,
        |session, report| {
            let span = span!(Level::DEBUG, "frame_report");
            let _guard = span.enter();

            debug!(
                "Frame {}: {:?}, {} meshes visible",
                report.frame,
                report.status,
                report.visible_count()
            );

            if session.debug() {
                for m in session.mesh_stats() {
                    info!(
                        "{}: visible {}, {} vertices, {} triangles",
                        m.kind, m.visible, m.vertices, m.triangles
                    );
                }
            }

            if let (Some(sheet), DetectionStatus::FaceFound) = (&sheet, report.status) {
                let config = session.config();
                placement = session.smoothed_landmarks().and_then(|lms| {
                    Placement::compute(sheet, lms, config.video_width, config.video_height)
                        .inspect_err(|e| warn!("No mustache placement: {e}"))
                        .ok()
                });
            }

            if report.frame >= max_frames {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        },
    )
    .block_on();
    info!("Processed {processed} frames");

    if let Some(path) = &args.meshes {
        let meshes: BTreeMap<String, &OverlayMesh> = session
            .visible_meshes()
            .map(|(spec, mesh)| (spec.kind.to_string(), mesh))
            .collect();
        std::fs::write(path, serde_json::to_string(&meshes)?)?;
        info!("Wrote {} meshes to {}", meshes.len(), path.display());
    }

    if let (Some(img), Some(dest)) = (background, &args.snapshot.output) {
        render::snapshot(&session, &img)?.save(dest)?;
        info!("Wrote snapshot to {}", dest.display());
    }

    let summary = Summary {
        meshes: session.mesh_stats(),
        placement,
        stats: session.close(),
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}

fn load_config(args: &CmdArgs) -> Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_json(&std::fs::read_to_string(path)?)?,
        None => PipelineConfig::default(),
    };

    let o = &args.overrides;
    if let Some(color) = &o.color {
        config.lip_color = color.clone();
    }
    if let Some(layout) = o.layout {
        config.lip_layout = layout;
    }
    if let Some(triangulator) = o.triangulator {
        config.triangulator = triangulator;
    }
    if let Some(alpha) = o.alpha {
        config.smoothing_alpha = alpha;
    }
    if let Some(falloff) = o.falloff {
        config.mask_falloff = falloff;
    }
    if o.no_skin {
        config.skin_overlay = false;
    }
    if o.debug {
        config.debug = true;
    }

    config
        .validate()
        .map_err(|e| Error::msg(format!("Invalid configuration: {e}")))?;
    Ok(config)
}
