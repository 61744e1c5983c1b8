// Bridges a JavaScript face detector and renderer to the overlay pipeline.
//
// The detector reports through `submit_*` calls, the frame loop started by
// `start` processes each result, and the renderer pulls mesh buffers and
// shading uniforms back out after every frame.

mod util;

use anyhow::Error;
use rouge_core::config::{MeshKind, PipelineConfig};
use rouge_core::landmarks::Landmark;
use rouge_core::mesh::OverlayMesh;
use rouge_core::pipeline::{FrameStats, MeshStats, Session};
use rouge_core::pipeline::driver::run_slot;
use rouge_core::pipeline::slot::{DetectionReceiver, DetectionSender, detection_slot};
use rouge_core::shading::Slider;
use rouge_core::shading::color::PALETTE;
use serde::Serialize;
use std::cell::{RefCell, RefMut};
use std::ops::ControlFlow;
use std::rc::Rc;
use tracing::{debug, error, info};
use wasm_bindgen::prelude::*;

#[wasm_bindgen(start)]
fn main() -> Result<(), JsValue> {
    util::set_panic_hook();
    tracing_wasm::set_as_global_default();
    info!("Loaded!");
    Ok(())
}

#[derive(Serialize)]
struct StatsView<'a> {
    frames: &'a FrameStats,
    meshes: Vec<MeshStats>,
}

#[wasm_bindgen]
pub struct Studio {
    session: Rc<RefCell<Session>>,
    sender: Option<DetectionSender>,
    receiver: Option<DetectionReceiver>,
}

#[wasm_bindgen]
impl Studio {
    fn new_anyhow(config_json: Option<String>) -> anyhow::Result<Self> {
        let config = match config_json {
            Some(json) => PipelineConfig::from_json(&json)?,
            None => PipelineConfig::default(),
        };
        let session = Session::new(config)?;
        let (sender, receiver) = detection_slot();

        Ok(Self {
            session: Rc::new(RefCell::new(session)),
            sender: Some(sender),
            receiver: Some(receiver),
        })
    }

    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> Result<Self, JsValue> {
        wrap_err(Self::new_anyhow(config_json))
    }

    /// Starts the frame loop. `on_frame` is called with each frame report
    /// as JSON, after the meshes are updated. Returning `false` from it
    /// stops the loop.
    pub fn start(&mut self, on_frame: Option<js_sys::Function>) -> Result<(), JsValue> {
        let mut receiver = self
            .receiver
            .take()
            .ok_or_else(|| JsValue::from_str("frame loop already started"))?;
        let session = self.session.clone();

        wasm_bindgen_futures::spawn_local(async move {
            let processed = run_slot(&session, &mut receiver, |_, report| {
                let Some(callback) = &on_frame else {
                    return ControlFlow::Continue(());
                };
                let json = match serde_json::to_string(report) {
                    Ok(json) => json,
                    Err(e) => {
                        error!("Failed to encode frame report: {e}");
                        return ControlFlow::Continue(());
                    }
                };
                match callback.call1(&JsValue::NULL, &JsValue::from_str(&json)) {
                    Ok(v) if v == JsValue::FALSE => ControlFlow::Break(()),
                    Ok(_) => ControlFlow::Continue(()),
                    Err(e) => {
                        error!("Frame callback threw: {e:?}");
                        ControlFlow::Continue(())
                    }
                }
            })
            .await;
            debug!("Frame loop finished after {processed} frames");
        });

        Ok(())
    }

    /// Hands one face's landmarks (x, y, z triples) to the frame loop. An
    /// empty array means no face. Returns false if the previous result has
    /// not been processed yet.
    pub fn submit_landmarks(&self, coords: &[f32]) -> bool {
        let landmarks = Landmark::from_flat(coords);
        self.offer(Ok((!landmarks.is_empty()).then_some(landmarks)))
    }

    pub fn submit_no_face(&self) -> bool {
        self.offer(Ok(None))
    }

    /// Reports a failed detector call. The loop logs it and moves on.
    pub fn submit_error(&self, message: &str) -> bool {
        self.offer(Err(Error::msg(message.to_string())))
    }

    /// Stops the frame loop once any pending result is processed.
    pub fn stop(&mut self) {
        self.sender.take();
    }

    pub fn set_color(&self, hex: &str) -> Result<(), JsValue> {
        wrap_err(
            self.session_mut()
                .and_then(|mut s| s.set_color(hex).map_err(Error::from)),
        )
    }

    pub fn set_slider(&self, name: &str, value: f32) -> Result<(), JsValue> {
        wrap_err(self.session_mut().and_then(|mut s| {
            s.set_slider(name.parse::<Slider>()?, value);
            Ok(())
        }))
    }

    pub fn set_debug(&self, debug: bool) -> Result<(), JsValue> {
        wrap_err(self.session_mut().map(|mut s| s.set_debug(debug)))
    }

    /// Forgets smoothed landmarks, for when the detector restarts.
    pub fn reset_tracking(&self) -> Result<(), JsValue> {
        wrap_err(self.session_mut().map(|mut s| s.reset_tracking()))
    }

    pub fn palette(&self) -> Result<String, JsValue> {
        wrap_err(serde_json::to_string(&PALETTE).map_err(Error::from))
    }

    pub fn debug(&self) -> bool {
        self.session.borrow().debug()
    }

    /// Frame counters and per-mesh sizes as JSON.
    pub fn stats_json(&self) -> Result<String, JsValue> {
        let session = self.session.borrow();
        let stats = StatsView {
            frames: session.stats(),
            meshes: session.mesh_stats(),
        };
        wrap_err(serde_json::to_string(&stats).map_err(Error::from))
    }

    /// Kinds of the currently visible meshes, in render order.
    pub fn visible_meshes(&self) -> Vec<String> {
        self.session
            .borrow()
            .visible_meshes()
            .map(|(spec, _)| spec.kind.to_string())
            .collect()
    }

    /// Increments whenever the mesh for `kind` is rebuilt. Renderers
    /// re-upload buffers when it changes.
    pub fn generation(&self, kind: &str) -> Result<f64, JsValue> {
        let kind = wrap_err(parse_kind(kind))?;
        Ok(self
            .session
            .borrow()
            .slot(kind)
            .map(|s| s.generation() as f64)
            .unwrap_or(0.))
    }

    pub fn positions(&self, kind: &str) -> Result<Option<Vec<f32>>, JsValue> {
        self.with_mesh(kind, |m| m.positions.concat())
    }

    pub fn uvs(&self, kind: &str) -> Result<Option<Vec<f32>>, JsValue> {
        self.with_mesh(kind, |m| m.uvs.concat())
    }

    pub fn masks(&self, kind: &str) -> Result<Option<Vec<f32>>, JsValue> {
        self.with_mesh(kind, |m| m.masks.clone())
    }

    pub fn normals(&self, kind: &str) -> Result<Option<Vec<f32>>, JsValue> {
        self.with_mesh(kind, |m| m.normals.concat())
    }

    pub fn indices(&self, kind: &str) -> Result<Option<Vec<u32>>, JsValue> {
        self.with_mesh(kind, |m| m.indices.clone())
    }

    /// Line list for wireframe rendering.
    pub fn edges(&self, kind: &str) -> Result<Option<Vec<u32>>, JsValue> {
        self.with_mesh(kind, |m| m.edge_indices())
    }

    /// Uniform block for the lip shader, as laid out in `lip.wgsl`.
    pub fn lip_uniforms(&self) -> Vec<f32> {
        let session = self.session.borrow();
        let u = session.shading().lip.uniforms(session.config().aspect());
        [u.primary, u.secondary, u.light_direction, u.params].concat()
    }

    /// Uniform block for the skin shader, as laid out in `skin.wgsl`.
    pub fn skin_uniforms(&self) -> Vec<f32> {
        let session = self.session.borrow();
        let config = session.config();
        let u = session
            .shading()
            .skin
            .uniforms(config.aspect(), [config.video_width, config.video_height]);
        [u.sliders, u.texel, u.tint].concat()
    }
}

impl Studio {
    fn offer(&self, result: anyhow::Result<Option<Vec<Landmark>>>) -> bool {
        self.sender.as_ref().is_some_and(|s| s.offer(result))
    }

    fn session_mut(&self) -> anyhow::Result<RefMut<'_, Session>> {
        self.session
            .try_borrow_mut()
            .map_err(|_| Error::msg("session is busy processing a frame"))
    }

    fn with_mesh<T>(
        &self,
        kind: &str,
        f: impl FnOnce(&OverlayMesh) -> T,
    ) -> Result<Option<T>, JsValue> {
        let kind = wrap_err(parse_kind(kind))?;
        Ok(self.session.borrow().mesh(kind).map(f))
    }
}

fn parse_kind(kind: &str) -> anyhow::Result<MeshKind> {
    Ok(kind.parse::<MeshKind>()?)
}

fn wrap_err<T>(r: anyhow::Result<T>) -> Result<T, JsValue> {
    match r {
        Ok(t) => Ok(t),
        Err(e) => Err(JsValue::from_str(&e.to_string())),
    }
}
