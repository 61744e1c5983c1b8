use crate::error::{GeometryError, Result};
use crate::mask::smoothstep;
use color::{Color, PALETTE};
use serde::Serialize;
use std::str::FromStr;
use tracing::debug;

pub mod color;

const LIP_INTENSITY: f32 = 0.85;
const LIP_LIGHT_INTENSITY: f32 = 0.35;
const LIGHT_DIRECTION: [f32; 3] = [0., 0.5, 1.];
// Secondary tone: same hue, less saturated and darker.
const SECONDARY_OFFSET: (f32, f32, f32) = (0., -0.08, -0.06);

pub const SKIN_BLUR_RADIUS: f32 = 3.;
const PINK_TINT: [f32; 3] = [1., 0.9, 0.9];

/// Two-tone lip color plus the lighting model parameters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LipShading {
    pub primary: Color,
    pub secondary: Color,
    pub intensity: f32,
    pub light_intensity: f32,
    pub light_direction: [f32; 3],
}

impl LipShading {
    pub fn new(primary: Color) -> Self {
        Self {
            primary,
            secondary: secondary_tone(&primary),
            intensity: LIP_INTENSITY,
            light_intensity: LIP_LIGHT_INTENSITY,
            light_direction: LIGHT_DIRECTION,
        }
    }

    pub fn set_color(&mut self, primary: Color) {
        self.primary = primary;
        self.secondary = secondary_tone(&primary);
    }

    /// Darker video biases toward the secondary tone.
    pub fn tone_for_luminance(&self, lum: f32) -> Color {
        self.primary.mix(&self.secondary, smoothstep(0.2, 0.6, 1. - lum))
    }

    pub fn vertex_lighting(&self, normal: [f32; 3]) -> f32 {
        let l = normalize(self.light_direction);
        let n_dot_l = (normal[0] * l[0] + normal[1] * l[1] + normal[2] * l[2]).max(0.);
        0.6 + 0.4 * n_dot_l
    }

    /// Shaded color of one video pixel under the lip overlay, before mask
    /// alpha is applied. Mirrors `lip.wgsl`.
    pub fn shade(&self, orig: Color, normal: [f32; 3]) -> Color {
        let tone = self.tone_for_luminance(orig.luminance());
        let blended = Color::new(
            overlay(orig.r, tone.r),
            overlay(orig.g, tone.g),
            overlay(orig.b, tone.b),
        );
        let color = orig.mix(&blended, self.intensity);
        let light = 1. + (self.vertex_lighting(normal) - 1.) * self.light_intensity;
        color.scale(light).clamped()
    }

    pub fn uniforms(&self, aspect: f32) -> LipUniforms {
        let [r, g, b] = self.primary.to_array();
        let [r2, g2, b2] = self.secondary.to_array();
        let [lx, ly, lz] = normalize(self.light_direction);
        LipUniforms {
            primary: [r, g, b, self.intensity],
            secondary: [r2, g2, b2, self.light_intensity],
            light_direction: [lx, ly, lz, 0.],
            params: [aspect, 0., 0., 0.],
        }
    }
}

impl Default for LipShading {
    fn default() -> Self {
        // palette entries are valid hex
        Self::new(Color::from_hex(PALETTE[0].hex).unwrap_or(Color::new(0.878, 0.176, 0.251)))
    }
}

/// Skin beautify sliders, each in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct SkinShading {
    smoothing: f32,
    brightening: f32,
    pinking: f32,
}

impl SkinShading {
    pub fn new(smoothing: f32, brightening: f32, pinking: f32) -> Self {
        Self {
            smoothing: smoothing.clamp(0., 1.),
            brightening: brightening.clamp(0., 1.),
            pinking: pinking.clamp(0., 1.),
        }
    }

    pub fn smoothing(&self) -> f32 {
        self.smoothing
    }

    pub fn brightening(&self) -> f32 {
        self.brightening
    }

    pub fn pinking(&self) -> f32 {
        self.pinking
    }

    pub fn set(&mut self, slider: Slider, v: f32) {
        let v = v.clamp(0., 1.);
        match slider {
            Slider::Smoothing => self.smoothing = v,
            Slider::Brightening => self.brightening = v,
            Slider::Pinking => self.pinking = v,
        }
    }

    /// Beautified pixel given the original and its box blurred value.
    /// Mirrors `skin.wgsl`.
    pub fn beautify(&self, orig: Color, blurred: Color) -> Color {
        let smoothed = orig.mix(&blurred, self.smoothing);
        let bright = Color::new(
            smoothed.r + self.brightening,
            smoothed.g + self.brightening,
            smoothed.b + self.brightening,
        );
        let tinted = Color::new(
            bright.r * PINK_TINT[0],
            bright.g * PINK_TINT[1],
            bright.b * PINK_TINT[2],
        );
        bright.mix(&tinted, self.pinking).clamped()
    }

    pub fn uniforms(&self, aspect: f32, resolution: [u32; 2]) -> SkinUniforms {
        SkinUniforms {
            sliders: [self.smoothing, self.brightening, self.pinking, aspect],
            texel: [
                1. / resolution[0].max(1) as f32,
                1. / resolution[1].max(1) as f32,
                SKIN_BLUR_RADIUS,
                0.,
            ],
            tint: [PINK_TINT[0], PINK_TINT[1], PINK_TINT[2], 0.],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Slider {
    Smoothing,
    Brightening,
    Pinking,
}

impl FromStr for Slider {
    type Err = GeometryError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "smoothing" => Ok(Self::Smoothing),
            "brightening" => Ok(Self::Brightening),
            "pinking" => Ok(Self::Pinking),
            _ => Err(GeometryError::InvalidConfig(format!("unknown slider {s}"))),
        }
    }
}

/// User controlled shading parameters. Written by UI input, read by the
/// renderer every frame.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ShadingState {
    pub lip: LipShading,
    pub skin: SkinShading,
}

impl ShadingState {
    /// Sets the lip color from a hex string. An invalid string leaves the
    /// current color untouched.
    pub fn set_color(&mut self, hex: &str) -> Result<()> {
        let color = Color::from_hex(hex)?;
        debug!("Lip color set to {}", color.to_hex());
        self.lip.set_color(color);
        Ok(())
    }

    pub fn set_slider(&mut self, slider: Slider, v: f32) {
        self.skin.set(slider, v);
    }
}

/// Uniform block for `lip.wgsl`.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable, PartialEq)]
pub struct LipUniforms {
    /// rgb, blend intensity
    pub primary: [f32; 4],
    /// rgb, lighting intensity
    pub secondary: [f32; 4],
    pub light_direction: [f32; 4],
    /// x: aspect
    pub params: [f32; 4],
}

/// Uniform block for `skin.wgsl`.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable, PartialEq)]
pub struct SkinUniforms {
    /// smoothing, brightening, pinking, aspect
    pub sliders: [f32; 4],
    /// texel width, texel height, blur radius
    pub texel: [f32; 4],
    pub tint: [f32; 4],
}

fn overlay(base: f32, blend: f32) -> f32 {
    if base < 0.5 {
        2. * base * blend
    } else {
        1. - 2. * (1. - base) * (1. - blend)
    }
}

fn normalize(v: [f32; 3]) -> [f32; 3] {
    let len = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
    if len > 0. {
        [v[0] / len, v[1] / len, v[2] / len]
    } else {
        [0., 0., 1.]
    }
}

fn secondary_tone(primary: &Color) -> Color {
    let (dh, ds, dl) = SECONDARY_OFFSET;
    primary.offset_hsl(dh, ds, dl)
}
