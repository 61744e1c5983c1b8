use crate::error::{GeometryError, Result};
use crate::regions::Region;
use crate::shading::color::PALETTE;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeshKind {
    Lips,
    UpperLip,
    LowerLip,
    Skin,
}

impl MeshKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Lips => "lips",
            Self::UpperLip => "upper_lip",
            Self::LowerLip => "lower_lip",
            Self::Skin => "skin",
        }
    }
}

impl fmt::Display for MeshKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MeshKind {
    type Err = GeometryError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "lips" => Ok(Self::Lips),
            "upper_lip" => Ok(Self::UpperLip),
            "lower_lip" => Ok(Self::LowerLip),
            "skin" => Ok(Self::Skin),
            _ => Err(GeometryError::InvalidConfig(format!("unknown mesh {s}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShadingTarget {
    Lip,
    Skin,
}

/// Everything needed to build and draw one overlay mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshSpec {
    pub kind: MeshKind,
    pub outer: Region,
    pub hole: Option<Region>,
    /// Contour the soft mask fades toward. `None` means a fully opaque mesh.
    pub mask_boundary: Option<Region>,
    pub shading: ShadingTarget,
    pub render_order: u32,
}

impl MeshSpec {
    pub fn skin() -> Self {
        Self {
            kind: MeshKind::Skin,
            outer: Region::FaceOval,
            hole: None,
            mask_boundary: None,
            shading: ShadingTarget::Skin,
            render_order: 1,
        }
    }
}

/// How the lips are meshed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LipLayout {
    /// One mesh: the outer lip contour with the mouth opening as a hole.
    #[default]
    Hollow,
    /// Separate upper and lower lip meshes, each a closed contour.
    Split,
}

impl LipLayout {
    pub fn mesh_specs(&self) -> Vec<MeshSpec> {
        match self {
            Self::Hollow => vec![MeshSpec {
                kind: MeshKind::Lips,
                outer: Region::LipOuter,
                hole: Some(Region::LipInner),
                mask_boundary: Some(Region::LipInner),
                shading: ShadingTarget::Lip,
                render_order: 2,
            }],
            Self::Split => [
                (MeshKind::UpperLip, Region::UpperLip),
                (MeshKind::LowerLip, Region::LowerLip),
            ]
            .into_iter()
            .map(|(kind, outer)| MeshSpec {
                kind,
                outer,
                hole: None,
                mask_boundary: Some(Region::LipInner),
                shading: ShadingTarget::Lip,
                render_order: 2,
            })
            .collect(),
        }
    }
}

impl FromStr for LipLayout {
    type Err = GeometryError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "hollow" => Ok(Self::Hollow),
            "split" => Ok(Self::Split),
            _ => Err(GeometryError::InvalidConfig(format!("unknown lip layout {s}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriangulatorKind {
    #[default]
    EarClip,
    Earcut,
}

impl FromStr for TriangulatorKind {
    type Err = GeometryError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ear_clip" | "earclip" => Ok(Self::EarClip),
            "earcut" => Ok(Self::Earcut),
            _ => Err(GeometryError::InvalidConfig(format!("unknown triangulator {s}"))),
        }
    }
}

/// Session configuration. Every field has a default, so a partial JSON
/// document is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Blend factor of the landmark smoother, in (0, 1]. Higher is more
    /// responsive.
    pub smoothing_alpha: f32,
    /// Width of the soft mask fade in UV units.
    pub mask_falloff: f32,
    pub video_width: u32,
    pub video_height: u32,
    pub lip_layout: LipLayout,
    pub skin_overlay: bool,
    pub triangulator: TriangulatorKind,
    pub lip_color: String,
    pub skin_smoothing: f32,
    pub skin_brightening: f32,
    pub skin_pinking: f32,
    pub debug: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            smoothing_alpha: 0.4,
            mask_falloff: 0.06,
            video_width: 640,
            video_height: 480,
            lip_layout: LipLayout::Hollow,
            skin_overlay: true,
            triangulator: TriangulatorKind::EarClip,
            lip_color: PALETTE[0].hex.to_string(),
            skin_smoothing: 0.5,
            skin_brightening: 0.05,
            skin_pinking: 0.2,
            debug: false,
        }
    }
}

impl PipelineConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| GeometryError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn aspect(&self) -> f32 {
        self.video_width as f32 / self.video_height as f32
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.smoothing_alpha > 0. && self.smoothing_alpha <= 1.) {
            return Err(GeometryError::InvalidConfig(format!(
                "smoothing_alpha must be in (0, 1], got {}",
                self.smoothing_alpha
            )));
        }

        if !(self.mask_falloff > 0.) {
            return Err(GeometryError::InvalidConfig(format!(
                "mask_falloff must be positive, got {}",
                self.mask_falloff
            )));
        }

        if self.video_width == 0 || self.video_height == 0 {
            return Err(GeometryError::InvalidConfig(format!(
                "video size must be non-zero, got {}x{}",
                self.video_width, self.video_height
            )));
        }

        for (name, v) in [
            ("skin_smoothing", self.skin_smoothing),
            ("skin_brightening", self.skin_brightening),
            ("skin_pinking", self.skin_pinking),
        ] {
            if !(0. ..=1.).contains(&v) {
                return Err(GeometryError::InvalidConfig(format!(
                    "{name} must be in [0, 1], got {v}"
                )));
            }
        }

        Ok(())
    }

    /// Meshes to build each frame, lowest render order first.
    pub fn mesh_specs(&self) -> Vec<MeshSpec> {
        let mut specs = Vec::new();
        if self.skin_overlay {
            specs.push(MeshSpec::skin());
        }
        specs.extend(self.lip_layout.mesh_specs());
        specs.sort_by_key(|s| s.render_order);
        specs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert!((config.aspect() - 4. / 3.).abs() < 1e-6);
    }

    #[test]
    fn test_partial_json() {
        let config =
            PipelineConfig::from_json(r#"{"lip_layout": "split", "smoothing_alpha": 0.8}"#)
                .unwrap();
        assert_eq!(config.lip_layout, LipLayout::Split);
        assert_eq!(config.smoothing_alpha, 0.8);
        assert_eq!(config.mask_falloff, 0.06);
    }

    #[test]
    fn test_rejects_bad_alpha() {
        for alpha in [0., -0.1, 1.5, f32::NAN] {
            let config = PipelineConfig {
                smoothing_alpha: alpha,
                ..Default::default()
            };
            assert!(config.validate().is_err(), "{alpha}");
        }
        assert!(PipelineConfig::from_json(r#"{"smoothing_alpha": 0}"#).is_err());
    }

    #[test]
    fn test_mesh_specs_order() {
        let config = PipelineConfig {
            lip_layout: LipLayout::Split,
            ..Default::default()
        };
        let kinds: Vec<MeshKind> = config.mesh_specs().iter().map(|s| s.kind).collect();
        assert_eq!(kinds, [MeshKind::Skin, MeshKind::UpperLip, MeshKind::LowerLip]);

        let config = PipelineConfig {
            skin_overlay: false,
            ..Default::default()
        };
        let specs = config.mesh_specs();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].hole, Some(Region::LipInner));
    }

    #[test]
    fn test_parse_kinds() {
        assert_eq!("split".parse::<LipLayout>().unwrap(), LipLayout::Split);
        assert_eq!("earcut".parse::<TriangulatorKind>().unwrap(), TriangulatorKind::Earcut);
        assert!("fan".parse::<TriangulatorKind>().is_err());
    }
}
