//! Placement of a static overlay image (a mustache) pinned to the face.
//!
//! The image ships with an anchor sheet: CSV rows of
//! `label,x,y,filename,image_width,image_height` giving named points in the
//! image's pixel space. The placement maps image pixels to canvas pixels by
//! translating the `top_center` anchor onto the nose base, rotating with the
//! cheek line and scaling the `left_point`..`right_point` span to the face
//! width.

use crate::error::{GeometryError, Result};
use crate::landmarks::Landmark;
use crate::regions::{LEFT_CHEEK, NOSE_BASE, RIGHT_CHEEK};
use crate::shapes::point::Point;
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

pub const LEFT_POINT: &str = "left_point";
pub const RIGHT_POINT: &str = "right_point";
pub const TOP_CENTER: &str = "top_center";

const SCALE_BOOST: f32 = 1.2;

#[derive(Debug, Clone, PartialEq)]
pub struct AnchorSheet {
    points: HashMap<String, Point>,
    pub filename: String,
    pub image_size: [u32; 2],
}

impl AnchorSheet {
    pub fn parse(text: &str) -> Result<Self> {
        let mut points = HashMap::new();
        let mut meta: Option<(String, [u32; 2])> = None;

        for (n, line) in text.lines().enumerate().skip(1) {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let cols: Vec<&str> = line.split(',').map(str::trim).collect();
            if cols.len() < 6 {
                return Err(GeometryError::AnchorSheet(format!(
                    "line {}: expected 6 columns, found {}",
                    n + 1,
                    cols.len()
                )));
            }

            let num = |i: usize| {
                cols[i].parse::<f32>().map_err(|e| {
                    GeometryError::AnchorSheet(format!("line {}: column {}: {e}", n + 1, i + 1))
                })
            };

            points.insert(cols[0].to_string(), Point::new(num(1)?, num(2)?));

            if meta.is_none() {
                let size = |i: usize| {
                    cols[i].parse::<u32>().map_err(|e| {
                        GeometryError::AnchorSheet(format!("line {}: column {}: {e}", n + 1, i + 1))
                    })
                };
                meta = Some((cols[3].to_string(), [size(4)?, size(5)?]));
            }
        }

        let (filename, image_size) =
            meta.ok_or_else(|| GeometryError::AnchorSheet("no data rows".to_string()))?;

        for label in [LEFT_POINT, RIGHT_POINT, TOP_CENTER] {
            if !points.contains_key(label) {
                return Err(GeometryError::AnchorSheet(format!("missing {label}")));
            }
        }

        Ok(Self {
            points,
            filename,
            image_size,
        })
    }

    pub fn get(&self, label: &str) -> Option<Point> {
        self.points.get(label).copied()
    }

    fn required(&self, label: &str) -> Result<Point> {
        self.get(label)
            .ok_or_else(|| GeometryError::AnchorSheet(format!("missing {label}")))
    }
}

/// Affine placement of the overlay image in canvas pixels:
/// `canvas = anchor + R(rotation) * scale * (image + offset)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Placement {
    pub anchor: Point,
    /// Radians, clockwise on screen since canvas y points down.
    pub rotation: f32,
    pub scale: f32,
    pub offset: Point,
    pub image_size: [u32; 2],
}

impl Placement {
    pub fn compute(
        sheet: &AnchorSheet,
        landmarks: &[Landmark],
        canvas_width: u32,
        canvas_height: u32,
    ) -> Result<Self> {
        let px = |i: usize| {
            landmarks
                .get(i)
                .filter(|lm| lm.is_finite())
                .map(|lm| {
                    Point::new(
                        lm.x * canvas_width as f32,
                        lm.y * canvas_height as f32,
                    )
                })
                .ok_or_else(|| GeometryError::InsufficientPoints {
                    region: format!("landmark {i}"),
                    found: 0,
                })
        };

        let anchor = px(NOSE_BASE)?;
        let left = px(LEFT_CHEEK)?;
        let right = px(RIGHT_CHEEK)?;

        let sheet_left = sheet.required(LEFT_POINT)?;
        let sheet_right = sheet.required(RIGHT_POINT)?;
        let top = sheet.required(TOP_CENTER)?;

        let sheet_width = sheet_right.x - sheet_left.x;
        if sheet_width.abs() < f32::EPSILON {
            return Err(GeometryError::AnchorSheet(
                "left_point and right_point share an x coordinate".to_string(),
            ));
        }

        let scale = left.dist(&right) / sheet_width * SCALE_BOOST;
        let rotation = (right.y - left.y).atan2(right.x - left.x);

        let placement = Self {
            anchor,
            rotation,
            scale,
            offset: Point::new(-top.x, -top.y),
            image_size: sheet.image_size,
        };
        debug!(
            "Placement at ({:.1}, {:.1}), {:.1} deg, scale {:.3}",
            anchor.x,
            anchor.y,
            placement.rotation_degrees(),
            scale
        );

        Ok(placement)
    }

    /// Maps an image pixel to canvas pixels.
    pub fn apply(&self, p: Point) -> Point {
        let local = Point::new(
            (p.x + self.offset.x) * self.scale,
            (p.y + self.offset.y) * self.scale,
        );
        let rotated = local.rotate(Point::default(), self.rotation);
        Point::new(rotated.x + self.anchor.x, rotated.y + self.anchor.y)
    }

    pub fn rotation_degrees(&self) -> f32 {
        self.rotation.to_degrees()
    }
}
