use crate::error::{GeometryError, Result};
use serde::Serialize;
use std::str::FromStr;

/// An RGB color with channels in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsl {
    pub h: f32,
    pub s: f32,
    pub l: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Swatch {
    pub name: &'static str,
    pub hex: &'static str,
}

pub const PALETTE: [Swatch; 8] = [
    Swatch { name: "Ruby Red", hex: "#E02D40" },
    Swatch { name: "Rose Clay", hex: "#B96F71" },
    Swatch { name: "Burnt Orange", hex: "#D96831" },
    Swatch { name: "Earth Brown", hex: "#9A6A5F" },
    Swatch { name: "Nude Beige", hex: "#D8A790" },
    Swatch { name: "Baby Pink", hex: "#F29FB0" },
    Swatch { name: "Wine Red", hex: "#8C1D2A" },
    Swatch { name: "Plum", hex: "#6E3A57" },
];

impl Color {
    pub const WHITE: Color = Color { r: 1., g: 1., b: 1. };

    pub fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Parses `#RRGGBB`, `RRGGBB` or `#RGB`.
    pub fn from_hex(hex: &str) -> Result<Self> {
        let digits = hex.trim().trim_start_matches('#');
        let expanded: String = match digits.len() {
            3 => digits.chars().flat_map(|c| [c, c]).collect(),
            6 => digits.to_string(),
            _ => return Err(GeometryError::InvalidColor(hex.to_string())),
        };

        let channel = |i: usize| {
            expanded
                .get(i..i + 2)
                .and_then(|s| u8::from_str_radix(s, 16).ok())
                .map(|v| v as f32 / 255.)
                .ok_or_else(|| GeometryError::InvalidColor(hex.to_string()))
        };

        Ok(Self {
            r: channel(0)?,
            g: channel(2)?,
            b: channel(4)?,
        })
    }

    pub fn to_hex(&self) -> String {
        let c = |v: f32| (v.clamp(0., 1.) * 255.).round() as u8;
        format!("#{:02X}{:02X}{:02X}", c(self.r), c(self.g), c(self.b))
    }

    pub fn to_hsl(&self) -> Hsl {
        let max = self.r.max(self.g).max(self.b);
        let min = self.r.min(self.g).min(self.b);
        let l = (min + max) / 2.;

        if min == max {
            return Hsl { h: 0., s: 0., l };
        }

        let delta = max - min;
        let s = if l <= 0.5 {
            delta / (max + min)
        } else {
            delta / (2. - max - min)
        };

        let h = if max == self.r {
            (self.g - self.b) / delta + if self.g < self.b { 6. } else { 0. }
        } else if max == self.g {
            (self.b - self.r) / delta + 2.
        } else {
            (self.r - self.g) / delta + 4.
        };

        Hsl { h: h / 6., s, l }
    }

    pub fn from_hsl(hsl: Hsl) -> Self {
        let h = hsl.h.rem_euclid(1.);
        let s = hsl.s.clamp(0., 1.);
        let l = hsl.l.clamp(0., 1.);

        if s == 0. {
            return Self::new(l, l, l);
        }

        let p = if l <= 0.5 { l * (1. + s) } else { l + s - l * s };
        let q = 2. * l - p;

        Self {
            r: hue_to_rgb(q, p, h + 1. / 3.),
            g: hue_to_rgb(q, p, h),
            b: hue_to_rgb(q, p, h - 1. / 3.),
        }
    }

    pub fn offset_hsl(&self, dh: f32, ds: f32, dl: f32) -> Self {
        let hsl = self.to_hsl();
        Self::from_hsl(Hsl {
            h: hsl.h + dh,
            s: hsl.s + ds,
            l: hsl.l + dl,
        })
    }

    /// Rec. 601 luma.
    pub fn luminance(&self) -> f32 {
        self.r * 0.299 + self.g * 0.587 + self.b * 0.114
    }

    pub fn mix(&self, o: &Color, t: f32) -> Color {
        Color {
            r: self.r + (o.r - self.r) * t,
            g: self.g + (o.g - self.g) * t,
            b: self.b + (o.b - self.b) * t,
        }
    }

    pub fn scale(&self, f: f32) -> Color {
        Color::new(self.r * f, self.g * f, self.b * f)
    }

    pub fn clamped(&self) -> Color {
        Color::new(self.r.clamp(0., 1.), self.g.clamp(0., 1.), self.b.clamp(0., 1.))
    }

    pub fn to_array(&self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }
}

fn hue_to_rgb(p: f32, q: f32, mut t: f32) -> f32 {
    if t < 0. {
        t += 1.;
    }
    if t > 1. {
        t -= 1.;
    }
    if t < 1. / 6. {
        return p + (q - p) * 6. * t;
    }
    if t < 1. / 2. {
        return q;
    }
    if t < 2. / 3. {
        return p + (q - p) * 6. * (2. / 3. - t);
    }
    p
}

impl FromStr for Color {
    type Err = GeometryError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}
