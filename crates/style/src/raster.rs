//! Raster symbolizer components.

use serde::Serialize;
use std::f64::consts::PI;
use symbology_types::Color;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash, Default)]
pub enum OverlapBehavior {
    #[default]
    LatestOnTop,
    EarliestOnTop,
    Average,
    Random,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct ContrastEnhancement {
    pub normalize: bool,
    pub histogram: bool,
    pub gamma: f64,
}

impl Default for ContrastEnhancement {
    fn default() -> Self {
        Self { normalize: false, histogram: false, gamma: 1.0 }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SelectedChannel {
    pub name: String,
    pub contrast_enhancement: Option<ContrastEnhancement>,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ChannelSelection {
    pub red: Option<SelectedChannel>,
    pub green: Option<SelectedChannel>,
    pub blue: Option<SelectedChannel>,
    pub gray: Option<SelectedChannel>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct ShadedRelief {
    pub brightness_only: bool,
    pub relief_factor: f64,
    pub azimuth_angle: f64,
    pub illumination_angle: f64,
}

impl Default for ShadedRelief {
    fn default() -> Self {
        Self {
            brightness_only: false,
            relief_factor: 55.0,
            azimuth_angle: 315.0,
            illumination_angle: 45.0,
        }
    }
}

/// Maps raster values to colors.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub enum ColorMap {
    Categorize(Categorize),
    Interpolate(Interpolate),
}

impl ColorMap {
    pub fn lookup(&self, value: f64) -> Color {
        match self {
            ColorMap::Categorize(c) => c.lookup(value),
            ColorMap::Interpolate(i) => i.lookup(value),
        }
    }
}

/// Step function: `values[i]` covers the interval ending at `thresholds[i]`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Categorize {
    pub values: Vec<Color>,
    pub thresholds: Vec<f64>,
    pub fallback: Color,
    /// Whether a value equal to a threshold belongs to the preceding interval.
    pub preceding: bool,
}

impl Categorize {
    pub fn lookup(&self, value: f64) -> Color {
        if value.is_nan() || self.values.len() != self.thresholds.len() + 1 {
            return self.fallback;
        }
        let index = self
            .thresholds
            .iter()
            .take_while(|&&t| if self.preceding { value > t } else { value >= t })
            .count();
        self.values[index]
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash, Default)]
pub enum InterpolationMode {
    #[default]
    Linear,
    Cosine,
    Cubic,
}

/// Piecewise interpolation between `(data, color)` points sorted by data.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Interpolate {
    pub points: Vec<(f64, Color)>,
    pub fallback: Color,
    pub mode: InterpolationMode,
}

impl Interpolate {
    pub fn lookup(&self, value: f64) -> Color {
        let (Some(first), Some(last)) = (self.points.first(), self.points.last()) else {
            return self.fallback;
        };
        if value.is_nan() {
            return self.fallback;
        }
        if value <= first.0 {
            return first.1;
        }
        if value >= last.0 {
            return last.1;
        }
        for pair in self.points.windows(2) {
            let ((d0, c0), (d1, c1)) = (pair[0], pair[1]);
            if value >= d0 && value <= d1 {
                let t = if d1 > d0 { (value - d0) / (d1 - d0) } else { 0.0 };
                let t = match self.mode {
                    InterpolationMode::Linear => t,
                    InterpolationMode::Cosine => (1.0 - (t * PI).cos()) / 2.0,
                    InterpolationMode::Cubic => t * t * (3.0 - 2.0 * t),
                };
                return mix(c0, c1, t);
            }
        }
        self.fallback
    }
}

fn mix(a: Color, b: Color, t: f64) -> Color {
    let channel = |x: u8, y: u8| (f64::from(x) + (f64::from(y) - f64::from(x)) * t).round() as u8;
    Color {
        r: channel(a.r, b.r),
        g: channel(a.g, b.g),
        b: channel(a.b, b.b),
        a: (f64::from(a.a) + (f64::from(b.a) - f64::from(a.a)) * t) as f32,
    }
}
