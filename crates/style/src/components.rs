//! Composite styling components shared by the per-geometry stylings.
//!
//! Nested components sit behind `Arc` so one compiled component can be
//! referenced from several parents. Per-feature evaluation works on clones and
//! mutates nested parts through `Arc::make_mut`, which leaves the compiled
//! template untouched.

use image::DynamicImage;
use serde::Serialize;
use std::sync::Arc;
use symbology_types::Color;

/// Unit of measure for lengths in a symbolizer.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash, Default)]
pub enum Uom {
    #[default]
    Pixel,
    Metre,
    Mm,
    Foot,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash, Default)]
pub enum LineJoin {
    Mitre,
    #[default]
    Round,
    Bevel,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash, Default)]
pub enum LineCap {
    #[default]
    Butt,
    Round,
    Square,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash, Default)]
pub enum WellKnownKind {
    #[default]
    Square,
    Circle,
    Triangle,
    Star,
    Cross,
    X,
}

/// How an offset line is constructed.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash, Default)]
pub enum OffsetKind {
    #[default]
    Standard,
    Round,
    Edged,
}

/// Which parts of an offset line are dropped.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash, Default)]
pub enum Substraction {
    #[default]
    None,
    NegativeOnly,
    PositiveOnly,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash, Default)]
pub struct PerpendicularOffsetType {
    pub kind: OffsetKind,
    pub substraction: Substraction,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Fill {
    pub color: Color,
    pub graphic: Option<Arc<Graphic>>,
}

impl Default for Fill {
    fn default() -> Self {
        Self { color: Color::gray(128), graphic: None }
    }
}

impl Fill {
    pub fn solid(color: Color) -> Self {
        Self { color, graphic: None }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Stroke {
    pub color: Color,
    pub width: f64,
    pub line_join: LineJoin,
    pub line_cap: LineCap,
    pub dasharray: Vec<f64>,
    pub dashoffset: f64,
    /// Graphic repeated along the line.
    pub stroke_graphic: Option<Arc<Graphic>>,
    /// Graphic used to fill the stroked area.
    pub fill_graphic: Option<Arc<Graphic>>,
    pub stroke_gap: f64,
    pub stroke_initial_gap: f64,
    /// Position of a single stroke graphic along the line, in percent; negative if unset.
    pub position_percentage: f64,
    /// Whether stroke graphics follow the line direction.
    pub position_rotation: bool,
}

impl Default for Stroke {
    fn default() -> Self {
        Self {
            color: Color::BLACK,
            width: 1.0,
            line_join: LineJoin::Round,
            line_cap: LineCap::Butt,
            dasharray: Vec::new(),
            dashoffset: 0.0,
            stroke_graphic: None,
            fill_graphic: None,
            stroke_gap: 0.0,
            stroke_initial_gap: 0.0,
            position_percentage: -1.0,
            position_rotation: true,
        }
    }
}

/// Outline of an SVG mark glyph.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MarkShape {
    pub source: Option<String>,
    pub view_box: Option<[f64; 4]>,
    /// SVG path data of every `path` element, in document order.
    pub paths: Vec<String>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
pub enum MarkFontFormat {
    TrueType,
    Type1,
}

/// A font whose glyphs are used as marks.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MarkFont {
    pub source: Option<String>,
    pub format: MarkFontFormat,
    pub family: Option<String>,
    pub glyph_count: u16,
    #[serde(skip)]
    pub data: Arc<Vec<u8>>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Mark {
    pub well_known: WellKnownKind,
    pub shape: Option<Arc<MarkShape>>,
    pub font: Option<Arc<MarkFont>>,
    pub mark_index: i32,
    pub fill: Option<Arc<Fill>>,
    pub stroke: Option<Arc<Stroke>>,
}

impl Default for Mark {
    fn default() -> Self {
        Self {
            well_known: WellKnownKind::Square,
            shape: None,
            font: None,
            mark_index: -1,
            fill: Some(Arc::new(Fill::default())),
            stroke: Some(Arc::new(Stroke::default())),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Graphic {
    pub mark: Option<Arc<Mark>>,
    #[serde(skip)]
    pub image: Option<Arc<DynamicImage>>,
    pub image_url: Option<String>,
    pub opacity: f64,
    pub size: f64,
    pub rotation: f64,
    pub anchor_point_x: f64,
    pub anchor_point_y: f64,
    pub displacement_x: f64,
    pub displacement_y: f64,
}

impl Default for Graphic {
    fn default() -> Self {
        Self {
            mark: Some(Arc::new(Mark::default())),
            image: None,
            image_url: None,
            opacity: 1.0,
            size: 6.0,
            rotation: 0.0,
            anchor_point_x: 0.5,
            anchor_point_y: 0.5,
            displacement_x: 0.0,
            displacement_y: 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Halo {
    pub fill: Option<Arc<Fill>>,
    pub radius: f64,
}

impl Default for Halo {
    fn default() -> Self {
        Self {
            fill: Some(Arc::new(Fill::solid(Color::WHITE))),
            radius: 1.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LinePlacement {
    pub perpendicular_offset: f64,
    pub perpendicular_offset_type: PerpendicularOffsetType,
    pub initial_gap: f64,
    pub gap: f64,
    pub repeat: bool,
    pub is_aligned: bool,
    pub generalize_line: bool,
    pub prevent_upside_down: bool,
    pub center: bool,
    pub word_wise: bool,
}

impl Default for LinePlacement {
    fn default() -> Self {
        Self {
            perpendicular_offset: 0.0,
            perpendicular_offset_type: PerpendicularOffsetType::default(),
            initial_gap: 0.0,
            gap: 0.0,
            repeat: false,
            is_aligned: true,
            generalize_line: false,
            prevent_upside_down: false,
            center: false,
            word_wise: true,
        }
    }
}
