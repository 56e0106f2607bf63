//! The per-geometry styling records symbolizers carry.

use crate::components::{Fill, Graphic, Halo, LinePlacement, PerpendicularOffsetType, Stroke, Uom};
use crate::font::Font;
use crate::raster::{ChannelSelection, ColorMap, ContrastEnhancement, OverlapBehavior, ShadedRelief};
use crate::symbolizer::AnySymbolizer;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use symbology_types::Color;

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct PointStyling {
    pub graphic: Arc<Graphic>,
    pub uom: Uom,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct LineStyling {
    pub stroke: Arc<Stroke>,
    pub perpendicular_offset: f64,
    pub perpendicular_offset_type: PerpendicularOffsetType,
    pub uom: Uom,
}

/// Fill and stroke are absent unless the symbolizer declares them.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct PolygonStyling {
    pub fill: Option<Arc<Fill>>,
    pub stroke: Option<Arc<Stroke>>,
    pub displacement_x: f64,
    pub displacement_y: f64,
    pub perpendicular_offset: f64,
    pub perpendicular_offset_type: PerpendicularOffsetType,
    pub uom: Uom,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TextStyling {
    pub font: Arc<Font>,
    pub fill: Option<Arc<Fill>>,
    pub halo: Option<Arc<Halo>>,
    pub line_placement: Option<Arc<LinePlacement>>,
    pub rotation: f64,
    pub displacement_x: f64,
    pub displacement_y: f64,
    pub anchor_point_x: f64,
    pub anchor_point_y: f64,
    /// Lets the renderer move the label to avoid conflicts.
    pub auto: bool,
    pub uom: Uom,
}

impl Default for TextStyling {
    fn default() -> Self {
        Self {
            font: Arc::new(Font::default()),
            fill: Some(Arc::new(Fill::solid(Color::BLACK))),
            halo: None,
            line_placement: None,
            rotation: 0.0,
            displacement_x: 0.0,
            displacement_y: 0.0,
            anchor_point_x: 0.0,
            anchor_point_y: 0.5,
            auto: false,
            uom: Uom::Pixel,
        }
    }
}

/// The line or polygon symbolizer drawn around raster footprints.
/// Compares by identity.
#[derive(Clone)]
pub struct ImageOutline(pub Arc<AnySymbolizer>);

impl PartialEq for ImageOutline {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for ImageOutline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ImageOutline").field(&self.0.id()).finish()
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RasterStyling {
    pub opacity: f64,
    pub channel_selection: Option<ChannelSelection>,
    pub overlap: OverlapBehavior,
    pub color_map: Option<Arc<ColorMap>>,
    pub contrast_enhancement: Option<ContrastEnhancement>,
    pub shaded_relief: Option<ShadedRelief>,
    #[serde(skip)]
    pub image_outline: Option<ImageOutline>,
    pub uom: Uom,
}

impl Default for RasterStyling {
    fn default() -> Self {
        Self {
            opacity: 1.0,
            channel_selection: None,
            overlap: OverlapBehavior::LatestOnTop,
            color_map: None,
            contrast_enhancement: None,
            shaded_relief: None,
            image_outline: None,
            uom: Uom::Pixel,
        }
    }
}
