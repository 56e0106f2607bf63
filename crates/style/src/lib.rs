pub mod components;
pub mod font;
pub mod parsers;
pub mod raster;
pub mod styling;
pub mod symbolizer;

pub use components::{
    Fill, Graphic, Halo, LineCap, LineJoin, LinePlacement, Mark, MarkFont, MarkShape, PerpendicularOffsetType,
    MarkFontFormat, OffsetKind, Stroke, Substraction, Uom, WellKnownKind,
};
pub use font::{Font, FontStyle};
pub use parsers::{FillParameter, FontParameter, StrokeParameter, StyleParseError};
pub use raster::{
    Categorize, ChannelSelection, ColorMap, ContrastEnhancement, Interpolate, InterpolationMode, OverlapBehavior,
    SelectedChannel, ShadedRelief,
};
pub use styling::{ImageOutline, LineStyling, PointStyling, PolygonStyling, RasterStyling, TextStyling};
pub use symbolizer::{AnySymbolizer, Description, Label, Symbolizer, SymbolizerId};
