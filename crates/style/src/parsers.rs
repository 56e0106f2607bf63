//! Parsers for literal SE values and the `SvgParameter`/`CssParameter` dispatchers.
//!
//! Every function here turns one resolved string into a typed value or a
//! mutation of a component. They serve both the compile-time literal path
//! and per-feature replay, so they never log: failures are returned and the
//! caller reports them with source context.

use crate::components::{
    Fill, LineCap, LineJoin, OffsetKind, PerpendicularOffsetType, Stroke, Substraction, Uom, WellKnownKind,
};
use crate::font::{Font, FontStyle};
use crate::raster::{InterpolationMode, OverlapBehavior};
use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::take_while_m_n,
    character::complete::{char, multispace0, multispace1},
    combinator::{map, map_res},
    multi::separated_list1,
    number::complete::double,
    sequence::{delimited, preceded},
};
use symbology_types::Color;
use thiserror::Error;

/// Errors that can occur during style value parsing.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StyleParseError {
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid value for '{property}': '{value}'")]
    InvalidValue { property: String, value: String },

    #[error("Invalid value for '{property}': '{value}', using {fallback}")]
    Substituted {
        property: String,
        value: String,
        fallback: &'static str,
    },

    #[error("Float parse error: {0}")]
    FloatParse(String),
}

// --- Helper Parsers ---

/// Helper to run a nom parser and convert its result to a `Result<T, StyleParseError>`.
pub fn run_parser<'a, T, F>(mut parser: F, input: &'a str) -> Result<T, StyleParseError>
where
    F: FnMut(&'a str) -> IResult<&'a str, T>,
{
    match parser(input.trim()) {
        Ok(("", result)) => Ok(result),
        Ok((rem, _)) => Err(StyleParseError::Parse(format!(
            "Parser did not consume all input. Remainder: '{}'",
            rem
        ))),
        Err(e) => Err(StyleParseError::Parse(e.to_string())),
    }
}

/// Parses a plain decimal number such as `3.5`, `-2` or `1e3`.
pub fn parse_number(input: &str) -> Result<f64, StyleParseError> {
    let value = input.trim();
    value
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .ok_or_else(|| StyleParseError::FloatParse(value.to_string()))
}

fn number_for(property: &str, value: &str) -> Result<f64, StyleParseError> {
    parse_number(value).map_err(|_| StyleParseError::InvalidValue {
        property: property.to_string(),
        value: value.trim().to_string(),
    })
}

/// Boolean literal: `true` in any case is true, everything else false.
pub fn parse_bool(input: &str) -> bool {
    input.trim().eq_ignore_ascii_case("true")
}

// --- Color Parsers ---

fn hex_primary(input: &str) -> IResult<&str, u8> {
    map_res(take_while_m_n(2, 2, |c: char| c.is_ascii_hexdigit()), |s| {
        u8::from_str_radix(s, 16)
    })
    .parse(input)
}

fn hex_digit(input: &str) -> IResult<&str, u8> {
    map_res(take_while_m_n(1, 1, |c: char| c.is_ascii_hexdigit()), |s| {
        u8::from_str_radix(s, 16).map(|v| v * 17)
    })
    .parse(input)
}

fn hex_color_8(input: &str) -> IResult<&str, Color> {
    map(
        (hex_primary, hex_primary, hex_primary, hex_primary),
        |(a, r, g, b)| Color { r, g, b, a: f32::from(a) / 255.0 },
    )
    .parse(input)
}

fn hex_color_6(input: &str) -> IResult<&str, Color> {
    map((hex_primary, hex_primary, hex_primary), |(r, g, b)| Color::rgb(r, g, b)).parse(input)
}

fn hex_color_3(input: &str) -> IResult<&str, Color> {
    map((hex_digit, hex_digit, hex_digit), |(r, g, b)| Color::rgb(r, g, b)).parse(input)
}

/// Parses a hex color: `#AARRGGBB`, `#RRGGBB` or `#RGB`.
pub fn parse_color(input: &str) -> IResult<&str, Color> {
    preceded(char('#'), alt((hex_color_8, hex_color_6, hex_color_3))).parse(input)
}

fn color_for(property: &str, value: &str) -> Result<Color, StyleParseError> {
    run_parser(parse_color, value).map_err(|_| StyleParseError::InvalidValue {
        property: property.to_string(),
        value: value.trim().to_string(),
    })
}

// --- Dash Arrays ---

fn comma_separated(input: &str) -> IResult<&str, Vec<f64>> {
    separated_list1(delimited(multispace0, char(','), multispace0), double).parse(input)
}

fn space_separated(input: &str) -> IResult<&str, Vec<f64>> {
    separated_list1(multispace1, double).parse(input)
}

/// Parses a dash array. Values are comma separated if the text contains a
/// comma, whitespace separated otherwise.
pub fn parse_dasharray(input: &str) -> Result<Vec<f64>, StyleParseError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    let values = if trimmed.contains(',') {
        run_parser(comma_separated, trimmed)
    } else {
        run_parser(space_separated, trimmed)
    };
    values.map_err(|_| StyleParseError::InvalidValue {
        property: "stroke-dasharray".to_string(),
        value: trimmed.to_string(),
    })
}

// --- Keyword Parsers ---

pub fn parse_line_join(s: &str) -> Result<LineJoin, StyleParseError> {
    match s.trim().to_lowercase().as_str() {
        "mitre" | "miter" => Ok(LineJoin::Mitre),
        "round" => Ok(LineJoin::Round),
        "bevel" => Ok(LineJoin::Bevel),
        _ => Err(StyleParseError::Substituted {
            property: "stroke-linejoin".to_string(),
            value: s.trim().to_string(),
            fallback: "round",
        }),
    }
}

pub fn parse_line_cap(s: &str) -> Result<LineCap, StyleParseError> {
    match s.trim().to_lowercase().as_str() {
        "butt" => Ok(LineCap::Butt),
        "round" => Ok(LineCap::Round),
        "square" => Ok(LineCap::Square),
        _ => Err(StyleParseError::Substituted {
            property: "stroke-linecap".to_string(),
            value: s.trim().to_string(),
            fallback: "butt",
        }),
    }
}

pub fn parse_well_known_name(s: &str) -> Result<WellKnownKind, StyleParseError> {
    match s.trim().to_lowercase().as_str() {
        "square" => Ok(WellKnownKind::Square),
        "circle" => Ok(WellKnownKind::Circle),
        "triangle" => Ok(WellKnownKind::Triangle),
        "star" => Ok(WellKnownKind::Star),
        "cross" => Ok(WellKnownKind::Cross),
        "x" => Ok(WellKnownKind::X),
        _ => Err(StyleParseError::Substituted {
            property: "WellKnownName".to_string(),
            value: s.trim().to_string(),
            fallback: "square",
        }),
    }
}

pub fn parse_font_style(s: &str) -> Result<FontStyle, StyleParseError> {
    match s.trim().to_lowercase().as_str() {
        "normal" => Ok(FontStyle::Normal),
        "italic" => Ok(FontStyle::Italic),
        "oblique" => Ok(FontStyle::Oblique),
        _ => Err(StyleParseError::InvalidValue {
            property: "font-style".to_string(),
            value: s.trim().to_string(),
        }),
    }
}

/// Unit of measure from a `uom` attribute, which is usually a URI such as
/// `http://www.opengeospatial.org/se/units/metre`.
pub fn parse_uom(s: &str) -> Result<Uom, StyleParseError> {
    let lower = s.trim().to_lowercase();
    if lower.ends_with("metre") || lower.ends_with("meter") {
        Ok(Uom::Metre)
    } else if lower.ends_with("mm") {
        Ok(Uom::Mm)
    } else if lower.ends_with("foot") {
        Ok(Uom::Foot)
    } else if lower.ends_with("pixel") {
        Ok(Uom::Pixel)
    } else {
        Err(StyleParseError::Substituted {
            property: "uom".to_string(),
            value: s.trim().to_string(),
            fallback: "pixel",
        })
    }
}

/// Reads the `type` and `substraction` attributes of a `PerpendicularOffset`.
/// Unknown values keep the defaults.
pub fn parse_perpendicular_offset_type(kind: Option<&str>, substraction: Option<&str>) -> PerpendicularOffsetType {
    let kind = match kind.map(|k| k.trim().to_lowercase()).as_deref() {
        Some("round") => OffsetKind::Round,
        Some("edged") => OffsetKind::Edged,
        _ => OffsetKind::Standard,
    };
    let substraction = match substraction.map(|s| s.trim().to_lowercase()).as_deref() {
        Some("negativeonly") | Some("negative_only") => Substraction::NegativeOnly,
        Some("positiveonly") | Some("positive_only") => Substraction::PositiveOnly,
        _ => Substraction::None,
    };
    PerpendicularOffsetType { kind, substraction }
}

pub fn parse_overlap_behavior(s: &str) -> Result<OverlapBehavior, StyleParseError> {
    match s.trim().to_uppercase().as_str() {
        "LATEST_ON_TOP" => Ok(OverlapBehavior::LatestOnTop),
        "EARLIEST_ON_TOP" => Ok(OverlapBehavior::EarliestOnTop),
        "AVERAGE" => Ok(OverlapBehavior::Average),
        "RANDOM" => Ok(OverlapBehavior::Random),
        _ => Err(StyleParseError::Substituted {
            property: "OverlapBehavior".to_string(),
            value: s.trim().to_string(),
            fallback: "LATEST_ON_TOP",
        }),
    }
}

pub fn parse_interpolation_mode(s: &str) -> InterpolationMode {
    match s.trim().to_lowercase().as_str() {
        "cosine" => InterpolationMode::Cosine,
        "cubic" => InterpolationMode::Cubic,
        _ => InterpolationMode::Linear,
    }
}

// --- Parameter Dispatchers ---

/// A parameter recognized inside `Fill`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillParameter {
    Color,
    Opacity,
}

impl FillParameter {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "fill" => Some(FillParameter::Color),
            "fill-opacity" => Some(FillParameter::Opacity),
            _ => None,
        }
    }

    /// `fill` replaces the color channels and keeps the current alpha;
    /// `fill-opacity` replaces only alpha, so both orders cascade.
    pub fn apply(self, fill: &mut Fill, value: &str) -> Result<(), StyleParseError> {
        match self {
            FillParameter::Color => fill.color = fill.color.with_rgb_of(color_for("fill", value)?),
            FillParameter::Opacity => {
                fill.color = fill.color.with_alpha(number_for("fill-opacity", value)? as f32)
            }
        }
        Ok(())
    }
}

/// A parameter recognized inside `Stroke`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrokeParameter {
    Color,
    Opacity,
    Width,
    LineJoin,
    LineCap,
    DashArray,
    DashOffset,
    PositionPercentage,
    PositionRotation,
}

impl StrokeParameter {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "stroke" => StrokeParameter::Color,
            "stroke-opacity" => StrokeParameter::Opacity,
            "stroke-width" => StrokeParameter::Width,
            "stroke-linejoin" => StrokeParameter::LineJoin,
            "stroke-linecap" => StrokeParameter::LineCap,
            "stroke-dasharray" => StrokeParameter::DashArray,
            "stroke-dashoffset" => StrokeParameter::DashOffset,
            n if n.ends_with("-graphicstroke-position-percentage") => StrokeParameter::PositionPercentage,
            n if n.ends_with("-graphicstroke-rotation") => StrokeParameter::PositionRotation,
            _ => return None,
        })
    }

    /// Applies one parameter. Invalid join and cap keywords set the
    /// fallback and still report the error; invalid numbers and colors leave
    /// the stroke unchanged.
    pub fn apply(self, stroke: &mut Stroke, value: &str) -> Result<(), StyleParseError> {
        match self {
            StrokeParameter::Color => stroke.color = stroke.color.with_rgb_of(color_for("stroke", value)?),
            StrokeParameter::Opacity => {
                stroke.color = stroke.color.with_alpha(number_for("stroke-opacity", value)? as f32)
            }
            StrokeParameter::Width => stroke.width = number_for("stroke-width", value)?,
            StrokeParameter::LineJoin => {
                let parsed = parse_line_join(value);
                stroke.line_join = parsed.clone().unwrap_or(LineJoin::Round);
                parsed?;
            }
            StrokeParameter::LineCap => {
                let parsed = parse_line_cap(value);
                stroke.line_cap = parsed.clone().unwrap_or(LineCap::Butt);
                parsed?;
            }
            StrokeParameter::DashArray => stroke.dasharray = parse_dasharray(value)?,
            StrokeParameter::DashOffset => stroke.dashoffset = number_for("stroke-dashoffset", value)?,
            StrokeParameter::PositionPercentage => {
                stroke.position_percentage = number_for("graphicstroke-position-percentage", value)?
            }
            StrokeParameter::PositionRotation => stroke.position_rotation = parse_bool(value),
        }
        Ok(())
    }
}

/// A parameter recognized inside `Font`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontParameter {
    Family,
    Style,
    Weight,
    Size,
}

impl FontParameter {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "font-family" => Some(FontParameter::Family),
            "font-style" => Some(FontParameter::Style),
            "font-weight" => Some(FontParameter::Weight),
            "font-size" => Some(FontParameter::Size),
            _ => None,
        }
    }

    /// `font-family` appends to the family list; an unknown `font-style`
    /// keeps the current style.
    pub fn apply(self, font: &mut Font, value: &str) -> Result<(), StyleParseError> {
        match self {
            FontParameter::Family => font.family.push(value.trim().to_string()),
            FontParameter::Style => font.style = parse_font_style(value)?,
            FontParameter::Weight => font.bold = value.trim().eq_ignore_ascii_case("bold"),
            FontParameter::Size => font.size = number_for("font-size", value)?,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_color_variants() {
        assert_eq!(run_parser(parse_color, "#0000FF").unwrap(), Color::rgb(0, 0, 255));
        assert_eq!(run_parser(parse_color, "#fff").unwrap(), Color::WHITE);
        let c = run_parser(parse_color, "#000000FF").unwrap();
        assert_eq!(c.a, 0.0);
        assert!(run_parser(parse_color, "blue").is_err());
    }

    #[test]
    fn test_color_parsers_agree() {
        for text in ["#0000FF", "#fff", "#800000FF", "#+F0000", "#+FF", "#12345", "#zzzzzz"] {
            assert_eq!(
                run_parser(parse_color, text).ok(),
                Color::parse_hex(text).ok(),
                "disagreement on {}",
                text
            );
        }
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number(" 3.5 ").unwrap(), 3.5);
        assert_eq!(parse_number("1e2").unwrap(), 100.0);
        assert!(parse_number("wide").is_err());
        assert!(parse_number("NaN").is_err());
    }

    #[test]
    fn test_dasharray_separators() {
        assert_eq!(parse_dasharray("5,2, 1").unwrap(), vec![5.0, 2.0, 1.0]);
        assert_eq!(parse_dasharray("5 2  1").unwrap(), vec![5.0, 2.0, 1.0]);
        assert_eq!(parse_dasharray("").unwrap(), Vec::<f64>::new());
        assert!(parse_dasharray("5 x").is_err());
    }

    #[test]
    fn test_fill_cascade_both_orders() {
        let mut a = Fill::default();
        FillParameter::Color.apply(&mut a, "#FF0000").unwrap();
        FillParameter::Opacity.apply(&mut a, "0.5").unwrap();

        let mut b = Fill::default();
        FillParameter::Opacity.apply(&mut b, "0.5").unwrap();
        FillParameter::Color.apply(&mut b, "#FF0000").unwrap();

        let expected = Color { r: 255, g: 0, b: 0, a: 0.5 };
        assert_eq!(a.color, expected);
        assert_eq!(b.color, expected);
    }

    #[test]
    fn test_opacity_is_clamped() {
        let mut fill = Fill::default();
        FillParameter::Opacity.apply(&mut fill, "3").unwrap();
        assert_eq!(fill.color.a, 1.0);
    }

    #[test]
    fn test_invalid_linejoin_falls_back_to_round() {
        let mut stroke = Stroke { line_join: LineJoin::Bevel, ..Stroke::default() };
        let result = StrokeParameter::LineJoin.apply(&mut stroke, "wobbly");
        assert!(matches!(result, Err(StyleParseError::Substituted { .. })));
        assert_eq!(stroke.line_join, LineJoin::Round);
    }

    #[test]
    fn test_invalid_width_keeps_value() {
        let mut stroke = Stroke { width: 2.0, ..Stroke::default() };
        assert!(StrokeParameter::Width.apply(&mut stroke, "thick").is_err());
        assert_eq!(stroke.width, 2.0);
    }

    #[test]
    fn test_vendor_parameter_names() {
        assert_eq!(
            StrokeParameter::from_name("deegree-graphicstroke-position-percentage"),
            Some(StrokeParameter::PositionPercentage)
        );
        assert_eq!(
            StrokeParameter::from_name("deegree-graphicstroke-rotation"),
            Some(StrokeParameter::PositionRotation)
        );
        assert_eq!(StrokeParameter::from_name("stroke-miterlimit"), None);
    }

    #[test]
    fn test_font_parameters() {
        let mut font = Font::default();
        FontParameter::Family.apply(&mut font, "Arial").unwrap();
        FontParameter::Family.apply(&mut font, "sans-serif").unwrap();
        FontParameter::Weight.apply(&mut font, "Bold").unwrap();
        FontParameter::Size.apply(&mut font, "12").unwrap();
        assert!(FontParameter::Style.apply(&mut font, "slanted").is_err());
        assert_eq!(font.family, vec!["Arial", "sans-serif"]);
        assert!(font.bold);
        assert_eq!(font.size, 12.0);
        assert_eq!(font.style, FontStyle::Normal);
    }

    #[test]
    fn test_uom_suffixes() {
        assert_eq!(parse_uom("http://www.opengeospatial.org/se/units/metre").unwrap(), Uom::Metre);
        assert_eq!(parse_uom("http://www.opengeospatial.org/se/units/foot").unwrap(), Uom::Foot);
        assert_eq!(parse_uom("mm").unwrap(), Uom::Mm);
        assert!(parse_uom("furlong").is_err());
    }

    #[test]
    fn test_perpendicular_offset_type() {
        let t = parse_perpendicular_offset_type(Some("Round"), Some("NegativeOnly"));
        assert_eq!(t.kind, OffsetKind::Round);
        assert_eq!(t.substraction, Substraction::NegativeOnly);
        assert_eq!(parse_perpendicular_offset_type(None, None), PerpendicularOffsetType::default());
    }
}
