#![allow(dead_code)]

use symbology::core::{ResolvedStyling, Style, Styling, SymbologyParser};
use symbology::filter::FeatureEvaluator;
use symbology::styling::{LineStyling, PolygonStyling, TextStyling};
use symbology::types::SimpleFeature;

pub type TestResult = Result<(), Box<dyn std::error::Error>>;

/// Namespace declarations for SE test documents.
pub const SE: &str = r#"xmlns="http://www.opengis.net/se" xmlns:ogc="http://www.opengis.net/ogc" xmlns:xlink="http://www.w3.org/1999/xlink""#;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Compiles a feature type style holding a single rule with `body`.
pub fn compile_rule(body: &str) -> Style {
    init_logging();
    let xml = format!(r#"<FeatureTypeStyle {SE}><Rule>{body}</Rule></FeatureTypeStyle>"#);
    SymbologyParser::default()
        .parse_style(&xml, Some("test.se"))
        .unwrap()
}

pub fn evaluate(style: &Style, feature: &SimpleFeature) -> Vec<ResolvedStyling> {
    style.evaluate(feature, &FeatureEvaluator)
}

pub fn as_line(resolved: &ResolvedStyling) -> &LineStyling {
    match &resolved.styling {
        Styling::Line(line) => line,
        other => panic!("expected a line styling, got {:?}", other),
    }
}

pub fn as_polygon(resolved: &ResolvedStyling) -> &PolygonStyling {
    match &resolved.styling {
        Styling::Polygon(polygon) => polygon,
        other => panic!("expected a polygon styling, got {:?}", other),
    }
}

pub fn as_text(resolved: &ResolvedStyling) -> &TextStyling {
    match &resolved.styling {
        Styling::Text(text) => text,
        other => panic!("expected a text styling, got {:?}", other),
    }
}
