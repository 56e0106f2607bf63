//! Symbolizers: a compiled styling value plus its per-feature continuation.

use crate::styling::{LineStyling, PointStyling, PolygonStyling, RasterStyling, TextStyling};
use serde::Serialize;
use std::borrow::Cow;
use std::fmt;
use symbology_continuation::Chain;
use symbology_filter::{Evaluator, Expression};
use symbology_types::{Feature, SourceLocation};

/// Identifies a symbolizer within the style it was compiled into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SymbolizerId(pub u32);

impl fmt::Display for SymbolizerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Description {
    pub title: Option<String>,
    pub abstract_: Option<String>,
}

#[derive(Clone)]
pub struct Symbolizer<T> {
    pub id: SymbolizerId,
    pub base: T,
    pub continuation: Chain<T>,
    pub geometry: Option<Expression>,
    pub name: Option<String>,
    pub description: Description,
    pub location: SourceLocation,
}

impl<T: Clone> Symbolizer<T> {
    pub fn new(id: SymbolizerId, base: T, continuation: Chain<T>, location: SourceLocation) -> Self {
        Self {
            id,
            base,
            continuation,
            geometry: None,
            name: None,
            description: Description::default(),
            location,
        }
    }

    /// True if the compiled value is final for every feature.
    pub fn is_static(&self) -> bool {
        self.continuation.is_none()
    }

    /// The styling for `feature`. Static symbolizers hand out their compiled
    /// value; dynamic ones replay the chain on a fresh copy.
    pub fn evaluate(&self, feature: &dyn Feature, evaluator: &dyn Evaluator) -> Cow<'_, T> {
        match &self.continuation {
            None => Cow::Borrowed(&self.base),
            Some(chain) => {
                let mut copy = self.base.clone();
                chain.evaluate(&mut copy, feature, evaluator);
                Cow::Owned(copy)
            }
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Symbolizer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Symbolizer")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("base", &self.base)
            .field("continuation", &self.continuation)
            .field("geometry", &self.geometry)
            .field("location", &self.location)
            .finish()
    }
}

/// A symbolizer of any geometry kind, in the order a rule declares them.
#[derive(Debug, Clone)]
pub enum AnySymbolizer {
    Point(Symbolizer<PointStyling>),
    Line(Symbolizer<LineStyling>),
    Polygon(Symbolizer<PolygonStyling>),
    Text(Symbolizer<TextStyling>),
    Raster(Symbolizer<RasterStyling>),
}

impl AnySymbolizer {
    pub fn id(&self) -> SymbolizerId {
        match self {
            AnySymbolizer::Point(s) => s.id,
            AnySymbolizer::Line(s) => s.id,
            AnySymbolizer::Polygon(s) => s.id,
            AnySymbolizer::Text(s) => s.id,
            AnySymbolizer::Raster(s) => s.id,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            AnySymbolizer::Point(s) => s.name.as_deref(),
            AnySymbolizer::Line(s) => s.name.as_deref(),
            AnySymbolizer::Polygon(s) => s.name.as_deref(),
            AnySymbolizer::Text(s) => s.name.as_deref(),
            AnySymbolizer::Raster(s) => s.name.as_deref(),
        }
    }

    pub fn geometry(&self) -> Option<&Expression> {
        match self {
            AnySymbolizer::Point(s) => s.geometry.as_ref(),
            AnySymbolizer::Line(s) => s.geometry.as_ref(),
            AnySymbolizer::Polygon(s) => s.geometry.as_ref(),
            AnySymbolizer::Text(s) => s.geometry.as_ref(),
            AnySymbolizer::Raster(s) => s.geometry.as_ref(),
        }
    }

    pub fn location(&self) -> &SourceLocation {
        match self {
            AnySymbolizer::Point(s) => &s.location,
            AnySymbolizer::Line(s) => &s.location,
            AnySymbolizer::Polygon(s) => &s.location,
            AnySymbolizer::Text(s) => &s.location,
            AnySymbolizer::Raster(s) => &s.location,
        }
    }

    pub fn is_static(&self) -> bool {
        match self {
            AnySymbolizer::Point(s) => s.is_static(),
            AnySymbolizer::Line(s) => s.is_static(),
            AnySymbolizer::Polygon(s) => s.is_static(),
            AnySymbolizer::Text(s) => s.is_static(),
            AnySymbolizer::Raster(s) => s.is_static(),
        }
    }
}

/// The text a text symbolizer draws, possibly assembled from feature data.
#[derive(Debug, Clone, Default)]
pub struct Label {
    pub base: String,
    pub continuation: Chain<String>,
    pub location: SourceLocation,
}

impl Label {
    pub fn evaluate(&self, feature: &dyn Feature, evaluator: &dyn Evaluator) -> String {
        let mut text = self.base.clone();
        if let Some(chain) = &self.continuation {
            chain.evaluate(&mut text, feature, evaluator);
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Fill, Stroke};
    use std::sync::Arc;
    use symbology_continuation::{Fragments, update_or_continue};
    use symbology_filter::FeatureEvaluator;
    use symbology_types::SimpleFeature;

    fn dynamic_line() -> Symbolizer<LineStyling> {
        let mut base = LineStyling::default();
        let chain = update_or_continue(
            Fragments::from_expression(Expression::property("w")),
            &SourceLocation::default(),
            &mut base,
            |s: &mut LineStyling, v: &str| -> Result<(), String> {
                Arc::make_mut(&mut s.stroke).width = v.parse().map_err(|_| v.to_string())?;
                Ok(())
            },
            None,
        );
        Symbolizer::new(SymbolizerId(1), base, chain, SourceLocation::default())
    }

    #[test]
    fn test_static_symbolizer_borrows_base() {
        let sym = Symbolizer::new(
            SymbolizerId(0),
            PolygonStyling { fill: Some(Arc::new(Fill::default())), ..Default::default() },
            None,
            SourceLocation::default(),
        );
        let out = sym.evaluate(&SimpleFeature::default(), &FeatureEvaluator);
        assert!(matches!(out, Cow::Borrowed(_)));
    }

    #[test]
    fn test_dynamic_symbolizer_leaves_template_untouched() {
        let sym = dynamic_line();
        let feature = SimpleFeature::default().with("w", "4");
        let out = sym.evaluate(&feature, &FeatureEvaluator);
        assert_eq!(out.stroke.width, 4.0);
        assert_eq!(sym.base.stroke.width, Stroke::default().width);
    }

    #[test]
    fn test_label_evaluation() {
        let mut fragments = Fragments::default();
        fragments.push_text("No. ");
        fragments.push_expression(Expression::property("n"));
        let mut base = String::new();
        let continuation = symbology_continuation::string_chain(fragments.finish(), &SourceLocation::default(), &mut base);
        let label = Label { base, continuation, location: SourceLocation::default() };
        let feature = SimpleFeature::default().with("n", 7.0);
        assert_eq!(label.evaluate(&feature, &FeatureEvaluator), "No. 7");
        assert_eq!(label.evaluate(&feature, &FeatureEvaluator), "No. 7");
    }
}
