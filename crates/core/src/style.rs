//! Compiled styles and their per-feature evaluation.

use serde::Serialize;
use std::collections::HashMap;
use symbology_filter::{Evaluator, Expression, Filter};
use symbology_style::{
    AnySymbolizer, Description, Label, LineStyling, PointStyling, PolygonStyling, RasterStyling, SymbolizerId,
    TextStyling,
};
use symbology_types::{Feature, SourceLocation};

/// Scale denominators a rule applies to. The minimum is inclusive, the
/// maximum exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScaleRange {
    pub min: f64,
    pub max: f64,
}

impl Default for ScaleRange {
    fn default() -> Self {
        Self {
            min: f64::NEG_INFINITY,
            max: f64::INFINITY,
        }
    }
}

impl ScaleRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, scale: f64) -> bool {
        scale >= self.min && scale < self.max
    }
}

/// When a rule contributes its symbolizers.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RuleFilter {
    /// No filter: the rule matches every feature.
    #[default]
    Always,
    Filter(Filter),
    /// Matches only if no earlier rule of the style matched.
    Else,
}

#[derive(Debug, Clone, Default)]
pub struct Rule {
    pub name: Option<String>,
    pub description: Description,
    pub filter: RuleFilter,
    pub scale: ScaleRange,
    pub symbolizers: Vec<AnySymbolizer>,
    pub location: SourceLocation,
}

impl Rule {
    fn matches(&self, feature: &dyn Feature, evaluator: &dyn Evaluator, nothing_matched: bool) -> bool {
        match &self.filter {
            RuleFilter::Always => true,
            RuleFilter::Else => nothing_matched,
            RuleFilter::Filter(filter) => match filter.evaluate(feature, evaluator) {
                Ok(matched) => matched,
                Err(e) => {
                    log::warn!(
                        "{}: evaluating the filter of rule {:?} for feature {:?} failed: {}",
                        self.location,
                        self.name,
                        feature.id(),
                        e
                    );
                    false
                }
            },
        }
    }
}

/// A compiled feature type or coverage style.
#[derive(Debug, Clone, Default)]
pub struct Style {
    pub name: Option<String>,
    pub feature_type_name: Option<String>,
    pub rules: Vec<Rule>,
    /// Label text of each text symbolizer, keyed by symbolizer.
    pub labels: HashMap<SymbolizerId, Label>,
    pub location: SourceLocation,
}

/// The concrete styling a symbolizer produces for one feature.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "styling")]
pub enum Styling {
    Point(PointStyling),
    Line(LineStyling),
    Polygon(PolygonStyling),
    Text(TextStyling),
    Raster(RasterStyling),
}

#[derive(Debug, Clone, Serialize)]
pub struct ResolvedStyling {
    pub symbolizer: SymbolizerId,
    pub name: Option<String>,
    #[serde(flatten)]
    pub styling: Styling,
    /// The geometry property the styling applies to; the default geometry if absent.
    #[serde(skip)]
    pub geometry: Option<Expression>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Style {
    /// A style holding a single unfiltered symbolizer.
    pub fn from_symbolizer(symbolizer: AnySymbolizer, label: Option<Label>) -> Self {
        let mut labels = HashMap::new();
        if let Some(label) = label {
            labels.insert(symbolizer.id(), label);
        }
        Style {
            name: symbolizer.name().map(str::to_string),
            location: symbolizer.location().clone(),
            rules: vec![Rule {
                symbolizers: vec![symbolizer],
                ..Rule::default()
            }],
            labels,
            ..Style::default()
        }
    }

    /// Appends the symbolizers of every rule matching `feature` to `out`, in
    /// rule order. An else rule matches only while `out` is still empty.
    pub fn collect_symbolizers<'a>(
        &'a self,
        feature: &dyn Feature,
        evaluator: &dyn Evaluator,
        out: &mut Vec<&'a AnySymbolizer>,
    ) {
        for rule in &self.rules {
            if rule.matches(feature, evaluator, out.is_empty()) {
                out.extend(rule.symbolizers.iter());
            }
        }
    }

    /// Every symbolizer of the style regardless of filters, as used for legends.
    pub fn symbolizers_for_legend(&self) -> Vec<&AnySymbolizer> {
        self.rules.iter().flat_map(|r| r.symbolizers.iter()).collect()
    }

    /// A copy holding only the rules whose scale range contains `scale`.
    /// Else rules then fall back among the remaining rules only.
    pub fn at_scale(&self, scale: f64) -> Style {
        Style {
            rules: self.rules.iter().filter(|r| r.scale.contains(scale)).cloned().collect(),
            ..self.clone()
        }
    }

    /// Resolves the stylings `feature` is drawn with, in declaration order.
    pub fn evaluate(&self, feature: &dyn Feature, evaluator: &dyn Evaluator) -> Vec<ResolvedStyling> {
        let mut matched = Vec::new();
        self.collect_symbolizers(feature, evaluator, &mut matched);
        matched
            .into_iter()
            .map(|symbolizer| self.resolve(symbolizer, feature, evaluator))
            .collect()
    }

    fn resolve(&self, symbolizer: &AnySymbolizer, feature: &dyn Feature, evaluator: &dyn Evaluator) -> ResolvedStyling {
        let styling = match symbolizer {
            AnySymbolizer::Point(s) => Styling::Point(s.evaluate(feature, evaluator).into_owned()),
            AnySymbolizer::Line(s) => Styling::Line(s.evaluate(feature, evaluator).into_owned()),
            AnySymbolizer::Polygon(s) => Styling::Polygon(s.evaluate(feature, evaluator).into_owned()),
            AnySymbolizer::Text(s) => Styling::Text(s.evaluate(feature, evaluator).into_owned()),
            AnySymbolizer::Raster(s) => Styling::Raster(s.evaluate(feature, evaluator).into_owned()),
        };
        let label = match symbolizer {
            AnySymbolizer::Text(_) => self.labels.get(&symbolizer.id()).map(|l| l.evaluate(feature, evaluator)),
            _ => None,
        };
        ResolvedStyling {
            symbolizer: symbolizer.id(),
            name: symbolizer.name().map(str::to_string),
            styling,
            geometry: symbolizer.geometry().cloned(),
            label,
        }
    }
}
