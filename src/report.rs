//! Resolved stylings per feature, in the shape the command line tool prints.

use serde::Serialize;
use symbology_core::{ResolvedStyling, Style};
use symbology_filter::FeatureEvaluator;
use symbology_types::{Feature, SimpleFeature};

#[derive(Debug, Serialize)]
pub struct FeatureStylings {
    pub feature: Option<String>,
    pub stylings: Vec<ResolvedStyling>,
}

#[derive(Debug, Serialize)]
pub struct LayerReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layer: Option<String>,
    pub style: Option<String>,
    pub features: Vec<FeatureStylings>,
}

/// Resolves `style` for every feature. With a `scale`, only the rules whose
/// scale range contains it take part.
pub fn evaluate_features(style: &Style, features: &[SimpleFeature], scale: Option<f64>) -> Vec<FeatureStylings> {
    let scoped;
    let style = match scale {
        Some(scale) => {
            scoped = style.at_scale(scale);
            &scoped
        }
        None => style,
    };
    features
        .iter()
        .map(|feature| FeatureStylings {
            feature: feature.id().map(str::to_string),
            stylings: style.evaluate(feature, &FeatureEvaluator),
        })
        .collect()
}
