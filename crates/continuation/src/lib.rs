//! Deferred mutation chains.
//!
//! A compiled style keeps every property that depends on feature data as a
//! [`Continuation`]: a linked list of steps that, replayed against a fresh
//! copy of the compiled defaults, produce the styling for one feature.
//! Properties given as plain literals are applied once at compile time and
//! never enter a chain.

mod chain;
mod fragment;

pub use chain::{Chain, Continuation, lift};
pub use fragment::{Fragment, Fragments};

use std::fmt::Display;
use symbology_types::SourceLocation;

/// Applies literal-only content to `base` now, or appends a step that
/// resolves the fragments per feature and applies `updater` then.
///
/// Returns the chain to continue with: `previous` itself on the literal path,
/// a new node with `previous` as parent otherwise. An updater error is logged
/// with `location` and leaves the value as it was.
pub fn update_or_continue<T, E, U>(
    fragments: Fragments,
    location: &SourceLocation,
    base: &mut T,
    updater: U,
    previous: Chain<T>,
) -> Chain<T>
where
    T: 'static,
    E: Display,
    U: Fn(&mut T, &str) -> Result<(), E> + Send + Sync + 'static,
{
    if let Some(text) = fragments.literal_text() {
        if let Err(e) = updater(base, &text) {
            log::warn!("{}: {}", location, e);
        }
        return previous;
    }

    let location = location.clone();
    Some(Continuation::new(previous, move |base, feature, evaluator| {
        let text = fragments.resolve(feature, evaluator, &location);
        if let Err(e) = updater(base, &text) {
            log::warn!("{}: {} (feature {:?})", location, e, feature.id());
        }
    }))
}

/// Shorthand for a chain holding a single dynamic value, as used for labels
/// and deferred resource references.
pub fn string_chain(fragments: Fragments, location: &SourceLocation, base: &mut String) -> Chain<String> {
    update_or_continue(
        fragments,
        location,
        base,
        |buf: &mut String, text: &str| -> Result<(), std::convert::Infallible> {
            buf.push_str(text);
            Ok(())
        },
        None,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use symbology_filter::{Expression, FeatureEvaluator};
    use symbology_types::{Feature, SimpleFeature, Value};

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Line {
        width: f64,
        label: String,
    }

    fn set_width(line: &mut Line, text: &str) -> Result<(), String> {
        line.width = text.trim().parse().map_err(|_| format!("not a number: '{}'", text))?;
        Ok(())
    }

    fn loc() -> SourceLocation {
        SourceLocation::new(Some(Arc::from("test.sld")), 1, 1)
    }

    #[test]
    fn test_literal_applies_immediately_without_chain() {
        let mut base = Line::default();
        let chain = update_or_continue(Fragments::from_text("2.5"), &loc(), &mut base, set_width, None);
        assert!(chain.is_none());
        assert_eq!(base.width, 2.5);
    }

    #[test]
    fn test_literal_keeps_previous_chain() {
        let mut base = Line::default();
        let dynamic = update_or_continue(
            Fragments::from_expression(Expression::property("w")),
            &loc(),
            &mut base,
            set_width,
            None,
        );
        let after = update_or_continue(
            Fragments::from_text("x"),
            &loc(),
            &mut base,
            |l: &mut Line, t: &str| -> Result<(), String> {
                l.label = t.to_string();
                Ok(())
            },
            dynamic.clone(),
        );
        assert!(Arc::ptr_eq(dynamic.as_ref().unwrap(), after.as_ref().unwrap()));
    }

    #[test]
    fn test_dynamic_value_resolves_per_feature() {
        let mut base = Line::default();
        let chain = update_or_continue(
            Fragments::from_expression(Expression::property("w")),
            &loc(),
            &mut base,
            set_width,
            None,
        )
        .unwrap();

        let feature = SimpleFeature::default().with("w", "3.5");
        let mut copy = base.clone();
        chain.evaluate(&mut copy, &feature, &FeatureEvaluator);
        assert_eq!(copy.width, 3.5);
        assert_eq!(base.width, 0.0);
    }

    #[test]
    fn test_mixed_content_concatenates_in_order() {
        let mut fragments = Fragments::default();
        fragments.push_text("Pop: ");
        fragments.push_expression(Expression::property("pop"));
        fragments.push_text(" (");
        fragments.push_expression(Expression::property("year"));
        fragments.push_text(")");

        let mut label = String::new();
        let chain = string_chain(fragments.finish(), &loc(), &mut label).unwrap();
        let feature = SimpleFeature::default().with("pop", 1200.0).with("year", "2020");
        let mut out = label.clone();
        chain.evaluate(&mut out, &feature, &FeatureEvaluator);
        assert_eq!(out, "Pop: 1200 (2020)");
    }

    #[test]
    fn test_updater_failure_keeps_value() {
        let mut base = Line { width: 1.0, ..Line::default() };
        let chain = update_or_continue(
            Fragments::from_expression(Expression::property("w")),
            &loc(),
            &mut base,
            set_width,
            None,
        )
        .unwrap();
        let feature = SimpleFeature::default().with("w", "wide");
        let mut copy = base.clone();
        chain.evaluate(&mut copy, &feature, &FeatureEvaluator);
        assert_eq!(copy.width, 1.0);
    }

    #[test]
    fn test_steps_apply_in_declaration_order() {
        let mut base = Line::default();
        let first = update_or_continue(
            Fragments::from_expression(Expression::property("a")),
            &loc(),
            &mut base,
            set_width,
            None,
        );
        let second = update_or_continue(
            Fragments::from_expression(Expression::property("b")),
            &loc(),
            &mut base,
            set_width,
            first,
        )
        .unwrap();
        assert_eq!(second.depth(), 2);

        let feature = SimpleFeature::default().with("a", 1.0).with("b", 2.0);
        let mut copy = base.clone();
        second.evaluate(&mut copy, &feature, &FeatureEvaluator);
        assert_eq!(copy.width, 2.0);
    }

    #[test]
    fn test_feature_trait_object_is_accepted() {
        let feature: Box<dyn Feature> = Box::new(SimpleFeature::default().with("w", Value::Number(4.0)));
        let mut base = Line::default();
        let chain = update_or_continue(
            Fragments::from_expression(Expression::property("w")),
            &loc(),
            &mut base,
            set_width,
            None,
        )
        .unwrap();
        chain.evaluate(&mut base, feature.as_ref(), &FeatureEvaluator);
        assert_eq!(base.width, 4.0);
    }
}
