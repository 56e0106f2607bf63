use symbology_filter::{Evaluator, Expression, evaluate};
use symbology_types::{Feature, SourceLocation};

/// A piece of element content: literal text or an embedded expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Fragment {
    Text(String),
    Expression(Expression),
}

/// The ordered content of one element, with adjacent text merged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fragments {
    parts: Vec<Fragment>,
}

impl Fragments {
    pub fn from_text(text: &str) -> Self {
        let mut fragments = Self::default();
        fragments.push_text(text);
        fragments.finish()
    }

    pub fn from_expression(expr: Expression) -> Self {
        Self { parts: vec![Fragment::Expression(expr)] }
    }

    /// Appends text, merging with a preceding text fragment.
    /// Whitespace-only text between other content is formatting and dropped.
    pub fn push_text(&mut self, text: &str) {
        if text.trim().is_empty() {
            return;
        }
        match self.parts.last_mut() {
            Some(Fragment::Text(prev)) => prev.push_str(text),
            _ => self.parts.push(Fragment::Text(text.to_string())),
        }
    }

    pub fn push_expression(&mut self, expr: Expression) {
        self.parts.push(Fragment::Expression(expr));
    }

    /// Trims the leading whitespace of the first fragment and the trailing
    /// whitespace of the last one.
    pub fn finish(mut self) -> Self {
        if let Some(Fragment::Text(first)) = self.parts.first_mut() {
            *first = first.trim_start().to_string();
        }
        if let Some(Fragment::Text(last)) = self.parts.last_mut() {
            *last = last.trim_end().to_string();
        }
        self
    }

    pub fn parts(&self) -> &[Fragment] {
        &self.parts
    }

    pub fn is_literal(&self) -> bool {
        self.parts.iter().all(|p| matches!(p, Fragment::Text(_)))
    }

    /// The concatenated text if no fragment is an expression.
    pub fn literal_text(&self) -> Option<String> {
        if !self.is_literal() {
            return None;
        }
        Some(
            self.parts
                .iter()
                .filter_map(|p| match p {
                    Fragment::Text(t) => Some(t.as_str()),
                    Fragment::Expression(_) => None,
                })
                .collect(),
        )
    }

    /// Evaluates every expression against `feature` and concatenates the
    /// results with the literal text in source order.
    ///
    /// Each expression contributes the string form of its first value. No
    /// value, or an evaluation error, contributes nothing and is logged.
    pub fn resolve(&self, feature: &dyn Feature, evaluator: &dyn Evaluator, location: &SourceLocation) -> String {
        let mut out = String::new();
        for part in &self.parts {
            match part {
                Fragment::Text(text) => out.push_str(text),
                Fragment::Expression(expr) => match evaluate(expr, feature, evaluator) {
                    Ok(values) => match values.first() {
                        Some(value) => out.push_str(&value.to_string()),
                        None => log::warn!(
                            "{}: expression {:?} yielded no value for feature {:?}",
                            location,
                            expr,
                            feature.id()
                        ),
                    },
                    Err(e) => log::warn!(
                        "{}: evaluating {:?} for feature {:?} failed: {}",
                        location,
                        expr,
                        feature.id(),
                        e
                    ),
                },
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use symbology_filter::{FeatureEvaluator, FilterError, PropertyPath};
    use symbology_types::{SimpleFeature, Value};

    struct FailingEvaluator;

    impl Evaluator for FailingEvaluator {
        fn property(&self, _: &dyn Feature, path: &PropertyPath) -> Result<Vec<Value>, FilterError> {
            Err(FilterError::UnresolvedProperty(path.to_string()))
        }
    }

    #[test]
    fn test_adjacent_text_merges() {
        let mut f = Fragments::default();
        f.push_text("a");
        f.push_text("b");
        assert_eq!(f.parts(), &[Fragment::Text("ab".into())]);
    }

    #[test]
    fn test_literal_is_trimmed() {
        assert_eq!(Fragments::from_text("\n  #FF0000 \n").literal_text().as_deref(), Some("#FF0000"));
    }

    #[test]
    fn test_whitespace_between_expressions_dropped() {
        let mut f = Fragments::default();
        f.push_expression(Expression::property("a"));
        f.push_text("\n   ");
        f.push_expression(Expression::property("b"));
        assert_eq!(f.parts().len(), 2);
        assert!(!f.is_literal());
    }

    #[test]
    fn test_first_value_only() {
        let f = Fragments::from_expression(Expression::property("tag"));
        let feature = SimpleFeature::default().with("tag", "x").with("tag", "y");
        assert_eq!(f.resolve(&feature, &FeatureEvaluator, &SourceLocation::default()), "x");
    }

    #[test]
    fn test_empty_result_contributes_nothing() {
        let mut f = Fragments::default();
        f.push_text("[");
        f.push_expression(Expression::property("missing"));
        f.push_text("]");
        let out = f.finish().resolve(&SimpleFeature::default(), &FeatureEvaluator, &SourceLocation::default());
        assert_eq!(out, "[]");
    }

    #[test]
    fn test_evaluator_error_contributes_nothing() {
        let mut f = Fragments::default();
        f.push_text("w=");
        f.push_expression(Expression::property("w"));
        let out = f.resolve(&SimpleFeature::default(), &FailingEvaluator, &SourceLocation::default());
        assert_eq!(out, "w=");
    }
}
