use std::fmt;
use std::sync::Arc;
use symbology_filter::Evaluator;
use symbology_types::Feature;

type Step<T> = Box<dyn Fn(&mut T, &dyn Feature, &dyn Evaluator) + Send + Sync>;

/// The optional tail of a continuation chain. `None` means the compiled
/// value is final and can be shared as is.
pub type Chain<T> = Option<Arc<Continuation<T>>>;

/// One deferred mutation, linked to the steps declared before it.
pub struct Continuation<T> {
    parent: Chain<T>,
    step: Step<T>,
}

impl<T> Continuation<T> {
    pub fn new<F>(parent: Chain<T>, step: F) -> Arc<Self>
    where
        F: Fn(&mut T, &dyn Feature, &dyn Evaluator) + Send + Sync + 'static,
    {
        Arc::new(Self { parent, step: Box::new(step) })
    }

    /// Applies the whole chain to `base`, root first.
    ///
    /// `base` must be a per-feature copy of the compiled value; the compiled
    /// template itself is never passed here.
    pub fn evaluate(&self, base: &mut T, feature: &dyn Feature, evaluator: &dyn Evaluator) {
        let mut nodes = Vec::with_capacity(self.depth());
        let mut current = Some(self);
        while let Some(node) = current {
            nodes.push(node);
            current = node.parent.as_deref();
        }
        for node in nodes.into_iter().rev() {
            (node.step)(base, feature, evaluator);
        }
    }

    /// Number of steps in the chain ending at this node.
    pub fn depth(&self) -> usize {
        let mut depth = 1;
        let mut current = self.parent.as_deref();
        while let Some(node) = current {
            depth += 1;
            current = node.parent.as_deref();
        }
        depth
    }
}

impl<T> fmt::Debug for Continuation<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Continuation").field("depth", &self.depth()).finish()
    }
}

/// Surfaces a nested value's chain on its parent.
///
/// `field` selects the nested value inside a per-feature copy of the parent;
/// when it yields `None` (the optional component is absent) the nested steps
/// are skipped. Returns `previous` unchanged if there is nothing to lift.
pub fn lift<P, T, F>(nested: Chain<T>, previous: Chain<P>, field: F) -> Chain<P>
where
    P: 'static,
    T: 'static,
    F: Fn(&mut P) -> Option<&mut T> + Send + Sync + 'static,
{
    let Some(nested) = nested else {
        return previous;
    };
    Some(Continuation::new(previous, move |base, feature, evaluator| {
        if let Some(target) = field(base) {
            nested.evaluate(target, feature, evaluator);
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use symbology_filter::FeatureEvaluator;
    use symbology_types::SimpleFeature;

    #[derive(Debug, Clone, Default)]
    struct Inner {
        trace: Vec<&'static str>,
    }

    #[derive(Debug, Clone, Default)]
    struct Outer {
        inner: Option<Arc<Inner>>,
        trace: Vec<&'static str>,
    }

    fn push(name: &'static str) -> impl Fn(&mut Inner, &dyn Feature, &dyn Evaluator) + Send + Sync {
        move |base: &mut Inner, _: &dyn Feature, _: &dyn Evaluator| base.trace.push(name)
    }

    #[test]
    fn test_parent_runs_before_child() {
        let a = Continuation::new(None, push("a"));
        let b = Continuation::new(Some(a), push("b"));
        let c = Continuation::new(Some(b), push("c"));

        let mut base = Inner::default();
        c.evaluate(&mut base, &SimpleFeature::default(), &FeatureEvaluator);
        assert_eq!(base.trace, vec!["a", "b", "c"]);
        assert_eq!(c.depth(), 3);
    }

    #[test]
    fn test_lift_mutates_copy_of_shared_nested_value() {
        let template = Arc::new(Inner::default());
        let nested = Some(Continuation::new(None, push("nested")));
        let chain = lift(nested, None, |o: &mut Outer| o.inner.as_mut().map(Arc::make_mut)).unwrap();

        let base = Outer { inner: Some(template.clone()), trace: vec![] };
        let mut copy = base.clone();
        chain.evaluate(&mut copy, &SimpleFeature::default(), &FeatureEvaluator);

        assert_eq!(copy.inner.unwrap().trace, vec!["nested"]);
        assert!(template.trace.is_empty());
    }

    #[test]
    fn test_lift_skips_absent_component() {
        let nested = Some(Continuation::new(None, push("nested")));
        let previous = Some(Continuation::new(None, |o: &mut Outer, _: &dyn Feature, _: &dyn Evaluator| {
            o.trace.push("outer")
        }));
        let chain = lift(nested, previous, |o: &mut Outer| o.inner.as_mut().map(Arc::make_mut)).unwrap();

        let mut base = Outer::default();
        chain.evaluate(&mut base, &SimpleFeature::default(), &FeatureEvaluator);
        assert_eq!(base.trace, vec!["outer"]);
        assert!(base.inner.is_none());
    }

    #[test]
    fn test_lift_without_nested_returns_previous() {
        let chain: Chain<Outer> = lift::<Outer, Inner, _>(None, None, |o: &mut Outer| {
            o.inner.as_mut().map(Arc::make_mut)
        });
        assert!(chain.is_none());
    }
}
