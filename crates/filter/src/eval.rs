//! Evaluation of expressions and filters against features.

use crate::ast::{ComparisonOperator, Expression, Filter, PropertyPath};
use crate::error::FilterError;
use crate::functions;
use std::cmp::Ordering;
use symbology_types::{Feature, Value};

/// Resolves property references and functions for a feature.
///
/// The default [`FeatureEvaluator`] looks properties up by local name; hosts
/// with richer feature models (nested complex properties, schema-aware
/// namespaces) provide their own implementation.
pub trait Evaluator: Send + Sync {
    fn property(&self, feature: &dyn Feature, path: &PropertyPath) -> Result<Vec<Value>, FilterError>;

    fn function(&self, name: &str, args: Vec<Vec<Value>>) -> Result<Vec<Value>, FilterError> {
        functions::evaluate_function(name, args)
    }
}

/// Looks up the last step of a property path by local name.
///
/// `@id` (in any namespace) resolves to the feature id and a `[n]` position
/// predicate selects the n-th value of a multi-valued property.
#[derive(Debug, Default, Clone, Copy)]
pub struct FeatureEvaluator;

impl Evaluator for FeatureEvaluator {
    fn property(&self, feature: &dyn Feature, path: &PropertyPath) -> Result<Vec<Value>, FilterError> {
        let step = path
            .last()
            .ok_or_else(|| FilterError::UnresolvedProperty(path.to_string()))?;

        if step.attribute && step.local_name == "id" {
            return Ok(feature.id().map(|id| vec![Value::from(id)]).unwrap_or_default());
        }

        let Some(values) = feature.property(&step.local_name) else {
            log::trace!("Feature {:?} has no property '{}'", feature.id(), path);
            return Ok(Vec::new());
        };
        match step.index {
            Some(idx) => Ok(idx
                .checked_sub(1)
                .and_then(|i| values.get(i))
                .cloned()
                .into_iter()
                .collect()),
            None => Ok(values.to_vec()),
        }
    }
}

/// Evaluates `expr` for `feature`, yielding zero or more values.
pub fn evaluate(
    expr: &Expression,
    feature: &dyn Feature,
    evaluator: &dyn Evaluator,
) -> Result<Vec<Value>, FilterError> {
    match expr {
        Expression::Literal(v) => Ok(vec![v.clone()]),
        Expression::PropertyName(path) => evaluator.property(feature, path),
        Expression::Arithmetic { left, op, right } => {
            let l = evaluate(left, feature, evaluator)?;
            let r = evaluate(right, feature, evaluator)?;
            let (Some(l), Some(r)) = (l.first(), r.first()) else {
                return Ok(Vec::new());
            };
            let (Some(a), Some(b)) = (l.as_number(), r.as_number()) else {
                return Err(FilterError::TypeError(format!(
                    "cannot apply {:?} to '{}' and '{}'",
                    op, l, r
                )));
            };
            Ok(vec![Value::Number(op.apply(a, b))])
        }
        Expression::Negate(inner) => {
            let values = evaluate(inner, feature, evaluator)?;
            values
                .first()
                .map(|v| {
                    v.as_number()
                        .map(|n| vec![Value::Number(-n)])
                        .ok_or_else(|| FilterError::TypeError(format!("cannot negate '{}'", v)))
                })
                .unwrap_or_else(|| Ok(Vec::new()))
        }
        Expression::Function { name, args } => {
            let args = args
                .iter()
                .map(|a| evaluate(a, feature, evaluator))
                .collect::<Result<Vec<_>, _>>()?;
            evaluator.function(name, args)
        }
    }
}

impl Filter {
    pub fn evaluate(&self, feature: &dyn Feature, evaluator: &dyn Evaluator) -> Result<bool, FilterError> {
        match self {
            Filter::And(parts) => {
                for part in parts {
                    if !part.evaluate(feature, evaluator)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Filter::Or(parts) => {
                for part in parts {
                    if part.evaluate(feature, evaluator)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Filter::Not(inner) => Ok(!inner.evaluate(feature, evaluator)?),
            Filter::Comparison { op, left, right, match_case } => {
                let l = evaluate(left, feature, evaluator)?;
                let r = evaluate(right, feature, evaluator)?;
                // Any pair of values satisfying the comparison matches.
                Ok(l.iter().any(|a| {
                    r.iter().any(|b| {
                        compare(a, b, *match_case).is_some_and(|ord| matches_ordering(*op, ord))
                    })
                }))
            }
            Filter::IsNull(expr) => {
                let values = evaluate(expr, feature, evaluator)?;
                Ok(values.iter().all(Value::is_null))
            }
            Filter::Between { expr, lower, upper } => {
                let values = evaluate(expr, feature, evaluator)?;
                let lower = evaluate(lower, feature, evaluator)?;
                let upper = evaluate(upper, feature, evaluator)?;
                let (Some(lo), Some(hi)) = (lower.first(), upper.first()) else {
                    return Ok(false);
                };
                Ok(values.iter().any(|v| {
                    compare(v, lo, true).is_some_and(|o| o != Ordering::Less)
                        && compare(v, hi, true).is_some_and(|o| o != Ordering::Greater)
                }))
            }
            Filter::Like { expr, pattern, wild_card, single_char, escape_char, match_case } => {
                let values = evaluate(expr, feature, evaluator)?;
                let pattern = compile_like(pattern, *wild_card, *single_char, *escape_char);
                Ok(values.iter().any(|v| {
                    let text: Vec<char> = v.to_string().chars().collect();
                    like_matches(&pattern, &text, !*match_case)
                }))
            }
            Filter::Ids(ids) => Ok(feature.id().is_some_and(|id| ids.iter().any(|i| i == id))),
        }
    }
}

/// Numeric comparison when both sides are numbers, string comparison otherwise.
fn compare(a: &Value, b: &Value, match_case: bool) -> Option<Ordering> {
    if a.is_null() || b.is_null() {
        return None;
    }
    if let (Some(x), Some(y)) = (a.as_number(), b.as_number()) {
        return x.partial_cmp(&y);
    }
    let (x, y) = (a.to_string(), b.to_string());
    if match_case {
        Some(x.cmp(&y))
    } else {
        Some(x.to_lowercase().cmp(&y.to_lowercase()))
    }
}

fn matches_ordering(op: ComparisonOperator, ord: Ordering) -> bool {
    match op {
        ComparisonOperator::EqualTo => ord == Ordering::Equal,
        ComparisonOperator::NotEqualTo => ord != Ordering::Equal,
        ComparisonOperator::LessThan => ord == Ordering::Less,
        ComparisonOperator::LessThanOrEqualTo => ord != Ordering::Greater,
        ComparisonOperator::GreaterThan => ord == Ordering::Greater,
        ComparisonOperator::GreaterThanOrEqualTo => ord != Ordering::Less,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum LikeToken {
    Any,
    One,
    Char(char),
}

fn compile_like(pattern: &str, wild: char, single: char, escape: char) -> Vec<LikeToken> {
    let mut tokens = Vec::new();
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        if c == escape {
            if let Some(next) = chars.next() {
                tokens.push(LikeToken::Char(next));
            }
        } else if c == wild {
            tokens.push(LikeToken::Any);
        } else if c == single {
            tokens.push(LikeToken::One);
        } else {
            tokens.push(LikeToken::Char(c));
        }
    }
    tokens
}

/// Wildcard match in linear passes: on a mismatch, the most recent `Any`
/// absorbs one more character and matching resumes behind it.
fn like_matches(pattern: &[LikeToken], text: &[char], ignore_case: bool) -> bool {
    let same = |c: char, t: char| {
        if ignore_case {
            c.to_lowercase().eq(t.to_lowercase())
        } else {
            c == t
        }
    };
    let (mut p, mut t) = (0, 0);
    let mut resume: Option<(usize, usize)> = None;
    while t < text.len() {
        match pattern.get(p) {
            Some(LikeToken::Any) => {
                resume = Some((p, t));
                p += 1;
            }
            Some(LikeToken::One) => {
                p += 1;
                t += 1;
            }
            Some(LikeToken::Char(c)) if same(*c, text[t]) => {
                p += 1;
                t += 1;
            }
            _ => match resume {
                Some((star, from)) => {
                    resume = Some((star, from + 1));
                    p = star + 1;
                    t = from + 1;
                }
                None => return false,
            },
        }
    }
    pattern[p..].iter().all(|token| *token == LikeToken::Any)
}
