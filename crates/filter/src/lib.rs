//! Expressions and filters embedded in SLD/SE styles.
//!
//! Styles only need a narrow capability from this crate: decode an OGC
//! expression or filter element, and evaluate it against a [`Feature`]
//! through an [`Evaluator`].

pub mod ast;
pub mod error;
pub mod eval;
pub mod functions;
pub mod parser;
pub mod xml;

pub use ast::{ArithmeticOperator, ComparisonOperator, Expression, Filter, PathStep, PropertyPath};
pub use error::FilterError;
pub use eval::{Evaluator, FeatureEvaluator, evaluate};
pub use parser::{parse_expression, parse_property_path};
pub use symbology_types::{Feature, Value};
pub use xml::{decode_expression, decode_expression_fragment, decode_filter, is_expression_element};
