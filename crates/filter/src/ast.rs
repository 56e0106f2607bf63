//! Defines the expression and filter trees decoded from OGC filter encoding.

use std::fmt;
use symbology_types::Value;

/// An expression that evaluates to zero or more values for a feature.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Literal(Value),
    PropertyName(PropertyPath),
    Arithmetic {
        left: Box<Expression>,
        op: ArithmeticOperator,
        right: Box<Expression>,
    },
    Negate(Box<Expression>),
    Function {
        name: String,
        args: Vec<Expression>,
    },
}

impl Expression {
    pub fn property(name: &str) -> Self {
        Expression::PropertyName(PropertyPath::simple(name))
    }

    pub fn literal(value: impl Into<Value>) -> Self {
        Expression::Literal(value.into())
    }

    /// Checks if the expression is a `PropertyName` variant.
    pub fn is_property_name(&self) -> bool {
        matches!(self, Expression::PropertyName(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticOperator {
    Add,
    Sub,
    Mul,
    Div,
}

impl ArithmeticOperator {
    pub fn apply(self, left: f64, right: f64) -> f64 {
        match self {
            ArithmeticOperator::Add => left + right,
            ArithmeticOperator::Sub => left - right,
            ArithmeticOperator::Mul => left * right,
            ArithmeticOperator::Div => left / right,
        }
    }
}

/// A property reference such as `app:name`, `address/street` or `@gml:id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyPath {
    pub steps: Vec<PathStep>,
}

/// One step of a property path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathStep {
    /// Namespace prefix (`app:name`) or namespace URI in Clark notation (`{urn:x}name`).
    pub qualifier: Option<String>,
    pub local_name: String,
    pub attribute: bool,
    /// 1-based position predicate, e.g. `name[2]`.
    pub index: Option<usize>,
}

impl PathStep {
    pub fn new(local_name: impl Into<String>) -> Self {
        Self {
            qualifier: None,
            local_name: local_name.into(),
            attribute: false,
            index: None,
        }
    }
}

impl PropertyPath {
    pub fn simple(local_name: &str) -> Self {
        Self { steps: vec![PathStep::new(local_name)] }
    }

    /// The step that names the property value itself.
    pub fn last(&self) -> Option<&PathStep> {
        self.steps.last()
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            if step.attribute {
                f.write_str("@")?;
            }
            match &step.qualifier {
                Some(q) if q.contains(':') || q.contains('/') => write!(f, "{{{}}}", q)?,
                Some(q) => write!(f, "{}:", q)?,
                None => {}
            }
            f.write_str(&step.local_name)?;
            if let Some(idx) = step.index {
                write!(f, "[{}]", idx)?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOperator {
    EqualTo,
    NotEqualTo,
    LessThan,
    LessThanOrEqualTo,
    GreaterThan,
    GreaterThanOrEqualTo,
}

/// A boolean predicate over a feature.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
    Comparison {
        op: ComparisonOperator,
        left: Expression,
        right: Expression,
        match_case: bool,
    },
    IsNull(Expression),
    Between {
        expr: Expression,
        lower: Expression,
        upper: Expression,
    },
    Like {
        expr: Expression,
        pattern: String,
        wild_card: char,
        single_char: char,
        escape_char: char,
        match_case: bool,
    },
    /// Matches features whose id is one of the listed ids.
    Ids(Vec<String>),
}
