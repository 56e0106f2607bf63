//! A `nom`-based parser for property paths and textual arithmetic expressions.
//!
//! Property paths follow the abbreviated XPath syntax used inside
//! `PropertyName`/`ValueReference` elements. The expression grammar on top of
//! them is the arithmetic subset of XPath 1.0, which is what relational style
//! tables store in their `*expr` columns when they are not XML.

use crate::ast::*;
use crate::error::FilterError;
use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{char, digit1, multispace0},
    combinator::{map, map_res, opt, peek, recognize},
    multi::{many0, separated_list0},
    number::complete::double,
    sequence::{delimited, pair, preceded},
};
use symbology_types::Value;

// --- Main Public Parsers ---

pub fn parse_expression(input: &str) -> Result<Expression, FilterError> {
    match expression(input.trim()) {
        Ok(("", expr)) => Ok(expr),
        Ok((rem, _)) => Err(FilterError::ExpressionParse(
            input.to_string(),
            format!("Parser did not consume all input. Remainder: '{}'", rem),
        )),
        Err(e) => Err(FilterError::ExpressionParse(input.to_string(), e.to_string())),
    }
}

pub fn parse_property_path(input: &str) -> Result<PropertyPath, FilterError> {
    match property_path(input.trim()) {
        Ok(("", path)) => Ok(path),
        Ok((rem, _)) => Err(FilterError::ExpressionParse(
            input.to_string(),
            format!("Parser did not consume all input. Remainder: '{}'", rem),
        )),
        Err(e) => Err(FilterError::ExpressionParse(input.to_string(), e.to_string())),
    }
}

// --- Combinators & Helpers ---

fn ws<'a, F, O, E>(inner: F) -> impl Parser<&'a str, Output = O, Error = E>
where
    F: Parser<&'a str, Output = O, Error = E>,
    E: nom::error::ParseError<&'a str>,
{
    delimited(multispace0, inner, multispace0)
}

fn build_binary_expr_parser<'a, F, G>(
    sub_expr_parser: F,
    op_parser: G,
) -> impl FnMut(&'a str) -> IResult<&'a str, Expression>
where
    F: Parser<&'a str, Output = Expression, Error = nom::error::Error<&'a str>> + Clone,
    G: Parser<&'a str, Output = ArithmeticOperator, Error = nom::error::Error<&'a str>> + Clone,
{
    move |input: &str| {
        let (input, mut left) = sub_expr_parser.clone().parse(input)?;
        let (input, remainder) =
            many0(pair(ws(op_parser.clone()), sub_expr_parser.clone())).parse(input)?;

        for (op, right) in remainder {
            left = Expression::Arithmetic {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }
        Ok((input, left))
    }
}

// --- Expression Parsers (in order of precedence) ---

fn expression(input: &str) -> IResult<&str, Expression> {
    additive_expr(input)
}

fn additive_op(input: &str) -> IResult<&str, ArithmeticOperator> {
    alt((
        map(char('+'), |_| ArithmeticOperator::Add),
        map(char('-'), |_| ArithmeticOperator::Sub),
    ))
    .parse(input)
}

fn multiplicative_op(input: &str) -> IResult<&str, ArithmeticOperator> {
    alt((
        map(char('*'), |_| ArithmeticOperator::Mul),
        map(tag("div"), |_| ArithmeticOperator::Div),
    ))
    .parse(input)
}

fn additive_expr(input: &str) -> IResult<&str, Expression> {
    build_binary_expr_parser(multiplicative_expr, additive_op)(input)
}

fn multiplicative_expr(input: &str) -> IResult<&str, Expression> {
    build_binary_expr_parser(unary_expr, multiplicative_op)(input)
}

fn unary_expr(input: &str) -> IResult<&str, Expression> {
    let (i, neg_op) = opt(ws(char('-'))).parse(input)?;
    let (i, expr) = primary_expr(i)?;

    match neg_op {
        Some(_) => Ok((i, Expression::Negate(Box::new(expr)))),
        None => Ok((i, expr)),
    }
}

fn primary_expr(input: &str) -> IResult<&str, Expression> {
    // Names go before numbers: `double` would otherwise accept the `inf`
    // prefix of a property such as `information`.
    ws(alt((
        map(string_literal, |s| Expression::Literal(Value::String(s))),
        function_call,
        delimited(ws(char('(')), expression, ws(char(')'))),
        map(property_path, Expression::PropertyName),
        map(double, |n| Expression::Literal(Value::Number(n))),
    )))
    .parse(input)
}

// --- Literal Parsers ---
fn string_literal(input: &str) -> IResult<&str, String> {
    map(
        alt((
            delimited(char('\''), take_while(|c| c != '\''), char('\'')),
            delimited(char('"'), take_while(|c| c != '"'), char('"')),
        )),
        |s: &str| s.to_string(),
    )
    .parse(input)
}

// --- Name Parsers ---
fn nc_name(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        take_while1(|c: char| c.is_alphabetic() || c == '_'),
        take_while(|c: char| c.is_alphanumeric() || c == '_' || c == '-' || c == '.'),
    ))
    .parse(input)
}

/// `prefix:local`, `{namespace}local` or `local`.
fn qualified_name(input: &str) -> IResult<&str, (Option<String>, String)> {
    alt((
        map(
            pair(delimited(char('{'), take_while(|c| c != '}'), char('}')), nc_name),
            |(ns, local): (&str, &str)| (Some(ns.to_string()), local.to_string()),
        ),
        map(
            pair(nc_name, opt(preceded(char(':'), nc_name))),
            |(first, second): (&str, Option<&str>)| match second {
                Some(local) => (Some(first.to_string()), local.to_string()),
                None => (None, first.to_string()),
            },
        ),
    ))
    .parse(input)
}

// --- Path Parsers ---
fn position_predicate(input: &str) -> IResult<&str, usize> {
    delimited(
        ws(char('[')),
        map_res(digit1, |d: &str| d.parse::<usize>()),
        ws(char(']')),
    )
    .parse(input)
}

fn step(input: &str) -> IResult<&str, PathStep> {
    let (i, attribute) = opt(char('@')).parse(input)?;
    let (i, (qualifier, local_name)) = qualified_name(i)?;
    let (i, index) = opt(position_predicate).parse(i)?;
    Ok((
        i,
        PathStep {
            qualifier,
            local_name,
            attribute: attribute.is_some(),
            index,
        },
    ))
}

fn property_path(input: &str) -> IResult<&str, PropertyPath> {
    // Leading `./` or `/` anchor the path at the feature itself.
    let (i, _) = opt(alt((tag("./"), tag("/")))).parse(input)?;
    let (i, first) = step(i)?;
    let (i, rest) = many0(preceded(char('/'), step)).parse(i)?;

    let mut steps = Vec::with_capacity(rest.len() + 1);
    steps.push(first);
    steps.extend(rest);
    Ok((i, PropertyPath { steps }))
}

// --- Function Call Parser ---
fn function_call(input: &str) -> IResult<&str, Expression> {
    // A function call must be a name followed by '('. The lookahead keeps a
    // plain property name from being consumed as a function.
    let (i, (prefix, local)) = qualified_name(input)?;
    let (i, _) = peek(ws(char('('))).parse(i)?;
    let name = match prefix {
        Some(p) => format!("{}:{}", p, local),
        None => local,
    };

    let (i, _) = multispace0(i)?;
    let (i, args) = delimited(
        char('('),
        separated_list0(ws(char(',')), expression),
        ws(char(')')),
    )
    .parse(i)?;

    Ok((i, Expression::Function { name, args }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_property() {
        assert_eq!(parse_expression("w").unwrap(), Expression::property("w"));
    }

    #[test]
    fn test_parse_qualified_path() {
        let path = parse_property_path("app:road/app:width[1]").unwrap();
        assert_eq!(path.steps.len(), 2);
        assert_eq!(path.steps[0].qualifier.as_deref(), Some("app"));
        assert_eq!(path.steps[1].local_name, "width");
        assert_eq!(path.steps[1].index, Some(1));
    }

    #[test]
    fn test_parse_clark_notation() {
        let path = parse_property_path("{http://www.deegree.org/app}population").unwrap();
        assert_eq!(path.steps[0].qualifier.as_deref(), Some("http://www.deegree.org/app"));
        assert_eq!(path.steps[0].local_name, "population");
    }

    #[test]
    fn test_parse_attribute_step() {
        let path = parse_property_path("@gml:id").unwrap();
        assert!(path.steps[0].attribute);
        assert_eq!(path.steps[0].local_name, "id");
    }

    #[test]
    fn test_parse_arithmetic_precedence() {
        let result = parse_expression("population div 1000 + 1").unwrap();
        match result {
            Expression::Arithmetic { left, op, right } => {
                assert_eq!(op, ArithmeticOperator::Add);
                assert_eq!(*right, Expression::literal(1.0));
                assert!(matches!(
                    *left,
                    Expression::Arithmetic { op: ArithmeticOperator::Div, .. }
                ));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_unary_minus() {
        assert_eq!(
            parse_expression("-5").unwrap(),
            Expression::Negate(Box::new(Expression::literal(5.0)))
        );
    }

    #[test]
    fn test_parse_function_call() {
        let result = parse_expression("strToUpperCase(name)").unwrap();
        assert_eq!(
            result,
            Expression::Function {
                name: "strToUpperCase".into(),
                args: vec![Expression::property("name")],
            }
        );
    }

    #[test]
    fn test_parse_name_with_numeric_prefix_word() {
        assert_eq!(parse_expression("information").unwrap(), Expression::property("information"));
    }

    #[test]
    fn test_parse_string_literal() {
        assert_eq!(parse_expression("'abc'").unwrap(), Expression::literal("abc"));
    }

    #[test]
    fn test_trailing_garbage_is_error() {
        assert!(parse_expression("a b").is_err());
        assert!(parse_property_path("a//b").is_err());
    }
}
