//! Decodes OGC filter encoding (1.0 `ogc:` and 2.0 `fes:`) from `roxmltree` nodes.
//!
//! Elements are matched by local name so both filter encoding versions share
//! one decoder.

use crate::ast::{ArithmeticOperator, ComparisonOperator, Expression, Filter};
use crate::error::FilterError;
use crate::parser::parse_property_path;
use roxmltree::Node;
use symbology_types::Value;

const FRAGMENT_NAMESPACES: &str = concat!(
    r#"xmlns:ogc="http://www.opengis.net/ogc" "#,
    r#"xmlns:fes="http://www.opengis.net/fes/2.0" "#,
    r#"xmlns:se="http://www.opengis.net/se" "#,
    r#"xmlns:gml="http://www.opengis.net/gml""#,
);

/// Returns true if an element with this local name starts an expression.
pub fn is_expression_element(local_name: &str) -> bool {
    matches!(
        local_name,
        "PropertyName" | "ValueReference" | "Literal" | "Add" | "Sub" | "Mul" | "Div" | "Function"
    )
}

fn element_children<'a, 'input>(node: Node<'a, 'input>) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(|n| n.is_element())
}

fn text_content(node: Node) -> String {
    node.descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect()
}

fn malformed(node: Node, message: impl Into<String>) -> FilterError {
    FilterError::Malformed {
        element: node.tag_name().name().to_string(),
        message: message.into(),
    }
}

pub fn decode_expression(node: Node) -> Result<Expression, FilterError> {
    let name = node.tag_name().name();
    match name {
        "PropertyName" | "ValueReference" => {
            let path = parse_property_path(&text_content(node))?;
            Ok(Expression::PropertyName(path))
        }
        "Literal" => Ok(Expression::Literal(Value::String(text_content(node)))),
        "Add" | "Sub" | "Mul" | "Div" => {
            let op = match name {
                "Add" => ArithmeticOperator::Add,
                "Sub" => ArithmeticOperator::Sub,
                "Mul" => ArithmeticOperator::Mul,
                _ => ArithmeticOperator::Div,
            };
            let mut operands = element_children(node);
            let (Some(left), Some(right), None) = (operands.next(), operands.next(), operands.next())
            else {
                return Err(malformed(node, "expected exactly two operands"));
            };
            Ok(Expression::Arithmetic {
                left: Box::new(decode_expression(left)?),
                op,
                right: Box::new(decode_expression(right)?),
            })
        }
        "Function" => {
            let name = node
                .attribute("name")
                .ok_or_else(|| malformed(node, "missing 'name' attribute"))?;
            let args = element_children(node)
                .map(decode_expression)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Expression::Function { name: name.to_string(), args })
        }
        other => Err(FilterError::Unsupported {
            kind: "expression",
            name: other.to_string(),
        }),
    }
}

/// Decodes a serialized expression element such as
/// `<ogc:PropertyName>width</ogc:PropertyName>`. The `ogc`, `fes`, `se` and
/// `gml` prefixes are predeclared.
pub fn decode_expression_fragment(text: &str) -> Result<Expression, FilterError> {
    let wrapped = format!("<fragment {}>{}</fragment>", FRAGMENT_NAMESPACES, text);
    let doc = roxmltree::Document::parse(&wrapped)?;
    let mut elements = element_children(doc.root_element());
    match (elements.next(), elements.next()) {
        (Some(node), None) => decode_expression(node),
        _ => Err(FilterError::ExpressionParse(
            text.to_string(),
            "expected a single expression element".to_string(),
        )),
    }
}

fn comparison_operator(name: &str) -> Option<ComparisonOperator> {
    Some(match name {
        "PropertyIsEqualTo" => ComparisonOperator::EqualTo,
        "PropertyIsNotEqualTo" => ComparisonOperator::NotEqualTo,
        "PropertyIsLessThan" => ComparisonOperator::LessThan,
        "PropertyIsLessThanOrEqualTo" => ComparisonOperator::LessThanOrEqualTo,
        "PropertyIsGreaterThan" => ComparisonOperator::GreaterThan,
        "PropertyIsGreaterThanOrEqualTo" => ComparisonOperator::GreaterThanOrEqualTo,
        _ => return None,
    })
}

fn single_char_attribute(node: Node, names: &[&str], default: char) -> char {
    names
        .iter()
        .find_map(|n| node.attribute(*n))
        .and_then(|v| v.chars().next())
        .unwrap_or(default)
}

fn object_id(node: Node) -> Option<String> {
    match node.tag_name().name() {
        "FeatureId" => node.attribute("fid"),
        "ResourceId" => node.attribute("rid"),
        "GmlObjectId" => node
            .attributes()
            .find(|a| a.name() == "id")
            .map(|a| a.value()),
        _ => None,
    }
    .map(str::to_string)
}

/// Decodes a `Filter` element or a bare filter operator element.
pub fn decode_filter(node: Node) -> Result<Filter, FilterError> {
    let name = node.tag_name().name();

    if name == "Filter" {
        let children: Vec<_> = element_children(node).collect();
        let ids: Vec<String> = children.iter().filter_map(|c| object_id(*c)).collect();
        if !ids.is_empty() && ids.len() == children.len() {
            return Ok(Filter::Ids(ids));
        }
        return match children.as_slice() {
            [only] => decode_filter(*only),
            _ => Err(malformed(node, "expected exactly one filter operator")),
        };
    }

    if let Some(op) = comparison_operator(name) {
        let mut operands = element_children(node);
        let (Some(left), Some(right)) = (operands.next(), operands.next()) else {
            return Err(malformed(node, "expected two operands"));
        };
        return Ok(Filter::Comparison {
            op,
            left: decode_expression(left)?,
            right: decode_expression(right)?,
            match_case: node.attribute("matchCase") != Some("false"),
        });
    }

    match name {
        "And" | "Or" => {
            let parts = element_children(node)
                .map(decode_filter)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(if name == "And" { Filter::And(parts) } else { Filter::Or(parts) })
        }
        "Not" => {
            let inner = element_children(node)
                .next()
                .ok_or_else(|| malformed(node, "missing operand"))?;
            Ok(Filter::Not(Box::new(decode_filter(inner)?)))
        }
        "PropertyIsNull" => {
            let operand = element_children(node)
                .next()
                .ok_or_else(|| malformed(node, "missing operand"))?;
            Ok(Filter::IsNull(decode_expression(operand)?))
        }
        "PropertyIsBetween" => {
            let mut expr = None;
            let mut lower = None;
            let mut upper = None;
            for child in element_children(node) {
                match child.tag_name().name() {
                    "LowerBoundary" => lower = element_children(child).next(),
                    "UpperBoundary" => upper = element_children(child).next(),
                    _ => expr = Some(child),
                }
            }
            let (Some(expr), Some(lower), Some(upper)) = (expr, lower, upper) else {
                return Err(malformed(node, "expected expression, LowerBoundary and UpperBoundary"));
            };
            Ok(Filter::Between {
                expr: decode_expression(expr)?,
                lower: decode_expression(lower)?,
                upper: decode_expression(upper)?,
            })
        }
        "PropertyIsLike" => {
            let mut operands = element_children(node);
            let (Some(expr), Some(pattern)) = (operands.next(), operands.next()) else {
                return Err(malformed(node, "expected expression and pattern"));
            };
            Ok(Filter::Like {
                expr: decode_expression(expr)?,
                pattern: text_content(pattern),
                wild_card: single_char_attribute(node, &["wildCard"], '*'),
                single_char: single_char_attribute(node, &["singleChar"], '?'),
                escape_char: single_char_attribute(node, &["escapeChar", "escape"], '\\'),
                match_case: node.attribute("matchCase") != Some("false"),
            })
        }
        "FeatureId" | "ResourceId" | "GmlObjectId" => Ok(Filter::Ids(object_id(node).into_iter().collect())),
        other => Err(FilterError::Unsupported {
            kind: "filter",
            name: other.to_string(),
        }),
    }
}
