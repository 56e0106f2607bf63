//! State shared by the mutually recursive component compilers.

use crate::resolver::ResourceResolver;
use roxmltree::Node;
use std::cell::Cell;
use std::convert::Infallible;
use std::fmt::Display;
use std::rc::Rc;
use std::sync::Arc;
use symbology_continuation::{Chain, Fragments, update_or_continue};
use symbology_filter::{decode_expression, is_expression_element};
use symbology_style::StyleParseError;
use symbology_style::parsers::parse_number;
use symbology_style::SymbolizerId;
use symbology_traits::resolve_href;
use symbology_types::SourceLocation;

pub(crate) const XLINK_NS: &str = "http://www.w3.org/1999/xlink";

/// One compilation pass over a document and the documents it references.
pub(crate) struct CompileContext {
    system_id: Option<Arc<str>>,
    resolver: Arc<ResourceResolver>,
    next_id: Rc<Cell<u32>>,
}

impl CompileContext {
    pub(crate) fn new(system_id: Option<&str>, resolver: Arc<ResourceResolver>) -> Self {
        Self {
            system_id: system_id.map(Arc::from),
            resolver,
            next_id: Rc::new(Cell::new(0)),
        }
    }

    /// A context for a referenced document. Symbolizer ids keep counting so
    /// they stay unique within the resulting style.
    pub(crate) fn for_document(&self, system_id: &str) -> Self {
        Self {
            system_id: Some(Arc::from(system_id)),
            resolver: self.resolver.clone(),
            next_id: self.next_id.clone(),
        }
    }

    pub(crate) fn system_id(&self) -> Option<&Arc<str>> {
        self.system_id.as_ref()
    }

    pub(crate) fn resolver(&self) -> &Arc<ResourceResolver> {
        &self.resolver
    }

    pub(crate) fn next_symbolizer_id(&self) -> SymbolizerId {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        SymbolizerId(id)
    }

    pub(crate) fn location(&self, node: Node) -> SourceLocation {
        let pos = node.document().text_pos_at(node.range().start);
        SourceLocation::new(self.system_id.clone(), pos.row, pos.col)
    }

    /// Resolves an `xlink:href` against the current document.
    pub(crate) fn resolve(&self, href: &str) -> String {
        resolve_href(self.system_id.as_deref(), href)
    }

    pub(crate) fn unknown_element(&self, node: Node) {
        log::warn!(
            "{}: found unknown element '{}', skipping",
            self.location(node),
            node.tag_name().name()
        );
    }

    pub(crate) fn warn(&self, node: Node, message: impl Display) {
        log::warn!("{}: {}", self.location(node), message);
    }

    /// Collects the mixed content of `node`: text and embedded expressions
    /// in document order.
    pub(crate) fn fragments(&self, node: Node) -> Fragments {
        let mut fragments = Fragments::default();
        for child in node.children() {
            if child.is_text() {
                if let Some(text) = child.text() {
                    fragments.push_text(text);
                }
            } else if child.is_element() {
                let name = child.tag_name().name();
                if !is_expression_element(name) {
                    self.unknown_element(child);
                    continue;
                }
                match decode_expression(child) {
                    Ok(expr) => fragments.push_expression(expr),
                    Err(e) => self.warn(child, format_args!("skipping invalid expression: {}", e)),
                }
            }
        }
        fragments.finish()
    }

    /// Compiles the content of `node` into `base` if it is literal, or into a
    /// new step on `previous` if it depends on the feature.
    pub(crate) fn update<T, E, U>(&self, node: Node, base: &mut T, updater: U, previous: Chain<T>) -> Chain<T>
    where
        T: 'static,
        E: Display,
        U: Fn(&mut T, &str) -> Result<(), E> + Send + Sync + 'static,
    {
        update_or_continue(self.fragments(node), &self.location(node), base, updater, previous)
    }

    /// Parses a literal number, warning and returning `None` if it is not one.
    pub(crate) fn literal_number(&self, node: Node) -> Option<f64> {
        let value = text(node);
        match parse_number(&value) {
            Ok(n) => Some(n),
            Err(_) => {
                self.warn(node, format_args!("'{}' is not a number, ignoring {}", value, node.tag_name().name()));
                None
            }
        }
    }
}

pub(crate) fn elements<'a, 'input>(node: Node<'a, 'input>) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(|n| n.is_element())
}

pub(crate) fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    elements(node).find(|n| n.tag_name().name() == name)
}

/// Trimmed text content of an element, ignoring markup.
pub(crate) fn text(node: Node) -> String {
    node.descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect::<String>()
        .trim()
        .to_string()
}

pub(crate) fn href<'a>(node: Node<'a, '_>) -> Option<&'a str> {
    node.attribute((XLINK_NS, "href"))
        .or_else(|| node.attributes().find(|a| a.name() == "href").map(|a| a.value()))
}

/// An updater that parses a number into the field `field` selects.
pub(crate) fn set_number<T: 'static>(
    property: &'static str,
    field: fn(&mut T) -> &mut f64,
) -> impl Fn(&mut T, &str) -> Result<(), StyleParseError> + Send + Sync + 'static {
    move |base: &mut T, text: &str| {
        *field(base) = parse_number(text).map_err(|_| StyleParseError::InvalidValue {
            property: property.to_string(),
            value: text.trim().to_string(),
        })?;
        Ok(())
    }
}

/// An updater for boolean fields: `true` in any case is true.
pub(crate) fn set_flag<T: 'static>(
    field: fn(&mut T) -> &mut bool,
) -> impl Fn(&mut T, &str) -> Result<(), Infallible> + Send + Sync + 'static {
    move |base: &mut T, text: &str| {
        *field(base) = symbology_style::parsers::parse_bool(text);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use symbology_filter::{Expression, FeatureEvaluator};
    use symbology_types::SimpleFeature;

    fn ctx() -> CompileContext {
        CompileContext::new(Some("styles/roads.sld"), Arc::new(ResourceResolver::new(None, 4)))
    }

    #[derive(Debug, Clone, Default)]
    struct Target {
        value: f64,
    }

    #[test]
    fn test_location_reports_line_and_column() {
        let doc = roxmltree::Document::parse("<a>\n  <b/>\n</a>").unwrap();
        let b = child(doc.root_element(), "b").unwrap();
        let loc = ctx().location(b);
        assert_eq!(loc.line, 2);
        assert_eq!(loc.column, 3);
        assert_eq!(loc.to_string(), "styles/roads.sld, line 2, column 3");
    }

    #[test]
    fn test_fragments_keep_source_order() {
        let doc = roxmltree::Document::parse(
            r#"<Label xmlns:ogc="http://www.opengis.net/ogc">
                 Name: <ogc:PropertyName>name</ogc:PropertyName>!
               </Label>"#,
        )
        .unwrap();
        let fragments = ctx().fragments(doc.root_element());
        assert!(!fragments.is_literal());
        assert_eq!(fragments.parts().len(), 3);
        assert_eq!(fragments.parts()[1], symbology_continuation::Fragment::Expression(Expression::property("name")));
    }

    #[test]
    fn test_invalid_expression_is_skipped() {
        let doc = roxmltree::Document::parse(
            r#"<Size xmlns:ogc="http://www.opengis.net/ogc">4<ogc:Add><ogc:Literal>1</ogc:Literal></ogc:Add></Size>"#,
        )
        .unwrap();
        let fragments = ctx().fragments(doc.root_element());
        assert_eq!(fragments.literal_text().as_deref(), Some("4"));
    }

    #[test]
    fn test_update_literal_and_dynamic() {
        let doc = roxmltree::Document::parse(
            r#"<r xmlns:ogc="http://www.opengis.net/ogc"><a>2.5</a><b><ogc:PropertyName>w</ogc:PropertyName></b></r>"#,
        )
        .unwrap();
        let ctx = ctx();
        let mut base = Target::default();
        let a = child(doc.root_element(), "a").unwrap();
        let b = child(doc.root_element(), "b").unwrap();

        let chain = ctx.update(a, &mut base, set_number("a", |t: &mut Target| &mut t.value), None);
        assert!(chain.is_none());
        assert_eq!(base.value, 2.5);

        let chain = ctx.update(b, &mut base, set_number("b", |t: &mut Target| &mut t.value), chain).unwrap();
        let mut copy = base.clone();
        chain.evaluate(&mut copy, &SimpleFeature::default().with("w", "7"), &FeatureEvaluator);
        assert_eq!(copy.value, 7.0);
        assert_eq!(base.value, 2.5);
    }

    #[test]
    fn test_symbolizer_ids_are_shared_with_referenced_documents() {
        let ctx = ctx();
        assert_eq!(ctx.next_symbolizer_id(), SymbolizerId(0));
        let remote = ctx.for_document("http://example.com/rule.xml");
        assert_eq!(remote.next_symbolizer_id(), SymbolizerId(1));
        assert_eq!(ctx.next_symbolizer_id(), SymbolizerId(2));
    }

    #[test]
    fn test_href_attribute() {
        let doc = roxmltree::Document::parse(
            r#"<OnlineResource xmlns:xlink="http://www.w3.org/1999/xlink" xlink:href="icons/a.png"/>"#,
        )
        .unwrap();
        assert_eq!(href(doc.root_element()), Some("icons/a.png"));
        assert_eq!(ctx().resolve("icons/a.png"), "styles/icons/a.png");
    }
}
