use super::context::{CompileContext, elements, href, text};
use super::symbolizer::is_symbolizer_element;
use crate::style::{Rule, RuleFilter, Style};
use roxmltree::Node;
use symbology_filter::decode_filter;

impl CompileContext {
    /// Compiles a `FeatureTypeStyle` or `CoverageStyle`.
    pub(crate) fn feature_type_style(&self, node: Node) -> Style {
        let mut style = Style {
            location: self.location(node),
            ..Style::default()
        };

        for el in elements(node) {
            match el.tag_name().name() {
                "Name" => style.name = Some(text(el)),
                "FeatureTypeName" | "CoverageName" => style.feature_type_name = Some(text(el)),
                "Rule" => self.rule(el, &mut style),
                "OnlineResource" => {
                    self.with_remote(el, "Rule", |ctx, root| ctx.rule(root, &mut style));
                }
                "Description" | "SemanticTypeIdentifier" | "VersionInfo" => {}
                _ => self.unknown_element(el),
            }
        }

        log::debug!(
            "{}: compiled style {:?} with {} rules",
            style.location,
            style.name,
            style.rules.len()
        );
        style
    }

    /// Compiles a `Rule` and appends it, with the labels of its text
    /// symbolizers, to `style`.
    pub(crate) fn rule(&self, node: Node, style: &mut Style) {
        let mut rule = Rule {
            location: self.location(node),
            ..Rule::default()
        };

        for el in elements(node) {
            match el.tag_name().name() {
                "Name" => rule.name = Some(text(el)),
                "Description" => rule.description = self.description(el),
                "Filter" => match decode_filter(el) {
                    Ok(filter) => rule.filter = RuleFilter::Filter(filter),
                    Err(e) => {
                        self.warn(el, format_args!("dropping rule {:?}, its filter is not usable: {}", rule.name, e));
                        return;
                    }
                },
                "ElseFilter" => rule.filter = RuleFilter::Else,
                "MinScaleDenominator" => {
                    if let Some(min) = self.literal_number(el) {
                        rule.scale.min = min;
                    }
                }
                "MaxScaleDenominator" => {
                    if let Some(max) = self.literal_number(el) {
                        rule.scale.max = max;
                    }
                }
                "LegendGraphic" => {}
                name if is_symbolizer_element(name) => {
                    if let Some((symbolizer, label)) = self.symbolizer(el) {
                        if let Some(label) = label {
                            style.labels.insert(symbolizer.id(), label);
                        }
                        rule.symbolizers.push(symbolizer);
                    }
                }
                _ => self.unknown_element(el),
            }
        }

        style.rules.push(rule);
    }

    /// Fetches the document an `OnlineResource` points to and hands its root
    /// element to `compile` if it is an `expected` element.
    pub(crate) fn with_remote<R>(
        &self,
        node: Node,
        expected: &str,
        compile: impl FnOnce(&CompileContext, Node) -> R,
    ) -> Option<R> {
        let Some(reference) = href(node) else {
            self.warn(node, "OnlineResource without xlink:href");
            return None;
        };
        let key = self.resolve(reference);
        let data = match self.resolver().load(&key) {
            Ok(data) => data,
            Err(e) => {
                self.warn(node, format_args!("could not load '{}': {}", key, e));
                return None;
            }
        };
        let Ok(source) = std::str::from_utf8(&data) else {
            self.warn(node, format_args!("'{}' is not valid UTF-8", key));
            return None;
        };
        let doc = match roxmltree::Document::parse(source) {
            Ok(doc) => doc,
            Err(e) => {
                self.warn(node, format_args!("'{}' is not well-formed: {}", key, e));
                return None;
            }
        };
        let root = doc.root_element();
        if root.tag_name().name() != expected {
            self.warn(
                node,
                format_args!("expected '{}' in '{}', found '{}'", expected, key, root.tag_name().name()),
            );
            return None;
        }
        log::debug!("Compiling referenced {} from '{}'", expected, key);
        Some(compile(&self.for_document(&key), root))
    }
}

/// True for the elements `parse_style` accepts as a root.
pub(crate) fn is_style_element(name: &str) -> bool {
    matches!(name, "FeatureTypeStyle" | "CoverageStyle" | "UserStyle") || is_symbolizer_element(name)
}
