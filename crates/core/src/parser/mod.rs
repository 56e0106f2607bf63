//! Compiles SLD 1.0 and SE 1.1 documents into [`Style`]s.
//!
//! Elements are matched by local name, so both versions share one set of
//! component compilers. Each compiler returns the value built from literal
//! content together with the continuation replaying the expression-driven
//! parts per feature.

mod context;
mod fill;
mod graphic;
mod mark;
mod raster;
mod rule;
mod symbolizer;
mod text;

pub use mark::parse_svg;

use crate::error::ParseError;
use crate::resolver::{DEFAULT_CACHE_CAPACITY, ResourceResolver};
use crate::style::Style;
use context::{CompileContext, child, elements, text};
use roxmltree::{Document, Node};
use rule::is_style_element;
use serde::Deserialize;
use std::sync::Arc;
use symbology_traits::ResourceProvider;

/// Settings a deployment can load from configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ParserOptions {
    /// Base against which relative references are resolved when a document
    /// is parsed without its own system id.
    pub system_id: Option<String>,
    /// Entries kept in each of the resolver's caches.
    pub image_cache_capacity: usize,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            system_id: None,
            image_cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

#[derive(Debug, Default)]
pub struct SymbologyParserBuilder {
    provider: Option<Arc<dyn ResourceProvider>>,
    options: ParserOptions,
}

impl SymbologyParserBuilder {
    /// The provider external graphics, mark sources and referenced rules are loaded from.
    pub fn with_resource_provider(mut self, provider: Arc<dyn ResourceProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn with_system_id(mut self, system_id: impl Into<String>) -> Self {
        self.options.system_id = Some(system_id.into());
        self
    }

    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.options.image_cache_capacity = capacity;
        self
    }

    pub fn with_options(mut self, options: ParserOptions) -> Self {
        self.options = options;
        self
    }

    pub fn build(self) -> SymbologyParser {
        SymbologyParser {
            resolver: Arc::new(ResourceResolver::new(self.provider, self.options.image_cache_capacity)),
            system_id: self.options.system_id,
        }
    }
}

/// Entry point of the document compiler.
///
/// The parser owns the resource cache, so compiling many styles with one
/// parser fetches each shared graphic once.
#[derive(Debug)]
pub struct SymbologyParser {
    resolver: Arc<ResourceResolver>,
    system_id: Option<String>,
}

impl Default for SymbologyParser {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl SymbologyParser {
    pub fn builder() -> SymbologyParserBuilder {
        SymbologyParserBuilder::default()
    }

    pub fn resolver(&self) -> &Arc<ResourceResolver> {
        &self.resolver
    }

    fn context(&self, system_id: Option<&str>) -> CompileContext {
        CompileContext::new(system_id.or(self.system_id.as_deref()), self.resolver.clone())
    }

    /// Compiles a document whose root is a `FeatureTypeStyle`, `CoverageStyle`,
    /// `UserStyle` or a single symbolizer.
    ///
    /// Only malformed XML and an unexpected root element are errors; problems
    /// inside the style are logged and the affected part is skipped.
    pub fn parse_style(&self, xml: &str, system_id: Option<&str>) -> Result<Style, ParseError> {
        let doc = Document::parse(xml)?;
        let ctx = self.context(system_id);
        let root = doc.root_element();
        let name = root.tag_name().name();
        if !is_style_element(name) {
            return Err(ParseError::NotAStyle {
                element: name.to_string(),
                location: ctx.location(root),
            });
        }

        match name {
            "FeatureTypeStyle" | "CoverageStyle" => Ok(ctx.feature_type_style(root)),
            "UserStyle" => {
                let mut styles = user_style(&ctx, root);
                if styles.len() > 1 {
                    ctx.warn(root, format_args!("using the first of {} feature type styles", styles.len()));
                }
                if styles.is_empty() {
                    ctx.warn(root, "UserStyle without a feature type style");
                    return Ok(Style {
                        name: child(root, "Name").map(text),
                        location: ctx.location(root),
                        ..Style::default()
                    });
                }
                Ok(styles.swap_remove(0))
            }
            _ => match ctx.symbolizer(root) {
                Some((symbolizer, label)) => Ok(Style::from_symbolizer(symbolizer, label)),
                None => Err(ParseError::NotAStyle {
                    element: name.to_string(),
                    location: ctx.location(root),
                }),
            },
        }
    }

    /// Compiles a `StyledLayerDescriptor` into one style per feature type
    /// style, each paired with the name of the layer it belongs to.
    pub fn parse_layers(&self, xml: &str, system_id: Option<&str>) -> Result<Vec<(Option<String>, Style)>, ParseError> {
        let doc = Document::parse(xml)?;
        let ctx = self.context(system_id);
        let root = doc.root_element();
        if root.tag_name().name() != "StyledLayerDescriptor" {
            return Err(ParseError::NotALayerDescriptor {
                element: root.tag_name().name().to_string(),
                location: ctx.location(root),
            });
        }

        let mut layers = Vec::new();
        for layer in elements(root) {
            match layer.tag_name().name() {
                "NamedLayer" | "UserLayer" => {
                    let layer_name = child(layer, "Name").map(text);
                    for el in elements(layer) {
                        match el.tag_name().name() {
                            "UserStyle" => {
                                for style in user_style(&ctx, el) {
                                    layers.push((layer_name.clone(), style));
                                }
                            }
                            "NamedStyle" => log::debug!(
                                "{}: skipping named style reference of layer {:?}",
                                ctx.location(el),
                                layer_name
                            ),
                            _ => {}
                        }
                    }
                }
                "Name" | "Title" | "Abstract" | "Description" => {}
                _ => ctx.unknown_element(layer),
            }
        }
        log::debug!("Compiled {} layer styles", layers.len());
        Ok(layers)
    }
}

/// The feature type styles of a `UserStyle`, in document order. A style
/// without its own name takes the name of the user style.
fn user_style(ctx: &CompileContext, node: Node) -> Vec<Style> {
    let name = child(node, "Name").map(text);
    let mut styles = Vec::new();
    for el in elements(node) {
        let style = match el.tag_name().name() {
            "FeatureTypeStyle" | "CoverageStyle" => Some(ctx.feature_type_style(el)),
            "OnlineResource" => ctx
                .with_remote(el, "FeatureTypeStyle", |remote, root| remote.feature_type_style(root)),
            "Name" | "Title" | "Abstract" | "Description" | "IsDefault" => None,
            _ => {
                ctx.unknown_element(el);
                None
            }
        };
        if let Some(mut style) = style {
            if style.name.is_none() {
                style.name = name.clone();
            }
            styles.push(style);
        }
    }
    styles
}

#[cfg(test)]
mod tests {
    use super::*;
    use symbology_filter::FeatureEvaluator;
    use symbology_style::AnySymbolizer;
    use symbology_types::SimpleFeature;

    const SLD: &str = r#"<StyledLayerDescriptor version="1.0.0"
            xmlns="http://www.opengis.net/sld" xmlns:ogc="http://www.opengis.net/ogc">
          <NamedLayer>
            <Name>roads</Name>
            <UserStyle>
              <Name>road style</Name>
              <FeatureTypeStyle>
                <Rule><LineSymbolizer><Stroke><CssParameter name="stroke-width">2</CssParameter></Stroke></LineSymbolizer></Rule>
              </FeatureTypeStyle>
              <FeatureTypeStyle>
                <Name>casing</Name>
                <Rule><LineSymbolizer/></Rule>
              </FeatureTypeStyle>
            </UserStyle>
          </NamedLayer>
          <NamedLayer><Name>base</Name><NamedStyle><Name>default</Name></NamedStyle></NamedLayer>
        </StyledLayerDescriptor>"#;

    #[test]
    fn test_parse_layers() {
        let layers = SymbologyParser::default().parse_layers(SLD, Some("roads.sld")).unwrap();
        assert_eq!(layers.len(), 2);
        assert_eq!(layers[0].0.as_deref(), Some("roads"));
        assert_eq!(layers[0].1.name.as_deref(), Some("road style"));
        assert_eq!(layers[1].1.name.as_deref(), Some("casing"));
    }

    #[test]
    fn test_parse_style_takes_first_feature_type_style() {
        let xml = SLD
            .split_once("<UserStyle>")
            .and_then(|(_, rest)| rest.split_once("</UserStyle>"))
            .map(|(inner, _)| {
                format!(
                    r#"<UserStyle xmlns="http://www.opengis.net/sld" xmlns:ogc="http://www.opengis.net/ogc">{inner}</UserStyle>"#
                )
            })
            .unwrap();
        let style = SymbologyParser::default().parse_style(&xml, None).unwrap();
        assert_eq!(style.rules.len(), 1);
        match &style.rules[0].symbolizers[0] {
            AnySymbolizer::Line(l) => assert_eq!(l.base.stroke.width, 2.0),
            other => panic!("unexpected symbolizer {:?}", other),
        }
    }

    #[test]
    fn test_bare_symbolizer_becomes_style() {
        let style = SymbologyParser::default()
            .parse_style(
                r#"<PointSymbolizer xmlns="http://www.opengis.net/se"><Name>poi</Name></PointSymbolizer>"#,
                None,
            )
            .unwrap();
        assert_eq!(style.name.as_deref(), Some("poi"));
        assert_eq!(style.evaluate(&SimpleFeature::default(), &FeatureEvaluator).len(), 1);
    }

    #[test]
    fn test_malformed_xml_is_an_error() {
        let err = SymbologyParser::default().parse_style("<FeatureTypeStyle>", None).unwrap_err();
        assert!(matches!(err, ParseError::Xml(_)));
    }

    #[test]
    fn test_unexpected_root_is_an_error() {
        let parser = SymbologyParser::default();
        match parser.parse_style("<Map/>", Some("map.xml")) {
            Err(ParseError::NotAStyle { element, location }) => {
                assert_eq!(element, "Map");
                assert_eq!(location.system_id.as_deref(), Some("map.xml"));
            }
            other => panic!("unexpected result {:?}", other.map(|s| s.name)),
        }
        assert!(matches!(
            parser.parse_layers("<FeatureTypeStyle/>", None),
            Err(ParseError::NotALayerDescriptor { .. })
        ));
    }

    #[test]
    fn test_options_from_json() {
        let options: ParserOptions = serde_json::from_str(r#"{"system_id": "styles/"}"#).unwrap();
        assert_eq!(options.image_cache_capacity, 256);
        let parser = SymbologyParser::builder().with_options(options).build();
        assert_eq!(parser.system_id.as_deref(), Some("styles/"));
    }
}
