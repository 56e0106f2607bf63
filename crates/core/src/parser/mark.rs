use super::context::{CompileContext, elements, text};
use super::graphic::ResourceRef;
use roxmltree::Node;
use std::sync::Arc;
use symbology_continuation::{Chain, Continuation, lift};
use symbology_style::parsers::parse_well_known_name;
use symbology_style::{Mark, MarkFont, MarkFontFormat, MarkShape, WellKnownKind};
use symbology_traits::resolve_href;

/// A decoded glyph source.
#[derive(Debug)]
enum MarkSource {
    Shape(MarkShape),
    Font(MarkFont),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum SourceFormat {
    Svg,
    TrueType,
    Type1,
}

impl SourceFormat {
    fn from_mime(format: &str) -> Option<Self> {
        let lower = format.trim().to_lowercase();
        if lower.contains("svg") {
            Some(SourceFormat::Svg)
        } else if lower.contains("ttf") || lower.contains("truetype") {
            Some(SourceFormat::TrueType)
        } else if lower.contains("type1") {
            Some(SourceFormat::Type1)
        } else {
            None
        }
    }
}

impl CompileContext {
    pub(crate) fn mark(&self, node: Node) -> (Mark, Chain<Mark>) {
        let mut base = Mark::default();
        let mut contn = None;
        let mut source = None;
        let mut format = None;
        let mut index = None;

        for el in elements(node) {
            match el.tag_name().name() {
                "WellKnownName" => {
                    base.well_known = parse_well_known_name(&text(el)).unwrap_or_else(|e| {
                        self.warn(el, e);
                        WellKnownKind::Square
                    });
                }
                "OnlineResource" | "InlineContent" => source = self.resource_ref(el).map(|s| (s, el)),
                "Format" => {
                    let mime = text(el);
                    format = SourceFormat::from_mime(&mime);
                    if format.is_none() {
                        self.warn(el, format_args!("unsupported mark format '{}'", mime));
                    }
                }
                "MarkIndex" => index = self.literal_number(el).map(|n| n as i32),
                "Fill" => {
                    let (fill, nested) = self.fill(el);
                    base.fill = Some(Arc::new(fill));
                    contn = lift(nested, contn, |m: &mut Mark| m.fill.as_mut().map(Arc::make_mut));
                }
                "Stroke" => {
                    let (stroke, nested) = self.stroke(el);
                    base.stroke = Some(Arc::new(stroke));
                    contn = lift(nested, contn, |m: &mut Mark| m.stroke.as_mut().map(Arc::make_mut));
                }
                _ => self.unknown_element(el),
            }
        }

        let Some((source, el)) = source else {
            return (base, contn);
        };
        let Some(format) = format else {
            self.warn(el, "mark content without a usable Format, keeping the well known mark");
            return (base, contn);
        };

        let decoded = match source {
            ResourceRef::Key(key) => self
                .resolver()
                .load(&key)
                .map_err(|e| e.to_string())
                .and_then(|data| decode_source(Some(key), format, data, index)),
            ResourceRef::Inline(bytes) => decode_source(None, format, Arc::new(bytes), index),
            ResourceRef::Markup(markup) => match format {
                SourceFormat::Svg => parse_svg(None, &markup).map(MarkSource::Shape),
                _ => Err("inline xml content is only supported for svg marks".to_string()),
            },
            ResourceRef::Deferred(chain) => {
                let resolver = self.resolver().clone();
                let system_id = self.system_id().cloned();
                let location = self.location(el);
                let step = Continuation::new(contn, move |mark: &mut Mark, feature, evaluator| {
                    let mut href = String::new();
                    chain.evaluate(&mut href, feature, evaluator);
                    let key = resolve_href(system_id.as_deref(), &href);
                    let decoded = resolver
                        .load(&key)
                        .map_err(|e| e.to_string())
                        .and_then(|data| decode_source(Some(key), format, data, index));
                    match decoded {
                        Ok(source) => apply_source(mark, source, index),
                        Err(e) => log::warn!("{}: mark not loaded for feature {:?}: {}", location, feature.id(), e),
                    }
                });
                return (base, Some(step));
            }
        };

        match decoded {
            Ok(source) => apply_source(&mut base, source, index),
            Err(e) => self.warn(el, format_args!("mark not loaded: {}", e)),
        }
        (base, contn)
    }
}

fn apply_source(mark: &mut Mark, source: MarkSource, index: Option<i32>) {
    match source {
        MarkSource::Shape(shape) => mark.shape = Some(Arc::new(shape)),
        MarkSource::Font(font) => {
            mark.font = Some(Arc::new(font));
            mark.mark_index = index.unwrap_or(-1);
        }
    }
}

fn decode_source(
    key: Option<String>,
    format: SourceFormat,
    data: Arc<Vec<u8>>,
    index: Option<i32>,
) -> Result<MarkSource, String> {
    match format {
        SourceFormat::Svg => {
            let markup = std::str::from_utf8(&data).map_err(|e| format!("svg is not utf-8: {}", e))?;
            parse_svg(key, markup).map(MarkSource::Shape)
        }
        SourceFormat::TrueType => {
            let face = ttf_parser::Face::parse(&data, 0).map_err(|e| format!("invalid truetype font: {}", e))?;
            let glyph_count = face.number_of_glyphs();
            let family = face
                .names()
                .into_iter()
                .filter(|n| n.name_id == ttf_parser::name_id::FAMILY)
                .find_map(|n| n.to_string());
            match index {
                Some(i) if i >= 0 && (i as u32) < u32::from(glyph_count) => {}
                Some(i) => return Err(format!("mark index {} is outside the {} glyphs of the font", i, glyph_count)),
                None => return Err("truetype mark without MarkIndex".to_string()),
            }
            Ok(MarkSource::Font(MarkFont {
                source: key,
                format: MarkFontFormat::TrueType,
                family,
                glyph_count,
                data,
            }))
        }
        SourceFormat::Type1 => Ok(MarkSource::Font(MarkFont {
            source: key,
            format: MarkFontFormat::Type1,
            family: None,
            glyph_count: 0,
            data,
        })),
    }
}

/// Reads the outline of an SVG glyph: its view box and the data of every path.
pub fn parse_svg(source: Option<String>, markup: &str) -> Result<MarkShape, String> {
    let doc = roxmltree::Document::parse(markup).map_err(|e| format!("invalid svg: {}", e))?;
    let root = doc.root_element();
    if root.tag_name().name() != "svg" {
        return Err(format!("expected an svg document, found '{}'", root.tag_name().name()));
    }
    let view_box = root.attribute("viewBox").and_then(|v| {
        let numbers: Vec<f64> = v
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|s| !s.is_empty())
            .filter_map(|s| s.parse().ok())
            .collect();
        <[f64; 4]>::try_from(numbers).ok()
    });
    let paths = root
        .descendants()
        .filter(|n| n.has_tag_name("path"))
        .filter_map(|n| n.attribute("d"))
        .map(str::to_string)
        .collect();
    Ok(MarkShape { source, view_box, paths })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::ResourceResolver;
    use symbology_filter::FeatureEvaluator;
    use symbology_traits::InMemoryResourceProvider;
    use symbology_types::{Color, SimpleFeature};

    const NS: &str = r#"xmlns="http://www.opengis.net/se" xmlns:ogc="http://www.opengis.net/ogc" xmlns:xlink="http://www.w3.org/1999/xlink""#;

    const ARROW: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 10 10"><g><path d="M0 0 L10 5 L0 10 Z"/></g></svg>"#;

    fn ctx_with(provider: InMemoryResourceProvider) -> CompileContext {
        let resolver = ResourceResolver::new(Some(Arc::new(provider)), 8);
        CompileContext::new(Some("marks.sld"), Arc::new(resolver))
    }

    fn compile(ctx: &CompileContext, xml: &str) -> (Mark, Chain<Mark>) {
        let doc = roxmltree::Document::parse(xml).unwrap();
        ctx.mark(doc.root_element())
    }

    #[test]
    fn test_well_known_mark_with_fill() {
        let ctx = ctx_with(InMemoryResourceProvider::new());
        let (mark, contn) = compile(
            &ctx,
            &format!(
                r##"<Mark {NS}><WellKnownName>circle</WellKnownName>
                     <Fill><SvgParameter name="fill">#FF0000</SvgParameter></Fill></Mark>"##
            ),
        );
        assert!(contn.is_none());
        assert_eq!(mark.well_known, WellKnownKind::Circle);
        assert_eq!(mark.fill.unwrap().color, Color::rgb(255, 0, 0));
        assert!(mark.stroke.is_some());
    }

    #[test]
    fn test_unknown_well_known_name_falls_back_to_square() {
        let ctx = ctx_with(InMemoryResourceProvider::new());
        let (mark, _) = compile(&ctx, &format!(r#"<Mark {NS}><WellKnownName>hexagon</WellKnownName></Mark>"#));
        assert_eq!(mark.well_known, WellKnownKind::Square);
    }

    #[test]
    fn test_svg_mark_from_resource() {
        let provider = InMemoryResourceProvider::new();
        provider.insert("arrow.svg", ARROW.as_bytes().to_vec()).unwrap();
        let ctx = ctx_with(provider);
        let (mark, _) = compile(
            &ctx,
            &format!(
                r#"<Mark {NS}><OnlineResource xlink:href="arrow.svg"/><Format>image/svg+xml</Format></Mark>"#
            ),
        );
        let shape = mark.shape.unwrap();
        assert_eq!(shape.view_box, Some([0.0, 0.0, 10.0, 10.0]));
        assert_eq!(shape.paths, vec!["M0 0 L10 5 L0 10 Z".to_string()]);
        assert_eq!(shape.source.as_deref(), Some("arrow.svg"));
    }

    #[test]
    fn test_inline_xml_svg_mark() {
        let ctx = ctx_with(InMemoryResourceProvider::new());
        let (mark, _) = compile(
            &ctx,
            &format!(r#"<Mark {NS}><InlineContent encoding="xml">{ARROW}</InlineContent><Format>svg</Format></Mark>"#),
        );
        assert_eq!(mark.shape.unwrap().paths.len(), 1);
    }

    #[test]
    fn test_invalid_font_keeps_well_known_mark() {
        let provider = InMemoryResourceProvider::new();
        provider.insert("symbols.ttf", b"not a font".to_vec()).unwrap();
        let ctx = ctx_with(provider);
        let (mark, _) = compile(
            &ctx,
            &format!(
                r#"<Mark {NS}><OnlineResource xlink:href="symbols.ttf"/><Format>ttf</Format><MarkIndex>3</MarkIndex></Mark>"#
            ),
        );
        assert!(mark.font.is_none());
        assert_eq!(mark.mark_index, -1);
        assert_eq!(mark.well_known, WellKnownKind::Square);
    }

    #[test]
    fn test_type1_font_is_kept_raw() {
        let provider = InMemoryResourceProvider::new();
        provider.insert("symbols.pfb", vec![0x80, 0x01, 0x02]).unwrap();
        let ctx = ctx_with(provider);
        let (mark, _) = compile(
            &ctx,
            &format!(
                r#"<Mark {NS}><OnlineResource xlink:href="symbols.pfb"/><Format>type1</Format><MarkIndex>7</MarkIndex></Mark>"#
            ),
        );
        let font = mark.font.unwrap();
        assert_eq!(font.format, MarkFontFormat::Type1);
        assert_eq!(font.data.len(), 3);
        assert_eq!(mark.mark_index, 7);
    }

    #[test]
    fn test_expression_driven_svg_mark() {
        let provider = InMemoryResourceProvider::new();
        provider.insert("arrow.svg", ARROW.as_bytes().to_vec()).unwrap();
        let ctx = ctx_with(provider);
        let (mark, contn) = compile(
            &ctx,
            &format!(
                r#"<Mark {NS}>
                     <OnlineResource><ogc:PropertyName>symbol</ogc:PropertyName>.svg</OnlineResource>
                     <Format>image/svg+xml</Format>
                   </Mark>"#
            ),
        );
        assert!(mark.shape.is_none());
        let mut copy = mark.clone();
        contn
            .unwrap()
            .evaluate(&mut copy, &SimpleFeature::default().with("symbol", "arrow"), &FeatureEvaluator);
        assert_eq!(copy.shape.unwrap().paths.len(), 1);
    }

    #[test]
    fn test_parse_svg_rejects_other_documents() {
        assert!(parse_svg(None, "<html/>").is_err());
        let shape = parse_svg(None, r#"<svg viewBox="0,0,24,24"><path d="M1 1"/><path d="M2 2"/></svg>"#).unwrap();
        assert_eq!(shape.view_box, Some([0.0, 0.0, 24.0, 24.0]));
        assert_eq!(shape.paths.len(), 2);
    }
}
