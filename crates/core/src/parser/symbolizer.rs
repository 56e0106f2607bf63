use super::context::{CompileContext, child, elements, set_number, text};
use roxmltree::Node;
use std::sync::Arc;
use symbology_continuation::{Chain, lift};
use symbology_filter::{Expression, decode_expression, is_expression_element};
use symbology_style::parsers::{parse_perpendicular_offset_type, parse_uom};
use symbology_style::{
    AnySymbolizer, Description, Label, LineStyling, PointStyling, PolygonStyling, Symbolizer, Uom,
};

/// Children every symbolizer may carry, read by [`CompileContext::symbolizer`].
pub(crate) fn is_common_element(name: &str) -> bool {
    matches!(name, "Name" | "Description" | "Geometry")
}

pub(crate) fn is_symbolizer_element(name: &str) -> bool {
    matches!(
        name,
        "PointSymbolizer" | "LineSymbolizer" | "PolygonSymbolizer" | "TextSymbolizer" | "RasterSymbolizer"
    )
}

impl CompileContext {
    /// Compiles any symbolizer element. Text symbolizers also yield their
    /// label. Returns `None` for elements that are not symbolizers.
    pub(crate) fn symbolizer(&self, node: Node) -> Option<(AnySymbolizer, Option<Label>)> {
        if !is_symbolizer_element(node.tag_name().name()) {
            self.unknown_element(node);
            return None;
        }
        let id = self.next_symbolizer_id();
        let location = self.location(node);
        let uom = self.uom(node);

        let (symbolizer, label) = match node.tag_name().name() {
            "PointSymbolizer" => {
                let (mut base, contn) = self.point_styling(node);
                base.uom = uom;
                (AnySymbolizer::Point(Symbolizer::new(id, base, contn, location)), None)
            }
            "LineSymbolizer" => {
                let (mut base, contn) = self.line_styling(node);
                base.uom = uom;
                (AnySymbolizer::Line(Symbolizer::new(id, base, contn, location)), None)
            }
            "PolygonSymbolizer" => {
                let (mut base, contn) = self.polygon_styling(node);
                base.uom = uom;
                (AnySymbolizer::Polygon(Symbolizer::new(id, base, contn, location)), None)
            }
            "TextSymbolizer" => {
                let (mut base, contn, label) = self.text_styling(node);
                base.uom = uom;
                (AnySymbolizer::Text(Symbolizer::new(id, base, contn, location)), label)
            }
            "RasterSymbolizer" => {
                let (mut base, contn) = self.raster_styling(node);
                base.uom = uom;
                (AnySymbolizer::Raster(Symbolizer::new(id, base, contn, location)), None)
            }
            _ => return None,
        };

        let name = child(node, "Name").map(text);
        let description = child(node, "Description").map(|d| self.description(d)).unwrap_or_default();
        let geometry = child(node, "Geometry").and_then(|g| self.geometry(g));
        let mut symbolizer = symbolizer;
        match &mut symbolizer {
            AnySymbolizer::Point(s) => set_common(s, name, description, geometry),
            AnySymbolizer::Line(s) => set_common(s, name, description, geometry),
            AnySymbolizer::Polygon(s) => set_common(s, name, description, geometry),
            AnySymbolizer::Text(s) => set_common(s, name, description, geometry),
            AnySymbolizer::Raster(s) => set_common(s, name, description, geometry),
        }
        Some((symbolizer, label))
    }

    fn uom(&self, node: Node) -> Uom {
        match node.attribute("uom") {
            Some(uom) => parse_uom(uom).unwrap_or_else(|e| {
                self.warn(node, e);
                Uom::Pixel
            }),
            None => Uom::Pixel,
        }
    }

    pub(crate) fn description(&self, node: Node) -> Description {
        let mut description = Description::default();
        for el in elements(node) {
            match el.tag_name().name() {
                "Title" => description.title = Some(text(el)),
                "Abstract" => description.abstract_ = Some(text(el)),
                _ => self.unknown_element(el),
            }
        }
        description
    }

    /// The geometry expression of a symbolizer, usually a property name.
    fn geometry(&self, node: Node) -> Option<Expression> {
        let Some(el) = elements(node).find(|n| is_expression_element(n.tag_name().name())) else {
            self.warn(node, "Geometry without an expression");
            return None;
        };
        decode_expression(el)
            .map_err(|e| self.warn(el, format_args!("ignoring invalid geometry expression: {}", e)))
            .ok()
    }

    fn point_styling(&self, node: Node) -> (PointStyling, Chain<PointStyling>) {
        let mut base = PointStyling::default();
        let mut contn = None;
        for el in elements(node) {
            match el.tag_name().name() {
                "Graphic" => {
                    let (graphic, nested) = self.graphic(el);
                    base.graphic = Arc::new(graphic);
                    contn = lift(nested, contn, |p: &mut PointStyling| Some(Arc::make_mut(&mut p.graphic)));
                }
                name if is_common_element(name) => {}
                _ => self.unknown_element(el),
            }
        }
        (base, contn)
    }

    fn line_styling(&self, node: Node) -> (LineStyling, Chain<LineStyling>) {
        let mut base = LineStyling::default();
        let mut contn = None;
        for el in elements(node) {
            match el.tag_name().name() {
                "Stroke" => {
                    let (stroke, nested) = self.stroke(el);
                    base.stroke = Arc::new(stroke);
                    contn = lift(nested, contn, |l: &mut LineStyling| Some(Arc::make_mut(&mut l.stroke)));
                }
                "PerpendicularOffset" => {
                    base.perpendicular_offset_type =
                        parse_perpendicular_offset_type(el.attribute("type"), el.attribute("substraction"));
                    contn = self.update(
                        el,
                        &mut base,
                        set_number("PerpendicularOffset", |l: &mut LineStyling| &mut l.perpendicular_offset),
                        contn,
                    );
                }
                name if is_common_element(name) => {}
                _ => self.unknown_element(el),
            }
        }
        (base, contn)
    }

    fn polygon_styling(&self, node: Node) -> (PolygonStyling, Chain<PolygonStyling>) {
        let mut base = PolygonStyling::default();
        let mut contn = None;
        for el in elements(node) {
            match el.tag_name().name() {
                "Fill" => {
                    let (fill, nested) = self.fill(el);
                    base.fill = Some(Arc::new(fill));
                    contn = lift(nested, contn, |p: &mut PolygonStyling| p.fill.as_mut().map(Arc::make_mut));
                }
                "Stroke" => {
                    let (stroke, nested) = self.stroke(el);
                    base.stroke = Some(Arc::new(stroke));
                    contn = lift(nested, contn, |p: &mut PolygonStyling| p.stroke.as_mut().map(Arc::make_mut));
                }
                "Displacement" => {
                    for axis in elements(el) {
                        contn = match axis.tag_name().name() {
                            "DisplacementX" => self.update(
                                axis,
                                &mut base,
                                set_number("DisplacementX", |p: &mut PolygonStyling| &mut p.displacement_x),
                                contn,
                            ),
                            "DisplacementY" => self.update(
                                axis,
                                &mut base,
                                set_number("DisplacementY", |p: &mut PolygonStyling| &mut p.displacement_y),
                                contn,
                            ),
                            _ => {
                                self.unknown_element(axis);
                                contn
                            }
                        };
                    }
                }
                "PerpendicularOffset" => {
                    base.perpendicular_offset_type =
                        parse_perpendicular_offset_type(el.attribute("type"), el.attribute("substraction"));
                    contn = self.update(
                        el,
                        &mut base,
                        set_number("PerpendicularOffset", |p: &mut PolygonStyling| &mut p.perpendicular_offset),
                        contn,
                    );
                }
                name if is_common_element(name) => {}
                _ => self.unknown_element(el),
            }
        }
        (base, contn)
    }
}

fn set_common<T: Clone>(
    symbolizer: &mut Symbolizer<T>,
    name: Option<String>,
    description: Description,
    geometry: Option<Expression>,
) {
    symbolizer.name = name;
    symbolizer.description = description;
    symbolizer.geometry = geometry;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::ResourceResolver;
    use symbology_filter::FeatureEvaluator;
    use symbology_style::WellKnownKind;
    use symbology_types::{Color, SimpleFeature};

    const NS: &str = r#"xmlns="http://www.opengis.net/se" xmlns:ogc="http://www.opengis.net/ogc""#;

    fn ctx() -> CompileContext {
        CompileContext::new(Some("symbolizers.sld"), Arc::new(ResourceResolver::new(None, 4)))
    }

    fn compile(xml: &str) -> Option<(AnySymbolizer, Option<Label>)> {
        let doc = roxmltree::Document::parse(xml).unwrap();
        ctx().symbolizer(doc.root_element())
    }

    #[test]
    fn test_common_elements() {
        let (symbolizer, _) = compile(&format!(
            r#"<LineSymbolizer {NS} uom="http://www.opengeospatial.org/se/units/metre">
                 <Name>road</Name>
                 <Description><Title>Roads</Title><Abstract>All roads</Abstract></Description>
                 <Geometry><ogc:PropertyName>centerline</ogc:PropertyName></Geometry>
                 <Stroke/>
               </LineSymbolizer>"#
        ))
        .unwrap();
        assert_eq!(symbolizer.name(), Some("road"));
        assert_eq!(symbolizer.geometry(), Some(&Expression::property("centerline")));
        assert_eq!(symbolizer.location().line, 1);
        match symbolizer {
            AnySymbolizer::Line(s) => {
                assert_eq!(s.description.title.as_deref(), Some("Roads"));
                assert_eq!(s.base.uom, Uom::Metre);
            }
            other => panic!("unexpected symbolizer {:?}", other),
        }
    }

    #[test]
    fn test_unknown_uom_is_pixel() {
        let (symbolizer, _) = compile(&format!(r#"<PointSymbolizer {NS} uom="parsec"/>"#)).unwrap();
        match symbolizer {
            AnySymbolizer::Point(s) => {
                assert_eq!(s.base.uom, Uom::Pixel);
                assert_eq!(s.base.graphic.mark.as_ref().unwrap().well_known, WellKnownKind::Square);
            }
            other => panic!("unexpected symbolizer {:?}", other),
        }
    }

    #[test]
    fn test_polygon_without_stroke_has_no_stroke() {
        let (symbolizer, _) = compile(&format!(
            r##"<PolygonSymbolizer {NS}><Fill><SvgParameter name="fill">#AAAAAA</SvgParameter></Fill>
                 <Displacement><DisplacementX>1</DisplacementX><DisplacementY>2</DisplacementY></Displacement>
               </PolygonSymbolizer>"##
        ))
        .unwrap();
        assert!(symbolizer.is_static());
        match symbolizer {
            AnySymbolizer::Polygon(s) => {
                assert!(s.base.stroke.is_none());
                assert_eq!(s.base.fill.unwrap().color, Color::rgb(0xAA, 0xAA, 0xAA));
                assert_eq!((s.base.displacement_x, s.base.displacement_y), (1.0, 2.0));
            }
            other => panic!("unexpected symbolizer {:?}", other),
        }
    }

    #[test]
    fn test_line_symbolizer_dynamic_stroke_keeps_template() {
        let (symbolizer, _) = compile(&format!(
            r##"<LineSymbolizer {NS}>
                 <Stroke>
                   <SvgParameter name="stroke">#0000FF</SvgParameter>
                   <SvgParameter name="stroke-width"><ogc:PropertyName>w</ogc:PropertyName></SvgParameter>
                 </Stroke>
                 <PerpendicularOffset type="edged">2</PerpendicularOffset>
               </LineSymbolizer>"##
        ))
        .unwrap();
        let AnySymbolizer::Line(line) = symbolizer else {
            panic!("expected a line symbolizer");
        };
        assert!(!line.is_static());
        let styling = line.evaluate(&SimpleFeature::default().with("w", "3.5"), &FeatureEvaluator);
        assert_eq!(styling.stroke.width, 3.5);
        assert_eq!(styling.stroke.color, Color::rgb(0, 0, 255));
        assert_eq!(styling.perpendicular_offset, 2.0);
        assert_eq!(line.base.stroke.width, 1.0);
    }

    #[test]
    fn test_text_symbolizer_yields_label() {
        let (symbolizer, label) = compile(&format!(
            r#"<TextSymbolizer {NS}><Label><ogc:PropertyName>name</ogc:PropertyName></Label></TextSymbolizer>"#
        ))
        .unwrap();
        assert!(matches!(symbolizer, AnySymbolizer::Text(_)));
        let label = label.unwrap();
        assert_eq!(label.evaluate(&SimpleFeature::default().with("name", "Oslo"), &FeatureEvaluator), "Oslo");
    }

    #[test]
    fn test_non_symbolizer_element() {
        assert!(compile(&format!(r#"<Rule {NS}/>"#)).is_none());
    }
}
