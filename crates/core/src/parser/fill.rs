use super::context::{CompileContext, child, elements, set_number};
use roxmltree::Node;
use std::sync::Arc;
use symbology_continuation::{Chain, lift};
use symbology_style::{Fill, FillParameter, Stroke, StrokeParameter};

impl CompileContext {
    pub(crate) fn fill(&self, node: Node) -> (Fill, Chain<Fill>) {
        let mut base = Fill::default();
        let mut contn = None;

        for el in elements(node) {
            match el.tag_name().name() {
                "GraphicFill" => {
                    let Some(graphic) = child(el, "Graphic") else {
                        self.warn(el, "GraphicFill without Graphic");
                        continue;
                    };
                    let (graphic, nested) = self.graphic(graphic);
                    base.graphic = Some(Arc::new(graphic));
                    contn = lift(nested, contn, |f: &mut Fill| f.graphic.as_mut().map(Arc::make_mut));
                }
                name if name.ends_with("Parameter") => {
                    let param = el.attribute("name").unwrap_or_default();
                    match FillParameter::from_name(param) {
                        Some(p) => {
                            contn = self.update(el, &mut base, move |f: &mut Fill, v: &str| p.apply(f, v), contn);
                        }
                        None => self.warn(el, format_args!("found unknown parameter '{}', skipping", param)),
                    }
                }
                _ => self.unknown_element(el),
            }
        }

        (base, contn)
    }

    pub(crate) fn stroke(&self, node: Node) -> (Stroke, Chain<Stroke>) {
        let mut base = Stroke::default();
        let mut contn = None;

        for el in elements(node) {
            match el.tag_name().name() {
                "GraphicFill" => {
                    let Some(graphic) = child(el, "Graphic") else {
                        self.warn(el, "GraphicFill without Graphic");
                        continue;
                    };
                    let (graphic, nested) = self.graphic(graphic);
                    base.fill_graphic = Some(Arc::new(graphic));
                    contn = lift(nested, contn, |s: &mut Stroke| s.fill_graphic.as_mut().map(Arc::make_mut));
                }
                "GraphicStroke" => contn = self.graphic_stroke(el, &mut base, contn),
                name if name.ends_with("Parameter") => {
                    let param = el.attribute("name").unwrap_or_default();
                    match StrokeParameter::from_name(param) {
                        Some(p) => {
                            contn = self.update(el, &mut base, move |s: &mut Stroke, v: &str| p.apply(s, v), contn);
                        }
                        None => self.warn(el, format_args!("found unknown parameter '{}', skipping", param)),
                    }
                }
                _ => self.unknown_element(el),
            }
        }

        (base, contn)
    }

    fn graphic_stroke(&self, node: Node, base: &mut Stroke, mut contn: Chain<Stroke>) -> Chain<Stroke> {
        for el in elements(node) {
            match el.tag_name().name() {
                "Graphic" => {
                    let (graphic, nested) = self.graphic(el);
                    base.stroke_graphic = Some(Arc::new(graphic));
                    contn = lift(nested, contn, |s: &mut Stroke| s.stroke_graphic.as_mut().map(Arc::make_mut));
                }
                "InitialGap" => {
                    contn = self.update(
                        el,
                        base,
                        set_number("InitialGap", |s: &mut Stroke| &mut s.stroke_initial_gap),
                        contn,
                    );
                }
                "Gap" => {
                    contn = self.update(
                        el,
                        base,
                        set_number("Gap", |s: &mut Stroke| &mut s.stroke_gap),
                        contn,
                    );
                }
                "PositionPercentage" => {
                    contn = self.update(
                        el,
                        base,
                        set_number("PositionPercentage", |s: &mut Stroke| &mut s.position_percentage),
                        contn,
                    );
                }
                _ => self.unknown_element(el),
            }
        }
        contn
    }
}
