use super::context::{CompileContext, elements, set_flag, set_number};
use super::symbolizer::is_common_element;
use roxmltree::Node;
use std::sync::Arc;
use symbology_continuation::{Chain, lift, string_chain};
use symbology_style::parsers::parse_perpendicular_offset_type;
use symbology_style::{Font, FontParameter, Halo, Label, LinePlacement, TextStyling};

impl CompileContext {
    pub(crate) fn font(&self, node: Node) -> (Font, Chain<Font>) {
        let mut base = Font::default();
        let mut contn = None;

        for el in elements(node) {
            let name = el.tag_name().name();
            if !name.ends_with("Parameter") {
                self.unknown_element(el);
                continue;
            }
            let param = el.attribute("name").unwrap_or_default();
            match FontParameter::from_name(param) {
                Some(p) => {
                    contn = self.update(el, &mut base, move |f: &mut Font, v: &str| p.apply(f, v), contn);
                }
                None if param == "font-color" => {
                    self.warn(el, "font-color is not supported, use the Fill of the text symbolizer");
                }
                None => self.warn(el, format_args!("found unknown parameter '{}', skipping", param)),
            }
        }

        (base, contn)
    }

    pub(crate) fn halo(&self, node: Node) -> (Halo, Chain<Halo>) {
        let mut base = Halo::default();
        let mut contn = None;

        for el in elements(node) {
            match el.tag_name().name() {
                "Radius" => {
                    contn = self.update(el, &mut base, set_number("Radius", |h: &mut Halo| &mut h.radius), contn);
                }
                "Fill" => {
                    let (fill, nested) = self.fill(el);
                    base.fill = Some(Arc::new(fill));
                    contn = lift(nested, contn, |h: &mut Halo| h.fill.as_mut().map(Arc::make_mut));
                }
                _ => self.unknown_element(el),
            }
        }

        (base, contn)
    }

    pub(crate) fn line_placement(&self, node: Node) -> (LinePlacement, Chain<LinePlacement>) {
        let mut base = LinePlacement::default();
        let mut contn = None;

        for el in elements(node) {
            contn = match el.tag_name().name() {
                "PerpendicularOffset" => {
                    base.perpendicular_offset_type =
                        parse_perpendicular_offset_type(el.attribute("type"), el.attribute("substraction"));
                    self.update(
                        el,
                        &mut base,
                        set_number("PerpendicularOffset", |p: &mut LinePlacement| &mut p.perpendicular_offset),
                        contn,
                    )
                }
                "InitialGap" => self.update(
                    el,
                    &mut base,
                    set_number("InitialGap", |p: &mut LinePlacement| &mut p.initial_gap),
                    contn,
                ),
                "Gap" => self.update(el, &mut base, set_number("Gap", |p: &mut LinePlacement| &mut p.gap), contn),
                "IsRepeated" => self.update(el, &mut base, set_flag(|p: &mut LinePlacement| &mut p.repeat), contn),
                "IsAligned" => self.update(el, &mut base, set_flag(|p: &mut LinePlacement| &mut p.is_aligned), contn),
                "GeneralizeLine" => {
                    self.update(el, &mut base, set_flag(|p: &mut LinePlacement| &mut p.generalize_line), contn)
                }
                "PreventUpsideDown" => {
                    self.update(el, &mut base, set_flag(|p: &mut LinePlacement| &mut p.prevent_upside_down), contn)
                }
                "Center" => self.update(el, &mut base, set_flag(|p: &mut LinePlacement| &mut p.center), contn),
                "WordWise" => self.update(el, &mut base, set_flag(|p: &mut LinePlacement| &mut p.word_wise), contn),
                _ => {
                    self.unknown_element(el);
                    contn
                }
            };
        }

        (base, contn)
    }

    /// Compiles the styling of a `TextSymbolizer` and its label text.
    pub(crate) fn text_styling(&self, node: Node) -> (TextStyling, Chain<TextStyling>, Option<Label>) {
        let mut base = TextStyling::default();
        let mut contn = None;
        let mut label = None;

        for el in elements(node) {
            match el.tag_name().name() {
                "Label" => {
                    let location = self.location(el);
                    let mut text = String::new();
                    let continuation = string_chain(self.fragments(el), &location, &mut text);
                    label = Some(Label { base: text, continuation, location });
                }
                "Font" => {
                    let (font, nested) = self.font(el);
                    base.font = Arc::new(font);
                    contn = lift(nested, contn, |t: &mut TextStyling| Some(Arc::make_mut(&mut t.font)));
                }
                "Fill" => {
                    let (fill, nested) = self.fill(el);
                    base.fill = Some(Arc::new(fill));
                    contn = lift(nested, contn, |t: &mut TextStyling| t.fill.as_mut().map(Arc::make_mut));
                }
                "Halo" => {
                    let (halo, nested) = self.halo(el);
                    base.halo = Some(Arc::new(halo));
                    contn = lift(nested, contn, |t: &mut TextStyling| t.halo.as_mut().map(Arc::make_mut));
                }
                "LabelPlacement" => contn = self.label_placement(el, &mut base, contn),
                name if is_common_element(name) => {}
                _ => self.unknown_element(el),
            }
        }

        (base, contn, label)
    }

    fn label_placement(&self, node: Node, base: &mut TextStyling, mut contn: Chain<TextStyling>) -> Chain<TextStyling> {
        for el in elements(node) {
            match el.tag_name().name() {
                "PointPlacement" => contn = self.point_placement(el, base, contn),
                "LinePlacement" => {
                    let (placement, nested) = self.line_placement(el);
                    base.line_placement = Some(Arc::new(placement));
                    contn = lift(nested, contn, |t: &mut TextStyling| {
                        t.line_placement.as_mut().map(Arc::make_mut)
                    });
                }
                _ => self.unknown_element(el),
            }
        }
        contn
    }

    fn point_placement(&self, node: Node, base: &mut TextStyling, mut contn: Chain<TextStyling>) -> Chain<TextStyling> {
        base.auto = node.attribute("auto").is_some_and(|a| a.trim().eq_ignore_ascii_case("true"));

        for el in elements(node) {
            match el.tag_name().name() {
                "AnchorPoint" => {
                    for axis in elements(el) {
                        contn = match axis.tag_name().name() {
                            "AnchorPointX" => self.update(
                                axis,
                                base,
                                set_number("AnchorPointX", |t: &mut TextStyling| &mut t.anchor_point_x),
                                contn,
                            ),
                            "AnchorPointY" => self.update(
                                axis,
                                base,
                                set_number("AnchorPointY", |t: &mut TextStyling| &mut t.anchor_point_y),
                                contn,
                            ),
                            _ => {
                                self.unknown_element(axis);
                                contn
                            }
                        };
                    }
                }
                "Displacement" => {
                    for axis in elements(el) {
                        contn = match axis.tag_name().name() {
                            "DisplacementX" => self.update(
                                axis,
                                base,
                                set_number("DisplacementX", |t: &mut TextStyling| &mut t.displacement_x),
                                contn,
                            ),
                            "DisplacementY" => self.update(
                                axis,
                                base,
                                set_number("DisplacementY", |t: &mut TextStyling| &mut t.displacement_y),
                                contn,
                            ),
                            _ => {
                                self.unknown_element(axis);
                                contn
                            }
                        };
                    }
                }
                "Rotation" => {
                    contn = self.update(el, base, set_number("Rotation", |t: &mut TextStyling| &mut t.rotation), contn);
                }
                _ => self.unknown_element(el),
            }
        }
        contn
    }
}
