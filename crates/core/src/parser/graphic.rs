use super::context::{CompileContext, elements, href, set_number, text};
use base64::Engine;
use roxmltree::Node;
use std::sync::Arc;
use symbology_continuation::{Chain, Continuation, lift, string_chain};
use symbology_style::Graphic;
use symbology_traits::resolve_href;

/// Where the content of an `ExternalGraphic` or a glyph `Mark` comes from.
pub(crate) enum ResourceRef {
    /// Fetched through the resolver under this key.
    Key(String),
    /// Embedded bytes (`InlineContent` with base64 encoding).
    Inline(Vec<u8>),
    /// Embedded markup (`InlineContent` with xml encoding).
    Markup(String),
    /// A key computed per feature from the `OnlineResource` content.
    Deferred(Arc<Continuation<String>>),
}

impl CompileContext {
    pub(crate) fn graphic(&self, node: Node) -> (Graphic, Chain<Graphic>) {
        let mut base = Graphic::default();
        let mut contn = None;

        for el in elements(node) {
            match el.tag_name().name() {
                "Mark" => {
                    let (mark, nested) = self.mark(el);
                    base.mark = Some(Arc::new(mark));
                    contn = lift(nested, contn, |g: &mut Graphic| g.mark.as_mut().map(Arc::make_mut));
                }
                "ExternalGraphic" => contn = self.external_graphic(el, &mut base, contn),
                "Opacity" => {
                    contn = self.update(el, &mut base, set_number("Opacity", |g: &mut Graphic| &mut g.opacity), contn);
                }
                "Size" => {
                    contn = self.update(el, &mut base, set_number("Size", |g: &mut Graphic| &mut g.size), contn);
                }
                "Rotation" => {
                    contn = self.update(el, &mut base, set_number("Rotation", |g: &mut Graphic| &mut g.rotation), contn);
                }
                "AnchorPoint" => {
                    for axis in elements(el) {
                        contn = match axis.tag_name().name() {
                            "AnchorPointX" => self.update(
                                axis,
                                &mut base,
                                set_number("AnchorPointX", |g: &mut Graphic| &mut g.anchor_point_x),
                                contn,
                            ),
                            "AnchorPointY" => self.update(
                                axis,
                                &mut base,
                                set_number("AnchorPointY", |g: &mut Graphic| &mut g.anchor_point_y),
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
                                &mut base,
                                set_number("DisplacementX", |g: &mut Graphic| &mut g.displacement_x),
                                contn,
                            ),
                            "DisplacementY" => self.update(
                                axis,
                                &mut base,
                                set_number("DisplacementY", |g: &mut Graphic| &mut g.displacement_y),
                                contn,
                            ),
                            _ => {
                                self.unknown_element(axis);
                                contn
                            }
                        };
                    }
                }
                _ => self.unknown_element(el),
            }
        }

        (base, contn)
    }

    /// Reads an `OnlineResource` or `InlineContent` element.
    pub(crate) fn resource_ref(&self, node: Node) -> Option<ResourceRef> {
        match node.tag_name().name() {
            "OnlineResource" => {
                if let Some(href) = href(node) {
                    return Some(ResourceRef::Key(self.resolve(href)));
                }
                let mut key = String::new();
                match string_chain(self.fragments(node), &self.location(node), &mut key) {
                    Some(chain) => Some(ResourceRef::Deferred(chain)),
                    None if key.is_empty() => {
                        self.warn(node, "OnlineResource without a reference");
                        None
                    }
                    None => Some(ResourceRef::Key(self.resolve(&key))),
                }
            }
            "InlineContent" => {
                let encoding = node.attribute("encoding").unwrap_or("base64");
                if encoding.eq_ignore_ascii_case("xml") {
                    return match elements(node).next() {
                        Some(root) => Some(ResourceRef::Markup(node.document().input_text()[root.range()].to_string())),
                        None => {
                            self.warn(node, "empty xml InlineContent");
                            None
                        }
                    };
                }
                if !encoding.eq_ignore_ascii_case("base64") {
                    self.warn(node, format_args!("unsupported InlineContent encoding '{}'", encoding));
                    return None;
                }
                let content: String = text(node).split_whitespace().collect();
                match base64::engine::general_purpose::STANDARD.decode(content) {
                    Ok(bytes) => Some(ResourceRef::Inline(bytes)),
                    Err(e) => {
                        self.warn(node, format_args!("invalid base64 InlineContent: {}", e));
                        None
                    }
                }
            }
            _ => None,
        }
    }

    fn external_graphic(&self, node: Node, base: &mut Graphic, contn: Chain<Graphic>) -> Chain<Graphic> {
        let mut format = None;
        let mut source = None;
        for el in elements(node) {
            match el.tag_name().name() {
                "Format" => format = Some(text(el)),
                "OnlineResource" | "InlineContent" => source = self.resource_ref(el),
                _ => self.unknown_element(el),
            }
        }
        let Some(source) = source else {
            self.warn(node, "ExternalGraphic without content");
            return contn;
        };

        let vector = format.as_deref().is_some_and(is_svg_format);
        match source {
            ResourceRef::Key(key) => {
                if !vector && !key.to_lowercase().ends_with(".svg") {
                    match self.resolver().image(&key) {
                        Ok(image) => base.image = Some(image),
                        Err(e) => self.warn(node, format_args!("external graphic not loaded: {}", e)),
                    }
                }
                base.image_url = Some(key);
            }
            ResourceRef::Inline(bytes) => match crate::resolver::decode_image("InlineContent", &bytes) {
                Ok(image) => base.image = Some(Arc::new(image)),
                Err(e) => self.warn(node, format_args!("external graphic not loaded: {}", e)),
            },
            ResourceRef::Markup(_) => {
                self.warn(node, "inline xml content is only supported for marks");
            }
            ResourceRef::Deferred(chain) => {
                let resolver = self.resolver().clone();
                let system_id = self.system_id().cloned();
                let location = self.location(node);
                return Some(Continuation::new(contn, move |graphic: &mut Graphic, feature, evaluator| {
                    let mut href = String::new();
                    chain.evaluate(&mut href, feature, evaluator);
                    if href.trim().is_empty() {
                        log::warn!("{}: external graphic reference is empty for feature {:?}", location, feature.id());
                        return;
                    }
                    let key = resolve_href(system_id.as_deref(), &href);
                    if !vector && !key.to_lowercase().ends_with(".svg") {
                        match resolver.image(&key) {
                            Ok(image) => graphic.image = Some(image),
                            Err(e) => {
                                log::warn!("{}: external graphic not loaded for feature {:?}: {}", location, feature.id(), e);
                                return;
                            }
                        }
                    }
                    graphic.image_url = Some(key);
                }));
            }
        }
        contn
    }
}

fn is_svg_format(format: &str) -> bool {
    format.to_lowercase().contains("svg")
}
