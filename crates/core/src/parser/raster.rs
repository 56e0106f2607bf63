use super::context::{CompileContext, child, elements, set_number, text};
use super::symbolizer::is_common_element;
use roxmltree::Node;
use std::sync::Arc;
use symbology_continuation::Chain;
use symbology_style::parsers::{parse_bool, parse_interpolation_mode, parse_overlap_behavior};
use symbology_style::{
    AnySymbolizer, Categorize, ChannelSelection, ColorMap, ContrastEnhancement, ImageOutline, Interpolate,
    OverlapBehavior, RasterStyling, SelectedChannel, ShadedRelief,
};
use symbology_types::Color;

impl CompileContext {
    pub(crate) fn raster_styling(&self, node: Node) -> (RasterStyling, Chain<RasterStyling>) {
        let mut base = RasterStyling::default();
        let mut contn = None;

        for el in elements(node) {
            match el.tag_name().name() {
                "Opacity" => {
                    contn = self.update(el, &mut base, set_number("Opacity", |r: &mut RasterStyling| &mut r.opacity), contn);
                }
                "ChannelSelection" => base.channel_selection = Some(self.channel_selection(el)),
                "OverlapBehavior" => base.overlap = self.overlap_behavior(el),
                "ColorMap" => base.color_map = self.color_map(el).map(Arc::new),
                "ContrastEnhancement" => base.contrast_enhancement = Some(self.contrast_enhancement(el)),
                "ShadedRelief" => base.shaded_relief = Some(self.shaded_relief(el)),
                "ImageOutline" => base.image_outline = self.image_outline(el),
                name if is_common_element(name) => {}
                _ => self.unknown_element(el),
            }
        }

        (base, contn)
    }

    fn channel_selection(&self, node: Node) -> ChannelSelection {
        let mut selection = ChannelSelection::default();
        for el in elements(node) {
            let channel = Some(self.selected_channel(el));
            match el.tag_name().name() {
                "RedChannel" => selection.red = channel,
                "GreenChannel" => selection.green = channel,
                "BlueChannel" => selection.blue = channel,
                "GrayChannel" => selection.gray = channel,
                _ => self.unknown_element(el),
            }
        }
        selection
    }

    fn selected_channel(&self, node: Node) -> SelectedChannel {
        let mut channel = SelectedChannel {
            name: String::new(),
            contrast_enhancement: None,
        };
        for el in elements(node) {
            match el.tag_name().name() {
                "SourceChannelName" => channel.name = text(el),
                "ContrastEnhancement" => channel.contrast_enhancement = Some(self.contrast_enhancement(el)),
                _ => self.unknown_element(el),
            }
        }
        channel
    }

    /// SE gives the behavior as text, SLD 1.0 as an empty child element.
    fn overlap_behavior(&self, node: Node) -> OverlapBehavior {
        let keyword = match elements(node).next() {
            Some(el) => el.tag_name().name().to_string(),
            None => text(node),
        };
        parse_overlap_behavior(&keyword).unwrap_or_else(|e| {
            self.warn(node, e);
            OverlapBehavior::LatestOnTop
        })
    }

    fn contrast_enhancement(&self, node: Node) -> ContrastEnhancement {
        let mut enhancement = ContrastEnhancement::default();
        for el in elements(node) {
            match el.tag_name().name() {
                "Normalize" => enhancement.normalize = true,
                "Histogram" => enhancement.histogram = true,
                "GammaValue" => {
                    if let Some(gamma) = self.literal_number(el) {
                        enhancement.gamma = gamma;
                    }
                }
                _ => self.unknown_element(el),
            }
        }
        enhancement
    }

    fn shaded_relief(&self, node: Node) -> ShadedRelief {
        let mut relief = ShadedRelief::default();
        for el in elements(node) {
            let field = match el.tag_name().name() {
                "BrightnessOnly" => {
                    relief.brightness_only = parse_bool(&text(el));
                    continue;
                }
                "ReliefFactor" => &mut relief.relief_factor,
                "AzimuthAngle" => &mut relief.azimuth_angle,
                "IlluminationAngle" => &mut relief.illumination_angle,
                _ => {
                    self.unknown_element(el);
                    continue;
                }
            };
            if let Some(value) = self.literal_number(el) {
                *field = value;
            }
        }
        relief
    }

    fn image_outline(&self, node: Node) -> Option<ImageOutline> {
        let Some(el) = elements(node).next() else {
            self.warn(node, "empty ImageOutline");
            return None;
        };
        match self.symbolizer(el) {
            Some((symbolizer @ (AnySymbolizer::Line(_) | AnySymbolizer::Polygon(_)), _)) => {
                Some(ImageOutline(Arc::new(symbolizer)))
            }
            Some(_) => {
                self.warn(el, "ImageOutline takes a line or polygon symbolizer");
                None
            }
            None => None,
        }
    }

    fn color_map(&self, node: Node) -> Option<ColorMap> {
        if let Some(el) = child(node, "Categorize") {
            return Some(ColorMap::Categorize(self.categorize(el)));
        }
        if let Some(el) = child(node, "Interpolate") {
            return Some(ColorMap::Interpolate(self.interpolate(el)));
        }
        let entries: Vec<_> = elements(node).filter(|n| n.has_tag_name("ColorMapEntry")).collect();
        if entries.is_empty() {
            self.warn(node, "ColorMap without Categorize, Interpolate or ColorMapEntry");
            return None;
        }
        self.color_map_entries(node, &entries)
    }

    fn color(&self, node: Node, value: &str) -> Option<Color> {
        match Color::parse_hex(value.trim()) {
            Ok(color) => Some(color),
            Err(e) => {
                self.warn(node, format_args!("invalid color '{}': {}", value.trim(), e));
                None
            }
        }
    }

    fn fallback_color(&self, node: Node) -> Color {
        node.attribute("fallbackValue")
            .and_then(|v| self.color(node, v))
            .unwrap_or(Color::BLACK.with_alpha(0.0))
    }

    fn categorize(&self, node: Node) -> Categorize {
        let mut values = Vec::new();
        let mut thresholds = Vec::new();
        for el in elements(node) {
            match el.tag_name().name() {
                "Value" => values.extend(self.color(el, &text(el))),
                "Threshold" => thresholds.extend(self.literal_number(el)),
                "LookupValue" => {}
                _ => self.unknown_element(el),
            }
        }
        if values.len() != thresholds.len() + 1 {
            self.warn(
                node,
                format_args!("Categorize has {} values for {} thresholds", values.len(), thresholds.len()),
            );
        }
        Categorize {
            values,
            thresholds,
            fallback: self.fallback_color(node),
            preceding: node
                .attribute("threshholdsBelongTo")
                .or_else(|| node.attribute("thresholdsBelongTo"))
                .is_some_and(|v| v.trim().eq_ignore_ascii_case("preceding")),
        }
    }

    fn interpolate(&self, node: Node) -> Interpolate {
        let mut points = Vec::new();
        for el in elements(node) {
            match el.tag_name().name() {
                "InterpolationPoint" => {
                    let data = child(el, "Data").and_then(|d| self.literal_number(d));
                    let color = child(el, "Value").and_then(|v| self.color(v, &text(v)));
                    match (data, color) {
                        (Some(data), Some(color)) => points.push((data, color)),
                        _ => self.warn(el, "skipping incomplete InterpolationPoint"),
                    }
                }
                "LookupValue" => {}
                _ => self.unknown_element(el),
            }
        }
        points.sort_by(|a, b| a.0.total_cmp(&b.0));
        Interpolate {
            points,
            fallback: self.fallback_color(node),
            mode: node.attribute("mode").map(parse_interpolation_mode).unwrap_or_default(),
        }
    }

    /// SLD 1.0 color maps: `ramp` interpolates, `intervals` and `values` categorize.
    fn color_map_entries(&self, node: Node, entries: &[Node]) -> Option<ColorMap> {
        let mut stops = Vec::new();
        for entry in entries {
            let Some(color) = entry.attribute("color").and_then(|c| self.color(*entry, c)) else {
                continue;
            };
            let opacity = entry.attribute("opacity").and_then(|o| o.trim().parse::<f32>().ok()).unwrap_or(1.0);
            let Some(quantity) = entry.attribute("quantity").and_then(|q| q.trim().parse::<f64>().ok()) else {
                self.warn(*entry, "ColorMapEntry without a numeric quantity");
                continue;
            };
            stops.push((quantity, color.with_alpha(opacity)));
        }
        if stops.is_empty() {
            return None;
        }
        stops.sort_by(|a, b| a.0.total_cmp(&b.0));

        let fallback = Color::BLACK.with_alpha(0.0);
        match node.attribute("type").map(|t| t.trim().to_lowercase()).as_deref() {
            Some("intervals") | Some("values") => {
                let thresholds = stops[..stops.len() - 1].iter().map(|(q, _)| *q).collect();
                Some(ColorMap::Categorize(Categorize {
                    values: stops.iter().map(|(_, c)| *c).collect(),
                    thresholds,
                    fallback,
                    preceding: false,
                }))
            }
            _ => Some(ColorMap::Interpolate(Interpolate {
                points: stops,
                fallback,
                mode: Default::default(),
            })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::ResourceResolver;
    use symbology_filter::FeatureEvaluator;
    use symbology_style::InterpolationMode;
    use symbology_types::SimpleFeature;

    const NS: &str = r#"xmlns="http://www.opengis.net/se" xmlns:ogc="http://www.opengis.net/ogc""#;

    fn compile(xml: &str) -> (RasterStyling, Chain<RasterStyling>) {
        let doc = roxmltree::Document::parse(xml).unwrap();
        let ctx = CompileContext::new(Some("dem.sld"), Arc::new(ResourceResolver::new(None, 4)));
        ctx.raster_styling(doc.root_element())
    }

    #[test]
    fn test_dynamic_opacity() {
        let (raster, contn) = compile(&format!(
            r#"<RasterSymbolizer {NS}><Opacity><ogc:PropertyName>alpha</ogc:PropertyName></Opacity></RasterSymbolizer>"#
        ));
        assert_eq!(raster.opacity, 1.0);
        let mut copy = raster.clone();
        contn
            .unwrap()
            .evaluate(&mut copy, &SimpleFeature::default().with("alpha", 0.25), &FeatureEvaluator);
        assert_eq!(copy.opacity, 0.25);
    }

    #[test]
    fn test_channel_selection_and_contrast() {
        let (raster, contn) = compile(&format!(
            r#"<RasterSymbolizer {NS}>
                 <ChannelSelection>
                   <RedChannel><SourceChannelName>3</SourceChannelName></RedChannel>
                   <GreenChannel><SourceChannelName>2</SourceChannelName>
                     <ContrastEnhancement><Histogram/></ContrastEnhancement></GreenChannel>
                   <BlueChannel><SourceChannelName>1</SourceChannelName></BlueChannel>
                 </ChannelSelection>
                 <ContrastEnhancement><Normalize/><GammaValue>1.5</GammaValue></ContrastEnhancement>
                 <OverlapBehavior>AVERAGE</OverlapBehavior>
               </RasterSymbolizer>"#
        ));
        assert!(contn.is_none());
        let selection = raster.channel_selection.unwrap();
        assert_eq!(selection.red.unwrap().name, "3");
        assert!(selection.green.unwrap().contrast_enhancement.unwrap().histogram);
        assert!(selection.gray.is_none());
        let enhancement = raster.contrast_enhancement.unwrap();
        assert!(enhancement.normalize);
        assert_eq!(enhancement.gamma, 1.5);
        assert_eq!(raster.overlap, OverlapBehavior::Average);
    }

    #[test]
    fn test_sld10_overlap_and_unknown_behavior() {
        let (raster, _) = compile(&format!(
            r#"<RasterSymbolizer {NS}><OverlapBehavior><EARLIEST_ON_TOP/></OverlapBehavior></RasterSymbolizer>"#
        ));
        assert_eq!(raster.overlap, OverlapBehavior::EarliestOnTop);
        let (raster, _) = compile(&format!(
            r#"<RasterSymbolizer {NS}><OverlapBehavior>SIDEWAYS</OverlapBehavior></RasterSymbolizer>"#
        ));
        assert_eq!(raster.overlap, OverlapBehavior::LatestOnTop);
    }

    #[test]
    fn test_categorize_color_map() {
        let (raster, _) = compile(&format!(
            r##"<RasterSymbolizer {NS}><ColorMap>
                 <Categorize fallbackValue="#000000" threshholdsBelongTo="preceding">
                   <LookupValue>Rasterdata</LookupValue>
                   <Value>#00FF00</Value><Threshold>100</Threshold>
                   <Value>#0000FF</Value><Threshold>500</Threshold>
                   <Value>#FFFFFF</Value>
                 </Categorize>
               </ColorMap></RasterSymbolizer>"##
        ));
        let map = raster.color_map.unwrap();
        assert_eq!(map.lookup(50.0), Color::rgb(0, 255, 0));
        assert_eq!(map.lookup(100.0), Color::rgb(0, 255, 0));
        assert_eq!(map.lookup(101.0), Color::rgb(0, 0, 255));
        assert_eq!(map.lookup(900.0), Color::WHITE);
    }

    #[test]
    fn test_interpolate_color_map() {
        let (raster, _) = compile(&format!(
            r##"<RasterSymbolizer {NS}><ColorMap>
                 <Interpolate mode="cosine" fallbackValue="#000000">
                   <InterpolationPoint><Data>10</Data><Value>#FFFFFF</Value></InterpolationPoint>
                   <InterpolationPoint><Data>0</Data><Value>#000000</Value></InterpolationPoint>
                 </Interpolate>
               </ColorMap></RasterSymbolizer>"##
        ));
        match raster.color_map.as_deref() {
            Some(ColorMap::Interpolate(i)) => {
                assert_eq!(i.mode, InterpolationMode::Cosine);
                assert_eq!(i.points[0].0, 0.0);
                assert_eq!(i.lookup(-5.0), Color::BLACK);
            }
            other => panic!("unexpected color map {:?}", other),
        }
    }

    #[test]
    fn test_sld10_color_map_entries() {
        let (raster, _) = compile(&format!(
            r##"<RasterSymbolizer {NS}><ColorMap type="intervals">
                 <ColorMapEntry color="#FF0000" quantity="10"/>
                 <ColorMapEntry color="#00FF00" quantity="20" opacity="0.5"/>
               </ColorMap></RasterSymbolizer>"##
        ));
        let map = raster.color_map.unwrap();
        assert_eq!(map.lookup(5.0), Color::rgb(255, 0, 0));
        assert_eq!(map.lookup(15.0), Color::rgb(0, 255, 0).with_alpha(0.5));
    }

    #[test]
    fn test_shaded_relief_and_outline() {
        let (raster, _) = compile(&format!(
            r##"<RasterSymbolizer {NS}>
                 <ShadedRelief><BrightnessOnly>true</BrightnessOnly><ReliefFactor>30</ReliefFactor></ShadedRelief>
                 <ImageOutline><LineSymbolizer><Stroke><SvgParameter name="stroke">#FF0000</SvgParameter></Stroke></LineSymbolizer></ImageOutline>
               </RasterSymbolizer>"##
        ));
        let relief = raster.shaded_relief.unwrap();
        assert!(relief.brightness_only);
        assert_eq!(relief.relief_factor, 30.0);
        assert_eq!(relief.azimuth_angle, 315.0);
        assert!(matches!(&*raster.image_outline.unwrap().0, AnySymbolizer::Line(_)));
    }
}
