mod common;

use common::{SE, as_line, as_polygon, as_text, compile_rule, evaluate, init_logging};
use symbology::core::SymbologyParser;
use symbology::filter::{Evaluator, FeatureEvaluator, FilterError, PropertyPath};
use symbology::styling::AnySymbolizer;
use symbology::types::{Color, Feature, SimpleFeature, Value};
use symbology::{evaluate_features, features_from_json};

#[test]
fn test_stroke_with_dynamic_width() {
    let style = compile_rule(
        r#"<LineSymbolizer><Stroke>
             <SvgParameter name="stroke">#0000FF</SvgParameter>
             <SvgParameter name="stroke-width"><ogc:PropertyName>w</ogc:PropertyName></SvgParameter>
           </Stroke></LineSymbolizer>"#,
    );
    let resolved = evaluate(&style, &SimpleFeature::default().with("w", "3.5"));
    let stroke = &as_line(&resolved[0]).stroke;
    assert_eq!(stroke.color, Color::rgb(0, 0, 255));
    assert_eq!(stroke.color.a, 1.0);
    assert_eq!(stroke.width, 3.5);
}

#[test]
fn test_evaluation_is_idempotent() {
    let style = compile_rule(
        r#"<LineSymbolizer><Stroke>
             <SvgParameter name="stroke-width"><ogc:PropertyName>w</ogc:PropertyName></SvgParameter>
             <SvgParameter name="stroke-dasharray"><ogc:PropertyName>dash</ogc:PropertyName> 2</SvgParameter>
           </Stroke></LineSymbolizer>
           <TextSymbolizer><Label><ogc:PropertyName>name</ogc:PropertyName></Label></TextSymbolizer>"#,
    );
    let feature = SimpleFeature::default().with("w", 2.0).with("dash", 6.0).with("name", "Elm");
    let first = evaluate(&style, &feature);
    let second = evaluate(&style, &feature);
    assert_eq!(first.len(), 2);
    for (a, b) in first.iter().zip(&second) {
        assert_eq!(a.styling, b.styling);
        assert_eq!(a.label, b.label);
    }
    assert_eq!(as_line(&first[0]).stroke.dasharray, vec![6.0, 2.0]);

    // the compiled template is untouched by evaluation
    match &style.rules[0].symbolizers[0] {
        AnySymbolizer::Line(line) => assert_eq!(line.base.stroke.width, 1.0),
        other => panic!("unexpected symbolizer {:?}", other),
    }
}

#[test]
fn test_mixed_label_content_keeps_source_order() {
    let style = compile_rule(
        r#"<TextSymbolizer><Label>
             Road <ogc:PropertyName>name</ogc:PropertyName> (<ogc:PropertyName>ref</ogc:PropertyName>)
           </Label></TextSymbolizer>"#,
    );
    let feature = SimpleFeature::default().with("name", "Main").with("ref", "E6");
    let resolved = evaluate(&style, &feature);
    assert_eq!(resolved[0].label.as_deref(), Some("Road Main (E6)"));

    // a missing value contributes nothing
    let resolved = evaluate(&style, &SimpleFeature::default().with("name", "Main"));
    assert_eq!(resolved[0].label.as_deref(), Some("Road Main ()"));
}

#[test]
fn test_else_rule_is_used_only_without_match() {
    init_logging();
    let xml = format!(
        r#"<FeatureTypeStyle {SE}>
             <Rule>
               <ogc:Filter><ogc:PropertyIsEqualTo>
                 <ogc:PropertyName>attr</ogc:PropertyName><ogc:Literal>1</ogc:Literal>
               </ogc:PropertyIsEqualTo></ogc:Filter>
               <LineSymbolizer><Name>a</Name></LineSymbolizer>
             </Rule>
             <Rule><ElseFilter/><PolygonSymbolizer><Name>b</Name></PolygonSymbolizer></Rule>
           </FeatureTypeStyle>"#
    );
    let style = SymbologyParser::default().parse_style(&xml, None).unwrap();
    let names = |attr: f64| -> Vec<String> {
        evaluate(&style, &SimpleFeature::default().with("attr", attr))
            .into_iter()
            .filter_map(|r| r.name)
            .collect()
    };
    assert_eq!(names(1.0), vec!["a"]);
    assert_eq!(names(2.0), vec!["b"]);
}

#[test]
fn test_literal_fill_needs_no_continuation() {
    let style = compile_rule(
        r#"<PolygonSymbolizer><Fill><SvgParameter name="fill">#00FF00</SvgParameter></Fill></PolygonSymbolizer>"#,
    );
    let symbolizer = &style.rules[0].symbolizers[0];
    assert!(symbolizer.is_static());
    match symbolizer {
        AnySymbolizer::Polygon(p) => {
            assert_eq!(p.base.fill.as_ref().unwrap().color, Color::parse_hex("#00FF00").unwrap());
        }
        other => panic!("unexpected symbolizer {:?}", other),
    }
}

#[test]
fn test_fill_and_opacity_cascade_in_either_order() {
    let expected = Color::rgb(255, 0, 0).with_alpha(0.5);
    for body in [
        r#"<SvgParameter name="fill">#FF0000</SvgParameter><SvgParameter name="fill-opacity">0.5</SvgParameter>"#,
        r#"<SvgParameter name="fill-opacity">0.5</SvgParameter><SvgParameter name="fill">#FF0000</SvgParameter>"#,
    ] {
        let style = compile_rule(&format!("<PolygonSymbolizer><Fill>{body}</Fill></PolygonSymbolizer>"));
        let resolved = evaluate(&style, &SimpleFeature::default());
        assert_eq!(as_polygon(&resolved[0]).fill.as_ref().unwrap().color, expected);
    }

    for body in [
        r#"<SvgParameter name="fill">#FF0000</SvgParameter><SvgParameter name="fill-opacity"><ogc:PropertyName>o</ogc:PropertyName></SvgParameter>"#,
        r#"<SvgParameter name="fill-opacity"><ogc:PropertyName>o</ogc:PropertyName></SvgParameter><SvgParameter name="fill">#FF0000</SvgParameter>"#,
    ] {
        let style = compile_rule(&format!("<PolygonSymbolizer><Fill>{body}</Fill></PolygonSymbolizer>"));
        let resolved = evaluate(&style, &SimpleFeature::default().with("o", 0.5));
        assert_eq!(as_polygon(&resolved[0]).fill.as_ref().unwrap().color, expected);
    }
}

/// Fails every lookup of the `broken` property.
struct FlakyEvaluator;

impl Evaluator for FlakyEvaluator {
    fn property(&self, feature: &dyn Feature, path: &PropertyPath) -> Result<Vec<Value>, FilterError> {
        if path.last().is_some_and(|step| step.local_name == "broken") {
            return Err(FilterError::UnresolvedProperty(path.to_string()));
        }
        FeatureEvaluator.property(feature, path)
    }
}

#[test]
fn test_evaluator_failure_is_contained() {
    let style = compile_rule(
        r#"<LineSymbolizer><Stroke>
             <SvgParameter name="stroke-width"><ogc:PropertyName>broken</ogc:PropertyName></SvgParameter>
           </Stroke></LineSymbolizer>
           <TextSymbolizer><Label><ogc:PropertyName>name</ogc:PropertyName></Label></TextSymbolizer>"#,
    );
    let first = SimpleFeature::new(Some("f1".to_string())).with("broken", 9.0).with("name", "one");
    let resolved = style.evaluate(&first, &FlakyEvaluator);
    assert_eq!(resolved.len(), 2);
    assert_eq!(as_line(&resolved[0]).stroke.width, 1.0);
    assert_eq!(resolved[1].label.as_deref(), Some("one"));

    let second = SimpleFeature::new(Some("f2".to_string())).with("name", "two");
    let resolved = style.evaluate(&second, &FlakyEvaluator);
    assert_eq!(resolved[1].label.as_deref(), Some("two"));
    assert_eq!(as_text(&resolved[1]).font.size, 10.0);
}

#[test]
fn test_layers_at_scale() {
    init_logging();
    let sld = format!(
        r#"<StyledLayerDescriptor version="1.1.0" {SE}>
             <NamedLayer><Name>water</Name><UserStyle><FeatureTypeStyle>
               <Rule><MaxScaleDenominator>100000</MaxScaleDenominator><PolygonSymbolizer/></Rule>
               <Rule><MinScaleDenominator>100000</MinScaleDenominator><LineSymbolizer/></Rule>
             </FeatureTypeStyle></UserStyle></NamedLayer>
           </StyledLayerDescriptor>"#
    );
    let layers = SymbologyParser::default().parse_layers(&sld, None).unwrap();
    assert_eq!(layers.len(), 1);
    assert_eq!(layers[0].0.as_deref(), Some("water"));

    let features = features_from_json(&serde_json::json!([{"id": "lake"}])).unwrap();
    let detailed = evaluate_features(&layers[0].1, &features, Some(5000.0));
    assert_eq!(detailed[0].feature.as_deref(), Some("lake"));
    assert_eq!(detailed[0].stylings.len(), 1);
    as_polygon(&detailed[0].stylings[0]);

    let overview = evaluate_features(&layers[0].1, &features, Some(500000.0));
    as_line(&overview[0].stylings[0]);
    assert_eq!(evaluate_features(&layers[0].1, &features, None)[0].stylings.len(), 2);
}
