use crate::config::ReaderConfig;
use crate::error::LoaderError;
use base64::Engine;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex};
use symbology_continuation::{Chain, Fragments, lift, string_chain, update_or_continue};
use symbology_core::{Rule, ScaleRange, Style, SymbologyParser, decode_image, parse_svg};
use symbology_filter::{Expression, decode_expression_fragment, parse_expression};
use symbology_style::parsers::{
    parse_dasharray, parse_font_style, parse_line_cap, parse_line_join, parse_number, parse_uom,
    parse_well_known_name,
};
use symbology_style::{
    AnySymbolizer, Fill, Font, Graphic, Halo, Label, LinePlacement, LineStyling, Mark, PointStyling, PolygonStyling,
    Stroke, StyleParseError, Symbolizer, SymbolizerId, TextStyling, Uom,
};
use symbology_traits::{ResourceProvider, Row, RowSource, TableQuery};
use symbology_types::{Color, SourceLocation};

const STYLES: &[&str] = &["type", "fk", "minscale", "maxscale", "sld", "name"];
const POINTS: &[&str] = &["uom", "graphic_id"];
const LINES: &[&str] = &["uom", "stroke_id", "perpendicularoffset"];
const POLYGONS: &[&str] = &[
    "uom",
    "fill_id",
    "stroke_id",
    "displacementx",
    "displacementy",
    "perpendicularoffset",
];
const TEXTS: &[&str] = &[
    "labelexpr",
    "uom",
    "font_id",
    "fill_id",
    "rotation",
    "rotationexpr",
    "displacementx",
    "displacementy",
    "anchorx",
    "anchory",
    "lineplacement_id",
    "halo_id",
];
const GRAPHICS: &[&str] = &[
    "size",
    "sizeexpr",
    "rotation",
    "rotationexpr",
    "anchorx",
    "anchory",
    "displacementx",
    "displacementy",
    "wellknownname",
    "svg",
    "base64raster",
    "fill_id",
    "stroke_id",
];
const STROKES: &[&str] = &[
    "color",
    "width",
    "widthexpr",
    "linejoin",
    "linecap",
    "dasharray",
    "dashoffset",
    "stroke_graphic_id",
    "fill_graphic_id",
    "strokegap",
    "strokeinitialgap",
    "positionpercentage",
];
const FILLS: &[&str] = &["color", "graphic_id"];
const FONTS: &[&str] = &["family", "style", "bold", "size"];
const LINE_PLACEMENTS: &[&str] = &["perpendicularoffset", "repeat", "initialgap", "gap", "isaligned", "generalizeline"];
const HALOS: &[&str] = &["fill_id", "radius"];

/// A loaded component together with the continuation replaying its
/// expression columns. Parents hold `value` itself and lift `chain`.
struct Memo<T> {
    value: Arc<T>,
    chain: Chain<T>,
}

impl<T> Clone for Memo<T> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            chain: self.chain.clone(),
        }
    }
}

#[derive(Clone)]
struct TextMemo {
    styling: Memo<TextStyling>,
    label: Option<Label>,
}

/// Everything loaded so far, by table and id.
#[derive(Default)]
struct Pools {
    styles: HashMap<i32, Arc<Style>>,
    points: HashMap<i32, Memo<PointStyling>>,
    lines: HashMap<i32, Memo<LineStyling>>,
    polygons: HashMap<i32, Memo<PolygonStyling>>,
    texts: HashMap<i32, TextMemo>,
    graphics: HashMap<i32, Memo<Graphic>>,
    strokes: HashMap<i32, Memo<Stroke>>,
    fills: HashMap<i32, Memo<Fill>>,
    halos: HashMap<i32, Memo<Halo>>,
    fonts: HashMap<i32, Arc<Font>>,
    line_placements: HashMap<i32, Arc<LinePlacement>>,
    /// Components whose load has started but not finished.
    loading: HashSet<(&'static str, i32)>,
}

/// Reads styles from a relational style store.
///
/// Every component row is read at most once per reader; a row referenced by
/// several parents yields the same `Arc` in each of them. Loading is
/// serialized, so concurrent callers never load a row twice.
pub struct StyleReader {
    source: Arc<dyn RowSource>,
    parser: SymbologyParser,
    config: ReaderConfig,
    pools: Mutex<Pools>,
}

impl fmt::Debug for StyleReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StyleReader")
            .field("source", &self.source.name())
            .field("config", &self.config)
            .finish()
    }
}

impl StyleReader {
    pub fn new(source: Arc<dyn RowSource>, config: ReaderConfig) -> Self {
        Self {
            source,
            parser: build_parser(&config, None),
            config,
            pools: Mutex::new(Pools::default()),
        }
    }

    /// The provider external graphics in stored SLD snippets are loaded from.
    pub fn with_resource_provider(mut self, provider: Arc<dyn ResourceProvider>) -> Self {
        self.parser = build_parser(&self.config, Some(provider));
        self
    }

    /// The style with `id`, or `None` if there is none or it cannot be
    /// loaded. Failures are logged and not remembered, so a later call
    /// tries again.
    pub fn get_style(&self, id: i32) -> Option<Arc<Style>> {
        match self.try_get_style(id) {
            Ok(style) => style,
            Err(e) => {
                log::error!("Unable to read style {} from {}: {}", id, self.source.name(), e);
                None
            }
        }
    }

    /// Like [`get_style`](Self::get_style), but hands out the failure.
    pub fn try_get_style(&self, id: i32) -> Result<Option<Arc<Style>>, LoaderError> {
        self.with_loader(|loader| loader.style(id))
    }

    pub fn graphic(&self, id: i32) -> Option<Arc<Graphic>> {
        self.component("graphics", id, |loader, id| loader.graphic(id).map(|m| m.value))
    }

    pub fn stroke(&self, id: i32) -> Option<Arc<Stroke>> {
        self.component("strokes", id, |loader, id| loader.stroke(id).map(|m| m.value))
    }

    pub fn fill(&self, id: i32) -> Option<Arc<Fill>> {
        self.component("fills", id, |loader, id| loader.fill(id).map(|m| m.value))
    }

    pub fn font(&self, id: i32) -> Option<Arc<Font>> {
        self.component("fonts", id, |loader, id| loader.font(id))
    }

    pub fn halo(&self, id: i32) -> Option<Arc<Halo>> {
        self.component("halos", id, |loader, id| loader.halo(id).map(|m| m.value))
    }

    pub fn line_placement(&self, id: i32) -> Option<Arc<LinePlacement>> {
        self.component("lineplacements", id, |loader, id| loader.line_placement(id))
    }

    fn component<T>(
        &self,
        table: &str,
        id: i32,
        load: impl FnOnce(&mut Loader<'_>, i32) -> Result<Arc<T>, LoaderError>,
    ) -> Option<Arc<T>> {
        match self.with_loader(|loader| load(loader, id)) {
            Ok(value) => Some(value),
            Err(e) => {
                log::error!("Unable to read {}: {}", SourceLocation::row(table, id), e);
                None
            }
        }
    }

    fn with_loader<R>(&self, load: impl FnOnce(&mut Loader<'_>) -> Result<R, LoaderError>) -> Result<R, LoaderError> {
        let mut pools = self.pools.lock().map_err(|_| LoaderError::Poisoned)?;
        let mut loader = Loader {
            source: self.source.as_ref(),
            schema: self.config.schema.as_deref(),
            parser: &self.parser,
            pools: &mut *pools,
        };
        load(&mut loader)
    }
}

fn build_parser(config: &ReaderConfig, provider: Option<Arc<dyn ResourceProvider>>) -> SymbologyParser {
    let mut builder = SymbologyParser::builder().with_cache_capacity(config.cache_capacity);
    if let Some(system_id) = &config.system_id {
        builder = builder.with_system_id(system_id.clone());
    }
    if let Some(provider) = provider {
        builder = builder.with_resource_provider(provider);
    }
    builder.build()
}

/// One loading pass, holding the pools lock.
struct Loader<'a> {
    source: &'a dyn RowSource,
    schema: Option<&'a str>,
    parser: &'a SymbologyParser,
    pools: &'a mut Pools,
}

impl Loader<'_> {
    fn fetch(&self, table: &'static str, columns: &'static [&'static str], id: i32) -> Result<Option<Row>, LoaderError> {
        let query = TableQuery {
            schema: self.schema,
            table,
            columns,
            id,
        };
        log::trace!("Fetching {} using '{}'", SourceLocation::row(table, id), query.to_sql());
        Ok(self.source.fetch(&query)?)
    }

    fn row(&self, table: &'static str, columns: &'static [&'static str], id: i32) -> Result<Row, LoaderError> {
        self.fetch(table, columns, id)?.ok_or(LoaderError::MissingRow { table, id })
    }

    /// Runs `load` for a component that can reach itself through the
    /// graphic, fill and stroke tables. Meeting a row again while it is
    /// still loading is a [`LoaderError::Cycle`].
    fn guarded<T>(
        &mut self,
        table: &'static str,
        id: i32,
        load: impl FnOnce(&mut Self, i32) -> Result<T, LoaderError>,
    ) -> Result<T, LoaderError> {
        if !self.pools.loading.insert((table, id)) {
            return Err(LoaderError::Cycle { table, id });
        }
        let result = load(self, id);
        self.pools.loading.remove(&(table, id));
        result
    }

    /// Follows a foreign key. A key pointing at no row, or back at a row
    /// that is still loading, is logged and treated as absent.
    fn reference<T>(
        &mut self,
        location: &SourceLocation,
        column: &str,
        key: Option<i32>,
        load: impl FnOnce(&mut Self, i32) -> Result<T, LoaderError>,
    ) -> Result<Option<T>, LoaderError> {
        let Some(key) = key else {
            return Ok(None);
        };
        match load(self, key) {
            Ok(value) => Ok(Some(value)),
            Err(LoaderError::MissingRow { table, id }) => {
                log::warn!("{}: {} references missing row {}", location, column, SourceLocation::row(table, id));
                Ok(None)
            }
            Err(LoaderError::Cycle { table, id }) => {
                log::warn!("{}: {} closes a reference cycle at {}", location, column, SourceLocation::row(table, id));
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn style(&mut self, id: i32) -> Result<Option<Arc<Style>>, LoaderError> {
        if let Some(style) = self.pools.styles.get(&id) {
            return Ok(Some(style.clone()));
        }
        let Some(row) = self.fetch("styles", STYLES, id)? else {
            log::debug!("No style with id {}", id);
            return Ok(None);
        };
        let location = SourceLocation::row("styles", id);
        let name = row.get_str("name")?.map(str::to_string);

        let style = if let Some(kind) = row.get_str("type")? {
            let key = row.get_i32("fk")?.ok_or(LoaderError::MissingRow { table: "styles", id })?;
            let symbolizer_id = SymbolizerId(0);
            let mut labels = HashMap::new();
            let symbolizer = match kind.trim().to_uppercase().as_str() {
                "POINT" => {
                    let memo = self.point(key)?;
                    AnySymbolizer::Point(symbolizer(symbolizer_id, memo, &location))
                }
                "LINE" => {
                    let memo = self.line(key)?;
                    AnySymbolizer::Line(symbolizer(symbolizer_id, memo, &location))
                }
                "POLYGON" => {
                    let memo = self.polygon(key)?;
                    AnySymbolizer::Polygon(symbolizer(symbolizer_id, memo, &location))
                }
                "TEXT" => {
                    let memo = self.text(key)?;
                    if let Some(label) = memo.label {
                        labels.insert(symbolizer_id, label);
                    }
                    AnySymbolizer::Text(symbolizer(symbolizer_id, memo.styling, &location))
                }
                _ => {
                    return Err(LoaderError::UnknownType {
                        id,
                        value: kind.to_string(),
                    });
                }
            };
            let scale = ScaleRange::new(
                row.get_f64("minscale")?.unwrap_or(f64::NEG_INFINITY),
                row.get_f64("maxscale")?.unwrap_or(f64::INFINITY),
            );
            Style {
                name: Some(name.unwrap_or_else(|| id.to_string())),
                rules: vec![Rule {
                    scale,
                    symbolizers: vec![symbolizer],
                    location: location.clone(),
                    ..Rule::default()
                }],
                labels,
                location,
                ..Style::default()
            }
        } else if let Some(sld) = row.get_str("sld")? {
            let mut style = self.parser.parse_style(sld, None)?;
            if name.is_some() {
                style.name = name;
            }
            style
        } else {
            log::debug!("{}: neither a symbolizer nor an SLD snippet", location);
            return Ok(None);
        };

        let style = Arc::new(style);
        self.pools.styles.insert(id, style.clone());
        Ok(Some(style))
    }

    fn point(&mut self, id: i32) -> Result<Memo<PointStyling>, LoaderError> {
        if let Some(memo) = self.pools.points.get(&id) {
            return Ok(memo.clone());
        }
        let row = self.row("points", POINTS, id)?;
        let location = SourceLocation::row("points", id);
        let mut styling = PointStyling {
            uom: uom(row.get_str("uom")?, &location),
            ..PointStyling::default()
        };
        let mut chain = None;
        if let Some(graphic) = self.reference(&location, "graphic_id", row.get_i32("graphic_id")?, Self::graphic)? {
            styling.graphic = graphic.value;
            chain = lift(graphic.chain, chain, |p: &mut PointStyling| Some(Arc::make_mut(&mut p.graphic)));
        }

        let memo = Memo {
            value: Arc::new(styling),
            chain,
        };
        self.pools.points.insert(id, memo.clone());
        Ok(memo)
    }

    fn line(&mut self, id: i32) -> Result<Memo<LineStyling>, LoaderError> {
        if let Some(memo) = self.pools.lines.get(&id) {
            return Ok(memo.clone());
        }
        let row = self.row("lines", LINES, id)?;
        let location = SourceLocation::row("lines", id);
        let mut styling = LineStyling {
            uom: uom(row.get_str("uom")?, &location),
            ..LineStyling::default()
        };
        let mut chain = None;
        if let Some(stroke) = self.reference(&location, "stroke_id", row.get_i32("stroke_id")?, Self::stroke)? {
            styling.stroke = stroke.value;
            chain = lift(stroke.chain, chain, |l: &mut LineStyling| Some(Arc::make_mut(&mut l.stroke)));
        }
        if let Some(offset) = row.get_f64("perpendicularoffset")? {
            styling.perpendicular_offset = offset;
        }

        let memo = Memo {
            value: Arc::new(styling),
            chain,
        };
        self.pools.lines.insert(id, memo.clone());
        Ok(memo)
    }

    fn polygon(&mut self, id: i32) -> Result<Memo<PolygonStyling>, LoaderError> {
        if let Some(memo) = self.pools.polygons.get(&id) {
            return Ok(memo.clone());
        }
        let row = self.row("polygons", POLYGONS, id)?;
        let location = SourceLocation::row("polygons", id);
        let mut styling = PolygonStyling {
            uom: uom(row.get_str("uom")?, &location),
            ..PolygonStyling::default()
        };
        let mut chain = None;
        if let Some(fill) = self.reference(&location, "fill_id", row.get_i32("fill_id")?, Self::fill)? {
            styling.fill = Some(fill.value);
            chain = lift(fill.chain, chain, |p: &mut PolygonStyling| p.fill.as_mut().map(Arc::make_mut));
        }
        if let Some(stroke) = self.reference(&location, "stroke_id", row.get_i32("stroke_id")?, Self::stroke)? {
            styling.stroke = Some(stroke.value);
            chain = lift(stroke.chain, chain, |p: &mut PolygonStyling| p.stroke.as_mut().map(Arc::make_mut));
        }
        if let Some(dx) = row.get_f64("displacementx")? {
            styling.displacement_x = dx;
        }
        if let Some(dy) = row.get_f64("displacementy")? {
            styling.displacement_y = dy;
        }
        if let Some(offset) = row.get_f64("perpendicularoffset")? {
            styling.perpendicular_offset = offset;
        }

        let memo = Memo {
            value: Arc::new(styling),
            chain,
        };
        self.pools.polygons.insert(id, memo.clone());
        Ok(memo)
    }

    fn text(&mut self, id: i32) -> Result<TextMemo, LoaderError> {
        if let Some(memo) = self.pools.texts.get(&id) {
            return Ok(memo.clone());
        }
        let row = self.row("texts", TEXTS, id)?;
        let location = SourceLocation::row("texts", id);
        let mut styling = TextStyling {
            uom: uom(row.get_str("uom")?, &location),
            ..TextStyling::default()
        };
        let mut chain = None;

        let label = match row.get_str("labelexpr")? {
            Some(expr) => {
                let mut base = String::new();
                let continuation = string_chain(column_fragments(expr), &location, &mut base);
                Some(Label {
                    base,
                    continuation,
                    location: location.clone(),
                })
            }
            None => {
                log::warn!("{}: text without labelexpr", location);
                None
            }
        };

        if let Some(font) = self.reference(&location, "font_id", row.get_i32("font_id")?, Self::font)? {
            styling.font = font;
        }
        if let Some(fill) = self.reference(&location, "fill_id", row.get_i32("fill_id")?, Self::fill)? {
            styling.fill = Some(fill.value);
            chain = lift(fill.chain, chain, |t: &mut TextStyling| t.fill.as_mut().map(Arc::make_mut));
        }
        if let Some(rotation) = row.get_f64("rotation")? {
            styling.rotation = rotation;
        }
        if let Some(expr) = row.get_str("rotationexpr")? {
            chain = dynamic(expr, &location, &mut styling, |t: &mut TextStyling, v: &str| {
                t.rotation = parse_number(v)?;
                Ok(())
            }, chain);
        }
        if let Some(dx) = row.get_f64("displacementx")? {
            styling.displacement_x = dx;
        }
        if let Some(dy) = row.get_f64("displacementy")? {
            styling.displacement_y = dy;
        }
        if let Some(ax) = row.get_f64("anchorx")? {
            styling.anchor_point_x = ax;
        }
        if let Some(ay) = row.get_f64("anchory")? {
            styling.anchor_point_y = ay;
        }
        if let Some(placement) =
            self.reference(&location, "lineplacement_id", row.get_i32("lineplacement_id")?, Self::line_placement)?
        {
            styling.line_placement = Some(placement);
        }
        if let Some(halo) = self.reference(&location, "halo_id", row.get_i32("halo_id")?, Self::halo)? {
            styling.halo = Some(halo.value);
            chain = lift(halo.chain, chain, |t: &mut TextStyling| t.halo.as_mut().map(Arc::make_mut));
        }

        let memo = TextMemo {
            styling: Memo {
                value: Arc::new(styling),
                chain,
            },
            label,
        };
        self.pools.texts.insert(id, memo.clone());
        Ok(memo)
    }

    fn graphic(&mut self, id: i32) -> Result<Memo<Graphic>, LoaderError> {
        if let Some(memo) = self.pools.graphics.get(&id) {
            return Ok(memo.clone());
        }
        self.guarded("graphics", id, Self::load_graphic)
    }

    fn load_graphic(&mut self, id: i32) -> Result<Memo<Graphic>, LoaderError> {
        let row = self.row("graphics", GRAPHICS, id)?;
        let location = SourceLocation::row("graphics", id);
        let mut graphic = Graphic::default();
        let mut chain = None;

        if let Some(size) = row.get_f64("size")? {
            graphic.size = size;
        }
        if let Some(expr) = row.get_str("sizeexpr")? {
            chain = dynamic(expr, &location, &mut graphic, |g: &mut Graphic, v: &str| {
                g.size = parse_number(v)?;
                Ok(())
            }, chain);
        }
        if let Some(rotation) = row.get_f64("rotation")? {
            graphic.rotation = rotation;
        }
        if let Some(expr) = row.get_str("rotationexpr")? {
            chain = dynamic(expr, &location, &mut graphic, |g: &mut Graphic, v: &str| {
                g.rotation = parse_number(v)?;
                Ok(())
            }, chain);
        }
        if let Some(ax) = row.get_f64("anchorx")? {
            graphic.anchor_point_x = ax;
        }
        if let Some(ay) = row.get_f64("anchory")? {
            graphic.anchor_point_y = ay;
        }
        if let Some(dx) = row.get_f64("displacementx")? {
            graphic.displacement_x = dx;
        }
        if let Some(dy) = row.get_f64("displacementy")? {
            graphic.displacement_y = dy;
        }

        if let Some(name) = row.get_str("wellknownname")? {
            mark_mut(&mut graphic).well_known = parse_well_known_name(name).unwrap_or_else(|e| {
                log::warn!("{}: {}", location, e);
                Default::default()
            });
        }
        if let Some(svg) = row.get_str("svg")? {
            match parse_svg(None, svg) {
                Ok(shape) => mark_mut(&mut graphic).shape = Some(Arc::new(shape)),
                Err(e) => log::warn!("{}: {}", location, e),
            }
        }
        if let Some(encoded) = row.get_str("base64raster")? {
            let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
            let decoded = base64::engine::general_purpose::STANDARD
                .decode(compact)
                .map_err(|e| e.to_string())
                .and_then(|bytes| decode_image(&location.to_string(), &bytes).map_err(|e| e.to_string()));
            match decoded {
                Ok(image) => graphic.image = Some(Arc::new(image)),
                Err(e) => log::warn!("{}: raster symbol could not be read: {}", location, e),
            }
        }

        if let Some(fill) = self.reference(&location, "fill_id", row.get_i32("fill_id")?, Self::fill)? {
            mark_mut(&mut graphic).fill = Some(fill.value);
            chain = lift(fill.chain, chain, |g: &mut Graphic| {
                g.mark.as_mut().map(Arc::make_mut).and_then(|m| m.fill.as_mut().map(Arc::make_mut))
            });
        }
        if let Some(stroke) = self.reference(&location, "stroke_id", row.get_i32("stroke_id")?, Self::stroke)? {
            mark_mut(&mut graphic).stroke = Some(stroke.value);
            chain = lift(stroke.chain, chain, |g: &mut Graphic| {
                g.mark.as_mut().map(Arc::make_mut).and_then(|m| m.stroke.as_mut().map(Arc::make_mut))
            });
        }

        let memo = Memo {
            value: Arc::new(graphic),
            chain,
        };
        self.pools.graphics.insert(id, memo.clone());
        Ok(memo)
    }

    fn stroke(&mut self, id: i32) -> Result<Memo<Stroke>, LoaderError> {
        if let Some(memo) = self.pools.strokes.get(&id) {
            return Ok(memo.clone());
        }
        self.guarded("strokes", id, Self::load_stroke)
    }

    fn load_stroke(&mut self, id: i32) -> Result<Memo<Stroke>, LoaderError> {
        let row = self.row("strokes", STROKES, id)?;
        let location = SourceLocation::row("strokes", id);
        let mut stroke = Stroke::default();
        let mut chain = None;

        if let Some(color) = row.get_str("color")? {
            set_color(&mut stroke.color, color, &location);
        }
        if let Some(width) = row.get_f64("width")? {
            stroke.width = width;
        }
        if let Some(expr) = row.get_str("widthexpr")? {
            chain = dynamic(expr, &location, &mut stroke, |s: &mut Stroke, v: &str| {
                s.width = parse_number(v)?;
                Ok(())
            }, chain);
        }
        if let Some(join) = row.get_str("linejoin")? {
            stroke.line_join = parse_line_join(join).unwrap_or_else(|e| {
                log::warn!("{}: {}", location, e);
                Default::default()
            });
        }
        if let Some(cap) = row.get_str("linecap")? {
            stroke.line_cap = parse_line_cap(cap).unwrap_or_else(|e| {
                log::warn!("{}: {}", location, e);
                Default::default()
            });
        }
        if let Some(dashes) = row.get_str("dasharray")? {
            match parse_dasharray(dashes) {
                Ok(dasharray) => stroke.dasharray = dasharray,
                Err(e) => log::warn!("{}: {}", location, e),
            }
        }
        if let Some(offset) = row.get_f64("dashoffset")? {
            stroke.dashoffset = offset;
        }
        if let Some(graphic) =
            self.reference(&location, "stroke_graphic_id", row.get_i32("stroke_graphic_id")?, Self::graphic)?
        {
            stroke.stroke_graphic = Some(graphic.value);
            chain = lift(graphic.chain, chain, |s: &mut Stroke| s.stroke_graphic.as_mut().map(Arc::make_mut));
        }
        if let Some(graphic) =
            self.reference(&location, "fill_graphic_id", row.get_i32("fill_graphic_id")?, Self::graphic)?
        {
            stroke.fill_graphic = Some(graphic.value);
            chain = lift(graphic.chain, chain, |s: &mut Stroke| s.fill_graphic.as_mut().map(Arc::make_mut));
        }
        if let Some(gap) = row.get_f64("strokegap")? {
            stroke.stroke_gap = gap;
        }
        if let Some(gap) = row.get_f64("strokeinitialgap")? {
            stroke.stroke_initial_gap = gap;
        }
        if let Some(percentage) = row.get_f64("positionpercentage")? {
            stroke.position_percentage = percentage;
        }

        let memo = Memo {
            value: Arc::new(stroke),
            chain,
        };
        self.pools.strokes.insert(id, memo.clone());
        Ok(memo)
    }

    fn fill(&mut self, id: i32) -> Result<Memo<Fill>, LoaderError> {
        if let Some(memo) = self.pools.fills.get(&id) {
            return Ok(memo.clone());
        }
        self.guarded("fills", id, Self::load_fill)
    }

    fn load_fill(&mut self, id: i32) -> Result<Memo<Fill>, LoaderError> {
        let row = self.row("fills", FILLS, id)?;
        let location = SourceLocation::row("fills", id);
        let mut fill = Fill::default();
        let mut chain = None;

        if let Some(color) = row.get_str("color")? {
            set_color(&mut fill.color, color, &location);
        }
        if let Some(graphic) = self.reference(&location, "graphic_id", row.get_i32("graphic_id")?, Self::graphic)? {
            fill.graphic = Some(graphic.value);
            chain = lift(graphic.chain, chain, |f: &mut Fill| f.graphic.as_mut().map(Arc::make_mut));
        }

        let memo = Memo {
            value: Arc::new(fill),
            chain,
        };
        self.pools.fills.insert(id, memo.clone());
        Ok(memo)
    }

    fn font(&mut self, id: i32) -> Result<Arc<Font>, LoaderError> {
        if let Some(font) = self.pools.fonts.get(&id) {
            return Ok(font.clone());
        }
        let row = self.row("fonts", FONTS, id)?;
        let location = SourceLocation::row("fonts", id);
        let mut font = Font::default();

        if let Some(family) = row.get_str("family")? {
            font.family.extend(
                family
                    .split(',')
                    .map(str::trim)
                    .filter(|f| !f.is_empty())
                    .map(str::to_string),
            );
        }
        if let Some(style) = row.get_str("style")? {
            match parse_font_style(style) {
                Ok(style) => font.style = style,
                Err(e) => log::warn!("{}: {}", location, e),
            }
        }
        if let Some(bold) = row.get_bool("bold")? {
            font.bold = bold;
        }
        if let Some(size) = row.get_f64("size")? {
            font.size = size;
        }

        let font = Arc::new(font);
        self.pools.fonts.insert(id, font.clone());
        Ok(font)
    }

    fn line_placement(&mut self, id: i32) -> Result<Arc<LinePlacement>, LoaderError> {
        if let Some(placement) = self.pools.line_placements.get(&id) {
            return Ok(placement.clone());
        }
        let row = self.row("lineplacements", LINE_PLACEMENTS, id)?;
        let mut placement = LinePlacement::default();

        if let Some(offset) = row.get_f64("perpendicularoffset")? {
            placement.perpendicular_offset = offset;
        }
        if let Some(repeat) = row.get_bool("repeat")? {
            placement.repeat = repeat;
        }
        if let Some(gap) = row.get_f64("initialgap")? {
            placement.initial_gap = gap;
        }
        if let Some(gap) = row.get_f64("gap")? {
            placement.gap = gap;
        }
        if let Some(aligned) = row.get_bool("isaligned")? {
            placement.is_aligned = aligned;
        }
        if let Some(generalize) = row.get_bool("generalizeline")? {
            placement.generalize_line = generalize;
        }

        let placement = Arc::new(placement);
        self.pools.line_placements.insert(id, placement.clone());
        Ok(placement)
    }

    fn halo(&mut self, id: i32) -> Result<Memo<Halo>, LoaderError> {
        if let Some(memo) = self.pools.halos.get(&id) {
            return Ok(memo.clone());
        }
        let row = self.row("halos", HALOS, id)?;
        let location = SourceLocation::row("halos", id);
        let mut halo = Halo::default();
        let mut chain = None;

        if let Some(fill) = self.reference(&location, "fill_id", row.get_i32("fill_id")?, Self::fill)? {
            halo.fill = Some(fill.value);
            chain = lift(fill.chain, chain, |h: &mut Halo| h.fill.as_mut().map(Arc::make_mut));
        }
        if let Some(radius) = row.get_f64("radius")? {
            halo.radius = radius;
        }

        let memo = Memo {
            value: Arc::new(halo),
            chain,
        };
        self.pools.halos.insert(id, memo.clone());
        Ok(memo)
    }
}

fn symbolizer<T: Clone>(id: SymbolizerId, memo: Memo<T>, location: &SourceLocation) -> Symbolizer<T> {
    Symbolizer::new(id, T::clone(&memo.value), memo.chain, location.clone())
}

fn mark_mut(graphic: &mut Graphic) -> &mut Mark {
    Arc::make_mut(graphic.mark.get_or_insert_with(|| Arc::new(Mark::default())))
}

fn set_color(target: &mut Color, value: &str, location: &SourceLocation) {
    match Color::parse_hex(value) {
        Ok(color) => *target = color,
        Err(e) => log::warn!("{}: {}", location, e),
    }
}

fn uom(value: Option<&str>, location: &SourceLocation) -> Uom {
    match value {
        Some(value) => parse_uom(value).unwrap_or_else(|e| {
            log::warn!("{}: {}", location, e);
            Uom::Pixel
        }),
        None => Uom::Pixel,
    }
}

/// Reads an expression column: a serialized expression element, a
/// `{namespace}local` property name, or an expression in text form.
/// Anything else names a property.
fn column_expression(text: &str) -> Expression {
    let text = text.trim();
    if text.starts_with('<') {
        match decode_expression_fragment(text) {
            Ok(expr) => return expr,
            Err(e) => log::debug!("'{}' is not an expression element: {}", text, e),
        }
    }
    if let Some(rest) = text.strip_prefix('{')
        && let Some((_, local)) = rest.split_once('}')
    {
        return Expression::property(local);
    }
    parse_expression(text).unwrap_or_else(|_| Expression::property(text))
}

/// Literal expressions are applied at load time like any other literal.
fn column_fragments(text: &str) -> Fragments {
    match column_expression(text) {
        Expression::Literal(value) => Fragments::from_text(&value.to_string()),
        expr => Fragments::from_expression(expr),
    }
}

fn dynamic<T, U>(text: &str, location: &SourceLocation, base: &mut T, updater: U, previous: Chain<T>) -> Chain<T>
where
    T: 'static,
    U: Fn(&mut T, &str) -> Result<(), StyleParseError> + Send + Sync + 'static,
{
    update_or_continue(column_fragments(text), location, base, updater, previous)
}
