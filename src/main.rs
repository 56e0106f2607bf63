use clap::Parser;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use symbology::resource::FilesystemResourceProvider;
use symbology::{
    LayerReport, ParserOptions, ReaderConfig, StyleReader, SymbologyError, SymbologyParser, evaluate_features,
    features_from_json, row_source_from_json,
};

#[derive(Parser, Debug)]
#[command(name = "symbology")]
#[command(version, about = "Resolves SLD/SE styles against features and prints the stylings as JSON", long_about = None)]
#[command(after_help = "EXAMPLES:
    symbology roads.se -f roads.json                  Evaluate a feature type style
    symbology map.sld --layers -f features.json       Evaluate every layer of a descriptor
    symbology --tables store.json --style-id 4 -f features.json")]
struct Cli {
    /// Style document: FeatureTypeStyle, CoverageStyle, UserStyle or a symbolizer
    #[arg(value_name = "STYLE", required_unless_present = "tables")]
    style: Option<PathBuf>,

    /// Features as a JSON array or a GeoJSON feature collection
    #[arg(short, long, value_name = "FILE")]
    features: PathBuf,

    /// Read STYLE as a StyledLayerDescriptor and evaluate every layer style
    #[arg(long)]
    layers: bool,

    /// Style tables as JSON, read with the relational loader
    #[arg(long, value_name = "FILE", requires = "style_id", conflicts_with = "style")]
    tables: Option<PathBuf>,

    /// Id of the style row to load from --tables
    #[arg(long)]
    style_id: Option<i32>,

    /// Only apply rules whose scale range contains this denominator
    #[arg(long)]
    scale: Option<f64>,

    /// Parser options as JSON
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), SymbologyError> {
    let features: Value = serde_json::from_str(&fs::read_to_string(&cli.features)?)?;
    let features = features_from_json(&features)?;
    log::info!("Read {} features from {}", features.len(), cli.features.display());

    let reports = match (&cli.tables, &cli.style) {
        (Some(path), _) => {
            let id = cli
                .style_id
                .ok_or_else(|| SymbologyError::Input("--tables needs --style-id".to_string()))?;
            let tables: Value = serde_json::from_str(&fs::read_to_string(path)?)?;
            let source = row_source_from_json(&tables)?;
            let (root, _) = split_path(path);
            let reader = StyleReader::new(Arc::new(source), ReaderConfig::default())
                .with_resource_provider(Arc::new(FilesystemResourceProvider::new(root)));
            let style = reader
                .try_get_style(id)?
                .ok_or_else(|| SymbologyError::Input(format!("no style with id {}", id)))?;
            vec![LayerReport {
                layer: None,
                style: style.name.clone(),
                features: evaluate_features(&style, &features, cli.scale),
            }]
        }
        (None, Some(path)) => {
            let xml = fs::read_to_string(path)?;
            let (root, system_id) = split_path(path);
            let options = match &cli.config {
                Some(config) => serde_json::from_str(&fs::read_to_string(config)?)?,
                None => ParserOptions::default(),
            };
            let parser = SymbologyParser::builder()
                .with_options(options)
                .with_resource_provider(Arc::new(FilesystemResourceProvider::new(root)))
                .build();

            if cli.layers {
                parser
                    .parse_layers(&xml, Some(&system_id))?
                    .into_iter()
                    .map(|(layer, style)| LayerReport {
                        layer,
                        style: style.name.clone(),
                        features: evaluate_features(&style, &features, cli.scale),
                    })
                    .collect()
            } else {
                let style = parser.parse_style(&xml, Some(&system_id))?;
                vec![LayerReport {
                    layer: None,
                    style: style.name.clone(),
                    features: evaluate_features(&style, &features, cli.scale),
                }]
            }
        }
        (None, None) => return Err(SymbologyError::Input("a STYLE or --tables is required".to_string())),
    };

    println!("{}", serde_json::to_string_pretty(&reports)?);
    Ok(())
}

/// Splits a style path into the directory resources are served from and the
/// system id references are resolved against.
fn split_path(path: &Path) -> (PathBuf, String) {
    let root = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let system_id = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    (root, system_id)
}
