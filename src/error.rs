use symbology_core::ParseError;
use symbology_relational::LoaderError;
use thiserror::Error;

/// Everything that can stop the command line tool.
#[derive(Error, Debug)]
pub enum SymbologyError {
    #[error("Parsing failed: {0}")]
    Parse(#[from] ParseError),

    #[error("Loading failed: {0}")]
    Loader(#[from] LoaderError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid input: {0}")]
    Input(String),
}
