use symbology_core::ParseError;
use symbology_traits::RowError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Row source error: {0}")]
    Row(#[from] RowError),

    #[error("Stored SLD could not be compiled: {0}")]
    Parse(#[from] ParseError),

    #[error("Style {id} has unknown type '{value}'")]
    UnknownType { id: i32, value: String },

    #[error("No row with id {id} in table '{table}'")]
    MissingRow { table: &'static str, id: i32 },

    #[error("Row {id} of table '{table}' references itself")]
    Cycle { table: &'static str, id: i32 },

    #[error("Row store lock poisoned")]
    Poisoned,
}
