//! # symbology-relational
//!
//! Loads styles kept in relational style tables. Components referenced by
//! several rows are loaded once and shared by every style that uses them.
//!
//! - **reader**: the [`StyleReader`] and its per-table loaders
//! - **config**: schema and base system id of a style store
//! - **error**: why a style could not be loaded

mod config;
mod error;
mod reader;

pub use config::ReaderConfig;
pub use error::LoaderError;
pub use reader::StyleReader;
