//! # symbology
//!
//! Compiles cartographic styles (SLD 1.0 and SE 1.1 documents, or rows of a
//! relational style store) and resolves the concrete styling of each feature.
//!
//! The heavy lifting happens in the member crates, re-exported here:
//!
//! - [`core`]: the document compiler, compiled styles and the resource cache
//! - [`relational`]: the loader for relational style tables
//! - [`resource`]: filesystem and in-memory resource providers
//!
//! This crate adds the glue the command line tool needs: reading features and
//! style tables from JSON and reporting resolved stylings.

pub use symbology_continuation as continuation;
pub use symbology_core as core;
pub use symbology_filter as filter;
pub use symbology_relational as relational;
pub use symbology_resource as resource;
pub use symbology_style as styling;
pub use symbology_traits as traits;
pub use symbology_types as types;

pub mod error;
pub mod features;
pub mod report;
pub mod tables;

pub use error::SymbologyError;
pub use features::features_from_json;
pub use report::{FeatureStylings, LayerReport, evaluate_features};
pub use symbology_core::{ParseError, ParserOptions, ResolvedStyling, Style, SymbologyParser};
pub use symbology_relational::{LoaderError, ReaderConfig, StyleReader};
pub use tables::row_source_from_json;
