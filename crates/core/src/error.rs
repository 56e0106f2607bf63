//! Errors that abort compilation of a whole document.
//!
//! Everything below the document level is best-effort: unknown elements,
//! bad literals and unreachable resources are logged and skipped.

use symbology_traits::ResourceError;
use symbology_types::SourceLocation;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("XML parsing error: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("Element '{element}' at {location} is not a style")]
    NotAStyle { element: String, location: SourceLocation },

    #[error("Element '{element}' at {location} is not a styled layer descriptor")]
    NotALayerDescriptor { element: String, location: SourceLocation },

    #[error("Resource error: {0}")]
    Resource(#[from] ResourceError),

    #[error("Document '{0}' is not valid UTF-8")]
    Utf8(String),
}
