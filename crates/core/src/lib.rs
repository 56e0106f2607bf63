//! # symbology-core
//!
//! Compiles SLD/SE style documents into [`Style`]s that resolve concrete
//! stylings per feature.
//!
//! - **parser**: the document compiler and its [`SymbologyParser`] entry point
//! - **style**: rules, styles and the else-rule evaluation
//! - **resolver**: cached loading of external graphics and referenced documents
//! - **error**: the errors that abort compiling a document

pub use symbology_continuation as continuation;
pub use symbology_filter as filter;
pub use symbology_style as styling;
pub use symbology_traits as traits;
pub use symbology_types as types;

pub mod error;
mod lru_cache;
pub mod parser;
pub mod resolver;
pub mod style;

pub use error::ParseError;
pub use parser::{ParserOptions, SymbologyParser, SymbologyParserBuilder, parse_svg};
pub use resolver::{DEFAULT_CACHE_CAPACITY, ResourceResolver, decode_image};
pub use style::{ResolvedStyling, Rule, RuleFilter, ScaleRange, Style, Styling};
