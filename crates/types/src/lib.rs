pub mod color;
pub mod feature;
pub mod location;
pub mod value;

pub use color::Color;
pub use feature::{Feature, SimpleFeature};
pub use location::SourceLocation;
pub use value::Value;
