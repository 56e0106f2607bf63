pub mod resource;
pub mod rows;

pub use resource::{InMemoryResourceProvider, ResourceError, ResourceProvider, SharedResourceData, resolve_href};
pub use rows::{InMemoryRowSource, Row, RowError, RowSource, SqlValue, TableQuery};
