//! Resource providers for external graphics, mark fonts and remote style parts.
//!
//! - [`FilesystemResourceProvider`]: files below a style directory
//! - [`InMemoryResourceProvider`]: re-exported from `symbology-traits`

mod filesystem;

pub use filesystem::FilesystemResourceProvider;

pub use symbology_traits::InMemoryResourceProvider;
