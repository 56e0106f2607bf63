use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Where a compiled fragment came from, for diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SourceLocation {
    pub system_id: Option<Arc<str>>,
    pub line: u32,
    pub column: u32,
}

impl SourceLocation {
    pub fn new(system_id: Option<Arc<str>>, line: u32, column: u32) -> Self {
        Self { system_id, line, column }
    }

    /// A location naming a relational row instead of a document position.
    pub fn row(table: &str, id: i32) -> Self {
        Self {
            system_id: Some(Arc::from(format!("{} id {}", table, id))),
            line: 0,
            column: 0,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let source = self.system_id.as_deref().unwrap_or("<unknown>");
        if self.line == 0 {
            f.write_str(source)
        } else {
            write!(f, "{}, line {}, column {}", source, self.line, self.column)
        }
    }
}
