use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    #[error("Expression parse error in '{0}': {1}")]
    ExpressionParse(String, String),

    #[error("Unsupported {kind} element '{name}'")]
    Unsupported { kind: &'static str, name: String },

    #[error("Malformed '{element}' element: {message}")]
    Malformed { element: String, message: String },

    #[error("Function '{function}' error: {message}")]
    FunctionError { function: String, message: String },

    #[error("Type error: {0}")]
    TypeError(String),

    #[error("Property '{0}' could not be resolved")]
    UnresolvedProperty(String),

    #[error("XML parsing error: {0}")]
    Xml(String),
}

impl From<roxmltree::Error> for FilterError {
    fn from(err: roxmltree::Error) -> Self {
        FilterError::Xml(err.to_string())
    }
}
