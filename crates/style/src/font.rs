use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum FontStyle {
    #[default]
    Normal,
    Italic,
    Oblique,
}

/// Font selection for labels. Families are tried in list order.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Font {
    pub family: Vec<String>,
    pub style: FontStyle,
    pub bold: bool,
    pub size: f64,
}

impl Default for Font {
    fn default() -> Self {
        Self {
            family: Vec::new(),
            style: FontStyle::Normal,
            bold: false,
            size: 10.0,
        }
    }
}
