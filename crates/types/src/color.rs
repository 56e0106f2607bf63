use serde::{Deserialize, Deserializer, Serialize, de};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

fn default_one() -> f32 {
    1.0
}

fn is_one(num: &f32) -> bool {
    *num == 1.0
}

/// An sRGB color with a floating point alpha channel in `0.0..=1.0`.
#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    #[serde(skip_serializing_if = "is_one", default = "default_one")]
    pub a: f32,
}

impl Eq for Color {}

impl Hash for Color {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.r.hash(state);
        self.g.hash(state);
        self.b.hash(state);
        self.a.to_bits().hash(state);
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::BLACK
    }
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub const fn gray(value: u8) -> Self {
        Self::rgb(value, value, value)
    }

    /// Returns this color with the alpha channel replaced, clamped to `0.0..=1.0`.
    pub fn with_alpha(self, alpha: f32) -> Self {
        let a = if alpha.is_nan() { 0.0 } else { alpha.clamp(0.0, 1.0) };
        Self { a, ..self }
    }

    /// Returns `other`'s red, green and blue channels combined with this color's alpha.
    pub fn with_rgb_of(self, other: Color) -> Self {
        Self { a: self.a, ..other }
    }

    /// Decodes `#RGB`, `#RRGGBB` or `#AARRGGBB` (alpha first).
    pub fn parse_hex(s: &str) -> Result<Color, String> {
        let s = s.trim();
        let hex = s
            .strip_prefix('#')
            .ok_or_else(|| format!("Color must start with #, got: {}", s))?;
        // from_str_radix alone would accept a leading sign
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(format!("Invalid hex color: {}", s));
        }
        let channel = |range: std::ops::Range<usize>, name: &str| {
            u8::from_str_radix(&hex[range], 16)
                .map_err(|e| format!("Invalid {} component in '{}': {}", name, s, e))
        };

        match hex.len() {
            3 => {
                let digit = |i: usize, name: &str| {
                    u8::from_str_radix(&hex[i..i + 1], 16)
                        .map(|v| v * 17)
                        .map_err(|e| format!("Invalid {} component in '{}': {}", name, s, e))
                };
                Ok(Color::rgb(digit(0, "red")?, digit(1, "green")?, digit(2, "blue")?))
            }
            6 => Ok(Color::rgb(
                channel(0..2, "red")?,
                channel(2..4, "green")?,
                channel(4..6, "blue")?,
            )),
            8 => {
                let alpha = channel(0..2, "alpha")?;
                Ok(Color {
                    r: channel(2..4, "red")?,
                    g: channel(4..6, "green")?,
                    b: channel(6..8, "blue")?,
                    a: f32::from(alpha) / 255.0,
                })
            }
            n => Err(format!("Invalid hex color length: expected 3, 6 or 8, got {}", n)),
        }
    }
}

impl FromStr for Color {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_hex(s)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if is_one(&self.a) {
            write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
        } else {
            let alpha = (self.a * 255.0).round() as u8;
            write!(f, "#{:02X}{:02X}{:02X}{:02X}", alpha, self.r, self.g, self.b)
        }
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum ColorDef {
            Str(String),
            Map { r: u8, g: u8, b: u8, #[serde(default = "default_one")] a: f32 },
        }

        match ColorDef::deserialize(deserializer)? {
            ColorDef::Str(s) => Self::parse_hex(&s).map_err(de::Error::custom),
            ColorDef::Map { r, g, b, a } => Ok(Color { r, g, b, a }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_six_digit_hex() {
        assert_eq!(Color::parse_hex("#0000FF").unwrap(), Color::rgb(0, 0, 255));
        assert_eq!(Color::parse_hex("  #ff8000 ").unwrap(), Color::rgb(255, 128, 0));
    }

    #[test]
    fn test_parse_short_hex() {
        assert_eq!(Color::parse_hex("#f0a").unwrap(), Color::rgb(255, 0, 170));
    }

    #[test]
    fn test_parse_alpha_first_hex() {
        let c = Color::parse_hex("#800000FF").unwrap();
        assert_eq!((c.r, c.g, c.b), (0, 0, 255));
        assert!((c.a - 128.0 / 255.0).abs() < 1e-6);
    }

    #[test]
    fn test_parse_invalid() {
        assert!(Color::parse_hex("red").is_err());
        assert!(Color::parse_hex("#12345").is_err());
        assert!(Color::parse_hex("#zzzzzz").is_err());
    }

    #[test]
    fn test_parse_rejects_signed_digits() {
        assert!(Color::parse_hex("#+F0000").is_err());
        assert!(Color::parse_hex("#+F+F+F").is_err());
        assert!(Color::parse_hex("#+FF").is_err());
        assert!("#-1000000".parse::<Color>().is_err());
    }

    #[test]
    fn test_with_alpha_clamps() {
        assert_eq!(Color::BLACK.with_alpha(1.7).a, 1.0);
        assert_eq!(Color::BLACK.with_alpha(-0.2).a, 0.0);
    }

    #[test]
    fn test_with_rgb_keeps_alpha() {
        let faded = Color::WHITE.with_alpha(0.25);
        let c = faded.with_rgb_of(Color::rgb(1, 2, 3));
        assert_eq!(c, Color { r: 1, g: 2, b: 3, a: 0.25 });
    }

    #[test]
    fn test_display_round_trips_opaque() {
        assert_eq!(Color::rgb(0, 0, 255).to_string(), "#0000FF");
    }

    #[test]
    fn test_deserialize_from_string() {
        let c: Color = serde_json::from_str("\"#102030\"").unwrap();
        assert_eq!(c, Color::rgb(16, 32, 48));
    }
}
