//! Visual configuration of generated codes

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A color exactly as the user entered it.
///
/// Colors are never rejected on entry; an unparsable value is resolved at
/// render time (see [`Color::resolve`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Color(String);

impl Color {
    /// Wrap a raw color string
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The raw string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse into RGBA components.
    ///
    /// Accepts `#rgb`, `#rgba`, `#rrggbb`, `#rrggbbaa`, `rgb(r, g, b)`,
    /// `rgba(r, g, b, a)` and a handful of CSS color names.
    pub fn parse(&self) -> Option<[u8; 4]> {
        let value = self.0.trim().to_ascii_lowercase();

        if let Some(hex) = value.strip_prefix('#') {
            return parse_hex(hex);
        }
        if let Some(args) = value
            .strip_prefix("rgba(")
            .or_else(|| value.strip_prefix("rgb("))
            .and_then(|rest| rest.strip_suffix(')'))
        {
            return parse_functional(args);
        }

        match value.as_str() {
            "black" => Some([0, 0, 0, 255]),
            "white" => Some([255, 255, 255, 255]),
            "red" => Some([255, 0, 0, 255]),
            "green" => Some([0, 128, 0, 255]),
            "blue" => Some([0, 0, 255, 255]),
            "gray" | "grey" => Some([128, 128, 128, 255]),
            "transparent" => Some([0, 0, 0, 0]),
            _ => None,
        }
    }

    /// Parse, falling back to opaque black for values that do not parse
    pub fn resolve(&self) -> [u8; 4] {
        self.parse().unwrap_or_else(|| {
            tracing::warn!(color = %self.0, "Unrecognised color, rendering as black");
            [0, 0, 0, 255]
        })
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Color {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

fn parse_hex(hex: &str) -> Option<[u8; 4]> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let nibble = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|v| v * 17);
    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();

    match hex.len() {
        3 => Some([nibble(0)?, nibble(1)?, nibble(2)?, 255]),
        4 => Some([nibble(0)?, nibble(1)?, nibble(2)?, nibble(3)?]),
        6 => Some([byte(0)?, byte(2)?, byte(4)?, 255]),
        8 => Some([byte(0)?, byte(2)?, byte(4)?, byte(6)?]),
        _ => None,
    }
}

fn parse_functional(args: &str) -> Option<[u8; 4]> {
    let parts: Vec<&str> = args.split(',').map(str::trim).collect();
    if parts.len() != 3 && parts.len() != 4 {
        return None;
    }
    let channel = |s: &str| s.parse::<u8>().ok();
    let alpha = match parts.get(3) {
        Some(a) => {
            let a = a.parse::<f32>().ok()?;
            if !(0.0..=1.0).contains(&a) {
                return None;
            }
            (a * 255.0).round() as u8
        }
        None => 255,
    };
    Some([channel(parts[0])?, channel(parts[1])?, channel(parts[2])?, alpha])
}

/// Shape applied to each dark module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DotShape {
    /// Neighbour-aware rounded modules
    #[default]
    Rounded,
    /// Independent circles
    Dots,
    /// Outer corners of runs cut to a curve
    Classy,
    /// Classy with a full-radius curve
    ClassyRounded,
    /// Plain squares
    Square,
    /// Rounded with full-radius inner corners
    ExtraRounded,
}

impl DotShape {
    /// All shapes in menu order
    pub const ALL: [DotShape; 6] = [
        DotShape::Rounded,
        DotShape::Dots,
        DotShape::Classy,
        DotShape::ClassyRounded,
        DotShape::Square,
        DotShape::ExtraRounded,
    ];

    /// Canonical kebab-case name
    pub fn as_str(self) -> &'static str {
        match self {
            DotShape::Rounded => "rounded",
            DotShape::Dots => "dots",
            DotShape::Classy => "classy",
            DotShape::ClassyRounded => "classy-rounded",
            DotShape::Square => "square",
            DotShape::ExtraRounded => "extra-rounded",
        }
    }
}

impl FromStr for DotShape {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = value.trim().to_ascii_lowercase().replace('_', "-");
        DotShape::ALL
            .into_iter()
            .find(|shape| shape.as_str() == wanted)
            .ok_or_else(|| {
                format!(
                    "Unknown dot shape '{value}', expected one of: {}",
                    DotShape::ALL.map(DotShape::as_str).join(", ")
                )
            })
    }
}

impl fmt::Display for DotShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Complete visual configuration, replaced wholesale on every change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleConfig {
    /// Color of dark modules
    pub dot_color: Color,
    /// Canvas background color
    pub background_color: Color,
    /// Module shape
    pub dot_shape: DotShape,
    /// Optional logo image URL (or local path) drawn at the center
    pub logo: Option<String>,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            dot_color: Color::new("#000000"),
            background_color: Color::new("#ffffff"),
            dot_shape: DotShape::Rounded,
            logo: None,
        }
    }
}

impl StyleConfig {
    /// Copy with a new dot color
    pub fn with_dot_color(self, color: impl Into<Color>) -> Self {
        Self {
            dot_color: color.into(),
            ..self
        }
    }

    /// Copy with a new background color
    pub fn with_background_color(self, color: impl Into<Color>) -> Self {
        Self {
            background_color: color.into(),
            ..self
        }
    }

    /// Copy with a new dot shape
    pub fn with_dot_shape(self, shape: DotShape) -> Self {
        Self {
            dot_shape: shape,
            ..self
        }
    }

    /// Copy with a new (or removed) logo
    pub fn with_logo(self, logo: Option<String>) -> Self {
        Self { logo, ..self }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let style = StyleConfig::default();
        assert_eq!(style.dot_color.as_str(), "#000000");
        assert_eq!(style.background_color.as_str(), "#ffffff");
        assert_eq!(style.dot_shape, DotShape::Rounded);
        assert!(style.logo.is_none());
    }

    #[test]
    fn test_hex_forms() {
        assert_eq!(Color::from("#fff").parse(), Some([255, 255, 255, 255]));
        assert_eq!(Color::from("#1e90ff").parse(), Some([0x1e, 0x90, 0xff, 255]));
        assert_eq!(Color::from("#00000080").parse(), Some([0, 0, 0, 0x80]));
        assert_eq!(Color::from("rgb(10, 20, 30)").parse(), Some([10, 20, 30, 255]));
        assert_eq!(Color::from("rgba(10,20,30,0)").parse(), Some([10, 20, 30, 0]));
    }

    #[test]
    fn test_invalid_color_is_accepted_and_resolves_black() {
        let style = StyleConfig::default().with_background_color("not-a-color");
        assert_eq!(style.background_color.as_str(), "not-a-color");
        assert_eq!(style.background_color.parse(), None);
        assert_eq!(style.background_color.resolve(), [0, 0, 0, 255]);
        assert_eq!(Color::from("#12345").parse(), None);
        assert_eq!(Color::from("#gggggg").parse(), None);
    }

    #[test]
    fn test_dot_shape_names() {
        for shape in DotShape::ALL {
            assert_eq!(shape.as_str().parse::<DotShape>().unwrap(), shape);
        }
        assert_eq!("Extra_Rounded".parse::<DotShape>().unwrap(), DotShape::ExtraRounded);
        assert!("hexagon".parse::<DotShape>().is_err());

        let json = serde_json::to_string(&DotShape::ClassyRounded).unwrap();
        assert_eq!(json, "\"classy-rounded\"");
    }

    #[test]
    fn test_setters_replace_wholesale() {
        let original = StyleConfig::default();
        let updated = original
            .clone()
            .with_dot_color("#ff0000")
            .with_dot_shape(DotShape::Dots);
        assert_eq!(original, StyleConfig::default());
        assert_eq!(updated.dot_color.as_str(), "#ff0000");
        assert_eq!(updated.dot_shape, DotShape::Dots);
        assert_eq!(updated.background_color, original.background_color);
    }
}
