use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_PRIMARY: &str = "#0b3d91";
pub const DEFAULT_SECONDARY: &str = "#ffffff";
pub const DEFAULT_ACCENT: &str = "#f2b705";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("colour {0:?} is not a #rrggbb value")]
pub struct ColourError(pub String);

/// Per-organization palette used by exports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Theme {
    pub primary: String,
    pub secondary: String,
    pub accent: String,
    #[serde(default)]
    pub logo_url: Option<String>,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            primary: DEFAULT_PRIMARY.to_string(),
            secondary: DEFAULT_SECONDARY.to_string(),
            accent: DEFAULT_ACCENT.to_string(),
            logo_url: None,
        }
    }
}

impl Theme {
    pub fn new(primary: &str, secondary: &str, accent: &str) -> Result<Self, ColourError> {
        Ok(Self {
            primary: normalize_hex(primary)?,
            secondary: normalize_hex(secondary)?,
            accent: normalize_hex(accent)?,
            logo_url: None,
        })
    }

    pub fn primary_u32(&self) -> u32 {
        hex_to_u32(&self.primary).unwrap_or(0x0b3d91)
    }

    pub fn accent_u32(&self) -> u32 {
        hex_to_u32(&self.accent).unwrap_or(0xf2b705)
    }

    pub fn primary_rgb(&self) -> (f32, f32, f32) {
        u32_to_unit_rgb(self.primary_u32())
    }

    pub fn accent_rgb(&self) -> (f32, f32, f32) {
        u32_to_unit_rgb(self.accent_u32())
    }
}

pub fn normalize_hex(raw: &str) -> Result<String, ColourError> {
    let trimmed = raw.trim();
    let digits = trimmed.strip_prefix('#').unwrap_or(trimmed);
    if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ColourError(raw.to_string()));
    }
    Ok(format!("#{}", digits.to_ascii_lowercase()))
}

fn hex_to_u32(raw: &str) -> Option<u32> {
    let digits = normalize_hex(raw).ok()?;
    u32::from_str_radix(&digits[1..], 16).ok()
}

fn u32_to_unit_rgb(v: u32) -> (f32, f32, f32) {
    let r = ((v >> 16) & 0xff) as f32 / 255.0;
    let g = ((v >> 8) & 0xff) as f32 / 255.0;
    let b = (v & 0xff) as f32 / 255.0;
    (r, g, b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_colours_normalize() {
        assert_eq!(normalize_hex("FF0000").unwrap(), "#ff0000");
        assert_eq!(normalize_hex(" #00aa11 ").unwrap(), "#00aa11");
        assert!(normalize_hex("#fff").is_err());
        assert!(normalize_hex("#gg0000").is_err());
    }

    #[test]
    fn theme_colours_convert() {
        let theme = Theme::new("#ff8000", "#ffffff", "#000000").unwrap();
        assert_eq!(theme.primary_u32(), 0xff8000);
        let (r, g, b) = theme.primary_rgb();
        assert!((r - 1.0).abs() < 1e-6);
        assert!((g - 128.0 / 255.0).abs() < 1e-6);
        assert!(b.abs() < 1e-6);
    }
}
