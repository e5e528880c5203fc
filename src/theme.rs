//! Theme loading: btop-style `theme[key]="value"` and hex → ratatui Color.

use ratatui::style::Color;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// One Dark palette and UI colours loaded from a theme file.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Tower block colours, cycled bottom to top.
    pub blocks: [Color; 6],
    /// Sky behind the tower.
    pub bg: Color,
    /// Pedestal, chain and borders.
    pub div_line: Color,
    /// Score and height text.
    pub main_fg: Color,
    /// Titles and the combo panel.
    pub title: Color,
    /// Frozen blocks and hints.
    pub inactive_fg: Color,
}

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

impl Default for Theme {
    fn default() -> Self {
        Self::onedark_default()
    }
}

const ONEDARK_BLOCKS: [u32; 6] = [0x98C379, 0xE5C07B, 0xE06C75, 0x61AFEF, 0xC678DD, 0x56B6C2];
const HIGH_CONTRAST_BLOCKS: [u32; 6] = [0x00FF00, 0xFFFF00, 0xFF0000, 0x0088FF, 0xFF00FF, 0x00FFFF];
// Paul Tol's bright scheme; no red/green pair next to each other.
const COLORBLIND_BLOCKS: [u32; 6] = [0x0077BB, 0xEE7733, 0x009988, 0xCC3311, 0xEE3377, 0xBBBB00];

impl Theme {
    pub fn onedark_default() -> Self {
        Self {
            blocks: ONEDARK_BLOCKS.map(Color::from_u32),
            bg: Color::from_u32(0x282C34),
            div_line: Color::from_u32(0x3F444F),
            main_fg: Color::from_u32(0xABB2BF),
            title: Color::from_u32(0xE5C07B),
            inactive_fg: Color::from_u32(0x5C6370),
        }
    }

    /// Load theme from a btop-style file: `theme[key]="value"` or `theme[key]='value'`.
    /// A missing path means One Dark; `palette` then swaps the block colours.
    pub fn load(path: Option<&Path>, palette: crate::Palette) -> Result<Self, ThemeError> {
        let mut theme = match path {
            Some(p) => {
                let s = std::fs::read_to_string(p)?;
                Self::from_map(&parse_theme_file(&s))
            }
            None => Self::onedark_default(),
        };
        theme.apply_palette(palette);
        Ok(theme)
    }

    /// One Dark with the palette's block colours.
    pub fn default_for_palette(palette: crate::Palette) -> Self {
        let mut theme = Self::onedark_default();
        theme.apply_palette(palette);
        theme
    }

    pub fn apply_palette(&mut self, palette: crate::Palette) {
        match palette {
            crate::Palette::Normal => {}
            crate::Palette::HighContrast => self.blocks = HIGH_CONTRAST_BLOCKS.map(Color::from_u32),
            crate::Palette::Colorblind => self.blocks = COLORBLIND_BLOCKS.map(Color::from_u32),
        }
    }

    fn from_map(map: &HashMap<String, String>) -> Self {
        let get = |key: &str| map.get(key).and_then(|v| parse_hex(v).ok());
        let fallback = Self::onedark_default();
        let b = fallback.blocks;
        Self {
            blocks: [
                get("mem_box").or_else(|| get("cpu_start")).unwrap_or(b[0]),
                get("title").or_else(|| get("cpu_mid")).unwrap_or(b[1]),
                get("cpu_end").or_else(|| get("temp_end")).unwrap_or(b[2]),
                get("cpu_box").unwrap_or(b[3]),
                get("net_box").unwrap_or(b[4]),
                get("hi_fg").or_else(|| get("proc_misc")).unwrap_or(b[5]),
            ],
            bg: get("main_bg").unwrap_or(fallback.bg),
            div_line: get("div_line").unwrap_or(fallback.div_line),
            main_fg: get("main_fg").unwrap_or(fallback.main_fg),
            title: get("title").unwrap_or(fallback.title),
            inactive_fg: get("inactive_fg").unwrap_or(fallback.inactive_fg),
        }
    }

    /// Colour of the n-th block of the tower.
    #[inline]
    pub fn block_color(&self, index: usize) -> Color {
        self.blocks[index % self.blocks.len()]
    }
}

/// Parse btop-style theme file into key -> value map.
fn parse_theme_file(s: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in s.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some(stripped) = line.strip_prefix("theme[") else {
            continue;
        };
        let Some((key, rest)) = stripped.split_once(']') else {
            continue;
        };
        let Some((_, value)) = rest.split_once('=') else {
            continue;
        };
        let value = value.trim().trim_matches('"').trim_matches('\'');
        if !value.is_empty() {
            map.insert(key.trim().to_string(), value.to_string());
        }
    }
    map
}

/// Parse hex colour "#RRGGBB" or "#RGB" into ratatui Color.
pub fn parse_hex(s: &str) -> Result<Color, ThemeError> {
    let s = s.trim().trim_start_matches('#');
    let bad = || ThemeError::InvalidHex(s.to_string());
    let channel = |h: &str| u8::from_str_radix(h, 16).map_err(|_| bad());
    let (r, g, b) = match s.len() {
        6 => (channel(&s[0..2])?, channel(&s[2..4])?, channel(&s[4..6])?),
        3 => (
            channel(&s[0..1])? * 17,
            channel(&s[1..2])? * 17,
            channel(&s[2..3])? * 17,
        ),
        _ => return Err(bad()),
    };
    Ok(Color::Rgb(r, g, b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_6() {
        let c = parse_hex("#98C379").unwrap();
        assert!(matches!(c, Color::Rgb(0x98, 0xC3, 0x79)));
    }

    #[test]
    fn test_parse_hex_3() {
        let c = parse_hex("#FFF").unwrap();
        assert!(matches!(c, Color::Rgb(255, 255, 255)));
    }

    #[test]
    fn test_parse_hex_rejects_garbage() {
        assert!(parse_hex("#12345").is_err());
        assert!(parse_hex("#GGHHII").is_err());
    }

    #[test]
    fn test_parse_theme_line() {
        let map = parse_theme_file(r##"theme[meter_bg]="#31353F""##);
        assert_eq!(map.get("meter_bg"), Some(&"#31353F".to_string()));
    }

    #[test]
    fn test_theme_file_overrides_and_falls_back() {
        let map = parse_theme_file("theme[main_fg]='#FFFFFF'\ntheme[cpu_box]=\"#000\"\n# comment");
        let theme = Theme::from_map(&map);
        assert_eq!(theme.main_fg, Color::Rgb(255, 255, 255));
        assert_eq!(theme.blocks[3], Color::Rgb(0, 0, 0));
        assert_eq!(theme.title, Theme::onedark_default().title);
    }

    #[test]
    fn test_block_colours_cycle() {
        let theme = Theme::default();
        assert_eq!(theme.block_color(0), theme.block_color(6));
    }
}
