//! Collection filter configuration
//!
//! A [`FilterConfig`] selects which rarities and colors are visible. Its
//! 10-character identity ([`config_to_id`]) keys views that must be rebuilt
//! when the filter changes, since positions in one filtered sequence mean
//! nothing in another.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// Card rarity as reported by the card API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    Common,
    Uncommon,
    Rare,
    Mythic,
    Special,
    Bonus,
    /// Anything else the API may report
    #[default]
    #[serde(other)]
    Other,
}

impl FromStr for Rarity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "common" | "c" => Ok(Rarity::Common),
            "uncommon" | "u" => Ok(Rarity::Uncommon),
            "rare" | "r" => Ok(Rarity::Rare),
            "mythic" | "m" => Ok(Rarity::Mythic),
            "special" => Ok(Rarity::Special),
            "bonus" => Ok(Rarity::Bonus),
            other => Err(Error::InvalidInput(format!("unknown rarity: {}", other))),
        }
    }
}

/// Filterable color, including colorless
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    White,
    Blue,
    Black,
    Red,
    Green,
    Colorless,
}

impl Color {
    pub const ALL: [Color; 6] = [
        Color::White,
        Color::Blue,
        Color::Black,
        Color::Red,
        Color::Green,
        Color::Colorless,
    ];

    /// Map a color-identity letter (W, U, B, R, G, C)
    pub fn from_letter(letter: &str) -> Option<Color> {
        match letter.trim() {
            "W" | "w" => Some(Color::White),
            "U" | "u" => Some(Color::Blue),
            "B" | "b" => Some(Color::Black),
            "R" | "r" => Some(Color::Red),
            "G" | "g" => Some(Color::Green),
            "C" | "c" => Some(Color::Colorless),
            _ => None,
        }
    }

    pub fn letter(self) -> char {
        match self {
            Color::White => 'W',
            Color::Blue => 'U',
            Color::Black => 'B',
            Color::Red => 'R',
            Color::Green => 'G',
            Color::Colorless => 'C',
        }
    }
}

impl FromStr for Color {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "white" | "w" => Ok(Color::White),
            "blue" | "u" => Ok(Color::Blue),
            "black" | "b" => Ok(Color::Black),
            "red" | "r" => Ok(Color::Red),
            "green" | "g" => Ok(Color::Green),
            "colorless" | "c" => Ok(Color::Colorless),
            other => Err(Error::InvalidInput(format!("unknown color: {}", other))),
        }
    }
}

/// Enabled rarities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RarityFlags {
    pub common: bool,
    pub uncommon: bool,
    pub rare: bool,
    pub mythic: bool,
}

/// Enabled colors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColorFlags {
    pub white: bool,
    pub blue: bool,
    pub black: bool,
    pub red: bool,
    pub green: bool,
    pub colorless: bool,
}

/// Which rarities and colors are visible
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilterConfig {
    pub rarities: RarityFlags,
    pub colors: ColorFlags,
}

impl Default for FilterConfig {
    /// Everything enabled
    fn default() -> Self {
        Self {
            rarities: RarityFlags {
                common: true,
                uncommon: true,
                rare: true,
                mythic: true,
            },
            colors: ColorFlags {
                white: true,
                blue: true,
                black: true,
                red: true,
                green: true,
                colorless: true,
            },
        }
    }
}

impl FilterConfig {
    /// Start from everything enabled and switch off the listed values
    pub fn excluding(rarities: &[Rarity], colors: &[Color]) -> Self {
        let mut config = Self::default();
        for rarity in rarities {
            config.set_rarity(*rarity, false);
        }
        for color in colors {
            config.set_color(*color, false);
        }
        config
    }

    /// Whether `rarity` passes; rarities outside the four toggles always pass
    pub fn rarity_enabled(&self, rarity: Rarity) -> bool {
        match rarity {
            Rarity::Common => self.rarities.common,
            Rarity::Uncommon => self.rarities.uncommon,
            Rarity::Rare => self.rarities.rare,
            Rarity::Mythic => self.rarities.mythic,
            Rarity::Special | Rarity::Bonus | Rarity::Other => true,
        }
    }

    pub fn color_enabled(&self, color: Color) -> bool {
        match color {
            Color::White => self.colors.white,
            Color::Blue => self.colors.blue,
            Color::Black => self.colors.black,
            Color::Red => self.colors.red,
            Color::Green => self.colors.green,
            Color::Colorless => self.colors.colorless,
        }
    }

    /// Toggle one rarity; ignored for rarities without a toggle
    pub fn set_rarity(&mut self, rarity: Rarity, enabled: bool) {
        match rarity {
            Rarity::Common => self.rarities.common = enabled,
            Rarity::Uncommon => self.rarities.uncommon = enabled,
            Rarity::Rare => self.rarities.rare = enabled,
            Rarity::Mythic => self.rarities.mythic = enabled,
            Rarity::Special | Rarity::Bonus | Rarity::Other => {}
        }
    }

    pub fn set_color(&mut self, color: Color, enabled: bool) {
        match color {
            Color::White => self.colors.white = enabled,
            Color::Blue => self.colors.blue = enabled,
            Color::Black => self.colors.black = enabled,
            Color::Red => self.colors.red = enabled,
            Color::Green => self.colors.green = enabled,
            Color::Colorless => self.colors.colorless = enabled,
        }
    }

    /// Stable 10-character identity, see [`config_to_id`]
    pub fn id(&self) -> String {
        config_to_id(self)
    }

    fn flags(&self) -> [bool; 10] {
        [
            self.rarities.common,
            self.rarities.uncommon,
            self.rarities.rare,
            self.rarities.mythic,
            self.colors.white,
            self.colors.blue,
            self.colors.black,
            self.colors.red,
            self.colors.green,
            self.colors.colorless,
        ]
    }
}

impl fmt::Display for FilterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&config_to_id(self))
    }
}

/// One `T`/`F` per flag: common, uncommon, rare, mythic, then white, blue,
/// black, red, green, colorless
pub fn config_to_id(config: &FilterConfig) -> String {
    config
        .flags()
        .iter()
        .map(|enabled| if *enabled { 'T' } else { 'F' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_id_all_enabled() {
        assert_eq!(config_to_id(&FilterConfig::default()), "TTTTTTTTTT");
    }

    #[test]
    fn test_id_is_deterministic() {
        let config = FilterConfig::excluding(&[Rarity::Rare], &[Color::Blue]);
        let first = config_to_id(&config);
        let second = config_to_id(&config);
        assert_eq!(first, second);
        assert_eq!(first.len(), 10);
        assert_eq!(first, "TTFTTFTTTT");
    }

    #[test]
    fn test_id_differs_for_every_single_flag() {
        let base = FilterConfig::default();
        let base_id = base.id();
        let mut seen = std::collections::HashSet::new();

        for rarity in [Rarity::Common, Rarity::Uncommon, Rarity::Rare, Rarity::Mythic] {
            let mut changed = base;
            changed.set_rarity(rarity, false);
            assert_ne!(changed.id(), base_id, "{:?} flag must change id", rarity);
            assert!(seen.insert(changed.id()));
        }
        for color in Color::ALL {
            let mut changed = base;
            changed.set_color(color, false);
            assert_ne!(changed.id(), base_id, "{:?} flag must change id", color);
            assert!(seen.insert(changed.id()));
        }
        assert_eq!(seen.len(), 10);
    }

    #[test]
    fn test_rarity_order_comes_first() {
        let config = FilterConfig::excluding(&[Rarity::Common], &[Color::Colorless]);
        assert_eq!(config.id(), "FTTTTTTTTF");
    }

    #[test]
    fn test_untoggled_rarities_always_pass() {
        let config = FilterConfig::excluding(
            &[Rarity::Common, Rarity::Uncommon, Rarity::Rare, Rarity::Mythic],
            &[],
        );
        assert!(config.rarity_enabled(Rarity::Special));
        assert!(config.rarity_enabled(Rarity::Bonus));
        assert!(!config.rarity_enabled(Rarity::Mythic));
    }

    #[test]
    fn test_rarity_deserialize_unknown() {
        let rarity: Rarity = serde_json::from_str("\"mythic\"").unwrap();
        assert_eq!(rarity, Rarity::Mythic);
        let rarity: Rarity = serde_json::from_str("\"timeshifted\"").unwrap();
        assert_eq!(rarity, Rarity::Other);
    }

    #[test]
    fn test_color_letters() {
        assert_eq!(Color::from_letter("R"), Some(Color::Red));
        assert_eq!(Color::from_letter("C"), Some(Color::Colorless));
        assert_eq!(Color::from_letter("X"), None);
        for color in Color::ALL {
            assert_eq!(Color::from_letter(&color.letter().to_string()), Some(color));
        }
    }
}
