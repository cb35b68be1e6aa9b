//! Cosmetic theme colors and the randomizer that picks them.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::fmt;

use crate::dicebox::error::ConfigError;

pub const DEFAULT_PALETTE: [&str; 10] = [
    "#348888", "#22BABB", "#9EF8EE", "#FA7F08", "#F24405", "#F25EB0", "#B9BF04", "#F2B705",
    "#F27405", "#F23005",
];

/// A palette entry, normalized to `#RRGGBB`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThemeColor {
    hex: String,
}

impl ThemeColor {
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        let color = csscolorparser::parse(value).map_err(|source| ConfigError::Color {
            value: value.to_string(),
            source,
        })?;
        let [r, g, b, _] = color.to_rgba8();
        Ok(Self {
            hex: format!("#{r:02X}{g:02X}{b:02X}"),
        })
    }

    pub fn hex(&self) -> &str {
        &self.hex
    }
}

impl fmt::Display for ThemeColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.hex)
    }
}

/// A fixed, non-empty list of theme colors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    colors: Vec<ThemeColor>,
}

impl Palette {
    pub fn from_strings<S: AsRef<str>>(values: &[S]) -> Result<Self, ConfigError> {
        let colors = values
            .iter()
            .map(|v| ThemeColor::parse(v.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        if colors.is_empty() {
            return Err(ConfigError::EmptyPalette);
        }
        Ok(Self { colors })
    }

    pub fn colors(&self) -> &[ThemeColor] {
        &self.colors
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            colors: DEFAULT_PALETTE
                .iter()
                .filter_map(|c| ThemeColor::parse(c).ok())
                .collect(),
        }
    }
}

/// Uniform picks from a slice.
pub struct Randomizer {
    rng: StdRng,
}

impl Randomizer {
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_seed_option(seed: Option<u64>) -> Self {
        seed.map_or_else(Self::from_entropy, Self::seeded)
    }

    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        items.choose(&mut self.rng)
    }
}

impl Default for Randomizer {
    fn default() -> Self {
        Self::from_entropy()
    }
}
