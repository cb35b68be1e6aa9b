//! Configuration types and loading
//!
//! Engine setup values and the cosmetic palette. Config files are RON;
//! every field has a default so a partial file is enough.

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::palette::DEFAULT_PALETTE;
use crate::dicebox::error::ConfigError;

/// Physics constants handed to the engine on init.
///
/// The engine's own defaults misbehave, so these are always supplied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicsTuning {
    #[serde(default = "default_scale")]
    pub scale: f32,
    #[serde(default = "default_throw_force")]
    pub throw_force: f32,
    #[serde(default = "default_gravity")]
    pub gravity: f32,
    #[serde(default = "default_mass")]
    pub mass: f32,
    #[serde(default = "default_spin_force")]
    pub spin_force: f32,
}

fn default_scale() -> f32 {
    13.0
}
fn default_throw_force() -> f32 {
    5.0
}
fn default_gravity() -> f32 {
    3.0
}
fn default_mass() -> f32 {
    1.0
}
fn default_spin_force() -> f32 {
    10.0
}

impl Default for PhysicsTuning {
    fn default() -> Self {
        Self {
            scale: default_scale(),
            throw_force: default_throw_force(),
            gravity: default_gravity(),
            mass: default_mass(),
            spin_force: default_spin_force(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_container")]
    pub container: String,
    #[serde(default = "default_theme")]
    pub theme: String,
    #[serde(default = "default_asset_path")]
    pub asset_path: String,
    #[serde(default = "default_offscreen")]
    pub offscreen: bool,
    #[serde(default)]
    pub physics: PhysicsTuning,
    /// How long the simulated engine lets a throw settle, in milliseconds.
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
}

fn default_container() -> String {
    "#dice-box".to_string()
}
fn default_theme() -> String {
    "theme-dice-of-rolling".to_string()
}
fn default_asset_path() -> String {
    "/assets/dice-box/".to_string()
}
fn default_offscreen() -> bool {
    true
}
fn default_settle_ms() -> u64 {
    600
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            container: default_container(),
            theme: default_theme(),
            asset_path: default_asset_path(),
            offscreen: default_offscreen(),
            physics: PhysicsTuning::default(),
            settle_ms: default_settle_ms(),
        }
    }
}

/// Top-level configuration read by the binaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default = "default_palette")]
    pub palette: Vec<String>,
    /// Fixed RNG seed; `None` seeds from entropy.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_palette() -> Vec<String> {
    DEFAULT_PALETTE.iter().map(|c| c.to_string()).collect()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            palette: default_palette(),
            seed: None,
        }
    }
}

impl AppConfig {
    pub fn from_ron_str(text: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(text)?)
    }

    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_ron_str(&text)?;
        tracing::info!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Load `path` if given, otherwise defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load_from_file(path),
            None => Ok(Self::default()),
        }
    }
}
