//! Engine Module
//!
//! The dice engine animates and resolves dice; this crate only talks to
//! it through [`RollEngine`]. [`RollEngineAdapter`] owns an engine and
//! adds the once-only initialization, the cosmetic color and the result
//! bookkeeping. [`SimulatedEngine`] is a headless engine for terminals
//! and tests.

mod adapter;
mod simulated;

pub use adapter::*;
pub use simulated::*;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::dicebox::error::EngineError;
use crate::dicebox::types::{EngineDie, Notation, PhysicsTuning};

/// Everything the engine needs to build its scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineSetup {
    pub container: String,
    pub theme: String,
    pub theme_color: String,
    pub asset_path: String,
    pub offscreen: bool,
    #[serde(flatten)]
    pub physics: PhysicsTuning,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme_color: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RerollOptions {
    /// Drop the die's old rendered instance.
    pub remove: bool,
    /// Throw from a fresh drop point instead of where the die lies.
    pub new_start_point: bool,
}

impl Default for RerollOptions {
    fn default() -> Self {
        Self {
            remove: true,
            new_start_point: true,
        }
    }
}

/// The external dice engine.
///
/// Calls run on a single cooperative thread; an engine may suspend for
/// as long as its animation takes. Results come back in request order,
/// one die per requested die.
#[async_trait(?Send)]
pub trait RollEngine {
    async fn init(&self, setup: &EngineSetup) -> Result<(), EngineError>;

    async fn roll(
        &self,
        notations: &[Notation],
        options: &RollOptions,
    ) -> Result<Vec<EngineDie>, EngineError>;

    async fn reroll(
        &self,
        dice: &[EngineDie],
        options: &RerollOptions,
    ) -> Result<Vec<EngineDie>, EngineError>;

    /// Remove every rendered die.
    fn clear(&self);
}
