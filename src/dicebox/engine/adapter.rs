use std::cell::{Cell, RefCell};

use tracing::{debug, info};

use super::{EngineSetup, RerollOptions, RollEngine, RollOptions};
use crate::dicebox::error::EngineError;
use crate::dicebox::types::{
    DieResult, EngineConfig, Notation, Palette, Randomizer, RollSet, ThemeColor,
};

/// Owns the dice engine and the one-time setup around it.
pub struct RollEngineAdapter<E> {
    engine: E,
    config: EngineConfig,
    palette: Palette,
    randomizer: RefCell<Randomizer>,
    initialized: Cell<bool>,
}

impl<E: RollEngine> RollEngineAdapter<E> {
    pub fn new(engine: E, config: EngineConfig, palette: Palette, randomizer: Randomizer) -> Self {
        Self {
            engine,
            config,
            palette,
            randomizer: RefCell::new(randomizer),
            initialized: Cell::new(false),
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.get()
    }

    /// A random palette color for the next throw.
    pub fn random_theme_color(&self) -> Option<ThemeColor> {
        self.randomizer
            .borrow_mut()
            .pick(self.palette.colors())
            .cloned()
    }

    /// Set up the engine. Later calls return immediately.
    pub async fn initialize(&self) -> Result<(), EngineError> {
        if self.initialized.get() {
            return Ok(());
        }

        let theme_color = self
            .random_theme_color()
            .map(|c| c.hex().to_string())
            .unwrap_or_default();
        let setup = EngineSetup {
            container: self.config.container.clone(),
            theme: self.config.theme.clone(),
            theme_color,
            asset_path: self.config.asset_path.clone(),
            offscreen: self.config.offscreen,
            physics: self.config.physics.clone(),
        };

        self.engine.init(&setup).await?;
        self.initialized.set(true);
        info!(theme = %setup.theme, color = %setup.theme_color, "dice engine initialized");
        Ok(())
    }

    /// Clear the scene and throw `notations`, one result per die in order.
    pub async fn roll(
        &self,
        notations: &[Notation],
        options: &RollOptions,
    ) -> Result<RollSet, EngineError> {
        if !self.initialized.get() {
            return Err(EngineError::NotInitialized);
        }
        self.engine.clear();

        let expected = Notation::dice_count(notations);
        let dice = self.engine.roll(notations, options).await?;
        if dice.len() != expected {
            return Err(EngineError::CountMismatch {
                expected,
                actual: dice.len(),
            });
        }

        debug!(count = dice.len(), "roll resolved");
        Ok(RollSet::new(
            dice.into_iter().map(DieResult::from_engine).collect(),
        ))
    }

    /// Throw one previously resolved die again and return its replacement.
    pub async fn reroll(
        &self,
        die: &DieResult,
        options: &RerollOptions,
    ) -> Result<DieResult, EngineError> {
        if !self.initialized.get() {
            return Err(EngineError::NotInitialized);
        }

        let dice = self
            .engine
            .reroll(std::slice::from_ref(die.handle()), options)
            .await?;
        let replacement = dice.into_iter().next().ok_or(EngineError::EmptyReroll)?;

        debug!(sides = replacement.sides, "reroll resolved");
        Ok(DieResult::from_engine(replacement))
    }

    pub fn clear(&self) {
        self.engine.clear();
    }
}
