use std::cell::RefCell;
use std::time::Duration;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{json, Map, Value as JsonValue};
use tracing::trace;

use super::{EngineSetup, RerollOptions, RollEngine, RollEngineAdapter, RollOptions};
use crate::dicebox::error::{ConfigError, EngineError};
use crate::dicebox::types::{AppConfig, EngineDie, Notation, Palette, Randomizer};

const ROLL_ID: &str = "rollId";
const GROUP_ID: &str = "groupId";
const THEME_COLOR: &str = "themeColor";

struct SimulatedScene {
    setup: Option<EngineSetup>,
    rng: StdRng,
    next_roll_id: u64,
    dice: Vec<EngineDie>,
}

impl SimulatedScene {
    fn throw(&mut self, sides: u32, group_id: u64, theme_color: &str) -> EngineDie {
        let value = self.rng.gen_range(1..=sides.max(1));
        let roll_id = self.next_roll_id;
        self.next_roll_id += 1;

        let mut identity = Map::new();
        identity.insert(GROUP_ID.to_string(), json!(group_id));
        identity.insert(ROLL_ID.to_string(), json!(roll_id));
        identity.insert(THEME_COLOR.to_string(), json!(theme_color));

        let die = EngineDie {
            sides,
            value: Some(value),
            result: None,
            total: None,
            identity,
        };
        self.dice.push(die.clone());
        die
    }
}

/// Headless stand-in for a 3D dice engine.
///
/// Dice resolve uniformly at random; every throw waits `settle` before
/// resolving, the way a physics engine waits for dice to come to rest.
pub struct SimulatedEngine {
    scene: RefCell<SimulatedScene>,
    settle: Duration,
}

impl SimulatedEngine {
    pub fn new(settle: Duration, seed: Option<u64>) -> Self {
        let rng = seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
        Self {
            scene: RefCell::new(SimulatedScene {
                setup: None,
                rng,
                next_roll_id: 0,
                dice: Vec::new(),
            }),
            settle,
        }
    }

    /// Dice currently on the table.
    pub fn rendered(&self) -> Vec<EngineDie> {
        self.scene.borrow().dice.clone()
    }

    pub fn setup(&self) -> Option<EngineSetup> {
        self.scene.borrow().setup.clone()
    }

    async fn settle(&self) {
        if !self.settle.is_zero() {
            tokio::time::sleep(self.settle).await;
        }
    }
}

impl RollEngineAdapter<SimulatedEngine> {
    /// Adapter over a [`SimulatedEngine`] configured from `config`.
    pub fn simulated(config: &AppConfig) -> Result<Self, ConfigError> {
        let palette = Palette::from_strings(&config.palette)?;
        let engine = SimulatedEngine::new(
            Duration::from_millis(config.engine.settle_ms),
            config.seed,
        );
        // Keep the color picks independent of the dice values.
        let randomizer = Randomizer::from_seed_option(config.seed.map(|s| s.rotate_left(17)));
        Ok(Self::new(engine, config.engine.clone(), palette, randomizer))
    }
}

fn roll_id(die: &EngineDie) -> Option<u64> {
    die.identity_field(ROLL_ID).and_then(JsonValue::as_u64)
}

#[async_trait(?Send)]
impl RollEngine for SimulatedEngine {
    async fn init(&self, setup: &EngineSetup) -> Result<(), EngineError> {
        self.scene.borrow_mut().setup = Some(setup.clone());
        Ok(())
    }

    async fn roll(
        &self,
        notations: &[Notation],
        options: &RollOptions,
    ) -> Result<Vec<EngineDie>, EngineError> {
        let dice = {
            let mut scene = self.scene.borrow_mut();
            let default_color = scene
                .setup
                .as_ref()
                .map(|s| s.theme_color.clone())
                .ok_or(EngineError::NotInitialized)?;
            let color = options.theme_color.clone().unwrap_or(default_color);

            let mut dice = Vec::with_capacity(Notation::dice_count(notations));
            for (group_id, notation) in notations.iter().enumerate() {
                for _ in 0..notation.count {
                    dice.push(scene.throw(notation.sides(), group_id as u64, &color));
                }
            }
            dice
        };

        trace!(count = dice.len(), "simulated throw");
        self.settle().await;
        Ok(dice)
    }

    async fn reroll(
        &self,
        dice: &[EngineDie],
        options: &RerollOptions,
    ) -> Result<Vec<EngineDie>, EngineError> {
        let rerolled = {
            let mut scene = self.scene.borrow_mut();
            let default_color = scene
                .setup
                .as_ref()
                .map(|s| s.theme_color.clone())
                .ok_or(EngineError::NotInitialized)?;

            let mut rerolled = Vec::with_capacity(dice.len());
            for die in dice {
                let id = roll_id(die).ok_or_else(|| EngineError::UnknownDie(die.sides.to_string()))?;
                if options.remove {
                    let before = scene.dice.len();
                    scene.dice.retain(|d| roll_id(d) != Some(id));
                    if scene.dice.len() == before {
                        return Err(EngineError::UnknownDie(id.to_string()));
                    }
                }
                let group_id = die
                    .identity_field(GROUP_ID)
                    .and_then(JsonValue::as_u64)
                    .unwrap_or_default();
                let color = die
                    .identity_field(THEME_COLOR)
                    .and_then(JsonValue::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| default_color.clone());
                rerolled.push(scene.throw(die.sides, group_id, &color));
            }
            rerolled
        };

        trace!(count = rerolled.len(), "simulated reroll");
        self.settle().await;
        Ok(rerolled)
    }

    fn clear(&self) {
        self.scene.borrow_mut().dice.clear();
    }
}
