//! Dice-related types
//!
//! This module contains DiceType, Notation, the raw engine payload
//! (EngineDie), resolved dice (DieResult) and RollSet.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::fmt;
use std::str::FromStr;

use crate::dicebox::error::NotationError;

/// All supported dice types
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DiceType {
    D4,
    D6,
    D8,
    D10,
    D12,
    D20,
}

impl DiceType {
    pub fn max_value(&self) -> u32 {
        match self {
            DiceType::D4 => 4,
            DiceType::D6 => 6,
            DiceType::D8 => 8,
            DiceType::D10 => 10,
            DiceType::D12 => 12,
            DiceType::D20 => 20,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DiceType::D4 => "D4",
            DiceType::D6 => "D6",
            DiceType::D8 => "D8",
            DiceType::D10 => "D10",
            DiceType::D12 => "D12",
            DiceType::D20 => "D20",
        }
    }

    pub fn parse(s: &str) -> Option<DiceType> {
        match s.to_lowercase().as_str() {
            "d4" => Some(DiceType::D4),
            "d6" => Some(DiceType::D6),
            "d8" => Some(DiceType::D8),
            "d10" => Some(DiceType::D10),
            "d12" => Some(DiceType::D12),
            "d20" => Some(DiceType::D20),
            _ => None,
        }
    }
}

/// A die specification such as `1d6`: how many dice of which type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Notation {
    pub count: u32,
    pub die: DiceType,
}

impl Notation {
    pub const fn single(die: DiceType) -> Self {
        Self { count: 1, die }
    }

    pub fn sides(&self) -> u32 {
        self.die.max_value()
    }

    /// Total number of dice a list of notations asks for.
    pub fn dice_count(notations: &[Notation]) -> usize {
        notations.iter().map(|n| n.count as usize).sum()
    }
}

impl fmt::Display for Notation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}d{}", self.count, self.sides())
    }
}

impl FromStr for Notation {
    type Err = NotationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();

        let (count_str, die_str) = if s.starts_with('d') {
            ("1", s.as_str())
        } else if let Some(pos) = s.find('d') {
            (&s[..pos], &s[pos..])
        } else {
            return Err(NotationError::Format(s.clone()));
        };

        let count: u32 = count_str
            .parse()
            .map_err(|_| NotationError::Count(count_str.to_string()))?;
        if count == 0 {
            return Err(NotationError::Count(count_str.to_string()));
        }
        let die = DiceType::parse(die_str).ok_or_else(|| NotationError::DieType(die_str.to_string()))?;

        Ok(Notation { count, die })
    }
}

/// A die as the engine reports it.
///
/// Engines disagree on where the resolved number lives, so all three
/// known field names are kept. Anything else the engine attaches
/// (group, roll and die ids, theme) lands in `identity` and is handed
/// back untouched on reroll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineDie {
    pub sides: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u32>,
    #[serde(flatten)]
    pub identity: Map<String, JsonValue>,
}

impl EngineDie {
    /// First present of `value`, `result`, `total`; 0 when none is.
    pub fn resolved_value(&self) -> u32 {
        self.value.or(self.result).or(self.total).unwrap_or(0)
    }

    pub fn identity_field(&self, key: &str) -> Option<&JsonValue> {
        self.identity.get(key)
    }
}

/// One rolled die after the engine has resolved it.
#[derive(Debug, Clone, PartialEq)]
pub struct DieResult {
    sides: u32,
    value: u32,
    handle: EngineDie,
}

impl DieResult {
    pub(crate) fn from_engine(handle: EngineDie) -> Self {
        Self {
            sides: handle.sides,
            value: handle.resolved_value(),
            handle,
        }
    }

    pub fn sides(&self) -> u32 {
        self.sides
    }

    pub fn value(&self) -> u32 {
        self.value
    }

    /// The engine's own record of this die, used to target it on reroll.
    pub fn handle(&self) -> &EngineDie {
        &self.handle
    }
}

/// Ordered results of the most recent full roll.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RollSet {
    dice: Vec<DieResult>,
}

impl RollSet {
    pub fn new(dice: Vec<DieResult>) -> Self {
        Self { dice }
    }

    pub fn len(&self) -> usize {
        self.dice.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dice.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&DieResult> {
        self.dice.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DieResult> {
        self.dice.iter()
    }

    /// Sum of all resolved values.
    pub fn total(&self) -> u32 {
        self.dice.iter().map(|d| d.value).sum()
    }

    /// Swap in a new die at `index`, returning the old one.
    pub(crate) fn replace(&mut self, index: usize, die: DieResult) -> Option<DieResult> {
        self.dice
            .get_mut(index)
            .map(|slot| std::mem::replace(slot, die))
    }

    pub(crate) fn clear(&mut self) {
        self.dice.clear();
    }
}

impl<'a> IntoIterator for &'a RollSet {
    type Item = &'a DieResult;
    type IntoIter = std::slice::Iter<'a, DieResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.dice.iter()
    }
}
