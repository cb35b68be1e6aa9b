//! The two fixed dice collections.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::dice::{DiceType, Notation};

const COLLECTION_A: [Notation; 3] = [
    Notation::single(DiceType::D4),
    Notation::single(DiceType::D8),
    Notation::single(DiceType::D12),
];

const COLLECTION_B: [Notation; 3] = [
    Notation::single(DiceType::D6),
    Notation::single(DiceType::D10),
    Notation::single(DiceType::D20),
];

/// Identifier of a dice collection
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CollectionKey {
    A,
    B,
}

impl CollectionKey {
    pub const ALL: [CollectionKey; 2] = [CollectionKey::A, CollectionKey::B];

    /// Notations rolled together for this collection, in declared order.
    pub fn notations(self) -> &'static [Notation] {
        match self {
            CollectionKey::A => &COLLECTION_A,
            CollectionKey::B => &COLLECTION_B,
        }
    }

    /// Highest total that does not bust.
    pub fn target(self) -> u32 {
        match self {
            CollectionKey::A => 14,
            CollectionKey::B => 21,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            CollectionKey::A => "Collection A",
            CollectionKey::B => "Collection B",
        }
    }
}

impl fmt::Display for CollectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollectionKey::A => f.write_str("A"),
            CollectionKey::B => f.write_str("B"),
        }
    }
}

impl FromStr for CollectionKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "a" => Ok(CollectionKey::A),
            "b" => Ok(CollectionKey::B),
            other => Err(format!("Unknown collection: {other}. Valid: A, B")),
        }
    }
}
