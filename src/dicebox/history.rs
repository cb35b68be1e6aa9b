//! Roll history
//!
//! Append-only log of what happened during the page's lifetime. Unlike
//! the session it survives going back to collection select.

use serde::Serialize;

use crate::dicebox::types::{CollectionKey, DieResult, RollSet};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DieSummary {
    pub sides: u32,
    pub value: u32,
}

impl From<&DieResult> for DieSummary {
    fn from(die: &DieResult) -> Self {
        Self {
            sides: die.sides(),
            value: die.value(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RollEvent {
    Roll {
        collection: CollectionKey,
        dice: Vec<DieSummary>,
        total: u32,
    },
    Reroll {
        collection: CollectionKey,
        index: usize,
        sides: u32,
        old: u32,
        new: u32,
        total: u32,
    },
    Failed {
        collection: Option<CollectionKey>,
        action: String,
        message: String,
    },
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RollHistory {
    events: Vec<RollEvent>,
}

impl RollHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[RollEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn record_roll(&mut self, collection: CollectionKey, results: &RollSet) {
        self.events.push(RollEvent::Roll {
            collection,
            dice: results.iter().map(DieSummary::from).collect(),
            total: results.total(),
        });
    }

    pub fn record_reroll(
        &mut self,
        collection: CollectionKey,
        index: usize,
        old: &DieResult,
        new: &DieResult,
        total: u32,
    ) {
        self.events.push(RollEvent::Reroll {
            collection,
            index,
            sides: new.sides(),
            old: old.value(),
            new: new.value(),
            total,
        });
    }

    pub fn record_failure(
        &mut self,
        collection: Option<CollectionKey>,
        action: &str,
        message: String,
    ) {
        self.events.push(RollEvent::Failed {
            collection,
            action: action.to_string(),
            message,
        });
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.events)
    }
}
