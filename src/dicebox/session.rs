//! Session state
//!
//! Which collection is active, the last roll, which throws are in
//! flight and how many rerolls the turn has left. All mutation goes
//! through begin/complete pairs so that a full roll and single-die
//! rerolls never touch the results at the same time.

use std::collections::BTreeSet;

use crate::dicebox::error::InvalidState;
use crate::dicebox::types::{CollectionKey, DieResult, RollSet};

#[derive(Debug, Default)]
pub struct SessionState {
    current_collection: Option<CollectionKey>,
    last_results: RollSet,
    rerolling: BTreeSet<usize>,
    rolling_all: bool,
    /// Rerolls allowed per turn; `None` is unlimited.
    reroll_budget: Option<u32>,
    rerolls_left: Option<u32>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_collection(&self) -> Option<CollectionKey> {
        self.current_collection
    }

    pub fn last_results(&self) -> &RollSet {
        &self.last_results
    }

    pub fn is_rolling_all(&self) -> bool {
        self.rolling_all
    }

    pub fn is_rerolling(&self, index: usize) -> bool {
        self.rerolling.contains(&index)
    }

    pub fn rerolls_in_progress(&self) -> impl Iterator<Item = usize> + '_ {
        self.rerolling.iter().copied()
    }

    pub fn reroll_budget(&self) -> Option<u32> {
        self.reroll_budget
    }

    pub fn rerolls_left(&self) -> Option<u32> {
        self.rerolls_left
    }

    /// Rerolls spent this turn, counting those still in flight.
    pub fn rerolls_used(&self) -> u32 {
        match (self.reroll_budget, self.rerolls_left) {
            (Some(budget), Some(left)) => budget.saturating_sub(left),
            _ => 0,
        }
    }

    /// Set the per-turn allowance and start the current turn with it.
    pub fn set_reroll_budget(&mut self, budget: Option<u32>) {
        self.reroll_budget = budget;
        self.rerolls_left = budget;
    }

    /// Switch collection and forget the previous results.
    pub fn select_collection(&mut self, key: CollectionKey) {
        self.current_collection = Some(key);
        self.last_results.clear();
    }

    pub fn begin_roll_all(&mut self) -> Result<CollectionKey, InvalidState> {
        if self.rolling_all {
            return Err(InvalidState::RollAllInProgress);
        }
        if !self.rerolling.is_empty() {
            return Err(InvalidState::RerollsInProgress {
                count: self.rerolling.len(),
            });
        }
        let key = self.current_collection.ok_or(InvalidState::NoCollection)?;
        self.rolling_all = true;
        Ok(key)
    }

    pub fn complete_roll_all(&mut self, results: RollSet) -> Result<(), InvalidState> {
        if !self.rolling_all {
            return Err(InvalidState::NoRollInFlight);
        }
        self.last_results = results;
        self.rolling_all = false;
        // A fresh throw starts a fresh turn.
        self.rerolls_left = self.reroll_budget;
        Ok(())
    }

    /// The roll failed: release the flag and keep whatever was there.
    pub fn abort_roll_all(&mut self) {
        self.rolling_all = false;
    }

    /// Mark `index` as rerolling and hand back the die to throw again.
    pub fn begin_reroll(&mut self, index: usize) -> Result<DieResult, InvalidState> {
        if self.rolling_all {
            return Err(InvalidState::RollAllInProgress);
        }
        if self.rerolling.contains(&index) {
            return Err(InvalidState::RerollInProgress { index });
        }
        let die = self
            .last_results
            .get(index)
            .cloned()
            .ok_or(InvalidState::IndexOutOfRange {
                index,
                len: self.last_results.len(),
            })?;
        if let Some(left) = self.rerolls_left.as_mut() {
            if *left == 0 {
                return Err(InvalidState::NoRerollsLeft);
            }
            *left -= 1;
        }
        self.rerolling.insert(index);
        Ok(die)
    }

    /// Store the rerolled die, returning the one it replaced.
    pub fn complete_reroll(
        &mut self,
        index: usize,
        die: DieResult,
    ) -> Result<DieResult, InvalidState> {
        if !self.rerolling.remove(&index) {
            return Err(InvalidState::NotRerolling { index });
        }
        let len = self.last_results.len();
        self.last_results
            .replace(index, die)
            .ok_or(InvalidState::IndexOutOfRange { index, len })
    }

    /// The reroll failed: release the index and give the reroll back.
    pub fn abort_reroll(&mut self, index: usize) {
        if self.rerolling.remove(&index) {
            if let Some(left) = self.rerolls_left.as_mut() {
                *left += 1;
            }
        }
    }

    /// Drop the collection and results. The reroll allowance stays.
    pub fn reset(&mut self) {
        self.current_collection = None;
        self.last_results.clear();
        self.rerolling.clear();
        self.rolling_all = false;
        self.rerolls_left = self.reroll_budget;
    }

    pub fn is_main_controls_disabled(&self) -> bool {
        self.rolling_all || !self.rerolling.is_empty()
    }
}
