//! Battle Dice
//!
//! Pick one of two dice collections, roll it through a dice engine and
//! reroll single dice or the whole set.

pub mod dicebox;
pub mod logging;
