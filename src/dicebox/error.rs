//! Error types for the dice box.

use std::path::PathBuf;

/// Failures reported by a dice engine or by the adapter around it.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("dice engine is not initialized")]
    NotInitialized,

    #[error("engine returned {actual} dice, expected {expected}")]
    CountMismatch { expected: usize, actual: usize },

    #[error("engine returned no die for the reroll")]
    EmptyReroll,

    #[error("die is not in the rendered scene: {0}")]
    UnknownDie(String),

    #[error("engine rejected the request: {0}")]
    Rejected(String),

    #[error("malformed engine payload: {0}")]
    Payload(#[from] serde_json::Error),
}

/// An action attempted while the session or screen does not allow it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidState {
    #[error("a roll of the whole collection is already in progress")]
    RollAllInProgress,

    #[error("{count} reroll(s) still in progress")]
    RerollsInProgress { count: usize },

    #[error("die #{} is already being rerolled", .index + 1)]
    RerollInProgress { index: usize },

    #[error("die index {index} is out of range for {len} result(s)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("die #{} is not being rerolled", .index + 1)]
    NotRerolling { index: usize },

    #[error("no roll of the whole collection is in flight")]
    NoRollInFlight,

    #[error("no collection selected")]
    NoCollection,

    #[error("action not available on the {0} screen")]
    Screen(&'static str),

    #[error("no rerolls left this turn")]
    NoRerollsLeft,

    #[error("nothing has been rolled yet")]
    NothingRolled,

    #[error("no match is being played")]
    NoMatch,

    #[error("the match is over")]
    MatchOver,

    #[error("a match turn is in progress; reroll single dice or stand")]
    MatchTurn,
}

/// Problems loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] ron::error::SpannedError),

    #[error("invalid palette color '{value}': {source}")]
    Color {
        value: String,
        #[source]
        source: csscolorparser::ParseColorError,
    },

    #[error("palette must contain at least one color")]
    EmptyPalette,
}

/// Unparseable die notation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotationError {
    #[error("Invalid dice format: {0}. Use format like '2d6' or 'd20'")]
    Format(String),

    #[error("Invalid count: {0}")]
    Count(String),

    #[error("Unknown die type: {0}. Valid: d4, d6, d8, d10, d12, d20")]
    DieType(String),
}

/// Top-level error surfaced by the view controller.
#[derive(Debug, thiserror::Error)]
pub enum DiceBoxError {
    #[error("could not start the dice engine: {0}")]
    EngineInit(#[source] EngineError),

    #[error("roll failed: {0}")]
    Roll(#[source] EngineError),

    #[error("reroll of die #{} failed: {source}", .index + 1)]
    Reroll {
        index: usize,
        #[source]
        source: EngineError,
    },

    #[error(transparent)]
    InvalidState(#[from] InvalidState),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type DiceBoxResult<T> = Result<T, DiceBoxError>;
