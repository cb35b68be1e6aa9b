//! Game rules
//!
//! Each collection has a target; a total above it busts. Two players
//! play a match of [`MATCH_ROUNDS`] rounds. The player who opens a round
//! gets [`LEAD_REROLLS`] rerolls, the other [`FOLLOW_REROLLS`], and the
//! opener alternates every round. A round win is worth 2 points, a draw
//! 1 point each.

use std::fmt;

use serde::Serialize;

use crate::dicebox::error::InvalidState;
use crate::dicebox::history::DieSummary;
use crate::dicebox::types::{CollectionKey, RollSet};

pub const MATCH_ROUNDS: u32 = 7;
pub const LEAD_REROLLS: u32 = 3;
pub const FOLLOW_REROLLS: u32 = 2;

const WIN_POINTS: u32 = 2;
const DRAW_POINTS: u32 = 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Player {
    #[serde(rename = "Player 1")]
    One,
    #[serde(rename = "Player 2")]
    Two,
}

impl Player {
    pub fn label(self) -> &'static str {
        match self {
            Player::One => "Player 1",
            Player::Two => "Player 2",
        }
    }

    pub fn other(self) -> Player {
        match self {
            Player::One => Player::Two,
            Player::Two => Player::One,
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A total measured against its collection's target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Standing {
    pub total: u32,
    pub target: u32,
}

impl Standing {
    pub fn new(total: u32, target: u32) -> Self {
        Self { total, target }
    }

    pub fn of(results: &RollSet, collection: CollectionKey) -> Self {
        Self::new(results.total(), collection.target())
    }

    pub fn is_bust(&self) -> bool {
        self.total > self.target
    }

    /// The total, or -1 for a bust, so any standing total beats a bust.
    pub fn score(&self) -> i64 {
        if self.is_bust() {
            -1
        } else {
            i64::from(self.total)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RoundOutcome {
    /// `None` is a draw.
    pub winner: Option<Player>,
    pub points_one: u32,
    pub points_two: u32,
}

impl RoundOutcome {
    pub fn decide(one: Standing, two: Standing) -> Self {
        match one.score().cmp(&two.score()) {
            std::cmp::Ordering::Greater => Self {
                winner: Some(Player::One),
                points_one: WIN_POINTS,
                points_two: 0,
            },
            std::cmp::Ordering::Less => Self {
                winner: Some(Player::Two),
                points_one: 0,
                points_two: WIN_POINTS,
            },
            std::cmp::Ordering::Equal => Self {
                winner: None,
                points_one: DRAW_POINTS,
                points_two: DRAW_POINTS,
            },
        }
    }

    pub fn points(&self, player: Player) -> u32 {
        match player {
            Player::One => self.points_one,
            Player::Two => self.points_two,
        }
    }
}

/// Whose turn it is and how many rerolls it comes with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Turn {
    pub round: u32,
    pub player: Player,
    pub rerolls: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TurnRecord {
    pub player: Player,
    pub dice: Vec<DieSummary>,
    pub final_sum: u32,
    pub bust: bool,
    pub rerolls_used: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoundRecord {
    pub round: u32,
    pub turns: Vec<TurnRecord>,
    pub outcome: RoundOutcome,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Score {
    #[serde(rename = "Player 1")]
    pub one: u32,
    #[serde(rename = "Player 2")]
    pub two: u32,
}

impl Score {
    pub fn of(&self, player: Player) -> u32 {
        match player {
            Player::One => self.one,
            Player::Two => self.two,
        }
    }
}

/// A two-player match on one collection, with its game log.
#[derive(Debug, Clone, Serialize)]
pub struct Match {
    collection: CollectionKey,
    rounds: Vec<RoundRecord>,
    #[serde(skip)]
    opening_turn: Option<TurnRecord>,
    final_score: Score,
}

impl Match {
    pub fn new(collection: CollectionKey) -> Self {
        Self {
            collection,
            rounds: Vec::new(),
            opening_turn: None,
            final_score: Score::default(),
        }
    }

    pub fn collection(&self) -> CollectionKey {
        self.collection
    }

    pub fn rounds(&self) -> &[RoundRecord] {
        &self.rounds
    }

    pub fn score(&self) -> Score {
        self.final_score
    }

    pub fn is_finished(&self) -> bool {
        self.rounds.len() as u32 >= MATCH_ROUNDS
    }

    /// The turn to play next, `None` once the match is over.
    pub fn current_turn(&self) -> Option<Turn> {
        if self.is_finished() {
            return None;
        }
        let round = self.rounds.len() as u32 + 1;
        let opener = if round % 2 == 1 { Player::One } else { Player::Two };
        Some(match &self.opening_turn {
            None => Turn {
                round,
                player: opener,
                rerolls: LEAD_REROLLS,
            },
            Some(_) => Turn {
                round,
                player: opener.other(),
                rerolls: FOLLOW_REROLLS,
            },
        })
    }

    /// Close the current turn on `results`. Returns the round record when
    /// this turn finished a round.
    pub fn finish_turn(
        &mut self,
        results: &RollSet,
        rerolls_used: u32,
    ) -> Result<Option<RoundRecord>, InvalidState> {
        let turn = self.current_turn().ok_or(InvalidState::MatchOver)?;
        if results.is_empty() {
            return Err(InvalidState::NothingRolled);
        }
        let standing = Standing::of(results, self.collection);
        let record = TurnRecord {
            player: turn.player,
            dice: results.iter().map(DieSummary::from).collect(),
            final_sum: standing.total,
            bust: standing.is_bust(),
            rerolls_used: rerolls_used.min(turn.rerolls),
        };

        let Some(opening) = self.opening_turn.take() else {
            self.opening_turn = Some(record);
            return Ok(None);
        };

        let standing_of = |r: &TurnRecord| Standing::new(r.final_sum, self.collection.target());
        let (one, two) = match opening.player {
            Player::One => (standing_of(&opening), standing_of(&record)),
            Player::Two => (standing_of(&record), standing_of(&opening)),
        };
        let outcome = RoundOutcome::decide(one, two);
        self.final_score.one += outcome.points_one;
        self.final_score.two += outcome.points_two;

        let round = RoundRecord {
            round: turn.round,
            turns: vec![opening, record],
            outcome,
        };
        self.rounds.push(round.clone());
        Ok(Some(round))
    }

    /// Winner of a finished match; `None` while playing or on a draw.
    pub fn winner(&self) -> Option<Player> {
        if !self.is_finished() {
            return None;
        }
        match self.final_score.one.cmp(&self.final_score.two) {
            std::cmp::Ordering::Greater => Some(Player::One),
            std::cmp::Ordering::Less => Some(Player::Two),
            std::cmp::Ordering::Equal => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
