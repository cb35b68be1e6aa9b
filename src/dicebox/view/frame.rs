use crate::dicebox::game::{Match, Score, Standing, Turn};
use crate::dicebox::session::SessionState;
use crate::dicebox::types::{CollectionKey, DieResult, RollSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    CollectionSelect,
    /// A collection was chosen and the engine is still starting.
    Starting(CollectionKey),
    CollectionActive(CollectionKey),
}

impl Screen {
    pub fn name(self) -> &'static str {
        match self {
            Screen::CollectionSelect => "collection select",
            Screen::Starting(_) => "starting",
            Screen::CollectionActive(_) => "collection",
        }
    }

    pub fn collection(self) -> Option<CollectionKey> {
        match self {
            Screen::CollectionSelect => None,
            Screen::Starting(key) | Screen::CollectionActive(key) => Some(key),
        }
    }
}

/// Named controls a presenter can enable or disable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    RollAll,
    RerollAll,
    Back,
    Stand,
    Reroll(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RerollControl {
    pub index: usize,
    pub label: String,
    pub enabled: bool,
}

/// Snapshot of everything on screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub screen: Screen,
    pub rolling: bool,
    pub results_line: Option<String>,
    pub total: Option<u32>,
    /// Target of the shown collection.
    pub target: Option<u32>,
    pub bust: bool,
    pub rerolls_left: Option<u32>,
    pub reroll_controls: Vec<RerollControl>,
    pub main_controls_enabled: bool,
    /// Set while a match is being played.
    pub turn: Option<Turn>,
    pub score: Option<Score>,
}

impl Frame {
    pub fn build(screen: Screen, session: &SessionState, game: Option<&Match>) -> Self {
        let target = screen.collection().map(|key| key.target());
        let turn = game.and_then(Match::current_turn);
        let score = game.map(Match::score);
        match screen {
            Screen::CollectionSelect | Screen::Starting(_) => Self {
                screen,
                rolling: false,
                results_line: None,
                total: None,
                target,
                bust: false,
                rerolls_left: None,
                reroll_controls: Vec::new(),
                main_controls_enabled: screen == Screen::CollectionSelect,
                turn: None,
                score: None,
            },
            Screen::CollectionActive(key) => {
                let results = session.last_results();
                let rolling = session.is_rolling_all();
                let rerolls_left = session.rerolls_left();
                let out_of_rerolls = rerolls_left == Some(0);
                let reroll_controls = results
                    .iter()
                    .enumerate()
                    .map(|(index, die)| RerollControl {
                        index,
                        label: reroll_label(index, die),
                        enabled: !rolling && !out_of_rerolls && !session.is_rerolling(index),
                    })
                    .collect();
                let total = (!results.is_empty()).then(|| results.total());
                Self {
                    screen,
                    rolling,
                    results_line: results_line(results),
                    total,
                    target,
                    bust: total.is_some() && Standing::of(results, key).is_bust(),
                    rerolls_left,
                    reroll_controls,
                    main_controls_enabled: !session.is_main_controls_disabled(),
                    turn,
                    score,
                }
            }
        }
    }

    pub fn is_enabled(&self, control: Control) -> bool {
        match control {
            Control::Back => self.main_controls_enabled,
            // Mid-turn a match player may only reroll single dice.
            Control::RollAll | Control::RerollAll => {
                self.main_controls_enabled && (self.turn.is_none() || self.total.is_none())
            }
            Control::Stand => {
                self.main_controls_enabled && self.turn.is_some() && self.total.is_some()
            }
            Control::Reroll(index) => self
                .reroll_controls
                .iter()
                .any(|c| c.index == index && c.enabled),
        }
    }
}

/// `Reroll 8-sided Die #2`
pub fn reroll_label(index: usize, die: &DieResult) -> String {
    format!("Reroll {}-sided Die #{}", die.sides(), index + 1)
}

/// `Dice: 4-sided: 2 | 8-sided: 5 | 12-sided: 11   Total: 18`, or `None`
/// when there is nothing to show.
pub fn results_line(results: &RollSet) -> Option<String> {
    if results.is_empty() {
        return None;
    }
    let details: Vec<String> = results
        .iter()
        .map(|die| format!("{}-sided: {}", die.sides(), die.value()))
        .collect();
    Some(format!(
        "Dice: {}   Total: {}",
        details.join(" | "),
        results.total()
    ))
}
