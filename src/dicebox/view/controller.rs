use std::cell::{Cell, Ref, RefCell};

use tracing::{error, info, warn};

use super::{Frame, Notice, Presenter, Screen};
use crate::dicebox::engine::{RerollOptions, RollEngine, RollEngineAdapter, RollOptions};
use crate::dicebox::error::{DiceBoxError, DiceBoxResult, InvalidState};
use crate::dicebox::game::{Match, RoundRecord, LEAD_REROLLS};
use crate::dicebox::history::RollHistory;
use crate::dicebox::session::SessionState;
use crate::dicebox::types::CollectionKey;

/// A user action, as dispatched from a button or a typed command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Choose(CollectionKey),
    StartMatch(CollectionKey),
    RollAll,
    RerollAll,
    Reroll(usize),
    Stand,
    Back,
}

/// Owns the session and the engine adapter and renders after each step.
///
/// Every procedure takes `&self`, so several rerolls can be awaited at
/// once on one thread. Borrows of the session never cross an `.await`.
pub struct ViewController<E, P> {
    adapter: RollEngineAdapter<E>,
    presenter: RefCell<P>,
    session: RefCell<SessionState>,
    screen: Cell<Screen>,
    history: RefCell<RollHistory>,
    game: RefCell<Option<Match>>,
    default_budget: Option<u32>,
}

impl<E: RollEngine, P: Presenter> ViewController<E, P> {
    pub fn new(adapter: RollEngineAdapter<E>, presenter: P) -> Self {
        Self {
            adapter,
            presenter: RefCell::new(presenter),
            session: RefCell::new(SessionState::new()),
            screen: Cell::new(Screen::CollectionSelect),
            history: RefCell::new(RollHistory::new()),
            game: RefCell::new(None),
            default_budget: None,
        }
    }

    /// Rerolls allowed per throw outside a match. Unlimited by default.
    pub fn with_reroll_budget(mut self, budget: Option<u32>) -> Self {
        self.default_budget = budget;
        self.session.get_mut().set_reroll_budget(budget);
        self
    }

    pub fn screen(&self) -> Screen {
        self.screen.get()
    }

    pub fn session(&self) -> Ref<'_, SessionState> {
        self.session.borrow()
    }

    pub fn presenter(&self) -> Ref<'_, P> {
        self.presenter.borrow()
    }

    pub fn history(&self) -> Ref<'_, RollHistory> {
        self.history.borrow()
    }

    /// The match being played, or the one just finished.
    pub fn game(&self) -> Ref<'_, Option<Match>> {
        self.game.borrow()
    }

    pub fn adapter(&self) -> &RollEngineAdapter<E> {
        &self.adapter
    }

    /// Push the current frame to the presenter.
    pub fn render(&self) {
        let frame = Frame::build(
            self.screen.get(),
            &self.session.borrow(),
            self.game.borrow().as_ref(),
        );
        self.presenter.borrow_mut().render(&frame);
    }

    pub async fn dispatch(&self, action: Action) -> DiceBoxResult<()> {
        match action {
            Action::Choose(key) => self.choose(key).await,
            Action::StartMatch(key) => self.start_match(key).await,
            Action::RollAll => self.roll_all().await,
            Action::RerollAll => self.reroll_all().await,
            Action::Reroll(index) => self.reroll(index).await,
            Action::Stand => self.stand().await,
            Action::Back => self.back(),
        }
    }

    /// Activate a collection: start the engine if needed, then roll it.
    pub async fn choose(&self, key: CollectionKey) -> DiceBoxResult<()> {
        let screen = self.screen.get();
        if screen != Screen::CollectionSelect {
            return self.reject(InvalidState::Screen(screen.name()));
        }

        self.session.borrow_mut().select_collection(key);
        self.screen.set(Screen::Starting(key));
        info!(collection = %key, "collection selected");
        self.notify(Notice::Status(format!("Selected: {}", key.label())));
        self.render();

        let started = self.adapter.initialize().await;
        if let Err(source) = started {
            self.session.borrow_mut().reset();
            self.screen.set(Screen::CollectionSelect);
            let err = DiceBoxError::EngineInit(source);
            self.report_failure(Some(key), "initialize", &err);
            self.render();
            return Err(err);
        }

        self.screen.set(Screen::CollectionActive(key));
        self.run_roll_all().await
    }

    /// Open a two-player match on `key` and throw the first turn.
    pub async fn start_match(&self, key: CollectionKey) -> DiceBoxResult<()> {
        let screen = self.screen.get();
        if screen != Screen::CollectionSelect {
            return self.reject(InvalidState::Screen(screen.name()));
        }

        *self.game.borrow_mut() = Some(Match::new(key));
        self.session
            .borrow_mut()
            .set_reroll_budget(Some(LEAD_REROLLS));
        info!(collection = %key, target = key.target(), "match started");
        self.notify(Notice::Status(format!(
            "Match on {}: stay at or under {}",
            key.label(),
            key.target()
        )));

        let chosen = self.choose(key).await;
        if chosen.is_err() && self.screen.get() == Screen::CollectionSelect {
            self.end_match();
        }
        chosen
    }

    pub async fn roll_all(&self) -> DiceBoxResult<()> {
        self.active_collection()?;
        if self.is_mid_turn() {
            return self.reject(InvalidState::MatchTurn);
        }
        self.run_roll_all().await
    }

    /// "Reroll all" throws the whole collection again.
    pub async fn reroll_all(&self) -> DiceBoxResult<()> {
        self.roll_all().await
    }

    /// Throw the die at `index` again, leaving the others in place.
    pub async fn reroll(&self, index: usize) -> DiceBoxResult<()> {
        let key = self.active_collection()?;

        let begun = self.session.borrow_mut().begin_reroll(index);
        let die = match begun {
            Ok(die) => die,
            Err(invalid) => return self.reject(invalid),
        };
        let in_flight = InFlight::new(&self.session, Throw::Die(index));
        self.render();

        let outcome = self.adapter.reroll(&die, &RerollOptions::default()).await;
        in_flight.land();
        let result = match outcome {
            Ok(replacement) => {
                let stored = self
                    .session
                    .borrow_mut()
                    .complete_reroll(index, replacement.clone());
                match stored {
                    Ok(old) => {
                        let total = self.session.borrow().last_results().total();
                        info!(
                            index,
                            sides = replacement.sides(),
                            old = old.value(),
                            new = replacement.value(),
                            total,
                            "die rerolled"
                        );
                        self.history
                            .borrow_mut()
                            .record_reroll(key, index, &old, &replacement, total);
                        Ok(())
                    }
                    Err(invalid) => self.reject(invalid),
                }
            }
            Err(source) => {
                self.session.borrow_mut().abort_reroll(index);
                let err = DiceBoxError::Reroll { index, source };
                self.report_failure(Some(key), "reroll", &err);
                Err(err)
            }
        };

        self.render();
        result
    }

    /// End the current match turn on the dice as they lie and throw for
    /// the next player.
    pub async fn stand(&self) -> DiceBoxResult<()> {
        let key = self.active_collection()?;
        if let Some(invalid) = self.busy_state() {
            return self.reject(invalid);
        }

        let stood = {
            let session = self.session.borrow();
            match self.game.borrow_mut().as_mut() {
                Some(game) => game
                    .finish_turn(session.last_results(), session.rerolls_used())
                    .map(|round| (round, game.current_turn())),
                None => Err(InvalidState::NoMatch),
            }
        };
        let (round, next) = match stood {
            Ok(stood) => stood,
            Err(invalid) => return self.reject(invalid),
        };
        if let Some(round) = &round {
            self.announce_round(round);
        }

        let Some(turn) = next else {
            self.session
                .borrow_mut()
                .set_reroll_budget(self.default_budget);
            self.announce_result();
            self.render();
            return Ok(());
        };

        {
            let mut session = self.session.borrow_mut();
            session.select_collection(key);
            session.set_reroll_budget(Some(turn.rerolls));
        }
        info!(round = turn.round, player = %turn.player, "turn started");
        self.notify(Notice::Status(format!(
            "Round {}: {} throws with {} rerolls",
            turn.round, turn.player, turn.rerolls
        )));
        self.run_roll_all().await
    }

    /// Return to collection select and drop the session. An unfinished
    /// match is abandoned.
    pub fn back(&self) -> DiceBoxResult<()> {
        self.active_collection()?;
        if let Some(invalid) = self.busy_state() {
            return self.reject(invalid);
        }

        self.adapter.clear();
        self.session.borrow_mut().reset();
        if self.game.borrow().as_ref().is_some_and(|g| !g.is_finished()) {
            self.notify(Notice::Status("Match abandoned".to_string()));
        }
        self.end_match();
        self.screen.set(Screen::CollectionSelect);
        info!("back to collection select");
        self.render();
        Ok(())
    }

    async fn run_roll_all(&self) -> DiceBoxResult<()> {
        let begun = self.session.borrow_mut().begin_roll_all();
        let key = match begun {
            Ok(key) => key,
            Err(invalid) => return self.reject(invalid),
        };
        let in_flight = InFlight::new(&self.session, Throw::All);
        self.render();

        let options = RollOptions {
            theme_color: self
                .adapter
                .random_theme_color()
                .map(|c| c.hex().to_string()),
        };
        let outcome = self.adapter.roll(key.notations(), &options).await;
        in_flight.land();
        let result = match outcome {
            Ok(results) => {
                let total = results.total();
                self.history.borrow_mut().record_roll(key, &results);
                let stored = self.session.borrow_mut().complete_roll_all(results);
                match stored {
                    Ok(()) => {
                        let bust = total > key.target();
                        info!(collection = %key, total, bust, "collection rolled");
                        Ok(())
                    }
                    Err(invalid) => self.reject(invalid),
                }
            }
            Err(source) => {
                self.session.borrow_mut().abort_roll_all();
                let err = DiceBoxError::Roll(source);
                self.report_failure(Some(key), "roll", &err);
                Err(err)
            }
        };

        self.render();
        result
    }

    fn end_match(&self) {
        self.game.borrow_mut().take();
        self.session
            .borrow_mut()
            .set_reroll_budget(self.default_budget);
    }

    /// A match turn has thrown and not yet stood.
    fn is_mid_turn(&self) -> bool {
        let playing = self
            .game
            .borrow()
            .as_ref()
            .is_some_and(|g| !g.is_finished());
        playing && !self.session.borrow().last_results().is_empty()
    }

    fn busy_state(&self) -> Option<InvalidState> {
        let session = self.session.borrow();
        if session.is_rolling_all() {
            Some(InvalidState::RollAllInProgress)
        } else if session.is_main_controls_disabled() {
            Some(InvalidState::RerollsInProgress {
                count: session.rerolls_in_progress().count(),
            })
        } else {
            None
        }
    }

    fn announce_round(&self, round: &RoundRecord) {
        info!(round = round.round, winner = ?round.outcome.winner, "round finished");
        let message = match round.outcome.winner {
            Some(player) => format!("Round {}: {} wins", round.round, player),
            None => format!("Round {}: draw", round.round),
        };
        self.notify(Notice::Status(message));
    }

    fn announce_result(&self) {
        let (score, winner) = match self.game.borrow().as_ref() {
            Some(game) => (game.score(), game.winner()),
            None => return,
        };
        info!(one = score.one, two = score.two, winner = ?winner, "match finished");
        let verdict = match winner {
            Some(player) => format!("{player} wins the match"),
            None => "The match is drawn".to_string(),
        };
        self.notify(Notice::Status(format!(
            "{verdict} ({} - {})",
            score.one, score.two
        )));
    }

    fn active_collection(&self) -> DiceBoxResult<CollectionKey> {
        match self.screen.get() {
            Screen::CollectionActive(key) => Ok(key),
            other => self.reject(InvalidState::Screen(other.name())),
        }
    }

    fn reject<T>(&self, invalid: InvalidState) -> DiceBoxResult<T> {
        warn!(reason = %invalid, "action rejected");
        self.notify(Notice::Error(format!("Not now: {invalid}")));
        Err(DiceBoxError::InvalidState(invalid))
    }

    fn report_failure(&self, collection: Option<CollectionKey>, action: &str, err: &DiceBoxError) {
        error!(action, error = %err, "dice engine call failed");
        self.history
            .borrow_mut()
            .record_failure(collection, action, err.to_string());
        self.notify(Notice::Error(err.to_string()));
    }

    fn notify(&self, notice: Notice) {
        self.presenter.borrow_mut().notify(&notice);
    }
}

#[derive(Debug, Clone, Copy)]
enum Throw {
    All,
    Die(usize),
}

/// Releases a begun throw if the procedure unwinds or is dropped before
/// the engine answers, so the page does not stay busy forever.
struct InFlight<'a> {
    session: &'a RefCell<SessionState>,
    throw: Option<Throw>,
}

impl<'a> InFlight<'a> {
    fn new(session: &'a RefCell<SessionState>, throw: Throw) -> Self {
        Self {
            session,
            throw: Some(throw),
        }
    }

    /// The engine answered; completion is up to the caller now.
    fn land(mut self) {
        self.throw = None;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let Some(throw) = self.throw.take() else {
            return;
        };
        let Ok(mut session) = self.session.try_borrow_mut() else {
            return;
        };
        warn!(?throw, "throw abandoned before the engine answered");
        match throw {
            Throw::All => session.abort_roll_all(),
            Throw::Die(index) => session.abort_reroll(index),
        }
    }
}
