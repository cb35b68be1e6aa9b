//! Shared fixtures: a scripted engine whose replies the test controls,
//! and a presenter that records every frame.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::oneshot;

use battledice::dicebox::{
    EngineConfig, EngineDie, EngineError, EngineSetup, Frame, Notation, Notice, Palette,
    Presenter, Randomizer, RerollOptions, RollEngine, RollEngineAdapter, RollOptions,
    ViewController,
};

pub type Reply = Result<Vec<EngineDie>, EngineError>;

enum Pending {
    Ready(Reply),
    Gated(oneshot::Receiver<Reply>),
}

impl Pending {
    async fn resolve(self) -> Reply {
        match self {
            Pending::Ready(reply) => reply,
            Pending::Gated(rx) => rx
                .await
                .unwrap_or_else(|_| Err(EngineError::Rejected("gate dropped".into()))),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Call {
    Init(EngineSetup),
    Roll(Vec<String>, RollOptions),
    Reroll(Vec<EngineDie>, RerollOptions),
    Clear,
}

/// Engine that answers from queued replies.
///
/// Rolls answer in queue order. Rerolls look for a reply keyed by the
/// targeted die's `rollId` first, then fall back to the queue.
#[derive(Default)]
pub struct ScriptedEngine {
    init_failure: RefCell<Option<EngineError>>,
    rolls: RefCell<VecDeque<Pending>>,
    rerolls: RefCell<VecDeque<Pending>>,
    rerolls_by_id: RefCell<HashMap<u64, Pending>>,
    calls: RefCell<Vec<Call>>,
    next_id: Cell<u64>,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// A die payload the way the engine would send it.
    pub fn die(sides: u32, value: u32, roll_id: u64) -> EngineDie {
        serde_json::from_value(json!({
            "sides": sides,
            "value": value,
            "groupId": 0,
            "rollId": roll_id,
        }))
        .expect("valid die payload")
    }

    fn next_id(&self) -> u64 {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        id
    }

    /// Queue a roll reply; dice get roll ids in call order.
    pub fn push_roll(&self, dice: &[(u32, u32)]) -> Vec<u64> {
        let dice: Vec<EngineDie> = dice
            .iter()
            .map(|&(sides, value)| Self::die(sides, value, self.next_id()))
            .collect();
        let ids = dice
            .iter()
            .filter_map(|d| d.identity_field("rollId").and_then(|v| v.as_u64()))
            .collect();
        self.rolls.borrow_mut().push_back(Pending::Ready(Ok(dice)));
        ids
    }

    pub fn push_roll_reply(&self, reply: Reply) {
        self.rolls.borrow_mut().push_back(Pending::Ready(reply));
    }

    pub fn gate_roll(&self) -> oneshot::Sender<Reply> {
        let (tx, rx) = oneshot::channel();
        self.rolls.borrow_mut().push_back(Pending::Gated(rx));
        tx
    }

    /// Answer the next reroll of `roll_id` with a fresh die.
    pub fn push_reroll(&self, roll_id: u64, sides: u32, value: u32) -> u64 {
        let new_id = self.next_id();
        self.rerolls_by_id.borrow_mut().insert(
            roll_id,
            Pending::Ready(Ok(vec![Self::die(sides, value, new_id)])),
        );
        new_id
    }

    pub fn push_reroll_reply(&self, reply: Reply) {
        self.rerolls.borrow_mut().push_back(Pending::Ready(reply));
    }

    /// Hold the reroll of `roll_id` until the returned sender fires.
    pub fn gate_reroll(&self, roll_id: u64) -> oneshot::Sender<Reply> {
        let (tx, rx) = oneshot::channel();
        self.rerolls_by_id
            .borrow_mut()
            .insert(roll_id, Pending::Gated(rx));
        tx
    }

    pub fn fail_init(&self, message: &str) {
        *self.init_failure.borrow_mut() = Some(EngineError::Rejected(message.to_string()));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn init_count(&self) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|c| matches!(c, Call::Init(_)))
            .count()
    }

    pub fn roll_calls(&self) -> Vec<(Vec<String>, RollOptions)> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|c| match c {
                Call::Roll(notations, options) => Some((notations.clone(), options.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn reroll_calls(&self) -> Vec<(Vec<EngineDie>, RerollOptions)> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|c| match c {
                Call::Reroll(dice, options) => Some((dice.clone(), *options)),
                _ => None,
            })
            .collect()
    }
}

#[async_trait(?Send)]
impl RollEngine for ScriptedEngine {
    async fn init(&self, setup: &EngineSetup) -> Result<(), EngineError> {
        self.calls.borrow_mut().push(Call::Init(setup.clone()));
        match self.init_failure.borrow_mut().take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn roll(
        &self,
        notations: &[Notation],
        options: &RollOptions,
    ) -> Result<Vec<EngineDie>, EngineError> {
        self.calls.borrow_mut().push(Call::Roll(
            notations.iter().map(ToString::to_string).collect(),
            options.clone(),
        ));
        let pending = self.rolls.borrow_mut().pop_front();
        match pending {
            Some(pending) => pending.resolve().await,
            None => Err(EngineError::Rejected("no scripted roll".into())),
        }
    }

    async fn reroll(
        &self,
        dice: &[EngineDie],
        options: &RerollOptions,
    ) -> Result<Vec<EngineDie>, EngineError> {
        self.calls
            .borrow_mut()
            .push(Call::Reroll(dice.to_vec(), *options));
        let keyed = dice
            .first()
            .and_then(|d| d.identity_field("rollId"))
            .and_then(|v| v.as_u64())
            .and_then(|id| self.rerolls_by_id.borrow_mut().remove(&id));
        let pending = keyed.or_else(|| self.rerolls.borrow_mut().pop_front());
        match pending {
            Some(pending) => pending.resolve().await,
            None => Err(EngineError::Rejected("no scripted reroll".into())),
        }
    }

    fn clear(&self) {
        self.calls.borrow_mut().push(Call::Clear);
    }
}

#[derive(Default)]
pub struct RecordingPresenter {
    pub frames: Vec<Frame>,
    pub notices: Vec<Notice>,
    /// Panic inside the next `render` call.
    pub fail_next_render: Cell<bool>,
}

impl RecordingPresenter {
    pub fn last_frame(&self) -> &Frame {
        self.frames.last().expect("at least one frame rendered")
    }

    pub fn errors(&self) -> Vec<String> {
        self.notices
            .iter()
            .filter_map(|n| match n {
                Notice::Error(message) => Some(message.clone()),
                Notice::Status(_) => None,
            })
            .collect()
    }

    pub fn statuses(&self) -> Vec<String> {
        self.notices
            .iter()
            .filter_map(|n| match n {
                Notice::Status(message) => Some(message.clone()),
                Notice::Error(_) => None,
            })
            .collect()
    }
}

impl Presenter for RecordingPresenter {
    fn render(&mut self, frame: &Frame) {
        if self.fail_next_render.replace(false) {
            panic!("presenter failed to draw");
        }
        self.frames.push(frame.clone());
    }

    fn notify(&mut self, notice: &Notice) {
        self.notices.push(notice.clone());
    }
}

pub type TestPage = ViewController<ScriptedEngine, RecordingPresenter>;

pub fn adapter(engine: ScriptedEngine) -> RollEngineAdapter<ScriptedEngine> {
    RollEngineAdapter::new(
        engine,
        EngineConfig::default(),
        Palette::default(),
        Randomizer::seeded(11),
    )
}

pub fn page() -> TestPage {
    ViewController::new(adapter(ScriptedEngine::new()), RecordingPresenter::default())
}

pub fn engine(page: &TestPage) -> &ScriptedEngine {
    page.adapter().engine()
}

/// Yield until `done` holds; panics if it never does.
pub async fn wait_until(mut done: impl FnMut() -> bool) {
    for _ in 0..1_000 {
        if done() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition never became true");
}
