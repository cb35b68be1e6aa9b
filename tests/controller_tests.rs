//! Tests for the collection page flow

mod common;

use std::rc::Rc;

use battledice::dicebox::{
    Action, CollectionKey, Control, DiceBoxError, EngineError, InvalidState, Notice, RollEvent,
    Screen,
};
use common::{engine, page, wait_until, ScriptedEngine, TestPage};

/// Choose collection A with a scripted first roll of `dice`.
async fn active_page(dice: &[(u32, u32)]) -> (TestPage, Vec<u64>) {
    let page = page();
    let ids = engine(&page).push_roll(dice);
    page.choose(CollectionKey::A).await.unwrap();
    (page, ids)
}

fn values(page: &TestPage) -> Vec<u32> {
    page.session()
        .last_results()
        .iter()
        .map(|d| d.value())
        .collect()
}

#[tokio::test]
async fn test_choose_rolls_collection_a() {
    let (page, _) = active_page(&[(4, 2), (8, 5), (12, 11)]).await;

    assert_eq!(page.screen(), Screen::CollectionActive(CollectionKey::A));
    assert_eq!(values(&page), vec![2, 5, 11]);
    assert_eq!(page.session().last_results().total(), 18);

    let presenter = page.presenter();
    let frame = presenter.last_frame();
    assert_eq!(frame.total, Some(18));
    assert_eq!(
        frame.results_line.as_deref(),
        Some("Dice: 4-sided: 2 | 8-sided: 5 | 12-sided: 11   Total: 18")
    );
    let labels: Vec<&str> = frame
        .reroll_controls
        .iter()
        .map(|c| c.label.as_str())
        .collect();
    assert_eq!(
        labels,
        vec![
            "Reroll 4-sided Die #1",
            "Reroll 8-sided Die #2",
            "Reroll 12-sided Die #3"
        ]
    );
    assert!(frame.is_enabled(Control::RollAll));
    assert!(frame.is_enabled(Control::Reroll(2)));
}

#[tokio::test]
async fn test_choose_walks_through_starting_screen() {
    let (page, _) = active_page(&[(4, 1), (8, 1), (12, 1)]).await;

    let presenter = page.presenter();
    let screens: Vec<Screen> = presenter.frames.iter().map(|f| f.screen).collect();
    assert_eq!(screens[0], Screen::Starting(CollectionKey::A));
    assert!(!presenter.frames[0].main_controls_enabled);
    assert_eq!(
        screens.last(),
        Some(&Screen::CollectionActive(CollectionKey::A))
    );
    assert_eq!(
        presenter.notices.first(),
        Some(&Notice::Status("Selected: Collection A".into()))
    );
}

#[tokio::test]
async fn test_collections_request_their_dice_in_order() {
    let page = page();
    engine(&page).push_roll(&[(6, 3), (10, 7), (20, 19)]);
    page.choose(CollectionKey::B).await.unwrap();

    let rolls = engine(&page).roll_calls();
    assert_eq!(rolls.len(), 1);
    assert_eq!(rolls[0].0, vec!["1d6", "1d10", "1d20"]);
    assert!(rolls[0].1.theme_color.is_some());
    assert_eq!(page.session().last_results().total(), 29);
}

#[tokio::test]
async fn test_reroll_replaces_only_target_die() {
    let (page, ids) = active_page(&[(4, 2), (8, 5), (12, 11)]).await;
    engine(&page).push_reroll(ids[1], 8, 3);

    page.reroll(1).await.unwrap();

    assert_eq!(values(&page), vec![2, 3, 11]);
    assert_eq!(page.session().last_results().total(), 16);
    assert_eq!(page.presenter().last_frame().total, Some(16));

    let rerolls = engine(&page).reroll_calls();
    assert_eq!(rerolls.len(), 1);
    let (dice, options) = &rerolls[0];
    assert_eq!(dice, &vec![ScriptedEngine::die(8, 5, ids[1])]);
    assert!(options.remove);
    assert!(options.new_start_point);
}

#[tokio::test]
async fn test_back_resets_and_clears_scene() {
    let (page, _) = active_page(&[(4, 2), (8, 5), (12, 11)]).await;

    page.back().unwrap();

    assert_eq!(page.screen(), Screen::CollectionSelect);
    assert_eq!(page.session().current_collection(), None);
    assert!(page.session().last_results().is_empty());
    assert!(matches!(
        engine(&page).calls().last(),
        Some(common::Call::Clear)
    ));
    let presenter = page.presenter();
    let frame = presenter.last_frame();
    assert_eq!(frame.screen, Screen::CollectionSelect);
    assert!(frame.results_line.is_none());
}

#[tokio::test]
async fn test_engine_initialized_once() {
    let (page, _) = active_page(&[(4, 2), (8, 5), (12, 11)]).await;
    page.back().unwrap();

    engine(&page).push_roll(&[(6, 1), (10, 1), (20, 1)]);
    page.choose(CollectionKey::B).await.unwrap();
    engine(&page).push_roll(&[(6, 2), (10, 2), (20, 2)]);
    page.roll_all().await.unwrap();

    assert_eq!(engine(&page).init_count(), 1);
    assert_eq!(engine(&page).roll_calls().len(), 3);
    assert_eq!(page.session().last_results().total(), 6);
}

#[tokio::test]
async fn test_init_failure_returns_to_select() {
    let page = page();
    engine(&page).fail_init("webgl unavailable");

    let err = page.choose(CollectionKey::A).await.unwrap_err();
    assert!(matches!(err, DiceBoxError::EngineInit(_)));
    assert_eq!(page.screen(), Screen::CollectionSelect);
    assert_eq!(page.session().current_collection(), None);
    assert!(!page.adapter().is_initialized());
    assert!(engine(&page).roll_calls().is_empty());
    assert_eq!(page.presenter().errors().len(), 1);

    // The next attempt starts the engine again.
    engine(&page).push_roll(&[(4, 4), (8, 8), (12, 12)]);
    page.choose(CollectionKey::A).await.unwrap();
    assert_eq!(engine(&page).init_count(), 2);
    assert_eq!(page.session().last_results().total(), 24);
}

#[tokio::test]
async fn test_roll_failure_keeps_previous_results() {
    let (page, _) = active_page(&[(4, 2), (8, 5), (12, 11)]).await;
    engine(&page).push_roll_reply(Err(EngineError::Rejected("physics worker lost".into())));

    let err = page.roll_all().await.unwrap_err();
    assert!(matches!(err, DiceBoxError::Roll(_)));

    assert_eq!(values(&page), vec![2, 5, 11]);
    assert!(!page.session().is_rolling_all());
    let presenter = page.presenter();
    assert!(presenter.last_frame().is_enabled(Control::RollAll));
    assert_eq!(presenter.errors().len(), 1);
    drop(presenter);

    assert!(matches!(
        page.history().events().last(),
        Some(RollEvent::Failed { action, .. }) if action == "roll"
    ));
}

#[tokio::test]
async fn test_first_roll_failure_leaves_page_active_and_empty() {
    let page = page();
    engine(&page).push_roll_reply(Err(EngineError::Rejected("no table".into())));

    assert!(page.choose(CollectionKey::A).await.is_err());
    assert_eq!(page.screen(), Screen::CollectionActive(CollectionKey::A));
    assert!(page.session().last_results().is_empty());

    let presenter = page.presenter();
    let frame = presenter.last_frame();
    assert!(frame.results_line.is_none());
    assert!(frame.reroll_controls.is_empty());
    assert!(frame.is_enabled(Control::RollAll));
}

#[tokio::test]
async fn test_roll_count_mismatch_is_an_error() {
    let page = page();
    engine(&page).push_roll(&[(4, 2), (8, 5)]);

    let err = page.choose(CollectionKey::A).await.unwrap_err();
    assert!(matches!(
        err,
        DiceBoxError::Roll(EngineError::CountMismatch {
            expected: 3,
            actual: 2
        })
    ));
    assert!(page.session().last_results().is_empty());
}

#[tokio::test]
async fn test_reroll_failure_keeps_die() {
    let (page, _) = active_page(&[(4, 2), (8, 5), (12, 11)]).await;
    engine(&page).push_reroll_reply(Err(EngineError::Rejected("lost die".into())));

    let err = page.reroll(1).await.unwrap_err();
    assert!(matches!(err, DiceBoxError::Reroll { index: 1, .. }));
    assert_eq!(values(&page), vec![2, 5, 11]);
    assert!(!page.session().is_rerolling(1));
    assert!(page.presenter().last_frame().is_enabled(Control::Reroll(1)));
}

#[tokio::test]
async fn test_empty_reroll_reply_is_an_error() {
    let (page, _) = active_page(&[(4, 2), (8, 5), (12, 11)]).await;
    engine(&page).push_reroll_reply(Ok(Vec::new()));

    let err = page.reroll(0).await.unwrap_err();
    assert!(matches!(
        err,
        DiceBoxError::Reroll {
            index: 0,
            source: EngineError::EmptyReroll
        }
    ));
    assert_eq!(values(&page), vec![2, 5, 11]);
}

#[tokio::test]
async fn test_reroll_out_of_range_is_rejected() {
    let (page, _) = active_page(&[(4, 2), (8, 5), (12, 11)]).await;

    let err = page.reroll(3).await.unwrap_err();
    assert!(matches!(
        err,
        DiceBoxError::InvalidState(InvalidState::IndexOutOfRange { index: 3, len: 3 })
    ));
    assert!(engine(&page).reroll_calls().is_empty());
    assert_eq!(page.presenter().errors().len(), 1);
}

#[tokio::test]
async fn test_actions_outside_active_screen_are_rejected() {
    let page = page();

    assert!(matches!(
        page.roll_all().await,
        Err(DiceBoxError::InvalidState(InvalidState::Screen(_)))
    ));
    assert!(matches!(
        page.reroll(0).await,
        Err(DiceBoxError::InvalidState(InvalidState::Screen(_)))
    ));
    assert!(page.back().is_err());
    assert!(engine(&page).calls().is_empty());

    engine(&page).push_roll(&[(4, 1), (8, 1), (12, 1)]);
    page.choose(CollectionKey::A).await.unwrap();
    assert!(matches!(
        page.choose(CollectionKey::B).await,
        Err(DiceBoxError::InvalidState(InvalidState::Screen(_)))
    ));
    assert_eq!(page.session().current_collection(), Some(CollectionKey::A));
}

#[tokio::test]
async fn test_concurrent_rerolls_resolve_independently() {
    let (page, ids) = active_page(&[(4, 2), (8, 5), (12, 11)]).await;
    let gate_first = engine(&page).gate_reroll(ids[0]);
    let gate_last = engine(&page).gate_reroll(ids[2]);

    let driver = async {
        wait_until(|| page.session().rerolls_in_progress().count() == 2).await;

        let frame = page.presenter().last_frame().clone();
        assert!(!frame.is_enabled(Control::Reroll(0)));
        assert!(frame.is_enabled(Control::Reroll(1)));
        assert!(!frame.is_enabled(Control::Reroll(2)));
        assert!(!frame.is_enabled(Control::RollAll));
        assert!(!frame.is_enabled(Control::Back));

        assert!(matches!(
            page.roll_all().await,
            Err(DiceBoxError::InvalidState(InvalidState::RerollsInProgress { count: 2 }))
        ));
        assert!(page.back().is_err());

        gate_last
            .send(Ok(vec![ScriptedEngine::die(12, 1, 100)]))
            .unwrap();
        wait_until(|| !page.session().is_rerolling(2)).await;
        assert_eq!(values(&page), vec![2, 5, 1]);
        assert!(page.session().is_main_controls_disabled());

        gate_first
            .send(Ok(vec![ScriptedEngine::die(4, 4, 101)]))
            .unwrap();
    };

    let (first, last, ()) = tokio::join!(page.reroll(0), page.reroll(2), driver);
    first.unwrap();
    last.unwrap();

    assert_eq!(values(&page), vec![4, 5, 1]);
    assert_eq!(page.session().last_results().total(), 10);
    assert!(!page.session().is_main_controls_disabled());
    assert!(page.presenter().last_frame().is_enabled(Control::RollAll));
    assert_eq!(engine(&page).roll_calls().len(), 1);
}

#[tokio::test]
async fn test_same_die_cannot_reroll_twice_at_once() {
    let (page, ids) = active_page(&[(4, 2), (8, 5), (12, 11)]).await;
    let gate = engine(&page).gate_reroll(ids[1]);

    let driver = async {
        wait_until(|| page.session().is_rerolling(1)).await;
        let second = page.reroll(1).await;
        assert!(matches!(
            second,
            Err(DiceBoxError::InvalidState(InvalidState::RerollInProgress { index: 1 }))
        ));
        gate.send(Ok(vec![ScriptedEngine::die(8, 7, 100)])).unwrap();
    };

    let (first, ()) = tokio::join!(page.reroll(1), driver);
    first.unwrap();
    assert_eq!(values(&page), vec![2, 7, 11]);
    assert_eq!(engine(&page).reroll_calls().len(), 1);
}

#[tokio::test]
async fn test_roll_all_blocks_rerolls_and_second_roll() {
    let (page, _) = active_page(&[(4, 2), (8, 5), (12, 11)]).await;
    let gate = engine(&page).gate_roll();

    let driver = async {
        wait_until(|| page.session().is_rolling_all()).await;
        {
            let presenter = page.presenter();
            let frame = presenter.last_frame();
            assert!(frame.rolling);
            assert!(frame.reroll_controls.iter().all(|c| !c.enabled));
            assert!(!frame.is_enabled(Control::RerollAll));
        }

        assert!(matches!(
            page.reroll(0).await,
            Err(DiceBoxError::InvalidState(InvalidState::RollAllInProgress))
        ));
        assert!(matches!(
            page.reroll_all().await,
            Err(DiceBoxError::InvalidState(InvalidState::RollAllInProgress))
        ));
        assert!(page.back().is_err());

        gate.send(Ok(vec![
            ScriptedEngine::die(4, 3, 100),
            ScriptedEngine::die(8, 3, 101),
            ScriptedEngine::die(12, 3, 102),
        ]))
        .unwrap();
    };

    let (rolled, ()) = tokio::join!(page.roll_all(), driver);
    rolled.unwrap();
    assert_eq!(values(&page), vec![3, 3, 3]);
    assert_eq!(engine(&page).roll_calls().len(), 2);
    assert!(engine(&page).reroll_calls().is_empty());
}

#[tokio::test]
async fn test_dispatch_routes_actions() {
    let page = page();
    let ids = engine(&page).push_roll(&[(4, 2), (8, 5), (12, 11)]);
    page.dispatch(Action::Choose(CollectionKey::A)).await.unwrap();

    engine(&page).push_reroll(ids[2], 12, 12);
    page.dispatch(Action::Reroll(2)).await.unwrap();
    assert_eq!(page.session().last_results().total(), 19);

    engine(&page).push_roll(&[(4, 1), (8, 1), (12, 1)]);
    page.dispatch(Action::RerollAll).await.unwrap();
    assert_eq!(page.session().last_results().total(), 3);

    page.dispatch(Action::Back).await.unwrap();
    assert_eq!(page.screen(), Screen::CollectionSelect);
}

#[tokio::test]
async fn test_history_survives_back() {
    let (page, ids) = active_page(&[(4, 2), (8, 5), (12, 11)]).await;
    engine(&page).push_reroll(ids[1], 8, 3);
    page.reroll(1).await.unwrap();
    page.back().unwrap();

    let history = page.history();
    assert_eq!(history.len(), 2);
    assert!(matches!(
        &history.events()[0],
        RollEvent::Roll { total: 18, .. }
    ));
    assert_eq!(
        history.events()[1],
        RollEvent::Reroll {
            collection: CollectionKey::A,
            index: 1,
            sides: 8,
            old: 5,
            new: 3,
            total: 16,
        }
    );

    let json: serde_json::Value = serde_json::from_str(&history.to_json().unwrap()).unwrap();
    assert_eq!(json[1]["kind"], "reroll");
    assert_eq!(json[1]["collection"], "A");
}

/// Run `body` on a local task set, the way the terminal page spawns actions.
async fn on_local_set<F: std::future::Future>(body: F) -> F::Output {
    tokio::task::LocalSet::new().run_until(body).await
}

#[tokio::test]
async fn test_panicking_render_releases_reroll() {
    let (page, ids) = active_page(&[(4, 2), (8, 5), (12, 11)]).await;
    let page = Rc::new(page);
    page.presenter().fail_next_render.set(true);

    let joined = on_local_set({
        let page = Rc::clone(&page);
        async move { tokio::task::spawn_local(async move { page.reroll(0).await }).await }
    })
    .await;

    assert!(joined.unwrap_err().is_panic());
    assert!(!page.session().is_rerolling(0));
    assert!(!page.session().is_main_controls_disabled());
    assert_eq!(values(&page), vec![2, 5, 11]);

    engine(&page).push_reroll(ids[0], 4, 4);
    page.reroll(0).await.unwrap();
    assert_eq!(values(&page), vec![4, 5, 11]);
    page.back().unwrap();
}

#[tokio::test]
async fn test_panicking_render_releases_roll_all() {
    let (page, _) = active_page(&[(4, 2), (8, 5), (12, 11)]).await;
    let page = Rc::new(page);
    page.presenter().fail_next_render.set(true);

    let joined = on_local_set({
        let page = Rc::clone(&page);
        async move { tokio::task::spawn_local(async move { page.roll_all().await }).await }
    })
    .await;

    assert!(joined.unwrap_err().is_panic());
    assert!(!page.session().is_rolling_all());
    assert_eq!(values(&page), vec![2, 5, 11]);
    assert!(page.back().is_ok());
}

#[tokio::test]
async fn test_cancelled_reroll_releases_die() {
    let (page, ids) = active_page(&[(4, 2), (8, 5), (12, 11)]).await;
    let page = Rc::new(page);
    let _gate = engine(&page).gate_reroll(ids[1]);

    on_local_set({
        let page = Rc::clone(&page);
        async move {
            let task = {
                let page = Rc::clone(&page);
                tokio::task::spawn_local(async move { page.reroll(1).await })
            };
            wait_until(|| page.session().is_rerolling(1)).await;
            task.abort();
            assert!(task.await.unwrap_err().is_cancelled());
        }
    })
    .await;

    assert!(!page.session().is_rerolling(1));
    assert!(page.back().is_ok());
}
