#![cfg(target_arch = "wasm32")]

use js_sys::{Object, Reflect};
use push_battle_agent::{
    Board, GameRules, Move, Player, PushBattleAgent, PushBattleBoard, SearchConfig, SearchMode,
    Square,
};
use wasm_bindgen::JsValue;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

fn js_config(entries: &[(&str, JsValue)]) -> JsValue {
    let object = Object::new();
    for (key, value) in entries {
        Reflect::set(&object, &JsValue::from_str(key), value).expect("plain object");
    }
    object.into()
}

#[wasm_bindgen_test]
fn camel_case_config_is_accepted() {
    let config = js_config(&[
        ("mode", JsValue::from_str("fast")),
        ("timeBudget", JsValue::from_f64(25.0)),
        ("rolloutPlyCap", JsValue::from_f64(4.0)),
    ]);
    let parsed: SearchConfig = serde_wasm_bindgen::from_value(config).expect("valid config");
    assert_eq!(parsed.mode, SearchMode::Fast);
    assert_eq!(parsed.time_budget_ms, 25);
    assert_eq!(parsed.rollout_ply_cap(), 4);
    assert_eq!(parsed.candidate_pool_size(), Some(10));
}

#[wasm_bindgen_test]
fn agent_plays_the_winning_placement() {
    let board = Board::from_rows(
        &[
            "XX......", "........", "........", "........", "........", "........", "........",
            "........",
        ],
        Player::One,
        8,
    )
    .expect("valid diagram");
    let config = js_config(&[
        ("timeBudget", JsValue::from_f64(200.0)),
        ("rolloutPlyCap", JsValue::from_f64(2.0)),
    ]);
    let mut agent = PushBattleAgent::new(config).expect("valid config");
    agent.set_seed(5);

    let picked = agent.select_move(board.to_vec(), 1).expect("search runs");
    let mv: Move = serde_wasm_bindgen::from_value(picked).expect("a move");
    let winning = [
        Move::Placement { to: Square::new(0, 2) },
        Move::Placement { to: Square::new(0, 7) },
    ];
    assert!(winning.contains(&mv), "picked {mv}");
}

#[wasm_bindgen_test]
fn locked_board_yields_null() {
    let board =
        Board::from_rows(&["XXOO", "OOXX", "XXOO", "OOXX"], Player::One, 8).expect("valid diagram");
    let mut agent = PushBattleAgent::new(JsValue::UNDEFINED).expect("default config");
    let picked = agent.select_move(board.to_vec(), 1).expect("search runs");
    assert!(picked.is_null());
}

#[wasm_bindgen_test]
fn bad_requests_are_rejected() {
    let mut agent = PushBattleAgent::new(JsValue::NULL).expect("default config");
    assert!(agent.select_move(vec![0; 5], 1).is_err());
    assert!(agent.select_move(Board::new().to_vec(), 3).is_err());
}

#[wasm_bindgen_test]
fn board_wrapper_round_trips_moves() {
    let mut board = PushBattleBoard::new();
    let mv = serde_wasm_bindgen::to_value(&Move::Placement { to: Square::new(3, 3) })
        .expect("serialisable");
    board.apply_move(mv).expect("legal placement");

    assert_eq!(board.side_to_move(), -1);
    assert_eq!(board.board().cell(Square::new(3, 3)), Some(Player::One));

    let mut restored = PushBattleBoard::new();
    restored.set_state(board.get_state()).expect("valid state");
    assert_eq!(restored.board(), board.board());
}
