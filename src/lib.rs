#![deny(clippy::unwrap_used)]
//! Push Battle decision engine for native and WebAssembly referees.
//!
//! The crate exposes three building blocks:
//!
//! * [`Board`] / [`PushBattleBoard`] – the reference rules engine: an 8×8 torus, eight pieces
//!   per side, placements that push neighbours outward, and three-in-a-row wins. The flat
//!   `i8` layout (64 cells plus four metadata entries) is what crosses the JS boundary.
//! * [`BanditSearch`] / [`PushBattleAgent`] – an anytime flat bandit over the legal moves of one
//!   position. Each candidate is an arm scored by UCB1; every iteration plays one heuristic
//!   rollout and folds its outcome back into the arm. Two presets exist: a thorough one that
//!   searches every move with deep epsilon-greedy rollouts, and a fast one that shortlists the
//!   top moves by a cheap score and plays short random rollouts.
//! * [`heuristic`] – the static evaluator used to steer and score rollouts.
//!
//! The search is generic over [`GameRules`], so an external rules implementation can be
//! plugged in without touching the engine.

mod bandit;
mod board;
mod clock;
pub mod heuristic;
mod logging;
mod mcts;
mod moves;
mod rollout;
mod rules;

pub use bandit::{ArmStats, ArmSummary, CandidateStatistics, FinalSelection};
pub use board::{Board, BoardError, PushBattleBoard, BOARD_SIZE, NUM_PIECES, STATE_SIZE};
pub use clock::{Clock, Deadline, ManualClock, SystemClock};
pub use mcts::{
    select_move, shortlist, BanditSearch, PushBattleAgent, SearchConfig, SearchMode, SearchSummary,
    SEARCH_RESULT_VERSION,
};
pub use moves::{enumerate_moves, MoveList, RelocationReach};
pub use rollout::{
    apply_move, simulate, EpsilonGreedy, LeafEvaluation, PlayoutPolicy, SearchError,
    UniformRandom,
};
pub use rules::{GameRules, Move, Player, RulesError, Square};

use wasm_bindgen::prelude::*;

/// Install a panic hook sending Rust panics to the browser console. The hook is only compiled in
/// when the `console_error_panic_hook` feature is enabled (default).
#[wasm_bindgen]
pub fn init_panic_hook() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Route engine logs to the console: search summaries when `verbose`, warnings otherwise.
/// Calling it again only changes the level.
#[wasm_bindgen(js_name = initLogging)]
pub fn init_logging(verbose: bool) {
    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };
    let _ = logging::init(level);
}

/// Board side length of the default game (8).
#[wasm_bindgen(js_name = boardSize)]
pub fn board_size() -> usize {
    BOARD_SIZE
}

/// Pieces each player places before relocations start (8).
#[wasm_bindgen(js_name = pieceQuota)]
pub fn piece_quota() -> usize {
    NUM_PIECES
}

/// Flattened state length accepted by `PushBattleAgent.selectMove` (68 entries).
#[wasm_bindgen(js_name = stateSize)]
pub fn state_size() -> usize {
    STATE_SIZE
}
