use std::time::Duration;

use log::{debug, trace, warn};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;

use crate::bandit::{ArmSummary, CandidateStatistics, FinalSelection};
use crate::board::Board;
use crate::clock::{Clock, Deadline, SystemClock};
use crate::heuristic::quick_score;
use crate::moves::{enumerate_moves, RelocationReach};
use crate::rollout::{
    apply_move, simulate, EpsilonGreedy, LeafEvaluation, SearchError, UniformRandom,
};
use crate::rules::{GameRules, Move, Player};

/// Schema version of the object returned by `PushBattleAgent.search`.
pub const SEARCH_RESULT_VERSION: u8 = 1;

/// The two engine flavours sharing one search loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SearchMode {
    /// Every legal move is a candidate; deep epsilon-greedy rollouts; best mean wins.
    #[default]
    Thorough,
    /// Top candidates by quick score only; short random rollouts; most visits wins.
    Fast,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default)]
    pub mode: SearchMode,
    /// Wall-clock budget per move, measured from the start of the search call.
    #[serde(default = "default_time_budget_ms", alias = "timeBudget")]
    pub time_budget_ms: u64,
    /// Exploration constant in the UCB1 term.
    #[serde(default = "default_exploration_constant", alias = "explorationConstant")]
    pub exploration_constant: f32,
    /// Rollout plies after the candidate move; 50 thorough, 20 fast when unset.
    #[serde(default, alias = "rolloutPlyCap")]
    pub rollout_ply_cap: Option<usize>,
    /// Candidates kept after quick scoring; fast mode only, 10 when unset.
    #[serde(default, alias = "candidatePoolSize")]
    pub candidate_pool_size: Option<usize>,
    /// Probability that an epsilon-greedy rollout ply plays its best-scored move.
    #[serde(default = "default_greedy_probability", alias = "greedyProbability")]
    pub greedy_probability: f32,
    /// Moves a fast rollout ply draws from, in enumeration order; 10 when unset.
    #[serde(default, alias = "rolloutScanLimit")]
    pub rollout_scan_limit: Option<usize>,
    /// Relocation targets; anywhere for thorough, orthogonal neighbours for fast when unset.
    #[serde(default, alias = "relocationReach")]
    pub relocation_reach: Option<RelocationReach>,
    /// Fixed seed for reproducible searches; entropy-seeded when unset.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_time_budget_ms() -> u64 {
    950
}
fn default_exploration_constant() -> f32 {
    std::f32::consts::SQRT_2
}
fn default_greedy_probability() -> f32 {
    0.8
}

const THOROUGH_PLY_CAP: usize = 50;
const FAST_PLY_CAP: usize = 20;
const FAST_POOL_SIZE: usize = 10;
const FAST_SCAN_LIMIT: usize = 10;

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            mode: SearchMode::Thorough,
            time_budget_ms: default_time_budget_ms(),
            exploration_constant: default_exploration_constant(),
            rollout_ply_cap: None,
            candidate_pool_size: None,
            greedy_probability: default_greedy_probability(),
            rollout_scan_limit: None,
            relocation_reach: None,
            seed: None,
        }
    }
}

impl SearchConfig {
    pub fn thorough() -> Self {
        Self::default()
    }

    pub fn fast() -> Self {
        Self {
            mode: SearchMode::Fast,
            ..Self::default()
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn time_budget(&self) -> Duration {
        Duration::from_millis(self.time_budget_ms)
    }

    pub fn rollout_ply_cap(&self) -> usize {
        self.rollout_ply_cap.unwrap_or(match self.mode {
            SearchMode::Thorough => THOROUGH_PLY_CAP,
            SearchMode::Fast => FAST_PLY_CAP,
        })
    }

    /// Size of the quick-scored shortlist, `None` when every candidate is searched. Never
    /// zero, so a position with legal moves always keeps at least one candidate.
    pub fn candidate_pool_size(&self) -> Option<usize> {
        match self.mode {
            SearchMode::Thorough => None,
            SearchMode::Fast => Some(self.candidate_pool_size.unwrap_or(FAST_POOL_SIZE).max(1)),
        }
    }

    pub fn rollout_scan_limit(&self) -> usize {
        self.rollout_scan_limit.unwrap_or(FAST_SCAN_LIMIT)
    }

    pub fn relocation_reach(&self) -> RelocationReach {
        self.relocation_reach.unwrap_or(match self.mode {
            SearchMode::Thorough => RelocationReach::Anywhere,
            SearchMode::Fast => RelocationReach::Adjacent,
        })
    }

    pub fn final_selection(&self) -> FinalSelection {
        match self.mode {
            SearchMode::Thorough => FinalSelection::MeanScore,
            SearchMode::Fast => FinalSelection::VisitCount,
        }
    }

    pub fn leaf_evaluation(&self) -> LeafEvaluation {
        match self.mode {
            SearchMode::Thorough => LeafEvaluation::Full,
            SearchMode::Fast => LeafEvaluation::Quick,
        }
    }
}

/// What one search call did, beyond the chosen move.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchSummary {
    /// `None` only when the side to move has no legal move.
    #[serde(rename = "move")]
    pub best: Option<Move>,
    /// Completed iterations, faulted ones included.
    pub iterations: u32,
    /// Iterations dropped because the candidate failed re-validation.
    pub discarded: u32,
    /// Rollouts aborted by a rules-engine error and scored as a neutral outcome.
    pub faults: u32,
    pub arms: Vec<ArmSummary>,
}

impl SearchSummary {
    fn no_move() -> Self {
        Self {
            best: None,
            iterations: 0,
            discarded: 0,
            faults: 0,
            arms: Vec::new(),
        }
    }
}

/// Anytime UCB1 bandit over root candidates with heuristic rollouts.
///
/// Each iteration clones the root, applies one candidate, plays one rollout and folds its
/// outcome into that candidate's statistics. Statistics live for a single call only.
pub struct BanditSearch {
    config: SearchConfig,
    rng: SmallRng,
}

impl BanditSearch {
    pub fn new(config: SearchConfig) -> Self {
        let rng = config
            .seed
            .map_or_else(SmallRng::from_entropy, SmallRng::seed_from_u64);
        Self { config, rng }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn set_seed(&mut self, seed: u64) {
        self.rng = SmallRng::seed_from_u64(seed);
    }

    /// Best move for `player` within the configured time budget, or `None` when the side to
    /// move has no legal move. Internal simulation problems are never reported.
    pub fn select_move<S: GameRules>(&mut self, state: &S, player: Player) -> Option<Move> {
        self.search(state, player, &SystemClock::new()).best
    }

    /// Same as [`BanditSearch::select_move`] but against an explicit clock, returning the
    /// full summary. The deadline is polled between iterations only, so a rollout that is
    /// already running always completes.
    pub fn search<S: GameRules, C: Clock>(
        &mut self,
        state: &S,
        player: Player,
        clock: &C,
    ) -> SearchSummary {
        let deadline = Deadline::after(clock, self.config.time_budget());

        let reach = self.config.relocation_reach();
        let mut candidates: Vec<Move> = enumerate_moves(state, reach).into_vec();
        if candidates.is_empty() {
            debug!("no legal move for {player:?}");
            return SearchSummary::no_move();
        }
        if let Some(pool) = self.config.candidate_pool_size() {
            candidates = shortlist(state, player, candidates, pool);
        }
        debug!(
            "{:?} search for {player:?}: {} candidates, budget {} ms",
            self.config.mode,
            candidates.len(),
            self.config.time_budget_ms
        );

        let mut stats = CandidateStatistics::new(candidates);
        let mut summary = SearchSummary::no_move();

        while !deadline.expired() {
            let Some(arm) = stats.select(self.config.exploration_constant, &mut self.rng) else {
                break;
            };
            let candidate = stats.candidate(arm);
            let outcome = match self.run_iteration(state, player, candidate) {
                Ok((outcome, decisive)) => {
                    if decisive {
                        stats.mark_decisive(arm);
                    }
                    outcome
                }
                Err(SearchError::StaleLegality(mv)) => {
                    trace!("discarding stale candidate {mv}");
                    stats.retire(arm);
                    summary.discarded += 1;
                    continue;
                }
                Err(fault @ SearchError::SimulationFault(_)) => {
                    warn!("rollout for {candidate} aborted: {fault}");
                    summary.faults += 1;
                    0.0
                }
            };
            stats.record(arm, outcome);
            summary.iterations += 1;
        }

        let chosen = stats
            .best(self.config.final_selection())
            .or_else(|| stats.random_live_arm(&mut self.rng));
        summary.best = chosen.map(|arm| stats.candidate(arm));
        summary.arms = stats.summaries();

        debug!(
            "picked {:?} after {} iterations ({} discarded, {} faults)",
            summary.best, summary.iterations, summary.discarded, summary.faults
        );
        summary
    }

    /// One iteration on a fresh copy of `state`: outcome in the searcher's favour, plus
    /// whether the candidate wins on the spot.
    fn run_iteration<S: GameRules>(
        &mut self,
        state: &S,
        player: Player,
        candidate: Move,
    ) -> Result<(f32, bool), SearchError> {
        let mut child = apply_move(state, candidate)?;
        child.end_turn();
        let decisive = child.winner() == Some(player);

        let ply_cap = self.config.rollout_ply_cap();
        let leaf = self.config.leaf_evaluation();
        let reach = self.config.relocation_reach();
        let outcome = match self.config.mode {
            SearchMode::Thorough => {
                let policy = EpsilonGreedy {
                    greedy_probability: self.config.greedy_probability,
                    reach,
                };
                simulate(child, player, &policy, ply_cap, leaf, &mut self.rng)?
            }
            SearchMode::Fast => {
                let policy = UniformRandom {
                    scan_limit: self.config.rollout_scan_limit(),
                    reach,
                };
                simulate(child, player, &policy, ply_cap, leaf, &mut self.rng)?
            }
        };
        Ok((outcome, decisive))
    }
}

/// Keeps the `pool` candidates with the highest quick score for `player` after the move,
/// enumeration order breaking ties. Candidates that cannot be applied are dropped.
pub fn shortlist<S: GameRules>(
    state: &S,
    player: Player,
    candidates: Vec<Move>,
    pool: usize,
) -> Vec<Move> {
    let mut scored: Vec<(Move, f32)> = candidates
        .into_iter()
        .filter_map(|mv| {
            apply_move(state, mv)
                .ok()
                .map(|next| (mv, quick_score(&next, player)))
        })
        .collect();
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored.truncate(pool);
    scored.into_iter().map(|(mv, _)| mv).collect()
}

/// One-shot helper: fresh statistics, a fresh generator from `config`, the real clock.
pub fn select_move<S: GameRules>(state: &S, player: Player, config: &SearchConfig) -> Option<Move> {
    BanditSearch::new(config.clone()).select_move(state, player)
}

#[derive(Serialize)]
struct SearchResult<'a> {
    version: u8,
    #[serde(flatten)]
    summary: &'a SearchSummary,
}

/// wasm-bindgen entry point for a match-driving referee.
#[wasm_bindgen]
pub struct PushBattleAgent {
    search: BanditSearch,
}

#[wasm_bindgen]
impl PushBattleAgent {
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> Result<PushBattleAgent, JsValue> {
        let cfg: SearchConfig = if config.is_undefined() || config.is_null() {
            SearchConfig::default()
        } else {
            serde_wasm_bindgen::from_value(config)?
        };
        Ok(Self {
            search: BanditSearch::new(cfg),
        })
    }

    #[wasm_bindgen(js_name = defaultConfig)]
    pub fn default_config() -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&SearchConfig::default()).map_err(JsValue::from)
    }

    #[wasm_bindgen(js_name = fastConfig)]
    pub fn fast_config() -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&SearchConfig::fast()).map_err(JsValue::from)
    }

    #[wasm_bindgen(js_name = setSeed)]
    pub fn set_seed(&mut self, seed: u64) {
        self.search.set_seed(seed);
    }

    /// Pick a move for `player` (`1` or `-1`) from a state vector produced by
    /// `PushBattleBoard.getState`. Resolves to `null` when there is no legal move.
    #[wasm_bindgen(js_name = selectMove)]
    pub fn select_move(&mut self, board_state: Vec<i8>, player: i8) -> Result<JsValue, JsValue> {
        let (board, player) = decode_request(&board_state, player)?;
        let best = self.search.select_move(&board, player);
        serde_wasm_bindgen::to_value(&best).map_err(JsValue::from)
    }

    /// Like `selectMove` but returns per-candidate statistics as well.
    pub fn search(&mut self, board_state: Vec<i8>, player: i8) -> Result<JsValue, JsValue> {
        let (board, player) = decode_request(&board_state, player)?;
        let summary = self.search.search(&board, player, &SystemClock::new());
        let result = SearchResult {
            version: SEARCH_RESULT_VERSION,
            summary: &summary,
        };
        serde_wasm_bindgen::to_value(&result).map_err(JsValue::from)
    }
}

fn decode_request(board_state: &[i8], player: i8) -> Result<(Board, Player), JsValue> {
    let board = Board::from_bytes(board_state).map_err(|err| JsValue::from_str(&err.to_string()))?;
    let player =
        Player::from_sign(player).ok_or_else(|| JsValue::from_str("player must be 1 or -1"))?;
    Ok((board, player))
}
