//! Bounded-depth playouts used to estimate the value of a root candidate.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::heuristic::{evaluate, quick_score, WIN_SCORE};
use crate::moves::{enumerate_moves, RelocationReach};
use crate::rules::{GameRules, Move, Player, RulesError};

/// Internal failure modes of one search iteration. Neither variant reaches the caller of
/// [`crate::select_move`]: stale candidates are discarded, faults score as a neutral outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SearchError {
    #[error("candidate {0} is no longer legal")]
    StaleLegality(Move),
    #[error("rollout aborted: {0}")]
    SimulationFault(#[from] RulesError),
}

/// Applies `mv` to an independent copy of `state`; `state` itself is never touched.
/// The side to move is left unchanged.
pub fn apply_move<S: GameRules>(state: &S, mv: Move) -> Result<S, SearchError> {
    if !state.is_legal(mv) {
        return Err(SearchError::StaleLegality(mv));
    }
    let mut next = state.clone();
    next.apply(mv)?;
    Ok(next)
}

/// How the final position of a rollout that hit its ply cap is scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LeafEvaluation {
    #[default]
    Full,
    Quick,
}

impl LeafEvaluation {
    fn score<S: GameRules>(self, state: &S, player: Player) -> f32 {
        match self {
            Self::Full => evaluate(state, player),
            Self::Quick => quick_score(state, player),
        }
    }
}

/// Move choice for a single rollout ply, always on behalf of the side to move.
pub trait PlayoutPolicy {
    /// `Ok(None)` means the mover has no legal move.
    fn pick<S: GameRules, R: Rng>(
        &self,
        state: &S,
        rng: &mut R,
    ) -> Result<Option<Move>, SearchError>;
}

/// Scores every legal move with the full evaluator from the mover's perspective, then plays
/// the best one (first on ties) with probability `greedy_probability`, a random one otherwise.
#[derive(Debug, Clone, Copy)]
pub struct EpsilonGreedy {
    pub greedy_probability: f32,
    pub reach: RelocationReach,
}

impl PlayoutPolicy for EpsilonGreedy {
    fn pick<S: GameRules, R: Rng>(
        &self,
        state: &S,
        rng: &mut R,
    ) -> Result<Option<Move>, SearchError> {
        let mover = state.side_to_move();
        let mut scored: Vec<(Move, f32)> = Vec::new();
        for mv in enumerate_moves(state, self.reach) {
            match apply_move(state, mv) {
                Ok(next) => scored.push((mv, evaluate(&next, mover))),
                Err(SearchError::StaleLegality(_)) => continue,
                Err(fault) => return Err(fault),
            }
        }
        if scored.is_empty() {
            return Ok(None);
        }

        let roll: f32 = rng.gen();
        if roll < self.greedy_probability {
            let mut best = scored[0];
            for &candidate in &scored[1..] {
                if candidate.1 > best.1 {
                    best = candidate;
                }
            }
            return Ok(Some(best.0));
        }
        Ok(scored.choose(rng).map(|&(mv, _)| mv))
    }
}

/// Plays a uniformly random move among the first `scan_limit` enumerated moves that are
/// still legal against the live state. No evaluation.
#[derive(Debug, Clone, Copy)]
pub struct UniformRandom {
    pub scan_limit: usize,
    pub reach: RelocationReach,
}

impl PlayoutPolicy for UniformRandom {
    fn pick<S: GameRules, R: Rng>(
        &self,
        state: &S,
        rng: &mut R,
    ) -> Result<Option<Move>, SearchError> {
        let legal: Vec<Move> = enumerate_moves(state, self.reach)
            .into_iter()
            .take(self.scan_limit)
            .filter(|&mv| state.is_legal(mv))
            .collect();
        Ok(legal.choose(rng).copied())
    }
}

/// Plays up to `ply_cap` plies from `state`, whose side to move is about to act.
///
/// Returns `1.0` / `-1.0` as soon as the rules engine reports a winner (relative to
/// `searcher`), `0.0` when the mover is stuck, and otherwise the leaf score scaled by
/// [`WIN_SCORE`]. Any rules-engine error aborts the playout.
pub fn simulate<S, P, R>(
    mut state: S,
    searcher: Player,
    policy: &P,
    ply_cap: usize,
    leaf: LeafEvaluation,
    rng: &mut R,
) -> Result<f32, SearchError>
where
    S: GameRules,
    P: PlayoutPolicy,
    R: Rng,
{
    for _ in 0..ply_cap {
        if let Some(winner) = state.winner() {
            return Ok(if winner == searcher { 1.0 } else { -1.0 });
        }
        let Some(mv) = policy.pick(&state, rng)? else {
            return Ok(0.0);
        };
        state.apply(mv)?;
        state.end_turn();
    }
    Ok(leaf.score(&state, searcher) / WIN_SCORE)
}
