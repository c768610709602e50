//! Flat multi-armed bandit over the root candidates of one search call.

use hashbrown::HashMap;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::rules::Move;

/// How the winning arm is read off the statistics once the deadline passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FinalSelection {
    /// Highest `score / visits`.
    MeanScore,
    /// Highest visit count.
    VisitCount,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ArmStats {
    pub total: f32,
    pub visits: u32,
}

impl ArmStats {
    pub fn mean(&self) -> Option<f32> {
        (self.visits > 0).then(|| self.total / self.visits as f32)
    }
}

/// Per-arm view exported in search summaries.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ArmSummary {
    #[serde(rename = "move")]
    pub mv: Move,
    pub total: f32,
    pub visits: u32,
    pub mean: Option<f32>,
}

/// Candidate statistics, keyed by move, over a candidate set frozen at construction.
///
/// Statistics are only ever added for moves of that set, and visit counts only grow.
pub struct CandidateStatistics {
    candidates: Vec<Move>,
    stats: HashMap<Move, ArmStats>,
    /// Next index of the first in-order pass over the candidates.
    cursor: usize,
    /// Arms whose candidate failed re-validation; they are never selected again.
    retired: Vec<bool>,
    /// Arms whose move wins on the spot for the searching player.
    decisive: Vec<bool>,
}

impl CandidateStatistics {
    pub fn new(candidates: Vec<Move>) -> Self {
        let len = candidates.len();
        Self {
            candidates,
            stats: HashMap::with_capacity(len),
            cursor: 0,
            retired: vec![false; len],
            decisive: vec![false; len],
        }
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn candidate(&self, arm: usize) -> Move {
        self.candidates[arm]
    }

    pub fn candidates(&self) -> &[Move] {
        &self.candidates
    }

    pub fn stats(&self, arm: usize) -> ArmStats {
        self.stats.get(&self.candidates[arm]).copied().unwrap_or_default()
    }

    pub fn total_visits(&self) -> u32 {
        self.stats.values().map(|arm| arm.visits).sum()
    }

    /// Picks the arm for the next iteration.
    ///
    /// Unvisited arms are tried first, in enumeration order. After that pass, any arm still
    /// unvisited is drawn uniformly at random; otherwise UCB1
    /// `mean + c * sqrt(ln(1 + total_visits) / visits)` decides, first arm on ties.
    /// Returns `None` only when every arm has been retired.
    pub fn select<R: Rng>(&mut self, exploration: f32, rng: &mut R) -> Option<usize> {
        while self.cursor < self.candidates.len() {
            let arm = self.cursor;
            self.cursor += 1;
            if !self.retired[arm] && self.stats(arm).visits == 0 {
                return Some(arm);
            }
        }

        let untried: SmallVec<[usize; 16]> = self
            .live_arms()
            .filter(|&arm| self.stats(arm).visits == 0)
            .collect();
        if let Some(&arm) = untried.choose(rng) {
            return Some(arm);
        }

        let log_total = (1.0 + self.total_visits() as f32).ln();
        let mut best: Option<(usize, f32)> = None;
        for arm in self.live_arms() {
            let stats = self.stats(arm);
            let Some(mean) = stats.mean() else {
                continue;
            };
            let ucb = mean + exploration * (log_total / stats.visits as f32).sqrt();
            if best.map_or(true, |(_, value)| ucb > value) {
                best = Some((arm, ucb));
            }
        }
        if let Some((arm, _)) = best {
            return Some(arm);
        }

        self.random_live_arm(rng)
    }

    /// Uniformly random arm among those not retired, `None` when every arm is retired.
    pub fn random_live_arm<R: Rng>(&self, rng: &mut R) -> Option<usize> {
        let live: SmallVec<[usize; 16]> = self.live_arms().collect();
        live.choose(rng).copied()
    }

    pub fn record(&mut self, arm: usize, outcome: f32) {
        let entry = self.stats.entry(self.candidates[arm]).or_default();
        entry.total += outcome;
        entry.visits += 1;
    }

    pub fn retire(&mut self, arm: usize) {
        self.retired[arm] = true;
    }

    pub fn mark_decisive(&mut self, arm: usize) {
        self.decisive[arm] = true;
    }

    /// The first decisive arm if one exists, otherwise the visited arm that `policy` ranks
    /// highest (first in enumeration order on ties). `None` when nothing was visited.
    pub fn best(&self, policy: FinalSelection) -> Option<usize> {
        if let Some(arm) = self.decisive.iter().position(|&flag| flag) {
            return Some(arm);
        }

        let mut best: Option<(usize, f32)> = None;
        for arm in 0..self.candidates.len() {
            let stats = self.stats(arm);
            let Some(mean) = stats.mean() else {
                continue;
            };
            let key = match policy {
                FinalSelection::MeanScore => mean,
                FinalSelection::VisitCount => stats.visits as f32,
            };
            if best.map_or(true, |(_, value)| key > value) {
                best = Some((arm, key));
            }
        }
        best.map(|(arm, _)| arm)
    }

    pub fn summaries(&self) -> Vec<ArmSummary> {
        (0..self.candidates.len())
            .map(|arm| {
                let stats = self.stats(arm);
                ArmSummary {
                    mv: self.candidates[arm],
                    total: stats.total,
                    visits: stats.visits,
                    mean: stats.mean(),
                }
            })
            .collect()
    }

    fn live_arms(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.candidates.len()).filter(move |&arm| !self.retired[arm])
    }
}
