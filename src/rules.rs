use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One of the two sides. Encoded as `1` / `-1` in flat board vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Player {
    One,
    Two,
}

impl Player {
    pub const fn opponent(self) -> Self {
        match self {
            Self::One => Self::Two,
            Self::Two => Self::One,
        }
    }

    pub const fn sign(self) -> i8 {
        match self {
            Self::One => 1,
            Self::Two => -1,
        }
    }

    pub const fn from_sign(value: i8) -> Option<Self> {
        match value {
            1 => Some(Self::One),
            -1 => Some(Self::Two),
            _ => None,
        }
    }
}

/// Board coordinate; both components are always `< size` of the board they index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Square {
    pub row: usize,
    pub col: usize,
}

impl Square {
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Neighbour `(dr, dc)` steps away with torus wraparound.
    #[inline]
    pub fn offset(self, dr: isize, dc: isize, size: usize) -> Self {
        let n = size as isize;
        Self {
            row: (self.row as isize + dr).rem_euclid(n) as usize,
            col: (self.col as isize + dc).rem_euclid(n) as usize,
        }
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// A move is tagged by phase: placements while the mover is below quota, relocations after.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Move {
    Placement { to: Square },
    Relocation { from: Square, to: Square },
}

impl Move {
    pub const fn target(self) -> Square {
        match self {
            Self::Placement { to } | Self::Relocation { to, .. } => to,
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Placement { to } => write!(f, "place {to}"),
            Self::Relocation { from, to } => write!(f, "move {from} -> {to}"),
        }
    }
}

/// Why the rules engine refused a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RulesError {
    #[error("square {0} is outside the board")]
    OutOfBounds(Square),
    #[error("square {0} is already occupied")]
    Occupied(Square),
    #[error("square {0} does not hold a piece of the side to move")]
    NotOwnPiece(Square),
    #[error("{0} is not allowed in the current phase")]
    WrongPhase(Move),
}

/// Read/write contract the decision engine needs from a rules engine.
///
/// `Clone` must produce a fully independent copy: the search clones the root once per
/// iteration and mutates only the copy. `place` and `relocate` advance bookkeeping but do
/// not hand the turn over; callers do that explicitly with [`GameRules::end_turn`].
pub trait GameRules: Clone {
    fn size(&self) -> usize;
    fn quota(&self) -> usize;
    fn cell(&self, square: Square) -> Option<Player>;
    fn side_to_move(&self) -> Player;
    fn placed(&self, player: Player) -> usize;

    fn is_legal_placement(&self, square: Square) -> bool;
    /// Whether `player` could relocate its piece at `from` onto `to`, ignoring whose turn it is.
    fn is_legal_relocation_for(&self, player: Player, from: Square, to: Square) -> bool;
    fn winner(&self) -> Option<Player>;

    fn place(&mut self, square: Square) -> Result<(), RulesError>;
    fn relocate(&mut self, from: Square, to: Square) -> Result<(), RulesError>;
    fn end_turn(&mut self);

    fn is_legal_relocation(&self, from: Square, to: Square) -> bool {
        self.is_legal_relocation_for(self.side_to_move(), from, to)
    }

    fn in_placement_phase(&self, player: Player) -> bool {
        self.placed(player) < self.quota()
    }

    fn is_legal(&self, mv: Move) -> bool {
        let placing = self.in_placement_phase(self.side_to_move());
        match mv {
            Move::Placement { to } => placing && self.is_legal_placement(to),
            Move::Relocation { from, to } => !placing && self.is_legal_relocation(from, to),
        }
    }

    fn apply(&mut self, mv: Move) -> Result<(), RulesError> {
        match mv {
            Move::Placement { to } => self.place(to),
            Move::Relocation { from, to } => self.relocate(from, to),
        }
    }
}
