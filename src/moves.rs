//! Candidate enumeration for the side to move.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::rules::{GameRules, Move, Square};

/// Move buffer sized for a full placement scan on the default board without spilling.
pub type MoveList = SmallVec<[Move; 64]>;

/// The four torus-adjacent orthogonal steps.
pub const ORTHOGONAL: [(isize, isize); 4] = [(0, 1), (0, -1), (1, 0), (-1, 0)];

/// Which empty cells a relocation may target.
///
/// `Adjacent` is a narrowing used by the fast configuration: it only offers the four
/// orthogonal torus neighbours of each source piece, trading completeness for speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RelocationReach {
    #[default]
    Anywhere,
    Adjacent,
}

/// Lists every legal move for the side to move, in row-major scan order.
///
/// Below quota only placements are produced, at or above quota only relocations. Every
/// move is filtered through the rules engine's legality predicate, so the list can be
/// used as a frozen candidate set.
pub fn enumerate_moves<S: GameRules>(state: &S, reach: RelocationReach) -> MoveList {
    let mover = state.side_to_move();
    let size = state.size();
    let mut moves = MoveList::new();

    if state.in_placement_phase(mover) {
        for row in 0..size {
            for col in 0..size {
                let to = Square::new(row, col);
                if state.cell(to).is_none() && state.is_legal_placement(to) {
                    moves.push(Move::Placement { to });
                }
            }
        }
        return moves;
    }

    for row in 0..size {
        for col in 0..size {
            let from = Square::new(row, col);
            if state.cell(from) != Some(mover) {
                continue;
            }
            match reach {
                RelocationReach::Anywhere => {
                    for to_row in 0..size {
                        for to_col in 0..size {
                            let to = Square::new(to_row, to_col);
                            if state.cell(to).is_none() && state.is_legal_relocation(from, to) {
                                moves.push(Move::Relocation { from, to });
                            }
                        }
                    }
                }
                RelocationReach::Adjacent => {
                    for (dr, dc) in ORTHOGONAL {
                        let to = from.offset(dr, dc, size);
                        let mv = Move::Relocation { from, to };
                        // Opposite steps land on the same cell on boards narrower than three.
                        if size < 3 && moves.contains(&mv) {
                            continue;
                        }
                        if state.cell(to).is_none() && state.is_legal_relocation(from, to) {
                            moves.push(mv);
                        }
                    }
                }
            }
        }
    }
    moves
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::board::Board;
    use crate::rules::Player;

    #[test]
    fn empty_board_offers_every_cell_for_placement() {
        let board = Board::new();
        let moves = enumerate_moves(&board, RelocationReach::Anywhere);
        assert_eq!(moves.len(), 64);
        assert_eq!(moves[0], Move::Placement { to: Square::new(0, 0) });
        assert!(moves.iter().all(|mv| matches!(mv, Move::Placement { .. })));
    }

    #[test]
    fn occupied_cells_are_never_offered() {
        let board = Board::from_rows(&["X.", ".O"], Player::One, 2).expect("valid diagram");
        let moves = enumerate_moves(&board, RelocationReach::Anywhere);
        assert_eq!(
            moves.as_slice(),
            &[
                Move::Placement { to: Square::new(0, 1) },
                Move::Placement { to: Square::new(1, 0) },
            ]
        );
    }

    #[test]
    fn relocation_phase_pairs_own_pieces_with_empty_cells() {
        let board =
            Board::from_rows(&["X..", "...", "..O"], Player::One, 1).expect("valid diagram");
        let anywhere = enumerate_moves(&board, RelocationReach::Anywhere);
        assert_eq!(anywhere.len(), 7);
        assert!(anywhere.iter().all(|mv| matches!(
            mv,
            Move::Relocation { from, .. } if *from == Square::new(0, 0)
        )));

        let adjacent = enumerate_moves(&board, RelocationReach::Adjacent);
        assert_eq!(
            adjacent.as_slice(),
            &[
                Move::Relocation { from: Square::new(0, 0), to: Square::new(0, 1) },
                Move::Relocation { from: Square::new(0, 0), to: Square::new(0, 2) },
                Move::Relocation { from: Square::new(0, 0), to: Square::new(1, 0) },
                Move::Relocation { from: Square::new(0, 0), to: Square::new(2, 0) },
            ]
        );
    }

    #[test]
    fn full_board_has_no_moves() {
        let board = Board::from_rows(&["XO", "OX"], Player::One, 2).expect("valid diagram");
        assert!(enumerate_moves(&board, RelocationReach::Anywhere).is_empty());
        assert!(enumerate_moves(&board, RelocationReach::Adjacent).is_empty());
    }

    #[test]
    fn adjacent_reach_wraps_around_the_torus() {
        let mut rows = vec!["........"; 8];
        rows[7] = ".......X";
        let board = Board::from_rows(&rows, Player::One, 1).expect("valid diagram");
        let moves = enumerate_moves(&board, RelocationReach::Adjacent);
        let targets: Vec<Square> = moves.iter().map(|mv| mv.target()).collect();
        assert_eq!(
            targets,
            vec![Square::new(7, 0), Square::new(7, 6), Square::new(0, 7), Square::new(6, 7)]
        );
    }
}
