//! Static evaluation of Push Battle positions.
//!
//! [`evaluate`] returns [`WIN_SCORE`] / `-WIN_SCORE` for decided positions and otherwise an
//! additive, weighted sum of threat, pattern, alignment, center-control and protection terms
//! from the point of view of the requested player. Every neighbour and line lookup wraps on
//! the torus except the plain alignment term, which counts bounded pairs only.

use hashbrown::HashSet;

use crate::board::LINE_DIRECTIONS;
use crate::moves::ORTHOGONAL;
use crate::rules::{GameRules, Player, Square};

pub const WIN_SCORE: f32 = 1000.0;

const THREAT_WEIGHT: f32 = 50.0;
const PATTERN_WEIGHT: f32 = 30.0;
const OPPONENT_THREAT_FACTOR: f32 = 1.2;

const TWO_IN_LINE: f32 = 15.0;
const SPLIT_PAIR: f32 = 10.0;

const TRIANGLE_WEIGHT: f32 = 20.0;
const WALL_WEIGHT: f32 = 15.0;
const FORK_WEIGHT: f32 = 25.0;

const ALIGNMENT_BONUS: f32 = 10.0;
const CENTER_BONUS: f32 = 5.0;
const PROTECTION_BONUS: f32 = 3.0;

const QUICK_PIECE_BONUS: f32 = 1.0;
const QUICK_ALIGNMENT_BONUS: f32 = 5.0;

pub fn evaluate<S: GameRules>(state: &S, player: Player) -> f32 {
    if let Some(winner) = state.winner() {
        return if winner == player { WIN_SCORE } else { -WIN_SCORE };
    }

    threat_score(state, player) * THREAT_WEIGHT
        + pattern_score(state, player) * PATTERN_WEIGHT
        + alignment_score(state, player)
        + center_score(state, player)
        + protection_score(state, player)
}

/// Cheap ranking score used to prune fast-mode candidates and score fast rollout leaves:
/// a win check plus a bounded count of own pieces and right/down own neighbours.
pub fn quick_score<S: GameRules>(state: &S, player: Player) -> f32 {
    if let Some(winner) = state.winner() {
        return if winner == player { WIN_SCORE } else { -WIN_SCORE };
    }

    let size = state.size();
    let mut score = 0.0;
    for row in 0..size {
        for col in 0..size {
            if state.cell(Square::new(row, col)) != Some(player) {
                continue;
            }
            score += QUICK_PIECE_BONUS;
            if col + 1 < size && state.cell(Square::new(row, col + 1)) == Some(player) {
                score += QUICK_ALIGNMENT_BONUS;
            }
            if row + 1 < size && state.cell(Square::new(row + 1, col)) == Some(player) {
                score += QUICK_ALIGNMENT_BONUS;
            }
        }
    }
    score
}

/// Unweighted threat balance: own line threats minus the opponent's, the latter
/// weighted by [`OPPONENT_THREAT_FACTOR`].
pub fn threat_score<S: GameRules>(state: &S, player: Player) -> f32 {
    line_threats(state, player) - OPPONENT_THREAT_FACTOR * line_threats(state, player.opponent())
}

fn line_threats<S: GameRules>(state: &S, player: Player) -> f32 {
    let size = state.size();
    let mut total = 0.0;
    for row in 0..size {
        for col in 0..size {
            let origin = Square::new(row, col);
            if state.cell(origin) != Some(player) {
                continue;
            }
            for (dr, dc) in LINE_DIRECTIONS {
                total += check_threat(state, origin, dr, dc, player);
            }
        }
    }
    total
}

fn check_threat<S: GameRules>(
    state: &S,
    origin: Square,
    dr: isize,
    dc: isize,
    player: Player,
) -> f32 {
    let size = state.size();
    let second = origin.offset(dr, dc, size);
    let third = origin.offset(2 * dr, 2 * dc, size);
    let own = Some(player);

    if state.cell(second) == own
        && state.cell(third).is_none()
        && is_reachable(state, third, player)
    {
        return TWO_IN_LINE;
    }
    if state.cell(third) == own
        && state.cell(second).is_none()
        && is_reachable(state, second, player)
    {
        return SPLIT_PAIR;
    }
    0.0
}

/// During placement every empty cell is reachable; afterwards a cell is reachable only
/// if one of the player's pieces could legally relocate onto it.
pub fn is_reachable<S: GameRules>(state: &S, target: Square, player: Player) -> bool {
    if state.in_placement_phase(player) {
        return true;
    }
    let size = state.size();
    (0..size).any(|row| {
        (0..size).any(|col| {
            let from = Square::new(row, col);
            state.cell(from) == Some(player) && state.is_legal_relocation_for(player, from, target)
        })
    })
}

pub fn pattern_score<S: GameRules>(state: &S, player: Player) -> f32 {
    triangle_count(state, player) as f32 * TRIANGLE_WEIGHT
        + wall_count(state, player) as f32 * WALL_WEIGHT
        + fork_count(state, player) as f32 * FORK_WEIGHT
}

/// L-shaped triples `(r, c)`, `(r + 1, c)`, `(r, c + 1)`; a fully protected triple counts twice.
pub fn triangle_count<S: GameRules>(state: &S, player: Player) -> u32 {
    let size = state.size();
    let mut count = 0;
    for row in 0..size.saturating_sub(1) {
        for col in 0..size.saturating_sub(1) {
            let corners = [
                Square::new(row, col),
                Square::new(row + 1, col),
                Square::new(row, col + 1),
            ];
            if !corners.iter().all(|&sq| state.cell(sq) == Some(player)) {
                continue;
            }
            count += 1;
            if corners.iter().all(|&sq| is_protected(state, sq, player)) {
                count += 1;
            }
        }
    }
    count
}

/// Each row and column run of `n >= 2` consecutive protected own pieces contributes `n - 1`.
pub fn wall_count<S: GameRules>(state: &S, player: Player) -> u32 {
    let size = state.size();
    let solid = |sq: Square| state.cell(sq) == Some(player) && is_protected(state, sq, player);
    let mut count = 0;

    for transpose in [false, true] {
        for line in 0..size {
            let mut run = 0u32;
            for step in 0..size {
                let sq = if transpose {
                    Square::new(step, line)
                } else {
                    Square::new(line, step)
                };
                if solid(sq) {
                    run += 1;
                } else {
                    count += run.saturating_sub(1);
                    run = 0;
                }
            }
            count += run.saturating_sub(1);
        }
    }
    count
}

/// Empty cells touching own pieces along two or more line directions, plus one per such
/// cell the player can actually reach.
pub fn fork_count<S: GameRules>(state: &S, player: Player) -> u32 {
    let size = state.size();
    let own = Some(player);
    let mut forks: HashSet<Square> = HashSet::new();

    for row in 0..size {
        for col in 0..size {
            let sq = Square::new(row, col);
            if state.cell(sq).is_some() {
                continue;
            }
            let threats = LINE_DIRECTIONS
                .iter()
                .filter(|&&(dr, dc)| {
                    state.cell(sq.offset(dr, dc, size)) == own
                        || state.cell(sq.offset(-dr, -dc, size)) == own
                })
                .count();
            if threats >= 2 {
                forks.insert(sq);
            }
        }
    }

    let reachable = forks.iter().filter(|&&sq| is_reachable(state, sq, player)).count();
    (forks.len() + reachable) as u32
}

/// Bounded horizontal and vertical own pairs; unlike every other term this does not wrap.
pub fn alignment_score<S: GameRules>(state: &S, player: Player) -> f32 {
    let size = state.size();
    let own = Some(player);
    let mut score = 0.0;
    for row in 0..size {
        for col in 0..size {
            if state.cell(Square::new(row, col)) != own {
                continue;
            }
            if col + 1 < size && state.cell(Square::new(row, col + 1)) == own {
                score += ALIGNMENT_BONUS;
            }
            if row + 1 < size && state.cell(Square::new(row + 1, col)) == own {
                score += ALIGNMENT_BONUS;
            }
        }
    }
    score
}

pub fn center_score<S: GameRules>(state: &S, player: Player) -> f32 {
    let size = state.size();
    let (low, high) = ((size / 2).saturating_sub(1), size / 2);
    let mut score = 0.0;
    for row in low..=high {
        for col in low..=high {
            if state.cell(Square::new(row, col)) == Some(player) {
                score += CENTER_BONUS;
            }
        }
    }
    score
}

pub fn protection_score<S: GameRules>(state: &S, player: Player) -> f32 {
    let size = state.size();
    let mut score = 0.0;
    for row in 0..size {
        for col in 0..size {
            let sq = Square::new(row, col);
            if state.cell(sq) == Some(player) && is_protected(state, sq, player) {
                score += PROTECTION_BONUS;
            }
        }
    }
    score
}

/// A piece is exposed when an orthogonal neighbour holds an opponent piece and the cell
/// directly behind it, in the mirror direction, is not held by the owner.
pub fn is_protected<S: GameRules>(state: &S, square: Square, owner: Player) -> bool {
    let size = state.size();
    ORTHOGONAL.iter().all(|&(dr, dc)| {
        let pusher = state.cell(square.offset(dr, dc, size));
        let behind = state.cell(square.offset(-dr, -dc, size));
        !(pusher == Some(owner.opponent()) && behind != Some(owner))
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::board::{Board, NUM_PIECES};

    fn board(rows: &[&str]) -> Board {
        Board::from_rows(rows, Player::One, NUM_PIECES).expect("valid diagram")
    }

    const EMPTY_ROW: &str = "........";

    fn with_rows(overrides: &[(usize, &'static str)]) -> Board {
        let mut rows = [EMPTY_ROW; 8];
        for &(index, row) in overrides {
            rows[index] = row;
        }
        board(&rows)
    }

    #[test]
    fn split_pair_around_the_center_is_a_threat() {
        let position = with_rows(&[(3, "..X.X...")]);
        assert_eq!(threat_score(&position, Player::One), SPLIT_PAIR);

        let score = evaluate(&position, Player::One);
        assert!(score >= SPLIT_PAIR * THREAT_WEIGHT, "score {score} lacks the threat term");
    }

    #[test]
    fn two_in_line_with_open_end_scores_fifteen() {
        let position = with_rows(&[(0, "XX......")]);
        assert_eq!(threat_score(&position, Player::One), TWO_IN_LINE);
    }

    #[test]
    fn opponent_threats_weigh_more() {
        let position = with_rows(&[(3, "..O.O...")]);
        assert_eq!(threat_score(&position, Player::One), -OPPONENT_THREAT_FACTOR * SPLIT_PAIR);
        assert_eq!(threat_score(&position, Player::Two), SPLIT_PAIR);
    }

    #[test]
    fn decided_positions_short_circuit() {
        let position = with_rows(&[(0, "XXX.....")]);
        assert_eq!(evaluate(&position, Player::One), WIN_SCORE);
        assert_eq!(evaluate(&position, Player::Two), -WIN_SCORE);
        assert_eq!(quick_score(&position, Player::Two), -WIN_SCORE);
    }

    #[test]
    fn lone_piece_is_protected() {
        let position = with_rows(&[(4, "....X...")]);
        assert!(is_protected(&position, Square::new(4, 4), Player::One));
    }

    #[test]
    fn backstop_protects_against_adjacent_opponent() {
        let position = with_rows(&[(4, "...XXO..")]);
        assert!(is_protected(&position, Square::new(4, 4), Player::One));
    }

    #[test]
    fn empty_or_enemy_backstop_leaves_piece_exposed() {
        let empty_backstop = with_rows(&[(4, "....XO..")]);
        assert!(!is_protected(&empty_backstop, Square::new(4, 4), Player::One));

        let enemy_backstop = with_rows(&[(4, "...OXO..")]);
        assert!(!is_protected(&enemy_backstop, Square::new(4, 4), Player::One));
    }

    #[test]
    fn protection_wraps_on_the_torus() {
        let position = with_rows(&[(0, "X......O")]);
        assert!(!is_protected(&position, Square::new(0, 0), Player::One));
    }

    #[test]
    fn alignment_does_not_wrap() {
        assert_eq!(alignment_score(&with_rows(&[(0, "X......X")]), Player::One), 0.0);
        assert_eq!(alignment_score(&with_rows(&[(0, "XX......")]), Player::One), ALIGNMENT_BONUS);
    }

    #[test]
    fn center_cells_are_rewarded() {
        let position = with_rows(&[(3, "...X...."), (4, "....X...")]);
        assert_eq!(center_score(&position, Player::One), 2.0 * CENTER_BONUS);
        assert_eq!(center_score(&position, Player::Two), 0.0);
    }

    #[test]
    fn protected_triangle_counts_twice() {
        let position = with_rows(&[(2, "..XX...."), (3, "..X.....")]);
        assert_eq!(triangle_count(&position, Player::One), 2);
    }

    #[test]
    fn walls_include_runs_touching_the_edge() {
        assert_eq!(wall_count(&with_rows(&[(0, "......XX")]), Player::One), 1);
        assert_eq!(wall_count(&with_rows(&[(0, ".XX.XX..")]), Player::One), 2);
    }

    #[test]
    fn forks_need_two_directions() {
        let position = with_rows(&[(2, "...X...."), (3, "..X.....")]);
        // (2, 2) and (3, 3) each touch own pieces along two lines; both are reachable.
        assert_eq!(fork_count(&position, Player::One), 4);
    }

    #[test]
    fn relocation_phase_reachability_depends_on_pieces() {
        let position =
            Board::from_rows(&["X..", "...", "..."], Player::One, 1).expect("valid diagram");
        assert!(is_reachable(&position, Square::new(1, 1), Player::One));

        let stranded =
            Board::from_rows(&["...", "...", "..."], Player::One, 0).expect("valid diagram");
        assert!(!is_reachable(&stranded, Square::new(1, 1), Player::One));
    }

    #[test]
    fn quick_score_counts_pieces_and_bounded_pairs() {
        let position = with_rows(&[(0, "XX.....X")]);
        assert_eq!(
            quick_score(&position, Player::One),
            3.0 * QUICK_PIECE_BONUS + QUICK_ALIGNMENT_BONUS
        );
    }
}
