use std::fmt;

use thiserror::Error;
use wasm_bindgen::prelude::*;

use crate::moves::{enumerate_moves, RelocationReach};
use crate::rules::{GameRules, Move, Player, RulesError, Square};

pub const BOARD_SIZE: usize = 8;
pub const NUM_PIECES: usize = 8;
pub const CELL_COUNT: usize = BOARD_SIZE * BOARD_SIZE;
/// Trailing metadata entries in a flat state vector: side to move, both placed counts, turn.
pub const META_FIELDS: usize = 4;
pub const STATE_SIZE: usize = CELL_COUNT + META_FIELDS; // 68 i8 entries

const EMPTY: i8 = 0;

/// Every piece adjacent (including diagonally) to a freshly placed or moved piece is pushed
/// one step further along this direction when the cell beyond it is empty.
const PUSH_DIRECTIONS: [(isize, isize); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// Horizontal, vertical and both diagonals; each line is scanned forward only.
pub const LINE_DIRECTIONS: [(isize, isize); 4] = [(0, 1), (1, 0), (1, 1), (1, -1)];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BoardError {
    #[error("board must have at least one row")]
    Empty,
    #[error("row {row} has {found} cells, expected {expected}")]
    RaggedRow { row: usize, found: usize, expected: usize },
    #[error("unknown cell symbol {0:?}")]
    UnknownSymbol(char),
    #[error("cell value {0} is not one of 1, -1, 0")]
    UnknownCell(i8),
    #[error("{player:?} has {count} pieces on the board but the quota is {quota}")]
    QuotaExceeded { player: Player, count: usize, quota: usize },
    #[error("state vector of length {0} does not describe a square board")]
    BadLength(usize),
}

/// Push Battle position on an N×N torus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    size: usize,
    quota: usize,
    cells: Vec<i8>,
    side_to_move: Player,
    placed: [usize; 2],
    turn: u16,
}

#[inline]
const fn slot(player: Player) -> usize {
    match player {
        Player::One => 0,
        Player::Two => 1,
    }
}

impl Board {
    pub fn new() -> Self {
        Self::with_dimensions(BOARD_SIZE, NUM_PIECES)
    }

    pub fn with_dimensions(size: usize, quota: usize) -> Self {
        Self {
            size,
            quota,
            cells: vec![EMPTY; size * size],
            side_to_move: Player::One,
            placed: [0; 2],
            turn: 0,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::with_dimensions(self.size, self.quota);
    }

    /// Parses an ASCII diagram: `X` for [`Player::One`], `O` for [`Player::Two`], `.` for empty.
    /// Pieces already on the board count as placed.
    pub fn from_rows(
        rows: &[&str],
        side_to_move: Player,
        quota: usize,
    ) -> Result<Self, BoardError> {
        let size = rows.len();
        if size == 0 {
            return Err(BoardError::Empty);
        }
        let mut board = Self::with_dimensions(size, quota);
        board.side_to_move = side_to_move;
        for (row, line) in rows.iter().enumerate() {
            let symbols: Vec<char> = line.chars().filter(|c| !c.is_whitespace()).collect();
            if symbols.len() != size {
                return Err(BoardError::RaggedRow {
                    row,
                    found: symbols.len(),
                    expected: size,
                });
            }
            for (col, symbol) in symbols.into_iter().enumerate() {
                let value = match symbol {
                    'X' | 'x' => Player::One.sign(),
                    'O' | 'o' => Player::Two.sign(),
                    '.' => EMPTY,
                    other => return Err(BoardError::UnknownSymbol(other)),
                };
                board.cells[row * size + col] = value;
            }
        }
        board.recount()?;
        board.turn = (board.placed[0] + board.placed[1]).min(u16::MAX as usize) as u16;
        Ok(board)
    }

    /// Decodes the flat layout produced by [`Board::to_vec`]. The board size is inferred from
    /// the vector length; the quota is always [`NUM_PIECES`].
    pub fn from_bytes(bytes: &[i8]) -> Result<Self, BoardError> {
        let cells = bytes
            .len()
            .checked_sub(META_FIELDS)
            .ok_or(BoardError::BadLength(bytes.len()))?;
        let size = (cells as f64).sqrt() as usize;
        if size == 0 || size * size != cells {
            return Err(BoardError::BadLength(bytes.len()));
        }
        let mut board = Self::with_dimensions(size, NUM_PIECES);
        for (index, &value) in bytes[..cells].iter().enumerate() {
            if value != EMPTY && Player::from_sign(value).is_none() {
                return Err(BoardError::UnknownCell(value));
            }
            board.cells[index] = value;
        }
        let meta = &bytes[cells..];
        board.side_to_move = Player::from_sign(meta[0]).ok_or(BoardError::UnknownCell(meta[0]))?;
        board.placed = [meta[1].max(0) as usize, meta[2].max(0) as usize];
        board.turn = meta[3].max(0) as u16;
        for player in [Player::One, Player::Two] {
            if board.placed[slot(player)] > board.quota {
                return Err(BoardError::QuotaExceeded {
                    player,
                    count: board.placed[slot(player)],
                    quota: board.quota,
                });
            }
        }
        Ok(board)
    }

    pub fn write_into_slice(&self, target: &mut [i8]) {
        let cells = self.cells.len();
        assert_eq!(target.len(), cells + META_FIELDS, "slice must hold cells plus metadata");
        target[..cells].copy_from_slice(&self.cells);
        target[cells] = self.side_to_move.sign();
        target[cells + 1] = self.placed[0].min(127) as i8;
        target[cells + 2] = self.placed[1].min(127) as i8;
        target[cells + 3] = self.turn.min(127) as i8;
    }

    pub fn to_vec(&self) -> Vec<i8> {
        let mut vec = vec![0; self.cells.len() + META_FIELDS];
        self.write_into_slice(&mut vec);
        vec
    }

    pub fn turn(&self) -> u16 {
        self.turn
    }

    fn recount(&mut self) -> Result<(), BoardError> {
        for player in [Player::One, Player::Two] {
            let count = self.cells.iter().filter(|&&v| v == player.sign()).count();
            if count > self.quota {
                return Err(BoardError::QuotaExceeded {
                    player,
                    count,
                    quota: self.quota,
                });
            }
            self.placed[slot(player)] = count;
        }
        Ok(())
    }

    #[inline]
    fn idx(&self, square: Square) -> usize {
        square.row * self.size + square.col
    }

    #[inline]
    fn contains(&self, square: Square) -> bool {
        square.row < self.size && square.col < self.size
    }

    fn push_neighbours(&mut self, origin: Square) {
        for (dr, dc) in PUSH_DIRECTIONS {
            let neighbour = origin.offset(dr, dc, self.size);
            let from = self.idx(neighbour);
            if self.cells[from] == EMPTY {
                continue;
            }
            let beyond = self.idx(neighbour.offset(dr, dc, self.size));
            if self.cells[beyond] == EMPTY {
                self.cells[beyond] = self.cells[from];
                self.cells[from] = EMPTY;
            }
        }
    }

    fn has_line(&self, player: Player) -> bool {
        let sign = player.sign();
        for row in 0..self.size {
            for col in 0..self.size {
                let start = Square::new(row, col);
                if self.cells[self.idx(start)] != sign {
                    continue;
                }
                for (dr, dc) in LINE_DIRECTIONS {
                    let second = start.offset(dr, dc, self.size);
                    let third = start.offset(2 * dr, 2 * dc, self.size);
                    if self.cells[self.idx(second)] == sign && self.cells[self.idx(third)] == sign {
                        return true;
                    }
                }
            }
        }
        false
    }

    fn bump_turn(&mut self) {
        self.turn = self.turn.saturating_add(1);
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl GameRules for Board {
    fn size(&self) -> usize {
        self.size
    }

    fn quota(&self) -> usize {
        self.quota
    }

    fn cell(&self, square: Square) -> Option<Player> {
        Player::from_sign(self.cells[self.idx(square)])
    }

    fn side_to_move(&self) -> Player {
        self.side_to_move
    }

    fn placed(&self, player: Player) -> usize {
        self.placed[slot(player)]
    }

    fn is_legal_placement(&self, square: Square) -> bool {
        self.contains(square) && self.cells[self.idx(square)] == EMPTY
    }

    fn is_legal_relocation_for(&self, player: Player, from: Square, to: Square) -> bool {
        self.contains(from)
            && self.contains(to)
            && self.cells[self.idx(from)] == player.sign()
            && self.cells[self.idx(to)] == EMPTY
    }

    /// Three contiguous pieces in any line direction, wrapping on the torus. When both sides
    /// have a line at once the side to move is reported.
    fn winner(&self) -> Option<Player> {
        let one = self.has_line(Player::One);
        let two = self.has_line(Player::Two);
        match (one, two) {
            (true, true) => Some(self.side_to_move),
            (true, false) => Some(Player::One),
            (false, true) => Some(Player::Two),
            (false, false) => None,
        }
    }

    fn place(&mut self, square: Square) -> Result<(), RulesError> {
        let mover = self.side_to_move;
        if !self.contains(square) {
            return Err(RulesError::OutOfBounds(square));
        }
        if !self.in_placement_phase(mover) {
            return Err(RulesError::WrongPhase(Move::Placement { to: square }));
        }
        let index = self.idx(square);
        if self.cells[index] != EMPTY {
            return Err(RulesError::Occupied(square));
        }
        self.cells[index] = mover.sign();
        self.push_neighbours(square);
        self.placed[slot(mover)] += 1;
        self.bump_turn();
        Ok(())
    }

    fn relocate(&mut self, from: Square, to: Square) -> Result<(), RulesError> {
        let mover = self.side_to_move;
        for square in [from, to] {
            if !self.contains(square) {
                return Err(RulesError::OutOfBounds(square));
            }
        }
        if self.in_placement_phase(mover) {
            return Err(RulesError::WrongPhase(Move::Relocation { from, to }));
        }
        let source = self.idx(from);
        if self.cells[source] != mover.sign() {
            return Err(RulesError::NotOwnPiece(from));
        }
        let target = self.idx(to);
        if self.cells[target] != EMPTY {
            return Err(RulesError::Occupied(to));
        }
        self.cells[source] = EMPTY;
        self.cells[target] = mover.sign();
        self.push_neighbours(to);
        self.bump_turn();
        Ok(())
    }

    fn end_turn(&mut self) {
        self.side_to_move = self.side_to_move.opponent();
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.cells.chunks(self.size) {
            for &value in row {
                let symbol = match Player::from_sign(value) {
                    Some(Player::One) => 'X',
                    Some(Player::Two) => 'O',
                    None => '.',
                };
                write!(f, "{symbol}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// A thin wasm-bindgen friendly board wrapper for the referee side.
#[wasm_bindgen]
pub struct PushBattleBoard {
    state: Board,
}

#[wasm_bindgen]
impl PushBattleBoard {
    #[wasm_bindgen(constructor)]
    pub fn new() -> PushBattleBoard {
        PushBattleBoard { state: Board::new() }
    }

    /// Serialize the board to a 68-entry `Int8Array` (cells, side to move, placed counts, turn).
    #[wasm_bindgen(js_name = getState)]
    pub fn get_state(&self) -> Vec<i8> {
        self.state.to_vec()
    }

    /// Replace the board contents from a vector produced by `getState`.
    #[wasm_bindgen(js_name = setState)]
    pub fn set_state(&mut self, data: Vec<i8>) -> Result<(), JsValue> {
        self.state = Board::from_bytes(&data).map_err(|err| JsValue::from_str(&err.to_string()))?;
        Ok(())
    }

    pub fn reset(&mut self) {
        self.state.reset();
    }

    /// `1`, `-1`, or `0` while undecided.
    pub fn winner(&self) -> i8 {
        self.state.winner().map_or(0, Player::sign)
    }

    #[wasm_bindgen(js_name = sideToMove)]
    pub fn side_to_move(&self) -> i8 {
        self.state.side_to_move().sign()
    }

    /// All legal moves for the side to move as `{ kind, to, from? }` objects.
    #[wasm_bindgen(js_name = legalMoves)]
    pub fn legal_moves(&self) -> Result<JsValue, JsValue> {
        let moves = enumerate_moves(&self.state, RelocationReach::Anywhere);
        serde_wasm_bindgen::to_value(moves.as_slice()).map_err(JsValue::from)
    }

    /// Apply a move object and hand the turn to the opponent.
    #[wasm_bindgen(js_name = applyMove)]
    pub fn apply_move(&mut self, mv: JsValue) -> Result<(), JsValue> {
        let mv: Move = serde_wasm_bindgen::from_value(mv)?;
        self.state
            .apply(mv)
            .map_err(|err| JsValue::from_str(&err.to_string()))?;
        self.state.end_turn();
        Ok(())
    }

    pub fn turn(&self) -> u16 {
        self.state.turn()
    }
}

impl PushBattleBoard {
    pub fn board(&self) -> &Board {
        &self.state
    }
}

impl Default for PushBattleBoard {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn roundtrip_serialisation() {
        let mut board = Board::from_rows(
            &[
                "X.......",
                "........",
                "...O....",
                "........",
                "........",
                "........",
                "........",
                ".......X",
            ],
            Player::Two,
            NUM_PIECES,
        )
        .expect("valid diagram");
        board.turn = 42;

        let mut buffer = [0i8; STATE_SIZE];
        board.write_into_slice(&mut buffer);
        let reconstructed = Board::from_bytes(&buffer).expect("decodes");

        assert_eq!(board, reconstructed);
    }

    #[test]
    fn placement_pushes_neighbours_across_the_edge() {
        let mut board = Board::from_rows(&["....", "....", "....", "O..."], Player::One, 4)
            .expect("valid diagram");
        board.place(Square::new(0, 0)).expect("legal placement");

        // (3, 0) sits directly above (0, 0) on the torus and is pushed to (2, 0).
        assert_eq!(board.cell(Square::new(3, 0)), None);
        assert_eq!(board.cell(Square::new(2, 0)), Some(Player::Two));
        assert_eq!(board.placed(Player::One), 1);
        assert_eq!(board.side_to_move(), Player::One);
    }

    #[test]
    fn blocked_neighbour_stays_put() {
        let mut board = Board::from_rows(&["....", ".OX.", "....", "...."], Player::One, 4)
            .expect("valid diagram");
        board.place(Square::new(1, 0)).expect("legal placement");

        assert_eq!(board.cell(Square::new(1, 1)), Some(Player::Two));
        assert_eq!(board.cell(Square::new(1, 2)), Some(Player::One));
    }

    #[test]
    fn relocation_requires_movement_phase_and_own_piece() {
        let mut board = Board::from_rows(&["X...", "....", "..O.", "...."], Player::One, 1)
            .expect("valid diagram");
        assert_eq!(
            board.place(Square::new(1, 1)),
            Err(RulesError::WrongPhase(Move::Placement { to: Square::new(1, 1) }))
        );
        assert_eq!(
            board.relocate(Square::new(2, 2), Square::new(3, 3)),
            Err(RulesError::NotOwnPiece(Square::new(2, 2)))
        );
        assert_eq!(
            board.relocate(Square::new(0, 0), Square::new(2, 2)),
            Err(RulesError::Occupied(Square::new(2, 2)))
        );
        board
            .relocate(Square::new(0, 0), Square::new(1, 3))
            .expect("legal relocation");
        assert_eq!(board.cell(Square::new(0, 0)), None);
        assert_eq!(board.cell(Square::new(1, 3)), Some(Player::One));
    }

    #[test]
    fn winner_detects_wrapped_lines() {
        let board = Board::from_rows(
            &[
                "X.......",
                "........",
                "........",
                "........",
                "........",
                "........",
                "X.......",
                "X.......",
            ],
            Player::Two,
            NUM_PIECES,
        )
        .expect("valid diagram");
        assert_eq!(board.winner(), Some(Player::One));
        assert_eq!(Board::new().winner(), None);
    }

    #[test]
    fn simultaneous_lines_favour_the_side_to_move() {
        let board = Board::from_rows(
            &[
                "XXX.....", "........", "OOO.....", "........", "........", "........", "........",
                "........",
            ],
            Player::Two,
            NUM_PIECES,
        )
        .expect("valid diagram");
        assert_eq!(board.winner(), Some(Player::Two));
    }

    #[test]
    fn parsing_rejects_bad_diagrams() {
        assert_eq!(Board::from_rows(&[], Player::One, 8), Err(BoardError::Empty));
        assert_eq!(
            Board::from_rows(&["..", "."], Player::One, 8),
            Err(BoardError::RaggedRow { row: 1, found: 1, expected: 2 })
        );
        assert_eq!(Board::from_rows(&["?"], Player::One, 8), Err(BoardError::UnknownSymbol('?')));
        assert_eq!(
            Board::from_rows(&["XX", ".."], Player::One, 1),
            Err(BoardError::QuotaExceeded { player: Player::One, count: 2, quota: 1 })
        );
        assert_eq!(Board::from_bytes(&[0; 7]), Err(BoardError::BadLength(7)));
    }
}
