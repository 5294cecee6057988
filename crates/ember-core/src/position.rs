//! Mutable game position: a stack of boards with push/pop and scoped guards.

use std::ops::{Deref, DerefMut};

use chess::{ALL_SQUARES, Board, Color, EMPTY, MoveGen, Piece};

use crate::chess_move::Move;
use crate::move_list::MoveList;

/// How a frame was entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameKind {
    Root,
    Move,
    Null,
}

/// One entry of the position stack.
#[derive(Clone, Copy)]
struct Frame {
    board: Board,
    hash: u64,
    /// Plies since the last capture or pawn move.
    rule50: u16,
    /// Plies since the last null move (or the root). Bounds the repetition scan.
    plies_from_null: u16,
    kind: FrameKind,
}

/// A chess position supporting in-place make/unmake.
///
/// Each pushed move appends a frame; popping restores the previous one.
/// Frames before the search root (the game history) take part in repetition
/// detection, so a position loaded from a move list knows its own past.
///
/// Pushes and pops must be paired. The [`Position::make`] and
/// [`Position::make_null`] guards do the pairing automatically.
#[derive(Clone)]
pub struct Position {
    frames: Vec<Frame>,
}

impl Position {
    /// The standard starting position.
    pub fn startpos() -> Position {
        Position::from_board(Board::default(), 0)
    }

    /// Wrap a board with the given fifty-move counter.
    pub fn from_board(board: Board, rule50: u16) -> Position {
        let mut frames = Vec::with_capacity(256);
        frames.push(Frame {
            board,
            hash: board.get_hash(),
            rule50,
            plies_from_null: 0,
            kind: FrameKind::Root,
        });
        Position { frames }
    }

    #[inline]
    fn top(&self) -> &Frame {
        // The root frame is never popped.
        &self.frames[self.frames.len() - 1]
    }

    /// The current board.
    #[inline]
    pub fn board(&self) -> &Board {
        &self.top().board
    }

    /// Side to move.
    #[inline]
    pub fn side_to_move(&self) -> Color {
        self.board().side_to_move()
    }

    /// 64-bit Zobrist fingerprint of the current position.
    #[inline]
    pub fn fingerprint(&self) -> u64 {
        self.top().hash
    }

    /// Plies since the last capture or pawn move.
    #[inline]
    pub fn rule50(&self) -> u16 {
        self.top().rule50
    }

    /// Number of frames above the root (moves and null moves currently pushed).
    #[inline]
    pub fn depth_from_root(&self) -> usize {
        self.frames.len() - 1
    }

    /// Return `true` if the side to move is in check.
    #[inline]
    pub fn is_in_check(&self) -> bool {
        *self.board().checkers() != EMPTY
    }

    /// Return `true` if the position is drawn by the fifty-move rule or repeats
    /// an earlier position with the same side to move.
    ///
    /// A single earlier occurrence counts. The scan stops at the last
    /// irreversible move and never crosses a null move.
    pub fn is_draw_by_repetition_or_fifty_move(&self) -> bool {
        let top = self.top();
        if top.rule50 >= 100 {
            return true;
        }

        let window = top.rule50.min(top.plies_from_null) as usize;
        let current = self.frames.len() - 1;
        let hash = top.hash;

        (4..=window)
            .step_by(2)
            .take_while(|&distance| distance <= current)
            .any(|distance| self.frames[current - distance].hash == hash)
    }

    /// Return `true` if `side` has a knight, bishop, rook or queen.
    pub fn has_non_pawn_material(&self, side: Color) -> bool {
        let board = self.board();
        let officers = *board.pieces(Piece::Knight)
            | *board.pieces(Piece::Bishop)
            | *board.pieces(Piece::Rook)
            | *board.pieces(Piece::Queen);
        (officers & *board.color_combined(side)) != EMPTY
    }

    /// Piece type on square index `sq` (a1 = 0), if any.
    #[inline]
    pub fn piece_type_at(&self, sq: usize) -> Option<Piece> {
        self.board().piece_on(ALL_SQUARES[sq])
    }

    /// Generate all legal moves, in the board library's generation order.
    pub fn generate_legal_moves(&self) -> MoveList {
        let board = self.board();
        MoveGen::new_legal(board)
            .map(|cm| Move::from_chess(board, cm))
            .collect()
    }

    /// Generate the legal capture-class moves: captures, en passant and all promotions.
    pub fn generate_legal_capture_moves(&self) -> MoveList {
        let board = self.board();
        MoveGen::new_legal(board)
            .map(|cm| Move::from_chess(board, cm))
            .filter(|mv| mv.is_capture() || mv.is_promotion())
            .collect()
    }

    /// Play `mv`, which must be legal in the current position.
    pub fn push_move(&mut self, mv: Move) {
        debug_assert!(!mv.is_null(), "push_move called with the null move");
        let top = *self.top();
        let resets_rule50 =
            mv.is_capture() || top.board.piece_on(mv.source()) == Some(Piece::Pawn);
        let board = top.board.make_move_new(mv.to_chess());
        self.frames.push(Frame {
            board,
            hash: board.get_hash(),
            rule50: if resets_rule50 { 0 } else { top.rule50.saturating_add(1) },
            plies_from_null: top.plies_from_null.saturating_add(1),
            kind: FrameKind::Move,
        });
    }

    /// Undo the last [`Position::push_move`].
    ///
    /// # Panics
    ///
    /// Panics if the top frame was not entered by `push_move`.
    pub fn pop_move(&mut self) {
        self.pop_frame(FrameKind::Move);
    }

    /// Pass the turn without moving a piece.
    ///
    /// Returns `false` (and pushes nothing) when the side to move is in check,
    /// where passing would be illegal.
    pub fn push_null_move(&mut self) -> bool {
        let top = *self.top();
        let Some(board) = top.board.null_move() else {
            return false;
        };
        self.frames.push(Frame {
            board,
            hash: board.get_hash(),
            rule50: top.rule50.saturating_add(1),
            plies_from_null: 0,
            kind: FrameKind::Null,
        });
        true
    }

    /// Undo the last [`Position::push_null_move`].
    ///
    /// # Panics
    ///
    /// Panics if the top frame was not entered by `push_null_move`.
    pub fn pop_null_move(&mut self) {
        self.pop_frame(FrameKind::Null);
    }

    fn pop_frame(&mut self, expected: FrameKind) {
        let kind = self.top().kind;
        assert!(
            kind == expected,
            "unpaired pop: expected a {expected:?} frame, found {kind:?}"
        );
        self.frames.pop();
    }

    /// Play `mv` and return a guard that undoes it when dropped.
    pub fn make(&mut self, mv: Move) -> MoveGuard<'_> {
        self.push_move(mv);
        MoveGuard {
            position: self,
            null: false,
        }
    }

    /// Pass the turn and return a guard that undoes it when dropped.
    ///
    /// Returns `None` when the side to move is in check.
    pub fn make_null(&mut self) -> Option<MoveGuard<'_>> {
        if !self.push_null_move() {
            return None;
        }
        Some(MoveGuard {
            position: self,
            null: true,
        })
    }

    /// Make the pushed moves part of the game history: the current frame
    /// becomes the new root and can no longer be popped.
    pub fn commit(&mut self) {
        let last = self.frames.len() - 1;
        self.frames[last].kind = FrameKind::Root;
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::startpos()
    }
}

impl std::fmt::Debug for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Position")
            .field("board", &format_args!("{}", self.board()))
            .field("rule50", &self.rule50())
            .field("frames", &self.frames.len())
            .finish()
    }
}

/// Scoped make-move: dereferences to the position and undoes the move on drop.
pub struct MoveGuard<'a> {
    position: &'a mut Position,
    null: bool,
}

impl Deref for MoveGuard<'_> {
    type Target = Position;

    fn deref(&self) -> &Position {
        self.position
    }
}

impl DerefMut for MoveGuard<'_> {
    fn deref_mut(&mut self) -> &mut Position {
        self.position
    }
}

impl Drop for MoveGuard<'_> {
    fn drop(&mut self) {
        if self.null {
            self.position.pop_null_move();
        } else {
            self.position.pop_move();
        }
    }
}

#[cfg(test)]
mod tests {
    use chess::{Color, Piece, Square};

    use super::Position;
    use crate::chess_move::{Move, MoveFlag};

    fn quiet(from: Square, to: Square) -> Move {
        Move::new(from, to, MoveFlag::Quiet)
    }

    #[test]
    fn startpos_has_20_moves_and_no_captures() {
        let pos = Position::startpos();
        assert_eq!(pos.generate_legal_moves().len(), 20);
        assert!(pos.generate_legal_capture_moves().is_empty());
        assert_eq!(pos.side_to_move(), Color::White);
        assert!(!pos.is_in_check());
    }

    #[test]
    fn push_pop_restores_fingerprint() {
        let mut pos = Position::startpos();
        let before = pos.fingerprint();
        pos.push_move(Move::new(Square::E2, Square::E4, MoveFlag::DoublePawnPush));
        assert_ne!(pos.fingerprint(), before);
        assert_eq!(pos.side_to_move(), Color::Black);
        pos.pop_move();
        assert_eq!(pos.fingerprint(), before);
    }

    #[test]
    fn guard_undoes_on_drop() {
        let mut pos = Position::startpos();
        let before = pos.fingerprint();
        {
            let child = pos.make(quiet(Square::G1, Square::F3));
            assert_eq!(child.piece_type_at(Square::F3.to_index()), Some(Piece::Knight));
            assert_eq!(child.depth_from_root(), 1);
        }
        assert_eq!(pos.fingerprint(), before);
        assert_eq!(pos.depth_from_root(), 0);
    }

    #[test]
    fn null_guard_switches_side_only() {
        let mut pos = Position::startpos();
        {
            let passed = pos.make_null().expect("not in check");
            assert_eq!(passed.side_to_move(), Color::Black);
            assert_eq!(passed.generate_legal_moves().len(), 20);
        }
        assert_eq!(pos.side_to_move(), Color::White);
    }

    #[test]
    fn null_move_refused_in_check() {
        let mut pos: Position = "4k3/8/8/8/8/8/4r3/4K3 w - - 0 1".parse().unwrap();
        assert!(pos.is_in_check());
        assert!(pos.make_null().is_none());
        assert_eq!(pos.depth_from_root(), 0);
    }

    #[test]
    #[should_panic(expected = "unpaired pop")]
    fn popping_root_panics() {
        let mut pos = Position::startpos();
        pos.pop_move();
    }

    #[test]
    #[should_panic(expected = "unpaired pop")]
    fn popping_wrong_kind_panics() {
        let mut pos = Position::startpos();
        pos.push_move(quiet(Square::G1, Square::F3));
        pos.pop_null_move();
    }

    #[test]
    fn knight_shuffle_is_repetition() {
        let mut pos = Position::startpos();
        assert!(!pos.is_draw_by_repetition_or_fifty_move());
        pos.push_move(quiet(Square::G1, Square::F3));
        pos.push_move(quiet(Square::G8, Square::F6));
        pos.push_move(quiet(Square::F3, Square::G1));
        assert!(!pos.is_draw_by_repetition_or_fifty_move());
        pos.push_move(quiet(Square::F6, Square::G8));
        assert!(pos.is_draw_by_repetition_or_fifty_move());
    }

    #[test]
    fn pawn_move_breaks_repetition_window() {
        let mut pos = Position::startpos();
        pos.push_move(Move::new(Square::E2, Square::E4, MoveFlag::DoublePawnPush));
        assert_eq!(pos.rule50(), 0);
        pos.push_move(quiet(Square::G8, Square::F6));
        assert_eq!(pos.rule50(), 1);
    }

    #[test]
    fn fifty_move_rule() {
        let pos: Position = "4k3/8/8/8/8/8/8/R3K3 w - - 100 80".parse().unwrap();
        assert!(pos.is_draw_by_repetition_or_fifty_move());
        let pos: Position = "4k3/8/8/8/8/8/8/R3K3 w - - 99 80".parse().unwrap();
        assert!(!pos.is_draw_by_repetition_or_fifty_move());
    }

    #[test]
    fn non_pawn_material() {
        let pos: Position = "4k3/pppp4/8/8/8/8/8/R3K3 w - - 0 1".parse().unwrap();
        assert!(pos.has_non_pawn_material(Color::White));
        assert!(!pos.has_non_pawn_material(Color::Black));
    }

    #[test]
    fn commit_turns_history_into_root() {
        let mut pos = Position::startpos();
        pos.push_move(quiet(Square::G1, Square::F3));
        pos.commit();
        assert_eq!(pos.depth_from_root(), 1);
        assert_eq!(pos.side_to_move(), Color::Black);
    }
}
