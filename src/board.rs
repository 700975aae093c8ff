pub mod fen;

use crate::types::bitboard::Bitboard;
use crate::types::piece::Piece;
use crate::types::side::Side;
use crate::types::side::Side::{Black, White};
use crate::types::square::Square;

/// A snapshot of the position as seen by the evaluator: piece placement, side to move and the
/// counters that feed score adjustment. Legality is the move generator's concern; the board only
/// requires that each side has exactly one king.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Board {
    pub bb: [Bitboard; 8],         // bitboards for each piece type (0-5) and for both sides (6-7)
    pub pcs: [Option<Piece>; 64],  // piece type on each square
    pub stm: Side,                 // side to move
    pub castle: u8,                // castle rights, KQkq in the low four bits
    pub ep_sq: Option<Square>,     // en passant square
    pub hm: u8,                    // number of half moves since last capture or pawn move
    pub fm: u16,                   // number of full moves
}

impl Default for Board {
    fn default() -> Self {
        Board::empty()
    }
}

impl Board {
    pub fn empty() -> Board {
        Board {
            bb: [Bitboard::empty(); 8],
            pcs: [None; 64],
            stm: White,
            castle: 0,
            ep_sq: None,
            hm: 0,
            fm: 1,
        }
    }

    /// Adds the piece to the square if absent, removes it if present.
    #[inline]
    pub fn toggle_sq(&mut self, sq: Square, pc: Piece, side: Side) {
        let bb = Bitboard::of_sq(sq);
        self.bb[pc] ^= bb;
        self.bb[side.idx()] ^= bb;
        self.pcs[sq] = if self.pcs[sq] == Some(pc) { None } else { Some(pc) };
    }

    #[inline]
    pub fn piece_at(&self, sq: Square) -> Option<Piece> {
        self.pcs[sq]
    }

    #[inline]
    pub fn side_at(&self, sq: Square) -> Option<Side> {
        if self.bb[White.idx()].contains(sq) {
            Some(White)
        } else if self.bb[Black.idx()].contains(sq) {
            Some(Black)
        } else {
            None
        }
    }

    #[inline]
    pub fn pieces(&self, pc: Piece) -> Bitboard {
        self.bb[pc]
    }

    #[inline]
    pub fn side(&self, side: Side) -> Bitboard {
        self.bb[side.idx()]
    }

    #[inline]
    pub fn occ(&self) -> Bitboard {
        self.bb[White.idx()] | self.bb[Black.idx()]
    }

    #[inline]
    pub fn king_sq(&self, side: Side) -> Square {
        (self.bb[Piece::King] & self.side(side)).lsb()
    }

    /// Total material of both sides in pawn units (P=1, N=B=3, R=5, Q=9).
    pub fn material(&self) -> i32 {
        Piece::iter()
            .map(|pc| self.pieces(pc).count() as i32 * pc.material())
            .sum()
    }

    /// The same position with colours swapped: every piece changes side and is reflected across
    /// the horizontal axis, and the other side is to move.
    pub fn flip_sides(&self) -> Board {
        let mut board = Board::empty();
        for sq in self.occ() {
            if let (Some(pc), Some(side)) = (self.piece_at(sq), self.side_at(sq)) {
                board.toggle_sq(sq.flip_rank(), pc, !side);
            }
        }
        board.stm = !self.stm;
        board.castle = (self.castle >> 2) | ((self.castle & 0b0011) << 2);
        board.ep_sq = self.ep_sq.map(Square::flip_rank);
        board.hm = self.hm;
        board.fm = self.fm;
        board
    }

    /// The same position reflected across the vertical axis. Castle rights do not survive the
    /// reflection.
    pub fn flip_files(&self) -> Board {
        let mut board = Board::empty();
        for sq in self.occ() {
            if let (Some(pc), Some(side)) = (self.piece_at(sq), self.side_at(sq)) {
                board.toggle_sq(sq.flip_file(), pc, side);
            }
        }
        board.stm = self.stm;
        board.ep_sq = self.ep_sq.map(Square::flip_file);
        board.hm = self.hm;
        board.fm = self.fm;
        board
    }
}
