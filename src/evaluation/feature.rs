use arrayvec::ArrayVec;

use crate::board::Board;
use crate::evaluation::arch::{Arch, KingMirroring, INPUT_SIZE};
use crate::types::piece::Piece;
use crate::types::side::Side;
use crate::types::side::Side::White;
use crate::types::square::Square;

const PIECE_OFFSET: usize = 64;
const SIDE_OFFSET: usize = 64 * 6;

/// A single input of the network: a piece of a given colour on a square. From each perspective the
/// feature is either active (the piece is there) or not, and maps to one row of the feature
/// transformer weights.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Feature {
    pc: Piece,
    sq: Square,
    side: Side,
}

/// How one perspective sees the board: whether squares are reflected across the d/e axis, and which
/// king bucket selects the weights. Both depend only on that perspective's own king square.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct KingState {
    pub mirror: bool,
    pub bucket: usize,
}

impl KingState {
    #[inline]
    pub fn new(king_sq: Square, perspective: Side, mirroring: KingMirroring) -> KingState {
        let relative_sq = if perspective == White { king_sq } else { king_sq.flip_rank() };
        KingState {
            mirror: mirroring.should_mirror(relative_sq),
            bucket: mirroring.bucket(relative_sq),
        }
    }

    #[inline]
    pub fn of(board: &Board, perspective: Side, mirroring: KingMirroring) -> KingState {
        KingState::new(board.king_sq(perspective), perspective, mirroring)
    }
}

impl Feature {
    pub fn new(pc: Piece, sq: Square, side: Side) -> Self {
        Feature { pc, sq, side }
    }

    /// Row of the feature transformer for this feature, seen from `perspective`. Both kings share
    /// the perspective's own plane.
    #[inline]
    pub fn index(&self, perspective: Side, king: KingState) -> usize {
        let sq_index = self.square_index(perspective, king.mirror);
        let pc_offset = self.pc as usize * PIECE_OFFSET;
        let side_offset = if self.side == perspective || self.pc == Piece::King {
            0
        } else {
            SIDE_OFFSET
        };
        king.bucket * INPUT_SIZE + side_offset + pc_offset + sq_index
    }

    #[inline]
    fn square_index(&self, perspective: Side, mirror: bool) -> usize {
        let mut sq_index = self.sq;
        if perspective != White {
            sq_index = sq_index.flip_rank();
        }
        if mirror {
            sq_index = sq_index.flip_file();
        }
        sq_index.0 as usize
    }
}

/// Every active feature index of the board from one perspective, in square order.
pub fn active_features(board: &Board, perspective: Side, arch: &Arch) -> ArrayVec<usize, 32> {
    let king = KingState::of(board, perspective, arch.mirroring);
    board
        .occ()
        .filter_map(|sq| {
            let pc = board.piece_at(sq)?;
            let side = board.side_at(sq)?;
            Some(Feature::new(pc, sq, side).index(perspective, king))
        })
        .collect()
}
