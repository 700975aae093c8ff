use arrayvec::ArrayVec;

use crate::evaluation::feature::Feature;
use crate::types::piece::Piece;
use crate::types::side::Side;
use crate::types::square::Square;

/// The pieces that appeared and disappeared in one position change. A chess move touches at most
/// two of each: castling moves two pieces, and a capture or promotion removes two and adds one.
#[derive(Default, Clone, Debug, PartialEq, Eq)]
pub struct AccumulatorUpdate {
    pub adds: ArrayVec<Feature, 2>,
    pub subs: ArrayVec<Feature, 2>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccumulatorUpdateType {
    None,
    Add,
    Sub,
    AddSub,
    AddSubSub,
    AddAddSubSub,
    Other,
}

impl AccumulatorUpdate {
    pub fn push_add(&mut self, feature: Feature) {
        self.adds.push(feature);
    }

    pub fn push_sub(&mut self, feature: Feature) {
        self.subs.push(feature);
    }

    /// A piece moving from one square to another, possibly changing type on the way.
    pub fn moved(pc: Piece, from: Square, new_pc: Piece, to: Square, side: Side) -> Self {
        let mut update = AccumulatorUpdate::default();
        update.push_add(Feature::new(new_pc, to, side));
        update.push_sub(Feature::new(pc, from, side));
        update
    }

    /// A move that also removes an enemy piece, which need not stand on the destination square.
    pub fn captured(
        pc: Piece,
        from: Square,
        new_pc: Piece,
        to: Square,
        side: Side,
        captured: Piece,
        capture_sq: Square,
    ) -> Self {
        let mut update = AccumulatorUpdate::moved(pc, from, new_pc, to, side);
        update.push_sub(Feature::new(captured, capture_sq, !side));
        update
    }

    /// King and rook relocating together.
    pub fn castled(king_from: Square, king_to: Square, rook_from: Square, rook_to: Square, side: Side) -> Self {
        let mut update = AccumulatorUpdate::default();
        update.push_add(Feature::new(Piece::King, king_to, side));
        update.push_add(Feature::new(Piece::Rook, rook_to, side));
        update.push_sub(Feature::new(Piece::King, king_from, side));
        update.push_sub(Feature::new(Piece::Rook, rook_from, side));
        update
    }

    pub fn update_type(&self) -> AccumulatorUpdateType {
        match (self.adds.len(), self.subs.len()) {
            (0, 0) => AccumulatorUpdateType::None,
            (1, 0) => AccumulatorUpdateType::Add,
            (0, 1) => AccumulatorUpdateType::Sub,
            (1, 1) => AccumulatorUpdateType::AddSub,
            (1, 2) => AccumulatorUpdateType::AddSubSub,
            (2, 2) => AccumulatorUpdateType::AddAddSubSub,
            _ => AccumulatorUpdateType::Other,
        }
    }
}
