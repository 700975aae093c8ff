use crate::board::Board;
use crate::evaluation::arch::L1_SIZE;
use crate::evaluation::feature::{active_features, KingState};
use crate::evaluation::network::{FeatureWeights, Network};
use crate::types::side::Side;
use crate::types::side::Side::{Black, White};

/// Output of the feature transformer for both perspectives: the biases plus the weight rows of
/// every active feature. All arithmetic wraps, so the order in which rows are added and removed
/// never changes the result.
#[derive(Clone, Copy)]
#[repr(C, align(64))]
pub struct Accumulator {
    pub white_features: [i16; L1_SIZE],
    pub black_features: [i16; L1_SIZE],
    pub kings: [KingState; 2],
}

impl Accumulator {
    pub fn new(network: &Network) -> Self {
        Accumulator {
            white_features: *network.ft_biases(),
            black_features: *network.ft_biases(),
            kings: [KingState::default(); 2],
        }
    }

    #[inline(always)]
    pub fn features(&self, perspective: Side) -> &[i16; L1_SIZE] {
        match perspective {
            White => &self.white_features,
            Black => &self.black_features,
        }
    }

    #[inline(always)]
    pub fn features_mut(&mut self, perspective: Side) -> &mut [i16; L1_SIZE] {
        match perspective {
            White => &mut self.white_features,
            Black => &mut self.black_features,
        }
    }

    #[inline]
    pub fn reset(&mut self, perspective: Side, network: &Network) {
        *self.features_mut(perspective) = *network.ft_biases();
    }

    #[inline]
    pub fn copy_from(&mut self, perspective: Side, features: &[i16; L1_SIZE]) {
        *self.features_mut(perspective) = *features;
    }

    /// Recomputes one perspective from the biases and the board's active features.
    pub fn refresh(&mut self, board: &Board, perspective: Side, network: &Network) {
        let arch = network.arch();
        self.kings[perspective] = KingState::of(board, perspective, arch.mirroring);
        self.reset(perspective, network);
        for index in active_features(board, perspective, arch) {
            self.add(perspective, network.ft_row(index));
        }
    }

    #[inline]
    pub fn add(&mut self, perspective: Side, add: &FeatureWeights) {
        let feats = self.features_mut(perspective);
        for (f, &a) in feats.iter_mut().zip(add.iter()) {
            *f = f.wrapping_add(a);
        }
    }

    #[inline]
    pub fn sub(&mut self, perspective: Side, sub: &FeatureWeights) {
        let feats = self.features_mut(perspective);
        for (f, &s) in feats.iter_mut().zip(sub.iter()) {
            *f = f.wrapping_sub(s);
        }
    }

    #[inline]
    pub fn add_sub(&mut self, perspective: Side, add: &FeatureWeights, sub: &FeatureWeights) {
        let feats = self.features_mut(perspective);
        for i in 0..L1_SIZE {
            feats[i] = feats[i].wrapping_add(add[i]).wrapping_sub(sub[i]);
        }
    }

    #[inline]
    pub fn add_sub_sub(
        &mut self,
        perspective: Side,
        add: &FeatureWeights,
        sub1: &FeatureWeights,
        sub2: &FeatureWeights,
    ) {
        let feats = self.features_mut(perspective);
        for i in 0..L1_SIZE {
            feats[i] = feats[i]
                .wrapping_add(add[i])
                .wrapping_sub(sub1[i])
                .wrapping_sub(sub2[i]);
        }
    }

    #[inline]
    pub fn add_add_sub_sub(
        &mut self,
        perspective: Side,
        add1: &FeatureWeights,
        add2: &FeatureWeights,
        sub1: &FeatureWeights,
        sub2: &FeatureWeights,
    ) {
        let feats = self.features_mut(perspective);
        for i in 0..L1_SIZE {
            feats[i] = feats[i]
                .wrapping_add(add1[i])
                .wrapping_add(add2[i])
                .wrapping_sub(sub1[i])
                .wrapping_sub(sub2[i]);
        }
    }

    #[inline]
    pub fn add_add_add_add(
        &mut self,
        perspective: Side,
        add1: &FeatureWeights,
        add2: &FeatureWeights,
        add3: &FeatureWeights,
        add4: &FeatureWeights,
    ) {
        let feats = self.features_mut(perspective);
        for i in 0..L1_SIZE {
            feats[i] = feats[i]
                .wrapping_add(add1[i])
                .wrapping_add(add2[i])
                .wrapping_add(add3[i])
                .wrapping_add(add4[i]);
        }
    }

    #[inline]
    pub fn sub_sub_sub_sub(
        &mut self,
        perspective: Side,
        sub1: &FeatureWeights,
        sub2: &FeatureWeights,
        sub3: &FeatureWeights,
        sub4: &FeatureWeights,
    ) {
        let feats = self.features_mut(perspective);
        for i in 0..L1_SIZE {
            feats[i] = feats[i]
                .wrapping_sub(sub1[i])
                .wrapping_sub(sub2[i])
                .wrapping_sub(sub3[i])
                .wrapping_sub(sub4[i]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::fen::STARTPOS;
    use crate::evaluation::network::test_network;

    #[test]
    fn test_new_starts_from_biases() {
        let network = test_network();
        let acc = Accumulator::new(&network);
        assert_eq!(&acc.white_features, network.ft_biases());
        assert_eq!(&acc.black_features, network.ft_biases());
    }

    #[test]
    fn test_fused_ops_match_single_ops() {
        let network = test_network();
        let board = Board::from_fen(STARTPOS).unwrap();
        let mut base = Accumulator::new(&network);
        base.refresh(&board, White, &network);

        let rows = [10, 700, 5000, 11263].map(|i| network.ft_row(i));

        let mut fused = base;
        fused.add_add_sub_sub(White, rows[0], rows[1], rows[2], rows[3]);
        let mut single = base;
        single.add(White, rows[0]);
        single.add(White, rows[1]);
        single.sub(White, rows[2]);
        single.sub(White, rows[3]);
        assert_eq!(fused.white_features, single.white_features);

        let mut fused = base;
        fused.add_sub_sub(White, rows[0], rows[1], rows[2]);
        let mut single = base;
        single.add_sub(White, rows[0], rows[1]);
        single.sub(White, rows[2]);
        assert_eq!(fused.white_features, single.white_features);

        let mut round_trip = base;
        round_trip.add_add_add_add(White, rows[0], rows[1], rows[2], rows[3]);
        round_trip.sub_sub_sub_sub(White, rows[3], rows[2], rows[1], rows[0]);
        assert_eq!(round_trip.white_features, base.white_features);
        assert_eq!(round_trip.black_features, base.black_features);
    }

    #[test]
    fn test_wrapping_arithmetic() {
        let mut network = crate::evaluation::network::Network::zeroed(Default::default()).unwrap();
        network.ft_biases[0] = i16::MAX;
        network.ft_weights[1][0] = 1;
        let mut acc = Accumulator::new(&network);
        acc.add(White, network.ft_row(1));
        assert_eq!(acc.white_features[0], i16::MIN);
        acc.sub(White, network.ft_row(1));
        assert_eq!(acc.white_features[0], i16::MAX);
    }

    #[test]
    fn test_refresh_only_touches_one_perspective() {
        let network = test_network();
        let board = Board::from_fen(STARTPOS).unwrap();
        let mut acc = Accumulator::new(&network);
        acc.refresh(&board, Black, &network);
        assert_eq!(&acc.white_features, network.ft_biases());
        assert_ne!(&acc.black_features, network.ft_biases());
        assert_eq!(acc.kings[Black], KingState::of(&board, Black, network.arch().mirroring));
    }
}
