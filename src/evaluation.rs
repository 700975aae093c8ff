pub mod accumulator;
pub mod arch;
pub mod cache;
pub mod feature;
pub mod forward;
pub mod network;
pub mod simd;
pub mod sparse;
pub mod update;

use std::sync::Arc;

use arrayvec::ArrayVec;

use crate::board::Board;
use crate::evaluation::accumulator::Accumulator;
use crate::evaluation::cache::InputBucketCache;
use crate::evaluation::feature::{Feature, KingState};
use crate::evaluation::network::{FeatureWeights, Network};
use crate::evaluation::simd::Backend;
use crate::evaluation::update::{AccumulatorUpdate, AccumulatorUpdateType};
use crate::score::{Score, MAX_PLY};
use crate::types::piece::Piece;
use crate::types::side::Side;
use crate::types::side::Side::{Black, White};
use crate::utils::boxed_and_zeroed;

pub const MAX_ACCUMULATORS: usize = MAX_PLY + 8;

/// Evaluator state owned by one search thread: a stack of accumulators that follows the position
/// move by move, and the refresh cache. The network itself is shared.
pub struct NNUE {
    pub stack: Box<[Accumulator; MAX_ACCUMULATORS]>,
    pub cache: InputBucketCache,
    pub current: usize,
    network: Arc<Network>,
    backend: Backend,
}

impl NNUE {
    pub fn new(network: Arc<Network>) -> Self {
        NNUE::with_backend(network, Backend::detect())
    }

    pub fn with_backend(network: Arc<Network>, backend: Backend) -> Self {
        log::debug!("nnue evaluator using {} backend, {:?}", backend.name(), network.arch());
        // Safety: an accumulator is plain integers and booleans, all valid when zeroed.
        let mut stack: Box<[Accumulator; MAX_ACCUMULATORS]> = unsafe { boxed_and_zeroed() };
        let empty = Accumulator::new(&network);
        for acc in stack.iter_mut() {
            *acc = empty;
        }
        NNUE {
            stack,
            cache: InputBucketCache::new(&network),
            current: 0,
            network,
            backend,
        }
    }

    #[inline]
    pub fn network(&self) -> &Network {
        &self.network
    }

    /// Evaluates the current position from the side to move's point of view. The side to move's
    /// accumulator goes first into the network, then the opponent's. The raw network output is
    /// damped as the half-move clock runs down and kept strictly inside the range of proven wins.
    pub fn evaluate(&self, board: &Board) -> i32 {
        let acc = &self.stack[self.current];
        let (us, them) = match board.stm {
            White => (&acc.white_features, &acc.black_features),
            Black => (&acc.black_features, &acc.white_features),
        };

        let output_bucket = self.network.arch().output_bucket(board);
        let output = forward::forward(&self.network, self.backend, us, them, output_bucket);
        adjust_eval(board, output)
    }

    /// Activate the entire board from scratch. Resets the stack and the refresh cache, then builds
    /// both perspectives. Should be called only when the position is set up, and then updated
    /// efficiently with each change.
    pub fn activate(&mut self, board: &Board) {
        self.current = 0;
        self.stack[self.current] = Accumulator::new(&self.network);
        self.cache = InputBucketCache::new(&self.network);

        let mirroring = self.network.arch().mirroring;
        for perspective in [White, Black] {
            let king = KingState::of(board, perspective, mirroring);
            self.full_refresh(board, self.current, perspective, king);
        }
    }

    /// Refresh the accumulator for the given perspective and king state. Starts from the cached
    /// state for this perspective, mirror and bucket, and applies only the features of the board
    /// that have changed since that entry was last used.
    fn full_refresh(&mut self, board: &Board, idx: usize, perspective: Side, king: KingState) {
        let network = &self.network;
        let acc = &mut self.stack[idx];
        acc.kings[perspective] = king;
        let cache_entry = self.cache.get(perspective, king);
        acc.copy_from(perspective, &cache_entry.features);

        let mut adds = ArrayVec::<&FeatureWeights, 32>::new();
        let mut subs = ArrayVec::<&FeatureWeights, 32>::new();

        for side in [White, Black] {
            for pc in Piece::iter() {
                let pieces = board.pieces(pc) & board.side(side);
                let cached_pieces = cache_entry.bitboards[pc] & cache_entry.bitboards[side.idx()];

                for add in pieces & !cached_pieces {
                    adds.push(network.ft_row(Feature::new(pc, add, side).index(perspective, king)));
                }
                for sub in cached_pieces & !pieces {
                    subs.push(network.ft_row(Feature::new(pc, sub, side).index(perspective, king)));
                }
            }
        }

        for chunk in adds.chunks_exact(4) {
            acc.add_add_add_add(perspective, chunk[0], chunk[1], chunk[2], chunk[3]);
        }
        for &add in adds.chunks_exact(4).remainder() {
            acc.add(perspective, add);
        }

        for chunk in subs.chunks_exact(4) {
            acc.sub_sub_sub_sub(perspective, chunk[0], chunk[1], chunk[2], chunk[3]);
        }
        for &sub in subs.chunks_exact(4).remainder() {
            acc.sub(perspective, sub);
        }

        cache_entry.bitboards = board.bb;
        cache_entry.features = *acc.features(perspective);
    }

    /// Pushes a new accumulator for a change to the position. `board` is the position after the
    /// change. A perspective whose king changed bucket or mirror state is refreshed; the other is
    /// updated incrementally from the previous accumulator.
    pub fn update(&mut self, update: &AccumulatorUpdate, board: &Board) {
        self.current += 1;
        self.stack[self.current] = self.stack[self.current - 1];

        let mirroring = self.network.arch().mirroring;
        for perspective in [White, Black] {
            let king = KingState::of(board, perspective, mirroring);
            if king != self.stack[self.current].kings[perspective] {
                self.full_refresh(board, self.current, perspective, king);
            } else {
                self.apply_update(update, perspective, king);
            }
        }
    }

    fn apply_update(&mut self, update: &AccumulatorUpdate, perspective: Side, king: KingState) {
        let network = &self.network;
        let acc = &mut self.stack[self.current];
        let row = |feature: Feature| network.ft_row(feature.index(perspective, king));
        let (adds, subs) = (&update.adds, &update.subs);

        match update.update_type() {
            AccumulatorUpdateType::None => {}
            AccumulatorUpdateType::Add => acc.add(perspective, row(adds[0])),
            AccumulatorUpdateType::Sub => acc.sub(perspective, row(subs[0])),
            AccumulatorUpdateType::AddSub => {
                acc.add_sub(perspective, row(adds[0]), row(subs[0]))
            }
            AccumulatorUpdateType::AddSubSub => {
                acc.add_sub_sub(perspective, row(adds[0]), row(subs[0]), row(subs[1]))
            }
            AccumulatorUpdateType::AddAddSubSub => acc.add_add_sub_sub(
                perspective,
                row(adds[0]),
                row(adds[1]),
                row(subs[0]),
                row(subs[1]),
            ),
            AccumulatorUpdateType::Other => {
                adds.iter().for_each(|&add| acc.add(perspective, row(add)));
                subs.iter().for_each(|&sub| acc.sub(perspective, row(sub)));
            }
        }
    }

    /// Undo the last change by decrementing the current accumulator index.
    pub fn undo(&mut self) {
        self.current = self.current.saturating_sub(1);
    }
}

/// Scales the evaluation down towards zero as the fifty-move rule approaches, and keeps it out of
/// the range reserved for proven results.
pub fn adjust_eval(board: &Board, eval: i32) -> i32 {
    let hm = (board.hm as i64).min(200);
    let bound = (Score::WIN - 1) as i64;
    (eval as i64 * (200 - hm) / 200).clamp(-bound, bound) as i32
}
