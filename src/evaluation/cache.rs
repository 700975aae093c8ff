use crate::evaluation::arch::{INPUT_BUCKET_COUNT, L1_SIZE};
use crate::evaluation::feature::KingState;
use crate::evaluation::network::Network;
use crate::types::bitboard::Bitboard;
use crate::types::side::Side;

/// Whenever the king changes bucket or crosses the mirroring axis, a costly full refresh of the
/// accumulator is required. This cache speeds those refreshes up using the technique known as
/// 'Finny tables'.
///
/// We keep the last accumulator and board state seen for each perspective, mirror state and
/// bucket. When refreshing, instead of starting from an empty board, we start from that cached
/// state and only apply the diff between it and the current board.
#[derive(Clone)]
pub struct InputBucketCache {
    entries: Box<[CacheEntry]>,
}

#[derive(Clone)]
#[repr(C, align(64))]
pub struct CacheEntry {
    pub features: [i16; L1_SIZE],
    pub bitboards: [Bitboard; 8],
}

impl InputBucketCache {
    /// Every entry starts as the empty board: bias values and no pieces.
    pub fn new(network: &Network) -> Self {
        let entry = CacheEntry {
            features: *network.ft_biases(),
            bitboards: [Bitboard::empty(); 8],
        };
        InputBucketCache {
            entries: vec![entry; Side::COUNT * 2 * INPUT_BUCKET_COUNT].into_boxed_slice(),
        }
    }

    #[inline]
    pub fn get(&mut self, perspective: Side, king: KingState) -> &mut CacheEntry {
        let idx = (perspective as usize * 2 + king.mirror as usize) * INPUT_BUCKET_COUNT + king.bucket;
        &mut self.entries[idx]
    }
}
