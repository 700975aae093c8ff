//! Network architecture: (704x16hm -> 1792)x2 -> (16x2 -> 32 -> 1)x8
//!
//! Pairwise clipped ReLU on the feature transformer, then dual clipped + squared clipped ReLU,
//! then clipped ReLU. Sizes and quantisation are compile-time constants; the choices that only
//! change which code path runs are carried by [`Arch`].

use crate::board::Board;
use crate::evaluation::network::NetworkError;
use crate::types::square::Square;
use crate::types::File;

/// King buckets for files a-d, rank 1 first. The other half of the board is mirrored onto it.
#[rustfmt::skip]
pub const HALF_BUCKETS: [usize; 32] = [
     0,  1,  2,  3,
     4,  5,  6,  7,
     8,  9, 10, 11,
     8,  9, 10, 11,
    12, 12, 13, 13,
    12, 12, 13, 13,
    14, 14, 15, 15,
    14, 14, 15, 15,
];
pub const INPUT_BUCKET_COUNT: usize = get_num_buckets(&HALF_BUCKETS);

/// Eleven piece planes of 64 squares: both kings share one plane.
pub const INPUT_SIZE: usize = 11 * 64;

pub const L1_SIZE: usize = 1792;
pub const L2_SIZE: usize = 16;
pub const L3_SIZE: usize = 32;

pub const OUTPUT_BUCKET_COUNT: usize = 8;

pub const FT_Q_BITS: u32 = 8;
pub const FT_Q: i16 = (1 << FT_Q_BITS) - 1;
pub const FT_SCALE_BITS: u32 = 7;
// Pairwise products of two [0, 255] values land in [0, 127] after this shift.
pub const FT_SHIFT: u32 = 2 * FT_Q_BITS - FT_SCALE_BITS;

pub const L1_Q_BITS: u32 = 7;

pub const Q_BITS: u32 = 6;
pub const Q: i64 = 1 << Q_BITS;
// ceil(log2(127 * 128 / 64)) = 8
pub const L1_SHIFT: u32 = FT_SCALE_BITS + L1_Q_BITS - Q_BITS;

pub const SCALE: i64 = 400;

/// Inputs of the L1 layer packed into each i32 lane of the sparse multiply.
pub const L1_CHUNK_SIZE: usize = std::mem::size_of::<i32>() / std::mem::size_of::<u8>();
pub const L1_CHUNKS: usize = L1_SIZE / L1_CHUNK_SIZE;

/// Widest input the L2 layer can see, reached with dual activation.
pub const L2_INPUT_MAX: usize = L2_SIZE * 2;

const _: () = assert!(L1_SIZE % 64 == 0, "L1 must split into whole sparse chunks");
const _: () = assert!(L1_SHIFT == 8);
// Worst case L1 sum: every input at 127 against an i8 weight of magnitude 128.
const _: () = assert!((L1_SIZE as i64) * 127 * 128 < i32::MAX as i64);

/// Activation applied to each feature transformer output before the pairwise product.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    ClippedReLU,
    SquaredClippedReLU,
}

/// Selects the final-stage weights of the network from the position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputBucketing {
    Single,
    MaterialCount(usize),
}

/// Which half of the board the perspective's king is kept on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KingMirroring {
    Abcd,
    Efgh,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arch {
    pub ft_activation: Activation,
    pub dual_activation: bool,
    pub output_bucketing: OutputBucketing,
    pub mirroring: KingMirroring,
}

pub const ARCH: Arch = Arch {
    ft_activation: Activation::ClippedReLU,
    dual_activation: true,
    output_bucketing: OutputBucketing::MaterialCount(OUTPUT_BUCKET_COUNT),
    mirroring: KingMirroring::Abcd,
};

impl Default for Arch {
    fn default() -> Self {
        ARCH
    }
}

impl Arch {
    pub fn validate(&self) -> Result<(), NetworkError> {
        if let OutputBucketing::MaterialCount(count) = self.output_bucketing {
            if count == 0 || count > OUTPUT_BUCKET_COUNT {
                return Err(NetworkError::InvalidArch(format!(
                    "material output buckets must be in 1..={OUTPUT_BUCKET_COUNT}, got {count}"
                )));
            }
        }
        Ok(())
    }

    #[inline(always)]
    pub const fn l2_input_size(&self) -> usize {
        if self.dual_activation {
            L2_SIZE * 2
        } else {
            L2_SIZE
        }
    }

    #[inline]
    pub fn output_bucket(&self, board: &Board) -> usize {
        let bucket = self.output_bucketing.bucket(board.occ().count() as usize);
        assert!(bucket < OUTPUT_BUCKET_COUNT, "output bucket {bucket} out of range");
        bucket
    }
}

impl OutputBucketing {
    /// Bucket for a board holding `pieces` pieces, kings included.
    #[inline(always)]
    pub const fn bucket(&self, pieces: usize) -> usize {
        match *self {
            OutputBucketing::Single => 0,
            OutputBucketing::MaterialCount(count) => {
                let divisor = 32usize.div_ceil(count);
                let pieces = if pieces < 2 { 2 } else if pieces > 32 { 32 } else { pieces };
                let bucket = (pieces - 2) / divisor;
                if bucket >= count { count - 1 } else { bucket }
            }
        }
    }
}

impl KingMirroring {
    /// Whether a king on this square puts the perspective into the mirrored orientation.
    #[inline(always)]
    pub fn should_mirror(&self, king_sq: Square) -> bool {
        match self {
            KingMirroring::Abcd => File::of(king_sq) > File::D,
            KingMirroring::Efgh => File::of(king_sq) < File::E,
        }
    }

    /// King bucket for a king square already made relative to its own side.
    #[inline(always)]
    pub fn bucket(&self, relative_king_sq: Square) -> usize {
        let sq = if self.should_mirror(relative_king_sq) {
            relative_king_sq.flip_file()
        } else {
            relative_king_sq
        };
        let file = match self {
            KingMirroring::Abcd => sq.0 as usize % 8,
            KingMirroring::Efgh => 7 - sq.0 as usize % 8,
        };
        let rank = sq.0 as usize / 8;
        HALF_BUCKETS[rank * 4 + file]
    }
}

pub const fn get_num_buckets<const N: usize>(arr: &[usize; N]) -> usize {
    let mut max = 0;
    let mut i = 0;

    while i < N {
        if arr[i] > max {
            max = arr[i];
        }
        i += 1;
    }
    max + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_count() {
        assert_eq!(INPUT_BUCKET_COUNT, 16);
        assert_eq!(L1_CHUNKS, 448);
    }

    #[test]
    fn test_material_buckets_cover_every_piece_count() {
        let bucketing = OutputBucketing::MaterialCount(OUTPUT_BUCKET_COUNT);
        assert_eq!(bucketing.bucket(2), 0);
        assert_eq!(bucketing.bucket(5), 0);
        assert_eq!(bucketing.bucket(6), 1);
        assert_eq!(bucketing.bucket(32), 7);
        for pieces in 0..=64 {
            assert!(bucketing.bucket(pieces) < OUTPUT_BUCKET_COUNT);
        }
    }

    #[test]
    fn test_single_bucket() {
        assert_eq!(OutputBucketing::Single.bucket(32), 0);
    }

    #[test]
    fn test_king_buckets_mirror() {
        let mirroring = KingMirroring::Abcd;
        // a1 and h1 share bucket 0, d1 and e1 share bucket 3
        assert_eq!(mirroring.bucket(Square(0)), 0);
        assert_eq!(mirroring.bucket(Square(7)), 0);
        assert_eq!(mirroring.bucket(Square(3)), 3);
        assert_eq!(mirroring.bucket(Square(4)), 3);
        assert_eq!(mirroring.bucket(Square(63)), 14);
        assert_eq!(mirroring.bucket(Square(59)), 15);
        assert!(mirroring.should_mirror(Square(4)));
        assert!(!mirroring.should_mirror(Square(3)));
    }

    #[test]
    fn test_efgh_mirroring_agrees_on_buckets() {
        for sq in Square::iter() {
            assert_eq!(KingMirroring::Efgh.bucket(sq), KingMirroring::Abcd.bucket(sq.flip_file()));
        }
    }

    #[test]
    fn test_validate() {
        assert!(ARCH.validate().is_ok());
        let arch = Arch { output_bucketing: OutputBucketing::MaterialCount(9), ..ARCH };
        assert!(arch.validate().is_err());
        let arch = Arch { output_bucketing: OutputBucketing::MaterialCount(0), ..ARCH };
        assert!(arch.validate().is_err());
    }
}
