//! Lists the non-zero 4-byte lanes of the feature transformer output so that the L1 multiply can
//! skip the lanes that are all zero. After the pairwise activation most lanes are.

use crate::evaluation::arch::{L1_CHUNKS, L1_SIZE};
use crate::evaluation::simd::{Backend, CHUNK_BYTES, CHUNK_LANES};

/// Mask bits consumed per table lookup.
const BYTE_BITS: usize = 8;
const BYTES_PER_UPDATE: usize = 2 * CHUNK_LANES / BYTE_BITS;

/// For every byte value, the positions of its set bits in ascending order, zero padded.
static NON_ZERO_INDICES: [[u16; 8]; 256] = non_zero_indices();

const fn non_zero_indices() -> [[u16; 8]; 256] {
    let mut table = [[0u16; 8]; 256];
    let mut byte = 0;
    while byte < 256 {
        let mut count = 0;
        let mut bits = byte;
        while bits != 0 {
            table[byte][count] = bits.trailing_zeros() as u16;
            count += 1;
            bits &= bits - 1;
        }
        byte += 1;
    }
    table
}

/// Scratch space for one forward pass, kept on the stack.
pub struct SparseContext {
    indices: [u16; L1_CHUNKS],
    count: usize,
    base: u16,
}

impl Default for SparseContext {
    fn default() -> Self {
        SparseContext::new()
    }
}

impl SparseContext {
    pub const fn new() -> Self {
        SparseContext {
            indices: [0; L1_CHUNKS],
            count: 0,
            base: 0,
        }
    }

    /// Scans every lane of the activations, front to back.
    pub fn gather(backend: Backend, input: &[u8; L1_SIZE]) -> Self {
        let mut ctx = SparseContext::new();
        for pair in input.chunks_exact(2 * CHUNK_BYTES) {
            if let (Some(a), Some(b)) = (pair.first_chunk(), pair.last_chunk()) {
                ctx.update(backend, a, b);
            }
        }
        ctx
    }

    /// Appends the non-zero lanes of two consecutive chunks, `a` first.
    #[inline]
    pub fn update(&mut self, backend: Backend, a: &[u8; CHUNK_BYTES], b: &[u8; CHUNK_BYTES]) {
        let mask = (backend.nonzero_mask(b) << CHUNK_LANES) | backend.nonzero_mask(a);

        for output in 0..BYTES_PER_UPDATE {
            let byte = (mask >> (output * BYTE_BITS)) & 0xFF;
            let nonzero = &NON_ZERO_INDICES[byte as usize];

            let mut indices = [0u16; 8];
            for (idx, &lane) in indices.iter_mut().zip(nonzero) {
                *idx = self.base + lane;
            }
            // count never passes base, so the full store stays inside the buffer
            self.indices[self.count..self.count + 8].copy_from_slice(&indices);

            self.base += BYTE_BITS as u16;
            self.count += byte.count_ones() as usize;
        }

        debug_assert!(self.count <= self.indices.len());
    }

    #[inline(always)]
    pub fn count(&self) -> usize {
        self.count
    }

    #[inline(always)]
    pub fn chunk(&self, idx: usize) -> usize {
        self.indices[idx] as usize
    }

    #[inline(always)]
    pub fn chunks(&self) -> &[u16] {
        &self.indices[..self.count]
    }
}
