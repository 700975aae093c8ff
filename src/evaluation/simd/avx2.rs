use std::arch::x86_64::*;

use crate::evaluation::simd::CHUNK_BYTES;

/// # Safety
///
/// The CPU must support AVX2.
#[target_feature(enable = "avx2")]
pub unsafe fn nonzero_mask(chunk: &[u8; CHUNK_BYTES]) -> u32 {
    let v = _mm256_loadu_si256(chunk.as_ptr().cast());
    let zero = _mm256_cmpeq_epi32(v, _mm256_setzero_si256());
    let mask = _mm256_movemask_ps(_mm256_castsi256_ps(zero)) as u32;
    !mask & 0xFF
}
