//! Forward pass of the layers after the feature transformer.
//!
//! Each layer works in its own fixed-point space:
//!
//! - feature transformer outputs: `[0, 255]`, paired down to `[0, 127]` (scale 2^7)
//! - L1 products: scale 2^7 * 2^7, shifted down to `Q`
//! - L1 activations: `Q^2`
//! - L2 outputs: `Q^3`
//! - L3 output: `Q^4`

use crate::evaluation::arch::{
    Activation, Arch, FT_Q, FT_Q_BITS, FT_SHIFT, L1_CHUNK_SIZE, L1_SHIFT, L1_SIZE, L2_INPUT_MAX,
    L2_SIZE, L3_SIZE, Q, SCALE,
};
use crate::evaluation::network::Network;
use crate::evaluation::simd::Backend;
use crate::evaluation::sparse::SparseContext;

/// Runs the whole network on a pair of accumulators, side to move first, and returns the
/// evaluation in centipawn-like units.
pub fn forward(
    network: &Network,
    backend: Backend,
    us: &[i16; L1_SIZE],
    them: &[i16; L1_SIZE],
    output_bucket: usize,
) -> i32 {
    let arch = network.arch();
    let ft_outputs = activate_ft(arch, us, them);
    let sparse = SparseContext::gather(backend, &ft_outputs);
    let l1_outputs = propagate_l1(network, &ft_outputs, &sparse, output_bucket);
    let l2_outputs = propagate_l2(network, &l1_outputs, output_bucket);
    let l3_output = propagate_l3(network, &l2_outputs, output_bucket);
    dequantize(l3_output)
}

/// Feature transformer activation. Lane `i` of each perspective is multiplied with lane
/// `i + L1_SIZE / 2` of the same perspective, taking `[0, 255]` inputs into `[0, 127]`.
pub fn activate_ft(arch: &Arch, us: &[i16; L1_SIZE], them: &[i16; L1_SIZE]) -> [u8; L1_SIZE] {
    let mut output = [0; L1_SIZE];

    for (side, feats) in [us, them].into_iter().enumerate() {
        let base = side * (L1_SIZE / 2);
        let (left, right) = feats.split_at(L1_SIZE / 2);
        for (i, (&l, &r)) in left.iter().zip(right).enumerate() {
            let l = activate_ft_lane(arch.ft_activation, l);
            let r = activate_ft_lane(arch.ft_activation, r);
            output[base + i] = ((l * r) >> FT_SHIFT) as u8;
        }
    }
    output
}

#[inline(always)]
fn activate_ft_lane(activation: Activation, v: i16) -> i32 {
    let clipped = v.clamp(0, FT_Q) as i32;
    match activation {
        Activation::ClippedReLU => clipped,
        // squared, then brought back into [0, 255]
        Activation::SquaredClippedReLU => (clipped * clipped) >> FT_Q_BITS,
    }
}

/// L1 propagation over the non-zero lanes only, followed by the dual activation. With dual
/// activation the first `L2_SIZE` outputs are the clipped values scaled up by `Q` and the rest
/// their squares; without it only the squares are produced.
pub fn propagate_l1(
    network: &Network,
    input: &[u8; L1_SIZE],
    sparse: &SparseContext,
    output_bucket: usize,
) -> [i32; L2_INPUT_MAX] {
    let weights = network.l1_weights(output_bucket);

    let mut sums = [0i32; L2_SIZE];
    for &chunk in sparse.chunks() {
        let chunk = chunk as usize;
        let inputs = &input[chunk * L1_CHUNK_SIZE..(chunk + 1) * L1_CHUNK_SIZE];
        let block = &weights[chunk * L2_SIZE * L1_CHUNK_SIZE..(chunk + 1) * L2_SIZE * L1_CHUNK_SIZE];
        for (sum, w) in sums.iter_mut().zip(block.chunks_exact(L1_CHUNK_SIZE)) {
            for k in 0..L1_CHUNK_SIZE {
                *sum += inputs[k] as i32 * w[k] as i32;
            }
        }
    }

    activate_l1(network.arch(), &sums, network.l1_biases(output_bucket))
}

/// Requantises the L1 sums into `Q` space, adds the biases and applies the activation.
pub fn activate_l1(arch: &Arch, sums: &[i32; L2_SIZE], biases: &[i32; L2_SIZE]) -> [i32; L2_INPUT_MAX] {
    let q = Q as i32;
    let mut output = [0; L2_INPUT_MAX];
    for i in 0..L2_SIZE {
        // arithmetic shift, rounds towards negative infinity
        let out = (sums[i] >> L1_SHIFT).saturating_add(biases[i]);
        let clipped = out.clamp(0, q);
        if arch.dual_activation {
            output[i] = clipped * q;
            output[i + L2_SIZE] = clipped * clipped;
        } else {
            output[i] = clipped * clipped;
        }
    }
    output
}

/// L2 propagation, clipped to `[0, Q^3]`.
pub fn propagate_l2(network: &Network, input: &[i32; L2_INPUT_MAX], output_bucket: usize) -> [i32; L3_SIZE] {
    let weights = network.l2_weights(output_bucket);
    let biases = network.l2_biases(output_bucket);
    let inputs = network.arch().l2_input_size();

    let mut out = (*biases).map(i64::from);
    for (input_idx, &input) in input.iter().enumerate().take(inputs) {
        let row = &weights[input_idx * L3_SIZE..(input_idx + 1) * L3_SIZE];
        for (o, &weight) in out.iter_mut().zip(row) {
            *o += input as i64 * weight as i64;
        }
    }
    out.map(|o| o.clamp(0, Q * Q * Q) as i32)
}

/// L3 propagation, in `Q^4` space.
pub fn propagate_l3(network: &Network, input: &[i32; L3_SIZE], output_bucket: usize) -> i64 {
    let weights = network.l3_weights(output_bucket);
    let bias = network.l3_bias(output_bucket) as i64;

    input
        .iter()
        .zip(weights.iter())
        .fold(bias, |acc, (&i, &w)| acc + i as i64 * w as i64)
}

/// Brings the `Q^4` output back to evaluation units. Both divisions truncate towards zero.
pub fn dequantize(output: i64) -> i32 {
    let scaled = (output / Q).saturating_mul(SCALE) / (Q * Q * Q);
    scaled.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}
