//! The quantised weight set and its binary format.
//!
//! A weight file is a fixed header followed by the tensors in little-endian order:
//!
//! ```text
//! magic "NNEV" | version u32 | input size | input buckets | L1 | L2 | L3 | output buckets
//!              | ft q bits | l1 q bits | dual activation (all u32)
//! ft weights  i16 [input buckets * input size][L1]
//! ft biases   i16 [L1]
//! l1 weights  i8  [output buckets][L1 / 4][L2][4]
//! l1 biases   i32 [output buckets][L2]
//! l2 weights  i32 [output buckets][L2 inputs][L3]
//! l2 biases   i32 [output buckets][L3]
//! l3 weights  i32 [output buckets][L3]
//! l3 biases   i32 [output buckets]
//! ```

use std::path::Path;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::evaluation::arch::{
    Arch, FT_Q, FT_Q_BITS, INPUT_BUCKET_COUNT, INPUT_SIZE, L1_Q_BITS, L1_SIZE, L2_INPUT_MAX,
    L2_SIZE, L3_SIZE, OUTPUT_BUCKET_COUNT, Q,
};

pub const MAGIC: [u8; 4] = *b"NNEV";
pub const VERSION: u32 = 1;

pub const FT_ROWS: usize = INPUT_BUCKET_COUNT * INPUT_SIZE;

pub type FeatureWeights = [i16; L1_SIZE];
pub type L1Weights = [i8; L1_SIZE * L2_SIZE];
pub type L2Weights = [i32; L2_INPUT_MAX * L3_SIZE];

#[derive(thiserror::Error, Debug)]
pub enum NetworkError {
    #[error("failed to read network file")]
    Io(#[from] std::io::Error),

    #[error("bad magic {0:?}, not a network file")]
    BadMagic([u8; 4]),

    #[error("unsupported network version {0}, expected {VERSION}")]
    UnsupportedVersion(u32),

    #[error("network {field} is {found}, expected {expected}")]
    ShapeMismatch {
        field: &'static str,
        expected: u32,
        found: u32,
    },

    #[error("network dual activation flag is {found}, architecture expects {expected}")]
    ArchMismatch { expected: bool, found: u32 },

    #[error("network file truncated: needed {needed} more bytes, {remaining} left")]
    Truncated { needed: usize, remaining: usize },

    #[error("{0} unexpected bytes after the last tensor")]
    TrailingBytes(usize),

    #[error("invalid architecture: {0}")]
    InvalidArch(String),
}

/// Quantised weights, immutable once loaded and shared between evaluators.
pub struct Network {
    arch: Arch,
    pub(crate) ft_weights: Box<[FeatureWeights]>,
    pub(crate) ft_biases: Box<FeatureWeights>,
    pub(crate) l1_weights: Box<[L1Weights]>,
    pub(crate) l1_biases: Box<[[i32; L2_SIZE]]>,
    pub(crate) l2_weights: Box<[L2Weights]>,
    pub(crate) l2_biases: Box<[[i32; L3_SIZE]]>,
    pub(crate) l3_weights: Box<[[i32; L3_SIZE]]>,
    pub(crate) l3_biases: Box<[i32]>,
}

impl Network {
    /// A network with every weight and bias set to zero.
    pub fn zeroed(arch: Arch) -> Result<Network, NetworkError> {
        arch.validate()?;
        Ok(Network {
            arch,
            ft_weights: vec![[0; L1_SIZE]; FT_ROWS].into_boxed_slice(),
            ft_biases: Box::new([0; L1_SIZE]),
            l1_weights: vec![[0; L1_SIZE * L2_SIZE]; OUTPUT_BUCKET_COUNT].into_boxed_slice(),
            l1_biases: vec![[0; L2_SIZE]; OUTPUT_BUCKET_COUNT].into_boxed_slice(),
            l2_weights: vec![[0; L2_INPUT_MAX * L3_SIZE]; OUTPUT_BUCKET_COUNT].into_boxed_slice(),
            l2_biases: vec![[0; L3_SIZE]; OUTPUT_BUCKET_COUNT].into_boxed_slice(),
            l3_weights: vec![[0; L3_SIZE]; OUTPUT_BUCKET_COUNT].into_boxed_slice(),
            l3_biases: vec![0; OUTPUT_BUCKET_COUNT].into_boxed_slice(),
        })
    }

    /// A network filled with seeded random weights, scaled so that a typical position keeps
    /// most of its feature transformer lanes inside the clipping range.
    pub fn random(arch: Arch, seed: u64) -> Result<Network, NetworkError> {
        let mut network = Network::zeroed(arch)?;
        let mut rng = StdRng::seed_from_u64(seed);

        for row in network.ft_weights.iter_mut() {
            row.iter_mut().for_each(|w| *w = rng.random_range(-24..=24));
        }
        network.ft_biases.iter_mut().for_each(|b| *b = rng.random_range(0..=FT_Q / 2));

        let q = Q as i32;
        for bucket in 0..OUTPUT_BUCKET_COUNT {
            network.l1_weights[bucket].iter_mut().for_each(|w| *w = rng.random_range(-16..=16));
            network.l1_biases[bucket].iter_mut().for_each(|b| *b = rng.random_range(-q / 4..=q / 2));
            network.l2_weights[bucket].iter_mut().for_each(|w| *w = rng.random_range(-q / 2..=q / 2));
            network.l2_biases[bucket].iter_mut().for_each(|b| *b = rng.random_range(-q * q * q / 8..=q * q * q / 8));
            network.l3_weights[bucket].iter_mut().for_each(|w| *w = rng.random_range(-q..=q));
            network.l3_biases[bucket] = rng.random_range(-q * q * q * 16..=q * q * q * 16);
        }

        Ok(network)
    }

    pub fn load(path: impl AsRef<Path>, arch: Arch) -> Result<Network, NetworkError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).inspect_err(|err| {
            log::error!("could not read network {}: {err}", path.display());
        })?;
        let network = Network::from_bytes(&bytes, arch).inspect_err(|err| {
            log::error!("rejected network {}: {err}", path.display());
        })?;
        log::info!("loaded network {} ({} bytes)", path.display(), bytes.len());
        Ok(network)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), NetworkError> {
        std::fs::write(path, self.to_bytes())?;
        Ok(())
    }

    pub fn from_bytes(bytes: &[u8], arch: Arch) -> Result<Network, NetworkError> {
        let mut reader = Reader { bytes };

        let magic: [u8; 4] = [reader.scalar()?, reader.scalar()?, reader.scalar()?, reader.scalar()?];
        if magic != MAGIC {
            return Err(NetworkError::BadMagic(magic));
        }
        let version: u32 = reader.scalar()?;
        if version != VERSION {
            return Err(NetworkError::UnsupportedVersion(version));
        }

        for (field, expected) in shape() {
            let found: u32 = reader.scalar()?;
            if found != expected {
                return Err(NetworkError::ShapeMismatch { field, expected, found });
            }
        }
        let dual: u32 = reader.scalar()?;
        if dual != arch.dual_activation as u32 {
            return Err(NetworkError::ArchMismatch { expected: arch.dual_activation, found: dual });
        }

        let mut network = Network::zeroed(arch)?;
        let l2_len = arch.l2_input_size() * L3_SIZE;

        for row in network.ft_weights.iter_mut() {
            reader.fill(row)?;
        }
        reader.fill(network.ft_biases.as_mut_slice())?;
        for weights in network.l1_weights.iter_mut() {
            reader.fill(weights)?;
        }
        for biases in network.l1_biases.iter_mut() {
            reader.fill(biases)?;
        }
        for weights in network.l2_weights.iter_mut() {
            reader.fill(&mut weights[..l2_len])?;
        }
        for biases in network.l2_biases.iter_mut() {
            reader.fill(biases)?;
        }
        for weights in network.l3_weights.iter_mut() {
            reader.fill(weights)?;
        }
        reader.fill(&mut network.l3_biases[..])?;

        if !reader.bytes.is_empty() {
            return Err(NetworkError::TrailingBytes(reader.bytes.len()));
        }
        Ok(network)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(FT_ROWS * L1_SIZE * 2 + 4096);
        out.extend_from_slice(&MAGIC);
        VERSION.put(&mut out);
        for (_, value) in shape() {
            value.put(&mut out);
        }
        (self.arch.dual_activation as u32).put(&mut out);

        let l2_len = self.arch.l2_input_size() * L3_SIZE;
        self.ft_weights.iter().for_each(|row| put_all(&mut out, row));
        put_all(&mut out, self.ft_biases.as_slice());
        self.l1_weights.iter().for_each(|w| put_all(&mut out, w));
        self.l1_biases.iter().for_each(|b| put_all(&mut out, b));
        self.l2_weights.iter().for_each(|w| put_all(&mut out, &w[..l2_len]));
        self.l2_biases.iter().for_each(|b| put_all(&mut out, b));
        self.l3_weights.iter().for_each(|w| put_all(&mut out, w));
        put_all(&mut out, &self.l3_biases[..]);
        out
    }

    #[inline(always)]
    pub fn arch(&self) -> &Arch {
        &self.arch
    }

    /// Embedding row of one feature index.
    #[inline(always)]
    pub fn ft_row(&self, index: usize) -> &FeatureWeights {
        &self.ft_weights[index]
    }

    #[inline(always)]
    pub fn ft_biases(&self) -> &FeatureWeights {
        &self.ft_biases
    }

    #[inline(always)]
    pub fn l1_weights(&self, bucket: usize) -> &L1Weights {
        &self.l1_weights[bucket]
    }

    #[inline(always)]
    pub fn l1_biases(&self, bucket: usize) -> &[i32; L2_SIZE] {
        &self.l1_biases[bucket]
    }

    #[inline(always)]
    pub fn l2_weights(&self, bucket: usize) -> &L2Weights {
        &self.l2_weights[bucket]
    }

    #[inline(always)]
    pub fn l2_biases(&self, bucket: usize) -> &[i32; L3_SIZE] {
        &self.l2_biases[bucket]
    }

    #[inline(always)]
    pub fn l3_weights(&self, bucket: usize) -> &[i32; L3_SIZE] {
        &self.l3_weights[bucket]
    }

    #[inline(always)]
    pub fn l3_bias(&self, bucket: usize) -> i32 {
        self.l3_biases[bucket]
    }
}

fn shape() -> [(&'static str, u32); 8] {
    [
        ("input size", INPUT_SIZE as u32),
        ("input bucket count", INPUT_BUCKET_COUNT as u32),
        ("L1 size", L1_SIZE as u32),
        ("L2 size", L2_SIZE as u32),
        ("L3 size", L3_SIZE as u32),
        ("output bucket count", OUTPUT_BUCKET_COUNT as u32),
        ("FT quantisation bits", FT_Q_BITS),
        ("L1 quantisation bits", L1_Q_BITS),
    ]
}

/// Fixed-width little-endian values stored in a weight file.
trait LeScalar: Copy {
    const SIZE: usize;
    fn get(bytes: &[u8]) -> Self;
    fn put(self, out: &mut Vec<u8>);
}

macro_rules! le_scalar {
    ($($t:ty),*) => {$(
        impl LeScalar for $t {
            const SIZE: usize = std::mem::size_of::<$t>();

            #[inline]
            fn get(bytes: &[u8]) -> Self {
                let mut buf = [0u8; std::mem::size_of::<$t>()];
                buf.copy_from_slice(bytes);
                <$t>::from_le_bytes(buf)
            }

            #[inline]
            fn put(self, out: &mut Vec<u8>) {
                out.extend_from_slice(&self.to_le_bytes());
            }
        }
    )*};
}

le_scalar!(u8, i8, i16, i32, u32);

fn put_all<T: LeScalar>(out: &mut Vec<u8>, values: &[T]) {
    values.iter().for_each(|&v| v.put(out));
}

struct Reader<'a> {
    bytes: &'a [u8],
}

impl<'a> Reader<'a> {
    fn take(&mut self, len: usize) -> Result<&'a [u8], NetworkError> {
        if self.bytes.len() < len {
            return Err(NetworkError::Truncated { needed: len, remaining: self.bytes.len() });
        }
        let (head, tail) = self.bytes.split_at(len);
        self.bytes = tail;
        Ok(head)
    }

    fn scalar<T: LeScalar>(&mut self) -> Result<T, NetworkError> {
        Ok(T::get(self.take(T::SIZE)?))
    }

    fn fill<T: LeScalar>(&mut self, dst: &mut [T]) -> Result<(), NetworkError> {
        let bytes = self.take(dst.len() * T::SIZE)?;
        for (value, chunk) in dst.iter_mut().zip(bytes.chunks_exact(T::SIZE)) {
            *value = T::get(chunk);
        }
        Ok(())
    }
}

/// One random network per test binary; filling tens of millions of weights is not free.
#[cfg(test)]
pub(crate) fn test_network() -> std::sync::Arc<Network> {
    use std::sync::{Arc, OnceLock};

    static NETWORK: OnceLock<Arc<Network>> = OnceLock::new();
    NETWORK
        .get_or_init(|| Arc::new(Network::random(Arch::default(), 0x5eed).unwrap()))
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::arch::{KingMirroring, OutputBucketing, ARCH};

    const HEADER_LEN: usize = 4 + 4 + 8 * 4 + 4;

    fn small_network() -> Network {
        let mut network = Network::zeroed(ARCH).unwrap();
        network.ft_weights[0][0] = -3;
        network.ft_weights[FT_ROWS - 1][L1_SIZE - 1] = 17;
        network.ft_biases[5] = 99;
        network.l1_weights[3][100] = -128;
        network.l1_biases[7][15] = -12345;
        network.l2_weights[1][L2_INPUT_MAX * L3_SIZE - 1] = 42;
        network.l2_biases[2][0] = 1 << 20;
        network.l3_weights[4][31] = -8;
        network.l3_biases[6] = i32::MIN;
        network
    }

    fn assert_same(a: &Network, b: &Network) {
        assert_eq!(a.arch, b.arch);
        assert!(a.ft_weights == b.ft_weights);
        assert!(a.ft_biases == b.ft_biases);
        assert!(a.l1_weights == b.l1_weights);
        assert!(a.l1_biases == b.l1_biases);
        assert!(a.l2_weights == b.l2_weights);
        assert!(a.l2_biases == b.l2_biases);
        assert!(a.l3_weights == b.l3_weights);
        assert!(a.l3_biases == b.l3_biases);
    }

    #[test]
    fn test_round_trip() {
        let network = small_network();
        let bytes = network.to_bytes();
        let loaded = Network::from_bytes(&bytes, ARCH).unwrap();
        assert_same(&network, &loaded);
    }

    #[test]
    fn test_save_and_load_file() {
        let network = small_network();
        let path = std::env::temp_dir().join(format!("nnue-eval-test-{}.nnev", std::process::id()));
        network.save(&path).unwrap();
        let loaded = Network::load(&path, ARCH);
        std::fs::remove_file(&path).unwrap();
        assert_same(&network, &loaded.unwrap());
    }

    #[test]
    fn test_missing_file() {
        let result = Network::load("/definitely/not/a/network.nnev", ARCH);
        assert!(matches!(result, Err(NetworkError::Io(_))));
    }

    #[test]
    fn test_single_activation_file_is_smaller() {
        let arch = Arch { dual_activation: false, ..ARCH };
        let network = Network::zeroed(arch).unwrap();
        let bytes = network.to_bytes();
        assert_eq!(
            small_network().to_bytes().len() - bytes.len(),
            OUTPUT_BUCKET_COUNT * L2_SIZE * L3_SIZE * 4
        );
        assert!(Network::from_bytes(&bytes, arch).is_ok());
    }

    #[test]
    fn test_bad_magic() {
        let mut bytes = small_network().to_bytes();
        bytes[0] = b'X';
        assert!(matches!(
            Network::from_bytes(&bytes, ARCH),
            Err(NetworkError::BadMagic(magic)) if &magic == b"XNEV"
        ));
    }

    #[test]
    fn test_unsupported_version() {
        let mut bytes = small_network().to_bytes();
        bytes[4..8].copy_from_slice(&2u32.to_le_bytes());
        assert!(matches!(Network::from_bytes(&bytes, ARCH), Err(NetworkError::UnsupportedVersion(2))));
    }

    #[test]
    fn test_shape_mismatch() {
        let mut bytes = small_network().to_bytes();
        // L1 size is the third shape field
        bytes[16..20].copy_from_slice(&1536u32.to_le_bytes());
        match Network::from_bytes(&bytes, ARCH) {
            Err(NetworkError::ShapeMismatch { field, expected, found }) => {
                assert_eq!(field, "L1 size");
                assert_eq!(expected, L1_SIZE as u32);
                assert_eq!(found, 1536);
            }
            other => panic!("unexpected result {:?}", other.err()),
        }
    }

    #[test]
    fn test_dual_activation_mismatch() {
        let bytes = small_network().to_bytes();
        let arch = Arch { dual_activation: false, ..ARCH };
        assert!(matches!(
            Network::from_bytes(&bytes, arch),
            Err(NetworkError::ArchMismatch { expected: false, found: 1 })
        ));
    }

    #[test]
    fn test_truncated() {
        let bytes = small_network().to_bytes();
        assert!(matches!(
            Network::from_bytes(&bytes[..bytes.len() - 1], ARCH),
            Err(NetworkError::Truncated { .. })
        ));
        assert!(matches!(
            Network::from_bytes(&bytes[..HEADER_LEN - 2], ARCH),
            Err(NetworkError::Truncated { .. })
        ));
        assert!(matches!(Network::from_bytes(&[], ARCH), Err(NetworkError::Truncated { .. })));
    }

    #[test]
    fn test_trailing_bytes() {
        let mut bytes = small_network().to_bytes();
        bytes.extend_from_slice(&[0, 0, 0]);
        assert!(matches!(Network::from_bytes(&bytes, ARCH), Err(NetworkError::TrailingBytes(3))));
    }

    #[test]
    fn test_invalid_arch() {
        let arch = Arch { output_bucketing: OutputBucketing::MaterialCount(0), ..ARCH };
        assert!(matches!(Network::zeroed(arch), Err(NetworkError::InvalidArch(_))));
        let arch = Arch { mirroring: KingMirroring::Efgh, ..ARCH };
        assert!(Network::zeroed(arch).is_ok());
    }

    #[test]
    fn test_random_network_is_seeded() {
        let a = Network::random(ARCH, 7).unwrap();
        let b = Network::random(ARCH, 7).unwrap();
        assert_same(&a, &b);
        assert!(a.ft_biases.iter().all(|&b| (0..=FT_Q / 2).contains(&b)));
    }
}
