//! Vector kernels selected at runtime. Every accelerated path has a portable scalar twin that it
//! must agree with bit for bit.

#[cfg(target_arch = "x86_64")]
mod avx2;

use arrayvec::ArrayVec;

/// i32 lanes in one chunk of activations, the width of a 256-bit register.
pub const CHUNK_LANES: usize = 8;
pub const CHUNK_BYTES: usize = CHUNK_LANES * std::mem::size_of::<i32>();

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Backend {
    kind: Kind,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Kind {
    Scalar,
    #[cfg(target_arch = "x86_64")]
    Avx2,
}

impl Default for Backend {
    fn default() -> Self {
        Backend::detect()
    }
}

impl Backend {
    pub const fn scalar() -> Backend {
        Backend { kind: Kind::Scalar }
    }

    /// The fastest backend the running CPU supports.
    pub fn detect() -> Backend {
        #[cfg(target_arch = "x86_64")]
        if std::arch::is_x86_feature_detected!("avx2") {
            return Backend { kind: Kind::Avx2 };
        }
        Backend::scalar()
    }

    /// Every backend usable on this CPU, scalar first.
    pub fn available() -> ArrayVec<Backend, 2> {
        let mut backends = ArrayVec::new();
        backends.push(Backend::scalar());
        let detected = Backend::detect();
        if detected != Backend::scalar() {
            backends.push(detected);
        }
        backends
    }

    pub fn name(&self) -> &'static str {
        match self.kind {
            Kind::Scalar => "scalar",
            #[cfg(target_arch = "x86_64")]
            Kind::Avx2 => "avx2",
        }
    }

    /// Bit `i` is set when any of the four bytes of lane `i` is non-zero.
    #[inline(always)]
    pub fn nonzero_mask(&self, chunk: &[u8; CHUNK_BYTES]) -> u32 {
        match self.kind {
            Kind::Scalar => scalar_nonzero_mask(chunk),
            // Only constructed by `detect` after the CPU reported AVX2.
            #[cfg(target_arch = "x86_64")]
            Kind::Avx2 => unsafe { avx2::nonzero_mask(chunk) },
        }
    }
}

#[inline(always)]
fn scalar_nonzero_mask(chunk: &[u8; CHUNK_BYTES]) -> u32 {
    let mut mask = 0;
    for (lane, bytes) in chunk.chunks_exact(4).enumerate() {
        if bytes.iter().any(|&b| b != 0) {
            mask |= 1 << lane;
        }
    }
    mask
}
