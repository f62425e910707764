pub mod decode;
pub mod encode;

pub use decode::FountainDecoder;
pub use encode::FountainEncoder;

/// The xorshift32 PRNG both ends of the pipeline agree on. A packet's
/// degree and chunk selection are a pure function of its 32-bit seed.
#[derive(Debug, Clone)]
pub struct XorShift32 {
    state: u32,
}

impl XorShift32 {
    pub fn new(seed: u32) -> Self {
        // xorshift has a single fixed point at zero; remap it
        let state = if seed == 0 { 0x9E37_79B9 } else { seed };
        let mut rng = Self { state };
        // small consecutive seeds start poorly mixed and would skew the
        // first degree draw; discard a few rounds, as TinyMT does
        for _ in 0..8 {
            rng.next_u32();
        }
        rng
    }

    pub fn next_u32(&mut self) -> u32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;
        x
    }

    /// Uniform draw in `0..n`. `n` must be non-zero.
    pub fn next_below(&mut self, n: u32) -> u32 {
        self.next_u32() % n
    }

    /// Fill a buffer with the PRNG byte stream (successive u32s, little-endian).
    #[cfg(test)]
    pub fn fill(&mut self, buf: &mut [u8]) {
        for word in buf.chunks_mut(4) {
            let bytes = self.next_u32().to_le_bytes();
            word.copy_from_slice(&bytes[..word.len()]);
        }
    }
}

/// A set of source-chunk indices, packed into u64 words. Row masks in the
/// decoder are XORed and popcounted wholesale, so the representation stays
/// word-oriented rather than per-bit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkMask {
    bits: Vec<u64>,
    len: u32,
}

impl ChunkMask {
    pub fn new(len: u32) -> Self {
        let words = (len as usize + 63) / 64;
        Self {
            bits: vec![0; words],
            len,
        }
    }

    pub fn singleton(len: u32, index: u32) -> Self {
        let mut mask = Self::new(len);
        mask.set(index);
        mask
    }

    /// Number of chunk columns this mask spans (the on-wire `mask_len`).
    pub fn len(&self) -> u32 {
        self.len
    }

    pub fn set(&mut self, index: u32) {
        debug_assert!(index < self.len);
        self.bits[index as usize / 64] |= 1u64 << (index % 64);
    }

    pub fn clear(&mut self, index: u32) {
        debug_assert!(index < self.len);
        self.bits[index as usize / 64] &= !(1u64 << (index % 64));
    }

    pub fn contains(&self, index: u32) -> bool {
        index < self.len && self.bits[index as usize / 64] & (1u64 << (index % 64)) != 0
    }

    pub fn xor_with(&mut self, other: &Self) {
        debug_assert_eq!(self.len, other.len);
        for (a, b) in self.bits.iter_mut().zip(&other.bits) {
            *a ^= b;
        }
    }

    pub fn count(&self) -> u32 {
        self.bits.iter().map(|w| w.count_ones()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.iter().all(|&w| w == 0)
    }

    /// Lowest set index, if any.
    pub fn first_set(&self) -> Option<u32> {
        for (i, &word) in self.bits.iter().enumerate() {
            if word != 0 {
                return Some(i as u32 * 64 + word.trailing_zeros());
            }
        }
        None
    }

    /// All set indices in ascending order.
    pub fn indices(&self) -> Vec<u32> {
        let mut out = Vec::with_capacity(self.count() as usize);
        for (i, &word) in self.bits.iter().enumerate() {
            let mut w = word;
            while w != 0 {
                out.push(i as u32 * 64 + w.trailing_zeros());
                w &= w - 1;
            }
        }
        out
    }

    /// Serialize to `ceil(len/8)` bytes. Bit `i` lives at byte `i/8`,
    /// bit position `i%8` (LSB-first).
    pub fn to_bytes(&self) -> Vec<u8> {
        let n_bytes = (self.len as usize + 7) / 8;
        let mut out = Vec::with_capacity(n_bytes);
        for word in &self.bits {
            out.extend_from_slice(&word.to_le_bytes());
        }
        out.truncate(n_bytes);
        out
    }

    /// Parse from the wire form. Bits beyond `len` are dropped.
    pub fn from_bytes(len: u32, bytes: &[u8]) -> Self {
        let mut mask = Self::new(len);
        for (i, chunk) in bytes.chunks(8).enumerate() {
            if i >= mask.bits.len() {
                break;
            }
            let mut word = [0u8; 8];
            word[..chunk.len()].copy_from_slice(chunk);
            mask.bits[i] = u64::from_le_bytes(word);
        }
        // mask off padding bits in the last word
        let tail = len % 64;
        if tail != 0 {
            if let Some(last) = mask.bits.last_mut() {
                *last &= (1u64 << tail) - 1;
            }
        }
        mask
    }
}

/// Robust Soliton degree distribution over `1..=n`, precomputed as a CDF
/// and sampled by inverse transform.
#[derive(Debug, Clone)]
pub struct RobustSoliton {
    cdf: Vec<f64>,
}

impl RobustSoliton {
    pub fn new(n: u32, c: f64, delta: f64) -> Self {
        let nf = n as f64;
        if n <= 1 {
            return Self { cdf: vec![1.0] };
        }

        let s = c * (nf / delta).ln() * nf.sqrt();
        let spike = if s > 0.0 {
            ((nf / s).floor() as u32).clamp(1, n)
        } else {
            n
        };

        let mut pdf = Vec::with_capacity(n as usize);
        for d in 1..=n {
            let df = d as f64;
            let rho = if d == 1 { 1.0 / nf } else { 1.0 / (df * (df - 1.0)) };
            let tau = if d < spike {
                s / (df * nf)
            } else if d == spike {
                (s * (s / delta).ln() / nf).max(0.0)
            } else {
                0.0
            };
            pdf.push(rho + tau);
        }

        let beta: f64 = pdf.iter().sum();
        let mut cdf = Vec::with_capacity(pdf.len());
        let mut acc = 0.0;
        for p in pdf {
            acc += p / beta;
            cdf.push(acc);
        }
        // guard against rounding at the top end
        if let Some(last) = cdf.last_mut() {
            *last = 1.0;
        }

        Self { cdf }
    }

    /// Draw a degree in `1..=n`.
    pub fn sample(&self, rng: &mut XorShift32) -> u32 {
        let u = rng.next_u32() as f64 / (u32::MAX as f64 + 1.0);
        let idx = self.cdf.partition_point(|&p| p <= u);
        (idx as u32 + 1).min(self.cdf.len() as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xorshift_is_deterministic() {
        let mut a = XorShift32::new(0xC0FFEE);
        let mut b = XorShift32::new(0xC0FFEE);
        for _ in 0..100 {
            assert_eq!(a.next_u32(), b.next_u32());
        }
    }

    #[test]
    fn test_xorshift_zero_seed_progresses() {
        let mut rng = XorShift32::new(0);
        let first = rng.next_u32();
        assert_ne!(first, 0);
        assert_ne!(first, rng.next_u32());
    }

    #[test]
    fn test_xorshift_known_sequence() {
        // seed 1, eight warm-up rounds, then x^=x<<13; x^=x>>17; x^=x<<5
        let mut rng = XorShift32::new(1);
        assert_eq!(rng.next_u32(), 2_005_365_029);
        assert_eq!(rng.next_u32(), 2_916_098_932);
        assert_eq!(rng.next_u32(), 2_657_092_299);
    }

    #[test]
    fn test_mask_set_clear_count() {
        let mut mask = ChunkMask::new(200);
        mask.set(0);
        mask.set(63);
        mask.set(64);
        mask.set(199);
        assert_eq!(mask.count(), 4);
        assert!(mask.contains(64));
        mask.clear(64);
        assert_eq!(mask.count(), 3);
        assert!(!mask.contains(64));
        assert_eq!(mask.first_set(), Some(0));
        assert_eq!(mask.indices(), vec![0, 63, 199]);
    }

    #[test]
    fn test_mask_xor() {
        let mut a = ChunkMask::singleton(100, 3);
        let b = ChunkMask::singleton(100, 70);
        a.xor_with(&b);
        assert_eq!(a.indices(), vec![3, 70]);
        a.xor_with(&b);
        assert_eq!(a.indices(), vec![3]);
    }

    #[test]
    fn test_mask_wire_roundtrip() {
        let mut mask = ChunkMask::new(77);
        for i in [0u32, 7, 8, 13, 64, 76] {
            mask.set(i);
        }
        let bytes = mask.to_bytes();
        assert_eq!(bytes.len(), 10);
        let back = ChunkMask::from_bytes(77, &bytes);
        assert_eq!(back, mask);
    }

    #[test]
    fn test_mask_from_bytes_drops_padding_bits() {
        // 10 columns need 2 bytes; the top 6 bits of the second byte are padding
        let back = ChunkMask::from_bytes(10, &[0xFF, 0xFF]);
        assert_eq!(back.count(), 10);
    }

    #[test]
    fn test_soliton_degrees_in_range() {
        let dist = RobustSoliton::new(500, 0.03, 0.5);
        let mut rng = XorShift32::new(42);
        for _ in 0..10_000 {
            let d = dist.sample(&mut rng);
            assert!((1..=500).contains(&d));
        }
    }

    #[test]
    fn test_soliton_single_chunk_always_degree_one() {
        let dist = RobustSoliton::new(1, 0.03, 0.5);
        let mut rng = XorShift32::new(7);
        for _ in 0..100 {
            assert_eq!(dist.sample(&mut rng), 1);
        }
    }

    #[test]
    fn test_soliton_favors_low_degrees() {
        // degree 1 and 2 dominate the ideal component of the distribution
        let dist = RobustSoliton::new(1000, 0.03, 0.5);
        let mut rng = XorShift32::new(99);
        let mut low = 0u32;
        let samples = 10_000;
        for _ in 0..samples {
            if dist.sample(&mut rng) <= 2 {
                low += 1;
            }
        }
        assert!(low > samples / 3, "only {low} of {samples} draws were degree <= 2");
    }
}
