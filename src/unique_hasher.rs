//! A hasher for keys that already carry their hash. Hash-consed items store the
//! digest computed when they were built, and a `Ptr` is unique within its dag, so
//! each key writes exactly one `u64`.

/// Multiplying by this odd constant moves the entropy of small pointer indices into
/// the high bits that the hash tables use for grouping.
const SPREAD: u64 = 0x9e37_79b9_7f4a_7c15;

#[derive(Debug, Default, Clone, Copy)]
pub struct UniqueHasher {
    digest: u64,
}

impl std::hash::Hasher for UniqueHasher {
    #[inline]
    fn finish(&self) -> u64 { self.digest }

    fn write(&mut self, bytes: &[u8]) {
        for b in bytes.iter() {
            self.digest = (self.digest.rotate_left(5) ^ u64::from(*b)).wrapping_mul(SPREAD);
        }
    }

    #[inline]
    fn write_u64(&mut self, i: u64) {
        debug_assert_eq!(self.digest, 0, "a unique key writes a single digest");
        self.digest = i.wrapping_mul(SPREAD);
    }
}
