use std::fmt::Write;

use blake3::Hasher;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StateHash([u8; 32]);

impl StateHash {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        let mut out = String::with_capacity(64);
        for b in self.0 {
            let _ = write!(&mut out, "{:02x}", b);
        }
        out
    }
}

/// BLAKE3 over a canonical little-endian encoding. Floats hash by bit
/// pattern so `-0.0` and `0.0` differ, as do NaN payloads.
pub struct StateHasher {
    inner: Hasher,
}

impl Default for StateHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl StateHasher {
    pub fn new() -> Self {
        Self {
            inner: Hasher::new(),
        }
    }

    pub fn write_u64(&mut self, value: u64) {
        self.inner.update(&value.to_le_bytes());
    }

    pub fn write_i64(&mut self, value: i64) {
        self.inner.update(&value.to_le_bytes());
    }

    pub fn write_f64(&mut self, value: f64) {
        self.write_u64(value.to_bits());
    }

    pub fn write_bool(&mut self, value: bool) {
        self.inner.update(&[value as u8]);
    }

    pub fn write_str(&mut self, value: &str) {
        self.write_u64(value.len() as u64);
        self.inner.update(value.as_bytes());
    }

    pub fn finish(&self) -> StateHash {
        StateHash::from_bytes(*self.inner.finalize().as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_tracks_float_bits_and_lengths() {
        let mut a = StateHasher::new();
        a.write_f64(0.0);
        let mut b = StateHasher::new();
        b.write_f64(-0.0);
        assert_ne!(a.finish(), b.finish());

        let mut c = StateHasher::new();
        c.write_str("ab");
        c.write_str("c");
        let mut d = StateHasher::new();
        d.write_str("a");
        d.write_str("bc");
        assert_ne!(c.finish(), d.finish());
        assert_eq!(c.finish().to_hex().len(), 64);
    }
}
