use xxhash_rust::xxh3::xxh3_64;

/// Stable handle for a texture path, so renderers can key caches without
/// holding on to the string.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureHandle(u64);

impl TextureHandle {
    pub fn from_path(path: &str) -> Self {
        Self(xxh3_64(path.as_bytes()))
    }

    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }

    pub fn to_hex(self) -> String {
        format!("{:016x}", self.0)
    }
}
