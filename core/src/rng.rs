/// Deterministic SplitMix64 stream.
///
/// Every instance draws from its own stream derived from the run seed, the
/// tick and the instance id, so draws never depend on evaluation order across
/// instances or on the number of worker threads.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DetRng {
    state: u64,
}

impl DetRng {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    pub fn reseed(&mut self, seed: u64) {
        self.state = seed;
    }

    pub fn state(&self) -> u64 {
        self.state
    }

    pub fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9e3779b97f4a7c15);
        finalize(self.state)
    }

    /// Uniform in `[0, 1)` with 53 bits of precision.
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// `min + (max - min) * u`, the same formula scripted and compiled bullets
    /// both go through.
    pub fn uniform(&mut self, min: f64, max: f64) -> f64 {
        min + (max - min) * self.next_f64()
    }

    /// Integer in `[0, bound)`. `bound` of zero yields zero.
    pub fn below(&mut self, bound: u64) -> u64 {
        if bound == 0 {
            return 0;
        }
        ((self.next_u64() as u128 * bound as u128) >> 64) as u64
    }

    pub fn choice<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            return None;
        }
        let idx = self.below(items.len() as u64) as usize;
        items.get(idx)
    }
}

pub fn mix64(seed: u64, salt: u64) -> u64 {
    let x = seed ^ salt.wrapping_mul(0x9e3779b97f4a7c15);
    splitmix64(x)
}

pub fn splitmix64(x: u64) -> u64 {
    finalize(x.wrapping_add(0x9e3779b97f4a7c15))
}

fn finalize(mut z: u64) -> u64 {
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d049bb133111eb);
    z ^ (z >> 31)
}
