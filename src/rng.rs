/// Deterministic xorshift generator used for every gameplay roll.
///
/// Implements [`rand::RngCore`] so it can be handed to anything that takes
/// `&mut impl Rng`, and keeps the stage's own `range` helpers whose exact
/// arithmetic the drop tables depend on.
use rand::{Error, RngCore, SeedableRng};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Xorshf96 {
    x: u32,
    y: u32,
    z: u32,
}

impl Default for Xorshf96 {
    fn default() -> Self {
        Self {
            x: 123_456_789,
            y: 362_436_069,
            z: 521_288_629,
        }
    }
}

impl Xorshf96 {
    pub fn new(x: u32, y: u32, z: u32) -> Self {
        if x == 0 && y == 0 && z == 0 {
            // All-zero state never leaves zero.
            return Self::default();
        }
        Self { x, y, z }
    }

    /// Advance the state and return the raw 32-bit output.
    pub fn next(&mut self) -> u32 {
        self.x ^= self.x << 16;
        self.x ^= self.x >> 5;
        self.x ^= self.x << 1;

        let t = self.x;
        self.x = self.y;
        self.y = self.z;
        self.z = t ^ self.x ^ self.y;
        self.z
    }

    /// Uniform float in `[a, b)`.
    pub fn range(&mut self, a: f32, b: f32) -> f32 {
        let span = b - a;
        let r = self.next() as f32 / u32::MAX as f32;
        if span == 0.0 {
            return a;
        }
        a + (span * r) % span
    }

    /// Uniform integer in `[a, b)`.
    pub fn rangei(&mut self, a: i32, b: i32) -> i32 {
        let span = b.wrapping_sub(a);
        let r = self.next();
        if span <= 0 {
            return a;
        }
        a + (r % span as u32) as i32
    }
}

impl RngCore for Xorshf96 {
    fn next_u32(&mut self) -> u32 {
        self.next()
    }

    fn next_u64(&mut self) -> u64 {
        let hi = self.next() as u64;
        let lo = self.next() as u64;
        (hi << 32) | lo
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(4) {
            let bytes = self.next().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

impl SeedableRng for Xorshf96 {
    type Seed = [u8; 12];

    fn from_seed(seed: Self::Seed) -> Self {
        let word = |i: usize| u32::from_le_bytes([seed[i], seed[i + 1], seed[i + 2], seed[i + 3]]);
        Self::new(word(0), word(4), word(8))
    }
}
