use rust_decimal::Decimal;

const SEED_FOLD_PRIME: u32 = 0x9e37_79b9;
const SEED_MIX_CONST: u32 = 0x85eb_ca6b;
const MIX_CONST_A: u32 = 0x85eb_ca6b;
const MIX_CONST_B: u32 = 0xc2b2_ae35;
const TWO_POW_32: u64 = 1u64 << 32;

/// Deterministic, restorable 32-bit scalar PRNG.
///
/// Identical seed strings, or identical restored [`Rng::state`] values, produce identical
/// infinite draw sequences — the determinism invariant every checkpoint/resume property test
/// in this workspace depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rng {
    state: u32,
}

impl Rng {
    pub fn from_seed(seed: &str) -> Self {
        let mut h = (seed.len() as u32) ^ SEED_FOLD_PRIME;
        for byte in seed.bytes() {
            h = (h ^ byte as u32).wrapping_mul(SEED_MIX_CONST).rotate_left(13);
        }
        Self { state: h }
    }

    pub fn from_state(state: u32) -> Self {
        Self { state }
    }

    pub fn state(&self) -> u32 {
        self.state
    }

    /// Draws the next value in `[0, 1)` and advances the generator's state.
    pub fn next_unit(&mut self) -> Decimal {
        let mut h = self.state;
        h ^= h >> 16;
        h = h.wrapping_mul(MIX_CONST_A);
        h ^= h >> 13;
        h = h.wrapping_mul(MIX_CONST_B);
        h ^= h >> 16;
        self.state = h;

        Decimal::from(h as u64) / Decimal::from(TWO_POW_32)
    }
}

impl backtest_execution::executor::SizingRng for Rng {
    fn next_unit(&mut self) -> Decimal {
        Rng::next_unit(self)
    }
}
