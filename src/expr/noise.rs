//! Deterministic, hash-based random and noise helpers for expressions.
//!
//! Nothing here reads a clock or OS entropy: identical inputs always produce
//! identical outputs, which is what makes scrubbing reproducible.

/// SplitMix64 finalizer. Good avalanche behavior for lattice hashing.
#[inline]
fn mix(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9e37_79b9_7f4a_7c15);
    x = (x ^ (x >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    x ^ (x >> 31)
}

/// Uniform value in `[0, 1)` derived from a numeric seed.
pub fn random01(seed: f64) -> f64 {
    let h = mix(seed.to_bits());
    (h >> 11) as f64 / (1u64 << 53) as f64
}

/// Uniform value in `[0, 1)` from two seeds (e.g. seed + character index).
pub fn random01_pair(seed: f64, salt: u64) -> f64 {
    let h = mix(seed.to_bits() ^ mix(salt));
    (h >> 11) as f64 / (1u64 << 53) as f64
}

/// Lattice value in `[-1, 1]` for an integer coordinate.
#[inline]
fn lattice(i: i64, salt: u64) -> f64 {
    let h = mix((i as u64) ^ mix(salt));
    ((h >> 11) as f64 / (1u64 << 53) as f64) * 2.0 - 1.0
}

/// Smooth 1D value noise in `[-1, 1]`: hashed lattice values blended with a
/// smoothstep.
pub fn value_noise(x: f64, salt: u64) -> f64 {
    let i = x.floor() as i64;
    let f = x - x.floor();
    let a = lattice(i, salt);
    let b = lattice(i + 1, salt);
    let s = f * f * (3.0 - 2.0 * f);
    a + (b - a) * s
}

/// Multi-octave sine-modulated noise in roughly `[-1, 1]`.
///
/// Each octave doubles frequency and halves amplitude; the sine carrier
/// keeps the result periodic-ish and continuous in `x`, which is what the
/// `wiggle` binding composes from `time`.
pub fn fbm(x: f64, octaves: u32, salt: u64) -> f64 {
    let octaves = octaves.clamp(1, 8);
    let mut total = 0.0;
    let mut amplitude = 1.0;
    let mut frequency = 1.0;
    let mut weight = 0.0;
    for octave in 0..octaves {
        let phase = lattice(octave as i64, salt) * std::f64::consts::PI;
        total += amplitude * (x * frequency * std::f64::consts::TAU + phase).sin();
        weight += amplitude;
        amplitude *= 0.5;
        frequency *= 2.0;
    }
    total / weight
}
