//! Randomness helpers driven by the runtime's `rand_u32` capability.
//!
//! The core keeps no generator of its own; every draw comes through [`WorldMut::rand_u32`]
//! so a seeded host replays identically.
//!
//! [`WorldMut::rand_u32`]: crate::WorldMut::rand_u32

/// Maps a uniform 32-bit sample onto `0..bound` by fixed-point multiply. `bound` must be
/// nonzero.
pub fn scale_below(sample: u32, bound: u32) -> u32 {
    ((sample as u64 * bound as u64) >> 32) as u32
}

/// Fisher-Yates shuffle; `next_below(bound)` must return a value in `0..bound`.
pub fn shuffle<T>(items: &mut [T], mut next_below: impl FnMut(u32) -> u32) {
    for i in (1..items.len()).rev() {
        let j = next_below(i as u32 + 1) as usize;
        items.swap(i, j.min(i));
    }
}
