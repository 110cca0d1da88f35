//! Random level selection for new skip-list nodes.

use crate::rnd::Prng;

/// The maximum level any node in any list produced by this crate may occupy.
///
/// Individual lists may configure a lower `max_level` at construction (the reassembly buffer
/// uses 32 for its gap list and 19 for its chunk list).
pub const MAX_LEVEL: usize = 32;

/// Draws a random level in `0..max_level`, geometrically distributed so that
/// `P(level >= k) = 2^-k`, capped at `max_level - 1`.
///
/// # Panics
/// Panics (in debug builds) if `max_level` is `0` or exceeds [`MAX_LEVEL`].
pub fn rand_level<P: Prng>(prng: &mut P, max_level: usize) -> usize {
    debug_assert!(max_level > 0 && max_level <= MAX_LEVEL, "max_level out of range");

    let mut level = 0;
    while level < max_level - 1 && prng.next_double() < 0.5 {
        level += 1;
    }
    level
}
