//! A probabilistic skip list over half-open 64-bit [`Range`]s, plus the pieces it is built from:
//! range utilities and a reproducible PRNG for level selection.
//!
//! Callers are responsible for never inserting overlapping ranges into the same [`SkipList`];
//! the list itself only promises ordering and non-overlap bookkeeping on top of that contract.

mod level;
mod list;
mod node;
mod range;
mod rnd;

pub use self::{
    level::{MAX_LEVEL, rand_level},
    list::{Iter, LowerBound, OutOfMemoryError, SkipList},
    node::NodeId,
    range::Range,
    rnd::{Prng, Rnd},
};
