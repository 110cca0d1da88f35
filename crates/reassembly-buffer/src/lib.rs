//! An out-of-order byte stream reassembly buffer for QUIC-family stream receivers.
//!
//! A [`ReassemblyBuffer`] absorbs `(offset, bytes)` pushes in whatever order they arrive off the
//! wire — reordered, overlapping, duplicated — and exposes the longest contiguous prefix of
//! received bytes through [`ReassemblyBuffer::data_at`]. Internally it tracks two disjoint,
//! offset-ordered sets backed by [`reassembly_skiplist::SkipList`]: the gaps still missing from
//! the stream, and the chunks of bytes already received.
//!
//! ```
//! use reassembly_buffer::{ReassemblyBuffer, RobConfig};
//!
//! let mut rob = ReassemblyBuffer::new(RobConfig::new(1024)).unwrap();
//! rob.push(0, b"hello").unwrap();
//! assert_eq!(rob.data_at(0), b"hello");
//! ```

mod config;
mod error;
mod rob;

pub use self::{
    config::RobConfig,
    error::{OutOfMemoryError, Result, RobError},
    rob::ReassemblyBuffer,
};
