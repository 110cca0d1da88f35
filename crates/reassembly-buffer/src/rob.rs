//! The reassembly buffer: two cooperating skip lists that turn out-of-order, possibly
//! overlapping, possibly duplicated pushes into a contiguous byte stream.

use reassembly_skiplist::{NodeId, Range, Rnd, SkipList, rand_level};
use tracing::{instrument, trace};

use crate::{
    config::RobConfig,
    error::{Result, RobError},
};

/// Gaps may occupy up to the full skip-list level range: under adversarial loss, the gap set
/// can grow to millions of disjoint entries.
const GAP_MAX_LEVEL: usize = 32;
/// The chunk list's expected population is bounded by buffered bytes / chunk size, which is
/// almost always far smaller than the gap set's worst case.
const CHUNK_MAX_LEVEL: usize = 19;

/// A fixed-size, chunk-aligned buffer of received bytes.
///
/// Bytes outside the ranges actually written by [`ReassemblyBuffer::push`] are indeterminate
/// (zero-initialized here, rather than left uninitialized, since the gap list is what actually
/// prevents a caller from ever observing them). Readers only ever see positions the gap list
/// has already excluded.
#[derive(Debug)]
struct Chunk {
    bytes: Box<[u8]>,
}

/// An out-of-order byte stream reassembly buffer.
///
/// Turns possibly-reordered, possibly-overlapping, possibly-duplicated `(offset, bytes)` pushes
/// into an in-order, contiguous byte stream via [`Self::data_at`] / [`Self::pop`]. See the crate
/// docs for the full state machine.
///
/// Not `Sync`: a `ReassemblyBuffer` is meant to be driven by a single stream/connection task, the
/// way its surrounding frame state machine serializes access to it.
#[derive(Debug)]
pub struct ReassemblyBuffer {
    chunk_size: u64,
    gaps:       SkipList<()>,
    chunks:     SkipList<Chunk>,
    rnd:        Rnd,
}

impl ReassemblyBuffer {
    /// Creates a buffer over a logical stream of unbounded length, with chunks of
    /// `config.chunk_size()` bytes.
    pub fn new(config: RobConfig) -> Result<Self> {
        let mut rnd = Rnd::new(config.seed());
        let mut gaps: SkipList<()> = SkipList::new(GAP_MAX_LEVEL);

        let level = rand_level(&mut rnd, GAP_MAX_LEVEL);
        gaps.insert(Range::new(0, u64::MAX), (), level)?;

        #[expect(clippy::cast_possible_truncation, reason = "chunk_size originates from a usize")]
        let chunk_size = config.chunk_size() as u64;

        Ok(Self {
            chunk_size,
            gaps,
            chunks: SkipList::new(CHUNK_MAX_LEVEL),
            rnd,
        })
    }

    /// Marks `[offset, offset + bytes.len())` as received and copies `bytes` into the chunk
    /// list, subject to the current gap state.
    ///
    /// Bytes that fall outside any current gap (already received, or explicitly skipped by
    /// [`Self::remove_prefix`]) are silently dropped; a duplicate `push` is therefore a no-op,
    /// not an error.
    #[instrument(skip(self, bytes), fields(chunk_size = self.chunk_size, len = bytes.len()))]
    pub fn push(&mut self, offset: u64, bytes: &[u8]) -> Result<()> {
        #[expect(clippy::cast_possible_truncation, reason = "bytes.len() realistically fits u64")]
        let len = bytes.len() as u64;
        let end = offset.checked_add(len).ok_or(RobError::OffsetOverflow { offset, len })?;
        let query = Range::new(offset, end);

        if query.is_empty() {
            return Ok(());
        }

        let lb = self.gaps.lower_bound(query);
        let Some(mut gap_node) = lb.node else {
            trace!("push: nothing left to absorb");
            return Ok(());
        };

        let mut pred = lb;
        let mut stale = false;
        let mut hint: Option<NodeId> = None;

        loop {
            let gap_range = self.gaps.range(gap_node);
            let absorbed = query.intersect(gap_range);

            if absorbed.is_empty() {
                break;
            }

            if gap_range == absorbed {
                let next_gap = self.gaps.next(gap_node);

                if stale {
                    pred = self.gaps.lower_bound(query);
                }
                self.gaps.remove(gap_node, &pred);

                self.write_data(&mut hint, absorbed, offset, bytes)?;

                let Some(next_gap) = next_gap else { break };
                gap_node = next_gap;
                stale = true;
                continue;
            }

            let (left, right) = gap_range.cut(absorbed);
            if !left.is_empty() {
                self.gaps.set_range(gap_node, left);
                if !right.is_empty() {
                    let level = rand_level(&mut self.rnd, GAP_MAX_LEVEL);
                    self.gaps.insert(right, (), level)?;
                }
            } else if !right.is_empty() {
                self.gaps.set_range(gap_node, right);
            }

            self.write_data(&mut hint, absorbed, offset, bytes)?;

            let Some(next_gap) = self.gaps.next(gap_node) else { break };
            gap_node = next_gap;
            stale = true;
        }

        Ok(())
    }

    /// Copies the slice of `bytes` corresponding to `segment` (an absorbed piece of a push that
    /// started at `push_offset`) into the chunk list, allocating new chunks as needed.
    ///
    /// `hint` is the chunk the previous call (for a prior segment of the *same* push) left off
    /// at, so that a push spanning many chunks stays roughly `O(len / chunk_size)` instead of
    /// re-searching the chunk list from scratch for every gap segment it carves.
    fn write_data(
        &mut self,
        hint: &mut Option<NodeId>,
        segment: Range,
        push_offset: u64,
        bytes: &[u8],
    ) -> Result<()> {
        let mut offset = segment.begin;
        #[expect(clippy::cast_possible_truncation, reason = "segment lies within `bytes`")]
        let mut data = &bytes[(segment.begin - push_offset) as usize..(segment.end - push_offset) as usize];

        if hint.is_none() {
            *hint = self.chunks.lower_bound(segment).node;
        }

        loop {
            let need_new_chunk = match *hint {
                None => true,
                Some(id) => offset < self.chunks.range(id).begin,
            };

            if need_new_chunk {
                let aligned_begin = (offset / self.chunk_size) * self.chunk_size;
                let range = Range::new(aligned_begin, self.chunk_end(aligned_begin));
                let level = rand_level(&mut self.rnd, CHUNK_MAX_LEVEL);
                #[expect(clippy::cast_possible_truncation, reason = "chunk_size fits usize by construction")]
                let chunk = Chunk { bytes: vec![0_u8; self.chunk_size as usize].into_boxed_slice() };
                let id = self.chunks.insert(range, chunk, level)?;
                trace!(begin = range.begin, "push: allocated new chunk");
                *hint = Some(id);
            } else if let Some(id) = *hint {
                let chunk_begin = self.chunks.range(id).begin;
                assert!(
                    offset <= self.chunk_end(chunk_begin),
                    "write-data hint fell more than chunk_size behind the write offset",
                );
            }

            let id = hint.expect("a chunk was just located or allocated above");
            let chunk_begin = self.chunks.range(id).begin;
            #[expect(clippy::cast_possible_truncation, reason = "bounded by chunk_size, which fits usize")]
            let available = (self.chunk_end(chunk_begin) - offset) as usize;
            let n = data.len().min(available);
            let pos = (offset - chunk_begin) as usize;

            self.chunks.value_mut(id).bytes[pos..pos + n].copy_from_slice(&data[..n]);

            #[expect(clippy::cast_possible_truncation, reason = "n <= data.len(), which fits u64")]
            let advanced = n as u64;
            offset += advanced;
            data = &data[n..];

            if data.is_empty() {
                return Ok(());
            }

            *hint = self.chunks.next(id);
        }
    }

    /// Returns the longest contiguous run of received bytes starting *exactly* at `offset`, as
    /// a borrowed slice into the chunk holding it.
    ///
    /// The returned slice borrows from `self`, so the borrow checker (not documentation) is what
    /// enforces that it must not outlive the next mutating call to this buffer.
    #[must_use]
    pub fn data_at(&self, offset: u64) -> &[u8] {
        // An absent front gap means there is nothing left to bound a read against; mirrors the
        // reference implementation's unconditional `if (!gn) return 0;` before it ever looks at
        // the data list.
        let Some(gap_node) = self.gaps.front() else { return &[] };
        let gap_begin = self.gaps.range(gap_node).begin;
        if gap_begin <= offset {
            return &[];
        }

        let chunk_id = self
            .chunks
            .front()
            .expect("bytes received before the first gap imply a chunk holds them");
        let chunk_range = self.chunks.range(chunk_id);
        let chunk_end = self.chunk_end(chunk_range.begin);

        debug_assert!(
            chunk_range.begin <= offset && offset < chunk_end,
            "front chunk does not contain the requested offset",
        );

        let start = (offset - chunk_range.begin) as usize;
        let available_end = gap_begin.min(chunk_end);
        let len = (available_end - offset) as usize;

        &self.chunks.value(chunk_id).bytes[start..start + len]
    }

    /// Signals that `[offset, offset + len)` at the head of the chunk list has been consumed by
    /// the caller. Releases the front chunk once it has been fully consumed; otherwise it is
    /// retained for the remaining unread bytes.
    ///
    /// # Panics
    /// Panics if the chunk list is empty.
    #[instrument(skip(self))]
    pub fn pop(&mut self, offset: u64, len: u64) {
        let front = self.chunks.front().expect("pop called with no buffered chunks");
        let front_range = self.chunks.range(front);

        if offset.saturating_add(len) < self.chunk_end(front_range.begin) {
            return;
        }

        let _ = self.chunks.pop_front();
    }

    /// Declares that all bytes below `offset` are no longer of interest, whether or not they
    /// were ever received.
    #[instrument(skip(self))]
    pub fn remove_prefix(&mut self, offset: u64) {
        loop {
            let Some(front) = self.gaps.front() else { break };
            let range = self.gaps.range(front);

            if offset <= range.begin {
                break;
            }
            if offset < range.end {
                self.gaps.set_range(front, Range::new(offset, range.end));
                break;
            }

            let _ = self.gaps.pop_front();
        }

        loop {
            let Some(front) = self.chunks.front() else { return };
            let range = self.chunks.range(front);

            if self.chunk_end(range.begin) <= offset {
                let _ = self.chunks.pop_front();
            } else {
                return;
            }
        }
    }

    /// The `begin` of the first gap, or [`u64::MAX`] if the entire stream has been received.
    #[must_use]
    pub fn first_gap_offset(&self) -> u64 {
        self.gaps.front().map_or(u64::MAX, |id| self.gaps.range(id).begin)
    }

    /// The exclusive end of the chunk aligned at `begin`, saturating at [`u64::MAX`].
    ///
    /// A chunk-aligned `begin` within `chunk_size` of `u64::MAX` would otherwise overflow here
    /// (the stream's offset space is `[0, u64::MAX]`, which is not evenly divisible by an
    /// arbitrary `chunk_size`); the last chunk is simply narrower than `chunk_size` bytes, the
    /// same way the initial gap `[0, u64::MAX)` already treats `u64::MAX` as the space's sentinel
    /// exclusive end rather than `2^64`.
    #[inline]
    fn chunk_end(&self, begin: u64) -> u64 {
        begin.saturating_add(self.chunk_size)
    }
}
