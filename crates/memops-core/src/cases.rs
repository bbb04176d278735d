//! Lazily generated conformance case space.
//!
//! Every case is one point of space × length × source offset × destination
//! offset × fill byte, nested in that order (fill varies fastest). Cases are
//! addressed by ordinal, so a run can be resumed, split into ranges, or
//! sharded round-robin across workers without materialising the product.

use core::iter::FusedIterator;
use core::ops::Range;

use crate::fill::FillSweep;

/// Largest transfer length exercised.
pub const MAX_TEST_SIZE: usize = 128;
/// Largest source/destination misalignment exercised.
pub const MAX_TEST_OFFSET: usize = 7;
/// Size of each destination buffer and of the RAM source buffer.
pub const BUFFER_SIZE: usize = 256;
/// Bytes of a fixed source region a case may read.
pub const SOURCE_SPAN: usize = MAX_TEST_SIZE + MAX_TEST_OFFSET;

const _: () = assert!(BUFFER_SIZE >= SOURCE_SPAN);

const LENGTHS: u64 = MAX_TEST_SIZE as u64 + 1;
const OFFSETS: u64 = MAX_TEST_OFFSET as u64 + 1;

/// Parameters of a single conformance case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CaseParams {
    /// Position of this case in its [`CaseSpace`].
    pub ordinal: u64,
    /// Index into the memory map's spaces.
    pub space_index: usize,
    pub len: usize,
    pub src_offset: usize,
    pub dst_offset: usize,
    pub fill: u8,
}

impl CaseParams {
    /// Seed for the RAM source sequence. Derived from the ordinal so a case
    /// produces the same source bytes no matter how the run was split.
    #[must_use]
    pub const fn source_seed(&self) -> u8 {
        (self.ordinal & 0xFF) as u8
    }

    /// Whether the length and both offsets stay inside the test buffers.
    #[must_use]
    pub const fn fits_buffers(&self) -> bool {
        self.len <= MAX_TEST_SIZE
            && self.src_offset <= MAX_TEST_OFFSET
            && self.dst_offset <= MAX_TEST_OFFSET
    }
}

/// The full cross product for `spaces` memory spaces and a fill sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaseSpace {
    spaces: usize,
    fill: FillSweep,
}

impl CaseSpace {
    #[must_use]
    pub const fn new(spaces: usize, fill: FillSweep) -> Self {
        Self { spaces, fill }
    }

    #[must_use]
    pub const fn spaces(&self) -> usize {
        self.spaces
    }

    #[must_use]
    pub const fn fill(&self) -> FillSweep {
        self.fill
    }

    /// Cases per memory space.
    #[must_use]
    pub const fn cases_per_space(&self) -> u64 {
        LENGTHS * OFFSETS * OFFSETS * self.fill.len() as u64
    }

    /// Total number of cases.
    #[must_use]
    pub const fn len(&self) -> u64 {
        self.spaces as u64 * self.cases_per_space()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Decode the case at `ordinal`.
    #[must_use]
    pub fn get(&self, ordinal: u64) -> Option<CaseParams> {
        if ordinal >= self.len() {
            return None;
        }
        let fills = self.fill.len() as u64;
        let mut rest = ordinal;
        let fill_index = rest % fills;
        rest /= fills;
        let dst_offset = rest % OFFSETS;
        rest /= OFFSETS;
        let src_offset = rest % OFFSETS;
        rest /= OFFSETS;
        let len = rest % LENGTHS;
        rest /= LENGTHS;

        Some(CaseParams {
            ordinal,
            space_index: rest as usize,
            len: len as usize,
            src_offset: src_offset as usize,
            dst_offset: dst_offset as usize,
            fill: self.fill.get(fill_index as usize)?,
        })
    }

    /// Ordinal of the case with the given coordinates, if the space holds one.
    #[must_use]
    pub fn ordinal_of(
        &self,
        space_index: usize,
        len: usize,
        src_offset: usize,
        dst_offset: usize,
        fill: u8,
    ) -> Option<u64> {
        if space_index >= self.spaces
            || len > MAX_TEST_SIZE
            || src_offset > MAX_TEST_OFFSET
            || dst_offset > MAX_TEST_OFFSET
        {
            return None;
        }
        let fill_index = self.fill.values().position(|value| value == fill)? as u64;
        let mut ordinal = space_index as u64;
        ordinal = ordinal * LENGTHS + len as u64;
        ordinal = ordinal * OFFSETS + src_offset as u64;
        ordinal = ordinal * OFFSETS + dst_offset as u64;
        Some(ordinal * self.fill.len() as u64 + fill_index)
    }

    /// Ordinal range covering one memory space.
    #[must_use]
    pub fn space_range(&self, space_index: usize) -> Range<u64> {
        let per = self.cases_per_space();
        let start = (space_index as u64).saturating_mul(per).min(self.len());
        let end = start.saturating_add(per).min(self.len());
        start..end
    }

    pub fn iter(&self) -> Cases {
        self.range(0..self.len())
    }

    /// Resume from `ordinal`.
    pub fn iter_from(&self, ordinal: u64) -> Cases {
        self.range(ordinal..self.len())
    }

    /// Cases whose ordinals fall in `range`, clamped to the space.
    pub fn range(&self, range: Range<u64>) -> Cases {
        let end = range.end.min(self.len());
        Cases {
            space: *self,
            next: range.start.min(end),
            end,
            step: 1,
        }
    }

    /// Every `count`-th case starting at `index`. Shards `0..count` partition
    /// the space. Returns `None` for `count == 0` or `index >= count`.
    pub fn shard(&self, index: u64, count: u64) -> Option<Cases> {
        if count == 0 || index >= count {
            return None;
        }
        let end = self.len();
        Some(Cases {
            space: *self,
            next: index.min(end),
            end,
            step: count,
        })
    }
}

/// Iterator over a subset of a [`CaseSpace`].
#[derive(Debug, Clone)]
pub struct Cases {
    space: CaseSpace,
    next: u64,
    end: u64,
    step: u64,
}

impl Cases {
    /// Ordinal of the next case to be yielded.
    #[must_use]
    pub const fn position(&self) -> u64 {
        self.next
    }

    fn remaining(&self) -> u64 {
        if self.next >= self.end {
            0
        } else {
            (self.end - self.next).div_ceil(self.step)
        }
    }
}

impl Iterator for Cases {
    type Item = CaseParams;

    fn next(&mut self) -> Option<CaseParams> {
        if self.next >= self.end {
            return None;
        }
        let case = self.space.get(self.next);
        self.next = self.next.saturating_add(self.step);
        case
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = usize::try_from(self.remaining()).unwrap_or(usize::MAX);
        (remaining, Some(remaining))
    }
}

impl FusedIterator for Cases {}
