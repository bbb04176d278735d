//! Differential conformance engine.
//!
//! For every case in a [`CaseSpace`] the engine fills two destination buffers
//! with the case's fill byte, copies the same source span into each (once with
//! the reference routine, once with the candidate) and then requires:
//!
//! 1. both routines return the destination pointer they were given;
//! 2. each destination span equals the source span;
//! 3. the two 256-byte buffers are identical end to end, which catches any
//!    write outside the requested span.
//!
//! The engine stops at the first failing case. The buffers keep the state of
//! that case so callers can render a diff.

use core::fmt;

use log::info;
use memops_core::cases::BUFFER_SIZE;
use memops_core::{
    CaseParams, CaseSpace, FillSweep, MemoryMap, MemorySpace, MemorySpaceKind, SPACE_COUNT,
    SentinelSequence, SourceBase,
};

use crate::copy::{ByteCopier, Reference};

static BUILTIN_REFERENCE: Reference = Reference;

/// Scratch buffers owned by a [`Conformance`] run.
#[derive(Debug, Clone)]
pub struct ConformanceBuffers {
    /// Source bytes for the RAM space.
    pub ram_source: [u8; BUFFER_SIZE],
    /// Destination written by the reference routine.
    pub expected: [u8; BUFFER_SIZE],
    /// Destination written by the candidate routine.
    pub under_test: [u8; BUFFER_SIZE],
}

impl ConformanceBuffers {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ram_source: [0; BUFFER_SIZE],
            expected: [0; BUFFER_SIZE],
            under_test: [0; BUFFER_SIZE],
        }
    }
}

impl Default for ConformanceBuffers {
    fn default() -> Self {
        Self::new()
    }
}

/// What went wrong in a failing case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The case names a space outside the map or does not fit the buffers.
    /// Neither routine was called.
    InvalidCase,
    /// The reference returned something other than its destination.
    ReferenceReturn { returned: usize, expected: usize },
    /// The reference span differs from the source at `offset` (span-relative).
    ReferenceContent { offset: usize },
    /// The candidate returned something other than its destination.
    CandidateReturn { returned: usize, expected: usize },
    /// The candidate span differs from the source at `offset` (span-relative).
    CandidateContent { offset: usize },
    /// The two full buffers differ at `offset` (buffer-relative).
    OutOfBounds {
        offset: usize,
        expected: u8,
        actual: u8,
    },
}

impl FailureKind {
    /// Whether the failure is attributed to the reference rather than the candidate.
    #[must_use]
    pub const fn is_reference_fault(&self) -> bool {
        matches!(
            self,
            Self::ReferenceReturn { .. } | Self::ReferenceContent { .. }
        )
    }

    /// Buffer offset to centre a diff on, when there is one.
    #[must_use]
    pub const fn focus(&self, dst_offset: usize) -> Option<usize> {
        match *self {
            Self::ReferenceContent { offset } | Self::CandidateContent { offset } => {
                Some(dst_offset + offset)
            }
            Self::OutOfBounds { offset, .. } => Some(offset),
            Self::InvalidCase | Self::ReferenceReturn { .. } | Self::CandidateReturn { .. } => None,
        }
    }

    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::InvalidCase => "invalid_case",
            Self::ReferenceReturn { .. } => "reference_return",
            Self::ReferenceContent { .. } => "reference_content",
            Self::CandidateReturn { .. } => "candidate_return",
            Self::CandidateContent { .. } => "candidate_content",
            Self::OutOfBounds { .. } => "out_of_bounds",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::InvalidCase => f.write_str("case does not fit the memory map or test buffers"),
            Self::ReferenceReturn { returned, expected } => write!(
                f,
                "reference returned {returned:#x}, expected destination {expected:#x}"
            ),
            Self::ReferenceContent { offset } => {
                write!(f, "reference copy differs from source at span offset {offset}")
            }
            Self::CandidateReturn { returned, expected } => write!(
                f,
                "candidate returned {returned:#x}, expected destination {expected:#x}"
            ),
            Self::CandidateContent { offset } => {
                write!(f, "candidate copy differs from source at span offset {offset}")
            }
            Self::OutOfBounds {
                offset,
                expected,
                actual,
            } => write!(
                f,
                "buffers differ at offset {offset}: expected {expected:#04x}, found {actual:#04x}"
            ),
        }
    }
}

/// First failing case of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mismatch {
    pub case: CaseParams,
    /// `None` when the case's space index is not in the map.
    pub space: Option<MemorySpaceKind>,
    pub kind: FailureKind,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "case #{} [", self.case.ordinal)?;
        match self.space {
            Some(kind) => write!(f, "{kind}")?,
            None => write!(f, "space {}", self.case.space_index)?,
        }
        write!(
            f,
            " len={} src+{} dst+{} fill={:#04x}]: {}",
            self.case.len,
            self.case.src_offset,
            self.case.dst_offset,
            self.case.fill,
            self.kind
        )
    }
}

/// Passing cases per memory space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunTally {
    passed: [u64; SPACE_COUNT],
}

impl RunTally {
    pub fn record(&mut self, space_index: usize) {
        if let Some(count) = self.passed.get_mut(space_index) {
            *count += 1;
        }
    }

    #[must_use]
    pub fn passed_in(&self, space_index: usize) -> u64 {
        self.passed.get(space_index).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn total(&self) -> u64 {
        self.passed.iter().sum()
    }

    #[must_use]
    pub const fn per_space(&self) -> &[u64; SPACE_COUNT] {
        &self.passed
    }

    pub fn merge(&mut self, other: &Self) {
        for (mine, theirs) in self.passed.iter_mut().zip(other.passed) {
            *mine += theirs;
        }
    }
}

/// Progress emitted when a run leaves a memory space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpaceReport {
    pub space: MemorySpace,
    /// Cases passed in this space.
    pub passed: u64,
    /// Cases passed so far across all spaces.
    pub cumulative: u64,
}

/// Differential runner for one reference/candidate pair over one memory map.
pub struct Conformance<'a> {
    map: MemoryMap,
    reference: &'a dyn ByteCopier,
    candidate: &'a dyn ByteCopier,
    buffers: ConformanceBuffers,
}

impl<'a> Conformance<'a> {
    /// `reference` defaults to the built-in byte loop.
    #[must_use]
    pub fn new(
        map: MemoryMap,
        reference: Option<&'a dyn ByteCopier>,
        candidate: &'a dyn ByteCopier,
    ) -> Self {
        Self {
            map,
            reference: reference.unwrap_or(&BUILTIN_REFERENCE),
            candidate,
            buffers: ConformanceBuffers::new(),
        }
    }

    #[must_use]
    pub const fn map(&self) -> &MemoryMap {
        &self.map
    }

    /// Buffers as left by the most recent case.
    #[must_use]
    pub const fn buffers(&self) -> &ConformanceBuffers {
        &self.buffers
    }

    #[must_use]
    pub fn reference_name(&self) -> &str {
        self.reference.name()
    }

    #[must_use]
    pub fn candidate_name(&self) -> &str {
        self.candidate.name()
    }

    /// Case space over this engine's memory map.
    #[must_use]
    pub fn case_space(&self, fill: FillSweep) -> CaseSpace {
        CaseSpace::new(self.map.spaces().len(), fill)
    }

    /// Run a single case.
    ///
    /// A case whose space is not in the map, or whose length or offsets
    /// exceed the test limits, fails with [`FailureKind::InvalidCase`]
    /// before either routine runs.
    ///
    /// # Safety
    ///
    /// Every [`SourceBase::Fixed`] address in the map must be readable for
    /// [`SOURCE_SPAN`](memops_core::cases::SOURCE_SPAN) bytes, and both copiers
    /// must be safe to call with in-bounds, non-overlapping arguments.
    pub unsafe fn check_case(&mut self, case: &CaseParams) -> Result<(), Mismatch> {
        let Some(&space) = self.map.get(case.space_index) else {
            return Err(Mismatch {
                case: *case,
                space: None,
                kind: FailureKind::InvalidCase,
            });
        };
        let fail = |kind| Mismatch {
            case: *case,
            space: Some(space.kind),
            kind,
        };
        if !case.fits_buffers() {
            return Err(fail(FailureKind::InvalidCase));
        }
        let len = case.len;

        self.buffers.expected.fill(case.fill);
        self.buffers.under_test.fill(case.fill);

        let base: *const u8 = match space.base {
            SourceBase::Owned => {
                self.buffers.ram_source.fill(!case.fill);
                let span = &mut self.buffers.ram_source[case.src_offset..case.src_offset + len];
                SentinelSequence::with_seed(case.source_seed()).fill(span);
                self.buffers.ram_source.as_ptr()
            }
            SourceBase::Fixed(addr) => core::ptr::with_exposed_provenance::<u8>(addr),
        };
        let src = unsafe { base.add(case.src_offset) };

        let expected_dst = unsafe { self.buffers.expected.as_mut_ptr().add(case.dst_offset) };
        let returned = unsafe { self.reference.copy(expected_dst, src, len) };
        if returned != expected_dst {
            return Err(fail(FailureKind::ReferenceReturn {
                returned: returned.addr(),
                expected: expected_dst.addr(),
            }));
        }
        if let Some(offset) = unsafe { first_difference(expected_dst, src, len) } {
            return Err(fail(FailureKind::ReferenceContent { offset }));
        }

        let test_dst = unsafe { self.buffers.under_test.as_mut_ptr().add(case.dst_offset) };
        let returned = unsafe { self.candidate.copy(test_dst, src, len) };
        if returned != test_dst {
            return Err(fail(FailureKind::CandidateReturn {
                returned: returned.addr(),
                expected: test_dst.addr(),
            }));
        }
        if let Some(offset) = unsafe { first_difference(test_dst, src, len) } {
            return Err(fail(FailureKind::CandidateContent { offset }));
        }

        let expected = &self.buffers.expected;
        let actual = &self.buffers.under_test;
        if let Some(offset) = expected.iter().zip(actual).position(|(a, b)| a != b) {
            return Err(fail(FailureKind::OutOfBounds {
                offset,
                expected: expected[offset],
                actual: actual[offset],
            }));
        }
        Ok(())
    }

    /// Run `cases` in order, calling `on_space_done` each time the run leaves
    /// a memory space and once after the last case.
    ///
    /// # Safety
    ///
    /// See [`Conformance::check_case`].
    pub unsafe fn run_cases<I, F>(
        &mut self,
        cases: I,
        mut on_space_done: F,
    ) -> Result<RunTally, Mismatch>
    where
        I: IntoIterator<Item = CaseParams>,
        F: FnMut(SpaceReport),
    {
        let mut tally = RunTally::default();
        let mut current: Option<usize> = None;
        for case in cases {
            if let Some(previous) = current
                && previous != case.space_index
            {
                on_space_done(self.space_report(previous, &tally));
            }
            current = Some(case.space_index);
            unsafe { self.check_case(&case)? };
            tally.record(case.space_index);
        }
        if let Some(last) = current {
            on_space_done(self.space_report(last, &tally));
        }
        Ok(tally)
    }

    /// Run the whole case space for `fill`, logging each memory space as it
    /// starts and the running pass count as it ends.
    ///
    /// # Safety
    ///
    /// See [`Conformance::check_case`].
    pub unsafe fn run(&mut self, fill: FillSweep) -> Result<RunTally, Mismatch> {
        let map = self.map;
        let mut current = None;
        let cases = self.case_space(fill).iter().inspect(move |case| {
            if current != Some(case.space_index) {
                current = Some(case.space_index);
                if let Some(space) = map.get(case.space_index) {
                    info!("Memory space: {}", space.name());
                }
            }
        });
        unsafe { self.run_cases(cases, |report| info!("{} tests Ok", report.cumulative)) }
    }

    /// Like [`Conformance::run`], but a mismatch halts the program.
    ///
    /// # Safety
    ///
    /// See [`Conformance::check_case`].
    pub unsafe fn run_or_abort(&mut self, fill: FillSweep) -> RunTally {
        match unsafe { self.run(fill) } {
            Ok(tally) => tally,
            Err(mismatch) => panic!("memcpy conformance failed: {mismatch}"),
        }
    }

    fn space_report(&self, space_index: usize, tally: &RunTally) -> SpaceReport {
        SpaceReport {
            space: self.map.spaces()[space_index],
            passed: tally.passed_in(space_index),
            cumulative: tally.total(),
        }
    }
}

/// Run every case for `candidate` against `reference` (or the built-in one).
///
/// # Safety
///
/// See [`Conformance::check_case`].
pub unsafe fn run(
    map: MemoryMap,
    reference: Option<&dyn ByteCopier>,
    candidate: &dyn ByteCopier,
    fill: FillSweep,
) -> Result<RunTally, Mismatch> {
    unsafe { Conformance::new(map, reference, candidate).run(fill) }
}

/// Span-relative index of the first byte where `a` and `b` differ.
unsafe fn first_difference(a: *const u8, b: *const u8, len: usize) -> Option<usize> {
    (0..len).find(|&i| unsafe { a.add(i).read_volatile() != b.add(i).read_volatile() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::copy::Wordwise;
    use memops_core::cases::SOURCE_SPAN;
    use memops_core::space::flash_pattern;

    /// Host stand-in with the flash pattern at every fixed base.
    fn host_map(source: &[u8]) -> MemoryMap {
        assert!(source.len() >= SOURCE_SPAN);
        let addr = source.as_ptr().expose_provenance();
        MemoryMap::new(addr, addr, addr)
    }

    /// Writes one byte past the end of the span.
    struct Overrun;

    impl ByteCopier for Overrun {
        fn name(&self) -> &str {
            "overrun"
        }

        unsafe fn copy(&self, dst: *mut u8, src: *const u8, len: usize) -> *mut u8 {
            unsafe {
                Reference.copy(dst, src, len);
                dst.add(len).write(0x5A);
            }
            dst
        }
    }

    /// Returns the source pointer instead of the destination.
    struct WrongReturn;

    impl ByteCopier for WrongReturn {
        fn name(&self) -> &str {
            "wrong-return"
        }

        unsafe fn copy(&self, dst: *mut u8, src: *const u8, len: usize) -> *mut u8 {
            unsafe { Reference.copy(dst, src, len) };
            src.cast_mut()
        }
    }

    /// Drops the last byte of copies longer than 100 bytes.
    struct ShortTail;

    impl ByteCopier for ShortTail {
        fn name(&self) -> &str {
            "short-tail"
        }

        unsafe fn copy(&self, dst: *mut u8, src: *const u8, len: usize) -> *mut u8 {
            let n = if len > 100 { len - 1 } else { len };
            unsafe { Reference.copy(dst, src, n) };
            dst
        }
    }

    #[test]
    fn wordwise_passes_every_sentinel_case() {
        let flash = flash_pattern();
        let map = host_map(&flash);
        let tally = unsafe { run(map, None, &Wordwise, FillSweep::Sentinels) }.unwrap();
        let space = CaseSpace::new(4, FillSweep::Sentinels);
        assert_eq!(tally.total(), space.len());
        for index in 0..4 {
            assert_eq!(tally.passed_in(index), space.cases_per_space());
        }
    }

    #[test]
    fn reports_cumulative_progress_per_space() {
        let flash = flash_pattern();
        let mut engine = Conformance::new(host_map(&flash), None, &Wordwise);
        let cases = engine.case_space(FillSweep::Sentinels);
        let mut reports = Vec::new();
        unsafe { engine.run_cases(cases.iter(), |r| reports.push(r)) }.unwrap();

        assert_eq!(reports.len(), 4);
        let per = cases.cases_per_space();
        for (i, report) in reports.iter().enumerate() {
            assert_eq!(report.space.kind, MemorySpaceKind::ALL[i]);
            assert_eq!(report.passed, per);
            assert_eq!(report.cumulative, per * (i as u64 + 1));
        }
    }

    #[test]
    fn overrun_is_caught_as_out_of_bounds() {
        let flash = flash_pattern();
        let mut engine = Conformance::new(host_map(&flash), None, &Overrun);
        let mismatch = unsafe { engine.run(FillSweep::Sentinels) }.unwrap_err();

        assert_eq!(mismatch.space, Some(MemorySpaceKind::Ram));
        assert_eq!(mismatch.case.len, 0);
        let FailureKind::OutOfBounds { offset, actual, .. } = mismatch.kind else {
            panic!("unexpected failure {mismatch}");
        };
        assert_eq!(offset, mismatch.case.dst_offset);
        assert_eq!(actual, 0x5A);
        assert_eq!(engine.buffers().under_test[offset], 0x5A);
    }

    #[test]
    fn wrong_return_is_caught_first() {
        let flash = flash_pattern();
        let mismatch =
            unsafe { run(host_map(&flash), None, &WrongReturn, FillSweep::Sentinels) }.unwrap_err();
        assert!(matches!(mismatch.kind, FailureKind::CandidateReturn { .. }));
        assert_eq!(mismatch.case.ordinal, 0);
        assert!(!mismatch.kind.is_reference_fault());
    }

    #[test]
    fn short_tail_is_caught_at_length_101() {
        let flash = flash_pattern();
        let mismatch =
            unsafe { run(host_map(&flash), None, &ShortTail, FillSweep::Sentinels) }.unwrap_err();
        assert_eq!(mismatch.case.len, 101);
        assert_eq!(mismatch.kind, FailureKind::CandidateContent { offset: 100 });
        assert_eq!(mismatch.kind.focus(mismatch.case.dst_offset), Some(100));
    }

    #[test]
    fn faulty_reference_is_attributed_to_reference() {
        let flash = flash_pattern();
        let mismatch = unsafe {
            run(
                host_map(&flash),
                Some(&ShortTail),
                &Wordwise,
                FillSweep::Sentinels,
            )
        }
        .unwrap_err();
        assert!(mismatch.kind.is_reference_fault());
    }

    #[test]
    fn ram_source_is_seeded_and_framed() {
        let flash = flash_pattern();
        let mut engine = Conformance::new(host_map(&flash), None, &Wordwise);
        let case = engine
            .case_space(FillSweep::Sentinels)
            .iter()
            .find(|c| c.len == 16 && c.src_offset == 3 && c.fill == 0x00)
            .unwrap();
        unsafe { engine.check_case(&case) }.unwrap();

        let ram = &engine.buffers().ram_source;
        assert_eq!(ram[0], 0xFF);
        assert_eq!(ram[3 + 16], 0xFF);
        assert!(ram[3..19].iter().all(|&b| b != 0x00 && b != 0xFF));
    }

    #[test]
    fn out_of_range_cases_are_rejected_before_copying() {
        let flash = flash_pattern();
        let mut engine = Conformance::new(host_map(&flash), None, &Wordwise);
        let valid = engine.case_space(FillSweep::Sentinels).get(0).unwrap();

        let long = CaseParams {
            space_index: 1,
            len: 1000,
            ..valid
        };
        let mismatch = unsafe { engine.check_case(&long) }.unwrap_err();
        assert_eq!(mismatch.kind, FailureKind::InvalidCase);
        assert_eq!(mismatch.space, Some(MemorySpaceKind::Flash));
        assert_eq!(mismatch.kind.focus(0), None);

        let shifted = CaseParams {
            dst_offset: BUFFER_SIZE,
            ..valid
        };
        let mismatch = unsafe { engine.check_case(&shifted) }.unwrap_err();
        assert_eq!(mismatch.kind, FailureKind::InvalidCase);
        assert!(engine.buffers().under_test.iter().all(|&b| b == 0));

        let unmapped = CaseParams {
            space_index: 9,
            ..valid
        };
        let mismatch = unsafe { engine.check_case(&unmapped) }.unwrap_err();
        assert_eq!(mismatch.space, None);
        assert_eq!(mismatch.kind.label(), "invalid_case");
        assert!(mismatch.to_string().contains("[space 9 len="));
    }

    #[test]
    #[should_panic(expected = "memcpy conformance failed")]
    fn run_or_abort_panics_on_mismatch() {
        let flash = flash_pattern();
        let mut engine = Conformance::new(host_map(&flash), None, &Overrun);
        unsafe { engine.run_or_abort(FillSweep::Sentinels) };
    }

    #[test]
    fn tally_merges_per_space() {
        let mut a = RunTally::default();
        a.record(0);
        a.record(3);
        let mut b = RunTally::default();
        b.record(3);
        b.record(SPACE_COUNT);
        a.merge(&b);
        assert_eq!(a.per_space(), &[1, 0, 0, 2]);
        assert_eq!(a.total(), 3);
    }
}
