//! Host stand-ins for the target's read-only source regions.
//!
//! Flash and its uncached alias are two heap copies of the same increasing
//! pattern, and the boot ROM is a fixed pseudo-random image. [`HostEngine`]
//! ties a conformance engine to a [`HostMemory`] so every fixed address the
//! engine reads stays valid for the engine's lifetime, which is what lets it
//! expose the engine without `unsafe`.

#![allow(unsafe_code)]

use memops_abi::{ByteCopier, Conformance, ConformanceBuffers, Mismatch, RunTally, SpaceReport};
use memops_core::cases::SOURCE_SPAN;
use memops_core::space::{FLASH_PATTERN_LEN, flash_pattern};
use memops_core::{CaseParams, CaseSpace, FillSweep, MemoryMap};

/// Bytes in the simulated boot-ROM image.
pub const ROM_IMAGE_LEN: usize = 512;

const _: () = assert!(ROM_IMAGE_LEN >= SOURCE_SPAN && FLASH_PATTERN_LEN >= SOURCE_SPAN);

fn rom_image() -> Box<[u8; ROM_IMAGE_LEN]> {
    let mut rom = Box::new([0u8; ROM_IMAGE_LEN]);
    let mut state: u32 = 0x2d8d_4d43;
    for byte in rom.iter_mut() {
        state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        *byte = (state >> 24) as u8;
    }
    rom
}

/// Heap-backed source regions for one engine.
#[derive(Debug)]
pub struct HostMemory {
    flash: Box<[u8; FLASH_PATTERN_LEN]>,
    flash_alias: Box<[u8; FLASH_PATTERN_LEN]>,
    rom: Box<[u8; ROM_IMAGE_LEN]>,
}

impl Default for HostMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl HostMemory {
    #[must_use]
    pub fn new() -> Self {
        Self {
            flash: Box::new(flash_pattern()),
            flash_alias: Box::new(flash_pattern()),
            rom: rom_image(),
        }
    }

    #[must_use]
    pub fn flash(&self) -> &[u8] {
        &self.flash[..]
    }

    #[must_use]
    pub fn flash_alias(&self) -> &[u8] {
        &self.flash_alias[..]
    }

    #[must_use]
    pub fn rom(&self) -> &[u8] {
        &self.rom[..]
    }

    /// Memory map pointing at these regions.
    #[must_use]
    pub fn map(&self) -> MemoryMap {
        MemoryMap::new(
            self.flash.as_ptr().expose_provenance(),
            self.flash_alias.as_ptr().expose_provenance(),
            self.rom.as_ptr().expose_provenance(),
        )
    }

    /// Engine bound to this memory.
    #[must_use]
    pub fn engine<'a>(
        &'a self,
        reference: Option<&'a dyn ByteCopier>,
        candidate: &'a dyn ByteCopier,
    ) -> HostEngine<'a> {
        HostEngine {
            engine: Conformance::new(self.map(), reference, candidate),
            _memory: self,
        }
    }
}

/// A [`Conformance`] engine whose map points into a borrowed [`HostMemory`].
pub struct HostEngine<'a> {
    engine: Conformance<'a>,
    _memory: &'a HostMemory,
}

impl HostEngine<'_> {
    #[must_use]
    pub fn case_space(&self, fill: FillSweep) -> CaseSpace {
        self.engine.case_space(fill)
    }

    #[must_use]
    pub fn buffers(&self) -> &ConformanceBuffers {
        self.engine.buffers()
    }

    #[must_use]
    pub fn reference_name(&self) -> &str {
        self.engine.reference_name()
    }

    #[must_use]
    pub fn candidate_name(&self) -> &str {
        self.engine.candidate_name()
    }

    pub fn check_case(&mut self, case: &CaseParams) -> Result<(), Mismatch> {
        // SAFETY: every fixed base points into `_memory`, which outlives the
        // engine and holds at least SOURCE_SPAN bytes per region. The engine
        // rejects cases whose length or offsets would leave its buffers.
        unsafe { self.engine.check_case(case) }
    }

    pub fn run_cases<I, F>(&mut self, cases: I, on_space_done: F) -> Result<RunTally, Mismatch>
    where
        I: IntoIterator<Item = CaseParams>,
        F: FnMut(SpaceReport),
    {
        // SAFETY: as in `check_case`.
        unsafe { self.engine.run_cases(cases, on_space_done) }
    }
}
