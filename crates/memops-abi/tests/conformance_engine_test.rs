//! End-to-end conformance runs over host-owned source regions.
//!
//! Run: cargo test -p memops-abi --test conformance_engine_test

use memops_abi::copy::{memcpy_known_good, memcpy_wordwise};
use memops_abi::{ByteCopier, Conformance, FailureKind, FnCopier, Reference, Wordwise};
use memops_core::space::flash_pattern;
use memops_core::{CaseSpace, FillSweep, MemoryMap, MemorySpaceKind};

static FLASH: [u8; 1024] = flash_pattern();
static FLASH_ALIAS: [u8; 1024] = flash_pattern();

fn rom_image() -> Box<[u8; 256]> {
    let mut rom = Box::new([0u8; 256]);
    for (i, b) in rom.iter_mut().enumerate() {
        *b = (i as u8).rotate_left(3) ^ 0x5C;
    }
    rom
}

fn host_map(rom: &[u8; 256]) -> MemoryMap {
    MemoryMap::new(
        FLASH.as_ptr().expose_provenance(),
        FLASH_ALIAS.as_ptr().expose_provenance(),
        rom.as_ptr().expose_provenance(),
    )
}

/// Copies correctly except that 7-byte copies flip the byte after the span.
struct SevenOverrun;

impl ByteCopier for SevenOverrun {
    fn name(&self) -> &str {
        "seven-overrun"
    }

    unsafe fn copy(&self, dst: *mut u8, src: *const u8, len: usize) -> *mut u8 {
        unsafe {
            Reference.copy(dst, src, len);
            if len == 7 {
                dst.add(len).write(!dst.add(len).read());
            }
        }
        dst
    }
}

/// Fails only on sources read from the ROM image.
struct RomBlind {
    rom_start: usize,
}

impl ByteCopier for RomBlind {
    fn name(&self) -> &str {
        "rom-blind"
    }

    unsafe fn copy(&self, dst: *mut u8, src: *const u8, len: usize) -> *mut u8 {
        unsafe { Reference.copy(dst, src, len) };
        let in_rom = (self.rom_start..self.rom_start + 256).contains(&src.addr());
        if in_rom && len > 0 {
            unsafe { dst.write(0) };
        }
        dst
    }
}

#[test]
fn wordwise_routine_passes_boundary_sweep_in_every_space() {
    let rom = rom_image();
    let candidate = FnCopier::new("memcpy_wordwise", memcpy_wordwise);
    let mut engine = Conformance::new(host_map(&rom), None, &candidate);

    let tally = unsafe { engine.run(FillSweep::Boundary) }.expect("wordwise must conform");

    let space = CaseSpace::new(4, FillSweep::Boundary);
    assert_eq!(tally.total(), space.len());
    assert_eq!(tally.per_space(), &[space.cases_per_space(); 4]);
}

#[test]
fn explicit_reference_matches_builtin() {
    let rom = rom_image();
    let reference = FnCopier::new("memcpy_known_good", memcpy_known_good);
    let mut engine = Conformance::new(host_map(&rom), Some(&reference), &Wordwise);
    assert_eq!(engine.reference_name(), "memcpy_known_good");
    assert_eq!(engine.candidate_name(), "wordwise");
    assert!(unsafe { engine.run(FillSweep::Sentinels) }.is_ok());
}

#[test]
fn overrun_past_span_is_reported_as_out_of_bounds() {
    let rom = rom_image();
    let mut engine = Conformance::new(host_map(&rom), None, &SevenOverrun);
    let mismatch = unsafe { engine.run(FillSweep::Sentinels) }.unwrap_err();

    assert_eq!(mismatch.case.len, 7);
    assert_eq!(mismatch.space, Some(MemorySpaceKind::Ram));
    match mismatch.kind {
        FailureKind::OutOfBounds {
            offset,
            expected,
            actual,
        } => {
            assert_eq!(offset, mismatch.case.dst_offset + 7);
            assert_eq!(expected, mismatch.case.fill);
            assert_eq!(actual, !mismatch.case.fill);
        }
        other => panic!("unexpected failure kind {other}"),
    }
}

#[test]
fn space_specific_fault_is_attributed_to_that_space() {
    let rom = rom_image();
    let candidate = RomBlind {
        rom_start: rom.as_ptr().addr(),
    };
    let mut engine = Conformance::new(host_map(&rom), None, &candidate);
    let mismatch = unsafe { engine.run(FillSweep::Sentinels) }.unwrap_err();

    assert_eq!(mismatch.space, Some(MemorySpaceKind::Rom));
    assert_eq!(mismatch.case.len, 1);
    assert!(matches!(mismatch.kind, FailureKind::CandidateContent { offset: 0 }));
    let first_rom = CaseSpace::new(4, FillSweep::Sentinels).space_range(3).start;
    assert!(mismatch.case.ordinal >= first_rom);
}
