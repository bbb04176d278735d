//! Seed scenarios: four hand-picked cases, one per memory space.
//!
//! Each runs as a normal conformance case. Two add a check of their own:
//! the single-byte RAM copy must leave the other 255 bytes at the fill value,
//! and the uncached flash copy must produce exactly the buffer the cached
//! flash copy produced.

use memops_abi::ByteCopier;
use memops_core::cases::BUFFER_SIZE;
use memops_core::{CaseParams, CaseSpace, FillSweep, MemoryMap, MemorySpaceKind, SPACE_COUNT};

use crate::diff::render_buffer_diff;
use crate::host_map::HostMemory;
use crate::verify::{MismatchRecord, VerificationResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scenario {
    pub name: &'static str,
    pub space: MemorySpaceKind,
    pub len: usize,
    pub src_offset: usize,
    pub dst_offset: usize,
    pub fill: u8,
}

pub const SEED_SCENARIOS: [Scenario; 4] = [
    Scenario {
        name: "ram-single-byte",
        space: MemorySpaceKind::Ram,
        len: 1,
        src_offset: 0,
        dst_offset: 0,
        fill: 0xAA,
    },
    Scenario {
        name: "flash-max-misaligned",
        space: MemorySpaceKind::Flash,
        len: 128,
        src_offset: 7,
        dst_offset: 7,
        fill: 0x55,
    },
    Scenario {
        name: "flash-nocache-matches-flash",
        space: MemorySpaceKind::FlashNoCache,
        len: 128,
        src_offset: 7,
        dst_offset: 7,
        fill: 0x55,
    },
    Scenario {
        name: "rom-read-only-source",
        space: MemorySpaceKind::Rom,
        len: 16,
        src_offset: 3,
        dst_offset: 5,
        fill: 0xFF,
    },
];

/// Sweep containing every scenario's fill value.
const SCENARIO_SWEEP: FillSweep = FillSweep::Standard;

/// Run the seed scenarios against `candidate` with the built-in reference.
#[must_use]
pub fn run_scenarios(candidate: &dyn ByteCopier) -> Vec<VerificationResult> {
    let memory = HostMemory::new();
    let map = memory.map();
    let space = CaseSpace::new(SPACE_COUNT, SCENARIO_SWEEP);
    let mut engine = memory.engine(None, candidate);
    let mut flash_buffer: Option<[u8; BUFFER_SIZE]> = None;

    SEED_SCENARIOS
        .iter()
        .map(|scenario| {
            let mut result = VerificationResult {
                case_name: scenario.name.to_string(),
                passed: false,
                cases_planned: 1,
                cases_passed: 0,
                failure: None,
                diff: None,
            };
            let Some(case) = locate(&space, &map, scenario) else {
                result.diff = Some(format!("scenario {} is outside the case space", scenario.name));
                return result;
            };
            if let Err(mismatch) = engine.check_case(&case) {
                let buffers = engine.buffers();
                result.failure = Some(MismatchRecord::from(&mismatch));
                result.diff = Some(render_buffer_diff(
                    &buffers.expected,
                    &buffers.under_test,
                    mismatch.kind.focus(case.dst_offset),
                ));
                return result;
            }
            result.cases_passed = 1;

            let produced = engine.buffers().under_test;
            result.diff = match scenario.space {
                MemorySpaceKind::Ram => untouched_outside(&produced, scenario),
                MemorySpaceKind::Flash => {
                    flash_buffer = Some(produced);
                    None
                }
                MemorySpaceKind::FlashNoCache => flash_buffer
                    .filter(|cached| *cached != produced)
                    .map(|cached| render_buffer_diff(&cached, &produced, None)),
                MemorySpaceKind::Rom => None,
            };
            result.passed = result.diff.is_none();
            result
        })
        .collect()
}

fn locate(space: &CaseSpace, map: &MemoryMap, scenario: &Scenario) -> Option<CaseParams> {
    let ordinal = space.ordinal_of(
        map.index_of(scenario.space),
        scenario.len,
        scenario.src_offset,
        scenario.dst_offset,
        scenario.fill,
    )?;
    space.get(ordinal)
}

/// Diff against an all-fill buffer if anything outside the span changed.
fn untouched_outside(produced: &[u8; BUFFER_SIZE], scenario: &Scenario) -> Option<String> {
    let span = scenario.dst_offset..scenario.dst_offset + scenario.len;
    let clean = produced
        .iter()
        .enumerate()
        .all(|(i, &b)| span.contains(&i) || b == scenario.fill);
    (!clean).then(|| render_buffer_diff(&[scenario.fill; BUFFER_SIZE], produced, None))
}
