//! # memops-core
//!
//! Safe, `no_std` model of the pieces that let firmware swap the compiler
//! runtime's copy routine and then prove the replacement correct:
//!
//! - [`slot`]: the copy-slot state machine over the runtime's memory-function table.
//! - [`rom`]: boot-ROM function codes and the lookup seam.
//! - [`space`]: source memory spaces (RAM, flash, flash without cache, ROM).
//! - [`cases`]: the lazily generated length/offset/fill case space.
//! - [`fill`]: destination fill sweeps and the sentinel-free source sequence.
//!
//! Nothing here dereferences an address. Raw-pointer work lives in `memops-abi`.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod cases;
pub mod fill;
pub mod rom;
pub mod slot;
pub mod space;

pub use cases::{CaseParams, CaseSpace, Cases};
pub use fill::{FillSweep, SentinelSequence};
pub use rom::{RomFunctionCode, RomLookup};
pub use slot::{PatchOutcome, SLOT_COUNT, SlotPatcher, SlotState, SlotTable};
pub use space::{MemoryMap, MemorySpace, MemorySpaceKind, SPACE_COUNT, SourceBase};
