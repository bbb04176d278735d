//! Binding to the SDK's `aeabi_mem_funcs` table and the boot-ROM lookup.
//!
//! Built only with the `rp2040` feature. Both symbols are provided by the
//! SDK's bit-ops/mem-ops runtime, which fills the table from the boot ROM
//! during runtime init.

use core::ffi::c_void;

use memops_core::space::{FLASH_PATTERN_LEN, flash_pattern};
use memops_core::{MemoryMap, RomFunctionCode, RomLookup, SLOT_COUNT, SlotTable};

unsafe extern "C" {
    static mut aeabi_mem_funcs: [usize; SLOT_COUNT];
    fn rom_func_lookup(code: u32) -> *mut c_void;
}

/// Copy source kept in flash for the cached and uncached XIP spaces.
pub static FLASH_SOURCE: [u8; FLASH_PATTERN_LEN] = flash_pattern();

/// Memory map for an on-target conformance run.
#[must_use]
pub fn memory_map() -> MemoryMap {
    MemoryMap::rp2040(FLASH_SOURCE.as_ptr().expose_provenance())
}

/// Handle to the live `aeabi_mem_funcs` table.
#[derive(Debug)]
pub struct AeabiMemFuncs {
    _private: (),
}

impl AeabiMemFuncs {
    /// # Safety
    ///
    /// No other context may read or write the table while the handle exists.
    #[must_use]
    pub const unsafe fn new() -> Self {
        Self { _private: () }
    }

    fn entry(index: usize) -> *mut usize {
        assert!(index < SLOT_COUNT, "slot {index} outside aeabi_mem_funcs");
        (&raw mut aeabi_mem_funcs).cast::<usize>().wrapping_add(index)
    }
}

impl SlotTable for AeabiMemFuncs {
    fn slot_count(&self) -> usize {
        SLOT_COUNT
    }

    fn slot(&self, index: usize) -> usize {
        // SAFETY: in bounds per `entry`; exclusive access per `new`.
        unsafe { Self::entry(index).read_volatile() }
    }

    fn set_slot(&mut self, index: usize, addr: usize) {
        // SAFETY: as above.
        unsafe { Self::entry(index).write_volatile(addr) }
    }
}

/// The boot ROM's function table, queried through `rom_func_lookup`.
#[derive(Debug, Default, Clone, Copy)]
pub struct BootRom;

impl RomLookup for BootRom {
    fn lookup(&self, code: RomFunctionCode) -> Option<usize> {
        // SAFETY: the lookup only reads the ROM's own table.
        let addr = unsafe { rom_func_lookup(code.raw()) };
        (!addr.is_null()).then(|| addr.expose_provenance())
    }
}
