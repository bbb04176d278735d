//! Entry points that swap the runtime's copy routine.
//!
//! `install_with` and `restore_with` work on any [`SlotTable`] and
//! [`RomLookup`], which is how host tests drive them. With the `rp2040`
//! feature the crate also exports `memcpy_wrapper_replace` and
//! `memcpy_wrapper_set_to_rom`, bound to the SDK table through one global
//! [`SlotPatcher`].

use log::debug;
use memops_core::{PatchOutcome, RomLookup, SlotPatcher, SlotTable};

use crate::copy::{CopyFn, memcpy_wordwise};

/// Address stored for a replacement request. `None` selects [`memcpy_wordwise`].
#[must_use]
pub fn routine_address(function: Option<CopyFn>) -> usize {
    let routine: CopyFn = function.unwrap_or(memcpy_wordwise);
    routine as usize
}

/// Install `function` (or the wordwise default) into the copy slot.
pub fn install_with<T, L>(
    patcher: &mut SlotPatcher,
    table: &mut T,
    rom: &L,
    function: Option<CopyFn>,
) -> PatchOutcome
where
    T: SlotTable + ?Sized,
    L: RomLookup + ?Sized,
{
    let addr = routine_address(function);
    let outcome = patcher.install(table, rom, addr);
    debug!("install {addr:#010x}: {outcome:?}");
    outcome
}

/// Put the boot-ROM copy routine back into the copy slot.
pub fn restore_with<T, L>(patcher: &mut SlotPatcher, table: &mut T, rom: &L) -> PatchOutcome
where
    T: SlotTable + ?Sized,
    L: RomLookup + ?Sized,
{
    let outcome = patcher.restore_rom_default(table, rom);
    debug!("restore ROM copy routine: {outcome:?}");
    outcome
}

#[cfg(feature = "rp2040")]
mod target {
    use memops_core::{PatchOutcome, SlotPatcher, SlotState};

    use super::{install_with, restore_with};
    use crate::copy::CopyFn;
    use crate::rom::{AeabiMemFuncs, BootRom};

    static PATCHER: spin::Mutex<SlotPatcher> = spin::Mutex::new(SlotPatcher::new());

    /// Install into the live table.
    pub fn install(function: Option<CopyFn>) -> PatchOutcome {
        let mut patcher = PATCHER.lock();
        // SAFETY: every write to the table made by this crate holds PATCHER.
        let mut table = unsafe { AeabiMemFuncs::new() };
        install_with(&mut patcher, &mut table, &BootRom, function)
    }

    /// Restore the ROM routine in the live table.
    pub fn restore_rom_default() -> PatchOutcome {
        let mut patcher = PATCHER.lock();
        // SAFETY: as in `install`.
        let mut table = unsafe { AeabiMemFuncs::new() };
        restore_with(&mut patcher, &mut table, &BootRom)
    }

    /// Forget the resolved slot. Only meaningful before the first install.
    pub fn reset_cache() {
        PATCHER.lock().reset_cache();
    }

    pub fn patcher_state() -> SlotState {
        PATCHER.lock().state()
    }

    abi_fn! {
        /// Route the runtime's memcpy through `function`. A null pointer
        /// installs `memcpy_wordwise`. Does nothing if the slot cannot be found.
        fn memcpy_wrapper_replace(function: Option<CopyFn>) {
            install(function);
        }
    }

    abi_fn! {
        /// Route the runtime's memcpy back to the boot-ROM routine.
        fn memcpy_wrapper_set_to_rom() {
            restore_rom_default();
        }
    }
}

#[cfg(feature = "rp2040")]
pub use target::{
    install, memcpy_wrapper_replace, memcpy_wrapper_set_to_rom, patcher_state, reset_cache,
    restore_rom_default,
};
