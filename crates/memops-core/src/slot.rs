//! Copy-slot state machine for the runtime's memory-function table.
//!
//! The compiler runtime dispatches its copy entry point through a small table
//! of function addresses seeded from the boot ROM. Which slot holds the copy
//! routine depends on the SDK version, so the first patch finds it by scanning
//! for the ROM routine's address and every later patch reuses that index.
//!
//! ```text
//!   Unresolved --(scan finds ROM address)--> Resolved(slot)
//!   Unresolved --(no match / no ROM addr)--> Unresolved   (call is a no-op)
//!   Resolved   --(any install/restore)-----> Resolved     (direct write)
//! ```
//!
//! The scan only works against the original ROM address, so the index is
//! recorded strictly after that first match. `reset_cache` exists for tests.

use log::{debug, warn};

use crate::rom::{RomFunctionCode, RomLookup};

/// Number of entries in the runtime's memory-function table.
pub const SLOT_COUNT: usize = 4;

/// An indexable table of function addresses.
///
/// Callers of [`SlotTable::slot`] and [`SlotTable::set_slot`] keep
/// `index < slot_count()`.
pub trait SlotTable {
    fn slot_count(&self) -> usize;
    fn slot(&self, index: usize) -> usize;
    fn set_slot(&mut self, index: usize, addr: usize);
}

impl SlotTable for [usize] {
    fn slot_count(&self) -> usize {
        self.len()
    }

    fn slot(&self, index: usize) -> usize {
        self[index]
    }

    fn set_slot(&mut self, index: usize, addr: usize) {
        self[index] = addr;
    }
}

impl<const N: usize> SlotTable for [usize; N] {
    fn slot_count(&self) -> usize {
        N
    }

    fn slot(&self, index: usize) -> usize {
        self[index]
    }

    fn set_slot(&mut self, index: usize, addr: usize) {
        self[index] = addr;
    }
}

/// Whether the copy slot's position is known yet.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    #[default]
    Unresolved,
    Resolved(usize),
}

/// Result of an install or restore request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOutcome {
    /// The slot now holds the requested address.
    Installed {
        slot: usize,
        /// True when this call had to scan the table to find the slot.
        scanned: bool,
    },
    /// No slot held the ROM routine's address; nothing was written.
    SlotNotFound,
    /// The ROM lookup produced no address; nothing was written.
    RomUnavailable,
}

impl PatchOutcome {
    #[must_use]
    pub const fn is_installed(self) -> bool {
        matches!(self, Self::Installed { .. })
    }

    #[must_use]
    pub const fn slot(self) -> Option<usize> {
        match self {
            Self::Installed { slot, .. } => Some(slot),
            Self::SlotNotFound | Self::RomUnavailable => None,
        }
    }
}

/// Locates and rewrites one routine's slot in a [`SlotTable`].
#[derive(Debug, Clone)]
pub struct SlotPatcher {
    function: RomFunctionCode,
    state: SlotState,
    scans: u32,
}

impl Default for SlotPatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl SlotPatcher {
    /// Patcher for the copy routine.
    #[must_use]
    pub const fn new() -> Self {
        Self::for_function(RomFunctionCode::MEMCPY)
    }

    /// Patcher for any ROM-seeded routine in the table.
    #[must_use]
    pub const fn for_function(function: RomFunctionCode) -> Self {
        Self {
            function,
            state: SlotState::Unresolved,
            scans: 0,
        }
    }

    #[must_use]
    pub const fn function(&self) -> RomFunctionCode {
        self.function
    }

    #[must_use]
    pub const fn state(&self) -> SlotState {
        self.state
    }

    /// Number of table scans performed since construction or the last reset.
    #[must_use]
    pub const fn scan_count(&self) -> u32 {
        self.scans
    }

    /// Forget the resolved slot so the next call scans again.
    pub fn reset_cache(&mut self) {
        self.state = SlotState::Unresolved;
        self.scans = 0;
    }

    /// Point the routine's slot at `candidate`.
    ///
    /// Once resolved, the cached slot is written directly and `rom` is not
    /// consulted.
    pub fn install<T, L>(&mut self, table: &mut T, rom: &L, candidate: usize) -> PatchOutcome
    where
        T: SlotTable + ?Sized,
        L: RomLookup + ?Sized,
    {
        if let SlotState::Resolved(slot) = self.state {
            if slot >= table.slot_count() {
                warn!(
                    "cached {} slot {slot} outside table of {} entries",
                    self.function,
                    table.slot_count()
                );
                return PatchOutcome::SlotNotFound;
            }
            table.set_slot(slot, candidate);
            return PatchOutcome::Installed {
                slot,
                scanned: false,
            };
        }

        let Some(rom_addr) = self.rom_address(rom) else {
            warn!("boot ROM has no {} routine; slot left untouched", self.function);
            return PatchOutcome::RomUnavailable;
        };

        self.scans = self.scans.saturating_add(1);
        let found = (0..table.slot_count()).find(|&index| table.slot(index) == rom_addr);
        let Some(slot) = found else {
            warn!(
                "no table slot holds ROM {} at {rom_addr:#010x}; slot left untouched",
                self.function
            );
            return PatchOutcome::SlotNotFound;
        };

        table.set_slot(slot, candidate);
        self.state = SlotState::Resolved(slot);
        debug!("{} resolved to slot {slot}", self.function);
        PatchOutcome::Installed {
            slot,
            scanned: true,
        }
    }

    /// Put the boot-ROM routine back into its slot.
    ///
    /// Keeps the resolved slot index. A ROM that cannot resolve the routine
    /// leaves the table as it is.
    pub fn restore_rom_default<T, L>(&mut self, table: &mut T, rom: &L) -> PatchOutcome
    where
        T: SlotTable + ?Sized,
        L: RomLookup + ?Sized,
    {
        match self.rom_address(rom) {
            Some(rom_addr) => self.install(table, rom, rom_addr),
            None => {
                warn!("boot ROM has no {} routine; nothing to restore", self.function);
                PatchOutcome::RomUnavailable
            }
        }
    }

    fn rom_address<L: RomLookup + ?Sized>(&self, rom: &L) -> Option<usize> {
        rom.lookup(self.function).filter(|&addr| addr != 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    const ROM_MEMCPY: usize = 0x0000_2d8d;
    const ROM_MEMSET: usize = 0x0000_2db1;

    struct FakeRom {
        memcpy: Option<usize>,
        lookups: Cell<u32>,
    }

    impl FakeRom {
        fn new(memcpy: Option<usize>) -> Self {
            Self {
                memcpy,
                lookups: Cell::new(0),
            }
        }
    }

    impl RomLookup for FakeRom {
        fn lookup(&self, code: RomFunctionCode) -> Option<usize> {
            self.lookups.set(self.lookups.get() + 1);
            match code {
                RomFunctionCode::MEMCPY => self.memcpy,
                RomFunctionCode::MEMSET => Some(ROM_MEMSET),
                _ => None,
            }
        }
    }

    #[test]
    fn first_install_scans_and_resolves() {
        let rom = FakeRom::new(Some(ROM_MEMCPY));
        let mut table = [ROM_MEMSET, 0x1001, ROM_MEMCPY, 0x1003];
        let mut patcher = SlotPatcher::new();

        let outcome = patcher.install(&mut table, &rom, 0x2000_0101);

        assert_eq!(
            outcome,
            PatchOutcome::Installed {
                slot: 2,
                scanned: true
            }
        );
        assert_eq!(table, [ROM_MEMSET, 0x1001, 0x2000_0101, 0x1003]);
        assert_eq!(patcher.state(), SlotState::Resolved(2));
        assert_eq!(patcher.scan_count(), 1);
    }

    #[test]
    fn resolved_install_skips_lookup_and_scan() {
        let rom = FakeRom::new(Some(ROM_MEMCPY));
        let mut table = [ROM_MEMCPY, 0, 0, 0];
        let mut patcher = SlotPatcher::new();
        patcher.install(&mut table, &rom, 0xAAAA);
        let lookups_after_first = rom.lookups.get();

        let outcome = patcher.install(&mut table, &rom, 0xBBBB);

        assert_eq!(
            outcome,
            PatchOutcome::Installed {
                slot: 0,
                scanned: false
            }
        );
        assert_eq!(table[0], 0xBBBB);
        assert_eq!(rom.lookups.get(), lookups_after_first);
        assert_eq!(patcher.scan_count(), 1);
    }

    #[test]
    fn missing_slot_is_a_no_op_and_stays_unresolved() {
        let rom = FakeRom::new(Some(ROM_MEMCPY));
        let mut table = [1usize, 2, 3, 4];
        let mut patcher = SlotPatcher::new();

        assert_eq!(
            patcher.install(&mut table, &rom, 0xCAFE),
            PatchOutcome::SlotNotFound
        );
        assert_eq!(table, [1, 2, 3, 4]);
        assert_eq!(patcher.state(), SlotState::Unresolved);

        // A later call scans again.
        patcher.install(&mut table, &rom, 0xCAFE);
        assert_eq!(patcher.scan_count(), 2);
    }

    #[test]
    fn null_rom_address_never_matches_an_empty_slot() {
        let rom = FakeRom::new(Some(0));
        let mut table = [0usize; SLOT_COUNT];
        let mut patcher = SlotPatcher::new();

        assert_eq!(
            patcher.install(&mut table, &rom, 0xCAFE),
            PatchOutcome::RomUnavailable
        );
        assert_eq!(table, [0; SLOT_COUNT]);
        assert_eq!(patcher.scan_count(), 0);
    }

    #[test]
    fn restore_writes_rom_address_back() {
        let rom = FakeRom::new(Some(ROM_MEMCPY));
        let mut table = [0x10, ROM_MEMCPY, 0x30, 0x40];
        let mut patcher = SlotPatcher::new();
        patcher.install(&mut table, &rom, 0xF00D);

        let outcome = patcher.restore_rom_default(&mut table, &rom);

        assert!(outcome.is_installed());
        assert_eq!(outcome.slot(), Some(1));
        assert_eq!(table, [0x10, ROM_MEMCPY, 0x30, 0x40]);
        assert_eq!(patcher.state(), SlotState::Resolved(1));
    }

    #[test]
    fn restore_without_rom_routine_leaves_table() {
        let rom = FakeRom::new(None);
        let mut table = [0x10usize, 0x20, 0x30, 0x40];
        let mut patcher = SlotPatcher::new();

        assert_eq!(
            patcher.restore_rom_default(&mut table, &rom),
            PatchOutcome::RomUnavailable
        );
        assert_eq!(table, [0x10, 0x20, 0x30, 0x40]);
    }

    #[test]
    fn reset_cache_forces_rescan() {
        let rom = FakeRom::new(Some(ROM_MEMCPY));
        let mut table = [ROM_MEMCPY, 0, 0, 0];
        let mut patcher = SlotPatcher::new();
        patcher.install(&mut table, &rom, 0x1);

        patcher.reset_cache();
        assert_eq!(patcher.state(), SlotState::Unresolved);
        assert_eq!(patcher.scan_count(), 0);

        // Slot 0 no longer holds the ROM address, so a fresh scan misses.
        assert_eq!(
            patcher.install(&mut table, &rom, 0x2),
            PatchOutcome::SlotNotFound
        );
    }

    #[test]
    fn patcher_for_other_routine_uses_its_own_code() {
        let rom = FakeRom::new(Some(ROM_MEMCPY));
        let mut table = [ROM_MEMCPY, ROM_MEMSET, 0, 0];
        let mut patcher = SlotPatcher::for_function(RomFunctionCode::MEMSET);

        let outcome = patcher.install(&mut table, &rom, 0x77);

        assert_eq!(outcome.slot(), Some(1));
        assert_eq!(table, [ROM_MEMCPY, 0x77, 0, 0]);
    }

    #[test]
    fn slice_tables_work_through_unsized_path() {
        let rom = FakeRom::new(Some(ROM_MEMCPY));
        let mut backing = vec![0usize, 0, 0, ROM_MEMCPY];
        let table: &mut [usize] = &mut backing;
        let mut patcher = SlotPatcher::new();

        assert_eq!(patcher.install(table, &rom, 0x99).slot(), Some(3));
        assert_eq!(backing[3], 0x99);
    }
}
