//! Source memory spaces exercised by the conformance harness.
//!
//! Each space pairs a kind with the address the harness copies from. RAM is
//! special: its bytes are owned and rewritten by the harness for every case,
//! so its descriptor carries [`SourceBase::Owned`] rather than an address.

use core::fmt;

/// Sampled boot-ROM address. Any readable ROM word works; 0x4 skips the
/// initial stack pointer entry of the vector table.
pub const ROM_SAMPLE_BASE: usize = 0x0000_0004;
/// Start of the cached XIP flash window.
pub const XIP_MAIN_BASE: usize = 0x1000_0000;
/// Start of the XIP window that neither hits nor allocates in the cache.
pub const XIP_NOCACHE_NOALLOC_BASE: usize = 0x1300_0000;

/// Length of the constant flash source pattern.
pub const FLASH_PATTERN_LEN: usize = 1024;
/// Number of source spaces in a [`MemoryMap`].
pub const SPACE_COUNT: usize = 4;

/// Translate a cached XIP address into its cache-bypassing alias.
#[must_use]
pub const fn xip_nocache_alias(addr: usize) -> usize {
    addr.wrapping_add(XIP_NOCACHE_NOALLOC_BASE - XIP_MAIN_BASE)
}

/// Increasing byte pattern placed in flash as a copy source.
#[must_use]
pub const fn flash_pattern() -> [u8; FLASH_PATTERN_LEN] {
    let mut pattern = [0u8; FLASH_PATTERN_LEN];
    let mut i = 0;
    while i < FLASH_PATTERN_LEN {
        pattern[i] = (i & 0xFF) as u8;
        i += 1;
    }
    pattern
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemorySpaceKind {
    Ram,
    Flash,
    FlashNoCache,
    Rom,
}

impl MemorySpaceKind {
    /// All kinds in test order.
    pub const ALL: [Self; SPACE_COUNT] = [Self::Ram, Self::Flash, Self::FlashNoCache, Self::Rom];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Ram => "RAM",
            Self::Flash => "FLASH",
            Self::FlashNoCache => "FLASH - NO CACHE",
            Self::Rom => "ROM",
        }
    }

    /// Short machine-friendly identifier.
    #[must_use]
    pub const fn slug(self) -> &'static str {
        match self {
            Self::Ram => "ram",
            Self::Flash => "flash",
            Self::FlashNoCache => "flash-nocache",
            Self::Rom => "rom",
        }
    }

    /// Parse from a name or slug (case-insensitive).
    #[must_use]
    pub fn from_str_loose(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| {
            s.eq_ignore_ascii_case(kind.slug()) || s.eq_ignore_ascii_case(kind.name())
        })
    }
}

impl fmt::Display for MemorySpaceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where a space's source bytes come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceBase {
    /// Harness-owned scratch buffer, refilled per case.
    Owned,
    /// Fixed, read-only address.
    Fixed(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemorySpace {
    pub kind: MemorySpaceKind,
    pub base: SourceBase,
}

impl MemorySpace {
    #[must_use]
    pub const fn owned(kind: MemorySpaceKind) -> Self {
        Self {
            kind,
            base: SourceBase::Owned,
        }
    }

    #[must_use]
    pub const fn fixed(kind: MemorySpaceKind, addr: usize) -> Self {
        Self {
            kind,
            base: SourceBase::Fixed(addr),
        }
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.kind.name()
    }
}

/// The four source spaces in test order: RAM, flash, flash without cache, ROM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryMap {
    spaces: [MemorySpace; SPACE_COUNT],
}

impl MemoryMap {
    /// Build a map from the three fixed source addresses.
    #[must_use]
    pub const fn new(flash: usize, flash_nocache: usize, rom: usize) -> Self {
        Self {
            spaces: [
                MemorySpace::owned(MemorySpaceKind::Ram),
                MemorySpace::fixed(MemorySpaceKind::Flash, flash),
                MemorySpace::fixed(MemorySpaceKind::FlashNoCache, flash_nocache),
                MemorySpace::fixed(MemorySpaceKind::Rom, rom),
            ],
        }
    }

    /// RP2040 layout for a flash-resident source at `flash` (a cached XIP address).
    #[must_use]
    pub const fn rp2040(flash: usize) -> Self {
        Self::new(flash, xip_nocache_alias(flash), ROM_SAMPLE_BASE)
    }

    #[must_use]
    pub fn spaces(&self) -> &[MemorySpace] {
        &self.spaces
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&MemorySpace> {
        self.spaces.get(index)
    }

    #[must_use]
    pub fn index_of(&self, kind: MemorySpaceKind) -> usize {
        match kind {
            MemorySpaceKind::Ram => 0,
            MemorySpaceKind::Flash => 1,
            MemorySpaceKind::FlashNoCache => 2,
            MemorySpaceKind::Rom => 3,
        }
    }

    #[must_use]
    pub fn by_kind(&self, kind: MemorySpaceKind) -> &MemorySpace {
        &self.spaces[self.index_of(kind)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nocache_alias_offsets_into_bypass_window() {
        assert_eq!(xip_nocache_alias(0x1000_1234), 0x1300_1234);
    }

    #[test]
    fn rp2040_map_orders_spaces() {
        let map = MemoryMap::rp2040(0x1000_4000);
        let kinds: Vec<_> = map.spaces().iter().map(|s| s.kind).collect();
        assert_eq!(kinds, MemorySpaceKind::ALL.to_vec());
        assert_eq!(map.by_kind(MemorySpaceKind::Ram).base, SourceBase::Owned);
        assert_eq!(
            map.by_kind(MemorySpaceKind::FlashNoCache).base,
            SourceBase::Fixed(0x1300_4000)
        );
        assert_eq!(
            map.by_kind(MemorySpaceKind::Rom).base,
            SourceBase::Fixed(ROM_SAMPLE_BASE)
        );
    }

    #[test]
    fn index_of_agrees_with_layout() {
        let map = MemoryMap::new(1, 2, 3);
        for kind in MemorySpaceKind::ALL {
            assert_eq!(map.spaces()[map.index_of(kind)].kind, kind);
        }
    }

    #[test]
    fn flash_pattern_wraps_every_256_bytes() {
        let pattern = flash_pattern();
        assert_eq!(pattern[0], 0);
        assert_eq!(pattern[255], 255);
        assert_eq!(pattern[256], 0);
        assert_eq!(pattern[FLASH_PATTERN_LEN - 1], 255);
    }

    #[test]
    fn kind_parsing_accepts_names_and_slugs() {
        assert_eq!(
            MemorySpaceKind::from_str_loose("flash-nocache"),
            Some(MemorySpaceKind::FlashNoCache)
        );
        assert_eq!(
            MemorySpaceKind::from_str_loose("flash - no cache"),
            Some(MemorySpaceKind::FlashNoCache)
        );
        assert_eq!(MemorySpaceKind::from_str_loose("RAM"), Some(MemorySpaceKind::Ram));
        assert_eq!(MemorySpaceKind::from_str_loose("sram"), None);
    }
}
