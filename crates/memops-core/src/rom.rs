//! Boot-ROM function codes and the address-resolution seam.
//!
//! The boot ROM publishes its utility routines through a table keyed by a
//! two-character code packed as `c1 | (c2 << 8)`. Resolution itself is done by
//! a ROM primitive that this crate never calls directly; callers hand in a
//! [`RomLookup`] implementation instead.

use core::fmt;

/// Two-character boot-ROM function identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RomFunctionCode(u32);

impl RomFunctionCode {
    /// Generic byte copy (`'M','C'`).
    pub const MEMCPY: Self = Self::from_chars(b'M', b'C');
    /// Generic byte fill (`'M','S'`).
    pub const MEMSET: Self = Self::from_chars(b'M', b'S');
    /// Word-aligned copy (`'C','4'`).
    pub const MEMCPY44: Self = Self::from_chars(b'C', b'4');
    /// Word-aligned fill (`'S','4'`).
    pub const MEMSET4: Self = Self::from_chars(b'S', b'4');

    /// Pack two ASCII characters into a lookup code.
    #[must_use]
    pub const fn from_chars(c1: u8, c2: u8) -> Self {
        Self((c1 as u32) | ((c2 as u32) << 8))
    }

    /// Raw code as passed to the ROM lookup primitive.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// The two characters this code was built from.
    #[must_use]
    pub const fn chars(self) -> [u8; 2] {
        [(self.0 & 0xFF) as u8, ((self.0 >> 8) & 0xFF) as u8]
    }
}

impl fmt::Display for RomFunctionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [c1, c2] = self.chars();
        write!(f, "{}{}", c1 as char, c2 as char)
    }
}

/// Resolves a boot-ROM function code to the routine's address.
///
/// `None` means the ROM does not expose the function (or the lookup failed).
/// Implementations must not report a zero address as found.
pub trait RomLookup {
    fn lookup(&self, code: RomFunctionCode) -> Option<usize>;
}

impl<T: RomLookup + ?Sized> RomLookup for &T {
    fn lookup(&self, code: RomFunctionCode) -> Option<usize> {
        (**self).lookup(code)
    }
}
