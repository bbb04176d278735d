//! Destination fill sweeps and the source byte sequence.
//!
//! Destination buffers are pre-filled with a fill byte so that any write
//! outside the copied span shows up when the candidate's buffer is compared
//! with the reference's. RAM sources are seeded from [`SentinelSequence`],
//! which never produces 0x00 or 0xFF, keeping those two fills distinguishable
//! from copied data.

use core::fmt;

const SENTINEL_FILLS: [u8; 2] = [0xFF, 0x00];
const BOUNDARY_FILLS: [u8; 6] = [0xFF, 0x00, 0x01, 0x7F, 0x80, 0xFE];
const STANDARD_FILLS: [u8; 20] = [
    0xFF, 0x00, 0x01, 0x7F, 0x80, 0xFE, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88, 0x99,
    0xAA, 0xBB, 0xCC, 0xDD, 0xEE,
];

/// Which destination fill bytes each length/offset combination is run with.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FillSweep {
    /// `0xFF` and `0x00` only.
    Sentinels,
    /// Sentinels plus the values around the sign and unit boundaries.
    Boundary,
    /// Boundary values plus every repeated-nibble byte.
    #[default]
    Standard,
    /// Every byte value, starting at `0xFF`.
    Exhaustive,
}

impl FillSweep {
    pub const ALL: [Self; 4] = [
        Self::Sentinels,
        Self::Boundary,
        Self::Standard,
        Self::Exhaustive,
    ];

    /// Number of fill values in the sweep.
    #[must_use]
    pub const fn len(self) -> usize {
        match self {
            Self::Sentinels => SENTINEL_FILLS.len(),
            Self::Boundary => BOUNDARY_FILLS.len(),
            Self::Standard => STANDARD_FILLS.len(),
            Self::Exhaustive => 256,
        }
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.len() == 0
    }

    /// Fill value at `index` within the sweep.
    #[must_use]
    pub fn get(self, index: usize) -> Option<u8> {
        match self {
            Self::Sentinels => SENTINEL_FILLS.get(index).copied(),
            Self::Boundary => BOUNDARY_FILLS.get(index).copied(),
            Self::Standard => STANDARD_FILLS.get(index).copied(),
            Self::Exhaustive => (index < 256).then(|| (index as u8).wrapping_sub(1)),
        }
    }

    pub fn values(self) -> impl Iterator<Item = u8> {
        (0..self.len()).filter_map(move |index| self.get(index))
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Sentinels => "sentinels",
            Self::Boundary => "boundary",
            Self::Standard => "standard",
            Self::Exhaustive => "exhaustive",
        }
    }

    /// Parse from string (case-insensitive). Unknown names yield `None`.
    #[must_use]
    pub fn from_str_loose(s: &str) -> Option<Self> {
        let trimmed = s.trim();
        if ["sentinels", "sentinel", "minimal"]
            .iter()
            .any(|name| trimmed.eq_ignore_ascii_case(name))
        {
            Some(Self::Sentinels)
        } else if ["boundary", "edges"]
            .iter()
            .any(|name| trimmed.eq_ignore_ascii_case(name))
        {
            Some(Self::Boundary)
        } else if ["standard", "default"]
            .iter()
            .any(|name| trimmed.eq_ignore_ascii_case(name))
        {
            Some(Self::Standard)
        } else if ["exhaustive", "full", "all"]
            .iter()
            .any(|name| trimmed.eq_ignore_ascii_case(name))
        {
            Some(Self::Exhaustive)
        } else {
            None
        }
    }
}

impl fmt::Display for FillSweep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Incrementing byte counter that skips `0xFF` and `0x00`.
#[derive(Debug, Default, Clone)]
pub struct SentinelSequence {
    state: u8,
}

impl SentinelSequence {
    #[must_use]
    pub const fn new() -> Self {
        Self { state: 0 }
    }

    /// Sequence whose first byte follows `seed`.
    #[must_use]
    pub const fn with_seed(seed: u8) -> Self {
        Self { state: seed }
    }

    pub fn next_byte(&mut self) -> u8 {
        self.state = self.state.wrapping_add(1);
        if self.state == 0xFF {
            self.state = self.state.wrapping_add(1);
        }
        if self.state == 0 {
            self.state = 1;
        }
        self.state
    }

    pub fn fill(&mut self, buf: &mut [u8]) {
        for byte in buf {
            *byte = self.next_byte();
        }
    }
}

impl Iterator for SentinelSequence {
    type Item = u8;

    fn next(&mut self) -> Option<u8> {
        Some(self.next_byte())
    }
}
