//! Named copy routines selectable from the command line.
//!
//! Besides the real routines the registry carries deliberately broken ones.
//! They exist so the harness can demonstrate that each failure class is
//! detected; they never write outside the destination buffer.

#![allow(unsafe_code)]

use memops_abi::copy::memcpy_known_good;
use memops_abi::{ByteCopier, FnCopier, Reference, Wordwise};

use crate::error::HarnessError;

/// `core::ptr::copy_nonoverlapping`, i.e. whatever the host toolchain lowers a copy to.
#[derive(Debug, Default, Clone, Copy)]
pub struct HostCopy;

impl ByteCopier for HostCopy {
    fn name(&self) -> &str {
        "host"
    }

    unsafe fn copy(&self, dst: *mut u8, src: *const u8, len: usize) -> *mut u8 {
        unsafe { core::ptr::copy_nonoverlapping(src, dst, len) };
        dst
    }
}

/// Copies correctly, then writes one byte past the span.
#[derive(Debug, Default, Clone, Copy)]
pub struct FaultyOverrun;

impl ByteCopier for FaultyOverrun {
    fn name(&self) -> &str {
        "faulty-overrun"
    }

    unsafe fn copy(&self, dst: *mut u8, src: *const u8, len: usize) -> *mut u8 {
        unsafe {
            Reference.copy(dst, src, len);
            let past = dst.add(len);
            past.write(!past.read());
        }
        dst
    }
}

/// Copies correctly but returns the source pointer.
#[derive(Debug, Default, Clone, Copy)]
pub struct FaultyReturn;

impl ByteCopier for FaultyReturn {
    fn name(&self) -> &str {
        "faulty-return"
    }

    unsafe fn copy(&self, dst: *mut u8, src: *const u8, len: usize) -> *mut u8 {
        unsafe { Reference.copy(dst, src, len) };
        src.cast_mut()
    }
}

/// Drops the final byte whenever `len % 4 == 3`.
#[derive(Debug, Default, Clone, Copy)]
pub struct FaultyTail;

impl ByteCopier for FaultyTail {
    fn name(&self) -> &str {
        "faulty-tail"
    }

    unsafe fn copy(&self, dst: *mut u8, src: *const u8, len: usize) -> *mut u8 {
        let n = if len % 4 == 3 { len - 1 } else { len };
        unsafe { Reference.copy(dst, src, n) };
        dst
    }
}

static KNOWN_GOOD_FN: FnCopier = FnCopier::new("known-good", memcpy_known_good);

/// A registry entry.
#[derive(Clone, Copy)]
pub struct CopierInfo {
    pub name: &'static str,
    pub description: &'static str,
    /// Expected to fail conformance.
    pub faulty: bool,
    pub copier: &'static (dyn ByteCopier + Sync),
}

static REGISTRY: [CopierInfo; 7] = [
    CopierInfo {
        name: "reference",
        description: "byte-by-byte volatile loop (the default reference)",
        faulty: false,
        copier: &Reference,
    },
    CopierInfo {
        name: "known-good",
        description: "memcpy_known_good called through its C ABI pointer",
        faulty: false,
        copier: &KNOWN_GOOD_FN,
    },
    CopierInfo {
        name: "wordwise",
        description: "word-at-a-time routine installed when no replacement is given",
        faulty: false,
        copier: &Wordwise,
    },
    CopierInfo {
        name: "host",
        description: "core::ptr::copy_nonoverlapping",
        faulty: false,
        copier: &HostCopy,
    },
    CopierInfo {
        name: "faulty-overrun",
        description: "writes one byte past the destination span",
        faulty: true,
        copier: &FaultyOverrun,
    },
    CopierInfo {
        name: "faulty-return",
        description: "returns the source pointer instead of the destination",
        faulty: true,
        copier: &FaultyReturn,
    },
    CopierInfo {
        name: "faulty-tail",
        description: "drops the last byte when len % 4 == 3",
        faulty: true,
        copier: &FaultyTail,
    },
];

#[must_use]
pub fn registry() -> &'static [CopierInfo] {
    &REGISTRY
}

/// Find a copier by registry name (case-insensitive).
pub fn lookup(name: &str) -> Result<&'static (dyn ByteCopier + Sync), HarnessError> {
    let name = name.trim();
    REGISTRY
        .iter()
        .find(|info| info.name.eq_ignore_ascii_case(name))
        .map(|info| info.copier)
        .ok_or_else(|| HarnessError::UnknownCopier(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_names_match_copier_names() {
        for info in registry() {
            assert_eq!(info.copier.name(), info.name);
        }
    }

    #[test]
    fn lookup_is_case_insensitive() {
        assert_eq!(lookup(" WordWise ").unwrap().name(), "wordwise");
        assert!(matches!(
            lookup("fast"),
            Err(HarnessError::UnknownCopier(name)) if name == "fast"
        ));
    }

    #[test]
    fn host_copy_copies() {
        let src = [1u8, 2, 3, 4, 5];
        let mut dst = [0u8; 5];
        let ret = unsafe { HostCopy.copy(dst.as_mut_ptr(), src.as_ptr(), 5) };
        assert_eq!(ret, dst.as_mut_ptr());
        assert_eq!(dst, src);
    }

    #[test]
    fn faulty_tail_only_misbehaves_on_its_lengths() {
        let src = [9u8; 8];
        let mut dst = [0u8; 8];
        unsafe { FaultyTail.copy(dst.as_mut_ptr(), src.as_ptr(), 4) };
        assert_eq!(dst[..4], [9; 4]);
        let mut dst = [0u8; 8];
        unsafe { FaultyTail.copy(dst.as_mut_ptr(), src.as_ptr(), 3) };
        assert_eq!(dst[..3], [9, 9, 0]);
    }
}
