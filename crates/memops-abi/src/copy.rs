//! Copy routines and the [`ByteCopier`] seam the conformance engine drives.
//!
//! All loops here use volatile stores. Without them the optimizer is free to
//! recognise a copy loop and lower it to a `memcpy` call, which on target
//! dispatches through the very slot these routines are installed into.

use core::ffi::c_void;

/// Signature shared by every routine that can occupy the copy slot.
pub type CopyFn = unsafe extern "C" fn(*mut c_void, *const c_void, usize) -> *mut c_void;

const WORD: usize = core::mem::size_of::<u32>();
const WORD_MASK: usize = WORD - 1;

/// Byte loop used as the comparison reference.
#[inline(always)]
unsafe fn copy_bytes(dst: *mut u8, src: *const u8, len: usize) {
    let mut i = 0;
    while i < len {
        unsafe { dst.add(i).write_volatile(src.add(i).read_volatile()) };
        i += 1;
    }
}

unsafe fn copy_words_aligned(dst: *mut u32, src: *const u32, words: usize) {
    let mut i = 0;
    while i + 4 <= words {
        unsafe {
            dst.add(i).write_volatile(src.add(i).read());
            dst.add(i + 1).write_volatile(src.add(i + 1).read());
            dst.add(i + 2).write_volatile(src.add(i + 2).read());
            dst.add(i + 3).write_volatile(src.add(i + 3).read());
        }
        i += 4;
    }
    while i < words {
        unsafe { dst.add(i).write_volatile(src.add(i).read()) };
        i += 1;
    }
}

unsafe fn copy_words_unaligned(dst: *mut u32, src: *const u8, words: usize) {
    let mut i = 0;
    while i < words {
        unsafe {
            let word = src.add(i * WORD).cast::<u32>().read_unaligned();
            dst.add(i).write_volatile(word);
        }
        i += 1;
    }
}

abi_fn! {
    /// Straight byte-by-byte copy. Returns `dst`.
    fn memcpy_known_good(dst: *mut c_void, src: *const c_void, n: usize) -> *mut c_void {
        copy_bytes(dst.cast::<u8>(), src.cast::<u8>(), n);
        dst
    }
}

abi_fn! {
    /// Word-at-a-time copy with byte-wise head and tail.
    ///
    /// Short copies stay byte-wise. Longer ones first align the destination to
    /// four bytes, then move whole words: aligned loads when the source shares
    /// that alignment, unaligned loads otherwise. Returns `dst`.
    fn memcpy_wordwise(dst: *mut c_void, src: *const c_void, n: usize) -> *mut c_void {
        let mut d = dst.cast::<u8>();
        let mut s = src.cast::<u8>();
        let mut remaining = n;

        if remaining >= 2 * WORD {
            let head = d.addr().wrapping_neg() & WORD_MASK;
            copy_bytes(d, s, head);
            d = d.add(head);
            s = s.add(head);
            remaining -= head;

            let words = remaining / WORD;
            if s.addr() & WORD_MASK == 0 {
                copy_words_aligned(d.cast::<u32>(), s.cast::<u32>(), words);
            } else {
                copy_words_unaligned(d.cast::<u32>(), s, words);
            }
            d = d.add(words * WORD);
            s = s.add(words * WORD);
            remaining -= words * WORD;
        }

        copy_bytes(d, s, remaining);
        dst
    }
}

/// Something that copies `len` bytes and reports where it wrote.
pub trait ByteCopier {
    fn name(&self) -> &str;

    /// Copy `len` bytes from `src` to `dst` and return the destination pointer.
    ///
    /// # Safety
    ///
    /// `src` must be readable and `dst` writable for `len` bytes, and the two
    /// regions must not overlap.
    unsafe fn copy(&self, dst: *mut u8, src: *const u8, len: usize) -> *mut u8;
}

impl<T: ByteCopier + ?Sized> ByteCopier for &T {
    fn name(&self) -> &str {
        (**self).name()
    }

    unsafe fn copy(&self, dst: *mut u8, src: *const u8, len: usize) -> *mut u8 {
        unsafe { (**self).copy(dst, src, len) }
    }
}

/// The byte-wise reference copy.
#[derive(Debug, Default, Clone, Copy)]
pub struct Reference;

impl ByteCopier for Reference {
    fn name(&self) -> &str {
        "reference"
    }

    unsafe fn copy(&self, dst: *mut u8, src: *const u8, len: usize) -> *mut u8 {
        unsafe { memcpy_known_good(dst.cast(), src.cast(), len).cast() }
    }
}

/// The word-at-a-time routine installed when no replacement is named.
#[derive(Debug, Default, Clone, Copy)]
pub struct Wordwise;

impl ByteCopier for Wordwise {
    fn name(&self) -> &str {
        "wordwise"
    }

    unsafe fn copy(&self, dst: *mut u8, src: *const u8, len: usize) -> *mut u8 {
        unsafe { memcpy_wordwise(dst.cast(), src.cast(), len).cast() }
    }
}

/// Any C-ABI copy routine, named for reports.
#[derive(Debug, Clone, Copy)]
pub struct FnCopier {
    name: &'static str,
    routine: CopyFn,
}

impl FnCopier {
    #[must_use]
    pub const fn new(name: &'static str, routine: CopyFn) -> Self {
        Self { name, routine }
    }

    #[must_use]
    pub const fn routine(&self) -> CopyFn {
        self.routine
    }
}

impl ByteCopier for FnCopier {
    fn name(&self) -> &str {
        self.name
    }

    unsafe fn copy(&self, dst: *mut u8, src: *const u8, len: usize) -> *mut u8 {
        unsafe { (self.routine)(dst.cast(), src.cast(), len).cast() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern<const N: usize>() -> [u8; N] {
        let mut buf = [0u8; N];
        for (i, b) in buf.iter_mut().enumerate() {
            *b = (i as u8).wrapping_mul(7).wrapping_add(3);
        }
        buf
    }

    fn check(copier: &dyn ByteCopier) {
        let src = pattern::<160>();
        for len in 0..=40 {
            for src_off in 0..8 {
                for dst_off in 0..8 {
                    let mut dst = [0xA5u8; 64];
                    let d = unsafe { dst.as_mut_ptr().add(dst_off) };
                    let ret = unsafe { copier.copy(d, src.as_ptr().add(src_off), len) };
                    assert_eq!(ret, d, "{} returned wrong pointer", copier.name());
                    assert_eq!(&dst[dst_off..dst_off + len], &src[src_off..src_off + len]);
                    assert!(dst[..dst_off].iter().all(|&b| b == 0xA5));
                    assert!(dst[dst_off + len..].iter().all(|&b| b == 0xA5));
                }
            }
        }
    }

    #[test]
    fn reference_copies_exactly() {
        check(&Reference);
    }

    #[test]
    fn wordwise_copies_exactly() {
        check(&Wordwise);
    }

    #[test]
    fn fn_copier_dispatches_to_routine() {
        let copier = FnCopier::new("wordwise-fn", memcpy_wordwise);
        assert_eq!(copier.name(), "wordwise-fn");
        check(&copier);
    }

    #[test]
    fn zero_length_returns_dst_and_writes_nothing() {
        let src = [1u8; 4];
        let mut dst = [9u8; 4];
        let ret = unsafe { memcpy_wordwise(dst.as_mut_ptr().cast(), src.as_ptr().cast(), 0) };
        assert_eq!(ret, dst.as_mut_ptr().cast());
        assert_eq!(dst, [9; 4]);
    }

    #[test]
    fn wordwise_handles_large_misaligned_copy() {
        let src = pattern::<1100>();
        let mut dst = [0u8; 1100];
        unsafe { memcpy_wordwise(dst.as_mut_ptr().add(1).cast(), src.as_ptr().add(3).cast(), 1024) };
        assert_eq!(&dst[1..1025], &src[3..1027]);
        assert_eq!(dst[0], 0);
        assert_eq!(dst[1025], 0);
    }
}
