// Exported entry points take raw pointers from C firmware; their contracts are
// the ones of the C functions they stand in for.
#![allow(clippy::missing_safety_doc)]
//! # memops-abi
//!
//! Raw-pointer layer on top of `memops-core`.
//!
//! This crate provides the copy routines themselves, the differential
//! conformance engine that checks a candidate routine against a byte-wise
//! reference, and (with the `rp2040` feature) the binding to the SDK's
//! `aeabi_mem_funcs` table and the boot ROM's function lookup.
//!
//! # Architecture
//!
//! ```text
//! firmware -> memcpy_wrapper_replace / _set_to_rom (this crate)
//!          -> SlotPatcher (memops-core) -> aeabi_mem_funcs[slot]
//!
//! conformance -> CaseSpace (memops-core) -> reference copy + candidate copy
//!             -> compare both destination buffers in full
//! ```
//!
//! Host builds leave out the SDK binding; the engine and the copy routines
//! run unchanged against host-owned stand-ins for flash and ROM.

#![cfg_attr(not(test), no_std)]

#[macro_use]
mod macros;

pub mod conformance;
pub mod copy;
pub mod patch_abi;
#[cfg(feature = "rp2040")]
pub mod rom;

pub use conformance::{
    Conformance, ConformanceBuffers, FailureKind, Mismatch, RunTally, SpaceReport,
};
pub use copy::{ByteCopier, CopyFn, FnCopier, Reference, Wordwise};
