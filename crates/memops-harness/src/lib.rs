//! Host conformance harness for replaceable memcpy routines.
//!
//! This crate provides:
//! - Host memory: heap stand-ins for flash, its uncached alias and the boot ROM
//! - Copier registry: the real routines plus deliberately broken ones
//! - Runner: sharded, parallel execution of the full case space
//! - Seed scenarios: four fixed cases with extra buffer checks
//! - Report generation: markdown + JSON conformance reports
//! - Structured logging: JSONL run logs with an artifact index

#![deny(unsafe_code)]

pub mod config;
pub mod copiers;
pub mod diff;
pub mod error;
pub mod host_map;
pub mod report;
pub mod runner;
pub mod scenarios;
pub mod structured_log;
pub mod verify;

pub use config::HarnessConfig;
pub use error::HarnessError;
pub use host_map::HostMemory;
pub use report::ConformanceReport;
pub use runner::{RunReport, TestRunner};
pub use verify::{VerificationResult, VerificationSummary};
