//! Test execution engine.
//!
//! A run covers the whole case space for the configured fill sweep. With
//! `shards > 1` the space is split round-robin and each shard runs on its own
//! thread with its own [`HostMemory`] and buffers. The first mismatch in any
//! shard stops the others; passing counts are merged per memory space.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use log::{debug, error, info};
use memops_abi::{ByteCopier, Mismatch, RunTally};
use memops_core::{CaseSpace, MemorySpaceKind, SPACE_COUNT};
use parking_lot::Mutex;

use crate::config::HarnessConfig;
use crate::copiers;
use crate::diff::render_buffer_diff;
use crate::error::HarnessError;
use crate::host_map::HostMemory;
use crate::verify::{MismatchRecord, VerificationResult, VerificationSummary};

/// Runs one candidate against one reference.
pub struct TestRunner {
    reference: &'static (dyn ByteCopier + Sync),
    candidate: &'static (dyn ByteCopier + Sync),
    /// Fill sweep and shard count.
    pub config: HarnessConfig,
}

/// Everything a finished run produced.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub summary: VerificationSummary,
    pub tally: RunTally,
    pub mismatch: Option<Mismatch>,
    pub duration_ms: u64,
}

struct Failure {
    mismatch: Mismatch,
    diff: String,
}

#[derive(Default)]
struct Merge {
    tally: RunTally,
    failure: Option<Failure>,
}

impl TestRunner {
    #[must_use]
    pub fn new(
        reference: &'static (dyn ByteCopier + Sync),
        candidate: &'static (dyn ByteCopier + Sync),
        config: HarnessConfig,
    ) -> Self {
        Self {
            reference,
            candidate,
            config,
        }
    }

    /// Resolve copiers by registry name. A missing reference selects `reference`.
    pub fn from_names(
        reference: Option<&str>,
        candidate: &str,
        config: HarnessConfig,
    ) -> Result<Self, HarnessError> {
        let reference = copiers::lookup(reference.unwrap_or("reference"))?;
        let candidate = copiers::lookup(candidate)?;
        Ok(Self::new(reference, candidate, config))
    }

    #[must_use]
    pub fn reference_name(&self) -> &str {
        self.reference.name()
    }

    #[must_use]
    pub fn candidate_name(&self) -> &str {
        self.candidate.name()
    }

    #[must_use]
    pub fn case_space(&self) -> CaseSpace {
        CaseSpace::new(SPACE_COUNT, self.config.fill)
    }

    /// Run every shard to completion or to the first mismatch.
    pub fn run(&self) -> Result<RunReport, HarnessError> {
        self.config.validate()?;
        let space = self.case_space();
        let shards = self.config.shards;
        let merged = Mutex::new(Merge::default());
        let stop = AtomicBool::new(false);
        let started = Instant::now();
        info!(
            "{} vs {}: {} cases, fill={}, shards={shards}",
            self.candidate_name(),
            self.reference_name(),
            space.len(),
            self.config.fill
        );

        std::thread::scope(|scope| {
            for index in 0..shards {
                let Some(cases) = space.shard(index, shards) else {
                    continue;
                };
                let merged = &merged;
                let stop = &stop;
                scope.spawn(move || {
                    let memory = HostMemory::new();
                    let mut engine = memory.engine(Some(self.reference), self.candidate);
                    let mut tally = RunTally::default();
                    let mut failure = None;
                    let mut current = None;
                    let mut completed = true;
                    for case in cases {
                        if stop.load(Ordering::Relaxed) {
                            debug!("shard {index}: stopped by another shard");
                            completed = false;
                            break;
                        }
                        if current != Some(case.space_index) {
                            if let Some(done) = current {
                                log_space_done(index, done, &tally);
                            }
                            current = Some(case.space_index);
                        }
                        match engine.check_case(&case) {
                            Ok(()) => tally.record(case.space_index),
                            Err(mismatch) => {
                                error!("shard {index}: {mismatch}");
                                stop.store(true, Ordering::Relaxed);
                                let buffers = engine.buffers();
                                let diff = render_buffer_diff(
                                    &buffers.expected,
                                    &buffers.under_test,
                                    mismatch.kind.focus(case.dst_offset),
                                );
                                failure = Some(Failure { mismatch, diff });
                                completed = false;
                                break;
                            }
                        }
                    }
                    if completed
                        && let Some(done) = current
                    {
                        log_space_done(index, done, &tally);
                    }

                    let mut merged = merged.lock();
                    merged.tally.merge(&tally);
                    if let Some(failure) = failure {
                        let earlier = merged.failure.as_ref().is_none_or(|current| {
                            failure.mismatch.case.ordinal < current.mismatch.case.ordinal
                        });
                        if earlier {
                            merged.failure = Some(failure);
                        }
                    }
                });
            }
        });

        let Merge { tally, failure } = merged.into_inner();
        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        info!("finished in {duration_ms} ms, {} cases passed", tally.total());
        let summary = summarize(&space, &tally, failure.as_ref());
        Ok(RunReport {
            summary,
            tally,
            mismatch: failure.map(|f| f.mismatch),
            duration_ms,
        })
    }
}

fn log_space_done(shard: u64, space_index: usize, tally: &RunTally) {
    let name = MemorySpaceKind::ALL
        .get(space_index)
        .map_or("unmapped", |kind| kind.name());
    debug!(
        "shard {shard}: {name} done, {} passed",
        tally.passed_in(space_index)
    );
}

fn summarize(space: &CaseSpace, tally: &RunTally, failure: Option<&Failure>) -> VerificationSummary {
    let results = MemorySpaceKind::ALL
        .iter()
        .enumerate()
        .map(|(index, kind)| {
            let planned = space.cases_per_space();
            let passed = tally.passed_in(index);
            let failure = failure.filter(|f| f.mismatch.space == Some(*kind));
            VerificationResult {
                case_name: kind.name().to_string(),
                passed: failure.is_none() && passed == planned,
                cases_planned: planned,
                cases_passed: passed,
                failure: failure.map(|f| MismatchRecord::from(&f.mismatch)),
                diff: failure.map(|f| f.diff.clone()),
            }
        })
        .collect();
    VerificationSummary::from_results(results)
}
