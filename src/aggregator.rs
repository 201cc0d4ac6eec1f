use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Instant;

use rayon::prelude::*;
use tracing::{info, warn};

use crate::applier;
use crate::cancel::CancelToken;
use crate::config::KernelConfig;
use crate::error::{ExecutionError, KernelError, SourceError};
use crate::generator;
use crate::harness::Harness;
use crate::mutants::{ExecutionResult, FunctionSource, MutationCandidate, SourceFile, TestCase};
use crate::parser;
use crate::report::{AggregateReport, MutantDetail, TestDetail};
use crate::scratch::{self, Scratch};

#[derive(Debug, Default)]
struct MutantOutcome {
    /// Test indices, in test order.
    detected_by: Vec<usize>,
    timed_out_by: Vec<usize>,
    execution_errors: usize,
}

/// Run the full mutation session for `function` inside `source`.
///
/// The baseline phase finishes before any mutant is built, and only tests
/// that pass it run against mutants. A failed (test, mutant) cell is
/// logged and counted as non-detection.
///
/// `tests` get `passes_baseline` and `detected_mutation_ids` filled in.
/// A `SourceError` aborts before anything runs; cancellation kills running
/// children and discards all partial results.
pub fn run_session(
    source: &SourceFile,
    function: &FunctionSource,
    tests: &mut [TestCase],
    config: &KernelConfig,
    cancel: &CancelToken,
) -> Result<AggregateReport, KernelError> {
    let started = Instant::now();
    config.validate()?;
    parser::check_syntax(source)?;
    parser::verify_function(source, function)?;
    check_test_ids(tests)?;

    let candidates = generator::discover_candidates(function, &config.catalog)?;
    let programs = tests
        .iter()
        .map(|t| t.program.load())
        .collect::<Result<Vec<_>, _>>()?;

    let session_id = config
        .session_id
        .clone()
        .unwrap_or_else(scratch::generate_session_id);
    let scratch = Scratch::create(&session_id).map_err(KernelError::Scratch)?;
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.workers)
        .thread_name(|i| format!("mutkernel-worker-{}", i))
        .build()?;
    let harness = Harness::from_config(config);
    let file_name = source.module_file_name();

    info!(
        session = %session_id,
        file = %source.path.display(),
        mutants = candidates.len(),
        tests = tests.len(),
        workers = config.workers,
        "starting mutation run"
    );

    let baseline_path = scratch.baseline_path(&file_name);
    scratch
        .write(&baseline_path, &source.content)
        .map_err(KernelError::Scratch)?;

    let test_ids: Vec<String> = tests.iter().map(|t| t.id.clone()).collect();
    let scripts: Vec<Option<PathBuf>> = test_ids
        .iter()
        .zip(&programs)
        .map(|(id, program)| match harness.stage_test(&scratch, id, program) {
            Ok(path) => Some(path),
            Err(e) => {
                warn!(test = %id, error = %e, "failed to stage test");
                None
            }
        })
        .collect();

    // Phase 1: baseline. Completes in full before any mutant runs.
    let baseline: Vec<Option<ExecutionResult>> = pool.install(|| {
        scripts
            .par_iter()
            .zip(test_ids.par_iter())
            .map(|(script, id)| {
                let script = script.as_deref()?;
                execute_cell(&harness, script, &baseline_path, cancel, id, "baseline")
            })
            .collect()
    });
    if cancel.is_cancelled() {
        return Err(KernelError::Cancelled);
    }

    for (test, result) in tests.iter_mut().zip(&baseline) {
        test.passes_baseline = result.is_some_and(|r| r.passed);
        test.detected_mutation_ids.clear();
    }
    let active: Vec<(usize, &Path)> = tests
        .iter()
        .zip(&scripts)
        .enumerate()
        .filter(|(_, (test, _))| test.passes_baseline)
        .filter_map(|(i, (_, script))| script.as_deref().map(|s| (i, s)))
        .collect();
    info!(passing = active.len(), total = tests.len(), "baseline complete");

    // Phase 2: mutants, in candidate order.
    let outcomes: Vec<MutantOutcome> = pool.install(|| {
        candidates
            .par_iter()
            .map(|candidate| {
                run_mutant(
                    candidate, source, &file_name, &active, &test_ids, &harness, &scratch,
                    cancel,
                )
            })
            .collect()
    });
    if cancel.is_cancelled() {
        return Err(KernelError::Cancelled);
    }

    let mut mutants = Vec::with_capacity(candidates.len());
    for (candidate, outcome) in candidates.iter().zip(outcomes) {
        for &ti in &outcome.detected_by {
            tests[ti].detected_mutation_ids.push(candidate.id.clone());
        }
        mutants.push(MutantDetail {
            id: candidate.id.clone(),
            line: candidate.line,
            original: candidate.original.clone(),
            mutated: candidate.mutated.clone(),
            description: candidate.description.clone(),
            kind: candidate.kind,
            detected: !outcome.detected_by.is_empty(),
            detected_by: outcome.detected_by.iter().map(|&i| test_ids[i].clone()).collect(),
            timed_out_by: outcome.timed_out_by.iter().map(|&i| test_ids[i].clone()).collect(),
            execution_errors: outcome.execution_errors,
            diff: applier::candidate_diff(candidate),
        });
    }

    let test_details = tests
        .iter()
        .zip(&baseline)
        .map(|(test, result)| TestDetail {
            id: test.id.clone(),
            name: test.name.clone(),
            origin: test.origin,
            passes_baseline: test.passes_baseline,
            baseline_timed_out: result.is_some_and(|r| r.timed_out),
            detected_mutation_ids: test.detected_mutation_ids.clone(),
            detection_count: test.detected_mutation_ids.len(),
        })
        .collect();

    let report = AggregateReport::new(mutants, test_details, started.elapsed().as_millis() as u64);
    info!(
        total = report.total_mutants,
        killed = report.killed_mutants,
        rate = report.detection_rate,
        "mutation run complete"
    );

    if let Err(e) = scratch.close() {
        warn!(error = %e, "failed to remove scratch directory");
    }
    Ok(report)
}

#[allow(clippy::too_many_arguments)]
fn run_mutant(
    candidate: &MutationCandidate,
    source: &SourceFile,
    file_name: &str,
    active: &[(usize, &Path)],
    test_ids: &[String],
    harness: &Harness,
    scratch: &Scratch,
    cancel: &CancelToken,
) -> MutantOutcome {
    let mut outcome = MutantOutcome::default();
    if cancel.is_cancelled() || active.is_empty() {
        return outcome;
    }

    let mutant = match applier::materialize(&source.content, candidate) {
        Ok(m) => m,
        Err(e) => {
            warn!(mutant = %candidate.id, error = %e, "failed to materialize mutant");
            outcome.execution_errors = active.len();
            return outcome;
        }
    };
    let path = scratch.mutant_path(&mutant.id, file_name);
    if let Err(e) = scratch.write(&path, &mutant.content) {
        warn!(mutant = %mutant.id, error = %e, "failed to write mutant");
        outcome.execution_errors = active.len();
        return outcome;
    }

    let results: Vec<(usize, Result<ExecutionResult, ExecutionError>)> = active
        .par_iter()
        .map(|&(ti, script)| (ti, harness.execute(script, &path, cancel)))
        .collect();

    for (ti, result) in results {
        match result {
            // passed the baseline, fails here: killed
            Ok(r) if !r.passed => {
                outcome.detected_by.push(ti);
                if r.timed_out {
                    outcome.timed_out_by.push(ti);
                }
            }
            Ok(_) | Err(ExecutionError::Cancelled) => {}
            Err(e) => {
                warn!(
                    mutant = %mutant.id,
                    test = %test_ids[ti],
                    error = %e,
                    "test execution failed"
                );
                outcome.execution_errors += 1;
            }
        }
    }
    outcome
}

fn execute_cell(
    harness: &Harness,
    script: &Path,
    target: &Path,
    cancel: &CancelToken,
    test_id: &str,
    phase: &str,
) -> Option<ExecutionResult> {
    match harness.execute(script, target, cancel) {
        Ok(result) => Some(result),
        Err(ExecutionError::Cancelled) => None,
        Err(e) => {
            warn!(test = %test_id, phase, error = %e, "test execution failed");
            None
        }
    }
}

/// Test ids must stay distinct once turned into scratch file names.
fn check_test_ids(tests: &[TestCase]) -> Result<(), SourceError> {
    let mut seen = HashSet::new();
    for test in tests {
        if !seen.insert(scratch::slug(&test.id)) {
            return Err(SourceError::DuplicateTest(test.id.clone()));
        }
    }
    Ok(())
}
