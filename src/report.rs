use serde::{Deserialize, Serialize};

use crate::mutants::{MutationKind, TestOrigin};

/// Result of one run. This is the serialized contract toward any
/// presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateReport {
    pub total_mutants: usize,
    pub killed_mutants: usize,
    pub surviving_mutants: usize,
    /// Percentage in [0, 100].
    pub detection_rate: f64,
    pub tests_passing_baseline: usize,
    pub duration_ms: u64,
    pub mutants: Vec<MutantDetail>,
    pub tests: Vec<TestDetail>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutantDetail {
    pub id: String,
    pub line: usize,
    pub original: String,
    pub mutated: String,
    pub description: String,
    pub kind: MutationKind,
    pub detected: bool,
    pub detected_by: Vec<String>,
    /// Subset of `detected_by` that killed the mutant by timing out.
    pub timed_out_by: Vec<String>,
    /// Cells that could not be executed and counted as non-detection.
    pub execution_errors: usize,
    pub diff: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestDetail {
    pub id: String,
    pub name: String,
    pub origin: TestOrigin,
    pub passes_baseline: bool,
    pub baseline_timed_out: bool,
    pub detected_mutation_ids: Vec<String>,
    pub detection_count: usize,
}

pub fn detection_rate(killed: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        killed as f64 / total as f64 * 100.0
    }
}

impl AggregateReport {
    pub fn new(mutants: Vec<MutantDetail>, tests: Vec<TestDetail>, duration_ms: u64) -> Self {
        let total = mutants.len();
        let killed = mutants.iter().filter(|m| m.detected).count();
        AggregateReport {
            total_mutants: total,
            killed_mutants: killed,
            surviving_mutants: total - killed,
            detection_rate: detection_rate(killed, total),
            tests_passing_baseline: tests.iter().filter(|t| t.passes_baseline).count(),
            duration_ms,
            mutants,
            tests,
            error: None,
        }
    }

    /// A run that aborted: every count is zero and `error` says why.
    pub fn failure(error: impl ToString) -> Self {
        AggregateReport {
            total_mutants: 0,
            killed_mutants: 0,
            surviving_mutants: 0,
            detection_rate: 0.0,
            tests_passing_baseline: 0,
            duration_ms: 0,
            mutants: vec![],
            tests: vec![],
            error: Some(error.to_string()),
        }
    }

    pub fn survivors(&self) -> impl Iterator<Item = &MutantDetail> {
        self.mutants.iter().filter(|m| !m.detected)
    }
}
