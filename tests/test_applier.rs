use mutkernel::applier;
use mutkernel::error::MutationError;
use mutkernel::generator;
use mutkernel::mutants::{FunctionSource, MutationCandidate, MutationKind, RuleCategory};
use mutkernel::operators;

fn make_candidate(line: usize, original: &str, mutated: &str) -> MutationCandidate {
    MutationCandidate {
        id: "m1".to_string(),
        line,
        original: original.to_string(),
        mutated: mutated.to_string(),
        description: "test".to_string(),
        kind: MutationKind::Operator(RuleCategory::Arithmetic),
    }
}

fn differing_lines(a: &str, b: &str) -> usize {
    let a: Vec<_> = a.split_inclusive('\n').collect();
    let b: Vec<_> = b.split_inclusive('\n').collect();
    assert_eq!(a.len(), b.len());
    a.iter().zip(&b).filter(|(x, y)| x != y).count()
}

// --- apply_candidate ---

#[test]
fn apply_replaces_only_target_line() {
    let content = "def add(a, b):\n    return a + b\n\nprint(add(1, 2))\n";
    let c = make_candidate(2, "    return a + b", "    return a - b");
    let result = applier::apply_candidate(content, &c).unwrap();
    assert_eq!(result, "def add(a, b):\n    return a - b\n\nprint(add(1, 2))\n");
}

#[test]
fn apply_preserves_crlf_line_endings() {
    let content = "def f(x):\r\n    return x > 0\r\n";
    let c = make_candidate(2, "    return x > 0", "    return x <= 0");
    let result = applier::apply_candidate(content, &c).unwrap();
    assert_eq!(result, "def f(x):\r\n    return x <= 0\r\n");
}

#[test]
fn apply_preserves_missing_final_newline() {
    let content = "x = 1\ny = x + 1";
    let c = make_candidate(2, "y = x + 1", "y = x - 1");
    let result = applier::apply_candidate(content, &c).unwrap();
    assert_eq!(result, "x = 1\ny = x - 1");
}

#[test]
fn apply_first_line() {
    let content = "def add(a,b): return a+b\n";
    let c = make_candidate(1, "def add(a,b): return a+b", "def add(a,b): return a-b");
    let result = applier::apply_candidate(content, &c).unwrap();
    assert_eq!(result, "def add(a,b): return a-b\n");
}

#[test]
fn apply_out_of_range_is_stale() {
    let content = "x = 1\n";
    let c = make_candidate(5, "y", "z");
    let err = applier::apply_candidate(content, &c).unwrap_err();
    assert_eq!(
        err,
        MutationError::LineOutOfRange {
            id: "m1".to_string(),
            line: 5,
            line_count: 1,
        }
    );
}

#[test]
fn apply_line_zero_is_out_of_range() {
    let c = make_candidate(0, "x = 1", "x = 2");
    assert!(matches!(
        applier::apply_candidate("x = 1\n", &c),
        Err(MutationError::LineOutOfRange { .. })
    ));
}

#[test]
fn apply_changed_line_is_stale() {
    let content = "x = 1\ny = 2\n";
    let c = make_candidate(2, "y = x + 1", "y = x - 1");
    assert!(matches!(
        applier::apply_candidate(content, &c),
        Err(MutationError::LineMismatch { line: 2, .. })
    ));
}

#[test]
fn materialize_keeps_candidate_id() {
    let c = make_candidate(1, "x = a + b", "x = a - b");
    let mutant = applier::materialize("x = a + b\n", &c).unwrap();
    assert_eq!(mutant.id, "m1");
    assert_eq!(mutant.content, "x = a - b\n");
    assert_eq!(mutant.candidate.line, 1);
}

#[test]
fn every_generated_mutant_differs_in_exactly_one_line() {
    let content = r#"import math


def calculate_discount(price, customer_type, years):
    """Calculate discount and return the final price."""
    base_discount = 0.0
    if customer_type == "premium":
        base_discount = 0.15
    elif customer_type == "gold":
        base_discount = 0.10
    loyalty_bonus = min(years * 0.01, 0.1)
    total = base_discount + loyalty_bonus
    if price > 1000 and not math.isnan(price):
        total += 0.05
    return round(price * (1 - total), 2)
"#;
    let lines: Vec<&str> = content.lines().collect();
    let function = FunctionSource::new(lines[3..].join("\n"), 4);
    let candidates =
        generator::discover_candidates(&function, &operators::default_catalog()).unwrap();
    assert!(candidates.len() > 5);
    for c in &candidates {
        let mutated = applier::apply_candidate(content, c).unwrap();
        assert_eq!(differing_lines(content, &mutated), 1, "mutant {} ({})", c.id, c.description);
    }
}

// --- diffs ---

#[test]
fn generate_diff_shows_changes() {
    let original = "line1\nline2\nline3\n";
    let mutated = "line1\nchanged\nline3\n";
    let diff = applier::generate_diff(original, mutated);
    assert!(diff.contains("- line2"));
    assert!(diff.contains("+ changed"));
}

#[test]
fn generate_diff_identical_returns_empty() {
    let source = "no changes\n";
    assert!(applier::generate_diff(source, source).is_empty());
}

#[test]
fn candidate_diff_has_one_removal_and_one_insertion() {
    let c = make_candidate(3, "    return a + b", "    return a - b");
    let diff = applier::candidate_diff(&c);
    assert_eq!(diff, "-     return a + b\n+     return a - b\n");
}
