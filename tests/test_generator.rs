use mutkernel::generator;
use mutkernel::mutants::{FunctionSource, MutationCandidate, MutationKind, RuleCategory};
use mutkernel::operators::{self, RewriteRule};

fn discover(text: &str, start_line: usize) -> Vec<MutationCandidate> {
    generator::discover_candidates(&FunctionSource::new(text, start_line), &operators::default_catalog())
        .unwrap()
}

#[test]
fn single_line_add_yields_operator_and_return_candidates() {
    let candidates = discover("def add(a,b): return a+b", 1);
    assert_eq!(candidates.len(), 2);
    assert_eq!(candidates[0].id, "m1");
    assert_eq!(candidates[0].mutated, "def add(a,b): return a-b");
    assert_eq!(candidates[0].description, "Change + to -");
    assert_eq!(candidates[0].kind, MutationKind::Operator(RuleCategory::Arithmetic));
    assert_eq!(candidates[1].id, "m2");
    assert_eq!(candidates[1].mutated, "def add(a,b): return None");
    assert_eq!(candidates[1].kind, MutationKind::ReturnValue);
}

#[test]
fn line_numbers_are_absolute() {
    let text = "def is_positive(n):\n    return n > 0\n";
    let candidates = discover(text, 10);
    assert!(candidates.iter().all(|c| c.line == 11));
    assert_eq!(candidates[0].original, "    return n > 0");
    assert_eq!(candidates[0].mutated, "    return n <= 0");
}

#[test]
fn one_catalog_candidate_per_line() {
    let text = "def f(a, b, c):\n    x = a + b - c * 2\n";
    let candidates = discover(text, 1);
    let on_line: Vec<_> = candidates.iter().filter(|c| c.line == 2).collect();
    assert_eq!(on_line.len(), 1);
    // `+` comes first in the catalog and only its first occurrence changes
    assert_eq!(on_line[0].mutated, "    x = a - b - c * 2");
}

#[test]
fn first_catalog_rule_wins_over_earlier_token() {
    // `==` appears before `+` in the line, but `+` is earlier in the catalog
    let text = "def f(a, b):\n    return a == b + 1\n";
    let candidates = discover(text, 1);
    assert_eq!(candidates[0].mutated, "    return a == b - 1");
}

#[test]
fn return_candidate_follows_operator_candidate_on_same_line() {
    let candidates = discover("def f(x):\n    return x > 0\n", 1);
    let kinds: Vec<_> = candidates.iter().map(|c| c.kind).collect();
    assert_eq!(
        kinds,
        vec![MutationKind::Operator(RuleCategory::Relational), MutationKind::ReturnValue]
    );
}

#[test]
fn ordering_is_by_line_then_catalog() {
    let text = r#"def calc(a, b):
    if a > b and b > 0:
        return a - b
    return True
"#;
    let candidates = discover(text, 1);
    let lines: Vec<_> = candidates.iter().map(|c| c.line).collect();
    let mut sorted = lines.clone();
    sorted.sort();
    assert_eq!(lines, sorted);
    let ids: Vec<_> = candidates.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["m1", "m2", "m3", "m4", "m5"]);
    // line 4 has `True` (boolean rule) then the return rule
    let last_two: Vec<_> = candidates[3..].iter().map(|c| c.mutated.as_str()).collect();
    assert_eq!(last_two, vec!["    return False", "    return False"]);
}

#[test]
fn discovery_is_deterministic() {
    let text = r#"def discount(price, kind):
    base = 0.0
    if kind == "premium":
        base = 0.15
    if price > 1000 or kind == "gold":
        base += 0.05
    return round(price * (1 - base), 2)
"#;
    let first = discover(text, 3);
    for _ in 0..5 {
        assert_eq!(discover(text, 3), first);
    }
}

#[test]
fn strings_and_comments_are_never_rewritten() {
    let text = r#"def greet(name):
    # a + b and c > d
    label = "x > y and True"
    return label + name  # trailing - comment
"#;
    let candidates = discover(text, 1);
    assert!(candidates.iter().all(|c| c.line != 2 && c.line != 3));
    let op = candidates.iter().find(|c| c.line == 4 && c.kind != MutationKind::ReturnValue).unwrap();
    assert_eq!(op.mutated, "    return label - name  # trailing - comment");
}

#[test]
fn multiline_docstring_is_skipped() {
    let text = r#"def foo(x):
    """Returns True if x > 0
    and x < 10 - or not."""
    return x > 0
"#;
    let candidates = discover(text, 1);
    assert!(candidates.iter().all(|c| c.line == 4));
}

#[test]
fn compound_operators_are_not_split() {
    let text = "def f(x):\n    x += 1\n    y = x ** 2\n";
    let candidates = discover(text, 1);
    assert!(candidates.iter().all(|c| c.line != 2));
    let pow = candidates.iter().find(|c| c.line == 3).unwrap();
    assert_eq!(pow.mutated, "    y = x * 2");
    assert_eq!(pow.description, "Change ** to *");
}

#[test]
fn star_args_are_not_rewritten() {
    let text = "def f(*args, **kwargs):\n    return g(*args, **kwargs)\n";
    let candidates = discover(text, 1);
    assert!(candidates.iter().all(|c| c.kind == MutationKind::ReturnValue));
}

#[test]
fn keywords_inside_identifiers_are_not_matched() {
    let text = "def f(android, order):\n    notice = android\n";
    let candidates = discover(text, 1);
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].kind, MutationKind::Marker);
}

#[test]
fn constant_return_still_yields_a_mutant() {
    let candidates = discover("def answer():\n    return 42\n", 1);
    assert!(!candidates.is_empty());
    assert_eq!(candidates[0].mutated, "    return 0");
}

#[test]
fn marker_mutation_when_nothing_matches() {
    let text = "def noop():\n    # nothing here\n    pass\n";
    let candidates = discover(text, 7);
    assert_eq!(candidates.len(), 1);
    let marker = &candidates[0];
    assert_eq!(marker.kind, MutationKind::Marker);
    assert_eq!(marker.line, 7);
    assert_eq!(marker.original, "def noop():");
    assert_eq!(marker.mutated, "def noop():  # mutkernel: marker");
    assert_eq!(marker.description, operators::MARKER_DESCRIPTION);
}

#[test]
fn marker_skips_leading_blank_lines() {
    let candidates = discover("\n\ndef noop():\n    pass\n", 1);
    assert_eq!(candidates[0].line, 3);
}

#[test]
fn marker_is_never_placed_after_a_line_continuation() {
    let candidates = discover("def f(a, \\\n      b):\n    pass\n", 1);
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].kind, MutationKind::Marker);
    assert_eq!(candidates[0].line, 2);
    assert_eq!(candidates[0].mutated, "      b):  # mutkernel: marker");
}

#[test]
fn marker_skips_backslash_outside_brackets() {
    let candidates = discover("def f() \\\n        -> None:\n    pass\n", 1);
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].line, 2);
    assert_eq!(candidates[0].mutated, "        -> None:  # mutkernel: marker");
}

#[test]
fn empty_function_is_an_error() {
    let result = generator::discover_candidates(
        &FunctionSource::new("  \n\n", 1),
        &operators::default_catalog(),
    );
    assert!(result.is_err());
}

#[test]
fn indented_method_is_supported() {
    let text = "    def area(self):\n        return self.w * self.h\n";
    let candidates = discover(text, 5);
    assert_eq!(candidates[0].line, 6);
    assert_eq!(candidates[0].mutated, "        return self.w / self.h");
}

#[test]
fn every_candidate_changes_exactly_its_line() {
    let text = r#"def calc(op, a, b):
    if op == 'add':
        return a + b
    elif op == 'divide':
        if b != 0:
            return a / b
    return None
"#;
    for c in discover(text, 1) {
        assert_ne!(c.original, c.mutated, "{} must change its line", c.id);
        assert!(!c.mutated.contains('\n'));
    }
}

#[test]
fn custom_catalog_is_respected() {
    let catalog = vec![RewriteRule {
        token: "min".into(),
        replacement: "max".into(),
        description: "Change min to max".into(),
        category: RuleCategory::Arithmetic,
        binary_only: false,
    }];
    let text = "def clamp(x):\n    y = min(x, 10) + 1\n";
    let candidates =
        generator::discover_candidates(&FunctionSource::new(text, 1), &catalog).unwrap();
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].mutated, "    y = max(x, 10) + 1");
}
