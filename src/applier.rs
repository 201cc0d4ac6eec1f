use similar::TextDiff;

use crate::error::MutationError;
use crate::mutants::{Mutant, MutationCandidate};

/// Rewrite the candidate's line in `content`. Every other byte, line
/// terminators included, is copied unchanged.
pub fn apply_candidate(content: &str, candidate: &MutationCandidate) -> Result<String, MutationError> {
    let segments: Vec<&str> = content.split_inclusive('\n').collect();
    if candidate.line == 0 || candidate.line > segments.len() {
        return Err(MutationError::LineOutOfRange {
            id: candidate.id.clone(),
            line: candidate.line,
            line_count: segments.len(),
        });
    }

    let target = segments[candidate.line - 1];
    let (body, ending) = split_line_ending(target);
    if body != candidate.original {
        return Err(MutationError::LineMismatch {
            id: candidate.id.clone(),
            line: candidate.line,
        });
    }

    let mut result = String::with_capacity(content.len() + candidate.mutated.len());
    for (i, segment) in segments.iter().enumerate() {
        if i == candidate.line - 1 {
            result.push_str(&candidate.mutated);
            result.push_str(ending);
        } else {
            result.push_str(segment);
        }
    }
    Ok(result)
}

/// Build the mutant for `candidate`.
pub fn materialize<'a>(
    content: &str,
    candidate: &'a MutationCandidate,
) -> Result<Mutant<'a>, MutationError> {
    Ok(Mutant {
        id: candidate.id.clone(),
        content: apply_candidate(content, candidate)?,
        candidate,
    })
}

fn split_line_ending(segment: &str) -> (&str, &str) {
    if let Some(body) = segment.strip_suffix("\r\n") {
        (body, "\r\n")
    } else if let Some(body) = segment.strip_suffix('\n') {
        (body, "\n")
    } else {
        (segment, "")
    }
}

pub fn generate_diff(original: &str, mutated: &str) -> String {
    let diff = TextDiff::from_lines(original, mutated);
    let mut output = String::new();
    for change in diff.iter_all_changes() {
        match change.tag() {
            similar::ChangeTag::Delete => {
                output.push_str(&format!("- {}", change));
            }
            similar::ChangeTag::Insert => {
                output.push_str(&format!("+ {}", change));
            }
            _ => {}
        }
    }
    output
}

/// Diff of just the candidate's line, terminated so it prints cleanly.
pub fn candidate_diff(candidate: &MutationCandidate) -> String {
    generate_diff(
        &format!("{}\n", candidate.original),
        &format!("{}\n", candidate.mutated),
    )
}
