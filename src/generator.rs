use tracing::debug;

use crate::error::SourceError;
use crate::lexer::{self, MaskedLine, Token, TokenKind};
use crate::mutants::{FunctionSource, MutationCandidate, MutationKind};
use crate::operators::{self, RewriteRule};

/// Discover candidates for `function`, ordered by line then catalog order.
///
/// Each code line yields at most one catalog candidate (first rule, first
/// token) plus one return-neutralization candidate. A function with no
/// candidate at all gets a single marker candidate.
pub fn discover_candidates(
    function: &FunctionSource,
    catalog: &[RewriteRule],
) -> Result<Vec<MutationCandidate>, SourceError> {
    if function.text.trim().is_empty() {
        return Err(SourceError::EmptyFunction);
    }

    let lines = lexer::mask_lines(&function.text)?;
    let mut candidates = Vec::new();

    for (offset, line) in lines.iter().enumerate() {
        if line.is_blank() || line.is_comment_only() {
            continue;
        }
        let line_number = function.start_line + offset;
        let tokens = line.tokens();

        if let Some((rule, token)) = first_rule_match(&tokens, catalog) {
            candidates.push(candidate(
                line_number,
                line.text,
                splice(line.text, token.start, token.end, &rule.replacement),
                &rule.description,
                MutationKind::Operator(rule.category),
            ));
        }

        if let Some(mutated) = neutralize_return(line, &tokens) {
            candidates.push(candidate(
                line_number,
                line.text,
                mutated,
                operators::RETURN_DESCRIPTION,
                MutationKind::ReturnValue,
            ));
        }
    }

    if candidates.is_empty() {
        let offset = marker_line(&lines);
        let text = lines[offset].text;
        candidates.push(candidate(
            function.start_line + offset,
            text,
            format!("{}{}", text, operators::MARKER_SUFFIX),
            operators::MARKER_DESCRIPTION,
            MutationKind::Marker,
        ));
    }

    for (i, c) in candidates.iter_mut().enumerate() {
        c.id = format!("m{}", i + 1);
    }
    debug!(count = candidates.len(), start_line = function.start_line, "discovered candidates");
    Ok(candidates)
}

/// First line where a trailing comment cannot change the program: it ends
/// a logical line, with no open bracket, string or `\` continuation.
/// Falls back to the first non-blank line.
fn marker_line(lines: &[MaskedLine]) -> usize {
    let mut depth: i32 = 0;
    for (offset, line) in lines.iter().enumerate() {
        for tok in line.tokens().iter().filter(|t| t.kind == TokenKind::Op) {
            match tok.text {
                "(" | "[" | "{" => depth += 1,
                ")" | "]" | "}" => depth -= 1,
                _ => {}
            }
        }
        if line.is_blank() || line.is_comment_only() {
            continue;
        }
        let code = line.text[..line.code_end()].trim_end();
        if depth <= 0 && !line.in_string_at_end && !code.ends_with('\\') {
            return offset;
        }
    }
    lines.iter().position(|l| !l.is_blank()).unwrap_or(0)
}

fn candidate(
    line: usize,
    original: &str,
    mutated: String,
    description: &str,
    kind: MutationKind,
) -> MutationCandidate {
    MutationCandidate {
        id: String::new(),
        line,
        original: original.to_string(),
        mutated,
        description: description.to_string(),
        kind,
    }
}

fn splice(line: &str, start: usize, end: usize, replacement: &str) -> String {
    let mut result = String::with_capacity(line.len() + replacement.len());
    result.push_str(&line[..start]);
    result.push_str(replacement);
    result.push_str(&line[end..]);
    result
}

/// First rule, in catalog order, with a token it may rewrite on this line.
fn first_rule_match<'r, 't>(
    tokens: &[Token<'t>],
    catalog: &'r [RewriteRule],
) -> Option<(&'r RewriteRule, Token<'t>)> {
    catalog.iter().find_map(|rule| {
        tokens
            .iter()
            .enumerate()
            .find(|(i, tok)| {
                tok.kind != TokenKind::Literal
                    && tok.text == rule.token
                    && tok.text != rule.replacement
                    && (!rule.binary_only || (*i > 0 && tokens[i - 1].is_operand()))
            })
            .map(|(_, tok)| (rule, *tok))
    })
}

fn neutralize_return(line: &MaskedLine, tokens: &[Token]) -> Option<String> {
    let ret = tokens
        .iter()
        .find(|t| t.kind == TokenKind::Ident && t.text == "return")?;

    let code = &line.text[..line.code_end()];
    let tail = &code[ret.end..];
    let value = tail.trim();
    if value.is_empty() || !is_complete_expression(tokens, ret.end, value) {
        return None;
    }

    let value_start = ret.end + (tail.len() - tail.trim_start().len());
    let value_end = value_start + value.len();
    let replacement = operators::neutralized_return_value(value);
    if replacement == value {
        return None;
    }
    Some(splice(line.text, value_start, value_end, replacement))
}

/// The return value must be fully on this line: balanced brackets and no
/// continuation backslash.
fn is_complete_expression(tokens: &[Token], from: usize, value: &str) -> bool {
    if value.ends_with('\\') {
        return false;
    }
    let mut depth: i32 = 0;
    for tok in tokens.iter().filter(|t| t.start >= from && t.kind == TokenKind::Op) {
        match tok.text {
            "(" | "[" | "{" => depth += 1,
            ")" | "]" | "}" => depth -= 1,
            _ => {}
        }
        if depth < 0 {
            return false;
        }
    }
    depth == 0
}
