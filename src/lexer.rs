use tree_sitter::{Node, Point};

use crate::error::SourceError;
use crate::parser;

const OPERATORS: &[&str] = &[
    "**=", "//=", ">>=", "<<=", "...", "->", ":=", "**", "//", "==", "!=", "<=", ">=", "<<", ">>",
    "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", "@=",
];

const KEYWORDS: &[&str] = &[
    "and", "as", "assert", "async", "await", "break", "class", "continue", "def", "del", "elif",
    "else", "except", "finally", "for", "from", "global", "if", "import", "in", "is", "lambda",
    "nonlocal", "not", "or", "pass", "raise", "return", "try", "while", "with", "yield",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Ident,
    Number,
    Op,
    /// A masked string literal.
    Literal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    pub start: usize,
    pub end: usize,
}

impl Token<'_> {
    /// True when an infix operator may follow this token.
    pub fn is_operand(&self) -> bool {
        match self.kind {
            TokenKind::Ident => !KEYWORDS.contains(&self.text),
            TokenKind::Number | TokenKind::Literal => true,
            TokenKind::Op => matches!(self.text, ")" | "]" | "}"),
        }
    }
}

/// One line of function text with its string/comment mask.
#[derive(Debug, Clone)]
pub struct MaskedLine<'a> {
    pub text: &'a str,
    masked: Vec<bool>,
    pub comment_start: Option<usize>,
    /// The line ends inside a string that continues on the next line.
    pub in_string_at_end: bool,
}

impl<'a> MaskedLine<'a> {
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    pub fn is_comment_only(&self) -> bool {
        self.text.trim_start().starts_with('#')
    }

    /// End of the code part of the line (start of a trailing comment).
    pub fn code_end(&self) -> usize {
        self.comment_start.unwrap_or(self.text.len())
    }

    pub fn tokens(&self) -> Vec<Token<'a>> {
        let end = self.code_end();
        tokenize(&self.text[..end], &self.masked[..end])
    }
}

/// Split `text` into lines and mask every byte inside a string or comment,
/// as located by tree-sitter-python.
pub fn mask_lines(text: &str) -> Result<Vec<MaskedLine<'_>>, SourceError> {
    let lines: Vec<&str> = text.lines().collect();

    // tree-sitter rejects an indented first statement, so parse a dedented
    // copy and shift columns back per row.
    let indent = lines
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| leading_whitespace(l))
        .min()
        .unwrap_or(0);
    let strips: Vec<usize> = lines
        .iter()
        .map(|l| leading_whitespace(l).min(indent))
        .collect();
    let dedented = lines
        .iter()
        .zip(&strips)
        .map(|(l, s)| &l[*s..])
        .collect::<Vec<_>>()
        .join("\n");

    let mut parser = parser::python_parser()?;
    let tree = parser
        .parse(&dedented, None)
        .ok_or_else(|| SourceError::Grammar("parser produced no tree".to_string()))?;

    let mut masked: Vec<MaskedLine> = lines
        .into_iter()
        .map(|l| MaskedLine {
            text: l,
            masked: vec![false; l.len()],
            comment_start: None,
            in_string_at_end: false,
        })
        .collect();
    collect_masks(tree.root_node(), &strips, &mut masked);
    Ok(masked)
}

fn leading_whitespace(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

fn collect_masks(node: Node, strips: &[usize], lines: &mut [MaskedLine]) {
    match node.kind() {
        "string" | "concatenated_string" => {
            mark(lines, strips, node.start_position(), node.end_position());
            return;
        }
        "comment" => {
            let start = node.start_position();
            if let Some(line) = lines.get_mut(start.row) {
                let col = start.column + strips[start.row];
                line.comment_start = Some(col);
            }
            mark(lines, strips, start, node.end_position());
            return;
        }
        _ => {}
    }
    let count = node.child_count();
    for i in 0..count {
        if let Some(child) = node.child(i) {
            collect_masks(child, strips, lines);
        }
    }
}

fn mark(lines: &mut [MaskedLine], strips: &[usize], start: Point, end: Point) {
    if lines.is_empty() {
        return;
    }
    let last = end.row.min(lines.len() - 1);
    for row in start.row..=last {
        let line = &mut lines[row];
        let len = line.masked.len();
        let from = if row == start.row { start.column + strips[row] } else { 0 };
        let to = if row == end.row {
            end.column + strips[row]
        } else {
            line.in_string_at_end = true;
            len
        };
        for flag in line.masked.iter_mut().take(to.min(len)).skip(from) {
            *flag = true;
        }
    }
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b >= 0x80
}

fn is_ident_continue(b: u8) -> bool {
    is_ident_start(b) || b.is_ascii_digit()
}

/// Tokenize one line. Masked runs become a single `Literal` token.
pub fn tokenize<'a>(line: &'a str, masked: &[bool]) -> Vec<Token<'a>> {
    let bytes = line.as_bytes();
    let len = bytes.len();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < len {
        let start = i;
        let b = bytes[i];

        if masked[i] {
            while i < len && masked[i] {
                i += 1;
            }
            tokens.push(Token {
                kind: TokenKind::Literal,
                text: &line[start..i],
                start,
                end: i,
            });
            continue;
        }

        if b.is_ascii_whitespace() || b == b'\\' {
            i += 1;
            continue;
        }

        let kind = if is_ident_start(b) {
            while i < len && !masked[i] && is_ident_continue(bytes[i]) {
                i += 1;
            }
            TokenKind::Ident
        } else if b.is_ascii_digit() || (b == b'.' && i + 1 < len && bytes[i + 1].is_ascii_digit())
        {
            while i < len && !masked[i] {
                let c = bytes[i];
                if c.is_ascii_alphanumeric() || c == b'_' || c == b'.' {
                    i += 1;
                } else if (c == b'+' || c == b'-')
                    && matches!(bytes[i - 1], b'e' | b'E')
                    && !line[start..i].starts_with("0x")
                    && i + 1 < len
                    && bytes[i + 1].is_ascii_digit()
                {
                    // exponent sign, as in 1e-5
                    i += 1;
                } else {
                    break;
                }
            }
            TokenKind::Number
        } else {
            let op_len = OPERATORS
                .iter()
                .find(|op| {
                    line[i..].starts_with(*op) && masked[i..i + op.len()].iter().all(|m| !m)
                })
                .map(|op| op.len())
                .unwrap_or(1);
            i += op_len;
            TokenKind::Op
        };

        tokens.push(Token {
            kind,
            text: &line[start..i],
            start,
            end: i,
        });
    }

    tokens
}

/// Whether `text` lexes as exactly one token spanning all of it.
pub fn is_single_token(text: &str) -> bool {
    if text.is_empty() {
        return false;
    }
    let masked = vec![false; text.len()];
    let tokens = tokenize(text, &masked);
    tokens.len() == 1 && tokens[0].start == 0 && tokens[0].end == text.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts<'a>(tokens: &[Token<'a>]) -> Vec<&'a str> {
        tokens.iter().map(|t| t.text).collect()
    }

    fn plain(line: &str) -> Vec<Token<'_>> {
        tokenize(line, &vec![false; line.len()])
    }

    #[test]
    fn operators_use_maximal_munch() {
        let tokens = plain("x += a ** b // c -> d");
        assert_eq!(texts(&tokens), vec!["x", "+=", "a", "**", "b", "//", "c", "->", "d"]);
    }

    #[test]
    fn unspaced_operators_are_tokens() {
        let tokens = plain("return a+b");
        assert_eq!(texts(&tokens), vec!["return", "a", "+", "b"]);
        assert_eq!(tokens[2].start, 8);
    }

    #[test]
    fn keywords_inside_identifiers_stay_whole() {
        let tokens = plain("android = order");
        assert_eq!(texts(&tokens), vec!["android", "=", "order"]);
    }

    #[test]
    fn exponent_sign_belongs_to_number() {
        let tokens = plain("x = 1e-5 - y");
        assert_eq!(texts(&tokens), vec!["x", "=", "1e-5", "-", "y"]);
    }

    #[test]
    fn masked_run_becomes_literal() {
        let line = "x = 'a+b' + y";
        let mut masked = vec![false; line.len()];
        for flag in masked.iter_mut().take(9).skip(4) {
            *flag = true;
        }
        let tokens = tokenize(line, &masked);
        assert_eq!(texts(&tokens), vec!["x", "=", "'a+b'", "+", "y"]);
        assert_eq!(tokens[2].kind, TokenKind::Literal);
        assert!(tokens[2].is_operand());
    }

    #[test]
    fn mask_lines_masks_strings_and_comments() {
        let text = "def f(x):\n    s = \"a + b\"  # x + y\n    return x + 1\n";
        let lines = mask_lines(text).unwrap();
        assert_eq!(lines.len(), 3);
        let tokens = lines[1].tokens();
        assert!(tokens.iter().all(|t| t.text != "+"));
        assert_eq!(lines[1].comment_start, Some(17));
        let tokens = lines[2].tokens();
        assert!(tokens.iter().any(|t| t.text == "+"));
    }

    #[test]
    fn mask_lines_masks_multiline_docstring() {
        let text = "    def f(self, x):\n        \"\"\"True if x > 0\n        and x < 10.\"\"\"\n        return x > 0\n";
        let lines = mask_lines(text).unwrap();
        assert!(lines[1].tokens().iter().all(|t| t.kind == TokenKind::Literal));
        assert!(lines[2].tokens().iter().all(|t| t.kind == TokenKind::Literal));
        assert!(lines[3].tokens().iter().any(|t| t.text == ">"));
    }

    #[test]
    fn multiline_string_rows_end_in_string() {
        let text = "def f():\n    s = \"\"\"a\n    b\"\"\"\n    return s\n";
        let lines = mask_lines(text).unwrap();
        let flags: Vec<bool> = lines.iter().map(|l| l.in_string_at_end).collect();
        assert_eq!(flags, vec![false, true, false, false]);
    }

    #[test]
    fn single_token_detection() {
        assert!(is_single_token("+"));
        assert!(is_single_token("and"));
        assert!(is_single_token("**"));
        assert!(!is_single_token("a b"));
        assert!(!is_single_token("+-"));
        assert!(!is_single_token(""));
    }

    #[test]
    fn keyword_is_not_operand() {
        let tokens = plain("def f(*args)");
        assert!(!tokens[0].is_operand());
        assert!(tokens[1].is_operand());
        assert!(!tokens[2].is_operand());
    }
}
