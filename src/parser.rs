use tree_sitter::{Node, Parser};

use crate::error::SourceError;
use crate::mutants::{FunctionSource, SourceFile};

pub(crate) fn python_parser() -> Result<Parser, SourceError> {
    let mut parser = Parser::new();
    let language = tree_sitter_python::LANGUAGE;
    parser
        .set_language(&language.into())
        .map_err(|e| SourceError::Grammar(e.to_string()))?;
    Ok(parser)
}

/// Reject a file that does not parse cleanly as Python.
pub fn check_syntax(source: &SourceFile) -> Result<(), SourceError> {
    let mut parser = python_parser()?;
    let tree = parser
        .parse(&source.content, None)
        .ok_or_else(|| SourceError::Grammar("parser produced no tree".to_string()))?;
    let root = tree.root_node();
    if root.has_error() {
        let line = first_error(root).map(|n| n.start_position().row + 1).unwrap_or(1);
        return Err(SourceError::Unparsable {
            path: source.path.clone(),
            line,
        });
    }
    Ok(())
}

fn first_error(node: Node) -> Option<Node> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    let count = node.child_count();
    for i in 0..count {
        if let Some(child) = node.child(i) {
            if child.has_error() {
                if let Some(found) = first_error(child) {
                    return Some(found);
                }
            }
        }
    }
    None
}

/// Extract a named function from the file as whole lines.
pub fn locate_function(source: &SourceFile, name: &str) -> Result<FunctionSource, SourceError> {
    let mut parser = python_parser()?;
    let tree = parser
        .parse(&source.content, None)
        .ok_or_else(|| SourceError::Grammar("parser produced no tree".to_string()))?;

    let Some(func_node) = find_function(tree.root_node(), name, &source.content) else {
        return Err(SourceError::FunctionNotFound {
            path: source.path.clone(),
            function: name.to_string(),
            available: list_functions(&source.content)?,
        });
    };

    let first = func_node.start_position().row;
    let last = func_node.end_position().row;
    let text = source
        .content
        .lines()
        .skip(first)
        .take(last - first + 1)
        .collect::<Vec<_>>()
        .join("\n");

    Ok(FunctionSource {
        name: Some(name.to_string()),
        text,
        start_line: first + 1,
    })
}

/// Check that the function text sits in the file at its claimed line.
pub fn verify_function(source: &SourceFile, function: &FunctionSource) -> Result<(), SourceError> {
    if function.text.trim().is_empty() {
        return Err(SourceError::EmptyFunction);
    }
    let mismatch = |line| SourceError::FunctionMismatch {
        path: source.path.clone(),
        line,
    };
    if function.start_line == 0 {
        return Err(mismatch(0));
    }

    let mut file_lines = source.content.lines().skip(function.start_line - 1);
    for (offset, expected) in function.text.lines().enumerate() {
        match file_lines.next() {
            Some(actual) if actual == expected => {}
            _ => return Err(mismatch(function.start_line + offset)),
        }
    }
    Ok(())
}

/// Find a function_definition node by name.
fn find_function<'a>(node: Node<'a>, name: &str, source: &str) -> Option<Node<'a>> {
    if node.kind() == "function_definition" {
        if let Some(name_node) = node.child_by_field_name("name") {
            if node_text(name_node, source) == name {
                return Some(node);
            }
        }
    }
    let count = node.child_count();
    for i in 0..count {
        if let Some(child) = node.child(i) {
            if let Some(found) = find_function(child, name, source) {
                return Some(found);
            }
        }
    }
    None
}

/// List all function names in the source file.
pub fn list_functions(source: &str) -> Result<Vec<String>, SourceError> {
    let mut parser = python_parser()?;
    let tree = parser
        .parse(source, None)
        .ok_or_else(|| SourceError::Grammar("parser produced no tree".to_string()))?;
    let mut names = Vec::new();
    collect_function_names(tree.root_node(), source, &mut names);
    Ok(names)
}

fn collect_function_names(node: Node, source: &str, names: &mut Vec<String>) {
    if node.kind() == "function_definition" {
        if let Some(name_node) = node.child_by_field_name("name") {
            let name = node_text(name_node, source);
            // Skip dunder methods and test functions
            if !name.starts_with("__") && !name.starts_with("test_") {
                names.push(name.to_string());
            }
        }
    }
    let count = node.child_count();
    for i in 0..count {
        if let Some(child) = node.child(i) {
            collect_function_names(child, source, names);
        }
    }
}

fn node_text<'a>(node: Node<'a>, source: &'a str) -> &'a str {
    &source[node.start_byte()..node.end_byte()]
}
