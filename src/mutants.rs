use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::SourceError;

/// The file under test. Its text is the baseline for every mutant.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    pub content: String,
}

impl SourceFile {
    pub fn new(path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }

    pub fn read(path: &Path) -> Result<Self, SourceError> {
        let content = std::fs::read_to_string(path).map_err(|source| SourceError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(path, content))
    }

    /// File name mutants are written under, so `import <module>` in a test
    /// resolves to the mutant.
    pub fn module_file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "module.py".to_string())
    }
}

/// One function's text and its absolute 1-based starting line in the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSource {
    pub name: Option<String>,
    pub text: String,
    pub start_line: usize,
}

impl FunctionSource {
    pub fn new(text: impl Into<String>, start_line: usize) -> Self {
        Self {
            name: None,
            text: text.into(),
            start_line,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleCategory {
    Arithmetic,
    Relational,
    Logical,
    Boolean,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    Operator(RuleCategory),
    ReturnValue,
    Marker,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationCandidate {
    pub id: String,
    /// Absolute, 1-based.
    pub line: usize,
    pub original: String,
    pub mutated: String,
    pub description: String,
    pub kind: MutationKind,
}

/// A materialized mutant: the full file content with one line rewritten.
#[derive(Debug, Clone)]
pub struct Mutant<'a> {
    pub id: String,
    pub content: String,
    pub candidate: &'a MutationCandidate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestOrigin {
    User,
    Generated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestProgram {
    Inline(String),
    File(PathBuf),
}

impl TestProgram {
    pub fn load(&self) -> Result<String, SourceError> {
        match self {
            TestProgram::Inline(code) => Ok(code.clone()),
            TestProgram::File(path) => {
                std::fs::read_to_string(path).map_err(|source| SourceError::UnreadableTest {
                    path: path.clone(),
                    source,
                })
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct TestCase {
    pub id: String,
    pub name: String,
    pub program: TestProgram,
    pub origin: TestOrigin,
    /// Set by the baseline phase.
    pub passes_baseline: bool,
    /// Set by the mutation phase, in mutant order.
    pub detected_mutation_ids: Vec<String>,
}

impl TestCase {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        program: TestProgram,
        origin: TestOrigin,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            program,
            origin,
            passes_baseline: false,
            detected_mutation_ids: Vec::new(),
        }
    }

    pub fn inline(id: impl Into<String>, name: impl Into<String>, code: impl Into<String>) -> Self {
        Self::new(id, name, TestProgram::Inline(code.into()), TestOrigin::User)
    }
}

/// Outcome of one test program against one concrete source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionResult {
    pub passed: bool,
    pub timed_out: bool,
    pub duration: Duration,
}
