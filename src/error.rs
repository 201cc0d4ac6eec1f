use std::path::PathBuf;

use thiserror::Error;

/// Unreadable or unusable input. Aborts the whole run.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Failed to read source file {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: syntax error near line {line}")]
    Unparsable { path: PathBuf, line: usize },

    #[error("Python grammar could not be loaded: {0}")]
    Grammar(String),

    #[error("Function text is empty")]
    EmptyFunction,

    #[error("Function '{function}' not found in {path}. Available: {}", available.join(", "))]
    FunctionNotFound {
        path: PathBuf,
        function: String,
        available: Vec<String>,
    },

    #[error("Function text does not match {path} at line {line}")]
    FunctionMismatch { path: PathBuf, line: usize },

    #[error("Failed to read test program {path}: {source}")]
    UnreadableTest {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Duplicate test id '{0}'")]
    DuplicateTest(String),
}

/// A candidate could not be materialized against the current content.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MutationError {
    #[error("Candidate {id} targets line {line}, but the file has {line_count} lines")]
    LineOutOfRange {
        id: String,
        line: usize,
        line_count: usize,
    },

    #[error("Candidate {id} is stale: line {line} no longer matches its original text")]
    LineMismatch { id: String, line: usize },
}

/// The harness could not stage, spawn or collect a child process.
/// Timeouts are not errors: they are flagged on `ExecutionResult`.
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Failed to write {path}: {source}")]
    Stage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to capture child stderr: {0}")]
    Capture(#[source] std::io::Error),

    #[error("Failed to wait on child process: {0}")]
    Wait(#[source] std::io::Error),

    #[error("Execution cancelled")]
    Cancelled,
}

/// Invalid kernel configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Rule '{description}': token '{token}' must be exactly one token")]
    InvalidRuleToken { token: String, description: String },

    #[error("Rule '{description}': replacement must not contain a line break")]
    MultilineReplacement { description: String },

    #[error("timeout_ms must be greater than zero")]
    ZeroTimeout,

    #[error("workers must be greater than zero")]
    ZeroWorkers,
}

/// Top-level failure of a run. No report is produced.
#[derive(Error, Debug)]
pub enum KernelError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to prepare scratch directory: {0}")]
    Scratch(#[source] std::io::Error),

    #[error("Failed to build worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),

    #[error("Run cancelled")]
    Cancelled,
}
