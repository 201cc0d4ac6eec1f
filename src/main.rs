use mutkernel::applier;
use mutkernel::error::KernelError;
use mutkernel::generator;
use mutkernel::mutants::{SourceFile, TestCase, TestOrigin, TestProgram};
use mutkernel::output;
use mutkernel::parser;
use mutkernel::{AggregateReport, CancelToken, KernelConfig};

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mutkernel", version, about = "Mutation testing for a single Python function")]
struct Cli {
    /// Log debug events to stderr (MUTKERNEL_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Mutate a function and run the tests against every mutant
    Run {
        /// Source file containing the function
        file: PathBuf,
        /// Function to mutate
        #[arg(short, long)]
        function: String,
        /// User-written test program (repeatable)
        #[arg(short, long = "test")]
        tests: Vec<PathBuf>,
        /// Generated test program (repeatable)
        #[arg(short, long = "generated")]
        generated: Vec<PathBuf>,
        /// Output JSON instead of human-readable text
        #[arg(long)]
        json: bool,
        /// Exit code only, no output
        #[arg(short, long)]
        quiet: bool,
        #[command(flatten)]
        settings: Settings,
    },
    /// List the functions that can be mutated
    Functions {
        file: PathBuf,
    },
    /// Show the mutants for a function without running anything
    Mutants {
        file: PathBuf,
        #[arg(short, long)]
        function: String,
        #[arg(long)]
        json: bool,
        /// JSON config file (for a custom catalog)
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[derive(clap::Args)]
struct Settings {
    /// JSON config file; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,
    /// Per-test timeout in milliseconds
    #[arg(long, env = "MUTKERNEL_TIMEOUT_MS")]
    timeout_ms: Option<u64>,
    /// Worker threads (default: available parallelism)
    #[arg(long)]
    workers: Option<usize>,
    /// Python interpreter
    #[arg(long, env = "MUTKERNEL_PYTHON")]
    python: Option<String>,
    /// Session ID for the scratch directory (default: auto-generated)
    #[arg(long)]
    session: Option<String>,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let exit_code = match cli.command {
        Commands::Run {
            file,
            function,
            tests,
            generated,
            json,
            quiet,
            settings,
        } => cmd_run(file, function, tests, generated, json, quiet, settings),
        Commands::Functions { file } => cmd_functions(file),
        Commands::Mutants {
            file,
            function,
            json,
            config,
        } => cmd_mutants(file, function, json, config),
    };

    process::exit(exit_code);
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("MUTKERNEL_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<KernelConfig, i32> {
    match path {
        Some(p) => KernelConfig::from_json_file(p).map_err(|e| {
            output::print_error(&e.to_string());
            2
        }),
        None => Ok(KernelConfig::default()),
    }
}

fn print_json<T: Serialize>(value: &T) -> bool {
    match serde_json::to_string(value) {
        Ok(json) => {
            println!("{}", json);
            true
        }
        Err(e) => {
            output::print_error(&format!("Failed to serialize output: {}", e));
            false
        }
    }
}

fn test_cases(tests: Vec<PathBuf>, generated: Vec<PathBuf>) -> Vec<TestCase> {
    tests
        .into_iter()
        .map(|p| (p, TestOrigin::User))
        .chain(generated.into_iter().map(|p| (p, TestOrigin::Generated)))
        .enumerate()
        .map(|(i, (path, origin))| {
            let name = path
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| path.display().to_string());
            TestCase::new(format!("t{}", i + 1), name, TestProgram::File(path), origin)
        })
        .collect()
}

fn cmd_run(
    file: PathBuf,
    function: String,
    tests: Vec<PathBuf>,
    generated: Vec<PathBuf>,
    json_mode: bool,
    quiet: bool,
    settings: Settings,
) -> i32 {
    let mut config = match load_config(settings.config.as_deref()) {
        Ok(c) => c,
        Err(code) => return code,
    };
    if let Some(ms) = settings.timeout_ms {
        config.timeout_ms = ms;
    }
    if let Some(workers) = settings.workers {
        config.workers = workers;
    }
    if let Some(python) = settings.python {
        config.interpreter = python;
    }
    if settings.session.is_some() {
        config.session_id = settings.session;
    }

    let fail = |err: String, code: i32| -> i32 {
        if quiet {
            return code;
        }
        if json_mode {
            print_json(&AggregateReport::failure(&err));
        } else {
            output::print_error(&err);
        }
        code
    };

    let source = match SourceFile::read(&file) {
        Ok(s) => s,
        Err(e) => return fail(e.to_string(), 2),
    };
    let target = match parser::locate_function(&source, &function) {
        Ok(f) => f,
        Err(e) => return fail(e.to_string(), 2),
    };
    let mut cases = test_cases(tests, generated);

    let report = match mutkernel::run_session(&source, &target, &mut cases, &config, &CancelToken::new()) {
        Ok(r) => r,
        Err(e @ (KernelError::Source(_) | KernelError::Config(_))) => return fail(e.to_string(), 2),
        Err(e) => return fail(e.to_string(), 3),
    };

    let code = if report.surviving_mutants > 0 { 1 } else { 0 };
    if quiet {
        return code;
    }
    if json_mode {
        if !print_json(&report) {
            return 3;
        }
    } else {
        output::print_report(&report, &file);
    }
    code
}

fn cmd_functions(file: PathBuf) -> i32 {
    let source = match SourceFile::read(&file) {
        Ok(s) => s,
        Err(e) => {
            output::print_error(&e.to_string());
            return 2;
        }
    };
    match parser::list_functions(&source.content) {
        Ok(names) if names.is_empty() => {
            output::print_success("No functions found.");
            0
        }
        Ok(names) => {
            for name in names {
                println!("{}", name);
            }
            0
        }
        Err(e) => {
            output::print_error(&e.to_string());
            2
        }
    }
}

fn cmd_mutants(file: PathBuf, function: String, json_mode: bool, config: Option<PathBuf>) -> i32 {
    let config = match load_config(config.as_deref()) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let candidates = SourceFile::read(&file)
        .and_then(|source| parser::locate_function(&source, &function))
        .and_then(|target| generator::discover_candidates(&target, &config.catalog));
    let candidates = match candidates {
        Ok(c) => c,
        Err(e) => {
            output::print_error(&e.to_string());
            return 2;
        }
    };

    if json_mode {
        return if print_json(&candidates) { 0 } else { 3 };
    }
    let diffs: Vec<String> = candidates.iter().map(applier::candidate_diff).collect();
    output::print_candidates(&candidates, &diffs);
    0
}
