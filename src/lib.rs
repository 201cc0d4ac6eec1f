pub mod aggregator;
pub mod applier;
pub mod cancel;
pub mod config;
pub mod error;
pub mod generator;
pub mod harness;
pub mod lexer;
pub mod mutants;
pub mod operators;
pub mod output;
pub mod parser;
pub mod report;
pub mod scratch;

pub use aggregator::run_session;
pub use cancel::CancelToken;
pub use config::KernelConfig;
pub use error::KernelError;
pub use report::AggregateReport;
