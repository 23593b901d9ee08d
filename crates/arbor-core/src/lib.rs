// arbor-core: Configuration, errors and diagnostics for the Arbor IK solvers.

pub mod config;
pub mod diagnostics;
pub mod error;

pub use config::AlgorithmConfig;
pub use diagnostics::{Diagnostic, DiagnosticSink, Level, NullSink, TracingSink};
pub use error::ConfigError;
