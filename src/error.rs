//! Error types for the analysis engine.
//!
//! Mirrors the error-category split from the design notes: configuration
//! errors are fatal before a solver starts; IR inconsistencies and
//! unresolvable dispatch are recoverable and are logged, never raised
//! mid-fixpoint.

use thiserror::Error;

/// Configuration-time errors. Fatal to the analysis run that hit them.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(String),

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("unknown analysis id: {0}")]
    UnknownAnalysis(String),

    #[error("unresolvable method in config: {0}")]
    UnresolvableMethod(String),
}

/// Recoverable IR inconsistencies. Callers log and skip rather than abort.
#[derive(Debug, Error, Clone)]
pub enum IrError {
    #[error("argument/parameter arity mismatch calling {callee}: {args} args, {params} params")]
    ArityMismatch {
        callee: String,
        args: usize,
        params: usize,
    },

    #[error("no dispatch target found for {0}")]
    MissingDispatchTarget(String),
}

/// Errors raised while running a named analysis/pass.
#[derive(Debug, Error)]
pub enum PassError {
    #[error("pass '{0}' failed: {1}")]
    ExecutionFailed(String, String),

    #[error("dependency not satisfied: pass '{0}' requires pass '{1}'")]
    DependencyNotSatisfied(String, String),

    #[error("context missing required data: {0}")]
    MissingData(String),
}

pub type PassResult<T> = Result<T, PassError>;

/// Top-level error aggregating every category the pipeline driver can hit.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Pass(#[from] PassError),
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;
