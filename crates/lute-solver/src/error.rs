use thiserror::Error;

use crate::solver::ProblemSet;

#[derive(Error, Debug)]
pub enum SolverError {
    // Resolution errors
    #[error("Could not resolve dependencies:\n{problems}")]
    Unsatisfiable { problems: ProblemSet },

    #[error("Unresolved dependency: {package} references {dependency}, which is not in the universe or database")]
    UnresolvedDependency { package: String, dependency: String },

    #[error("Cyclic dependency: {}", .cycle.join(" -> "))]
    CyclicDependency { cycle: Vec<String> },

    #[error("Solver exceeded maximum iterations ({0})")]
    IterationLimit(u32),

    // Input errors
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("Package is not installed: {0}")]
    NotInstalled(String),

    // Config errors
    #[error("Configuration error: {0}")]
    Config(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl SolverError {
    /// Whether the request itself can never be satisfied with the given inputs
    pub fn is_unsatisfiable(&self) -> bool {
        matches!(self, SolverError::Unsatisfiable { .. })
    }
}

pub type Result<T> = std::result::Result<T, SolverError>;
