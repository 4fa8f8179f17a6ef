pub mod config;
pub mod database;
pub mod error;
pub mod package;
pub mod solver;

pub use config::SolverConfig;
pub use database::{InMemoryDatabase, PackageDatabase};
pub use error::{Result, SolverError};
pub use package::{Fingerprint, Package, PackageRef};
pub use solver::{PackageAssert, PackageAssertions, Solver};
