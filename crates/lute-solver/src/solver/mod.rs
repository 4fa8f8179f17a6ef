//! SAT-based dependency resolver for source packages.
//!
//! This module turns dependency and conflict declarations into a boolean
//! assignment over package identities, then orders and hashes the result so
//! equivalent build plans can be recognized.
//!
//! # Architecture
//!
//! - [`Pool`]: Registry of the identities taking part in one solve
//! - [`RuleSet`]: Collection of SAT clauses representing dependencies
//! - [`Solver`]: The DPLL loop with watched-literal propagation
//! - [`PackageAssertions`]: The resulting plan, with ordering and hashing
//!
//! # Algorithm Overview
//!
//! 1. **Rule Generation**: Walk the dependency closure of the requested and
//!    installed packages and convert it to SAT clauses
//! 2. **Assertions**: Decide every single-literal rule
//! 3. **Unit Propagation**: Force decisions from clauses with one free literal
//! 4. **Decision Making**: Branch on the lowest undecided identity, "not
//!    installed" first
//! 5. **Backtracking**: On conflict, retry the most recent branch the other way
//!
//! # Example
//!
//! ```
//! use lute_solver::database::InMemoryDatabase;
//! use lute_solver::package::Package;
//! use lute_solver::solver::Solver;
//!
//! let libc = Package::new("libc", "2.39", &[], &[]);
//! let curl = Package::new("curl", "8.5", &[&libc], &[]);
//!
//! let db = InMemoryDatabase::new();
//! let universe = vec![curl.clone(), libc.clone()];
//! let solver = Solver::new(&[], &universe, &db);
//!
//! let plan = solver.install(&[curl.clone()]).unwrap();
//! let ordered = plan.order(curl.fingerprint());
//! assert_eq!(ordered[0].package.name(), "libc");
//! println!("plan {}", ordered.assertion_hash());
//! ```

mod assertions;
mod decisions;
mod pool;
mod problem;
mod rule;
mod rule_generator;
mod rule_set;
mod solver;
mod watch_graph;


pub use assertions::{PackageAssert, PackageAssertions};
pub use decisions::Decisions;
pub use pool::{PackageId, Pool};
pub use problem::{Problem, ProblemRule, ProblemSet};
pub use rule::{Literal, Rule, RuleType};
pub use rule_set::{RuleSet, RuleSetStats};
pub use solver::Solver;
