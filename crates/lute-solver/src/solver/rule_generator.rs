use std::collections::HashSet;
use std::time::Instant;

use indexmap::{IndexMap, IndexSet};

use super::pool::{PackageId, Pool};
use super::rule::Rule;
use super::rule_set::RuleSet;
use crate::config::SolverConfig;
use crate::database::PackageDatabase;
use crate::error::{Result, SolverError};
use crate::package::{Fingerprint, Package, PackageRef};

/// Output of rule generation: the variables and the clauses over them
#[derive(Debug)]
pub struct GeneratedRules {
    pub pool: Pool,
    pub rules: RuleSet,
    /// Ids in the dependency closure of the requested and installed packages.
    /// Every other pool entry is only the target of a conflict.
    pub closure: HashSet<PackageId>,
    /// Ids outside the closure that directly require a closure member
    pub dependents: HashSet<PackageId>,
}

/// One package on the expansion stack
struct Frame {
    id: PackageId,
    package: Package,
    /// Index of the next dependency to visit
    next: usize,
}

/// Generates SAT rules from a dependency graph.
///
/// This converts the dependency relationships into SAT clauses:
/// - Requested packages: must be installed
/// - Installed packages: must stay installed
/// - Package requirements: if A is installed, then B must be installed
/// - Conflicts: A and B cannot both be installed
pub struct RuleGenerator<'a> {
    requested: &'a IndexMap<Fingerprint, Package>,
    installed: &'a IndexMap<Fingerprint, Package>,
    universe: &'a IndexMap<Fingerprint, Package>,
    db: &'a dyn PackageDatabase,
    config: &'a SolverConfig,
    pool: Pool,
    rules: RuleSet,
    /// Packages we've already expanded (by ID)
    added_packages: HashSet<PackageId>,
    dependents: HashSet<PackageId>,
}

impl<'a> RuleGenerator<'a> {
    pub fn new(
        requested: &'a IndexMap<Fingerprint, Package>,
        installed: &'a IndexMap<Fingerprint, Package>,
        universe: &'a IndexMap<Fingerprint, Package>,
        db: &'a dyn PackageDatabase,
        config: &'a SolverConfig,
    ) -> Self {
        Self {
            requested,
            installed,
            universe,
            db,
            config,
            pool: Pool::new(),
            rules: RuleSet::new(),
            added_packages: HashSet::new(),
            dependents: HashSet::new(),
        }
    }

    /// Generate all rules for the request
    pub fn generate(mut self) -> Result<GeneratedRules> {
        let start = Instant::now();

        // Job packages get the lowest ids so output starts with them
        let requested: Vec<PackageId> = self.requested.values().map(|p| self.pool.add(p)).collect();
        let installed: Vec<PackageId> = self.installed.values().map(|p| self.pool.add(p)).collect();

        for &id in &requested {
            self.rules.add(Rule::requested(id));
        }
        for &id in &installed {
            self.rules.add(Rule::installed(id));
        }
        log::debug!("After job rules: {} rules", self.rules.len());

        let (requested_packages, installed_packages) = (self.requested, self.installed);
        for package in requested_packages.values().chain(installed_packages.values()) {
            self.add_package_rules(package)?;
        }

        if self.config.include_dependents {
            self.add_dependent_rules();
        }

        log::info!(
            "Rule generation stats: {} packages in pool, {} in closure, {} dependents, {} rules in {:?}",
            self.pool.len(),
            self.added_packages.len(),
            self.dependents.len(),
            self.rules.len(),
            start.elapsed()
        );
        log::debug!("Rules by type: {:?}", self.rules.stats());

        Ok(GeneratedRules {
            pool: self.pool,
            rules: self.rules,
            closure: self.added_packages,
            dependents: self.dependents,
        })
    }

    /// Expand a package and everything it requires: one requires rule per
    /// dependency and one conflict rule per declared conflict.
    ///
    /// The walk is depth-first with an explicit stack; `path` mirrors the
    /// stack and holds the identities on the current path for cycle detection.
    fn add_package_rules(&mut self, root: &Package) -> Result<()> {
        let mut path = IndexSet::new();
        let mut stack: Vec<Frame> = Vec::new();
        if let Some(frame) = self.enter(root.clone(), &mut path)? {
            stack.push(frame);
        }

        while let Some(frame) = stack.last_mut() {
            let Some(dependency) = frame.package.requires().get(frame.next) else {
                stack.pop();
                path.pop();
                continue;
            };
            frame.next += 1;

            let target = self.resolve(&frame.package, dependency)?;
            let target_id = self.pool.add(&target);
            self.rules.add(Rule::requires(frame.id, target_id));

            if let Some(position) = path.get_index_of(target.fingerprint()) {
                if self.config.reject_cycles {
                    return Err(self.cycle_error(&path, position, &target));
                }
                log::debug!("Cycle through {} kept as plain clauses", target);
                continue;
            }

            if let Some(next) = self.enter(target, &mut path)? {
                stack.push(next);
            }
        }

        Ok(())
    }

    /// Mark a package as expanded and add its conflict rules. Returns `None`
    /// when it was already expanded.
    fn enter(&mut self, package: Package, path: &mut IndexSet<Fingerprint>) -> Result<Option<Frame>> {
        let id = self.pool.add(&package);
        if !self.added_packages.insert(id) {
            return Ok(None);
        }

        path.insert(package.fingerprint().clone());

        for conflict in package.conflicts() {
            let target = self.resolve(&package, conflict)?;
            let target_id = self.pool.add(&target);
            self.rules.add(Rule::conflict(id, target_id));
        }

        Ok(Some(Frame { id, package, next: 0 }))
    }

    /// Add installed and universe packages that directly require a closure
    /// member. Only their requires rules into the closure are added; they are
    /// not expanded further.
    fn add_dependent_rules(&mut self) {
        let (installed, universe) = (self.installed, self.universe);
        for package in installed.values().chain(universe.values()) {
            let known = self.pool.id_of(package.fingerprint());
            if known.is_some_and(|id| self.added_packages.contains(&id) || self.dependents.contains(&id)) {
                continue;
            }

            let targets: Vec<PackageId> = package
                .requires()
                .iter()
                .filter_map(|dependency| self.pool.id_of(dependency.fingerprint()))
                .filter(|id| self.added_packages.contains(id))
                .collect();
            if targets.is_empty() {
                continue;
            }

            let id = self.pool.add(package);
            for target in targets {
                self.rules.add(Rule::requires(id, target));
            }
            log::trace!("{} depends on the closure", package);
            self.dependents.insert(id);
        }
    }

    /// Resolve a reference: requested, installed, universe, then the database
    fn resolve(&self, package: &Package, reference: &PackageRef) -> Result<Package> {
        let fingerprint = reference.fingerprint();

        let found = self
            .requested
            .get(fingerprint)
            .or_else(|| self.installed.get(fingerprint))
            .or_else(|| self.universe.get(fingerprint))
            .cloned()
            .or_else(|| self.db.get_package(fingerprint));

        match found {
            Some(target) => Ok(target),
            None => {
                log::warn!("{} references {}, which cannot be resolved", package, reference);
                Err(SolverError::UnresolvedDependency {
                    package: package.to_string(),
                    dependency: reference.to_string(),
                })
            }
        }
    }

    fn cycle_error(&self, path: &IndexSet<Fingerprint>, position: usize, target: &Package) -> SolverError {
        let mut cycle: Vec<String> = path
            .iter()
            .skip(position)
            .map(|fingerprint| {
                self.pool
                    .id_of(fingerprint)
                    .map(|id| self.pool.describe(id))
                    .unwrap_or_else(|| fingerprint.to_string())
            })
            .collect();
        cycle.push(target.to_string());

        log::warn!("Cyclic dependency: {}", cycle.join(" -> "));
        SolverError::CyclicDependency { cycle }
    }
}
