use std::collections::{HashSet, VecDeque};
use std::time::Instant;

use indexmap::map::Entry;
use indexmap::{IndexMap, IndexSet};

use super::assertions::{PackageAssert, PackageAssertions};
use super::decisions::Decisions;
use super::pool::{PackageId, Pool};
use super::problem::{Problem, ProblemSet};
use super::rule::Literal;
use super::rule_generator::{GeneratedRules, RuleGenerator};
use super::rule_set::RuleSet;
use super::watch_graph::{PropagateResult, Propagator, WatchGraph};
use crate::config::SolverConfig;
use crate::database::PackageDatabase;
use crate::error::{Result, SolverError};
use crate::package::{Fingerprint, Package};

/// The SAT solver turning dependency and conflict declarations into a
/// consistent set of package assertions.
///
/// Implements DPLL with two-watched-literal propagation and chronological
/// backtracking. Branches try "not installed" first so nothing is pulled in
/// unless a rule forces it.
pub struct Solver<'a> {
    /// Packages already present on the system
    installed: IndexMap<Fingerprint, Package>,
    /// Candidate packages references are resolved against
    universe: IndexMap<Fingerprint, Package>,
    /// Fallback lookup for references outside the universe
    db: &'a dyn PackageDatabase,
    config: SolverConfig,
    /// Input problems found at construction, reported by the next install
    malformed: Vec<String>,
}

impl<'a> Solver<'a> {
    pub fn new(installed: &[Package], universe: &[Package], db: &'a dyn PackageDatabase) -> Self {
        let mut malformed = Vec::new();
        let installed = index_packages(installed, "installed set", &mut malformed);
        let universe = index_packages(universe, "universe", &mut malformed);

        for (fingerprint, package) in &installed {
            if let Some(candidate) = universe.get(fingerprint) {
                if !candidate.has_same_declarations(package) {
                    malformed.push(format!(
                        "{} is declared differently in the installed set and the universe",
                        package
                    ));
                }
            }
        }

        Self {
            installed,
            universe,
            db,
            config: SolverConfig::default(),
            malformed,
        }
    }

    pub fn with_config(mut self, config: SolverConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Installed packages, in the order they were given
    pub fn installed(&self) -> impl Iterator<Item = &Package> {
        self.installed.values()
    }

    /// Universe packages, in the order they were given
    pub fn universe(&self) -> impl Iterator<Item = &Package> {
        self.universe.values()
    }

    /// Whether the package conflicts with anything installed, in either direction
    pub fn conflicts_with_installed(&self, package: &Package) -> bool {
        self.installed.values().any(|installed| installed.conflicts_with(package))
    }

    /// Solve for installing `requested` on top of the installed set.
    ///
    /// Returns one assertion per identity involved, in variable order:
    /// requested packages, installed packages, then dependencies and conflict
    /// targets in the order they were discovered.
    pub fn install(&self, requested: &[Package]) -> Result<PackageAssertions> {
        if requested.is_empty() {
            return Err(SolverError::MalformedInput("empty install request".to_string()));
        }

        let mut problems = self.malformed.clone();
        let requested = index_packages(requested, "install request", &mut problems);
        for package in requested.values() {
            for (label, known) in [("installed set", &self.installed), ("universe", &self.universe)] {
                if let Some(other) = known.get(package.fingerprint()) {
                    if !other.has_same_declarations(package) {
                        problems.push(format!("{} is declared differently in the {}", package, label));
                    }
                }
            }
        }
        if !problems.is_empty() {
            return Err(SolverError::MalformedInput(problems.join("; ")));
        }

        let start = Instant::now();

        let generated = RuleGenerator::new(&requested, &self.installed, &self.universe, self.db, &self.config)
            .generate()?;
        log::debug!("Rule generation: {:?}, {} rules", start.elapsed(), generated.rules.len());

        let GeneratedRules {
            pool,
            rules,
            closure,
            dependents,
        } = generated;
        let mut state = SolverState::new(rules, pool.len());

        let sat_start = Instant::now();
        match self.run_sat(&mut state, &pool) {
            Ok(()) => log::debug!("SAT solving: {:?}", sat_start.elapsed()),
            Err(err) => {
                log::warn!("SAT solving failed after {:?}: {}", sat_start.elapsed(), err);
                return Err(err);
            }
        }

        let assertions = self.build_assertions(&state, &pool, &closure, &dependents);
        log::info!(
            "Solved {} requested package(s): {} to install, {} to keep out, in {:?}",
            requested.len(),
            assertions.to_install().count(),
            assertions.to_remove().count(),
            start.elapsed()
        );

        Ok(assertions)
    }

    /// Packages to remove to purge `candidate` from the installed set, in
    /// removal order (dependents before their dependencies).
    ///
    /// This is the candidate, every installed package that transitively
    /// requires it, and every installed dependency of those that no surviving
    /// installed package still needs.
    pub fn uninstall(&self, candidate: &Package) -> Result<Vec<Package>> {
        let Some(target) = self.installed.get(candidate.fingerprint()) else {
            return Err(SolverError::NotInstalled(candidate.to_string()));
        };

        let mut removed: IndexSet<Fingerprint> = IndexSet::new();
        removed.insert(target.fingerprint().clone());

        // Installed dependents, up to a fixed point
        loop {
            let before = removed.len();
            for package in self.installed.values() {
                if !removed.contains(package.fingerprint())
                    && package.requires().iter().any(|r| removed.contains(r.fingerprint()))
                {
                    removed.insert(package.fingerprint().clone());
                }
            }
            if removed.len() == before {
                break;
            }
        }

        // Orphans: dependencies of removed packages nothing kept still needs
        let orphan_candidates: IndexSet<Fingerprint> = self
            .installed_dependencies(removed.iter())
            .into_iter()
            .filter(|fingerprint| !removed.contains(fingerprint))
            .collect();
        let keep: Vec<&Fingerprint> = self
            .installed
            .keys()
            .filter(|fingerprint| !removed.contains(*fingerprint) && !orphan_candidates.contains(*fingerprint))
            .collect();
        let needed = self.installed_dependencies(keep);

        for fingerprint in orphan_candidates {
            if !needed.contains(&fingerprint) {
                removed.insert(fingerprint);
            }
        }

        let plan: PackageAssertions = removed
            .iter()
            .filter_map(|fingerprint| self.installed.get(fingerprint))
            .map(|package| PackageAssert::new(package, false))
            .collect();

        log::info!("Uninstalling {} removes {} package(s)", target, plan.len());

        Ok(plan
            .order(target.fingerprint())
            .into_iter()
            .rev()
            .map(|assert| assert.package)
            .collect())
    }

    /// Installed packages transitively required by `roots`, following only
    /// edges into the installed set
    fn installed_dependencies<'s>(&'s self, roots: impl IntoIterator<Item = &'s Fingerprint>) -> IndexSet<Fingerprint> {
        let mut seen = IndexSet::new();
        let mut stack: Vec<&Fingerprint> = roots.into_iter().collect();

        while let Some(fingerprint) = stack.pop() {
            let Some(package) = self.installed.get(fingerprint) else {
                continue;
            };
            for dependency in package.requires() {
                let dependency = dependency.fingerprint();
                if self.installed.contains_key(dependency) && seen.insert(dependency.clone()) {
                    stack.push(dependency);
                }
            }
        }

        seen
    }

    /// Main SAT solving loop
    fn run_sat(&self, state: &mut SolverState, pool: &Pool) -> Result<()> {
        self.process_assertions(state, pool)?;

        let mut iterations = 0u32;

        loop {
            iterations += 1;
            if iterations > self.config.max_iterations {
                log::warn!("Solver exceeded maximum iterations ({})", self.config.max_iterations);
                return Err(SolverError::IterationLimit(self.config.max_iterations));
            }

            if let Err(conflict_rule) = self.propagate(state) {
                // Undo the most recent branch and take its alternative
                let Some(branch) = state.branches.pop() else {
                    return Err(self.unsatisfiable(state, pool, conflict_rule));
                };

                log::debug!(
                    "Conflict in rule #{} at level {}, backtracking to try {}",
                    conflict_rule,
                    state.decisions.level(),
                    pool.literal_to_string(branch.alternative)
                );

                state.decisions.revert_to_level(branch.level - 1);
                state.reset_propagate_index();
                state.decisions.increment_level();
                state.decisions.decide(branch.alternative, None);
                continue;
            }

            match self.select_next(state, pool) {
                Some(package_id) => {
                    state.decisions.increment_level();
                    state.branches.push(Branch {
                        level: state.decisions.level(),
                        alternative: package_id,
                    });
                    state.decisions.decide(-package_id, None);
                }
                // Every variable decided - solution found
                None => return Ok(()),
            }
        }
    }

    /// Decide all single-literal rules at level 1
    fn process_assertions(&self, state: &mut SolverState, pool: &Pool) -> Result<()> {
        state.decisions.increment_level();

        let mut conflict = None;
        for rule in state.rules.assertions() {
            let literal = rule.literals()[0];

            if state.decisions.conflict(literal) {
                conflict = Some(rule.id());
                break;
            }

            state.decisions.decide(literal, Some(rule.id()));
        }

        match conflict {
            Some(rule_id) => Err(self.unsatisfiable(state, pool, rule_id)),
            None => Ok(()),
        }
    }

    /// Propagate consequences of current decisions using unit propagation.
    /// Uses propagate_index to avoid re-processing already propagated decisions
    fn propagate(&self, state: &mut SolverState) -> std::result::Result<(), u32> {
        while state.propagate_index < state.decisions.len() {
            let literal = state.decisions.queue()[state.propagate_index];
            state.propagate_index += 1;

            let results = {
                let decisions = &state.decisions;
                let mut propagator = Propagator::new(&mut state.watch_graph, &state.rules);
                propagator.propagate(literal, |lit| decisions.value(lit))
            };

            for result in results {
                match result {
                    PropagateResult::Unit(unit, rule_id) => match state.decisions.value(unit) {
                        None => {
                            state.decisions.decide(unit, Some(rule_id));
                        }
                        Some(true) => {}
                        Some(false) => return Err(rule_id),
                    },
                    PropagateResult::Conflict(rule_id) => return Err(rule_id),
                }
            }
        }

        Ok(())
    }

    /// Lowest undecided package id; branching order is therefore fixed by the
    /// order variables were created in
    fn select_next(&self, state: &SolverState, pool: &Pool) -> Option<PackageId> {
        pool.ids().find(|&id| state.decisions.undecided(id))
    }

    /// Explain why no solution exists, starting at the rule that failed
    fn unsatisfiable(&self, state: &SolverState, pool: &Pool, conflict_rule_id: u32) -> SolverError {
        let mut problems = ProblemSet::new();
        problems.add(self.analyze_unsolvable(state, pool, conflict_rule_id));

        log::warn!("Request is unsatisfiable:\n{}", problems);
        SolverError::Unsatisfiable { problems }
    }

    /// Walk back from the conflicting rule through the rules that forced
    /// each of its literals
    fn analyze_unsolvable(&self, state: &SolverState, pool: &Pool, conflict_rule_id: u32) -> Problem {
        let mut problem = Problem::new();
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([conflict_rule_id]);

        while let Some(rule_id) = queue.pop_front() {
            if !seen.insert(rule_id) {
                continue;
            }
            let Some(rule) = state.rules.get(rule_id) else {
                continue;
            };

            problem.add_rule(rule, pool);

            for &literal in rule.literals() {
                if let Some(reason) = state.decisions.decision_rule(literal) {
                    queue.push_back(reason);
                }
            }
        }

        problem
    }

    /// One assertion per variable, in pool order
    /// Dependents of the closure are kept out but carry the flagged variant
    fn build_assertions(
        &self,
        state: &SolverState,
        pool: &Pool,
        closure: &HashSet<PackageId>,
        dependents: &HashSet<PackageId>,
    ) -> PackageAssertions {
        pool.ids()
            .filter(|id| self.config.emit_conflicts || closure.contains(id) || dependents.contains(id))
            .filter_map(|id| {
                let package = pool.package(id)?;
                let value = state.decisions.decided_install(id);
                if dependents.contains(&id) && !value {
                    return Some(PackageAssert::kept_out(package));
                }
                Some(PackageAssert::new(package, value))
            })
            .collect()
    }
}

/// Index packages by identity. A repeated identity with the same declarations
/// is collapsed; one with different declarations is reported as a problem.
fn index_packages(packages: &[Package], label: &str, problems: &mut Vec<String>) -> IndexMap<Fingerprint, Package> {
    let mut index = IndexMap::with_capacity(packages.len());

    for package in packages {
        match index.entry(package.fingerprint().clone()) {
            Entry::Vacant(entry) => {
                entry.insert(package.flagged(false));
            }
            Entry::Occupied(entry) => {
                if !entry.get().has_same_declarations(package) {
                    problems.push(format!("{} is declared twice in the {} with different relationships", package, label));
                }
            }
        }
    }

    index
}

/// Internal state for the solver
struct SolverState {
    /// SAT rules
    rules: RuleSet,
    /// Current decisions
    decisions: Decisions,
    /// Watch graph for propagation
    watch_graph: WatchGraph,
    /// Branch points for backtracking
    branches: Vec<Branch>,
    /// Index of next decision to propagate (avoids re-propagating)
    propagate_index: usize,
}

impl SolverState {
    fn new(rules: RuleSet, package_count: usize) -> Self {
        let watch_graph = WatchGraph::from_rules(&rules);

        Self {
            rules,
            decisions: Decisions::with_capacity(package_count),
            watch_graph,
            branches: Vec::new(),
            propagate_index: 0,
        }
    }

    /// Reset propagate_index after backtracking
    fn reset_propagate_index(&mut self) {
        self.propagate_index = self.decisions.len();
    }
}

/// A branch point for backtracking
struct Branch {
    /// Decision level at this branch
    level: u32,
    /// Literal to decide when the first choice fails
    alternative: Literal,
}
