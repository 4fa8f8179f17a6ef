use std::fmt;

use super::pool::Pool;
use super::rule::{Rule, RuleType};

/// A problem encountered during dependency resolution.
///
/// Holds the chain of rules that together made the request impossible.
#[derive(Debug, Clone, Default)]
pub struct Problem {
    pub rules: Vec<ProblemRule>,
    pub message: Option<String>,
}

/// A rule that contributes to a problem, with package names already resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProblemRule {
    pub rule_id: u32,
    pub rule_type: RuleType,
    pub source: Option<String>,
    pub target: Option<String>,
}

impl Problem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule, resolving package names from the pool.
    /// A rule already part of the problem is not added twice.
    pub fn add_rule(&mut self, rule: &Rule, pool: &Pool) {
        if self.rules.iter().any(|r| r.rule_id == rule.id()) {
            return;
        }

        self.rules.push(ProblemRule {
            rule_id: rule.id(),
            rule_type: rule.rule_type(),
            source: rule.source_package().map(|id| pool.describe(id)),
            target: rule.target_package().map(|id| pool.describe(id)),
        });
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Whether a rule of the given type takes part in this problem
    pub fn involves(&self, rule_type: RuleType) -> bool {
        self.rules.iter().any(|r| r.rule_type == rule_type)
    }

    /// Generate a human-readable description of this problem
    pub fn describe(&self) -> String {
        let lines: Vec<String> = self
            .rules
            .iter()
            .map(|rule| format!("  - {}", describe_rule(rule)))
            .collect();

        match self.message {
            Some(ref msg) => format!("{}\n{}", msg, lines.join("\n")),
            None => lines.join("\n"),
        }
    }
}

fn describe_rule(rule: &ProblemRule) -> String {
    let source = rule.source.as_deref().unwrap_or("unknown");
    let target = rule.target.as_deref().unwrap_or("unknown");

    match rule.rule_type {
        RuleType::Requested => format!("{} was requested for installation", source),
        RuleType::Installed => format!("{} is installed and cannot be removed", source),
        RuleType::Requires => format!("{} requires {}", source, target),
        RuleType::Conflict => format!("{} conflicts with {}", source, target),
    }
}

/// Collection of problems encountered during solving
#[derive(Debug, Clone, Default)]
pub struct ProblemSet {
    problems: Vec<Problem>,
}

impl ProblemSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, problem: Problem) {
        self.problems.push(problem);
    }

    pub fn is_empty(&self) -> bool {
        self.problems.is_empty()
    }

    pub fn len(&self) -> usize {
        self.problems.len()
    }

    pub fn problems(&self) -> &[Problem] {
        &self.problems
    }

    /// Generate a complete description of all problems
    pub fn describe(&self) -> String {
        if self.problems.is_empty() {
            return "No problems found".to_string();
        }

        self.problems
            .iter()
            .enumerate()
            .map(|(i, p)| format!("Problem {}:\n{}", i + 1, p.describe()))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

impl fmt::Display for ProblemSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::Package;

    fn pool_with(names: &[&str]) -> Pool {
        let mut pool = Pool::new();
        for name in names {
            pool.add(&Package::new(*name, "", &[], &[]));
        }
        pool
    }

    #[test]
    fn test_problem_add_rule_dedups() {
        let pool = pool_with(&["A", "B"]);
        let mut rule = Rule::requires(1, 2);
        rule.set_id(7);

        let mut problem = Problem::new();
        problem.add_rule(&rule, &pool);
        problem.add_rule(&rule, &pool);

        assert_eq!(problem.rules.len(), 1);
        assert_eq!(problem.rules[0].source.as_deref(), Some("A"));
        assert_eq!(problem.rules[0].target.as_deref(), Some("B"));
    }

    #[test]
    fn test_problem_describe() {
        let pool = pool_with(&["A", "B", "C"]);
        let mut conflict = Rule::conflict(3, 2);
        conflict.set_id(0);
        let mut requires = Rule::requires(1, 2);
        requires.set_id(1);
        let mut installed = Rule::installed(3);
        installed.set_id(2);

        let mut problem = Problem::new().with_message("Conflict while installing A");
        problem.add_rule(&conflict, &pool);
        problem.add_rule(&requires, &pool);
        problem.add_rule(&installed, &pool);

        let description = problem.describe();
        assert!(description.starts_with("Conflict while installing A"));
        assert!(description.contains("C conflicts with B"));
        assert!(description.contains("A requires B"));
        assert!(description.contains("C is installed and cannot be removed"));
        assert!(problem.involves(RuleType::Conflict));
        assert!(!problem.involves(RuleType::Requested));
    }

    #[test]
    fn test_problem_set() {
        let mut problems = ProblemSet::new();
        assert!(problems.is_empty());
        assert_eq!(problems.describe(), "No problems found");

        problems.add(Problem::new().with_message("boom"));
        assert_eq!(problems.len(), 1);
        assert!(problems.to_string().starts_with("Problem 1:\nboom"));
    }
}
