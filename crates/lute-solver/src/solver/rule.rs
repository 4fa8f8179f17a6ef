use std::fmt;
use std::hash::{Hash, Hasher};

use super::pool::PackageId;

/// A literal in SAT terms - positive means "install", negative means "don't install"
pub type Literal = i32;

/// Why a rule exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleType {
    /// Package named in the install request
    Requested,
    /// Package already installed; never retracted by an install
    Installed,
    /// If A is installed, B must be installed
    Requires,
    /// A and B cannot both be installed
    Conflict,
}

impl RuleType {
    /// Unit rules seeded from the request and the installed set
    pub fn is_job(&self) -> bool {
        matches!(self, RuleType::Requested | RuleType::Installed)
    }

    fn as_str(&self) -> &'static str {
        match self {
            RuleType::Requested => "requested",
            RuleType::Installed => "installed",
            RuleType::Requires => "requires",
            RuleType::Conflict => "conflict",
        }
    }
}

/// A SAT rule (clause): a disjunction of literals.
///
/// - `[A]` - A must be installed
/// - `[-A, B]` - if A is installed, B must be installed
/// - `[-A, -B]` - A and B cannot both be installed
#[derive(Clone)]
pub struct Rule {
    literals: Vec<Literal>,
    rule_type: RuleType,
    /// Assigned by RuleSet
    id: u32,
    /// Package that declared the relationship (for explanations)
    source_package: Option<PackageId>,
    /// Package on the other end of the relationship (for explanations)
    target_package: Option<PackageId>,
}

impl Rule {
    /// Create a rule; repeated literals are collapsed, first occurrence wins
    pub fn new(literals: Vec<Literal>, rule_type: RuleType) -> Self {
        let mut unique = Vec::with_capacity(literals.len());
        for literal in literals {
            if !unique.contains(&literal) {
                unique.push(literal);
            }
        }

        Self {
            literals: unique,
            rule_type,
            id: 0,
            source_package: None,
            target_package: None,
        }
    }

    /// The package was requested and must be installed
    pub fn requested(package: PackageId) -> Self {
        Self::new(vec![package], RuleType::Requested).with_source(package)
    }

    /// The package is installed and must stay installed
    pub fn installed(package: PackageId) -> Self {
        Self::new(vec![package], RuleType::Installed).with_source(package)
    }

    /// If source is installed, target must be installed
    pub fn requires(source: PackageId, target: PackageId) -> Self {
        Self::new(vec![-source, target], RuleType::Requires)
            .with_source(source)
            .with_target(target)
    }

    /// Source and target cannot both be installed
    pub fn conflict(source: PackageId, target: PackageId) -> Self {
        Self::new(vec![-source, -target], RuleType::Conflict)
            .with_source(source)
            .with_target(target)
    }

    pub fn set_id(&mut self, id: u32) {
        self.id = id;
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn with_source(mut self, package: PackageId) -> Self {
        self.source_package = Some(package);
        self
    }

    pub fn with_target(mut self, package: PackageId) -> Self {
        self.target_package = Some(package);
        self
    }

    pub fn rule_type(&self) -> RuleType {
        self.rule_type
    }

    pub fn literals(&self) -> &[Literal] {
        &self.literals
    }

    pub fn source_package(&self) -> Option<PackageId> {
        self.source_package
    }

    pub fn target_package(&self) -> Option<PackageId> {
        self.target_package
    }

    /// Check if this is an assertion (single literal)
    pub fn is_assertion(&self) -> bool {
        self.literals.len() == 1
    }

    pub fn len(&self) -> usize {
        self.literals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.literals.is_empty()
    }

    /// Get a hash of this rule's literals for deduplication
    pub fn literal_hash(&self) -> u64 {
        use std::collections::hash_map::DefaultHasher;
        let mut hasher = DefaultHasher::new();
        self.sorted_literals().hash(&mut hasher);
        hasher.finish()
    }

    /// Check if two rules have the same literals (regardless of order)
    pub fn equals_literals(&self, other: &Rule) -> bool {
        self.literals.len() == other.literals.len() && self.sorted_literals() == other.sorted_literals()
    }

    fn sorted_literals(&self) -> Vec<Literal> {
        let mut sorted = self.literals.clone();
        sorted.sort_unstable();
        sorted
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rule#{}({:?}, {:?})", self.id, self.rule_type, self.literals)
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let literals: Vec<String> = self
            .literals
            .iter()
            .map(|&l| if l > 0 { format!("+{}", l) } else { l.to_string() })
            .collect();

        write!(f, "({}) [{}]", self.rule_type.as_str(), literals.join(" | "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_requested() {
        let rule = Rule::requested(5);
        assert!(rule.is_assertion());
        assert_eq!(rule.literals(), &[5]);
        assert_eq!(rule.source_package(), Some(5));
        assert!(rule.rule_type().is_job());
    }

    #[test]
    fn test_rule_requires() {
        let rule = Rule::requires(1, 2);
        assert_eq!(rule.literals(), &[-1, 2]);
        assert_eq!(rule.rule_type(), RuleType::Requires);
        assert_eq!(rule.target_package(), Some(2));
    }

    #[test]
    fn test_rule_conflict() {
        let rule = Rule::conflict(1, 2);
        assert_eq!(rule.literals(), &[-1, -2]);
        assert!(!rule.rule_type().is_job());
    }

    #[test]
    fn test_self_conflict_collapses_to_assertion() {
        let rule = Rule::conflict(3, 3);
        assert_eq!(rule.literals(), &[-3]);
        assert!(rule.is_assertion());
    }

    #[test]
    fn test_rule_literal_hash() {
        let rule1 = Rule::conflict(1, 2);
        let rule2 = Rule::conflict(2, 1);
        let rule3 = Rule::requires(1, 2);

        assert_eq!(rule1.literal_hash(), rule2.literal_hash());
        assert!(rule1.equals_literals(&rule2));
        assert!(!rule1.equals_literals(&rule3));
    }

    #[test]
    fn test_rule_display() {
        let rule = Rule::requires(1, 2);
        assert_eq!(rule.to_string(), "(requires) [-1 | +2]");
    }
}
