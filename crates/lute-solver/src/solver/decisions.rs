use super::pool::PackageId;
use super::rule::Literal;

/// A single assignment: the value, the level it was made at, and the rule that
/// forced it (`None` for free branching decisions).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Decision {
    installed: bool,
    level: u32,
    rule: Option<u32>,
}

/// Tracks decisions made during SAT solving.
///
/// Assignments live in a flat Vec indexed by PackageId; the queue keeps them in
/// the order they were made, which is also non-decreasing in level, so
/// reverting to a level is a truncation of the queue tail.
#[derive(Debug, Default)]
pub struct Decisions {
    decision_map: Vec<Option<Decision>>,
    decision_queue: Vec<Literal>,
    level: u32,
}

impl Decisions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a tracker sized for ids up to `max_package_id`
    pub fn with_capacity(max_package_id: usize) -> Self {
        Self {
            decision_map: vec![None; max_package_id + 1],
            decision_queue: Vec::with_capacity(max_package_id),
            level: 0,
        }
    }

    fn slot(&self, literal: Literal) -> Option<Decision> {
        self.decision_map
            .get(literal.unsigned_abs() as usize)
            .copied()
            .flatten()
    }

    #[inline]
    pub fn level(&self) -> u32 {
        self.level
    }

    #[inline]
    pub fn increment_level(&mut self) {
        self.level += 1;
    }

    /// Make a decision at the current level.
    ///
    /// Returns false if this conflicts with an existing decision.
    pub fn decide(&mut self, literal: Literal, rule_id: Option<u32>) -> bool {
        let id = literal.unsigned_abs() as usize;
        if id >= self.decision_map.len() {
            self.decision_map.resize(id + 1, None);
        }

        let want_installed = literal > 0;
        if let Some(existing) = self.decision_map[id] {
            return existing.installed == want_installed;
        }

        self.decision_map[id] = Some(Decision {
            installed: want_installed,
            level: self.level,
            rule: rule_id,
        });
        self.decision_queue.push(literal);

        true
    }

    /// Truth value of a literal: `None` while its package is undecided
    #[inline]
    pub fn value(&self, literal: Literal) -> Option<bool> {
        self.slot(literal).map(|d| d.installed == (literal > 0))
    }

    /// Check if a literal conflicts with current decisions
    #[inline]
    pub fn conflict(&self, literal: Literal) -> bool {
        self.value(literal) == Some(false)
    }

    #[inline]
    pub fn decided(&self, package_id: PackageId) -> bool {
        self.slot(package_id).is_some()
    }

    #[inline]
    pub fn undecided(&self, package_id: PackageId) -> bool {
        !self.decided(package_id)
    }

    /// Check if a package was decided to be installed
    #[inline]
    pub fn decided_install(&self, package_id: PackageId) -> bool {
        matches!(self.slot(package_id), Some(d) if d.installed)
    }

    /// Get the rule that forced a decision
    pub fn decision_rule(&self, literal: Literal) -> Option<u32> {
        self.slot(literal).and_then(|d| d.rule)
    }

    /// Revert all decisions at levels > target_level
    pub fn revert_to_level(&mut self, target_level: u32) {
        while let Some(&literal) = self.decision_queue.last() {
            let id = literal.unsigned_abs() as usize;
            match self.decision_map[id] {
                Some(d) if d.level > target_level => {
                    self.decision_map[id] = None;
                    self.decision_queue.pop();
                }
                _ => break,
            }
        }

        self.level = target_level;
    }

    /// Decisions in the order they were made
    pub fn queue(&self) -> &[Literal] {
        &self.decision_queue
    }

    pub fn len(&self) -> usize {
        self.decision_queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decision_queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decisions_new() {
        let decisions = Decisions::new();
        assert_eq!(decisions.level(), 0);
        assert!(decisions.is_empty());
    }

    #[test]
    fn test_decisions_decide() {
        let mut decisions = Decisions::with_capacity(4);

        assert!(decisions.decide(1, Some(0)));
        assert_eq!(decisions.value(1), Some(true));
        assert_eq!(decisions.value(-1), Some(false));
        assert!(decisions.decided_install(1));

        assert!(decisions.decide(-2, Some(1)));
        assert_eq!(decisions.value(-2), Some(true));
        assert!(decisions.conflict(2));
        assert!(decisions.decided(2));
        assert!(!decisions.decided_install(2));

        assert_eq!(decisions.value(3), None);
    }

    #[test]
    fn test_decisions_conflict() {
        let mut decisions = Decisions::new();

        decisions.decide(1, None);
        assert!(!decisions.decide(-1, None));
        assert!(decisions.decide(1, None));

        assert!(decisions.conflict(-1));
        assert!(!decisions.conflict(1));
        assert_eq!(decisions.len(), 1);
    }

    #[test]
    fn test_decisions_levels_and_revert() {
        let mut decisions = Decisions::new();

        decisions.increment_level();
        decisions.decide(1, None);
        decisions.increment_level();
        decisions.decide(2, None);
        decisions.increment_level();
        decisions.decide(-3, None);

        assert_eq!(decisions.queue(), &[1, 2, -3]);

        decisions.revert_to_level(1);

        assert!(decisions.decided(1));
        assert!(decisions.undecided(2));
        assert!(decisions.undecided(3));
        assert_eq!(decisions.level(), 1);
        assert_eq!(decisions.queue(), &[1]);
    }

    #[test]
    fn test_decisions_decision_rule() {
        let mut decisions = Decisions::new();
        decisions.decide(1, Some(42));
        decisions.decide(2, None);

        assert_eq!(decisions.decision_rule(1), Some(42));
        assert_eq!(decisions.decision_rule(-1), Some(42));
        assert_eq!(decisions.decision_rule(2), None);
    }
}
