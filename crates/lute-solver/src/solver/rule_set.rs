use std::collections::HashMap;

use super::rule::{Rule, RuleType};

/// Collection of SAT rules with literal-based deduplication and sequential ids.
#[derive(Debug, Default)]
pub struct RuleSet {
    /// All rules indexed by ID
    rules: Vec<Rule>,

    /// Literal hash -> rule IDs sharing that hash
    rule_hashes: HashMap<u64, Vec<u32>>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule to the set, returning its ID.
    /// Returns the existing rule's ID if one with the same literals exists.
    pub fn add(&mut self, mut rule: Rule) -> u32 {
        let hash = rule.literal_hash();
        if let Some(candidates) = self.rule_hashes.get(&hash) {
            for &existing_id in candidates {
                if let Some(existing) = self.get(existing_id) {
                    if existing.equals_literals(&rule) {
                        return existing_id;
                    }
                }
            }
        }

        let id = self.rules.len() as u32;
        rule.set_id(id);
        log::trace!("Rule #{}: {}", id, rule);

        self.rule_hashes.entry(hash).or_default().push(id);
        self.rules.push(rule);

        id
    }

    pub fn get(&self, id: u32) -> Option<&Rule> {
        self.rules.get(id as usize)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    /// Get all rules of a specific type
    pub fn rules_of_type(&self, rule_type: RuleType) -> impl Iterator<Item = &Rule> {
        self.rules.iter().filter(move |r| r.rule_type() == rule_type)
    }

    /// Get assertion rules (single literal rules)
    pub fn assertions(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter().filter(|r| r.is_assertion())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Get statistics about the rule set
    pub fn stats(&self) -> RuleSetStats {
        let mut stats = RuleSetStats {
            total: self.rules.len(),
            ..Default::default()
        };

        for rule in &self.rules {
            match rule.rule_type() {
                RuleType::Requested => stats.requested += 1,
                RuleType::Installed => stats.installed += 1,
                RuleType::Requires => stats.requires += 1,
                RuleType::Conflict => stats.conflict += 1,
            }

            if rule.is_assertion() {
                stats.assertions += 1;
            }
        }

        stats
    }
}

/// Statistics about a rule set
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RuleSetStats {
    pub total: usize,
    pub assertions: usize,
    pub requested: usize,
    pub installed: usize,
    pub requires: usize,
    pub conflict: usize,
}
