use super::rule::{Literal, Rule};
use super::rule_set::RuleSet;

/// Two-watched-literals graph for unit propagation.
///
/// Each non-assertion rule watches exactly two of its literals. A rule only
/// needs attention when one of its watched literals becomes false.
#[derive(Debug, Default)]
pub struct WatchGraph {
    /// Indexed by literal_to_index(literal)
    watches: Vec<Vec<WatchNode>>,
}

/// A watch linking a rule to one of its watched literals
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct WatchNode {
    rule_id: u32,
    /// The rule's other watched literal
    other_watch: Literal,
}

impl WatchGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn literal_to_index(literal: Literal) -> usize {
        let abs = literal.unsigned_abs() as usize;
        if literal > 0 {
            abs * 2
        } else {
            abs * 2 + 1
        }
    }

    fn watches_mut(&mut self, literal: Literal) -> &mut Vec<WatchNode> {
        let idx = Self::literal_to_index(literal);
        if idx >= self.watches.len() {
            self.watches.resize(idx + 1, Vec::new());
        }
        &mut self.watches[idx]
    }

    /// Build the watch graph from a rule set
    pub fn from_rules(rules: &RuleSet) -> Self {
        let mut graph = Self::new();
        for rule in rules.iter() {
            graph.add_rule(rule);
        }
        graph
    }

    /// Watch the first two literals of a rule; assertions are not watched
    pub fn add_rule(&mut self, rule: &Rule) {
        let literals = rule.literals();
        if literals.len() < 2 {
            return;
        }

        let (first, second) = (literals[0], literals[1]);
        self.watches_mut(first).push(WatchNode {
            rule_id: rule.id(),
            other_watch: second,
        });
        self.watches_mut(second).push(WatchNode {
            rule_id: rule.id(),
            other_watch: first,
        });
    }

    /// Rules watching a literal
    pub(crate) fn get_watches(&self, literal: Literal) -> &[WatchNode] {
        self.watches
            .get(Self::literal_to_index(literal))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Move a rule's watch from `from` to `to`; `other` keeps watching and is
    /// re-pointed at the new partner.
    pub fn move_watch(&mut self, rule_id: u32, from: Literal, to: Literal, other: Literal) {
        self.watches_mut(from).retain(|w| w.rule_id != rule_id);
        self.watches_mut(to).push(WatchNode {
            rule_id,
            other_watch: other,
        });

        for node in self.watches_mut(other).iter_mut() {
            if node.rule_id == rule_id {
                node.other_watch = to;
            }
        }
    }
}

/// Result of propagating a literal through one rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropagateResult {
    /// The literal is the only way left to satisfy the rule
    Unit(Literal, u32),
    /// Every literal of the rule is false
    Conflict(u32),
}

/// Runs unit propagation over the watch graph
#[derive(Debug)]
pub struct Propagator<'a> {
    graph: &'a mut WatchGraph,
    rules: &'a RuleSet,
}

impl<'a> Propagator<'a> {
    pub fn new(graph: &'a mut WatchGraph, rules: &'a RuleSet) -> Self {
        Self { graph, rules }
    }

    /// Propagate that `literal` has just been decided true.
    ///
    /// Every rule watching `-literal` either finds a replacement watch, is
    /// already satisfied by its other watch, becomes unit, or is in conflict.
    /// `value` reports a literal's truth, `None` while undecided.
    pub fn propagate<F>(&mut self, literal: Literal, value: F) -> Vec<PropagateResult>
    where
        F: Fn(Literal) -> Option<bool>,
    {
        let false_literal = -literal;
        let mut results = Vec::new();

        let watches: Vec<WatchNode> = self.graph.get_watches(false_literal).to_vec();
        for watch in watches {
            let Some(rule) = self.rules.get(watch.rule_id) else {
                continue;
            };

            let other = watch.other_watch;
            if value(other) == Some(true) {
                continue;
            }

            let replacement = rule
                .literals()
                .iter()
                .copied()
                .find(|&lit| lit != false_literal && lit != other && value(lit) != Some(false));

            match (replacement, value(other)) {
                (Some(lit), _) => self.graph.move_watch(rule.id(), false_literal, lit, other),
                (None, None) => results.push(PropagateResult::Unit(other, rule.id())),
                (None, _) => results.push(PropagateResult::Conflict(rule.id())),
            }
        }

        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::rule::RuleType;

    fn rule_set(rules: Vec<Rule>) -> RuleSet {
        let mut set = RuleSet::new();
        for rule in rules {
            set.add(rule);
        }
        set
    }

    #[test]
    fn test_watch_graph_add_rule() {
        let rules = rule_set(vec![Rule::new(vec![-1, 2, 3], RuleType::Requires)]);
        let graph = WatchGraph::from_rules(&rules);

        assert_eq!(graph.get_watches(-1).len(), 1);
        assert_eq!(graph.get_watches(2).len(), 1);
        assert_eq!(graph.get_watches(3).len(), 0);
    }

    #[test]
    fn test_watch_graph_skips_assertions() {
        let rules = rule_set(vec![Rule::requested(6), Rule::requires(1, 2)]);
        let graph = WatchGraph::from_rules(&rules);

        assert!(graph.get_watches(6).is_empty());
        assert_eq!(graph.get_watches(-1).len(), 1);
    }

    #[test]
    fn test_move_watch_repoints_partner() {
        let rules = rule_set(vec![Rule::new(vec![-1, 2, 3], RuleType::Requires)]);
        let mut graph = WatchGraph::from_rules(&rules);

        graph.move_watch(0, -1, 3, 2);

        assert!(graph.get_watches(-1).is_empty());
        assert_eq!(graph.get_watches(3), &[WatchNode { rule_id: 0, other_watch: 2 }]);
        assert_eq!(graph.get_watches(2), &[WatchNode { rule_id: 0, other_watch: 3 }]);
    }

    #[test]
    fn test_propagator_unit() {
        let rules = rule_set(vec![Rule::requires(1, 2)]);
        let mut graph = WatchGraph::from_rules(&rules);

        let mut propagator = Propagator::new(&mut graph, &rules);
        let results = propagator.propagate(1, |lit| match lit {
            1 => Some(true),
            -1 => Some(false),
            _ => None,
        });

        assert_eq!(results, vec![PropagateResult::Unit(2, 0)]);
    }

    #[test]
    fn test_propagator_moves_to_undecided() {
        let rules = rule_set(vec![Rule::new(vec![-1, 2, 3], RuleType::Requires)]);
        let mut graph = WatchGraph::from_rules(&rules);

        let mut propagator = Propagator::new(&mut graph, &rules);
        let results = propagator.propagate(1, |lit| match lit {
            -1 => Some(false),
            _ => None,
        });

        assert!(results.is_empty());
        assert_eq!(graph.get_watches(3).len(), 1);
    }

    #[test]
    fn test_propagator_unit_after_other_literals_false() {
        let rules = rule_set(vec![Rule::new(vec![-1, 2, 3], RuleType::Requires)]);
        let mut graph = WatchGraph::from_rules(&rules);

        let mut propagator = Propagator::new(&mut graph, &rules);
        let results = propagator.propagate(1, |lit| match lit {
            -1 => Some(false),
            3 => Some(false),
            _ => None,
        });

        assert_eq!(results, vec![PropagateResult::Unit(2, 0)]);
    }

    #[test]
    fn test_propagator_conflict() {
        let rules = rule_set(vec![Rule::conflict(1, 2)]);
        let mut graph = WatchGraph::from_rules(&rules);

        let mut propagator = Propagator::new(&mut graph, &rules);
        let results = propagator.propagate(1, |lit| match lit {
            -1 | -2 => Some(false),
            _ => None,
        });

        assert_eq!(results, vec![PropagateResult::Conflict(0)]);
    }

    #[test]
    fn test_propagator_satisfied() {
        let rules = rule_set(vec![Rule::new(vec![-1, 2, 3], RuleType::Requires)]);
        let mut graph = WatchGraph::from_rules(&rules);

        let mut propagator = Propagator::new(&mut graph, &rules);
        let results = propagator.propagate(1, |lit| match lit {
            -1 => Some(false),
            2 => Some(true),
            _ => None,
        });

        assert!(results.is_empty());
    }
}
