use std::collections::HashSet;
use std::fmt;

use crate::agenda::Chart;
use crate::grammar::Grammar;
use crate::item::ItemId;
use crate::utils::cartesian_product;

/// A derivation tree: a nonterminal-labeled internal node over an ordered
/// list of children, or a terminal leaf. Built on demand during
/// reconstruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tree {
  Leaf(String),
  Node { label: String, children: Vec<Tree> },
}

impl Tree {
  /// Flattens the tree's leaves in left-to-right order; for a correct
  /// derivation this reproduces the input.
  pub fn leaves(&self) -> Vec<&str> {
    match self {
      Tree::Leaf(tok) => vec![tok.as_str()],
      Tree::Node { children, .. } => children.iter().flat_map(Tree::leaves).collect(),
    }
  }
}

impl fmt::Display for Tree {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Tree::Leaf(tok) => write!(f, "{}", tok),
      Tree::Node { label, children } => {
        write!(f, "({}", label)?;
        for child in children {
          write!(f, " {}", child)?;
        }
        write!(f, ")")
      }
    }
  }
}

/// Label for an internal node: just the nonterminal name, unless the
/// grammar has more than one rule for it, in which case the composition
/// pattern is appended to disambiguate.
fn node_label(grammar: &Grammar, rule: &crate::rules::Rule) -> String {
  if grammar.rules_for(&rule.lhs).len() > 1 {
    format!("{}[{}]", rule.lhs, rule.pattern_label())
  } else {
    rule.lhs.clone()
  }
}

/// Reconstructs every tree rooted at `goal`. Guards against derivational
/// cycles with a visited set scoped to the current path: a cyclic path is
/// skipped (no tree emitted for it) without preventing other, acyclic
/// derivations of the same item from being explored.
pub fn reconstruct_trees(grammar: &Grammar, chart: &Chart, goal: ItemId) -> Vec<Tree> {
  let mut visited = HashSet::new();
  reconstruct(grammar, chart, goal, &mut visited)
}

fn reconstruct(grammar: &Grammar, chart: &Chart, id: ItemId, visited: &mut HashSet<ItemId>) -> Vec<Tree> {
  if !visited.insert(id) {
    return Vec::new();
  }

  let mut trees = Vec::new();
  for bp in chart.backpointers(id) {
    let rule = grammar.rule(bp.rule);

    if let Some(token) = rule.terminal_token() {
      trees.push(Tree::Leaf(token.to_string()));
      continue;
    }

    let child_trees: Vec<Vec<Tree>> = bp
      .children
      .iter()
      .map(|&child_id| reconstruct(grammar, chart, child_id, visited))
      .collect();
    if child_trees.iter().any(Vec::is_empty) {
      // A child has no acyclic derivation reachable from this path; skip
      // this backpointer rather than emitting a malformed tree.
      continue;
    }

    let label = node_label(grammar, rule);
    for combo in cartesian_product(&child_trees) {
      trees.push(Tree::Node { label: label.clone(), children: combo });
    }
  }

  visited.remove(&id);
  trees
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::grammar::Grammar;

  #[test]
  fn round_trips_leaves() {
    let g: Grammar = "S(uv) -> NP(u) VP(v)\nNP(the)\nVP(barks)\n".parse().unwrap();
    let trees = g.parse(&["the", "barks"]);
    assert_eq!(trees.len(), 1);
    assert_eq!(trees[0].leaves(), vec!["the", "barks"]);
  }

  #[test]
  fn unary_cycle_terminates_and_yields_finite_trees() {
    // A -> A is a derivational cycle for any item that's also reachable
    // from a terminal; the cycle guard should stop reconstruction from
    // looping while the terminal-rooted derivation still comes through.
    let g: Grammar = "S(u) -> A(u)\nA(u) -> A(u)\nA(x)\n".parse().unwrap();
    let trees = g.parse(&["x"]);
    assert_eq!(trees.len(), 1);
    assert_eq!(trees[0].leaves(), vec!["x"]);
  }

  #[test]
  fn ambiguous_label_includes_pattern() {
    use crate::grammar::RuleId;
    use crate::rules::Rule;

    // Two rules for the same arity-2 nonterminal that assemble their
    // components in opposite orders; their labels must differ.
    let rules = vec![
      Rule::from_parts(
        "AB",
        2,
        vec![vec!['u'], vec!['v']],
        vec![("X".into(), vec!['u']), ("Y".into(), vec!['v'])],
      )
      .unwrap(),
      Rule::from_parts(
        "AB",
        2,
        vec![vec!['v'], vec!['u']],
        vec![("X".into(), vec!['u']), ("Y".into(), vec!['v'])],
      )
      .unwrap(),
      Rule::terminal("X", "x"),
      Rule::terminal("Y", "y"),
    ];
    let g = Grammar::new(rules).unwrap();
    let label0 = node_label(&g, g.rule(RuleId(0)));
    let label1 = node_label(&g, g.rule(RuleId(1)));
    assert_ne!(label0, label1);
    assert!(label0.starts_with("AB["));
  }
}
