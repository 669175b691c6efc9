use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;

use tracing::{debug, trace};

use crate::grammar::{Grammar, Mode, Outcome, RuleId};
use crate::item::{Item, ItemId};
use crate::span::Span;
use crate::trees::reconstruct_trees;
use crate::utils::cartesian_product;

/// A derivation recorded for some item: the rule that produced it and the
/// ordered child items it was built from. Terminal axioms have no children.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Backpointer {
  pub rule: RuleId,
  pub children: Vec<ItemId>,
}

/// The saturated result of a parse: every item derivable from the grammar
/// over the input, each with its full (deduplicated) set of backpointers.
#[derive(Debug)]
pub struct Chart {
  items: Vec<Item>,
  index: HashMap<Item, ItemId>,
  by_nonterminal: HashMap<String, Vec<ItemId>>,
  backpointers: HashMap<ItemId, HashSet<Backpointer>>,
}

impl Chart {
  fn new() -> Self {
    Self {
      items: Vec::new(),
      index: HashMap::new(),
      by_nonterminal: HashMap::new(),
      backpointers: HashMap::new(),
    }
  }

  pub fn get(&self, id: ItemId) -> &Item {
    &self.items[id.0]
  }

  pub fn len(&self) -> usize {
    self.items.len()
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  pub fn contains(&self, item: &Item) -> bool {
    self.index.contains_key(item)
  }

  pub fn ids_for(&self, nonterminal: &str) -> &[ItemId] {
    self.by_nonterminal.get(nonterminal).map(Vec::as_slice).unwrap_or(&[])
  }

  pub fn backpointers(&self, id: ItemId) -> impl Iterator<Item = &Backpointer> {
    self.backpointers.get(&id).into_iter().flatten()
  }

  /// Items whose nonterminal is a start symbol, arity 1, spanning the whole
  /// input.
  pub fn goals<'a>(&'a self, grammar: &'a Grammar, input_len: usize) -> impl Iterator<Item = ItemId> + 'a {
    grammar.start_symbols().iter().flat_map(move |start| {
      self
        .ids_for(start)
        .iter()
        .copied()
        .filter(move |&id| self.get(id).is_goal(start, input_len))
    })
  }

  /// Idempotent insertion: returns the item's id and whether it was new.
  fn insert(&mut self, item: Item) -> (ItemId, bool) {
    if let Some(&id) = self.index.get(&item) {
      return (id, false);
    }
    let id = ItemId(self.items.len());
    self.by_nonterminal.entry(item.nonterminal.clone()).or_default().push(id);
    self.index.insert(item.clone(), id);
    self.items.push(item);
    (id, true)
  }

  fn add_backpointer(&mut self, id: ItemId, bp: Backpointer) {
    self.backpointers.entry(id).or_default().insert(bp);
  }
}

impl fmt::Display for Chart {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for (id, item) in self.items.iter().enumerate() {
      writeln!(f, "{}: {}", ItemId(id), item)?;
    }
    Ok(())
  }
}

/// Outcome of exceeding a `StepBudget` — a normal, non-exceptional
/// termination mode, not an `Err`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BudgetExceeded;

/// An optional cap on the number of agenda pops, so an embedding
/// application can bound worst-case work without the core needing to know
/// anything about timeouts or cancellation.
#[derive(Debug, Clone, Copy)]
pub struct StepBudget {
  remaining: usize,
}

impl StepBudget {
  pub fn new(steps: usize) -> Self {
    Self { remaining: steps }
  }

  pub fn unlimited() -> Self {
    Self { remaining: usize::MAX }
  }

  fn tick(&mut self) -> bool {
    if self.remaining == 0 {
      return false;
    }
    self.remaining -= 1;
    true
  }
}

/// Runs the deductive agenda loop to completion (or until `budget` runs
/// out), producing a saturated chart. This is the default `ParseStrategy`,
/// kept as a free function the trait impls delegate to.
pub fn parse_chart(grammar: &Grammar, input: &[&str]) -> Chart {
  parse_chart_bounded(grammar, input, &mut StepBudget::unlimited()).expect("unlimited budget never exceeded")
}

pub fn parse_chart_bounded(
  grammar: &Grammar,
  input: &[&str],
  budget: &mut StepBudget,
) -> Result<Chart, BudgetExceeded> {
  let mut chart = Chart::new();
  let mut agenda: VecDeque<ItemId> = VecDeque::new();

  // Axioms: seed one item per (position, matching terminal rule).
  for (i, &tok) in input.iter().enumerate() {
    for &rule_id in grammar.terminal_rules_for(tok) {
      let rule = grammar.rule(rule_id);
      let item = Item::new(rule.lhs.clone(), vec![Span::unit(i)]);
      let (id, inserted) = chart.insert(item);
      chart.add_backpointer(id, Backpointer { rule: rule_id, children: Vec::new() });
      if inserted {
        trace!(item = %chart.get(id), "seeded axiom");
        agenda.push_back(id);
      }
    }
  }

  // Inference: process each item exactly once (unseen -> in-agenda ->
  // processed). Re-deriving candidate tuples against the full current chart
  // on every dequeue is correct and bounded, because chart insertion is
  // idempotent and `Rule::apply` is deterministic.
  while let Some(id) = agenda.pop_front() {
    if !budget.tick() {
      return Err(BudgetExceeded);
    }

    let nonterminal = chart.get(id).nonterminal.clone();
    for &(rule_id, position) in grammar.rules_expecting(&nonterminal) {
      let rule = grammar.rule(rule_id);
      let rhs = rule.rhs();
      if rhs[position].arity != chart.get(id).arity() {
        continue;
      }

      let slots: Vec<Vec<ItemId>> = rhs
        .iter()
        .enumerate()
        .map(|(k, child)| if k == position { vec![id] } else { chart.ids_for(&child.nonterminal).to_vec() })
        .collect();

      for combo in cartesian_product(&slots) {
        let child_items: Vec<&Item> = combo.iter().map(|&cid| chart.get(cid)).collect();
        if let Some(derived) = rule.apply(&child_items) {
          let (new_id, inserted) = chart.insert(derived);
          chart.add_backpointer(new_id, Backpointer { rule: rule_id, children: combo });
          if inserted {
            trace!(item = %chart.get(new_id), rule = %rule, "derived item");
            agenda.push_back(new_id);
          }
        }
      }
    }
  }

  debug!(items = chart.len(), "chart saturated");
  Ok(chart)
}

/// A pluggable parsing backend: the grammar holds its parser strategy as a
/// configuration option rather than hardwiring the agenda algorithm, so an
/// alternative (e.g. a CKY-style strategy) can be substituted without
/// changing `Grammar`'s public surface.
pub trait ParseStrategy: fmt::Debug + Send + Sync {
  fn parse(&self, grammar: &Grammar, input: &[&str], mode: Mode) -> Outcome;
}

/// The agenda-based deductive strategy; `Grammar`'s default.
#[derive(Debug, Clone, Copy, Default)]
pub struct AgendaStrategy;

impl ParseStrategy for AgendaStrategy {
  fn parse(&self, grammar: &Grammar, input: &[&str], mode: Mode) -> Outcome {
    let chart = parse_chart(grammar, input);
    match mode {
      Mode::Recognize => Outcome::Recognized(chart.goals(grammar, input.len()).next().is_some()),
      Mode::Parse => {
        let goals: Vec<ItemId> = chart.goals(grammar, input.len()).collect();
        Outcome::Parsed(goals.into_iter().flat_map(|g| reconstruct_trees(grammar, &chart, g)).collect())
      }
    }
  }
}

/// An agenda strategy with a hard cap on agenda pops, surfacing exhaustion
/// as `Outcome::TimedOut` rather than panicking or hanging.
#[derive(Debug, Clone, Copy)]
pub struct BoundedAgendaStrategy {
  pub budget: usize,
}

impl ParseStrategy for BoundedAgendaStrategy {
  fn parse(&self, grammar: &Grammar, input: &[&str], mode: Mode) -> Outcome {
    let mut budget = StepBudget::new(self.budget);
    let chart = match parse_chart_bounded(grammar, input, &mut budget) {
      Ok(chart) => chart,
      Err(BudgetExceeded) => return Outcome::TimedOut,
    };
    match mode {
      Mode::Recognize => Outcome::Recognized(chart.goals(grammar, input.len()).next().is_some()),
      Mode::Parse => {
        let goals: Vec<ItemId> = chart.goals(grammar, input.len()).collect();
        Outcome::Parsed(goals.into_iter().flat_map(|g| reconstruct_trees(grammar, &chart, g)).collect())
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::grammar::Grammar;

  fn np_vp_grammar() -> Grammar {
    "S(uv) -> NP(u) VP(v)\nNP(the)\nVP(barks)\n".parse().unwrap()
  }

  #[test]
  fn seeds_axioms_for_every_matching_position() {
    let g = np_vp_grammar();
    let chart = parse_chart(&g, &["the", "barks"]);
    assert!(chart.ids_for("NP").len() == 1);
    assert!(chart.ids_for("VP").len() == 1);
  }

  #[test]
  fn derives_goal_for_valid_sentence() {
    let g = np_vp_grammar();
    let chart = parse_chart(&g, &["the", "barks"]);
    assert_eq!(chart.goals(&g, 2).count(), 1);
  }

  #[test]
  fn no_goal_for_invalid_sentence() {
    let g = np_vp_grammar();
    let chart = parse_chart(&g, &["barks", "the"]);
    assert_eq!(chart.goals(&g, 2).count(), 0);
  }

  #[test]
  fn budget_exhaustion_reports_without_panicking() {
    let g = np_vp_grammar();
    let mut budget = StepBudget::new(0);
    let result = parse_chart_bounded(&g, &["the", "barks"], &mut budget);
    assert_eq!(result.unwrap_err(), BudgetExceeded);
  }

  #[test]
  fn bounded_strategy_times_out_under_a_tight_budget() {
    let g = np_vp_grammar().with_strategy(Box::new(BoundedAgendaStrategy { budget: 0 }));
    assert_eq!(g.run(&["the", "barks"], Mode::Recognize), Outcome::TimedOut);
  }

  #[test]
  fn bounded_strategy_matches_the_default_under_a_generous_budget() {
    let g = np_vp_grammar().with_strategy(Box::new(BoundedAgendaStrategy { budget: 1000 }));
    assert_eq!(g.run(&["the", "barks"], Mode::Recognize), Outcome::Recognized(true));
  }
}
