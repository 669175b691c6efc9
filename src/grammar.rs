use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use tracing::debug;

use crate::agenda::{AgendaStrategy, ParseStrategy};
use crate::errors::{Err, GrammarError, ParseGrammarError};
use crate::parse_grammar;
use crate::rules::Rule;
use crate::trees::Tree;

/// Stable index of a rule within a `Grammar`'s rule arena. Backpointers
/// reference rules by id, not by owning `Rule` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuleId(pub usize);

/// What a parse is asked to compute, per spec.md §6's `grammar(input, mode)`
/// entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
  Recognize,
  Parse,
}

impl FromStr for Mode {
  type Err = Err;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "recognize" => Ok(Mode::Recognize),
      "parse" => Ok(Mode::Parse),
      other => Err(format!("invalid mode {:?} (expected \"recognize\" or \"parse\")", other).into()),
    }
  }
}

/// Result of `Grammar::run`. A timeout is a normal termination mode, not an
/// error (spec.md §7).
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
  Recognized(bool),
  Parsed(Vec<Tree>),
  TimedOut,
}

/// An MCFG: a set of rules, the terminal alphabet they imply, and the
/// nonterminal(s) that count as a derivation's root. Immutable once built;
/// freely shareable across concurrent parses (spec.md §5).
#[derive(Debug)]
pub struct Grammar {
  rules: Vec<Rule>,
  start: HashSet<String>,
  alphabet: HashSet<String>,
  nonterminals: HashSet<String>,
  by_lhs: HashMap<String, Vec<RuleId>>,
  by_rhs_symbol: HashMap<String, Vec<(RuleId, usize)>>,
  terminals_by_token: HashMap<String, Vec<RuleId>>,
  strategy: Box<dyn ParseStrategy>,
}

impl Grammar {
  /// Builds a grammar from already-validated rules, treating the first
  /// rule's LHS nonterminal as the sole start symbol.
  pub fn new(rules: Vec<Rule>) -> Result<Self, GrammarError> {
    if rules.is_empty() {
      return Err(GrammarError::EmptyGrammar);
    }
    let start = rules[0].lhs.clone();
    Self::with_start(rules, [start])
  }

  /// Builds a grammar with an explicit set of start nonterminals.
  pub fn with_start(
    rules: Vec<Rule>,
    start: impl IntoIterator<Item = String>,
  ) -> Result<Self, GrammarError> {
    if rules.is_empty() {
      return Err(GrammarError::EmptyGrammar);
    }

    let mut arities: HashMap<String, usize> = HashMap::new();
    let mut nonterminals: HashSet<String> = HashSet::new();
    let mut alphabet: HashSet<String> = HashSet::new();
    let mut by_lhs: HashMap<String, Vec<RuleId>> = HashMap::new();
    let mut by_rhs_symbol: HashMap<String, Vec<(RuleId, usize)>> = HashMap::new();
    let mut terminals_by_token: HashMap<String, Vec<RuleId>> = HashMap::new();

    for (idx, rule) in rules.iter().enumerate() {
      let id = RuleId(idx);
      nonterminals.insert(rule.lhs.clone());
      check_arity(&mut arities, &rule.lhs, rule.lhs_arity)?;
      by_lhs.entry(rule.lhs.clone()).or_default().push(id);

      match rule.terminal_token() {
        Some(tok) => {
          alphabet.insert(tok.to_string());
          terminals_by_token.entry(tok.to_string()).or_default().push(id);
        }
        None => {
          for (pos, child) in rule.rhs().iter().enumerate() {
            check_arity(&mut arities, &child.nonterminal, child.arity)?;
            by_rhs_symbol.entry(child.nonterminal.clone()).or_default().push((id, pos));
          }
        }
      }
    }

    debug!(rules = rules.len(), nonterminals = nonterminals.len(), "grammar built");

    Ok(Self {
      rules,
      start: start.into_iter().collect(),
      alphabet,
      nonterminals,
      by_lhs,
      by_rhs_symbol,
      terminals_by_token,
      strategy: Box::new(AgendaStrategy),
    })
  }

  /// Swaps in a different parsing backend (spec.md's REDESIGN FLAGS: the
  /// parser strategy is a configuration option, not a hardwired algorithm).
  pub fn with_strategy(mut self, strategy: Box<dyn ParseStrategy>) -> Self {
    self.strategy = strategy;
    self
  }

  pub fn rule(&self, id: RuleId) -> &Rule {
    &self.rules[id.0]
  }

  pub fn rules_for(&self, nonterminal: &str) -> &[RuleId] {
    self.by_lhs.get(nonterminal).map(Vec::as_slice).unwrap_or(&[])
  }

  pub fn rules_expecting(&self, nonterminal: &str) -> &[(RuleId, usize)] {
    self.by_rhs_symbol.get(nonterminal).map(Vec::as_slice).unwrap_or(&[])
  }

  pub fn terminal_rules_for(&self, token: &str) -> &[RuleId] {
    self.terminals_by_token.get(token).map(Vec::as_slice).unwrap_or(&[])
  }

  pub fn contains_terminal(&self, token: &str) -> bool {
    self.alphabet.contains(token)
  }

  pub fn start_symbols(&self) -> &HashSet<String> {
    &self.start
  }

  pub fn nonterminals(&self) -> &HashSet<String> {
    &self.nonterminals
  }

  /// Boolean recognition: is `input` in the language?
  pub fn recognize(&self, input: &[&str]) -> bool {
    matches!(self.run(input, Mode::Recognize), Outcome::Recognized(true))
  }

  /// Enumerates all derivation trees for `input`. Order is unspecified
  /// beyond backpointer insertion order; callers should treat the result as
  /// a set (spec.md §5).
  pub fn parse(&self, input: &[&str]) -> Vec<Tree> {
    match self.run(input, Mode::Parse) {
      Outcome::Parsed(trees) => trees,
      _ => Vec::new(),
    }
  }

  /// The entry point named by spec.md §6: `grammar(input, mode)`, dispatched
  /// through the configured `ParseStrategy`.
  pub fn run(&self, input: &[&str], mode: Mode) -> Outcome {
    self.strategy.parse(self, input, mode)
  }

  /// Reads a grammar from a file and parses it, for use by the CLI.
  pub fn read_from_file(path: impl AsRef<Path>) -> Result<Self, Err> {
    let text = fs::read_to_string(path)?;
    text.parse()
  }
}

fn check_arity(arities: &mut HashMap<String, usize>, nonterminal: &str, arity: usize) -> Result<(), GrammarError> {
  match arities.get(nonterminal) {
    Some(&existing) if existing != arity => Err(GrammarError::InconsistentArity {
      nonterminal: nonterminal.to_string(),
      first: existing,
      second: arity,
    }),
    Some(_) => Ok(()),
    None => {
      arities.insert(nonterminal.to_string(), arity);
      Ok(())
    }
  }
}

impl FromStr for Grammar {
  type Err = Err;

  /// Parses grammar text per spec.md §6 and assumes the first rule's
  /// symbol is the start symbol.
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let rules = parse_grammar::parse(s).map_err(|e| -> Err { Box::new(e) })?;
    Self::new(rules).map_err(|e| -> Err { Box::new(e) })
  }
}

impl fmt::Display for Grammar {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(f, "// start: {}", self.start.iter().cloned().collect::<Vec<_>>().join(", "))?;
    for rule in &self.rules {
      writeln!(f, "{}", rule)?;
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn rejects_inconsistent_arity() {
    // NP is used at arity 1 in S's RHS, then declared arity 2 as its own LHS.
    let err = "S(u) -> NP(u)\nNP(u, v) -> Det(u) N(v)\nDet(the)\nN(dog)\n"
      .parse::<Grammar>()
      .unwrap_err();
    assert!(err.to_string().contains("arity"));
  }

  #[test]
  fn rejects_empty_grammar() {
    assert!(Grammar::new(Vec::new()).is_err());
  }

  #[test]
  fn recognizes_simple_sentence() {
    let g: Grammar = "S(uv) -> NP(u) VP(v)\nNP(the)\nVP(barks)\n".parse().unwrap();
    assert!(g.recognize(&["the", "barks"]));
    assert!(!g.recognize(&["barks", "the"]));
  }

  #[test]
  fn unknown_mode_is_rejected() {
    assert!("garbage".parse::<Mode>().is_err());
    assert_eq!("parse".parse::<Mode>().unwrap(), Mode::Parse);
  }
}
