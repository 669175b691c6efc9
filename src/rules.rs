use std::collections::HashMap;
use std::fmt;

use crate::errors::GrammarError;
use crate::item::Item;
use crate::span::Span;

/// A reference, from an LHS composition-pattern slot, to one component of
/// one RHS child: "the `component`-th string yielded by the `child`-th RHS
/// nonterminal occurrence".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ref {
  pub child: usize,
  pub component: usize,
}

/// One RHS occurrence: a nonterminal name together with the arity it's used
/// at in this rule (the number of variable letters bound to it).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RhsChild {
  pub nonterminal: String,
  pub arity: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RuleBody {
  /// `RHS` is empty; the LHS is a single literal token of arity 1.
  Terminal(String),
  /// LHS composition pattern (one `Vec<Ref>` per LHS component) plus the
  /// ordered RHS child list the refs index into.
  NonTerminal { pattern: Vec<Vec<Ref>>, rhs: Vec<RhsChild> },
}

/// A single MCFG production: linear and non-deleting by construction —
/// `Rule::from_parts` is the only constructor, and it rejects anything that
/// would violate those invariants.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Rule {
  pub lhs: String,
  pub lhs_arity: usize,
  pub body: RuleBody,
}

impl Rule {
  pub fn is_terminal(&self) -> bool {
    matches!(self.body, RuleBody::Terminal(_))
  }

  pub fn terminal_token(&self) -> Option<&str> {
    match &self.body {
      RuleBody::Terminal(tok) => Some(tok),
      RuleBody::NonTerminal { .. } => None,
    }
  }

  pub fn rhs(&self) -> &[RhsChild] {
    match &self.body {
      RuleBody::Terminal(_) => &[],
      RuleBody::NonTerminal { rhs, .. } => rhs,
    }
  }

  /// The LHS composition pattern rendered back into variable-letter form,
  /// e.g. `"uv,w"`. Used to disambiguate tree labels when a nonterminal has
  /// more than one rule.
  pub fn pattern_label(&self) -> String {
    match &self.body {
      RuleBody::Terminal(_) => String::new(),
      RuleBody::NonTerminal { pattern, rhs } => pattern
        .iter()
        .map(|component| component.iter().map(|r| rhs_var_letter(rhs, r)).collect::<String>())
        .collect::<Vec<_>>()
        .join(","),
    }
  }

  /// Builds and validates a terminal rule `lhs(token)`.
  pub fn terminal(lhs: impl Into<String>, token: impl Into<String>) -> Self {
    Self {
      lhs: lhs.into(),
      lhs_arity: 1,
      body: RuleBody::Terminal(token.into()),
    }
  }

  /// Builds a nonterminal rule from its structured form and validates it.
  ///
  /// `arity` is the nonterminal's declared string-tuple arity, independent
  /// of `pattern`'s own component count (per spec.md §4.1, "Construct from
  /// structured form" takes "LHS nonterminal + arity" and "LHS pattern" as
  /// separate inputs, rejecting when they disagree). `pattern` is the LHS
  /// composition pattern, one component per element, each component an
  /// ordered sequence of variable letters. `rhs` is the ordered list of
  /// `(nonterminal, variable letters)` for each RHS child; the length of a
  /// child's variable list is that child's arity in this rule.
  pub fn from_parts(
    lhs: impl Into<String>,
    arity: usize,
    pattern: Vec<Vec<char>>,
    rhs: Vec<(String, Vec<char>)>,
  ) -> Result<Self, GrammarError> {
    let lhs = lhs.into();

    if arity != pattern.len() {
      return Err(GrammarError::ArityMismatch { nonterminal: lhs, declared: arity, pattern: pattern.len() });
    }
    if arity == 0 {
      return Err(GrammarError::ZeroArity { nonterminal: lhs });
    }
    let declared_arity = arity;

    // Map each RHS variable letter to where it's bound, rejecting letters
    // bound by more than one slot.
    let mut bindings: HashMap<char, Ref> = HashMap::new();
    let mut rhs_children = Vec::with_capacity(rhs.len());
    for (child_idx, (nonterminal, vars)) in rhs.into_iter().enumerate() {
      for (component_idx, var) in vars.iter().enumerate() {
        if bindings
          .insert(*var, Ref { child: child_idx, component: component_idx })
          .is_some()
        {
          return Err(GrammarError::DuplicateBinding { var: *var });
        }
      }
      rhs_children.push(RhsChild { nonterminal, arity: vars.len() });
    }

    // Translate the LHS pattern to refs, counting how many times each bound
    // variable is used so we can enforce linearity/non-deletion.
    let mut occurrences: HashMap<char, usize> = bindings.keys().map(|v| (*v, 0)).collect();
    let mut resolved_pattern = Vec::with_capacity(pattern.len());
    for component in &pattern {
      if component.is_empty() {
        return Err(GrammarError::EmptyComponent);
      }
      let mut refs = Vec::with_capacity(component.len());
      for var in component {
        let r = *bindings
          .get(var)
          .ok_or(GrammarError::UndeclaredVariable { var: *var })?;
        *occurrences.get_mut(var).unwrap() += 1;
        refs.push(r);
      }
      resolved_pattern.push(refs);
    }

    for (var, count) in occurrences {
      if count != 1 {
        return Err(GrammarError::NonLinear { var, occurrences: count });
      }
    }

    Ok(Self {
      lhs,
      lhs_arity: declared_arity,
      body: RuleBody::NonTerminal { pattern: resolved_pattern, rhs: rhs_children },
    })
  }

  /// Combines this rule's RHS children into a derived item, enforcing the
  /// adjacency and non-overlap constraints of spec.md §4.1. `children` must
  /// match `self.rhs()` positionally in nonterminal and arity; callers
  /// (the agenda loop) guarantee this by construction.
  pub fn apply(&self, children: &[&Item]) -> Option<Item> {
    let pattern = match &self.body {
      RuleBody::Terminal(_) => return None,
      RuleBody::NonTerminal { pattern, .. } => pattern,
    };
    debug_assert_eq!(children.len(), self.rhs().len());

    let mut spans = Vec::with_capacity(pattern.len());
    let mut all_refs: Vec<Span> = Vec::new();

    for component in pattern {
      let mut iter = component.iter();
      let first = iter.next().expect("validated: no empty components");
      let mut prev = children[first.child].spans[first.component];
      all_refs.push(prev);
      for r in iter {
        let next = children[r.child].spans[r.component];
        if !prev.adjacent_to(&next) {
          return None;
        }
        all_refs.push(next);
        prev = next;
      }
      let first_span = children[first.child].spans[first.component];
      spans.push(Span::new(first_span.start, prev.end));
    }

    for i in 0..all_refs.len() {
      for j in (i + 1)..all_refs.len() {
        if all_refs[i].overlaps(&all_refs[j]) {
          return None;
        }
      }
    }

    Some(Item::new(self.lhs.clone(), spans))
  }
}

impl fmt::Display for Rule {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.body {
      RuleBody::Terminal(tok) => write!(f, "{}({})", self.lhs, tok),
      RuleBody::NonTerminal { pattern, rhs } => {
        write!(f, "{}(", self.lhs)?;
        for (i, component) in pattern.iter().enumerate() {
          if i > 0 {
            write!(f, ", ")?;
          }
          for r in component {
            write!(f, "{}", rhs_var_letter(rhs, r))?;
          }
        }
        write!(f, ") ->")?;
        for child in rhs {
          write!(f, " {}", child.nonterminal)?;
        }
        Ok(())
      }
    }
  }
}

/// Reconstructs a display letter for a ref purely for `Display`; this is
/// cosmetic (labels don't need to round-trip through the text reader).
fn rhs_var_letter(rhs: &[RhsChild], r: &Ref) -> char {
  let base = rhs[..r.child].iter().map(|c| c.arity).sum::<usize>() + r.component;
  (b'a' + (base % 26) as u8) as char
}
