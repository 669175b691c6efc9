use std::error::Error;
use std::fmt;

/// Boxed, dynamically-typed error used at every fallible public boundary.
/// Combination failure inside `Rule::apply` is *not* an error (it's `None`);
/// this type is only for construction-time and entry-point failures.
pub type Err = Box<dyn Error + 'static>;

/// Reasons a rule can be rejected at construction time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrammarError {
  /// The LHS pattern has a different number of components than the
  /// declared arity for its nonterminal.
  ArityMismatch { nonterminal: String, declared: usize, pattern: usize },
  /// A nonterminal was declared with arity 0; every nonterminal must yield
  /// at least one string component.
  ZeroArity { nonterminal: String },
  /// A variable occurs zero or more than one time on the LHS.
  NonLinear { var: char, occurrences: usize },
  /// A variable appears on the LHS but was never bound by an RHS child.
  UndeclaredVariable { var: char },
  /// An LHS component has no variables in it.
  EmptyComponent,
  /// The same variable letter is bound by more than one RHS argument slot.
  DuplicateBinding { var: char },
  /// A nonterminal is used with two different arities across the grammar.
  InconsistentArity { nonterminal: String, first: usize, second: usize },
  /// No rules at all, or no rule for the requested start nonterminal.
  EmptyGrammar,
}

impl fmt::Display for GrammarError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::ArityMismatch { nonterminal, declared, pattern } => write!(
        f,
        "{}: declared arity {} but LHS pattern has {} components",
        nonterminal, declared, pattern
      ),
      Self::ZeroArity { nonterminal } => {
        write!(f, "{}: declared with arity 0; a nonterminal must yield at least one component", nonterminal)
      }
      Self::NonLinear { var, occurrences } => write!(
        f,
        "variable '{}' occurs {} times on the LHS (must occur exactly once)",
        var, occurrences
      ),
      Self::UndeclaredVariable { var } => {
        write!(f, "variable '{}' used on the LHS but never bound by the RHS", var)
      }
      Self::EmptyComponent => write!(f, "LHS component has no variables"),
      Self::DuplicateBinding { var } => {
        write!(f, "variable '{}' is bound by more than one RHS argument slot", var)
      }
      Self::InconsistentArity { nonterminal, first, second } => write!(
        f,
        "{}: used with arity {} and arity {} in different rules",
        nonterminal, first, second
      ),
      Self::EmptyGrammar => write!(f, "grammar has no rules"),
    }
  }
}

impl Error for GrammarError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseGrammarError {
  Syntax(String),
  Grammar(GrammarError),
}

impl fmt::Display for ParseGrammarError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Syntax(msg) => write!(f, "syntax error: {}", msg),
      Self::Grammar(e) => write!(f, "{}", e),
    }
  }
}

impl Error for ParseGrammarError {}

impl From<GrammarError> for ParseGrammarError {
  fn from(e: GrammarError) -> Self {
    Self::Grammar(e)
  }
}
