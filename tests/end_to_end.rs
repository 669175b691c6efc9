use mcfg::grammar::Mode;
use mcfg::{Grammar, Outcome};

/// Declarative sentences, a subject relative clause (`Nrc`, arity 2), a
/// wh-question built by aux-inversion (`Swhmain`/`VPwhmain`, arity 2, whose
/// components are not adjacent to each other), and the classic
/// PP-attachment ambiguity.
const GRAMMAR: &str = r#"
  S(uv) -> NP(u) VP(v)
  S(vuw) -> Aux(u) Swhmain(v, w)

  NP(uv) -> Det(u) N(v)
  NP(uv) -> Detwh(u) N(v)
  NP(uvw) -> Det(u) Nrc(v, w)
  NP(uv) -> NP(u) PP(v)

  Nrc(u, v) -> N(u) RelClause(v)
  RelClause(uv) -> Comp(u) Sgap(v)
  Sgap(uv) -> V(u) NP(v)

  VP(uv) -> V(u) NP(v)
  VP(uv) -> VP(u) PP(v)

  PP(uv) -> P(u) NP(v)

  Swhmain(v, uw) -> NP(u) VPwhmain(v, w)
  VPwhmain(v, u) -> NP(v) V(u)

  Det(the)
  Detwh(which)
  N(human)
  N(greyhound)
  N(salmon)
  V(saw)
  V(believes)
  V(see)
  P(with)
  Comp(that)
  Aux(did)
"#;

fn grammar() -> Grammar {
  GRAMMAR.parse().unwrap()
}

fn tokens(s: &str) -> Vec<&str> {
  s.split(' ').collect()
}

#[test]
fn recognizes_a_simple_declarative_sentence() {
  let g = grammar();
  let input = tokens("the human saw the greyhound");
  assert!(g.recognize(&input));

  let trees = g.parse(&input);
  assert_eq!(trees.len(), 1);
  assert_eq!(trees[0].leaves(), input);
}

#[test]
fn recognizes_a_sentence_with_a_discontiguous_relative_clause_constituent() {
  let g = grammar();
  let input = tokens("the human that believes the salmon saw the greyhound");
  assert!(g.recognize(&input));

  let trees = g.parse(&input);
  assert!(!trees.is_empty());
  assert_eq!(trees[0].leaves(), input);

  fn contains_nrc(tree: &mcfg::Tree) -> bool {
    match tree {
      mcfg::Tree::Leaf(_) => false,
      mcfg::Tree::Node { label, children } => {
        label.starts_with("Nrc") || children.iter().any(contains_nrc)
      }
    }
  }
  assert!(trees.iter().any(contains_nrc), "expected an Nrc constituent in at least one parse");
}

#[test]
fn recognizes_a_wh_question_formed_by_aux_inversion() {
  let g = grammar();
  let input = tokens("which human did the greyhound see");
  assert!(g.recognize(&input));

  let trees = g.parse(&input);
  assert!(!trees.is_empty());
  assert_eq!(trees[0].leaves(), input);

  // The root rule places the auxiliary after the wh-filler but before the
  // rest of the clause: non-initial in the RHS child list, initial in the
  // yield once the filler is accounted for.
  match &trees[0] {
    mcfg::Tree::Node { label, children } => {
      assert!(label.starts_with('S'));
      assert_eq!(children.len(), 2);
    }
    mcfg::Tree::Leaf(_) => panic!("expected an internal node"),
  }
}

#[test]
fn pp_attachment_yields_at_least_two_trees() {
  let g = grammar();
  let input = tokens("the human saw the greyhound with the salmon");
  let trees = g.parse(&input);
  assert!(trees.len() >= 2, "expected PP-attachment ambiguity, got {} tree(s)", trees.len());
  for t in &trees {
    assert_eq!(t.leaves(), input);
  }
}

#[test]
fn rejects_a_double_determiner_sentence() {
  let g = grammar();
  assert!(!g.recognize(&tokens("the the greyhound")));
}

#[test]
fn rejects_a_bare_verb() {
  let g = grammar();
  assert!(!g.recognize(&tokens("saw")));
}

#[test]
fn run_dispatches_on_mode() {
  let g = grammar();
  let input = tokens("the human saw the greyhound");

  match g.run(&input, Mode::Recognize) {
    Outcome::Recognized(true) => {}
    other => panic!("expected Recognized(true), got {:?}", other),
  }

  match g.run(&input, Mode::Parse) {
    Outcome::Parsed(trees) => assert_eq!(trees.len(), 1),
    other => panic!("expected Parsed(_), got {:?}", other),
  }
}

#[test]
fn rejects_a_non_linear_rule() {
  // S(uu) -> NP(u): u is used twice on the LHS.
  let err = "S(uu) -> NP(u)\nNP(the)\n".parse::<Grammar>().unwrap_err();
  assert!(err.to_string().contains("occurs"));
}

#[test]
fn rejects_an_undeclared_lhs_variable() {
  // S(uv) -> NP(u): v is never bound by the RHS.
  let err = "S(uv) -> NP(u)\nNP(the)\n".parse::<Grammar>().unwrap_err();
  assert!(err.to_string().contains("never bound"));
}

#[test]
fn accepts_a_trivial_unary_rule() {
  let g: Grammar = "S(u) -> NP(u)\nNP(the)\n".parse().unwrap();
  assert!(g.recognize(&["the"]));
}

#[test]
fn reparsing_the_same_input_is_idempotent() {
  let g = grammar();
  let input = tokens("the human saw the greyhound with the salmon");
  let first = g.parse(&input).len();
  let second = g.parse(&input).len();
  assert_eq!(first, second);
}
