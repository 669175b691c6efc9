/// Recursive-descent parsing of the MCFG rule text format:
///
/// ```text
/// Nonterminal(comp1, comp2, …) -> Child1(vars…) Child2(vars…) …
/// Nonterminal(terminal_token)        # terminal rule, no arrow
/// ```
///
/// Each LHS `compN` is a whitespace-free concatenation of single-letter
/// variables; each RHS child's argument list is a comma-separated list of
/// single-letter variables, one per component that child yields. A rule
/// with no `->` is a terminal rule, and its single LHS "component" is
/// instead a literal token (which may be any run of non-whitespace,
/// non-`()`/`,` characters, not just a single letter). One rule per
/// (comment-stripped) line.
use regex::Regex;

use crate::errors::ParseGrammarError;
use crate::rules::Rule;

type ParseResult<'a, T> = Result<(T, &'a str), ParseGrammarError>;

macro_rules! regex_static {
  ($name:ident, $pattern:expr) => {
    lazy_static::lazy_static! {
      static ref $name: Regex = Regex::new($pattern).unwrap();
    }
  };
}

fn optional_re<'a>(re: &Regex, s: &'a str) -> (Option<&'a str>, &'a str) {
  if let Some(m) = re.find(s) {
    if m.start() == 0 {
      return (Some(m.as_str()), &s[m.end()..]);
    }
  }
  (None, s)
}

fn needed_re<'a>(re: &'static Regex, s: &'a str, what: &str) -> ParseResult<'a, &'a str> {
  match optional_re(re, s) {
    (Some(m), rest) => Ok((m, rest)),
    (None, _) => Err(ParseGrammarError::Syntax(format!("expected {} at {:?}", what, truncate(s)))),
  }
}

fn optional_char(c: char, s: &str) -> (bool, &str) {
  if s.starts_with(c) {
    (true, &s[c.len_utf8()..])
  } else {
    (false, s)
  }
}

fn needed_char(c: char, s: &str) -> ParseResult<()> {
  match optional_char(c, s) {
    (true, rest) => Ok(((), rest)),
    (false, _) => Err(ParseGrammarError::Syntax(format!("expected '{}' at {:?}", c, truncate(s)))),
  }
}

fn truncate(s: &str) -> &str {
  let end = s.char_indices().nth(24).map(|(i, _)| i).unwrap_or(s.len());
  &s[..end]
}

fn skip_inline_whitespace(s: &str) -> &str {
  regex_static!(INLINE_WS, r"[ \t]+");
  optional_re(&INLINE_WS, s).1
}

fn parse_name(s: &str) -> ParseResult<&str> {
  regex_static!(NAME, r"[a-zA-Z][a-zA-Z0-9_-]*");
  needed_re(&NAME, s, "a name")
}

fn parse_token(s: &str) -> ParseResult<&str> {
  regex_static!(TOKEN, r"[^\s,()]+");
  needed_re(&TOKEN, s, "a terminal token")
}

/// Parses one comma-separated, parenthesized argument list, returning the
/// raw text of each argument.
fn parse_arg_list(s: &str) -> ParseResult<Vec<&str>> {
  let (_, mut rem) = needed_char('(', s)?;
  let mut args = Vec::new();
  loop {
    rem = skip_inline_whitespace(rem);
    let (tok, after) = parse_token(rem)?;
    args.push(tok);
    rem = skip_inline_whitespace(after);
    let (had_comma, after_comma) = optional_char(',', rem);
    if had_comma {
      rem = after_comma;
      continue;
    }
    break;
  }
  let (_, rem) = needed_char(')', rem)?;
  Ok((args, rem))
}

fn is_variable_letters(s: &str) -> bool {
  !s.is_empty() && s.chars().all(|c| c.is_ascii_lowercase())
}

/// Parses one `Name(args) [-> Child(vars) ...]` rule from a single
/// (comment-stripped, already-trimmed) line.
fn parse_rule_line(line: &str) -> Result<Rule, ParseGrammarError> {
  let (name, rem) = parse_name(line)?;
  let rem = skip_inline_whitespace(rem);
  let (lhs_args, rem) = parse_arg_list(rem)?;
  let rem = skip_inline_whitespace(rem);

  regex_static!(ARROW, "->");
  match optional_re(&ARROW, rem) {
    (Some(_), rem) => {
      let mut pattern = Vec::with_capacity(lhs_args.len());
      for arg in &lhs_args {
        if !is_variable_letters(arg) {
          return Err(ParseGrammarError::Syntax(format!(
            "LHS component {:?} of nonterminal rule {:?} must be single-letter variables",
            arg, name
          )));
        }
        pattern.push(arg.chars().collect());
      }

      let mut rhs = Vec::new();
      let mut rem = skip_inline_whitespace(rem);
      while !rem.is_empty() {
        let (child_name, after) = parse_name(rem)?;
        let after = skip_inline_whitespace(after);
        let (child_args, after) = parse_arg_list(after)?;
        let mut vars = Vec::with_capacity(child_args.len());
        for arg in &child_args {
          if arg.chars().count() != 1 || !is_variable_letters(arg) {
            return Err(ParseGrammarError::Syntax(format!(
              "RHS argument {:?} of {:?} must be a single-letter variable",
              arg, child_name
            )));
          }
          vars.push(arg.chars().next().unwrap());
        }
        rhs.push((child_name.to_string(), vars));
        rem = skip_inline_whitespace(after);
      }

      if rhs.is_empty() {
        return Err(ParseGrammarError::Syntax(format!(
          "nonterminal rule {:?} needs a '->' followed by at least one RHS child",
          name
        )));
      }

      let arity = pattern.len();
      Ok(Rule::from_parts(name, arity, pattern, rhs)?)
    }
    (None, rem) => {
      if !rem.is_empty() {
        return Err(ParseGrammarError::Syntax(format!("unexpected trailing text after {:?}", name)));
      }
      if lhs_args.len() != 1 {
        return Err(ParseGrammarError::Syntax(format!(
          "terminal rule {:?} must have exactly one token",
          name
        )));
      }
      Ok(Rule::terminal(name, lhs_args[0]))
    }
  }
}

fn strip_comment(line: &str) -> &str {
  match line.find("//") {
    Some(idx) => &line[..idx],
    None => line,
  }
}

/// Parses a whole grammar file's worth of rule text, one rule per
/// (comment-stripped) non-blank line.
pub fn parse(s: &str) -> Result<Vec<Rule>, ParseGrammarError> {
  let mut rules = Vec::new();
  for raw_line in s.lines() {
    let line = strip_comment(raw_line).trim();
    if line.is_empty() {
      continue;
    }
    rules.push(parse_rule_line(line)?);
  }
  Ok(rules)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_terminal_rule() {
    let rules = parse("D(the)").unwrap();
    assert_eq!(rules.len(), 1);
    assert!(rules[0].is_terminal());
    assert_eq!(rules[0].terminal_token(), Some("the"));
  }

  #[test]
  fn parses_contiguous_nonterminal_rule() {
    let rules = parse("S(uv) -> NP(u) VP(v)").unwrap();
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0].lhs, "S");
    assert_eq!(rules[0].lhs_arity, 1);
  }

  #[test]
  fn parses_discontiguous_nonterminal_rule() {
    let rules = parse("Swhmain(v, uw) -> NP(u) VPwhmain(v, w)").unwrap();
    assert_eq!(rules[0].lhs_arity, 2);
  }

  #[test]
  fn parses_multiple_rules_and_comments() {
    let text = "
      // a tiny grammar
      S(uv) -> NP(u) VP(v)
      NP(the)
      VP(barks)
    ";
    let rules = parse(text).unwrap();
    assert_eq!(rules.len(), 3);
  }

  #[test]
  fn rejects_multi_letter_rhs_variable() {
    let err = parse("S(uv) -> NP(uv) VP(v)").unwrap_err();
    assert!(matches!(err, ParseGrammarError::Syntax(_)));
  }
}
