/// Cartesian product over a list of choice-lists: given `[[a, b], [c]]`
/// returns `[[a, c], [b, c]]`. Used both by the agenda loop (to enumerate
/// candidate child-item tuples for a rule) and by tree reconstruction (to
/// enumerate combinations of child derivations).
pub fn cartesian_product<T>(lists: &[Vec<T>]) -> Vec<Vec<T>>
where
  T: Clone,
{
  if lists.is_empty() {
    return vec![Vec::new()];
  }
  lists.iter().fold(vec![Vec::new()], |acc, choices| {
    acc
      .into_iter()
      .flat_map(|prefix| {
        choices.iter().map(move |choice| {
          let mut extended = prefix.clone();
          extended.push(choice.clone());
          extended
        })
      })
      .collect()
  })
}
