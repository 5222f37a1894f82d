//! Nearest-match suggestions for mistyped task names

/// Maximum number of suggestions returned
const MAX_SUGGESTIONS: usize = 3;

/// Return the candidates closest to `name`, best first.
///
/// A candidate qualifies when its edit distance is at most a third of the
/// longer name (minimum 2), or when one name is a prefix of the other.
pub fn suggest_names<'a, I>(name: &str, candidates: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut scored: Vec<(usize, &str)> = candidates
        .into_iter()
        .filter(|c| *c != name)
        .filter_map(|c| {
            let distance = levenshtein(name, c);
            let limit = (name.chars().count().max(c.chars().count()) / 3).max(2);
            let prefix = !name.is_empty() && (c.starts_with(name) || name.starts_with(c));
            (distance <= limit || prefix).then_some((distance, c))
        })
        .collect();

    scored.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(b.1)));
    scored
        .into_iter()
        .take(MAX_SUGGESTIONS)
        .map(|(_, c)| c.to_string())
        .collect()
}

/// Character-level edit distance
pub fn levenshtein(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr = vec![0; b_chars.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b_chars.iter().enumerate() {
            let cost = if ca == *cb { 0 } else { 1 };
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_chars.len()]
}
