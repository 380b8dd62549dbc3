//! Fuzzy question matcher.
//!
//! Similarity is the Ratcliff-Obershelp ratio: twice the total size of all
//! matching blocks divided by the combined length of both strings, computed
//! over Unicode scalar values. A score of 1.0 means identical strings; 0.0
//! means nothing in common. Matching is case-sensitive; case and punctuation
//! differences only cost the characters they touch, so close variants of a
//! stored question still score high.
//!
//! Scanning is O(candidates x comparison cost) with no indexing, which is
//! fine for the tens-to-hundreds of entries a campus knowledge base holds.

use std::collections::HashMap;

/// Normalized similarity ratio between two strings, in `[0.0, 1.0]`.
/// Two empty strings are considered identical (1.0).
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let combined = a.len() + b.len();
    if combined == 0 {
        return 1.0;
    }
    let matches = match_count(&a, &b, 0, a.len(), 0, b.len());
    2.0 * matches as f64 / combined as f64
}

/// Best fuzzy match for `input` among `candidates`, or `None` if no candidate
/// scores at least `threshold`. Ties resolve to the first candidate in
/// iteration order that reaches the maximum score.
pub fn best_match<'a, I>(input: &str, candidates: I, threshold: f64) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut best: Option<(&str, f64)> = None;
    for candidate in candidates {
        let score = similarity_ratio(input, candidate);
        match best {
            Some((_, top)) if score <= top => {}
            _ => best = Some((candidate, score)),
        }
    }
    match best {
        Some((candidate, score)) if score >= threshold => {
            tracing::debug!(
                target: "campus::matcher",
                candidate,
                score,
                threshold,
                "local match accepted"
            );
            Some(candidate)
        }
        _ => None,
    }
}

/// Total size of all matching blocks between `a[alo..ahi]` and `b[blo..bhi]`:
/// the longest matching block, then recursively the pieces to its left and
/// right.
fn match_count(a: &[char], b: &[char], alo: usize, ahi: usize, blo: usize, bhi: usize) -> usize {
    let (i, j, size) = longest_match(a, b, alo, ahi, blo, bhi);
    if size == 0 {
        return 0;
    }
    size + match_count(a, b, alo, i, blo, j)
        + match_count(a, b, i + size, ahi, j + size, bhi)
}

/// Longest block of consecutive equal characters between `a[alo..ahi]` and
/// `b[blo..bhi]`. Returns `(i, j, size)` such that `a[i..i+size] ==
/// b[j..j+size]`; earliest block in `a` wins on ties.
fn longest_match(
    a: &[char],
    b: &[char],
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let mut best_i = alo;
    let mut best_j = blo;
    let mut best_size = 0;

    // j2len[j] = length of the run of matches ending at a[i], b[j].
    let mut j2len: HashMap<usize, usize> = HashMap::new();
    for i in alo..ahi {
        let mut next: HashMap<usize, usize> = HashMap::new();
        for j in blo..bhi {
            if b[j] == a[i] {
                let run = j
                    .checked_sub(1)
                    .and_then(|prev| j2len.get(&prev))
                    .copied()
                    .unwrap_or(0)
                    + 1;
                next.insert(j, run);
                if run > best_size {
                    best_i = i + 1 - run;
                    best_j = j + 1 - run;
                    best_size = run;
                }
            }
        }
        j2len = next;
    }

    (best_i, best_j, best_size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_strings_score_one() {
        assert_eq!(similarity_ratio("When is spring break?", "When is spring break?"), 1.0);
        assert_eq!(similarity_ratio("", ""), 1.0);
    }

    #[test]
    fn disjoint_strings_score_zero() {
        assert_eq!(similarity_ratio("abc", "xyz"), 0.0);
        assert_eq!(similarity_ratio("", "abc"), 0.0);
    }

    #[test]
    fn known_ratio_value() {
        // "bcd" is the longest (and only) matching block: 2 * 3 / 8.
        assert!((similarity_ratio("abcd", "bcde") - 0.75).abs() < 1e-12);
    }

    #[test]
    fn self_match_always_passes_default_threshold() {
        let questions = ["When is spring break?", "What are the library hours?"];
        for q in questions {
            assert_eq!(best_match(q, questions, 0.6), Some(q));
        }
    }

    #[test]
    fn case_and_punctuation_variant_still_matches() {
        let questions = ["When is spring break?", "What are the library hours?"];
        let got = best_match("when is spring break", questions, 0.6);
        assert_eq!(got, Some("When is spring break?"));
        assert!(similarity_ratio("when is spring break", "When is spring break?") >= 0.9);
    }

    #[test]
    fn below_threshold_returns_none() {
        let questions = ["When is spring break?", "What are the library hours?"];
        assert_eq!(best_match("zzzz qqqq", questions, 0.6), None);
    }

    #[test]
    fn tie_resolves_to_first_candidate() {
        // Both candidates share the "abc" block against the input.
        let candidates = ["abcd", "abce"];
        assert_eq!(best_match("abc", candidates, 0.5), Some("abcd"));
    }

    #[test]
    fn empty_candidate_set_returns_none() {
        assert_eq!(best_match("anything", [], 0.0), None);
    }
}
