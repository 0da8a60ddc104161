//! Approximate name matching for medicine lookup.
//!
//! The score is an edit-distance-like dissimilarity used only to rank
//! candidate names. It combines a positional mismatch count with
//! single-character deletions from either string, explored to a bounded
//! depth. It is not Levenshtein distance: registry cutoffs are tuned to this
//! scale.

/// Deepest deletion level that is scored normally
pub const MAX_OFFSET: usize = 3;

/// Case-fold a name for comparison
///
/// Whitespace is kept, so stray spaces count against a query like any other
/// character. Folding is Unicode lowercase mapping: `ß` stays `ß`.
pub fn casefold(s: &str) -> String {
    s.to_lowercase()
}

/// Dissimilarity between two names after case folding
pub fn name_dissimilarity(query: &str, candidate: &str) -> usize {
    dissimilarity(&casefold(query), &casefold(candidate))
}

/// Dissimilarity between two strings, compared as given
///
/// Identical strings score 0. Each deletion explored adds 1 to the score of
/// the branch it leads to.
pub fn dissimilarity(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    score(&a, &b, 0)
}

fn score(a: &[char], b: &[char], offset: usize) -> usize {
    if offset > MAX_OFFSET {
        // Larger than any real score at this depth
        return a.len() + b.len() + offset;
    }
    if a == b {
        return offset;
    }

    let mismatched = a.iter().zip(b).filter(|(x, y)| x != y).count();
    let mut best = a.len().abs_diff(b.len()) + offset + mismatched;

    // One level deeper only yields the out-of-bound score, which can't beat
    // the positional count.
    if offset == MAX_OFFSET {
        return best;
    }

    for i in 0..a.len() {
        best = best.min(score(&without(a, i), b, offset + 1));
    }
    for i in 0..b.len() {
        best = best.min(score(a, &without(b, i), offset + 1));
    }

    best
}

fn without(s: &[char], i: usize) -> Vec<char> {
    let mut out = Vec::with_capacity(s.len().saturating_sub(1));
    out.extend_from_slice(&s[..i]);
    out.extend_from_slice(&s[i + 1..]);
    out
}
