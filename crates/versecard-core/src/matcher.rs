//! Tiered fuzzy line matching.
//!
//! Four precedence tiers, evaluated in order over normalized lines; the first
//! tier that hits anywhere wins, and within a tier the earliest line wins.
//! Tier 1 favors exact phrases, tier 4 guarantees recall whenever any query
//! word appears at all.

/// Find the best-matching line for an already-normalized query.
///
/// Returns `None` when no tier hits; callers fall back to displaying the raw
/// query itself.
pub fn find_best_line(query: &str, lines: &[String]) -> Option<usize> {
    // Consecutive spaces would otherwise yield empty words, and an empty
    // needle substring-matches every line in tier 4.
    let words: Vec<&str> = query.split(' ').filter(|w| !w.is_empty()).collect();

    let tiers: [&dyn Fn(&str) -> bool; 4] = [
        &|line| contains_whole_word(line, query),
        &|line| line.contains(query),
        &|line| words.iter().any(|w| contains_whole_word(line, w)),
        &|line| words.iter().any(|w| line.contains(w)),
    ];

    tiers
        .iter()
        .find_map(|tier| lines.iter().position(|line| tier(line)))
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Substring match with word-boundary semantics on both edges: a boundary
/// exists where word-ness flips, with the ends of the line counting as
/// non-word.
fn contains_whole_word(line: &str, needle: &str) -> bool {
    let (Some(first), Some(last)) = (needle.chars().next(), needle.chars().next_back()) else {
        return false;
    };
    for (i, _) in line.match_indices(needle) {
        let prev_is_word = line[..i].chars().next_back().is_some_and(is_word_char);
        let next_is_word = line[i + needle.len()..].chars().next().is_some_and(is_word_char);
        if prev_is_word != is_word_char(first) && next_is_word != is_word_char(last) {
            return true;
        }
    }
    false
}
