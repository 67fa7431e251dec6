//! Deterministic text normalization.
//!
//! Two total, idempotent functions: `clean` keeps text printable by the card
//! fonts, `normalize_for_match` reduces text to a lowercase matching key.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Fold accents and curly punctuation, then drop anything the rendering fonts
/// cannot print.
pub fn clean(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.nfd() {
        if is_combining_mark(ch) {
            continue;
        }
        let ch = fold_punctuation(ch);
        if is_printable(ch) {
            out.push(ch);
        }
    }
    out
}

/// Lowercase and strip to `[0-9a-z-]` plus whitespace. Used only for
/// matching, never for display.
pub fn normalize_for_match(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .filter(|c| {
            c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-' || c.is_whitespace()
        })
        .collect()
}

fn fold_punctuation(ch: char) -> char {
    match ch {
        '\u{2018}' | '\u{2019}' => '\'',
        '\u{201C}' | '\u{201D}' => '"',
        '\u{2014}' => '-',
        c => c,
    }
}

fn is_printable(ch: char) -> bool {
    ch.is_ascii_alphanumeric()
        || ch.is_whitespace()
        || matches!(
            ch,
            '-' | '_'
                | ','
                | '.'
                | '{'
                | '}'
                | '$'
                | '['
                | ']'
                | '@'
                | '('
                | ')'
                | '|'
                | '&'
                | '?'
                | '!'
                | ';'
                | '/'
                | '\\'
                | '%'
                | '#'
                | ':'
                | '<'
                | '>'
                | '+'
                | '*'
                | '^'
                | '='
                | '\''
                | '"'
                | '`'
                | '~'
        )
}
