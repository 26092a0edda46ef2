//! Canonical form for Arabic/English header labels.
//!
//! Only used for comparisons; stored values are never normalized.

use lazy_static::lazy_static;
use regex::Regex;

const ZERO_WIDTH_SPACE: char = '\u{200B}';

lazy_static! {
    // Unicode decimal digits (Nd), so Arabic-Indic digits match and
    // fractions or roman numerals do not.
    static ref DIGIT_RE: Regex = Regex::new(r"\d").expect("digit pattern");
}

fn is_stripped_mark(c: char) -> bool {
    // Tanween, short vowels, shadda, sukun, maddah, hamza marks and the
    // remaining combining signs of the block, plus superscript alef.
    matches!(c, '\u{064B}'..='\u{065F}' | '\u{0670}')
}

fn fold_letter(c: char) -> char {
    match c {
        'أ' | 'إ' | 'آ' => 'ا',
        'ة' => 'ه',
        'ى' | 'ئ' => 'ي',
        other => other,
    }
}

/// Normalize a header or cell string for matching.
///
/// Missing input becomes the empty string. The result has no leading or
/// trailing whitespace and never contains two consecutive spaces, which makes
/// the function idempotent.
pub fn normalize_text(text: Option<&str>) -> String {
    let Some(text) = text else {
        return String::new();
    };

    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;
    for c in text.trim().chars() {
        if c == ZERO_WIDTH_SPACE || is_stripped_mark(c) {
            continue;
        }
        // char::is_whitespace covers U+00A0 and the other Unicode spaces.
        if c.is_whitespace() {
            pending_space = true;
            continue;
        }
        if pending_space && !out.is_empty() {
            out.push(' ');
        }
        pending_space = false;
        out.push(fold_letter(c));
    }
    out
}

/// Convenience for the common non-optional case.
pub fn normalize(text: &str) -> String {
    normalize_text(Some(text))
}

/// Number of decimal digit characters in `value`.
pub fn digit_count(value: &str) -> usize {
    DIGIT_RE.find_iter(value).count()
}
