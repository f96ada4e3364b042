// Copyright (c) 2023 The MobileCoin Foundation

//! String preparation from [RFC4518](https://www.rfc-editor.org/rfc/rfc4518)
//! followed by case folding, the combination used for `caseIgnoreMatch`.
//!
//! A good document on normal forms, https://unicode.org/reports/tr15/#Norm_Forms

use unicode_normalization::UnicodeNormalization;

/// Prepare `value` for a case insensitive comparison.
///
/// Two attribute values match when their prepared forms are equal.
pub(crate) fn prepare(value: &str) -> String {
    let normalized = value
        .chars()
        .filter_map(map_character)
        .nfkc()
        .collect::<String>();
    let folded = caseless::default_case_fold_str(&normalized);
    compress_spaces(&folded)
}

/// Step 2 of https://www.rfc-editor.org/rfc/rfc4518#section-2.2
///
/// Whitespace maps to a plain space and the ignorable code points are dropped.
fn map_character(c: char) -> Option<char> {
    if c.is_whitespace() {
        return Some(' ');
    }
    match c {
        '\u{0000}'..='\u{0008}'
        | '\u{000E}'..='\u{001F}'
        | '\u{007F}'..='\u{0084}'
        | '\u{0086}'..='\u{009F}'
        | '\u{00AD}'
        | '\u{034F}'
        | '\u{06DD}'
        | '\u{070F}'
        | '\u{1806}'
        | '\u{180B}'..='\u{180E}'
        | '\u{200B}'..='\u{200F}'
        | '\u{202A}'..='\u{202E}'
        | '\u{2060}'..='\u{2063}'
        | '\u{206A}'..='\u{206F}'
        // RFC4518 says FF00-FE0F, RFC3454 appendix B.1 has the correct range
        | '\u{FE00}'..='\u{FE0F}'
        | '\u{FEFF}'
        | '\u{FFF9}'..='\u{FFFC}'
        | '\u{1D173}'..='\u{1D17A}'
        | '\u{E0001}'
        | '\u{E0020}'..='\u{E0074}' => None,
        c => Some(c),
    }
}

/// Insignificant space handling from
/// https://www.rfc-editor.org/rfc/rfc4518#section-2.6.1
///
/// The result has one leading space, one trailing space and every inner run
/// of spaces replaced by exactly two spaces.
fn compress_spaces(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + 2);
    result.push(' ');
    let mut words = s.split(' ').filter(|word| !word.is_empty()).peekable();
    while let Some(word) = words.next() {
        result.push_str(word);
        if words.peek().is_some() {
            result.push_str("  ");
        }
    }
    result.push(' ');
    result
}
