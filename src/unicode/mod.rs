//! Unicode guards shared by the identifier and email validators
//!
//! Architecture: Domain Primitives - character classes used as anti-spoofing gates
//! - Invisible formatting code points are a closed, explicit set
//! - Compatibility normalization borrows when the input is already normalized

use std::borrow::Cow;
use unicode_normalization::{is_nfkc_quick, IsNormalized, UnicodeNormalization};

/// Whether a character is an invisible formatting code point that can hide
/// payload inside an otherwise valid-looking identifier.
///
/// Covers zero-width space/joiners, bidi marks and embeddings, narrow
/// no-break space, word joiner, ideographic space and the byte-order mark.
pub fn is_invisible_format(c: char) -> bool {
    matches!(
        c,
        '\u{200B}'..='\u{200F}'
            | '\u{202A}'..='\u{202E}'
            | '\u{202F}'
            | '\u{2060}'
            | '\u{3000}'
            | '\u{FEFF}'
    )
}

/// Whether the text contains any invisible formatting code point
pub fn contains_invisible(text: &str) -> bool {
    text.chars().any(is_invisible_format)
}

/// Whether every code point is below 128
pub fn is_ascii_only(text: &str) -> bool {
    text.is_ascii()
}

/// Whether the text contains any whitespace character, ASCII or Unicode
pub fn contains_whitespace(text: &str) -> bool {
    text.chars().any(char::is_whitespace)
}

/// Apply NFKC compatibility normalization
pub fn nfkc(text: &str) -> Cow<'_, str> {
    match is_nfkc_quick(text.chars()) {
        IsNormalized::Yes => Cow::Borrowed(text),
        _ => Cow::Owned(text.nfkc().collect()),
    }
}
