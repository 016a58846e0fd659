//! Text folding rules used by hash-based grouping.

use std::borrow::Cow;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::{is_nfd, UnicodeNormalization};

/// How text key values are normalized before they are compared for equality.
///
/// All strategies treat canonically equivalent strings (`"é"` precomposed vs `"e\u{301}"`) as
/// equal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TextFoldingStrategy {
    #[default]
    Exact,
    /// Unicode case folding (`"straße"` groups with `"STRASSE"`).
    CaseInsensitive,
    /// Case folding plus removal of combining marks (`"Café"` groups with `"cafe"`).
    CaseAndAccentInsensitive,
}

impl TextFoldingStrategy {
    pub fn fold(self, text: &str) -> Cow<'_, str> {
        if text.is_ascii() {
            return match self {
                TextFoldingStrategy::Exact => Cow::Borrowed(text),
                _ if !text.bytes().any(|b| b.is_ascii_lowercase()) => Cow::Borrowed(text),
                _ => Cow::Owned(text.to_ascii_uppercase()),
            };
        }

        match self {
            TextFoldingStrategy::Exact if is_nfd(text) => Cow::Borrowed(text),
            TextFoldingStrategy::Exact => Cow::Owned(text.nfd().collect()),
            TextFoldingStrategy::CaseInsensitive => {
                Cow::Owned(text.nfd().flat_map(char::to_uppercase).collect())
            }
            TextFoldingStrategy::CaseAndAccentInsensitive => Cow::Owned(
                text.nfd()
                    .filter(|c| !is_combining_mark(*c))
                    .flat_map(char::to_uppercase)
                    .collect(),
            ),
        }
    }
}
