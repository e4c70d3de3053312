//! Typographic cleanup applied to translations carried over by the matcher.
//!
//! Every rule is idempotent, so re-running reconciliation over an already
//! cleaned dictionary leaves it byte-identical.

use once_cell::sync::Lazy;
use regex::Regex;
use transloc_core::EntryKey;

static QUOTED_CJK: Lazy<Regex> = Lazy::new(|| Regex::new(r"'(\p{Han}+)'").unwrap());
static TAB_SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\t +").unwrap());
static BRACKET_CJK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\] (\p{Han})").unwrap());
static CJK_BRACKET: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\p{Han}) \[").unwrap());
static BRACKET_BRACKET: Lazy<Regex> = Lazy::new(|| Regex::new(r"\] \[").unwrap());
static OPEN_TAG_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(<[ib]>) +").unwrap());
static SPACE_CLOSE_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r" +(</[ib]>)").unwrap());

/// Normalize a carried-over translation for `key`. Total and idempotent.
///
/// Straight single quotes around a CJK run become paired curly double quotes,
/// except for effects-class entries whose payload is raw effect code where
/// quotes are syntax. The remaining rules always apply: ASCII parentheses,
/// tab/space collapsing, and space removal around brackets and inline tags.
pub fn normalize(translation: &str, key: &EntryKey) -> String {
    let mut text = if key.is_effects() {
        translation.to_string()
    } else {
        QUOTED_CJK.replace_all(translation, "\u{201C}$1\u{201D}").into_owned()
    };
    text = text.replace('（', "(").replace('）', ")");
    text = TAB_SPACES.replace_all(&text, "\t").into_owned();
    text = BRACKET_CJK.replace_all(&text, "]$1").into_owned();
    text = CJK_BRACKET.replace_all(&text, "$1[").into_owned();
    text = BRACKET_BRACKET.replace_all(&text, "][").into_owned();
    text = OPEN_TAG_SPACE.replace_all(&text, "$1").into_owned();
    text = SPACE_CLOSE_TAG.replace_all(&text, "$1").into_owned();
    text
}
