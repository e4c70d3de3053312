//! Content-based matching of an old (translated) dictionary against a new
//! (freshly extracted) one for a single logical file.
//!
//! Matching is by exact original text, after trimming and after converting
//! literal `\n` escapes on the old side for markup-sourced entries. When the
//! same text occurs several times, pairing is positional in rendered-key
//! order on both sides, so it is deterministic and stable under array
//! reordering.

use std::collections::BTreeMap;

use transloc_core::{Entry, SingleDictionary, Stage};

use crate::normalize::normalize;

/// Original-text index built during one matching pass. Keys are collected in
/// dictionary iteration order, which is rendered-key order.
#[derive(Debug, Default)]
pub(crate) struct TextIndex {
    by_text: BTreeMap<String, Vec<String>>,
}

impl TextIndex {
    pub(crate) fn note(&mut self, text: String, key: String) {
        self.by_text.entry(text).or_default().push(key);
    }

    pub(crate) fn get(&self, text: &str) -> Option<&[String]> {
        self.by_text.get(text).map(Vec::as_slice)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.by_text.iter()
    }
}

/// The comparable form of an entry's original text. Persisted dictionaries
/// carry multi-line markup text with literal `\n` escapes; fresh extractions
/// carry real newlines, so the old side converts before comparing. Line-keyed
/// code entries are single lines and are never escaped.
pub(crate) fn match_text(entry: &Entry, unescape_newlines: bool) -> String {
    let text = if unescape_newlines && !entry.key.is_line_locator() {
        entry.original.replace("\\n", "\n")
    } else {
        entry.original.clone()
    };
    text.trim().to_string()
}

pub(crate) fn index_old(old: &SingleDictionary) -> TextIndex {
    let mut index = TextIndex::default();
    for (key, entry) in old.iter() {
        if entry.stage == Stage::Untranslated {
            continue;
        }
        index.note(match_text(entry, true), key.clone());
    }
    index
}

fn index_new(new: &SingleDictionary) -> TextIndex {
    let mut index = TextIndex::default();
    for (key, entry) in new.iter() {
        index.note(match_text(entry, false), key.clone());
    }
    index
}

/// Result of one carry-over pass.
#[derive(Debug)]
pub struct CarryOver {
    /// Old entries with translator work that found no new counterpart.
    pub unmatched_old: SingleDictionary,
    /// The new dictionary, enriched with carried translations and stages.
    pub updated_new: SingleDictionary,
    /// Number of entries carried forward.
    pub carried: usize,
}

/// Carry translations from `old` into `new`.
///
/// Stage-0 old entries are dropped up front: they hold no memory and are
/// never archived. Surplus old duplicates (more translated copies of a text
/// than the new snapshot has) are left in `unmatched_old`.
pub fn carry_over(mut old: SingleDictionary, mut new: SingleDictionary) -> CarryOver {
    old.retain(|_, entry| entry.stage != Stage::Untranslated);

    let old_index = index_old(&old);
    let new_index = index_new(&new);

    let mut carried = 0usize;
    for (text, old_keys) in old_index.iter() {
        let Some(new_keys) = new_index.get(text) else {
            continue;
        };
        for (old_key, new_key) in old_keys.iter().zip(new_keys.iter()) {
            // Ownership transfer: matched old entries leave the unmatched set.
            let Some(old_entry) = old.remove(old_key) else {
                continue;
            };
            if let Some(new_entry) = new.get_mut(new_key) {
                new_entry.translation = normalize(&old_entry.translation, &old_entry.key);
                new_entry.stage = old_entry.stage;
                carried += 1;
            }
        }
    }

    CarryOver {
        unmatched_old: old,
        updated_new: new,
        carried,
    }
}
