//! Versioned quarantine for entries that disappeared from the live
//! extraction. The archive only ever accumulates: quarantine never deletes,
//! it re-tags matched records with the current version and appends new
//! orphans under a version-suffixed key.

use tracing::warn;

use transloc_core::{Entry, SingleDictionary, Stage};

use crate::matcher::{index_old, match_text};
use crate::normalize::normalize;

/// Insert `entry`, bumping the version tag with a dotted ordinal until the
/// rendered key is free. Same-base entries from earlier cycles can collide
/// once both are re-tagged to the current version; uniqueness wins over the
/// plain tag and the collision is logged for audit.
fn insert_unique(archive: &mut SingleDictionary, mut entry: Entry, version: &str) {
    if !archive.contains_key(&entry.key.render()) {
        let _ = archive.insert(entry);
        return;
    }
    let mut ordinal = 2usize;
    loop {
        let tag = format!("{version}.{ordinal}");
        let candidate = entry.key.with_version(&tag);
        if !archive.contains_key(&candidate.render()) {
            warn!(
                key = %candidate,
                "archive key collision, version tag extended"
            );
            entry.key = candidate;
            let _ = archive.insert(entry);
            return;
        }
        ordinal += 1;
    }
}

/// Merge freshly orphaned entries into the existing archive for one file.
///
/// This is the matcher's pairing run in archive mode: the orphans play the
/// old side, the existing archive plays the new side. Orphans whose
/// translation equals their original never held real work and are skipped.
/// Matched archive records take the orphan's normalized translation and are
/// re-tagged with `version`; unmatched orphans are appended with a
/// `_<version>` key suffix. Everything in the archive is stored locked.
pub fn quarantine(
    mut orphans: SingleDictionary,
    version: &str,
    existing: SingleDictionary,
) -> SingleDictionary {
    orphans.retain(|_, entry| entry.is_translated());

    let orphan_index = index_old(&orphans);

    // Existing archive indexed by original text, in rendered-key order. Both
    // sides of this pairing are persisted dictionaries, so both get the same
    // newline-escape treatment.
    let mut archive_index: Vec<(String, Vec<String>)> = Vec::new();
    {
        use std::collections::BTreeMap;
        let mut by_text: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (key, entry) in existing.iter() {
            by_text
                .entry(match_text(entry, true))
                .or_default()
                .push(key.clone());
        }
        archive_index.extend(by_text);
    }

    let mut merged = existing;
    for (text, orphan_keys) in orphan_index.iter() {
        let archived_keys = archive_index
            .iter()
            .find(|(t, _)| t == text)
            .map(|(_, keys)| keys.as_slice())
            .unwrap_or(&[]);
        if !archived_keys.is_empty() && archived_keys.len() != orphan_keys.len() {
            // Known ambiguity: positional pairing across cycles can bind
            // unrelated duplicates when counts differ. Kept for
            // compatibility, surfaced for audit.
            warn!(
                text = %text,
                orphans = orphan_keys.len(),
                archived = archived_keys.len(),
                "duplicate count mismatch between orphans and archive"
            );
        }
        for (idx, orphan_key) in orphan_keys.iter().enumerate() {
            let Some(orphan) = orphans.remove(orphan_key) else {
                continue;
            };
            match archived_keys.get(idx) {
                Some(archived_key) => {
                    // Re-tag the matched archive record under the current
                    // version and refresh its translation from the orphan.
                    if let Some(mut archived) = merged.remove(archived_key) {
                        archived.key = archived.key.with_version(version);
                        archived.translation = normalize(&orphan.translation, &orphan.key);
                        archived.stage = Stage::Locked;
                        insert_unique(&mut merged, archived, version);
                    }
                }
                None => {
                    let mut fresh = orphan;
                    fresh.key = fresh.key.with_version(version);
                    fresh.translation = normalize(&fresh.translation, &fresh.key);
                    fresh.stage = Stage::Locked;
                    insert_unique(&mut merged, fresh, version);
                }
            }
        }
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use transloc_core::EntryKey;

    fn entry(key: &str, original: &str, translation: &str, stage: u8) -> Entry {
        Entry {
            key: EntryKey::parse(key).unwrap(),
            original: original.to_string(),
            translation: translation.to_string(),
            stage: Stage::from_raw(stage).unwrap(),
        }
    }

    fn dict(entries: Vec<Entry>) -> SingleDictionary {
        let mut d = SingleDictionary::new();
        for e in entries {
            d.insert(e).unwrap();
        }
        d
    }

    #[test]
    fn orphan_is_appended_with_version_suffix_and_locked() {
        let orphans = dict(vec![entry("0001", "Hi", "嗨", 1)]);
        let merged = quarantine(orphans, "v1", SingleDictionary::new());
        assert_eq!(merged.len(), 1);
        let archived = merged.get("0001_v1").unwrap();
        assert_eq!(archived.original, "Hi");
        assert_eq!(archived.translation, "嗨");
        assert_eq!(archived.stage, Stage::Locked);
    }

    #[test]
    fn untranslated_lookalikes_are_skipped() {
        // stage != 0 but translation == original: never actually translated.
        let orphans = dict(vec![
            entry("a_text_0", "Same text", "Same text", 1),
            entry("b_text_0", "Real", "真", 1),
        ]);
        let merged = quarantine(orphans, "v1", SingleDictionary::new());
        assert_eq!(merged.len(), 1);
        assert!(merged.get("b_text_0_v1").is_some());
    }

    #[test]
    fn matched_archive_record_is_retagged() {
        let existing = dict(vec![entry("a_text_0_0.1.0", "Gone", "旧译", 9)]);
        let orphans = dict(vec![entry("a_text_7", "Gone", "新译", 1)]);
        let merged = quarantine(orphans, "0.2.0", existing);
        assert_eq!(merged.len(), 1);
        let archived = merged.get("a_text_0_0.2.0").unwrap();
        assert_eq!(archived.translation, "新译");
        assert_eq!(archived.stage, Stage::Locked);
    }

    #[test]
    fn archive_only_accumulates() {
        let existing = dict(vec![entry("a_text_0_0.1.0", "Old ghost", "甲", 9)]);
        let orphans = dict(vec![entry("b_text_0", "New ghost", "乙", 1)]);
        let merged = quarantine(orphans, "0.2.0", existing);
        assert_eq!(merged.len(), 2);
        assert!(merged.get("a_text_0_0.1.0").is_some());
        assert!(merged.get("b_text_0_0.2.0").is_some());
    }

    #[test]
    fn surplus_orphans_are_appended_alongside_matches() {
        let existing = dict(vec![entry("a_text_0_0.1.0", "Dup", "甲", 9)]);
        let orphans = dict(vec![
            entry("x_text_0", "Dup", "乙", 1),
            entry("y_text_1", "Dup", "丙", 1),
        ]);
        let merged = quarantine(orphans, "0.2.0", existing);
        assert_eq!(merged.len(), 2);
        // First orphan binds to the existing record, second is appended.
        assert_eq!(merged.get("a_text_0_0.2.0").unwrap().translation, "乙");
        assert_eq!(merged.get("y_text_1_0.2.0").unwrap().translation, "丙");
    }

    #[test]
    fn key_collisions_get_a_dotted_ordinal() {
        // Two archive generations of the same base key, different texts, both
        // retagged to the same version.
        let existing = dict(vec![
            entry("a_text_0_0.1.0", "First ghost", "甲", 9),
            entry("a_text_0_0.2.0", "Second ghost", "乙", 9),
        ]);
        let orphans = dict(vec![
            entry("a_text_0", "First ghost", "甲二", 1),
            entry("b_text_0", "Second ghost", "乙二", 1),
        ]);
        let merged = quarantine(orphans, "0.3.0", existing);
        assert_eq!(merged.len(), 2);
        let keys: Vec<&String> = merged.keys().collect();
        assert_eq!(keys.len(), 2);
        assert!(keys.iter().all(|k| k.contains("0.3.0")));
        // No duplicate rendered keys survive.
        let mut dedup = keys.clone();
        dedup.dedup();
        assert_eq!(dedup.len(), keys.len());
    }

    #[test]
    fn empty_result_for_no_real_orphans() {
        let orphans = dict(vec![entry("a_text_0", "Same", "Same", 2)]);
        let merged = quarantine(orphans, "v1", SingleDictionary::new());
        assert!(merged.is_empty());
    }
}
