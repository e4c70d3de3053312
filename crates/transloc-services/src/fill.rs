//! Duplicate fill: many originals repeat verbatim across files, so once one
//! copy is translated the rest can be filled automatically. Filled entries
//! are marked stage 2 to tell reviewers they were not hand-translated.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::info;

use transloc_core::{Result, Stage, WholeDictionary};

use crate::store;

#[derive(Debug, Default)]
pub struct FillSummary {
    pub filled: usize,
    /// Files that received at least one fill, with their fill counts.
    pub files: Vec<(PathBuf, usize)>,
}

/// Propagate the first known translation of each original text onto
/// untranslated entries with identical text. Deterministic: dictionaries
/// iterate in path order and entries in key order, so "first" is stable.
pub fn fill_duplicates(dict: &mut WholeDictionary) -> FillSummary {
    let mut known: HashMap<String, String> = HashMap::new();
    for single in dict.values() {
        for entry in single.values() {
            if entry.is_translated() {
                known
                    .entry(entry.original.clone())
                    .or_insert_with(|| entry.translation.clone());
            }
        }
    }

    let mut summary = FillSummary::default();
    for (path, single) in dict.iter_mut() {
        let mut filled_here = 0usize;
        for key in single.keys().cloned().collect::<Vec<_>>() {
            let Some(entry) = single.get_mut(&key) else {
                continue;
            };
            if entry.stage != Stage::Untranslated {
                continue;
            }
            if let Some(translation) = known.get(&entry.original) {
                entry.translation = translation.clone();
                entry.stage = Stage::DuplicateFilled;
                filled_here += 1;
            }
        }
        if filled_here > 0 {
            summary.files.push((path.clone(), filled_here));
            summary.filled += filled_here;
        }
    }
    summary
}

/// Disk variant: load the tree under `root`, fill, and write back only the
/// files that changed.
pub fn fill_tree(root: &Path, dry_run: bool) -> Result<FillSummary> {
    let (mut dict, _failed) = store::load_tree(root);
    let summary = fill_duplicates(&mut dict);
    if !dry_run {
        for (rel, _) in &summary.files {
            if let Some(single) = dict.get(rel) {
                store::write_single(&root.join(rel), single)?;
            }
        }
    }
    info!(filled = summary.filled, files = summary.files.len(), "duplicate fill finished");
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use transloc_core::{Entry, EntryKey, SingleDictionary};

    fn entry(key: &str, original: &str, translation: &str, stage: u8) -> Entry {
        Entry {
            key: EntryKey::parse(key).unwrap(),
            original: original.to_string(),
            translation: translation.to_string(),
            stage: Stage::from_raw(stage).unwrap(),
        }
    }

    fn single(entries: Vec<Entry>) -> SingleDictionary {
        let mut d = SingleDictionary::new();
        for e in entries {
            d.insert(e).unwrap();
        }
        d
    }

    #[test]
    fn identical_originals_are_filled_across_files() {
        let mut dict = WholeDictionary::new();
        dict.insert(
            PathBuf::from("a.json"),
            single(vec![entry("a_text_0", "Greetings", "问候", 1)]),
        );
        dict.insert(
            PathBuf::from("b.json"),
            single(vec![
                entry("b_text_0", "Greetings", "", 0),
                entry("b_text_1", "Different", "", 0),
            ]),
        );

        let summary = fill_duplicates(&mut dict);
        assert_eq!(summary.filled, 1);
        let filled = dict[Path::new("b.json")].get("b_text_0").unwrap();
        assert_eq!(filled.translation, "问候");
        assert_eq!(filled.stage, Stage::DuplicateFilled);
        // The unrelated entry stays untranslated.
        assert_eq!(dict[Path::new("b.json")].get("b_text_1").unwrap().stage, Stage::Untranslated);
    }

    #[test]
    fn translated_entries_are_never_overwritten() {
        let mut dict = WholeDictionary::new();
        dict.insert(
            PathBuf::from("a.json"),
            single(vec![
                entry("a_text_0", "Word", "词甲", 1),
                entry("a_text_1", "Word", "词乙", 1),
            ]),
        );
        let summary = fill_duplicates(&mut dict);
        assert_eq!(summary.filled, 0);
        assert_eq!(dict[Path::new("a.json")].get("a_text_1").unwrap().translation, "词乙");
    }

    #[test]
    fn verbatim_confirmations_do_not_seed_fills() {
        // stage != 0 but translation == original holds no real memory.
        let mut dict = WholeDictionary::new();
        dict.insert(
            PathBuf::from("a.json"),
            single(vec![
                entry("a_text_0", "Same", "Same", 1),
                entry("b_text_0", "Same", "", 0),
            ]),
        );
        let summary = fill_duplicates(&mut dict);
        assert_eq!(summary.filled, 0);
    }
}
