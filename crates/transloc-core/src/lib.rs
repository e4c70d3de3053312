use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Workspace-wide result alias.
pub type Result<T> = color_eyre::eyre::Result<T>;

/// Errors raised while parsing or assembling dictionaries.
/// All of them are scoped to a single dictionary file; callers are expected
/// to skip the offending file and keep processing the rest.
#[derive(Debug, Error)]
pub enum DictError {
    #[error("entry key is empty")]
    EmptyKey,
    #[error("unsupported stage value {0}")]
    BadStage(u8),
    #[error("duplicate key `{0}` in dictionary")]
    DuplicateKey(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Lifecycle marker of a translatable entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    /// Fresh from extraction, holds no translator work.
    Untranslated,
    /// Translated (or changed since extraction) by a human.
    Translated,
    /// Auto-filled from an identical already-translated original.
    DuplicateFilled,
    /// Pulled forward from the outdated archive; not to be casually edited.
    Locked,
}

impl Stage {
    pub fn from_raw(raw: u8) -> std::result::Result<Self, DictError> {
        match raw {
            0 => Ok(Stage::Untranslated),
            1 => Ok(Stage::Translated),
            2 => Ok(Stage::DuplicateFilled),
            9 => Ok(Stage::Locked),
            other => Err(DictError::BadStage(other)),
        }
    }

    pub fn as_raw(self) -> u8 {
        match self {
            Stage::Untranslated => 0,
            Stage::Translated => 1,
            Stage::DuplicateFilled => 2,
            Stage::Locked => 9,
        }
    }
}

/// Entry identifier: a structural base plus an optional version tag that the
/// outdated archive appends on each quarantine cycle.
///
/// The canonical rendering is `base` or `base_<version>`. When parsing, the
/// segment after the final `_` is recognized as a version tag only if it
/// contains a dot: version strings are dotted (`0.4.8.9`), structural key
/// segments never are.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntryKey {
    base: String,
    version: Option<String>,
}

impl EntryKey {
    pub fn parse(raw: &str) -> std::result::Result<Self, DictError> {
        if raw.is_empty() {
            return Err(DictError::EmptyKey);
        }
        if let Some((base, tail)) = raw.rsplit_once('_') {
            if !base.is_empty() && tail.contains('.') {
                return Ok(EntryKey {
                    base: base.to_string(),
                    version: Some(tail.to_string()),
                });
            }
        }
        Ok(EntryKey {
            base: raw.to_string(),
            version: None,
        })
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Re-tag with `version`, replacing any version already present.
    pub fn with_version(&self, version: &str) -> EntryKey {
        EntryKey {
            base: self.base.clone(),
            version: Some(version.to_string()),
        }
    }

    pub fn render(&self) -> String {
        match &self.version {
            Some(v) => format!("{}_{}", self.base, v),
            None => self.base.clone(),
        }
    }

    /// True for keys produced by line-oriented source extraction: the base is
    /// a bare (usually fixed-width) line number.
    pub fn is_line_locator(&self) -> bool {
        !self.base.is_empty() && self.base.bytes().all(|b| b.is_ascii_digit())
    }

    /// Effects-class entries hold raw effect code and are exempt from the
    /// quote-pairing normalization rule.
    pub fn is_effects(&self) -> bool {
        self.base.to_ascii_lowercase().contains("effect")
    }
}

impl fmt::Display for EntryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// One translatable unit. `original` is immutable once extracted; only
/// `translation`, `stage` and (for archived entries) `key` ever change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub key: EntryKey,
    pub original: String,
    pub translation: String,
    pub stage: Stage,
}

impl Entry {
    /// Whether this entry carries translator work worth preserving.
    pub fn has_memory(&self) -> bool {
        self.stage != Stage::Untranslated
    }

    /// Whether the translation differs from the source text, i.e. someone
    /// actually translated it rather than confirming it verbatim.
    pub fn is_translated(&self) -> bool {
        self.has_memory() && self.translation != self.original
    }
}

/// Persisted shape of one entry, a JSON object inside a per-file array.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryRecord {
    pub key: String,
    pub original: String,
    #[serde(default)]
    pub translation: String,
    pub stage: u8,
}

impl EntryRecord {
    pub fn into_entry(self) -> std::result::Result<Entry, DictError> {
        Ok(Entry {
            key: EntryKey::parse(&self.key)?,
            original: self.original,
            translation: self.translation,
            stage: Stage::from_raw(self.stage)?,
        })
    }

    pub fn from_entry(entry: &Entry) -> EntryRecord {
        EntryRecord {
            key: entry.key.render(),
            original: entry.original.clone(),
            translation: entry.translation.clone(),
            stage: entry.stage.as_raw(),
        }
    }
}

/// Key-unique entry collection for one logical file, ordered by rendered key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SingleDictionary {
    entries: BTreeMap<String, Entry>,
}

impl SingleDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry, rejecting duplicate keys.
    pub fn insert(&mut self, entry: Entry) -> std::result::Result<(), DictError> {
        let rendered = entry.key.render();
        if self.entries.contains_key(&rendered) {
            return Err(DictError::DuplicateKey(rendered));
        }
        self.entries.insert(rendered, entry);
        Ok(())
    }

    /// Remove-and-return; the caller takes ownership of the entry.
    pub fn remove(&mut self, key: &str) -> Option<Entry> {
        self.entries.remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&Entry> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Entry> {
        self.entries.get_mut(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Entries in rendered-key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Entry)> {
        self.entries.iter()
    }

    pub fn values(&self) -> impl Iterator<Item = &Entry> {
        self.entries.values()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    pub fn retain(&mut self, f: impl FnMut(&String, &mut Entry) -> bool) {
        self.entries.retain(f);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn from_records(records: Vec<EntryRecord>) -> std::result::Result<Self, DictError> {
        let mut dict = SingleDictionary::new();
        for record in records {
            dict.insert(record.into_entry()?)?;
        }
        Ok(dict)
    }

    pub fn to_records(&self) -> Vec<EntryRecord> {
        self.entries.values().map(EntryRecord::from_entry).collect()
    }

    pub fn from_json_slice(bytes: &[u8]) -> std::result::Result<Self, DictError> {
        let records: Vec<EntryRecord> = serde_json::from_slice(bytes)?;
        Self::from_records(records)
    }

    pub fn to_json_vec(&self) -> std::result::Result<Vec<u8>, DictError> {
        Ok(serde_json::to_vec_pretty(&self.to_records())?)
    }
}

impl IntoIterator for SingleDictionary {
    type Item = (String, Entry);
    type IntoIter = std::collections::btree_map::IntoIter<String, Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Mapping from file-relative path to its entry dictionary. BTreeMap keeps
/// output iteration deterministic.
pub type WholeDictionary = BTreeMap<PathBuf, SingleDictionary>;

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(key: &str, original: &str, translation: &str, stage: u8) -> Entry {
        Entry {
            key: EntryKey::parse(key).unwrap(),
            original: original.to_string(),
            translation: translation.to_string(),
            stage: Stage::from_raw(stage).unwrap(),
        }
    }

    #[test]
    fn key_without_version_roundtrips() {
        let key = EntryKey::parse("description_text_4").unwrap();
        assert_eq!(key.base(), "description_text_4");
        assert_eq!(key.version(), None);
        assert_eq!(key.render(), "description_text_4");
    }

    #[test]
    fn dotted_tail_is_recognized_as_version() {
        let key = EntryKey::parse("description_text_4_0.4.8.9").unwrap();
        assert_eq!(key.base(), "description_text_4");
        assert_eq!(key.version(), Some("0.4.8.9"));
        assert_eq!(key.render(), "description_text_4_0.4.8.9");
    }

    #[test]
    fn retagging_replaces_the_version() {
        let key = EntryKey::parse("title_text_0_0.1.0").unwrap();
        let retagged = key.with_version("0.2.0");
        assert_eq!(retagged.render(), "title_text_0_0.2.0");
        // And retagging an unversioned key just appends.
        let key = EntryKey::parse("0042").unwrap();
        assert_eq!(key.with_version("0.2.0").render(), "0042_0.2.0");
    }

    #[test]
    fn line_locator_detection() {
        assert!(EntryKey::parse("0042").unwrap().is_line_locator());
        assert!(!EntryKey::parse("title_text_0").unwrap().is_line_locator());
        // A versioned line key still has a numeric base.
        assert!(EntryKey::parse("0042_0.1.0").unwrap().is_line_locator());
    }

    #[test]
    fn effects_keys_are_flagged() {
        assert!(EntryKey::parse("applyEffects_text_3").unwrap().is_effects());
        assert!(!EntryKey::parse("description_text_3").unwrap().is_effects());
    }

    #[test]
    fn empty_key_is_rejected() {
        assert!(matches!(EntryKey::parse(""), Err(DictError::EmptyKey)));
    }

    #[test]
    fn stage_values_are_validated() {
        assert!(Stage::from_raw(1).is_ok());
        assert!(Stage::from_raw(9).is_ok());
        assert!(matches!(Stage::from_raw(3), Err(DictError::BadStage(3))));
    }

    #[test]
    fn duplicate_keys_are_rejected() {
        let mut dict = SingleDictionary::new();
        dict.insert(entry("a_text_0", "Hi", "", 0)).unwrap();
        let err = dict.insert(entry("a_text_0", "Bye", "", 0)).unwrap_err();
        assert!(matches!(err, DictError::DuplicateKey(k) if k == "a_text_0"));
    }

    #[test]
    fn json_roundtrip_keeps_key_order() {
        let json = r#"[
            {"key": "b_text_1", "original": "B", "translation": "", "stage": 0},
            {"key": "a_text_0", "original": "A", "translation": "甲", "stage": 1}
        ]"#;
        let dict = SingleDictionary::from_json_slice(json.as_bytes()).unwrap();
        let records = dict.to_records();
        let keys: Vec<&str> = records.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["a_text_0", "b_text_1"]);
    }

    #[test]
    fn missing_translation_defaults_to_empty() {
        let json = br#"[{"key": "a_text_0", "original": "A", "stage": 0}]"#;
        let dict = SingleDictionary::from_json_slice(json).unwrap();
        assert_eq!(dict.get("a_text_0").unwrap().translation, "");
    }

    #[test]
    fn missing_stage_is_a_structural_error() {
        let json = br#"[{"key": "a_text_0", "original": "A", "translation": ""}]"#;
        assert!(SingleDictionary::from_json_slice(json).is_err());
    }
}
