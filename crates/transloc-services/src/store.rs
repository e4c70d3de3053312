//! On-disk representation of dictionaries: a root directory of `.json`
//! files, each an array of entry records, mirroring the extracted source
//! layout. The archive lives under `outdated/` inside the same root.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;
use walkdir::WalkDir;

use transloc_core::{DictError, Result, SingleDictionary, WholeDictionary};

/// Sub-namespace holding quarantined entries, mirroring the live layout.
pub const OUTDATED_DIR: &str = "outdated";

/// Write through a temp file in the target directory, then rename into
/// place, so a crashed run never leaves a half-written dictionary.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Async twin of [`write_atomic`], used by the per-file orchestrator tasks.
pub async fn write_atomic_async(path: &Path, bytes: Vec<u8>) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, &bytes).await?;
    tokio::fs::rename(&tmp, path).await
}

pub fn load_single(path: &Path) -> std::result::Result<SingleDictionary, DictError> {
    let bytes = fs::read(path)?;
    SingleDictionary::from_json_slice(&bytes)
}

pub fn write_single(path: &Path, dict: &SingleDictionary) -> std::result::Result<(), DictError> {
    write_atomic(path, &dict.to_json_vec()?)?;
    Ok(())
}

/// Collect the relative paths of all dictionary files under `root`, skipping
/// the `outdated/` sub-namespace. Sorted for deterministic processing.
pub fn list_dict_files(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .extension()
                .map(|ext| ext.eq_ignore_ascii_case("json"))
                .unwrap_or(false)
        })
        .filter_map(|e| e.path().strip_prefix(root).ok().map(Path::to_path_buf))
        .filter(|rel| !rel.starts_with(OUTDATED_DIR))
        .collect();
    files.sort();
    files
}

/// Load a full dictionary tree. Files that fail to parse are skipped and
/// reported; they never abort the rest of the tree.
pub fn load_tree(root: &Path) -> (WholeDictionary, Vec<(PathBuf, String)>) {
    let mut dict = WholeDictionary::new();
    let mut failed = Vec::new();
    for rel in list_dict_files(root) {
        match load_single(&root.join(&rel)) {
            Ok(single) => {
                dict.insert(rel, single);
            }
            Err(err) => {
                warn!(file = %rel.display(), error = %err, "skipping corrupt dictionary file");
                failed.push((rel, err.to_string()));
            }
        }
    }
    (dict, failed)
}

/// Write a dictionary tree under `root`, one file per entry collection.
pub fn write_tree(root: &Path, dict: &WholeDictionary) -> Result<()> {
    for (rel, single) in dict {
        write_single(&root.join(rel), single)?;
    }
    Ok(())
}

/// Relocate the `outdated/` sub-namespace from `old_root` to `new_root`
/// wholesale, before any per-file processing. Directory-level migration: the
/// entries themselves are not touched here.
pub fn relocate_outdated(old_root: &Path, new_root: &Path) -> Result<()> {
    let src = old_root.join(OUTDATED_DIR);
    if !src.is_dir() {
        return Ok(());
    }
    let dst = new_root.join(OUTDATED_DIR);
    for entry in WalkDir::new(&src).into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry.path().strip_prefix(&src)?;
        let target = dst.join(rel);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(entry.path(), &target)?;
    }
    Ok(())
}

/// Aggregate counts over one dictionary tree.
#[derive(Debug, Clone, Copy, Default)]
pub struct EntryStats {
    pub files: usize,
    pub entries: usize,
    pub translated: usize,
}

pub fn count_entries(root: &Path) -> EntryStats {
    let (dict, _) = load_tree(root);
    let mut stats = EntryStats {
        files: dict.len(),
        ..EntryStats::default()
    };
    for single in dict.values() {
        stats.entries += single.len();
        stats.translated += single.values().filter(|e| e.has_memory()).count();
    }
    stats
}
