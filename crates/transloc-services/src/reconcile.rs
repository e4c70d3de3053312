//! Reconciliation orchestrator: drives matching, normalization and
//! quarantine per logical file, one cooperative task per file pair, and
//! aggregates cross-file statistics at the join point. A failed file never
//! aborts its siblings; the batch join always completes with partial
//! results.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tokio::task::JoinSet;
use tracing::{info, warn};

use transloc_core::{DictError, Result, SingleDictionary, WholeDictionary};

use crate::matcher::carry_over;
use crate::outdated::quarantine;
use crate::report::write_missing_reports;
use crate::store::{self, OUTDATED_DIR};

/// Advisory listing of old keys that vanished from the live extraction and
/// were quarantined this cycle. Produced for manual audit, never an error.
#[derive(Debug, Clone)]
pub struct FileReport {
    pub path: PathBuf,
    pub leftover_keys: Vec<String>,
}

/// Result of reconciling one logical file.
#[derive(Debug)]
pub struct FileOutcome {
    /// The enriched new dictionary, absent when the file vanished from NEW.
    pub updated: Option<SingleDictionary>,
    /// Merged archive for this file; empty means nothing needs preserving.
    pub archive: SingleDictionary,
    pub carried: usize,
    pub leftover_keys: Vec<String>,
}

/// Pure per-file reconciliation: carry translations forward, then route the
/// translated remainder into the versioned archive.
pub fn reconcile_file(
    old: SingleDictionary,
    new: Option<SingleDictionary>,
    existing_archive: SingleDictionary,
    version: &str,
) -> FileOutcome {
    let (unmatched, updated, carried) = match new {
        Some(new) => {
            let co = carry_over(old, new);
            (co.unmatched_old, Some(co.updated_new), co.carried)
        }
        None => (old, None, 0),
    };

    let leftover_keys: Vec<String> = unmatched
        .iter()
        .filter(|(_, e)| e.is_translated())
        .map(|(k, _)| k.clone())
        .collect();

    let archive = quarantine(unmatched, version, existing_archive);

    FileOutcome {
        updated,
        archive,
        carried,
        leftover_keys,
    }
}

/// Aggregated result of a reconciliation cycle.
#[derive(Debug, Default)]
pub struct ReconcileOutcome {
    /// The NEW snapshot enriched with carried translations.
    pub updated: WholeDictionary,
    /// The merged outdated archive, one dictionary per original file path.
    pub archive: WholeDictionary,
    /// Files present in OLD but absent from the new extraction.
    pub missing_files: Vec<PathBuf>,
    /// Files skipped because of structural errors, with the reason.
    pub failed: Vec<(PathBuf, String)>,
    /// Per-file audit listings of quarantined keys.
    pub reports: Vec<FileReport>,
    pub carried: usize,
    pub archived: usize,
}

impl ReconcileOutcome {
    fn absorb(&mut self, path: PathBuf, missing: bool, outcome: FileOutcome) {
        if missing {
            info!(file = %path.display(), "file disappeared from the new extraction");
            self.missing_files.push(path.clone());
        }
        self.carried += outcome.carried;
        self.archived += outcome.leftover_keys.len();
        if !outcome.leftover_keys.is_empty() {
            self.reports.push(FileReport {
                path: path.clone(),
                leftover_keys: outcome.leftover_keys,
            });
        }
        if let Some(updated) = outcome.updated {
            self.updated.insert(path.clone(), updated);
        }
        if !outcome.archive.is_empty() {
            self.archive.insert(path, outcome.archive);
        }
    }

    fn finish(&mut self) {
        self.missing_files.sort();
        self.failed.sort();
        self.reports.sort_by(|a, b| a.path.cmp(&b.path));
    }
}

/// Reconcile two in-memory snapshots against an existing archive.
///
/// Every file present in OLD is processed on its own task; files present
/// only in NEW pass through untouched, and archive records for files with no
/// fresh orphans are kept as they are.
pub async fn reconcile(
    old: WholeDictionary,
    mut new: WholeDictionary,
    mut existing_archive: WholeDictionary,
    version: &str,
) -> ReconcileOutcome {
    let mut tasks = JoinSet::new();
    let mut task_paths: HashMap<tokio::task::Id, PathBuf> = HashMap::new();

    for (path, old_single) in old {
        let new_single = new.remove(&path);
        let archive_single = existing_archive.remove(&path).unwrap_or_default();
        let version = version.to_string();
        let task_path = path.clone();
        let handle = tasks.spawn(async move {
            let missing = new_single.is_none();
            let outcome = reconcile_file(old_single, new_single, archive_single, &version);
            (path, missing, outcome)
        });
        task_paths.insert(handle.id(), task_path);
    }

    let mut out = ReconcileOutcome {
        updated: new,
        archive: existing_archive,
        ..ReconcileOutcome::default()
    };

    while let Some(joined) = tasks.join_next_with_id().await {
        match joined {
            Ok((_, (path, missing, outcome))) => out.absorb(path, missing, outcome),
            Err(err) => {
                let path = task_paths.get(&err.id()).cloned().unwrap_or_default();
                warn!(file = %path.display(), error = %err, "reconciliation task failed");
                out.failed.push((path, err.to_string()));
            }
        }
    }

    out.finish();
    out
}

/// Options for the on-disk reconciliation cycle.
#[derive(Debug, Clone, Default)]
pub struct UpdateOptions {
    /// Compute and report without touching the NEW tree or the archive.
    pub dry_run: bool,
    /// Where to write the audit listings of quarantined keys.
    pub report_dir: Option<PathBuf>,
}

async fn process_file(
    rel: PathBuf,
    old_path: PathBuf,
    new_path: PathBuf,
    archive_path: PathBuf,
    out_archive_path: PathBuf,
    version: String,
    dry_run: bool,
) -> std::result::Result<(PathBuf, bool, FileOutcome), DictError> {
    let old = SingleDictionary::from_json_slice(&tokio::fs::read(&old_path).await?)?;

    let new = if new_path.is_file() {
        Some(SingleDictionary::from_json_slice(
            &tokio::fs::read(&new_path).await?,
        )?)
    } else {
        None
    };
    let missing = new.is_none();

    let existing_archive = if archive_path.is_file() {
        SingleDictionary::from_json_slice(&tokio::fs::read(&archive_path).await?)?
    } else {
        SingleDictionary::default()
    };

    let outcome = reconcile_file(old, new, existing_archive, &version);

    if !dry_run {
        if let Some(updated) = &outcome.updated {
            store::write_atomic_async(&new_path, updated.to_json_vec()?).await?;
        }
        if !outcome.archive.is_empty() {
            store::write_atomic_async(&out_archive_path, outcome.archive.to_json_vec()?).await?;
        }
    }

    Ok((rel, missing, outcome))
}

/// Run a full reconciliation cycle over two directory trees, rewriting the
/// NEW tree in place and merging the archive under `<new_root>/outdated/`.
///
/// Any `outdated/` sub-namespace of the OLD root is relocated wholesale into
/// the new archive location before per-file processing begins. Each file
/// pair is handled on its own task; structural errors are logged and skip
/// only that file.
pub async fn update_dictionaries(
    old_root: &Path,
    new_root: &Path,
    version: &str,
    opts: &UpdateOptions,
) -> Result<ReconcileOutcome> {
    if !opts.dry_run {
        store::relocate_outdated(old_root, new_root)?;
    }
    // In a dry run the relocation is skipped, so read the archive where it
    // still lives.
    let archive_root = if opts.dry_run {
        old_root.join(OUTDATED_DIR)
    } else {
        new_root.join(OUTDATED_DIR)
    };

    let mut tasks = JoinSet::new();
    let mut task_paths: HashMap<tokio::task::Id, PathBuf> = HashMap::new();

    for rel in store::list_dict_files(old_root) {
        let task_rel = rel.clone();
        let handle = tasks.spawn(process_file(
            rel.clone(),
            old_root.join(&rel),
            new_root.join(&rel),
            archive_root.join(&rel),
            new_root.join(OUTDATED_DIR).join(&rel),
            version.to_string(),
            opts.dry_run,
        ));
        task_paths.insert(handle.id(), task_rel);
    }

    let mut out = ReconcileOutcome::default();
    while let Some(joined) = tasks.join_next_with_id().await {
        match joined {
            Ok((_, Ok((path, missing, outcome)))) => out.absorb(path, missing, outcome),
            Ok((id, Err(err))) => {
                let path = task_paths.get(&id).cloned().unwrap_or_default();
                warn!(file = %path.display(), error = %err, "skipping file");
                out.failed.push((path, err.to_string()));
            }
            Err(err) => {
                let path = task_paths.get(&err.id()).cloned().unwrap_or_default();
                warn!(file = %path.display(), error = %err, "reconciliation task failed");
                out.failed.push((path, err.to_string()));
            }
        }
    }
    out.finish();

    if let Some(dir) = &opts.report_dir {
        write_missing_reports(dir, &out.reports)?;
    }

    info!(
        carried = out.carried,
        archived = out.archived,
        missing = out.missing_files.len(),
        failed = out.failed.len(),
        "reconciliation cycle finished"
    );
    Ok(out)
}
