//! Reconciliation services over the core dictionary types.
//! Intentionally thin at the surface: the CLI and other clients go through
//! the functions re-exported here rather than importing submodules.

pub mod fill;
pub mod matcher;
pub mod normalize;
pub mod outdated;
pub mod reconcile;
pub mod report;
pub mod store;

pub use transloc_core::{
    DictError, Entry, EntryKey, EntryRecord, Result, SingleDictionary, Stage, WholeDictionary,
};

pub use fill::{fill_duplicates, fill_tree, FillSummary};
pub use matcher::{carry_over, CarryOver};
pub use normalize::normalize;
pub use outdated::quarantine;
pub use reconcile::{
    reconcile, reconcile_file, update_dictionaries, FileOutcome, FileReport, ReconcileOutcome,
    UpdateOptions,
};
pub use report::write_missing_reports;
pub use store::{
    count_entries, list_dict_files, load_single, load_tree, relocate_outdated, write_single,
    write_tree, EntryStats, OUTDATED_DIR,
};
