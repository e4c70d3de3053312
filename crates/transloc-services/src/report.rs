//! Plain-text audit listings for operators. Advisory only: leftover keys
//! mean a translator should review what disappeared, not that the run
//! failed.

use std::io::Write;
use std::path::Path;

use transloc_core::Result;

use crate::reconcile::FileReport;

/// Write `MissingEntries.txt` under `dir`: one block per file listing the
/// keys that were quarantined this cycle.
pub fn write_missing_reports(dir: &Path, reports: &[FileReport]) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    let mut f = std::fs::File::create(dir.join("MissingEntries.txt"))?;
    for report in reports {
        writeln!(f, "{}", report.path.display())?;
        for key in &report.leftover_keys {
            writeln!(f, "\t{}", key)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::tempdir;

    #[test]
    fn listing_groups_keys_under_their_file() {
        let dir = tempdir().unwrap();
        let reports = vec![FileReport {
            path: PathBuf::from("res/a.json"),
            leftover_keys: vec!["gone_text_1".into(), "gone_text_2".into()],
        }];
        write_missing_reports(dir.path(), &reports).unwrap();
        let body = std::fs::read_to_string(dir.path().join("MissingEntries.txt")).unwrap();
        assert!(body.contains("res/a.json"));
        assert!(body.contains("\tgone_text_1"));
        assert!(body.contains("\tgone_text_2"));
    }
}
