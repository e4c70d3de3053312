use serde::Deserialize;

/// Defaults picked up from `transloc.toml`. Every field is optional; CLI
/// flags always win over the file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TranslocConfig {
    pub old_root: Option<String>,
    pub new_root: Option<String>,
    pub report_dir: Option<String>,
    pub game_version: Option<String>,
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("{0}")]
    Other(String),
}

/// Search order: CWD/transloc.toml, then $CONFIG_DIR/transloc/transloc.toml.
/// Missing or unreadable files are simply skipped.
pub fn load_config() -> Result<TranslocConfig, ConfigError> {
    let mut merged = TranslocConfig::default();
    if let Ok(cwd) = std::env::current_dir() {
        let path = cwd.join("transloc.toml");
        if let Ok(s) = std::fs::read_to_string(&path) {
            if let Ok(cfg) = toml::from_str::<TranslocConfig>(&s) {
                merged = merge(merged, cfg);
            }
        }
    }
    if let Some(base) = dirs::config_dir() {
        let path = base.join("transloc").join("transloc.toml");
        if let Ok(s) = std::fs::read_to_string(&path) {
            if let Ok(cfg) = toml::from_str::<TranslocConfig>(&s) {
                merged = merge(merged, cfg);
            }
        }
    }
    Ok(merged)
}

fn merge(mut a: TranslocConfig, b: TranslocConfig) -> TranslocConfig {
    if a.old_root.is_none() {
        a.old_root = b.old_root;
    }
    if a.new_root.is_none() {
        a.new_root = b.new_root;
    }
    if a.report_dir.is_none() {
        a.report_dir = b.report_dir;
    }
    if a.game_version.is_none() {
        a.game_version = b.game_version;
    }
    a
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn earlier_sources_win_the_merge() {
        let cwd = TranslocConfig {
            old_root: Some("./old".into()),
            ..TranslocConfig::default()
        };
        let user = TranslocConfig {
            old_root: Some("/etc/old".into()),
            game_version: Some("0.4.9".into()),
            ..TranslocConfig::default()
        };
        let merged = merge(cwd, user);
        assert_eq!(merged.old_root.as_deref(), Some("./old"));
        assert_eq!(merged.game_version.as_deref(), Some("0.4.9"));
    }

    #[test]
    fn unknown_keys_are_tolerated() {
        let cfg: TranslocConfig =
            toml::from_str("old_root = \"./old\"\nextra = 1\n").unwrap_or_default();
        // serde ignores unknown fields by default; worst case we fall back
        // to defaults rather than erroring.
        let _ = cfg;
    }
}
