//! Clinical database configuration (`[database]` section)

use medreason_domain::retrieval::sql::DEFAULT_ROW_CAP;
use medreason_domain::{ConfigIssue, ConfigIssueCode};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// # Example
///
/// ```toml
/// [database]
/// path = "~/data/mimic_iv.db"
/// row_cap = 10
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileDatabaseConfig {
    /// SQLite file holding the clinical tables; SQL augmentation is off without it.
    pub path: Option<String>,
    pub row_cap: usize,
}

impl Default for FileDatabaseConfig {
    fn default() -> Self {
        Self {
            path: None,
            row_cap: DEFAULT_ROW_CAP,
        }
    }
}

impl FileDatabaseConfig {
    /// Path with surrounding quotes removed and `~` expanded.
    pub fn resolved_path(&self) -> Option<PathBuf> {
        let raw = self.path.as_deref()?.trim().trim_matches(['"', '\'']);
        if raw.is_empty() {
            return None;
        }
        match raw.strip_prefix("~/") {
            Some(rest) => dirs::home_dir().map(|home| home.join(rest)),
            None => Some(PathBuf::from(raw)),
        }
    }

    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();
        if self.row_cap == 0 {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::ZeroValue {
                    field: "database.row_cap".to_string(),
                },
                "database.row_cap: 0 hides every row from the model",
            ));
        }
        if let Some(path) = self.resolved_path()
            && !path.exists()
        {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::MissingFile {
                    field: "database.path".to_string(),
                    path: path.display().to_string(),
                },
                format!("database.path: {} does not exist", path.display()),
            ));
        }
        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolved_path_strips_quotes() {
        let db = FileDatabaseConfig {
            path: Some("\"/data/mimic.db\"".into()),
            ..Default::default()
        };
        assert_eq!(db.resolved_path(), Some(PathBuf::from("/data/mimic.db")));
        assert_eq!(FileDatabaseConfig::default().resolved_path(), None);
    }

    #[test]
    fn test_validate_flags_zero_cap_and_missing_file() {
        let db = FileDatabaseConfig {
            path: Some("/definitely/not/here.db".into()),
            row_cap: 0,
        };
        let issues = db.validate();
        assert_eq!(issues.len(), 2);
        assert!(!issues[0].is_error());
        assert!(issues[1].is_error());
    }
}
