//! Run configuration loaded from `migration.yaml`.
//!
//! Every field has a default, so an empty file (or no file at all) gives a
//! run that reads `./csv` and writes `./migration_data.sql`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::entity::EntityKind;
use crate::error::{MigrationError, Result};

/// Top-level migration configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MigrationConfig {
    #[serde(default = "default_input_dir")]
    pub input_dir: PathBuf,
    #[serde(default = "default_output_file")]
    pub output_file: PathBuf,
    #[serde(default)]
    pub report_file: Option<PathBuf>,
    #[serde(default)]
    pub admin: AdminUser,
    /// Source file overrides keyed by entity (`property`, `tenant`, ...)
    #[serde(default)]
    pub sources: BTreeMap<String, String>,
}

/// The synthetic owner every migrated record is attached to
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AdminUser {
    #[serde(default = "default_admin_name")]
    pub name: String,
    #[serde(default = "default_admin_email")]
    pub email: String,
    #[serde(default = "default_admin_password_hash")]
    pub password_hash: String,
}

fn default_input_dir() -> PathBuf {
    PathBuf::from("csv")
}

fn default_output_file() -> PathBuf {
    PathBuf::from("migration_data.sql")
}

fn default_admin_name() -> String {
    "Admin".to_string()
}

fn default_admin_email() -> String {
    "admin@tms.com".to_string()
}

fn default_admin_password_hash() -> String {
    "$2b$10$E9.E3.E3.E3.E3.E3.E3.E3.E3.E3.E3.E".to_string()
}

impl Default for AdminUser {
    fn default() -> Self {
        Self {
            name: default_admin_name(),
            email: default_admin_email(),
            password_hash: default_admin_password_hash(),
        }
    }
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            input_dir: default_input_dir(),
            output_file: default_output_file(),
            report_file: None,
            admin: AdminUser::default(),
            sources: BTreeMap::new(),
        }
    }
}

impl MigrationConfig {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| MigrationError::Config {
            path: path.to_path_buf(),
            message: format!("failed to read: {}", e),
        })?;

        Self::from_yaml(&contents).map_err(|message| MigrationError::Config {
            path: path.to_path_buf(),
            message,
        })
    }

    /// Parse configuration from YAML text. An empty document is the default
    /// configuration.
    pub fn from_yaml(contents: &str) -> std::result::Result<Self, String> {
        let config: Self = if contents.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(contents).map_err(|e| format!("failed to parse YAML: {}", e))?
        };
        config.check_sources()?;
        Ok(config)
    }

    /// Load `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::from_file(path)
        } else {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            Ok(Self::default())
        }
    }

    fn check_sources(&self) -> std::result::Result<(), String> {
        for key in self.sources.keys() {
            match EntityKind::from_key(key) {
                Some(EntityKind::User) => {
                    return Err("the admin user has no source file".to_string())
                }
                Some(_) => {}
                None => return Err(format!("unknown source entity '{}'", key)),
            }
        }
        Ok(())
    }

    /// File name the given entity is read from, if it has a source.
    pub fn source_file(&self, entity: EntityKind) -> Option<&str> {
        self.sources
            .get(entity.key())
            .map(String::as_str)
            .or_else(|| entity.default_source())
    }

    /// Full path of the entity's source file inside `input_dir`.
    pub fn source_path(&self, entity: EntityKind) -> Option<PathBuf> {
        self.source_file(entity).map(|file| self.input_dir.join(file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = MigrationConfig::from_yaml("").unwrap();
        assert_eq!(config.input_dir, PathBuf::from("csv"));
        assert_eq!(config.output_file, PathBuf::from("migration_data.sql"));
        assert_eq!(config.admin.email, "admin@tms.com");
        assert!(config.report_file.is_none());
    }

    #[test]
    fn test_partial_config() {
        let yaml = r#"
input_dir: /data/export
admin:
  name: Owner
sources:
  property: Property.csv
"#;
        let config = MigrationConfig::from_yaml(yaml).unwrap();

        assert_eq!(config.input_dir, PathBuf::from("/data/export"));
        assert_eq!(config.admin.name, "Owner");
        assert_eq!(config.admin.email, "admin@tms.com");
        assert_eq!(
            config.source_path(EntityKind::Property),
            Some(PathBuf::from("/data/export/Property.csv"))
        );
        assert_eq!(
            config.source_file(EntityKind::Tenant),
            Some("tenants.csv")
        );
        assert_eq!(config.source_path(EntityKind::User), None);
    }

    #[test]
    fn test_rejects_unknown_source_entity() {
        let err = MigrationConfig::from_yaml("sources:\n  landlord: x.csv\n").unwrap_err();
        assert!(err.contains("landlord"));

        let err = MigrationConfig::from_yaml("sources:\n  user: x.csv\n").unwrap_err();
        assert!(err.contains("admin user"));
    }

    #[test]
    fn test_rejects_unknown_fields() {
        assert!(MigrationConfig::from_yaml("output: x.sql\n").is_err());
    }

    #[test]
    fn test_from_file_and_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("migration.yaml");
        std::fs::write(&path, "output_file: out/data.sql\n").unwrap();

        let config = MigrationConfig::from_file(&path).unwrap();
        assert_eq!(config.output_file, PathBuf::from("out/data.sql"));

        let missing = dir.path().join("missing.yaml");
        assert!(MigrationConfig::from_file(&missing).is_err());
        assert_eq!(
            MigrationConfig::load_or_default(&missing).unwrap().input_dir,
            PathBuf::from("csv")
        );
    }
}
