//! Storage configuration types

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Storage backend type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendType {
    /// Memory storage (default, lost on restart)
    #[default]
    Memory,
    /// One JSON document per record under `base_dir`
    File,
}

impl BackendType {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "memory" => Some(Self::Memory),
            "file" => Some(Self::File),
            _ => None,
        }
    }
}

/// Document store configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: BackendType,

    /// Directory for the file backend; defaults to the platform data dir
    #[serde(default)]
    pub base_dir: Option<PathBuf>,
}

impl StorageConfig {
    /// Directory the file backend writes to, if one can be determined
    pub fn resolved_base_dir(&self) -> Option<PathBuf> {
        self.base_dir.clone().or_else(|| {
            directories::ProjectDirs::from("com", "ai-chef", "ai-chef")
                .map(|dirs| dirs.data_dir().join("store"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_parse() {
        assert_eq!(BackendType::parse("FILE"), Some(BackendType::File));
        assert_eq!(BackendType::parse("memory"), Some(BackendType::Memory));
        assert_eq!(BackendType::parse("postgres"), None);
    }

    #[test]
    fn test_explicit_base_dir_wins() {
        let config = StorageConfig {
            backend: BackendType::File,
            base_dir: Some(PathBuf::from("/srv/chef")),
        };
        assert_eq!(config.resolved_base_dir(), Some(PathBuf::from("/srv/chef")));
    }
}
