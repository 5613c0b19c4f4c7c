//! # Tree Configuration
//!
//! Settings for one entity tree, loaded once at startup from TOML.
//!
//! ```toml
//! entity_limit = 100000
//! initial_capacity = 256
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ContainerError, ContainerResult};

/// Configuration shared by a factory and the containers it backs.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TreeConfig {
    /// Maximum number of live entities in the tree. `None` means unbounded.
    pub entity_limit: Option<usize>,
    /// Entity slots reserved up front by every container.
    pub initial_capacity: usize,
}

impl TreeConfig {
    /// An unbounded tree with no reserved capacity.
    #[must_use]
    pub const fn unbounded() -> Self {
        Self {
            entity_limit: None,
            initial_capacity: 0,
        }
    }

    /// Parses a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::InvalidConfig`] if the text is not valid
    /// TOML for this structure, or if the limit is zero.
    pub fn from_toml_str(text: &str) -> ContainerResult<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| ContainerError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::InvalidConfig`] if the file cannot be read
    /// or parsed.
    pub fn load(path: impl AsRef<Path>) -> ContainerResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ContainerError::InvalidConfig(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    fn validate(&self) -> ContainerResult<()> {
        if self.entity_limit == Some(0) {
            return Err(ContainerError::InvalidConfig(
                "entity_limit must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full() {
        let config = TreeConfig::from_toml_str("entity_limit = 10\ninitial_capacity = 4\n").unwrap();
        assert_eq!(config.entity_limit, Some(10));
        assert_eq!(config.initial_capacity, 4);
    }

    #[test]
    fn test_parse_empty_is_unbounded() {
        assert_eq!(TreeConfig::from_toml_str("").unwrap(), TreeConfig::unbounded());
    }

    #[test]
    fn test_rejects_zero_limit_and_unknown_keys() {
        assert!(matches!(
            TreeConfig::from_toml_str("entity_limit = 0"),
            Err(ContainerError::InvalidConfig(_))
        ));
        assert!(matches!(
            TreeConfig::from_toml_str("entity_cap = 3"),
            Err(ContainerError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let id = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let path = std::env::temp_dir().join(format!("canopy_tree_{id}.toml"));
        std::fs::write(&path, "entity_limit = 2\n").unwrap();

        let config = TreeConfig::load(&path).unwrap();
        assert_eq!(config.entity_limit, Some(2));

        std::fs::remove_file(&path).ok();
        assert!(TreeConfig::load(&path).is_err());
    }
}
