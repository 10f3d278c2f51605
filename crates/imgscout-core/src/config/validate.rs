//! Configuration validation with range checks.

use std::collections::HashMap;

use crate::error::ConfigError;
use crate::types::ProviderKind;

use super::Config;

/// Upper bound on images per provider per row.
pub const MAX_IMAGES_LIMIT: usize = 10;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.http.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "http.timeout_secs must be > 0".into(),
            ));
        }
        if self.search.providers.is_empty() {
            return Err(ConfigError::ValidationError(
                "search.providers must list at least one provider".into(),
            ));
        }
        if self.search.max_images == 0 || self.search.max_images > MAX_IMAGES_LIMIT {
            return Err(ConfigError::ValidationError(format!(
                "search.max_images must be between 1 and {MAX_IMAGES_LIMIT}"
            )));
        }
        if self.fetch.max_download_mb == 0 {
            return Err(ConfigError::ValidationError(
                "fetch.max_download_mb must be > 0".into(),
            ));
        }
        if self.upload.jpeg_quality == 0 || self.upload.jpeg_quality > 100 {
            return Err(ConfigError::ValidationError(
                "upload.jpeg_quality must be between 1 and 100".into(),
            ));
        }
        if self.upload.pause_min_ms > self.upload.pause_max_ms {
            return Err(ConfigError::ValidationError(
                "upload.pause_min_ms must be <= upload.pause_max_ms".into(),
            ));
        }
        if self.upload.deadline_secs == 0 {
            return Err(ConfigError::ValidationError(
                "upload.deadline_secs must be > 0".into(),
            ));
        }
        if self.upload.imgbb.max_mb == 0 || self.upload.catbox.max_mb == 0 {
            return Err(ConfigError::ValidationError(
                "upload.<host>.max_mb must be > 0".into(),
            ));
        }
        if self.upload.imgbb.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "upload.imgbb.timeout_secs must be > 0".into(),
            ));
        }
        if self.upload.catbox.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "upload.catbox.timeout_secs must be > 0".into(),
            ));
        }
        if self.table.product_column.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "table.product_column must not be empty".into(),
            ));
        }
        self.validate_columns()
    }

    /// Curation exports every provider's columns, so all prefixes are checked,
    /// not only the enabled ones.
    fn validate_columns(&self) -> Result<(), ConfigError> {
        let mut seen: HashMap<&str, ProviderKind> = HashMap::new();
        for kind in ProviderKind::ALL {
            let prefix = self.table.columns.prefix_for(kind);
            if prefix.trim().is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "table.columns.{kind} must not be empty"
                )));
            }
            if prefix == self.table.image_column {
                return Err(ConfigError::ValidationError(format!(
                    "table.columns.{kind} collides with the protected image column"
                )));
            }
            if let Some(other) = seen.insert(prefix, kind) {
                return Err(ConfigError::ValidationError(format!(
                    "table.columns.{kind} and table.columns.{other} share the prefix {prefix:?}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_passes_validation() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = Config::default();
        config.http.timeout_secs = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("timeout_secs"));
    }

    #[test]
    fn test_validate_rejects_too_many_images() {
        let mut config = Config::default();
        config.search.max_images = 11;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_images"));
    }

    #[test]
    fn test_validate_rejects_inverted_pause() {
        let mut config = Config::default();
        config.upload.pause_min_ms = 2000;
        config.upload.pause_max_ms = 100;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("pause_min_ms"));
    }

    #[test]
    fn test_validate_rejects_invalid_quality() {
        let mut config = Config::default();
        config.upload.jpeg_quality = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("jpeg_quality"));
    }

    #[test]
    fn test_validate_rejects_column_on_protected_image_column() {
        let mut config = Config::default();
        config.table.columns.bing = config.table.image_column.clone();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("protected"));
    }

    #[test]
    fn test_validate_rejects_zero_host_timeouts() {
        let mut config = Config::default();
        config.upload.imgbb.timeout_secs = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("upload.imgbb.timeout_secs"));

        let mut config = Config::default();
        config.upload.catbox.timeout_secs = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("upload.catbox.timeout_secs"));
    }

    #[test]
    fn test_validate_rejects_shared_column_prefix() {
        let mut config = Config::default();
        config.search.providers = vec![ProviderKind::Bing];
        config.table.columns.google = config.table.columns.openverse.clone();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("share the prefix"));
    }

    #[test]
    fn test_validate_rejects_empty_provider_list() {
        let mut config = Config::default();
        config.search.providers.clear();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("providers"));
    }
}
