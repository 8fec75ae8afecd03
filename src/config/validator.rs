use crate::config::Config;
use crate::error::{LookalikeError, Result, ValidationError};

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration
    pub fn validate(config: &Config) -> Result<()> {
        let mut errors = Vec::new();

        Self::validate_storage(config, &mut errors);
        Self::validate_embedding(config, &mut errors);
        Self::validate_engine(config, &mut errors);
        Self::validate_search(config, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(LookalikeError::ConfigValidation { errors })
        }
    }

    fn validate_storage(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.storage.data_dir.as_os_str().is_empty() {
            errors.push(ValidationError::new(
                "storage.data_dir",
                "Data directory path cannot be empty",
            ));
        }
    }

    fn validate_embedding(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.embedding.text_model.is_empty() {
            errors.push(ValidationError::new(
                "embedding.text_model",
                "Text model name cannot be empty",
            ));
        }
        if config.embedding.image_model.is_empty() {
            errors.push(ValidationError::new(
                "embedding.image_model",
                "Image model name cannot be empty",
            ));
        }
    }

    fn validate_engine(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.engine.lock_timeout_ms == 0 {
            errors.push(ValidationError::new(
                "engine.lock_timeout_ms",
                "Lock timeout must be greater than 0",
            ));
        }
    }

    fn validate_search(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.search.default_limit == 0 {
            errors.push(ValidationError::new(
                "search.default_limit",
                "Default limit must be greater than 0",
            ));
        }

        let w = config.search.default_text_weight;
        if !(0.0..=1.0).contains(&w) || !w.is_finite() {
            errors.push(ValidationError::new(
                "search.default_text_weight",
                format!("Text weight must be within [0, 1], got {}", w),
            ));
        }
    }
}
