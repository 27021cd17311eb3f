use crate::config::types::{
    CapsuleConfig, ClassifierConfig, Config, CrawlerConfig, OutputConfig, UserAgentConfig,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_capsule_config(&config.capsule)?;
    validate_output_config(&config.output)?;
    if let Some(classifier) = &config.classifier {
        validate_classifier_config(classifier)?;
    }
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.concurrency < 1 || config.concurrency > 100 {
        return Err(ConfigError::Validation(format!(
            "concurrency must be between 1 and 100, got {}",
            config.concurrency
        )));
    }

    if config.retries > 10 {
        return Err(ConfigError::Validation(format!(
            "retries must be <= 10, got {}",
            config.retries
        )));
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "timeout_secs must be >= 1".to_string(),
        ));
    }

    if config.robots_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "robots_timeout_secs must be >= 1".to_string(),
        ));
    }

    if config.backoff_ms < 1 {
        return Err(ConfigError::Validation(
            "backoff_ms must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Validate crawler name: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    if config.crawler_version.trim().is_empty() {
        return Err(ConfigError::Validation(
            "crawler_version cannot be empty".to_string(),
        ));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

fn validate_capsule_config(config: &CapsuleConfig) -> Result<(), ConfigError> {
    if config.max_text_length < 1 {
        return Err(ConfigError::Validation(
            "max_text_length must be >= 1".to_string(),
        ));
    }

    if config.job_link_limit < 1 {
        return Err(ConfigError::Validation(
            "job_link_limit must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    if let Some(dir) = &config.artifact_dir {
        if dir.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "artifact_dir cannot be empty when set".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_classifier_config(config: &ClassifierConfig) -> Result<(), ConfigError> {
    if config.program.trim().is_empty() {
        return Err(ConfigError::Validation(
            "classifier program cannot be empty".to_string(),
        ));
    }

    if config.model.trim().is_empty() {
        return Err(ConfigError::Validation(
            "classifier model cannot be empty".to_string(),
        ));
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "classifier timeout_secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    let Some((local, domain)) = email.split_once('@') else {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    };

    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
