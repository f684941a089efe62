use crate::config::types::{
    ConcurrencyConfig, Config, CrawlConfig, CrawlMode, OutputConfig, UserAgentConfig,
};
use crate::url::Blacklist;
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawl_config(&config.crawl)?;
    validate_concurrency_config(&config.concurrency)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output)?;
    validate_headers(config)?;
    Ok(())
}

/// Validates the seed, limits and exclusion patterns
fn validate_crawl_config(config: &CrawlConfig) -> Result<(), ConfigError> {
    let seed = Url::parse(&config.seed)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid seed URL '{}': {}", config.seed, e)))?;

    if seed.scheme() != "http" && seed.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "Seed URL '{}' must use HTTP or HTTPS",
            config.seed
        )));
    }

    if seed.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "Seed URL '{}' has no host",
            config.seed
        )));
    }

    if config.max_requests_per_crawl < 1 {
        return Err(ConfigError::Validation(format!(
            "max_requests_per_crawl must be >= 1, got {}",
            config.max_requests_per_crawl
        )));
    }

    if config.scan_duration_secs == Some(0) {
        return Err(ConfigError::Validation(
            "scan_duration_secs must be > 0 when set".to_string(),
        ));
    }

    if let Some(sitemap) = &config.sitemap {
        if sitemap.trim().is_empty() {
            return Err(ConfigError::Validation(
                "sitemap cannot be empty when set".to_string(),
            ));
        }
    } else if config.mode == CrawlMode::Sitemap {
        tracing::debug!("No sitemap configured, it will be discovered from the seed");
    }

    Blacklist::new(&config.blacklist)?;

    Ok(())
}

/// Validates worker pool sizing and timeouts
fn validate_concurrency_config(config: &ConcurrencyConfig) -> Result<(), ConfigError> {
    if config.max_concurrency < 1 || config.max_concurrency > 100 {
        return Err(ConfigError::Validation(format!(
            "max_concurrency must be between 1 and 100, got {}",
            config.max_concurrency
        )));
    }

    if config.min_concurrency < 1 || config.min_concurrency > config.max_concurrency {
        return Err(ConfigError::Validation(format!(
            "min_concurrency must be between 1 and max_concurrency ({}), got {}",
            config.max_concurrency, config.min_concurrency
        )));
    }

    if config.navigation_timeout_ms == 0 {
        return Err(ConfigError::Validation(
            "navigation_timeout_ms must be > 0".to_string(),
        ));
    }

    if config.dom_quiet_period_ms > config.dom_stability_ceiling_ms {
        return Err(ConfigError::Validation(format!(
            "dom_quiet_period_ms ({}) cannot exceed dom_stability_ceiling_ms ({})",
            config.dom_quiet_period_ms, config.dom_stability_ceiling_ms
        )));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
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

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    if config.download_dir.is_empty() {
        return Err(ConfigError::Validation(
            "download_dir cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Header names must be usable as HTTP header names
fn validate_headers(config: &Config) -> Result<(), ConfigError> {
    for (name, value) in &config.headers {
        reqwest::header::HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| ConfigError::Validation(format!("Invalid header name '{}'", name)))?;
        reqwest::header::HeaderValue::from_str(value).map_err(|_| {
            ConfigError::Validation(format!("Invalid value for header '{}'", name))
        })?;
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

    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 || parts[0].is_empty() || !parts[1].contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn crawl(seed: &str) -> CrawlConfig {
        CrawlConfig {
            seed: seed.to_string(),
            mode: CrawlMode::Website,
            strategy: Default::default(),
            sitemap: None,
            max_requests_per_crawl: 10,
            scan_duration_secs: None,
            include_pdfs: false,
            safe_mode: false,
            follow_robots: true,
            blacklist: vec![],
        }
    }

    #[test]
    fn test_validate_seed() {
        assert!(validate_crawl_config(&crawl("https://example.com/")).is_ok());
        assert!(validate_crawl_config(&crawl("http://127.0.0.1:8080/")).is_ok());
        assert!(validate_crawl_config(&crawl("ftp://example.com/")).is_err());
        assert!(validate_crawl_config(&crawl("example.com")).is_err());
    }

    #[test]
    fn test_validate_limits() {
        let mut config = crawl("https://example.com/");
        config.max_requests_per_crawl = 0;
        assert!(validate_crawl_config(&config).is_err());

        let mut config = crawl("https://example.com/");
        config.scan_duration_secs = Some(0);
        assert!(validate_crawl_config(&config).is_err());
    }

    #[test]
    fn test_validate_blacklist_patterns() {
        let mut config = crawl("https://example.com/");
        config.blacklist = vec!["https://example.com/[oops".to_string()];
        assert!(matches!(
            validate_crawl_config(&config),
            Err(ConfigError::InvalidPattern(_))
        ));
    }

    #[test]
    fn test_validate_concurrency_bounds() {
        let mut config = ConcurrencyConfig::default();
        assert!(validate_concurrency_config(&config).is_ok());

        config.min_concurrency = 6;
        config.max_concurrency = 5;
        assert!(validate_concurrency_config(&config).is_err());

        config.min_concurrency = 1;
        config.max_concurrency = 101;
        assert!(validate_concurrency_config(&config).is_err());

        config.max_concurrency = 5;
        config.dom_quiet_period_ms = 10_000;
        assert!(validate_concurrency_config(&config).is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("user@example.com").is_ok());
        assert!(validate_email("admin@sub.example.com").is_ok());

        assert!(validate_email("").is_err());
        assert!(validate_email("invalid").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("user@").is_err());
        assert!(validate_email("user@domain").is_err());
    }
}
