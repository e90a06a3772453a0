use crate::config::types::{
    Config, CrawlConfig, CrawlProfile, CrawlerConfig, OutputConfig, UserAgentConfig,
};
use crate::ConfigError;
use scraper::Selector;
use url::Url;

/// Checks every section of a parsed configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output)?;
    validate_crawl_config(&config.crawl)?;
    validate_profile(&config.profile)?;
    Ok(())
}

/// Worker count and every timing knob of the `[crawler]` section
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if !(1..=256).contains(&config.workers) {
        return Err(ConfigError::Validation(format!(
            "workers must be between 1 and 256, got {}",
            config.workers
        )));
    }

    for (field, secs) in [
        ("duration-secs", config.duration_secs),
        ("idle-timeout-secs", config.idle_timeout_secs),
        ("request-timeout-secs", config.request_timeout_secs),
    ] {
        if secs == 0 {
            return Err(ConfigError::Validation(format!("{} must be at least 1", field)));
        }
    }

    Ok(())
}

/// The user agent is sent as `name/version`, so neither part may contain `/` or whitespace
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    for (field, value) in [
        ("crawler-name", &config.crawler_name),
        ("crawler-version", &config.crawler_version),
    ] {
        if value.is_empty() {
            return Err(ConfigError::Validation(format!("{} is required", field)));
        }
        if value.contains('/') || value.chars().any(char::is_whitespace) {
            return Err(ConfigError::Validation(format!(
                "{} '{}' may not contain '/' or whitespace",
                field, value
            )));
        }
    }

    Ok(())
}

fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.trim().is_empty() {
        return Err(ConfigError::Validation("database-path is required".to_string()));
    }
    Ok(())
}

/// Validates seeds and the domain whitelist
pub(crate) fn validate_crawl_config(config: &CrawlConfig) -> Result<(), ConfigError> {
    if config.seeds.is_empty() {
        return Err(ConfigError::Validation(
            "at least one seed URL is required".to_string(),
        ));
    }

    for seed in &config.seeds {
        let url = Url::parse(seed)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid seed URL '{}': {}", seed, e)))?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::Validation(format!(
                "Seed URL '{}' must use http or https",
                seed
            )));
        }
    }

    if config.whitelist.is_empty() {
        return Err(ConfigError::Validation(
            "whitelist must contain at least one domain token".to_string(),
        ));
    }

    for token in &config.whitelist {
        validate_domain_token(token)?;
    }

    Ok(())
}

/// Whitelist entries are domain tokens ("farmanddairy") or bare IP hosts ("127.0.0.1")
fn validate_domain_token(token: &str) -> Result<(), ConfigError> {
    if token.is_empty() {
        return Err(ConfigError::Validation(
            "whitelist entries cannot be empty".to_string(),
        ));
    }

    if token.parse::<std::net::IpAddr>().is_ok() {
        return Ok(());
    }

    if !token.chars().all(|c| c.is_alphanumeric() || c == '-') {
        return Err(ConfigError::Validation(format!(
            "whitelist entry '{}' must be a single domain label (e.g. 'example', not 'example.com')",
            token
        )));
    }

    Ok(())
}

fn validate_profile(profile: &CrawlProfile) -> Result<(), ConfigError> {
    validate_selector("article-container", &profile.article_container)?;
    validate_selector("tag-item", &profile.tag_item)?;

    if let Some(body) = &profile.article_body {
        validate_selector("article-body", body)?;
    }
    if let Some(container) = &profile.tag_container {
        validate_selector("tag-container", container)?;
    }

    Ok(())
}

fn validate_selector(field: &str, selector: &str) -> Result<(), ConfigError> {
    Selector::parse(selector)
        .map(|_| ())
        .map_err(|e| ConfigError::InvalidSelector(format!("{} '{}': {:?}", field, selector, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_domain_token() {
        assert!(validate_domain_token("farmanddairy").is_ok());
        assert!(validate_domain_token("farm-weekly").is_ok());
        assert!(validate_domain_token("127.0.0.1").is_ok());

        assert!(validate_domain_token("").is_err());
        assert!(validate_domain_token("example.com").is_err());
        assert!(validate_domain_token("bad token").is_err());
    }

    #[test]
    fn test_validate_crawl_config() {
        let mut crawl = CrawlConfig {
            seeds: vec!["https://example.com/".to_string()],
            keyword: String::new(),
            whitelist: vec!["example".to_string()],
        };
        assert!(validate_crawl_config(&crawl).is_ok());

        crawl.seeds = vec!["ftp://example.com/".to_string()];
        assert!(validate_crawl_config(&crawl).is_err());

        crawl.seeds = vec![];
        assert!(validate_crawl_config(&crawl).is_err());

        crawl.seeds = vec!["https://example.com/".to_string()];
        crawl.whitelist = vec![];
        assert!(validate_crawl_config(&crawl).is_err());
    }

    #[test]
    fn test_validate_profile_selectors() {
        let mut profile = CrawlProfile::default();
        assert!(validate_profile(&profile).is_ok());

        profile.tag_container = Some("ul.td-tags".to_string());
        assert!(validate_profile(&profile).is_ok());

        profile.article_body = Some("div[[".to_string());
        assert!(matches!(
            validate_profile(&profile),
            Err(ConfigError::InvalidSelector(_))
        ));
    }

    #[test]
    fn test_validate_user_agent() {
        let mut agent = UserAgentConfig {
            crawler_name: "LadangBot".to_string(),
            crawler_version: "1.0".to_string(),
        };
        assert!(validate_user_agent_config(&agent).is_ok());

        agent.crawler_version = "1.0 beta".to_string();
        assert!(validate_user_agent_config(&agent).is_err());

        agent.crawler_version = "1.0".to_string();
        agent.crawler_name = "Ladang/Bot".to_string();
        assert!(validate_user_agent_config(&agent).is_err());

        agent.crawler_name = String::new();
        assert!(validate_user_agent_config(&agent).is_err());
    }
}
