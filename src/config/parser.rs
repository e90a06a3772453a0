use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigResult;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Parses and validates configuration text
pub fn parse_config(content: &str) -> ConfigResult<Config> {
    let config: Config = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

/// Loads a crawl profile from a TOML file
///
/// # Returns
///
/// * `Ok(Config)` - Parsed and validated configuration
/// * `Err(ConfigError)` - The file could not be read, parsed, or validated
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use ladang_crawler::config::load_config;
///
/// let config = load_config(Path::new("config.toml")).unwrap();
/// println!("Budget: {}s", config.crawler.duration_secs);
/// ```
pub fn load_config(path: &Path) -> ConfigResult<Config> {
    parse_config(&std::fs::read_to_string(path)?)
}

/// Hex SHA-256 of configuration text
pub fn hash_config_text(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}

/// Hashes a configuration file so a run can be matched to the profile that drove it
pub fn compute_config_hash(path: &Path) -> ConfigResult<String> {
    Ok(hash_config_text(&std::fs::read_to_string(path)?))
}

/// Loads a configuration and the hash of the exact text it was parsed from
pub fn load_config_with_hash(path: &Path) -> ConfigResult<(Config, String)> {
    let content = std::fs::read_to_string(path)?;
    let config = parse_config(&content)?;
    Ok((config, hash_config_text(&content)))
}
