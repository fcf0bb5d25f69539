//! Configuration loader implementation
//!
//! Layers defaults, an optional JSON file and `PG_SNIFFER_*` environment
//! variables using the `config` crate.

use std::path::Path;
use log::{debug, warn};
use config::{Config, Environment, File, FileFormat};

use crate::common::{Result, SnifferError};
use super::defaults::ENV_PREFIX;
use super::traits::{ConfigLoader, ConfigValidator};
use super::MatcherConfig;

impl ConfigLoader for MatcherConfig {
    fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(SnifferError::Config(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }
        build(Some(path))
    }

    fn load(path: Option<&Path>) -> Result<Self> {
        build(path)
    }
}

fn build(path: Option<&Path>) -> Result<MatcherConfig> {
    let mut builder = Config::builder();

    // Defaults come from serde's `default` attribute
    if let Some(path) = path {
        builder = builder.add_source(File::from(path).format(FileFormat::Json).required(false));
    }

    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .try_parsing(true),
    );

    let config: MatcherConfig = builder.build()?.try_deserialize()?;
    config.validate()?;

    for warning in config.check() {
        warn!("{}", warning);
    }

    match path {
        Some(path) if path.exists() => debug!("Configuration loaded from {}", path.display()),
        _ => debug!("Configuration loaded from defaults and environment"),
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SslRequestPolicy;
    use serial_test::serial;
    use std::io::Write;

    fn json_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    #[serial]
    fn test_load_defaults() {
        let config = MatcherConfig::load(None).unwrap();
        assert_eq!(config, MatcherConfig::default());
    }

    #[test]
    #[serial]
    fn test_load_missing_file_falls_back() {
        let config = MatcherConfig::load(Some(Path::new("does-not-exist.json"))).unwrap();
        assert_eq!(config, MatcherConfig::default());

        assert!(MatcherConfig::from_file("does-not-exist.json").is_err());
    }

    #[test]
    #[serial]
    fn test_file_values() {
        let file = json_file(
            r#"{
                "max_payload_size": 4096,
                "ssl_request_policy": "Lenient",
                "require_parameters": true
            }"#,
        );

        let config = MatcherConfig::from_file(file.path()).unwrap();
        assert_eq!(config.max_payload_size, 4096);
        assert_eq!(config.ssl_request_policy, SslRequestPolicy::Lenient);
        assert!(config.require_parameters);
        assert_eq!(config.header_pool_size, 1024);
    }

    #[test]
    #[serial]
    fn test_environment_overrides_file() {
        let file = json_file(r#"{ "max_payload_size": 4096, "min_major_version": 3 }"#);

        std::env::set_var("PG_SNIFFER_MAX_PAYLOAD_SIZE", "2048");
        std::env::set_var("PG_SNIFFER_HEADER_POOL_SIZE", "0");
        let result = MatcherConfig::load(Some(file.path()));
        std::env::remove_var("PG_SNIFFER_MAX_PAYLOAD_SIZE");
        std::env::remove_var("PG_SNIFFER_HEADER_POOL_SIZE");

        let config = result.unwrap();
        assert_eq!(config.max_payload_size, 2048);
        assert_eq!(config.header_pool_size, 0);
        assert_eq!(config.min_major_version, 3);
    }

    #[test]
    #[serial]
    fn test_invalid_values_rejected() {
        let file = json_file(r#"{ "max_payload_size": 65536 }"#);
        assert!(matches!(
            MatcherConfig::from_file(file.path()),
            Err(SnifferError::Config(_))
        ));

        let file = json_file(r#"{ "ssl_request_policy": "sometimes" }"#);
        assert!(MatcherConfig::from_file(file.path()).is_err());

        let file = json_file("{ not json");
        assert!(MatcherConfig::from_file(file.path()).is_err());
    }
}
