//! Configuration module
//!
//! This module holds the matcher configuration, its defaults, layered
//! loading (file, then environment) and validation.

pub mod defaults;
mod loader;
mod traits;
mod validator;

pub use self::defaults::ENV_PREFIX;
pub use self::traits::{ConfigLoader, ConfigValidator};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::common::SnifferError;

/// How strictly an `SSLRequest` must be formed
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SslRequestPolicy {
    /// The sentinel code must be the whole payload
    Strict,
    /// The sentinel code alone is enough
    Lenient,
}

// Custom deserialization implementation to make it case-insensitive
impl<'de> Deserialize<'de> for SslRequestPolicy {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        SslRequestPolicy::from_str(&s).map_err(serde::de::Error::custom)
    }
}

impl Default for SslRequestPolicy {
    fn default() -> Self {
        defaults::ssl_request_policy()
    }
}

impl fmt::Display for SslRequestPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Strict => write!(f, "strict"),
            Self::Lenient => write!(f, "lenient"),
        }
    }
}

impl FromStr for SslRequestPolicy {
    type Err = SnifferError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "lenient" => Ok(Self::Lenient),
            _ => Err(SnifferError::Config(format!(
                "Invalid SSLRequest policy: {}. Valid values are: strict, lenient",
                s
            ))),
        }
    }
}

/// Matcher configuration
///
/// Every field has a default, so an empty file or environment yields the
/// strict policy: exact-length `SSLRequest`, protocol 3 or newer, empty
/// parameter lists accepted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MatcherConfig {
    /// Largest accepted startup payload in bytes (at most 16384)
    pub max_payload_size: usize,

    /// Oldest protocol major version that still matches
    pub min_major_version: u16,

    /// `SSLRequest` strictness
    pub ssl_request_policy: SslRequestPolicy,

    /// Reject startups that carry no parameters
    pub require_parameters: bool,

    /// Header buffers that may be borrowed at once; 0 disables pooling
    pub header_pool_size: usize,

    /// Fallback log level (error, warn, info, debug, trace)
    pub log_level: String,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            max_payload_size: defaults::max_payload_size(),
            min_major_version: defaults::min_major_version(),
            ssl_request_policy: defaults::ssl_request_policy(),
            require_parameters: defaults::require_parameters(),
            header_pool_size: defaults::header_pool_size(),
            log_level: defaults::log_level(),
        }
    }
}

impl MatcherConfig {
    /// Parsed `log_level`, falling back to `info` if it was never validated
    pub fn log_filter(&self) -> log::LevelFilter {
        log::LevelFilter::from_str(&self.log_level).unwrap_or(log::LevelFilter::Info)
    }

    /// Initialize logging with `log_level` as the fallback for `RUST_LOG`
    pub fn init_logging(&self) {
        crate::common::init_logger(&self.log_level);
    }
}
