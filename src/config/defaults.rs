//! Default configuration values
//!
//! Single source of truth for defaults, shared by `MatcherConfig::default`
//! and the process-wide header pool.

use super::SslRequestPolicy;
use crate::protocol::{ProtocolVersion, MAX_STARTUP_PAYLOAD};

/// Environment variable prefix for all configuration options
pub const ENV_PREFIX: &str = "PG_SNIFFER";

/// Default log level as string
pub const LOG_LEVEL_STR: &str = "info";

/// Default maximum startup payload (16 KiB)
pub fn max_payload_size() -> usize {
    MAX_STARTUP_PAYLOAD
}

/// Default minimum protocol major version
pub fn min_major_version() -> u16 {
    ProtocolVersion::V3_0.major
}

/// Default SSLRequest policy
pub fn ssl_request_policy() -> SslRequestPolicy {
    SslRequestPolicy::Strict
}

/// Parameter-less startups are accepted by default
pub fn require_parameters() -> bool {
    false
}

/// Default number of pooled header buffers
pub fn header_pool_size() -> usize {
    1024
}

/// Default log level
pub fn log_level() -> String {
    LOG_LEVEL_STR.to_string()
}
