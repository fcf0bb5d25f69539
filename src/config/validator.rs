//! Configuration validator implementation

use std::str::FromStr;

use crate::common::{Result, SnifferError};
use crate::protocol::{MAX_STARTUP_PAYLOAD, MIN_STARTUP_PAYLOAD};
use super::traits::ConfigValidator;
use super::{MatcherConfig, SslRequestPolicy};

impl ConfigValidator for MatcherConfig {
    fn validate(&self) -> Result<()> {
        if !(MIN_STARTUP_PAYLOAD..=MAX_STARTUP_PAYLOAD).contains(&self.max_payload_size) {
            return Err(SnifferError::Config(format!(
                "max_payload_size must be between {} and {}, got {}",
                MIN_STARTUP_PAYLOAD, MAX_STARTUP_PAYLOAD, self.max_payload_size
            )));
        }

        if log::LevelFilter::from_str(&self.log_level).is_err() {
            return Err(SnifferError::Config(format!(
                "Invalid log level: {}. Valid values are: off, error, warn, info, debug, trace",
                self.log_level
            )));
        }

        Ok(())
    }

    fn check(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.ssl_request_policy == SslRequestPolicy::Lenient {
            warnings.push(
                "Lenient SSLRequest policy accepts the request code with any payload length"
                    .to_string(),
            );
        }

        if self.min_major_version < 3 {
            warnings.push(format!(
                "min_major_version {} admits pre-3.0 protocol versions",
                self.min_major_version
            ));
        }

        if self.header_pool_size == 0 {
            warnings.push("Header buffer pooling is disabled".to_string());
        }

        warnings
    }
}
