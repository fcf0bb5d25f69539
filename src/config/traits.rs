//! Configuration traits
//!
//! This module defines traits for configuration operations.

use std::path::Path;
use crate::common::Result;

/// Trait for loading configuration
pub trait ConfigLoader {
    /// Load configuration from a file
    ///
    /// The file must exist. Environment variables still override it, and
    /// the result is validated before it is returned.
    fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> where Self: Sized;

    /// Load configuration with proper priority:
    /// 1. Default values (lowest priority)
    /// 2. Configuration file, if given and present
    /// 3. Environment variables (highest priority)
    fn load(path: Option<&Path>) -> Result<Self> where Self: Sized;
}

/// Trait for validating configuration
pub trait ConfigValidator {
    /// Validate configuration
    ///
    /// Returns an error if the configuration is unusable.
    fn validate(&self) -> Result<()>;

    /// Check configuration for potential issues
    ///
    /// Unlike `validate()`, this returns warnings instead of failing.
    fn check(&self) -> Vec<String>;
}
