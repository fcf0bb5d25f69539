//! Logging helpers
//!
//! The library only emits records through the `log` facade. Binaries and
//! tests that want to see them call [`init_logger`].

/// Initialize the logging system
///
/// `RUST_LOG` takes precedence; `level` is used when it is unset.
/// Calling this more than once is harmless.
///
/// # Parameters
///
/// * `level` - Fallback log level
pub fn init_logger(level: &str) {
    let env = env_logger::Env::default()
        .filter_or("RUST_LOG", level);

    let _ = env_logger::Builder::from_env(env)
        .is_test(cfg!(test))
        .try_init();
}
