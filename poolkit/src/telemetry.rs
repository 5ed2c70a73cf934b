//! Tracing subscriber installation.
//!
//! The pools only emit `tracing` events. Applications that do not install a
//! subscriber of their own can use [`init_tracing`].

use poolkit_core::PoolError;
use tracing_subscriber::EnvFilter;

/// Output format of the installed subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable single-line output.
    #[default]
    Compact,
    /// One JSON object per event.
    Json,
}

/// Install a global fmt subscriber.
///
/// The filter comes from `RUST_LOG` when it is set, otherwise from
/// `default_directives` (for example `"poolkit=info,poolkit_pool=debug"`).
/// Fails if the directives do not parse or a global subscriber is already
/// installed.
pub fn init_tracing(default_directives: &str, format: LogFormat) -> Result<(), PoolError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_directives)
            .map_err(|e| PoolError::config(format!("invalid log filter {default_directives:?}: {e}")))?,
    };

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = match format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|e| PoolError::config(format!("failed to install tracing subscriber: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_directive_is_config_error() {
        // only meaningful when RUST_LOG does not override the directives
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        let err = init_tracing("poolkit=loud", LogFormat::Compact).unwrap_err();
        assert!(matches!(err, PoolError::Config { .. }));
    }

    #[test]
    fn test_second_install_fails() {
        // the first call may lose to another test in this binary
        let _ = init_tracing("warn", LogFormat::Json);
        let err = init_tracing("warn", LogFormat::Compact).unwrap_err();
        assert!(err.to_string().contains("tracing subscriber"));
    }
}
