use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use trnpy_config::Config;
use trnpy_logger as logger;

/// Environment variable holding a `tracing` filter, e.g. `trnpy=debug`
pub const LOG_ENV_VAR: &str = "TRNPY_LOG";

/// Set up the plugin log file and the `tracing` subscriber
///
/// The subscriber is optional: when the host process already installed one,
/// that one keeps receiving events.
pub fn init(config: &Config) -> Result<(), String> {
    logger::init_with_verbosity(
        config.get_verbosity(),
        config.get_log_file().as_deref(),
        config.is_quiet(),
    )?;
    let verbosity = logger::get_verbosity();

    let _ = tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env(LOG_ENV_VAR)
                .unwrap_or_else(|_| default_filter(verbosity).into()),
        )
        .with(
            fmt::layer()
                .compact()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init();

    if let Some(path) = logger::get_log_path() {
        tracing::debug!(log = %path.display(), "plugin log started");
    }
    Ok(())
}

fn default_filter(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "trnpy=warn",
        1 => "trnpy=info,trnpy_python=info",
        2 => "trnpy=debug,trnpy_python=debug",
        _ => "trnpy=trace,trnpy_python=trace",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_by_verbosity() {
        assert_eq!(default_filter(0), "trnpy=warn");
        assert!(default_filter(2).contains("debug"));
        assert!(default_filter(9).contains("trace"));
    }
}
