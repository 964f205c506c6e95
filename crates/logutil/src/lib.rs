//! Utilities for logging.

use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::util::SubscriberInitExt;

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    Json,
    #[default]
    HumanReadable,
}

/// Build the env filter used by every subscriber.
///
/// `RUST_LOG` takes precedence. `default_level` is only used for targets not
/// covered by it.
fn env_filter(default_level: tracing::Level) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(default_level).into())
        .from_env_lossy()
}

/// Configure the global logger.
///
/// Calling this more than once is harmless, later calls are ignored.
pub fn configure_global_logger<W>(default_level: tracing::Level, format: LogFormat, make_writer: W)
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter(default_level))
        .with_writer(make_writer);

    let result = match format {
        LogFormat::Json => builder.json().finish().try_init(),
        LogFormat::HumanReadable => builder.with_target(false).finish().try_init(),
    };

    if let Err(e) = result {
        eprintln!("failed to configure global logger: {e}");
    }
}

/// Logger for tests. Output is captured by the test harness.
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(tracing::Level::DEBUG))
        .with_test_writer()
        .try_init();
}
