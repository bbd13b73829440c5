use std::path::Path;

use tracing::Subscriber;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Daily rolling file receiving `level` and above
fn file_layer<S>(log_dir: &Path, name: &str, level: LevelFilter) -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    tracing_subscriber::fmt::layer()
        .with_writer(tracing_appender::rolling::daily(log_dir, name))
        .with_ansi(false)
        .with_filter(level)
}

/// Install the global subscriber: a coloured console layer plus one daily
/// rolling file per level under `log_dir` (`info.log.YYYY-MM-DD`, ...).
///
/// `RUST_LOG` narrows what is recorded; the default is `info`.
pub fn init(log_dir: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(log_dir)?;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());

    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .with_ansi(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer(log_dir, "info.log", LevelFilter::INFO))
        .with(file_layer(log_dir, "warn.log", LevelFilter::WARN))
        .with(file_layer(log_dir, "error.log", LevelFilter::ERROR))
        .try_init()
        .map_err(std::io::Error::other)
}
