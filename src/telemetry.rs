//! Log output of the binary.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Installs the global subscriber. `RUST_LOG` takes precedence over `level`;
/// with `json`, every event is one JSON object per line.
pub fn init(json: bool, level: Level) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));
    let registry = tracing_subscriber::registry().with(filter);
    let installed = match json {
        true => registry.with(fmt::layer().with_target(false).json()).try_init(),
        false => registry.with(fmt::layer().with_target(false)).try_init(),
    };
    // A subscriber installed earlier (tests, embedding) wins.
    installed.ok();
}

/// The default level for a count of `-v` flags.
pub fn level(verbosity: u8) -> Level {
    match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    }
}
