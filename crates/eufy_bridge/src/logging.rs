use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::LoggingConfig;

/// Build the target filter for a logging configuration.
///
/// The global level applies to every target without an explicit override.
pub fn filter(config: &LoggingConfig) -> Targets {
    config.overrides.iter().fold(
        Targets::new().with_default(LevelFilter::from(config.level)),
        |targets, (target, level)| targets.with_target(target.clone(), LevelFilter::from(*level)),
    )
}

/// Install the global tracing subscriber.
///
/// Does nothing if a subscriber has already been installed.
pub fn init(config: &LoggingConfig) {
    let result = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(filter(config))
        .try_init();

    if let Err(e) = result {
        tracing::debug!("Logging already initialised: {}", e);
    }
}
