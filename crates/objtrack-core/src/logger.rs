//! Stderr logger for the tracking crates.
//!
//! Lines look like `[  1.234s  WARN objtrack_marker] message`. The level comes
//! from [`init_with_level`] or, through [`init_from_env`], from `OBJTRACK_LOG`
//! in `env_logger` directive syntax: `warn,objtrack_marker=debug`.

use std::io::Write;
use std::time::Instant;

use env_logger::Builder;
use log::LevelFilter;

#[cfg(feature = "tracing")]
use tracing_subscriber::fmt::format::FmtSpan;
#[cfg(feature = "tracing")]
use tracing_subscriber::util::SubscriberInitExt;
#[cfg(feature = "tracing")]
use tracing_subscriber::{fmt, EnvFilter};

pub const LOG_ENV: &str = "OBJTRACK_LOG";

/// `default` for every target, then `directives` on top of it.
fn builder(default: LevelFilter, directives: Option<&str>) -> Builder {
    let started = Instant::now();
    let mut builder = Builder::new();
    builder.filter_level(default).format(move |buf, record| {
        let target = record.target();
        let krate = target.split("::").next().unwrap_or(target);
        writeln!(
            buf,
            "[{:7.3}s {:>5} {krate}] {}",
            started.elapsed().as_secs_f64(),
            record.level(),
            record.args()
        )
    });
    if let Some(directives) = directives {
        builder.parse_filters(directives);
    }
    builder
}

/// Install the logger with one level for every crate.
///
/// Fails when another logger is already installed.
pub fn init_with_level(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    builder(level, None).try_init()
}

/// Install the logger with `default`, refined by `OBJTRACK_LOG` when it is set.
pub fn init_from_env(default: LevelFilter) -> Result<(), log::SetLoggerError> {
    let directives = std::env::var(LOG_ENV).ok();
    builder(default, directives.as_deref()).try_init()
}

/// Install a `tracing` subscriber; `OBJTRACK_LOG` uses the same directive syntax.
#[cfg(feature = "tracing")]
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE);
    let _ = if json {
        builder.json().flatten_event(true).finish().try_init()
    } else {
        builder.with_timer(fmt::time::Uptime::default()).finish().try_init()
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::{Level, Log, Metadata};

    fn enabled(logger: &env_logger::Logger, level: Level, target: &str) -> bool {
        logger.enabled(&Metadata::builder().level(level).target(target).build())
    }

    #[test]
    fn bare_level_applies_everywhere() {
        let logger = builder(LevelFilter::Info, None).build();
        assert!(enabled(&logger, Level::Info, "objtrack_template::tracker"));
        assert!(!enabled(&logger, Level::Debug, "objtrack::engine"));
    }

    #[test]
    fn directives_replace_the_default_level() {
        let logger = builder(LevelFilter::Info, Some("warn,objtrack_marker=debug")).build();
        assert!(enabled(&logger, Level::Debug, "objtrack_marker::cascade"));
        assert!(!enabled(&logger, Level::Info, "objtrack::engine"));
        assert!(enabled(&logger, Level::Warn, "objtrack::engine"));
    }

    #[test]
    fn longest_target_prefix_wins() {
        let logger = builder(LevelFilter::Info, Some("objtrack=warn,objtrack_marker=trace")).build();
        assert!(enabled(&logger, Level::Trace, "objtrack_marker::decode"));
        assert!(!enabled(&logger, Level::Info, "objtrack::run"));
        assert!(enabled(&logger, Level::Info, "image::codecs"));
        assert_eq!(logger.filter(), LevelFilter::Trace);
    }
}
