use clap::ValueEnum;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

/// Crates that log once per buffer operation or syscall.
const IO_LAYER_TARGETS: [&str; 2] = ["sockframe_frame", "sockframe_transport"];

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_filter(self) -> LevelFilter {
        match self {
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }

    /// Frame and transport events stay at `info` until `trace` is asked for,
    /// so `debug` shows connection lifecycle without per-read noise.
    fn io_layer_filter(self) -> LevelFilter {
        match self {
            LogLevel::Debug => LevelFilter::INFO,
            other => other.as_filter(),
        }
    }
}

fn targets(level: LogLevel) -> Targets {
    IO_LAYER_TARGETS
        .iter()
        .fold(Targets::new().with_default(level.as_filter()), |targets, name| {
            targets.with_target(*name, level.io_layer_filter())
        })
}

/// Install the stderr subscriber. Module targets are shown from `debug` up.
pub fn init_logging(format: LogFormat, level: LogLevel) {
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(level.as_filter() >= LevelFilter::DEBUG);

    let result = match format {
        LogFormat::Text => tracing_subscriber::registry()
            .with(layer.with_filter(targets(level)))
            .try_init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(layer.json().with_filter(targets(level)))
            .try_init(),
    };
    let _ = result;
}

#[cfg(test)]
mod tests {
    use tracing::Level;

    use super::*;

    #[test]
    fn debug_keeps_io_layers_at_info() {
        let targets = targets(LogLevel::Debug);
        assert!(targets.would_enable("sockframe_conn::connection", &Level::DEBUG));
        assert!(targets.would_enable("sockframe_frame::writer", &Level::INFO));
        assert!(!targets.would_enable("sockframe_frame::writer", &Level::DEBUG));
        assert!(!targets.would_enable("sockframe_transport::tcp", &Level::DEBUG));
    }

    #[test]
    fn trace_opens_everything() {
        let targets = targets(LogLevel::Trace);
        assert!(targets.would_enable("sockframe_frame::reader", &Level::TRACE));
        assert!(targets.would_enable("sockframe", &Level::TRACE));
    }

    #[test]
    fn warn_applies_to_every_layer() {
        let targets = targets(LogLevel::Warn);
        assert!(!targets.would_enable("sockframe_conn::connection", &Level::INFO));
        assert!(!targets.would_enable("sockframe_frame::writer", &Level::INFO));
        assert!(targets.would_enable("sockframe_frame::writer", &Level::WARN));
    }
}
