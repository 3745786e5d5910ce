use std::fmt;

use clap::ValueEnum;
use tracing::info;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Debug,
    Info,
    Error,
}

impl LogLevel {
    fn filter(self) -> LevelFilter {
        match self {
            Self::Debug => LevelFilter::DEBUG,
            Self::Info => LevelFilter::INFO,
            Self::Error => LevelFilter::ERROR,
        }
    }

    /// Debug output is for a developer terminal, everything else is shipped as JSON.
    fn is_json(self) -> bool {
        !matches!(self, Self::Debug)
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Debug => write!(f, "debug"),
            Self::Info => write!(f, "info"),
            Self::Error => write!(f, "error"),
        }
    }
}

fn env_filter(level: LogLevel) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(level.filter().into())
        .from_env_lossy()
}

pub fn init(level: LogLevel) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter(level))
        .with_thread_ids(true);

    if level.is_json() {
        builder.json().with_current_span(true).init();
    } else {
        builder.with_target(false).init();
    }

    info!(%level, "logger initialized");
}
