use crate::config::LogFormat;
use crate::error::{Result, RustLtfsError};
use std::io;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// `RUST_LOG` takes precedence over the verbosity flag
fn filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    })
}

pub fn init(verbose: bool, format: LogFormat) -> Result<()> {
    let registry = tracing_subscriber::registry().with(filter(verbose));

    let installed = match format {
        LogFormat::Text => registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false)
                    .with_writer(io::stderr),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(false)
                    .with_writer(io::stderr),
            )
            .try_init(),
    };

    installed.map_err(|e| RustLtfsError::config(format!("failed to install logger: {}", e)))
}
