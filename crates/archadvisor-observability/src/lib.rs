//! Logging bootstrap: a compact console layer plus an optional daily-rotated
//! JSONL file layer, filtered by `RUST_LOG` (default `info`).

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize process-wide logging. Returns the appender guard, which must
/// stay alive for file output to flush; pass `None` for console-only.
pub fn init_logging(logs_dir: Option<&Path>) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let console_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_target(true);

    let registry = tracing_subscriber::registry().with(filter).with(console_layer);

    if let Some(logs_dir) = logs_dir {
        std::fs::create_dir_all(logs_dir)?;
        let file_appender = tracing_appender::rolling::Builder::new()
            .rotation(tracing_appender::rolling::Rotation::DAILY)
            .filename_prefix("archadvisor")
            .filename_suffix("jsonl")
            .build(logs_dir)?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        let file_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_current_span(false)
            .with_span_list(false);
        registry.with(file_layer).try_init().ok();
        Ok(Some(guard))
    } else {
        registry.try_init().ok();
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn console_only_init_is_fine_without_a_directory() {
        assert!(init_logging(None).unwrap().is_none());
    }

    #[test]
    fn file_layer_creates_the_logs_directory() {
        let dir = tempfile::tempdir().unwrap();
        let logs = dir.path().join("logs");
        let guard = init_logging(Some(&logs)).unwrap();
        assert!(logs.exists());
        drop(guard);
    }
}
