use std::path::{Path, PathBuf};

use tracing::{info, warn};
use tracing_appender::{non_blocking, non_blocking::WorkerGuard};
use tracing_appender::rolling::{self, RollingFileAppender};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Backups of earlier runs kept next to the live log.
pub const MAX_LOG_BACKUPS: usize = 5;

fn live_log_name(service_name: &str) -> String {
    format!("{service_name}.log")
}

/// Appender for the live log of one server run; rotation happens at startup.
pub fn file_appender(log_dir: &Path, service_name: &str) -> RollingFileAppender {
    rolling::never(log_dir, live_log_name(service_name))
}

/// Initialize logging for the UI server: console, plus a file when `log_dir` is usable.
///
/// The returned guard flushes the file writer and must be held until shutdown.
pub fn init_service_logging(
    log_dir: &Path,
    service_name: &str,
) -> Result<Option<WorkerGuard>, anyhow::Error> {
    // RUST_LOG wins when set
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fn console_layer<S>() -> impl tracing_subscriber::Layer<S>
    where
        S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    {
        fmt::layer()
            .with_writer(std::io::stdout)
            .with_ansi(true)
            .with_target(false)
    }

    let dir_error = std::fs::create_dir_all(log_dir).err();
    if let Some(err) = dir_error {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer())
            .try_init()?;
        warn!(
            "Console logging only; cannot use log directory {}: {err}",
            log_dir.display()
        );
        return Ok(None);
    }

    let rotated = rotate_logs_on_startup(log_dir, service_name);

    let (file_writer, guard) = non_blocking(file_appender(log_dir, service_name));
    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer())
        .try_init()?;

    match rotated {
        Ok(Some(backup)) => info!("Previous log file backed up to: {}", backup.display()),
        Ok(None) => {}
        Err(err) => warn!("Could not rotate previous log file: {err}"),
    }
    info!(
        "Logging initialized - logs will be written to {}",
        log_dir.join(live_log_name(service_name)).display()
    );

    Ok(Some(guard))
}

/// CLI logging goes to stderr so stdout stays machine-readable.
pub fn init_cli_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "warn" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init();
}

/// Move the previous run's log aside as `<service>.<timestamp>.log` and prune old backups.
///
/// Returns the backup path when there was a previous log.
pub fn rotate_logs_on_startup(
    log_dir: &Path,
    service_name: &str,
) -> Result<Option<PathBuf>, anyhow::Error> {
    let live = log_dir.join(live_log_name(service_name));
    let backup = if live.exists() {
        let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
        let backup = log_dir.join(format!("{service_name}.{timestamp}.log"));
        std::fs::rename(&live, &backup)?;
        Some(backup)
    } else {
        None
    };

    prune_backups(log_dir, service_name, MAX_LOG_BACKUPS)?;
    Ok(backup)
}

fn prune_backups(log_dir: &Path, service_name: &str, keep: usize) -> std::io::Result<()> {
    let prefix = format!("{service_name}.");
    let live = live_log_name(service_name);

    let mut backups: Vec<PathBuf> = std::fs::read_dir(log_dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with(&prefix) && name.ends_with(".log") && name != live)
        })
        .collect();

    // Timestamps sort lexically; oldest first.
    backups.sort();
    let excess = backups.len().saturating_sub(keep);
    for old in backups.into_iter().take(excess) {
        std::fs::remove_file(old)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn rotation_moves_aside_what_the_appender_wrote() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut appender = file_appender(dir.path(), "aza_ui");
            writeln!(appender, "previous run").unwrap();
            appender.flush().unwrap();
        }
        assert_eq!(names(dir.path()), vec!["aza_ui.log"]);

        let backup = rotate_logs_on_startup(dir.path(), "aza_ui")
            .unwrap()
            .expect("a backup is made");

        assert!(!dir.path().join("aza_ui.log").exists());
        assert_eq!(names(dir.path()).len(), 1);
        assert_eq!(std::fs::read_to_string(backup).unwrap(), "previous run\n");
    }

    #[test]
    fn rotation_without_previous_log_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(rotate_logs_on_startup(dir.path(), "aza_ui").unwrap(), None);
        assert!(names(dir.path()).is_empty());
    }

    #[test]
    fn only_recent_backups_are_kept() {
        let dir = tempfile::tempdir().unwrap();
        for day in 1..=7 {
            std::fs::write(dir.path().join(format!("aza_ui.2024010{day}_000000.log")), "old").unwrap();
        }
        std::fs::write(dir.path().join("other.20240101_000000.log"), "keep").unwrap();

        rotate_logs_on_startup(dir.path(), "aza_ui").unwrap();

        let names = names(dir.path());
        assert_eq!(names.len(), MAX_LOG_BACKUPS + 1);
        assert!(!names.contains(&"aza_ui.20240101_000000.log".to_string()));
        assert!(!names.contains(&"aza_ui.20240102_000000.log".to_string()));
        assert!(names.contains(&"aza_ui.20240107_000000.log".to_string()));
        assert!(names.contains(&"other.20240101_000000.log".to_string()));
    }
}
