//! Periodic deletion of stale staged inputs, outputs and log files.

use std::path::Path;
use std::time::{Duration, SystemTime};

use tokio_util::sync::CancellationToken;

use sc_core::config::{Config, LOG_FILE_PREFIX};

use crate::context::AppContext;

/// Outcome of sweeping one directory.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub removed: usize,
    pub failed: usize,
}

impl std::ops::AddAssign for SweepReport {
    fn add_assign(&mut self, rhs: Self) {
        self.removed += rhs.removed;
        self.failed += rhs.failed;
    }
}

/// Delete regular files in `dir` last modified more than `max_age` ago.
/// Subdirectories are left alone.
pub fn sweep_dir(dir: &Path, max_age: Duration) -> SweepReport {
    sweep_matching(dir, max_age, |_| true)
}

/// Delete log files (names starting with `prefix`) older than `max_age`.
pub fn sweep_logs(dir: &Path, prefix: &str, max_age: Duration) -> SweepReport {
    sweep_matching(dir, max_age, |name| name.starts_with(prefix))
}

fn sweep_matching(dir: &Path, max_age: Duration, keep_name: impl Fn(&str) -> bool) -> SweepReport {
    let mut report = SweepReport::default();

    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::error!("Failed to read {}: {e}", dir.display());
            return report;
        }
    };

    let now = SystemTime::now();
    for entry in entries.flatten() {
        let Ok(meta) = entry.metadata() else {
            continue;
        };
        if !meta.is_file() {
            continue;
        }
        let name = entry.file_name();
        if !keep_name(&name.to_string_lossy()) {
            continue;
        }
        let Ok(modified) = meta.modified() else {
            continue;
        };
        // A modification time in the future counts as fresh.
        let expired = now
            .duration_since(modified)
            .map(|age| age > max_age)
            .unwrap_or(false);
        if !expired {
            continue;
        }

        let path = entry.path();
        match std::fs::remove_file(&path) {
            Ok(()) => {
                report.removed += 1;
                tracing::debug!("Removed expired file {}", path.display());
            }
            Err(e) => {
                report.failed += 1;
                tracing::error!("Failed to remove {}: {e}", path.display());
            }
        }
    }

    if report.removed > 0 {
        tracing::info!("Removed {} expired files from {}", report.removed, dir.display());
    }
    report
}

/// Sweep the upload, output and log directories once.
pub async fn run_sweep(config: &Config) -> SweepReport {
    let storage = config.storage.clone();
    let file_age = config.retention.file_max_age();
    let log_age = config.retention.log_max_age();

    let result = tokio::task::spawn_blocking(move || {
        tracing::debug!("Housekeeping sweep started");
        let mut report = sweep_dir(&storage.upload_dir, file_age);
        report += sweep_dir(&storage.output_dir, file_age);
        report += sweep_logs(&storage.log_dir, LOG_FILE_PREFIX, log_age);
        tracing::debug!(removed = report.removed, failed = report.failed, "Housekeeping sweep finished");
        report
    })
    .await;

    result.unwrap_or_else(|e| {
        tracing::error!("Housekeeping sweep panicked: {e}");
        SweepReport::default()
    })
}

/// Sweep on a fixed interval until `cancel` fires.
///
/// The first sweep happens one interval after startup. An interval of zero
/// disables housekeeping.
pub async fn run_housekeeping(ctx: AppContext, cancel: CancellationToken) {
    let period = ctx.config.retention.sweep_interval();
    if period.is_zero() {
        tracing::info!("Housekeeping disabled");
        return;
    }

    tracing::info!("Housekeeping started, interval {:?}", period);
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                run_sweep(&ctx.config).await;
            }
            _ = cancel.cancelled() => break,
        }
    }

    tracing::info!("Housekeeping stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    fn age(path: &Path, by: Duration) {
        let file = fs::File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::now() - by).unwrap();
    }

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, b"x").unwrap();
        path
    }

    const DAY: Duration = Duration::from_secs(24 * 3600);

    #[test]
    fn old_files_removed_new_files_kept() {
        let dir = tempfile::tempdir().unwrap();
        let old = touch(dir.path(), "old.silk");
        let fresh = touch(dir.path(), "fresh.silk");
        age(&old, DAY + Duration::from_secs(60));
        age(&fresh, DAY - Duration::from_secs(60));

        let report = sweep_dir(dir.path(), DAY);
        assert_eq!(report, SweepReport { removed: 1, failed: 0 });
        assert!(!old.exists());
        assert!(fresh.exists());
    }

    #[test]
    fn subdirectories_are_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("nested");
        fs::create_dir(&nested).unwrap();
        let inner = touch(&nested, "inner.pcm");
        age(&inner, DAY * 3);

        let report = sweep_dir(dir.path(), DAY);
        assert_eq!(report.removed, 0);
        assert!(inner.exists());
    }

    #[test]
    fn logs_only_matching_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let log = touch(dir.path(), &format!("{LOG_FILE_PREFIX}.2026-01-01.log"));
        let other = touch(dir.path(), "notes.txt");
        age(&log, DAY * 8);
        age(&other, DAY * 8);

        let report = sweep_logs(dir.path(), LOG_FILE_PREFIX, DAY * 7);
        assert_eq!(report.removed, 1);
        assert!(!log.exists());
        assert!(other.exists());
    }

    #[test]
    fn missing_dir_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let report = sweep_dir(&dir.path().join("absent"), DAY);
        assert_eq!(report, SweepReport::default());
    }

    #[tokio::test]
    async fn run_sweep_covers_all_directories() {
        let root = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.storage.upload_dir = root.path().join("uploads");
        config.storage.output_dir = root.path().join("outputs");
        config.storage.log_dir = root.path().join("logs");
        config.storage.ensure_dirs().unwrap();

        let staged = touch(&config.storage.upload_dir, "1.wav");
        let output = touch(&config.storage.output_dir, "1.silk");
        let recent_log = touch(&config.storage.log_dir, &format!("{LOG_FILE_PREFIX}.today.log"));
        age(&staged, DAY * 2);
        age(&output, DAY * 2);
        age(&recent_log, DAY * 2);

        let report = run_sweep(&config).await;
        assert_eq!(report.removed, 2);
        assert!(!staged.exists());
        assert!(!output.exists());
        assert!(recent_log.exists());
    }

    #[tokio::test]
    async fn housekeeping_stops_on_cancel() {
        let mut config = Config::default();
        config.retention.sweep_interval_secs = 3600;
        let tools = std::sync::Arc::new(sc_av::ToolRegistry::with_paths(
            PathBuf::from("ffmpeg"),
            PathBuf::from("encoder"),
            None,
        ));
        let ctx = AppContext::with_tools(config, tools).unwrap();
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_housekeeping(ctx, cancel.clone()));

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("housekeeping did not stop")
            .unwrap();
    }
}
