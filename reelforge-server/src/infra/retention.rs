use std::{
    io,
    path::{Path, PathBuf},
    time::{Duration, SystemTime},
};

use tokio::fs;
use tracing::{debug, info, warn};

/// Totals from one sweep.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub removed_files: usize,
    pub removed_bytes: u64,
}

/// Deletes rendered videos and cached audio once they outlive the
/// retention window. Dot-files are never touched.
#[derive(Debug, Clone)]
pub struct RetentionSweeper {
    roots: Vec<PathBuf>,
    max_age: Duration,
    interval: Duration,
}

impl RetentionSweeper {
    pub fn new(roots: Vec<PathBuf>, max_age: Duration, interval: Duration) -> Self {
        Self {
            roots,
            max_age,
            interval,
        }
    }

    /// Start the background sweep task.
    pub fn start(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.interval);
            info!(
                max_age = %humantime::format_duration(self.max_age),
                every = %humantime::format_duration(self.interval),
                "media retention sweep scheduled"
            );

            loop {
                interval.tick().await;
                let report = self.sweep(SystemTime::now()).await;
                if report.removed_files > 0 {
                    info!(
                        files = report.removed_files,
                        bytes = report.removed_bytes,
                        "expired media removed"
                    );
                }
            }
        })
    }

    /// Remove every expired file under the configured roots. Failures are
    /// logged and skipped; a missing root is not an error.
    pub async fn sweep(&self, now: SystemTime) -> SweepReport {
        let mut report = SweepReport::default();
        for root in &self.roots {
            if let Err(e) = self.sweep_root(root, now, &mut report).await {
                warn!(root = %root.display(), "Retention sweep failed: {}", e);
            }
        }
        report
    }

    async fn sweep_root(
        &self,
        root: &Path,
        now: SystemTime,
        report: &mut SweepReport,
    ) -> io::Result<()> {
        let mut pending = vec![root.to_path_buf()];

        while let Some(dir) = pending.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e),
            };

            while let Some(entry) = entries.next_entry().await? {
                if entry.file_name().to_string_lossy().starts_with('.') {
                    continue;
                }
                let metadata = match entry.metadata().await {
                    Ok(metadata) => metadata,
                    Err(e) => {
                        warn!(path = %entry.path().display(), "Failed to stat media file: {}", e);
                        continue;
                    }
                };

                if metadata.is_dir() {
                    pending.push(entry.path());
                    continue;
                }

                let expired = metadata
                    .modified()
                    .ok()
                    .and_then(|modified| now.duration_since(modified).ok())
                    .is_some_and(|age| age > self.max_age);
                if !expired {
                    continue;
                }

                let path = entry.path();
                match fs::remove_file(&path).await {
                    Ok(()) => {
                        debug!(path = %path.display(), "expired media file removed");
                        report.removed_files += 1;
                        report.removed_bytes += metadata.len();
                    }
                    Err(e) => {
                        warn!(path = %path.display(), "Failed to remove expired media: {}", e)
                    }
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR: Duration = Duration::from_secs(3600);

    fn touch(path: &Path, age: Duration) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        let file = std::fs::File::create(path).unwrap();
        file.set_modified(SystemTime::now() - age).unwrap();
    }

    #[tokio::test]
    async fn removes_only_expired_visible_files() {
        let dir = tempfile::tempdir().unwrap();
        let renders = dir.path().join("renders");
        let audio = dir.path().join("audio");

        touch(&renders.join("old.mp4"), 2 * HOUR);
        touch(&renders.join("fresh.mp4"), Duration::from_secs(60));
        touch(&renders.join(".keep"), 2 * HOUR);
        touch(&audio.join("narration/old.mp3"), 3 * HOUR);
        touch(&audio.join("music/new.mp3"), Duration::ZERO);

        let sweeper = RetentionSweeper::new(
            vec![renders.clone(), audio.clone()],
            HOUR,
            Duration::from_secs(600),
        );
        let report = sweeper.sweep(SystemTime::now()).await;

        assert_eq!(report.removed_files, 2);
        assert!(!renders.join("old.mp4").exists());
        assert!(renders.join("fresh.mp4").exists());
        assert!(renders.join(".keep").exists());
        assert!(!audio.join("narration/old.mp3").exists());
        assert!(audio.join("music/new.mp3").exists());
    }

    #[tokio::test]
    async fn missing_roots_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let sweeper = RetentionSweeper::new(
            vec![dir.path().join("absent")],
            HOUR,
            HOUR,
        );
        assert_eq!(
            sweeper.sweep(SystemTime::now()).await,
            SweepReport::default()
        );
    }
}
