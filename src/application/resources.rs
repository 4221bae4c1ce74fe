//! Resource governor - memory-driven concurrency hint and cache cleanup
//!
//! Both passes are maintenance hooks run after each command. They log and
//! swallow their own failures.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tokio::process::Command;
use tracing::{debug, info, warn};

/// Thresholds for the governor
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceLimits {
    pub memory_threshold_mb: f64,
    pub low_memory_concurrency: usize,
    pub default_concurrency: usize,
    pub disk_threshold_percent: u8,
    pub disk_path: PathBuf,
    pub cache_dir: PathBuf,
    pub cache_max_age: Duration,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            memory_threshold_mb: 500.0,
            low_memory_concurrency: 1,
            default_concurrency: 4,
            disk_threshold_percent: 80,
            disk_path: PathBuf::from("/"),
            cache_dir: PathBuf::from("./cache"),
            cache_max_age: Duration::from_secs(7 * 24 * 60 * 60),
        }
    }
}

pub struct ResourceGovernor {
    limits: ResourceLimits,
    concurrency: AtomicUsize,
}

impl ResourceGovernor {
    pub fn new(limits: ResourceLimits) -> Self {
        let initial = limits.default_concurrency;
        Self {
            limits,
            concurrency: AtomicUsize::new(initial),
        }
    }

    pub fn limits(&self) -> &ResourceLimits {
        &self.limits
    }

    pub fn max_concurrent_tasks(&self) -> usize {
        self.concurrency.load(Ordering::Relaxed)
    }

    /// Re-read process memory and update the concurrency hint.
    pub async fn adjust_concurrency(&self) -> usize {
        let usage = resident_memory_mb().await;
        self.apply_memory_reading(usage)
    }

    /// Set the hint from a memory reading; no reading keeps the default.
    pub fn apply_memory_reading(&self, usage_mb: Option<f64>) -> usize {
        let hint = match usage_mb {
            Some(mb) if mb > self.limits.memory_threshold_mb => self.limits.low_memory_concurrency,
            _ => self.limits.default_concurrency,
        };
        self.concurrency.store(hint, Ordering::Relaxed);
        debug!(memory_mb = ?usage_mb, max_concurrent_tasks = hint, "concurrency adjusted");
        hint
    }

    /// Purge stale cache files when the disk is above threshold.
    /// Returns the number of files removed.
    pub async fn cleanup_check(&self) -> std::io::Result<usize> {
        let Some(percent) = disk_usage_percent(&self.limits.disk_path).await? else {
            return Ok(0);
        };
        if percent <= self.limits.disk_threshold_percent {
            return Ok(0);
        }

        info!(
            disk_percent = percent,
            cache_dir = %self.limits.cache_dir.display(),
            "high disk usage, purging stale cache files"
        );
        purge_stale_files(&self.limits.cache_dir, self.limits.cache_max_age).await
    }

    /// Run both passes in the background.
    pub fn schedule_maintenance(self: &Arc<Self>) {
        let governor = Arc::clone(self);
        tokio::spawn(async move {
            governor.adjust_concurrency().await;
            if let Err(e) = governor.cleanup_check().await {
                warn!(error = %e, "cache cleanup failed");
            }
        });
    }
}

async fn resident_memory_mb() -> Option<f64> {
    let status = tokio::fs::read_to_string("/proc/self/status").await.ok()?;
    parse_vm_rss_mb(&status)
}

/// `VmRSS:   123456 kB` → megabytes
fn parse_vm_rss_mb(status: &str) -> Option<f64> {
    let line = status.lines().find(|l| l.starts_with("VmRSS:"))?;
    let kb: f64 = line.split_whitespace().nth(1)?.parse().ok()?;
    Some(kb / 1024.0)
}

async fn disk_usage_percent(path: &Path) -> std::io::Result<Option<u8>> {
    let output = Command::new("df").arg("-P").arg(path).output().await?;
    if !output.status.success() {
        return Ok(None);
    }
    Ok(parse_df_percent(&String::from_utf8_lossy(&output.stdout)))
}

/// Use% column of the last `df -P` row
fn parse_df_percent(output: &str) -> Option<u8> {
    output
        .lines()
        .skip(1)
        .last()?
        .split_whitespace()
        .find_map(|col| col.strip_suffix('%')?.parse().ok())
}

/// Delete regular files in `dir` (recursively) not modified for `max_age`.
async fn purge_stale_files(dir: &Path, max_age: Duration) -> std::io::Result<usize> {
    let mut removed = 0;
    let mut pending = vec![dir.to_path_buf()];
    let now = SystemTime::now();

    while let Some(current) = pending.pop() {
        let mut entries = match tokio::fs::read_dir(&current).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => return Err(e),
        };
        while let Some(entry) = entries.next_entry().await? {
            let meta = entry.metadata().await?;
            if meta.is_dir() {
                pending.push(entry.path());
                continue;
            }
            let age = meta
                .modified()
                .ok()
                .and_then(|m| now.duration_since(m).ok())
                .unwrap_or_default();
            if meta.is_file() && age >= max_age {
                tokio::fs::remove_file(entry.path()).await?;
                removed += 1;
            }
        }
    }
    Ok(removed)
}
