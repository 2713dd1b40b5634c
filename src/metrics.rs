//! Resolution metrics
//!
//! Thread-safe counters for batch resolutions, kept per project and overall.

use crate::access_control::types::ProjectId;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Resolution metrics collector
pub struct ResolutionMetrics {
    start_time: Instant,
    batches: AtomicU64,
    subjects_resolved: AtomicU64,
    override_hits: AtomicU64,
    inconsistencies: AtomicU64,
    failures: AtomicU64,
    projects: RwLock<HashMap<ProjectId, ProjectStatsInner>>,
}

#[derive(Default)]
struct ProjectStatsInner {
    batches: u64,
    subjects_resolved: u64,
    failures: u64,
    total_duration_us: u64,
    last_resolved: Option<SystemTime>,
}

/// Outcome of one successful batch, as recorded
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchRecord {
    pub subjects: u64,
    pub override_hits: u64,
    pub inconsistencies: u64,
    pub duration: Duration,
}

/// Serializable per-project statistics
#[derive(Debug, Clone, Serialize)]
pub struct ProjectStats {
    pub project_id: ProjectId,
    pub batches: u64,
    pub subjects_resolved: u64,
    pub failures: u64,
    pub avg_duration_us: u64,
    pub last_resolved: Option<u64>,
}

/// Overall metrics snapshot
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub uptime_secs: u64,
    pub batches: u64,
    pub subjects_resolved: u64,
    pub override_hits: u64,
    pub inconsistencies: u64,
    pub failures: u64,
    pub projects: Vec<ProjectStats>,
}

impl ResolutionMetrics {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            batches: AtomicU64::new(0),
            subjects_resolved: AtomicU64::new(0),
            override_hits: AtomicU64::new(0),
            inconsistencies: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            projects: RwLock::new(HashMap::new()),
        }
    }

    // Recover from poisoned locks; counters stay usable after a panic elsewhere

    fn write_projects(&self) -> RwLockWriteGuard<'_, HashMap<ProjectId, ProjectStatsInner>> {
        self.projects.write().unwrap_or_else(|poisoned| {
            tracing::warn!("metrics lock poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn read_projects(&self) -> RwLockReadGuard<'_, HashMap<ProjectId, ProjectStatsInner>> {
        self.projects.read().unwrap_or_else(|poisoned| {
            tracing::warn!("metrics lock poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Record a completed batch resolution
    pub fn record_batch(&self, project_id: ProjectId, record: BatchRecord) {
        self.batches.fetch_add(1, Ordering::Relaxed);
        self.subjects_resolved
            .fetch_add(record.subjects, Ordering::Relaxed);
        self.override_hits
            .fetch_add(record.override_hits, Ordering::Relaxed);
        self.inconsistencies
            .fetch_add(record.inconsistencies, Ordering::Relaxed);

        let mut projects = self.write_projects();
        let stats = projects.entry(project_id).or_default();
        stats.batches += 1;
        stats.subjects_resolved += record.subjects;
        stats.total_duration_us += record.duration.as_micros() as u64;
        stats.last_resolved = Some(SystemTime::now());
    }

    /// Record a batch that failed with `ResolutionUnavailable`
    pub fn record_failure(&self, project_id: ProjectId) {
        self.failures.fetch_add(1, Ordering::Relaxed);
        self.write_projects().entry(project_id).or_default().failures += 1;
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let mut projects: Vec<ProjectStats> = self
            .read_projects()
            .iter()
            .map(|(id, stats)| ProjectStats {
                project_id: *id,
                batches: stats.batches,
                subjects_resolved: stats.subjects_resolved,
                failures: stats.failures,
                avg_duration_us: stats
                    .total_duration_us
                    .checked_div(stats.batches)
                    .unwrap_or(0),
                last_resolved: stats
                    .last_resolved
                    .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                    .map(|d| d.as_secs()),
            })
            .collect();
        projects.sort_by_key(|p| p.project_id);

        MetricsSnapshot {
            uptime_secs: self.start_time.elapsed().as_secs(),
            batches: self.batches.load(Ordering::Relaxed),
            subjects_resolved: self.subjects_resolved.load(Ordering::Relaxed),
            override_hits: self.override_hits.load(Ordering::Relaxed),
            inconsistencies: self.inconsistencies.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            projects,
        }
    }
}

impl Default for ResolutionMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_batch() {
        let metrics = ResolutionMetrics::new();
        metrics.record_batch(
            2,
            BatchRecord {
                subjects: 3,
                override_hits: 1,
                inconsistencies: 0,
                duration: Duration::from_micros(40),
            },
        );
        metrics.record_batch(
            2,
            BatchRecord {
                subjects: 1,
                override_hits: 0,
                inconsistencies: 1,
                duration: Duration::from_micros(20),
            },
        );

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.batches, 2);
        assert_eq!(snapshot.subjects_resolved, 4);
        assert_eq!(snapshot.override_hits, 1);
        assert_eq!(snapshot.inconsistencies, 1);
        assert_eq!(snapshot.projects.len(), 1);
        assert_eq!(snapshot.projects[0].avg_duration_us, 30);
        assert!(snapshot.projects[0].last_resolved.is_some());
    }

    #[test]
    fn test_record_failure() {
        let metrics = ResolutionMetrics::new();
        metrics.record_failure(5);
        metrics.record_failure(1);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.failures, 2);
        assert_eq!(snapshot.batches, 0);
        let ids: Vec<_> = snapshot.projects.iter().map(|p| p.project_id).collect();
        assert_eq!(ids, vec![1, 5]);
        assert_eq!(snapshot.projects[0].avg_duration_us, 0);
    }
}
