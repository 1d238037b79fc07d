//! Process state snapshot: memory usage and uptime for `AnalysisContext`

use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime};
use tracing::debug;

/// A point-in-time read of process resource usage
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProcessSnapshot {
    /// Resident set size in kilobytes, 0 if unavailable on this platform
    pub memory_usage_kb: u64,
    /// Wall-clock time since `started_at`, in milliseconds
    pub uptime_ms: u64,
    /// Unix millis at snapshot time
    pub timestamp_ms: i64,
}

/// Build a `ProcessSnapshot` relative to a process start time.
///
/// `started_at` is threaded in explicitly (captured once at startup) rather
/// than read from ambient global state, per `spec.md` 9's "no ambient
/// mutation" redesign guidance.
pub fn process_snapshot(started_at: SystemTime) -> ProcessSnapshot {
    debug!("process_snapshot: called");
    let uptime: Duration = SystemTime::now().duration_since(started_at).unwrap_or_default();

    ProcessSnapshot {
        memory_usage_kb: read_rss_kb(),
        uptime_ms: uptime.as_millis() as u64,
        timestamp_ms: chrono::Utc::now().timestamp_millis(),
    }
}

#[cfg(target_os = "linux")]
fn read_rss_kb() -> u64 {
    std::fs::read_to_string("/proc/self/status")
        .ok()
        .and_then(|status| {
            status.lines().find_map(|line| {
                line.strip_prefix("VmRSS:").map(|rest| {
                    rest.trim()
                        .trim_end_matches(" kB")
                        .trim()
                        .parse::<u64>()
                        .unwrap_or(0)
                })
            })
        })
        .unwrap_or(0)
}

#[cfg(not(target_os = "linux"))]
fn read_rss_kb() -> u64 {
    0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_uptime_is_nonnegative_and_grows() {
        let started = SystemTime::now() - Duration::from_secs(5);
        let snapshot = process_snapshot(started);
        assert!(snapshot.uptime_ms >= 5000);
    }

    #[test]
    fn snapshot_timestamp_is_set() {
        let snapshot = process_snapshot(SystemTime::now());
        assert!(snapshot.timestamp_ms > 0);
    }
}
