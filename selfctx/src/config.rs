//! Default log locations

use std::path::PathBuf;
use tracing::debug;

use super::logs::LogPaths;

/// Default log directory: `$XDG_DATA_HOME/orchestrator/logs` or `./logs`
/// as a last resort, mirroring the teacher's `dirs::data_local_dir()` use
/// in `state/manager.rs`.
pub fn default_log_dir() -> PathBuf {
    debug!("default_log_dir: called");
    dirs::data_local_dir()
        .map(|d| d.join("orchestrator").join("logs"))
        .unwrap_or_else(|| PathBuf::from("./logs"))
}

/// Build the standard four-log `LogPaths` under a given directory
pub fn log_paths_in(dir: &std::path::Path) -> LogPaths {
    LogPaths {
        error: dir.join("error.log"),
        orchestrator: dir.join("orchestrator.log"),
        frontend: dir.join("frontend.log"),
        metrics: dir.join("metrics.log"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_paths_in_builds_four_fixed_names() {
        let dir = PathBuf::from("/tmp/whatever");
        let paths = log_paths_in(&dir);
        assert_eq!(paths.error, dir.join("error.log"));
        assert_eq!(paths.metrics, dir.join("metrics.log"));
    }
}
