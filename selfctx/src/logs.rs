//! Tail reading for the fixed set of logs self-analysis inspects

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use super::error::SelfCtxError;

/// Default number of trailing lines gathered per log (`spec.md` 4.13: "last 50 lines")
pub const DEFAULT_TAIL_LINES: usize = 50;

/// Paths to the four logs `spec.md`'s `AnalysisContext` names
#[derive(Debug, Clone)]
pub struct LogPaths {
    pub error: PathBuf,
    pub orchestrator: PathBuf,
    pub frontend: PathBuf,
    pub metrics: PathBuf,
}

/// Tailed contents of all four logs, mirroring `AnalysisContext.logs`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisLogs {
    pub error: Vec<String>,
    pub orchestrator: Vec<String>,
    pub frontend: Vec<String>,
    pub metrics: Vec<String>,
}

/// Read the last `lines` lines of a file. A missing file yields an empty tail
/// rather than an error - logs not having rolled yet is a normal state.
pub fn tail_file(path: impl AsRef<Path>, lines: usize) -> Result<Vec<String>, SelfCtxError> {
    let path = path.as_ref();
    debug!(?path, lines, "tail_file: called");
    if !path.exists() {
        debug!(?path, "tail_file: file does not exist, returning empty tail");
        return Ok(Vec::new());
    }

    let content = std::fs::read_to_string(path).map_err(|source| SelfCtxError::Io {
        path: path.display().to_string(),
        source,
    })?;

    let all_lines: Vec<&str> = content.lines().collect();
    let start = all_lines.len().saturating_sub(lines);
    Ok(all_lines[start..].iter().map(|s| s.to_string()).collect())
}

/// Gather all four logs at once. Fails fast on the first unreadable log so
/// the caller can fall back to a flagged degraded `AnalysisContext`.
pub fn gather_logs(paths: &LogPaths, lines: usize) -> Result<AnalysisLogs, SelfCtxError> {
    debug!(?paths, lines, "gather_logs: called");
    Ok(AnalysisLogs {
        error: tail_file(&paths.error, lines)?,
        orchestrator: tail_file(&paths.orchestrator, lines)?,
        frontend: tail_file(&paths.frontend, lines)?,
        metrics: tail_file(&paths.metrics, lines)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn tail_file_returns_last_n_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("app.log");
        let mut file = std::fs::File::create(&path).unwrap();
        for i in 1..=100 {
            writeln!(file, "line {i}").unwrap();
        }

        let tail = tail_file(&path, 10).unwrap();
        assert_eq!(tail.len(), 10);
        assert_eq!(tail[0], "line 91");
        assert_eq!(tail[9], "line 100");
    }

    #[test]
    fn tail_file_missing_file_is_empty_not_error() {
        let dir = tempdir().unwrap();
        let tail = tail_file(dir.path().join("missing.log"), 50).unwrap();
        assert!(tail.is_empty());
    }

    #[test]
    fn tail_file_short_file_returns_all_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("short.log");
        std::fs::write(&path, "only one line\n").unwrap();

        let tail = tail_file(&path, 50).unwrap();
        assert_eq!(tail, vec!["only one line".to_string()]);
    }

    #[test]
    fn gather_logs_reads_all_four() {
        let dir = tempdir().unwrap();
        for name in ["error.log", "orchestrator.log", "frontend.log", "metrics.log"] {
            std::fs::write(dir.path().join(name), format!("{name} line\n")).unwrap();
        }
        let paths = LogPaths {
            error: dir.path().join("error.log"),
            orchestrator: dir.path().join("orchestrator.log"),
            frontend: dir.path().join("frontend.log"),
            metrics: dir.path().join("metrics.log"),
        };

        let logs = gather_logs(&paths, DEFAULT_TAIL_LINES).unwrap();
        assert_eq!(logs.error, vec!["error.log line".to_string()]);
        assert_eq!(logs.frontend, vec!["frontend.log line".to_string()]);
    }
}
