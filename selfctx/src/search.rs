//! Regex search across a log directory, grounded on `contextstore::store::ContextStore::search`

use grep_regex::RegexMatcher;
use grep_searcher::sinks::UTF8;
use grep_searcher::Searcher;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

use super::error::SelfCtxError;

/// A single regex match found while scanning log files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogMatch {
    pub file: String,
    pub line_number: u64,
    pub line: String,
}

/// Scan every file in `dir` (non-recursive log rotation siblings included)
/// for `pattern`, capped at `max_results`. Used by `SelfAnalyzer`'s root
/// cause classifier to corroborate a hypothesis ("does the error log
/// actually mention 'permission denied'?").
pub fn search_logs(dir: &Path, pattern: &str, max_results: usize) -> Result<Vec<LogMatch>, SelfCtxError> {
    debug!(?dir, %pattern, max_results, "search_logs: called");
    let matcher = RegexMatcher::new(pattern).map_err(|_| SelfCtxError::LogNotFound(pattern.to_string()))?;
    let mut results = Vec::new();

    for entry in WalkDir::new(dir).max_depth(1).into_iter().filter_map(|e| e.ok()) {
        if results.len() >= max_results {
            break;
        }
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let file_name = path.display().to_string();
        let mut found_in_file = Vec::new();
        let search_result = Searcher::new().search_path(
            &matcher,
            path,
            UTF8(|line_number, line| {
                found_in_file.push(LogMatch {
                    file: file_name.clone(),
                    line_number,
                    line: line.trim_end().to_string(),
                });
                Ok(true)
            }),
        );

        if search_result.is_ok() {
            results.extend(found_in_file);
        }
    }

    results.truncate(max_results);
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn search_logs_finds_matching_lines() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("error.log"), "ok\npermission denied: /etc/x\nok\n").unwrap();
        std::fs::write(dir.path().join("orchestrator.log"), "nothing interesting\n").unwrap();

        let matches = search_logs(dir.path(), "permission denied", 10).unwrap();
        assert_eq!(matches.len(), 1);
        assert!(matches[0].line.contains("permission denied"));
    }

    #[test]
    fn search_logs_respects_max_results() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("error.log"), "err\nerr\nerr\nerr\n").unwrap();

        let matches = search_logs(dir.path(), "err", 2).unwrap();
        assert_eq!(matches.len(), 2);
    }
}
