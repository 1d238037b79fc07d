//! selfctx - log tail and process context gathering for self-analysis
//!
//! Backs the `SelfAnalyzer`'s "gather logs and process state via the MCP
//! filesystem server" step (`spec.md` 4.13). The concrete MCP filesystem
//! server is an external collaborator out of scope for this system; this
//! crate is the local, always-available implementation of what such a
//! server's `read_file`/`tail`/`grep` tools would do, used directly by the
//! orchestrator so self-analysis works even when no MCP filesystem server
//! is configured. Grounded on the teacher's `contextstore` crate
//! (chunked file reads, glob-driven ingestion, regex search).

mod config;
mod error;
mod logs;
mod process;
mod search;

pub use config::{default_log_dir, log_paths_in};
pub use error::SelfCtxError;
pub use logs::{gather_logs, tail_file, AnalysisLogs, LogPaths, DEFAULT_TAIL_LINES};
pub use process::{process_snapshot, ProcessSnapshot};
pub use search::{search_logs, LogMatch};
