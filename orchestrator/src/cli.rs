//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Multi-agent task orchestrator
#[derive(Parser)]
#[command(
    name = "orchestrator",
    about = "Plans, runs, and verifies MCP tool calls; falls back to chat or dev-mode self-analysis",
    version,
    after_help = "Config is loaded from --config, then ./.orchestrator.yml, then the user config dir, then built-in defaults."
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands
#[derive(Subcommand)]
pub enum Command {
    /// Run one utterance through the orchestrator and print the result
    Run {
        /// The user's message
        message: String,

        /// Session id to attach to (created if it doesn't exist yet)
        #[arg(short, long, default_value = "default")]
        session: String,

        /// Dev-mode intervention password, if the utterance requests code changes
        #[arg(long)]
        password: Option<String>,

        /// Request a TTS phrase alongside the text result
        #[arg(long)]
        tts: bool,

        /// Print the full result as JSON instead of a human summary
        #[arg(long)]
        json: bool,
    },

    /// Read utterances from stdin, one per line, keeping one session across all of them
    Repl {
        /// Session id to use for the whole REPL
        #[arg(short, long, default_value = "repl")]
        session: String,
    },

    /// Inspect the loaded configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Inspect in-memory session state
    Session {
        #[command(subcommand)]
        command: SessionCommand,
    },
}

/// `orchestrator config` debug subcommands
#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Print the resolved configuration as YAML
    Show,
}

/// `orchestrator session` debug subcommands
#[derive(Subcommand)]
pub enum SessionCommand {
    /// Print one session's mode, chat history, and last plan
    Inspect {
        /// Session id to inspect
        session: String,
    },

    /// Print aggregate counters across all live sessions
    Metrics,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_no_command() {
        let cli = Cli::parse_from(["orchestrator"]);
        assert!(cli.command.is_none());
    }

    #[test]
    fn parse_run() {
        let cli = Cli::parse_from(["orchestrator", "run", "make me a folder called notes"]);
        match cli.command {
            Some(Command::Run { message, session, password, tts, json }) => {
                assert_eq!(message, "make me a folder called notes");
                assert_eq!(session, "default");
                assert!(password.is_none());
                assert!(!tts);
                assert!(!json);
            }
            _ => panic!("expected Run command"),
        }
    }

    #[test]
    fn parse_run_with_session_and_password() {
        let cli = Cli::parse_from(["orchestrator", "run", "-s", "s1", "--password", "hunter2", "fix the bug"]);
        match cli.command {
            Some(Command::Run { session, password, .. }) => {
                assert_eq!(session, "s1");
                assert_eq!(password.as_deref(), Some("hunter2"));
            }
            _ => panic!("expected Run command"),
        }
    }

    #[test]
    fn parse_repl() {
        let cli = Cli::parse_from(["orchestrator", "repl"]);
        assert!(matches!(cli.command, Some(Command::Repl { .. })));
    }

    #[test]
    fn parse_with_config_path() {
        let cli = Cli::parse_from(["orchestrator", "-c", "/path/to/config.yml", "repl"]);
        assert_eq!(cli.config, Some(PathBuf::from("/path/to/config.yml")));
    }

    #[test]
    fn parse_config_show() {
        let cli = Cli::parse_from(["orchestrator", "config", "show"]);
        assert!(matches!(cli.command, Some(Command::Config { command: ConfigCommand::Show })));
    }

    #[test]
    fn parse_session_inspect() {
        let cli = Cli::parse_from(["orchestrator", "session", "inspect", "s1"]);
        match cli.command {
            Some(Command::Session { command: SessionCommand::Inspect { session } }) => assert_eq!(session, "s1"),
            _ => panic!("expected Session Inspect command"),
        }
    }

    #[test]
    fn parse_session_metrics() {
        let cli = Cli::parse_from(["orchestrator", "session", "metrics"]);
        assert!(matches!(cli.command, Some(Command::Session { command: SessionCommand::Metrics })));
    }
}
