//! Command-line interface for career-chat.
//!
//! `render` turns a JSON transcript into a standalone HTML page with diagrams
//! filled in; `inspect` prints the block tree of one message body as JSON.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// career-chat - Render career-guidance chat transcripts
#[derive(Parser, Debug)]
#[command(name = "career-chat")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Log level written to the debug log (overrides DEBUG_LEVEL)
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Render a JSON transcript to an HTML page
    Render {
        /// Transcript file: a JSON array of {sender, rawText, timestamp}
        #[arg(value_name = "TRANSCRIPT")]
        transcript: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long, value_name = "OUT")]
        output: Option<PathBuf>,

        /// Configuration file (default: platform config directory)
        #[arg(long, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Diagram engine, overriding the configuration
        #[arg(long, value_enum)]
        engine: Option<EngineChoice>,
    },
    /// Print the block tree of a raw message body as JSON
    Inspect {
        /// File containing the message body
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineChoice {
    Auto,
    Native,
    Kroki,
}

impl EngineChoice {
    /// Value stored in `DiagramConfig::engine`.
    pub fn as_config_value(self) -> &'static str {
        match self {
            EngineChoice::Auto => "auto",
            EngineChoice::Native => "native",
            EngineChoice::Kroki => "kroki",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_render() {
        let cli = Cli::parse_from([
            "career-chat",
            "render",
            "chat.json",
            "-o",
            "out.html",
            "--engine",
            "native",
            "--log-level",
            "debug",
        ]);
        assert_eq!(cli.log_level, Some(LogLevel::Debug));
        match cli.command {
            Commands::Render {
                transcript,
                output,
                config,
                engine,
            } => {
                assert_eq!(transcript, PathBuf::from("chat.json"));
                assert_eq!(output, Some(PathBuf::from("out.html")));
                assert_eq!(config, None);
                assert_eq!(engine, Some(EngineChoice::Native));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_inspect_with_global_flag_first() {
        let cli = Cli::parse_from(["career-chat", "--log-level", "off", "inspect", "msg.md"]);
        assert_eq!(cli.log_level.map(LogLevel::to_filter), Some(log::LevelFilter::Off));
        assert!(matches!(cli.command, Commands::Inspect { .. }));
    }

    #[test]
    fn test_unknown_engine_rejected() {
        assert!(Cli::try_parse_from(["career-chat", "render", "x.json", "--engine", "dot"]).is_err());
    }
}
