//! CLI command definitions

use clap::{Parser, Subcommand};
use medreason_domain::OutputFormat;
use std::net::SocketAddr;
use std::path::PathBuf;

/// CLI arguments for medreason
#[derive(Parser, Debug)]
#[command(name = "medreason")]
#[command(author, version, about = "Criteria-driven clinical reasoning over patient data")]
#[command(long_about = r#"
medreason answers clinician questions about a patient with a reasoning model
that thinks step by step, asks for missing information, and gives a final
assessment against a clinical rubric (qSOFA, SIRS, Sepsis-3 or a custom one).

With --sql, a second model turns the question into a SQL query against the
clinical database and the result is added to the model's context.

Configuration files are loaded from (in priority order):
1. MEDREASON_* environment variables
2. --config <path>     Explicit config file
3. ./medreason.toml    Project-level config
4. ~/.config/medreason/config.toml   Global config

Example:
  medreason ask "patient 10000032 is taking which drugs?" --sql
  medreason chat
  medreason serve --addr 0.0.0.0:8000
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Also write logs to this file
    #[arg(long, value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Suppress progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long, global = true)]
    pub no_config: bool,

    /// Show configuration sources and the effective configuration, then exit
    #[arg(long)]
    pub show_config: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one reasoning turn and print the result
    Ask {
        /// Question, including `patient <id>` or `admission=<id>`
        question: String,

        /// Augment the turn with data from the clinical database
        #[arg(long)]
        sql: bool,

        /// Output format
        #[arg(short, long, default_value = "full")]
        output: OutputFormat,

        /// Shorthand for --output json
        #[arg(long)]
        json: bool,
    },

    /// Interactive session that carries the conversation between turns
    Chat {
        /// Augment every turn with data from the clinical database
        #[arg(long)]
        sql: bool,
    },

    /// Serve the HTTP API
    Serve {
        /// Bind address (overrides server.addr)
        #[arg(long, value_name = "ADDR")]
        addr: Option<SocketAddr>,
    },

    /// Print detected hardware and backend eligibility
    Detect,
}

impl Command {
    /// Effective output format for `ask`.
    pub fn output_format(&self) -> OutputFormat {
        match self {
            Command::Ask { json: true, .. } => OutputFormat::Json,
            Command::Ask { output, .. } => *output,
            _ => OutputFormat::Full,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ask_with_flags() {
        let cli = Cli::parse_from(["medreason", "-vv", "ask", "patient 1 status?", "--sql", "--json"]);
        assert_eq!(cli.verbose, 2);
        let command = cli.command.unwrap();
        assert_eq!(command.output_format(), OutputFormat::Json);
        match command {
            Command::Ask { question, sql, .. } => {
                assert_eq!(question, "patient 1 status?");
                assert!(sql);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_output_format() {
        let cli = Cli::parse_from(["medreason", "ask", "patient 1", "-o", "answer"]);
        assert_eq!(cli.command.unwrap().output_format(), OutputFormat::Answer);
    }

    #[test]
    fn test_parse_serve_addr() {
        let cli = Cli::parse_from(["medreason", "serve", "--addr", "0.0.0.0:9000"]);
        match cli.command.unwrap() {
            Command::Serve { addr } => assert_eq!(addr.unwrap().port(), 9000),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_show_config_without_command() {
        let cli = Cli::parse_from(["medreason", "--show-config"]);
        assert!(cli.show_config);
        assert!(cli.command.is_none());
    }
}
