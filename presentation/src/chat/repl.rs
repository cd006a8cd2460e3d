//! REPL (Read-Eval-Print Loop) for interactive reasoning sessions

use crate::ConsoleFormatter;
use crate::ProgressReporter;
use crate::output::formatter::OutputFormatter;
use colored::Colorize;
use medreason_application::{
    ProgressMonitor, ProgressSubscriber, RunReasoningInput, RunReasoningUseCase, SubscriptionGuard,
};
use medreason_domain::{ReasoningState, Transcript};
use rustyline::error::ReadlineError;
use rustyline::{DefaultEditor, Result as RlResult};
use std::sync::Arc;

/// A parsed slash command.
#[derive(Debug, Clone, PartialEq, Eq)]
enum SlashCommand {
    Quit,
    Help,
    Reset,
    ListCriteria,
    UseCriteria(String),
    Unknown(String),
}

impl SlashCommand {
    fn parse(line: &str) -> Self {
        let mut parts = line.split_whitespace();
        let head = parts.next().unwrap_or_default();
        let arg = parts.next();
        match (head, arg) {
            ("/quit" | "/exit" | "/q", _) => SlashCommand::Quit,
            ("/help" | "/h" | "/?", _) => SlashCommand::Help,
            ("/reset" | "/new", _) => SlashCommand::Reset,
            ("/criteria", None) => SlashCommand::ListCriteria,
            ("/criteria", Some(key)) => SlashCommand::UseCriteria(key.to_string()),
            _ => SlashCommand::Unknown(head.to_string()),
        }
    }
}

/// Interactive reasoning REPL
///
/// Carries the transcript between turns: while the model is asking for more
/// information, the next line continues the same session.
pub struct ChatRepl {
    use_case: RunReasoningUseCase,
    monitor: Arc<ProgressMonitor>,
    use_sql: bool,
    show_progress: bool,
    formatter: Box<dyn OutputFormatter>,
    transcript: Transcript,
}

impl ChatRepl {
    pub fn new(use_case: RunReasoningUseCase, monitor: Arc<ProgressMonitor>) -> Self {
        Self {
            use_case,
            monitor,
            use_sql: false,
            show_progress: true,
            formatter: Box::new(ConsoleFormatter),
            transcript: Transcript::new(),
        }
    }

    /// Augment every turn with data from the clinical database
    pub fn with_sql(mut self, use_sql: bool) -> Self {
        self.use_sql = use_sql;
        self
    }

    /// Set whether to show model loading progress
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Replace the result formatter
    pub fn with_formatter(mut self, formatter: Box<dyn OutputFormatter>) -> Self {
        self.formatter = formatter;
        self
    }

    /// Run the interactive REPL
    pub async fn run(&mut self) -> RlResult<()> {
        let mut rl = DefaultEditor::new()?;

        let history_path = dirs::data_dir().map(|p| p.join("medreason").join("history.txt"));

        if let Some(ref path) = history_path {
            if let Some(parent) = path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            let _ = rl.load_history(path);
        }

        self.print_welcome();

        loop {
            let prompt = if self.transcript.is_empty() {
                ">>> "
            } else {
                "... "
            };

            match rl.readline(prompt) {
                Ok(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }

                    if line.starts_with('/') {
                        if self.handle_command(line) {
                            break;
                        }
                        continue;
                    }

                    let _ = rl.add_history_entry(line);
                    self.process_turn(line).await;
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    println!("Bye!");
                    break;
                }
                Err(err) => {
                    eprintln!("Error: {:?}", err);
                    break;
                }
            }
        }

        if let Some(ref path) = history_path {
            let _ = rl.save_history(path);
        }

        Ok(())
    }

    fn print_welcome(&self) {
        println!();
        println!("╭─────────────────────────────────────────────╮");
        println!("│        medreason - Interactive Session      │");
        println!("╰─────────────────────────────────────────────╯");
        println!();
        println!(
            "Criteria: {}   SQL: {}",
            self.use_case.criteria().active_key(),
            if self.use_sql { "on" } else { "off" }
        );
        println!("Start with a question that names the patient, e.g. \"patient 10000032 ...\"");
        Self::print_help();
    }

    fn print_help() {
        println!();
        println!("Commands:");
        println!("  /help, /h, /?     - Show this help");
        println!("  /reset            - Start a new session");
        println!("  /criteria [key]   - List rubrics, or switch the active one");
        println!("  /quit, /exit, /q  - Exit");
        println!();
    }

    /// Handle slash commands. Returns true if should exit.
    fn handle_command(&mut self, line: &str) -> bool {
        match SlashCommand::parse(line) {
            SlashCommand::Quit => {
                println!("Bye!");
                return true;
            }
            SlashCommand::Help => Self::print_help(),
            SlashCommand::Reset => {
                self.transcript = Transcript::new();
                println!("Session cleared.");
            }
            SlashCommand::ListCriteria => {
                let registry = self.use_case.criteria();
                let active = registry.active_key();
                println!();
                for summary in registry.list() {
                    let marker = if summary.key == active { "*" } else { " " };
                    println!("  {} {:<10} {}", marker, summary.key.bold(), summary.description);
                }
                println!();
            }
            SlashCommand::UseCriteria(key) => {
                if self.use_case.criteria().set_active(&key) {
                    println!("Active criteria: {}", key.green());
                } else {
                    println!("Unknown criteria: {}", key);
                }
            }
            SlashCommand::Unknown(cmd) => {
                println!("Unknown command: {}", cmd);
                println!("Type /help for available commands");
            }
        }
        false
    }

    async fn process_turn(&mut self, line: &str) {
        println!();

        let input = RunReasoningInput::new(line)
            .with_transcript(self.transcript.clone())
            .with_sql(self.use_sql);

        let _progress = self.show_progress.then(|| {
            let reporter: Arc<dyn ProgressSubscriber> = Arc::new(ProgressReporter::new());
            SubscriptionGuard::new(Arc::clone(&self.monitor), reporter)
        });

        match self.use_case.execute(input).await {
            Ok(result) => {
                println!("{}", self.formatter.format(&result));
                if result.state == ReasoningState::NeedsInfo {
                    println!("{}", "Provide the requested information to continue.".yellow());
                    self.transcript = result.conversation_history;
                } else {
                    self.transcript = Transcript::new();
                }
            }
            Err(e) => {
                eprintln!("{} {}", "Error:".red().bold(), e);
            }
        }
        println!();
    }
}
