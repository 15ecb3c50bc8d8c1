//! Interactive search session.
//!
//! A command-driven shell over one [`SearchController`]: open an image, adjust
//! the result count and metric, search, and look at the matches. History is
//! kept in `~/.imgsearch_history`.

use anyhow::{Context, Result};
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{CompletionType, Config, EditMode, Editor};
use std::path::PathBuf;
use tokio::runtime::Runtime;
use tracing::{debug, info, warn};

use crate::controller::SearchController;
use crate::error::{VALID_METRICS, VALID_REPL_COMMANDS, format_error, format_unknown_value_error};
use crate::image::ImageFile;
use crate::model::{MAX_TOP_K, MIN_TOP_K, Metric};
use crate::render::{self, ViewSnapshot};
use crate::service::SearchService;

/// REPL session state.
pub struct ReplSession<'rt, S> {
    controller: SearchController<S>,
    runtime: &'rt Runtime,
    spinner: bool,
}

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Open { path: PathBuf },
    Close,
    TopK(u32),
    Metric(Metric),
    Search,
    Results,
    Show,
    Guide,
    Help { command: Option<String> },
    Quit,
}

/// Run the REPL session until the user quits.
///
/// `spinner` controls the "Searching..." indicator while a search is in flight.
///
/// # Errors
///
/// Returns an error if readline setup or history persistence fails.
pub fn run<S: SearchService>(
    controller: SearchController<S>,
    runtime: &Runtime,
    spinner: bool,
) -> Result<()> {
    let config = Config::builder()
        .history_ignore_space(true)
        .history_ignore_dups(true)?
        .completion_type(CompletionType::List)
        .edit_mode(EditMode::Emacs)
        .build();

    let mut rl: Editor<(), DefaultHistory> = Editor::with_config(config)?;

    let history_path = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".imgsearch_history");
    let _ = rl.load_history(&history_path);

    let mut session = ReplSession::new(controller, runtime);
    if !spinner {
        session = session.without_spinner();
    }

    info!("Starting interactive session");
    println!(
        "{}",
        "imgsearch interactive mode. Type 'help' for commands, 'quit' to exit.".cyan()
    );
    println!();

    loop {
        let prompt = session.format_prompt();
        match rl.readline(&prompt) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                if !matches!(line, "quit" | "exit" | "q") {
                    rl.add_history_entry(line)?;
                }

                debug!(command = %line, "REPL command");
                if !session.execute(line) {
                    break;
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
            }
            Err(ReadlineError::Eof) => {
                println!();
                break;
            }
            Err(e) => {
                return Err(anyhow::anyhow!(e)).context("Readline failed");
            }
        }
    }

    if let Err(e) = rl.save_history(&history_path) {
        warn!(error = %e, "Could not save history");
    }
    info!("Ended interactive session");
    println!("Goodbye!");
    Ok(())
}

impl<'rt, S: SearchService> ReplSession<'rt, S> {
    pub const fn new(controller: SearchController<S>, runtime: &'rt Runtime) -> Self {
        Self {
            controller,
            runtime,
            spinner: true,
        }
    }

    /// Turn the "Searching..." spinner off (for non-terminal use).
    #[must_use]
    pub const fn without_spinner(mut self) -> Self {
        self.spinner = false;
        self
    }

    #[must_use]
    pub const fn controller(&self) -> &SearchController<S> {
        &self.controller
    }

    fn format_prompt(&self) -> String {
        let query = self.controller.query();
        match &query.file {
            None => "imgsearch> ".to_string(),
            Some(file) if self.controller.sends_metric() => {
                format!("imgsearch [{} k={} {}]> ", file.name(), query.top_k, query.metric)
            }
            Some(file) => format!("imgsearch [{} k={}]> ", file.name(), query.top_k),
        }
    }

    /// Run one command line. Returns `false` when the session should end.
    pub fn execute(&mut self, input: &str) -> bool {
        let command = match parse_command(input) {
            Ok(command) => command,
            Err(message) => {
                eprintln!("{message}");
                return true;
            }
        };

        match command {
            Command::Open { path } => self.open(path),
            Command::Close => {
                self.controller.select_file(None);
                println!("{}", "Selection cleared.".dimmed());
            }
            Command::TopK(k) => {
                self.controller.set_top_k(k);
                println!("Top-K set to {}", k.to_string().cyan());
            }
            Command::Metric(metric) => {
                self.controller.set_metric(metric);
                println!("Metric set to {}", metric.label().cyan());
                if !self.controller.sends_metric() {
                    println!(
                        "{}",
                        "Note: the metric parameter is disabled for this service.".yellow()
                    );
                }
            }
            Command::Search => self.search(),
            Command::Results => self.print_results(),
            Command::Show => self.print_view(),
            Command::Guide => print!("{}", render::render_metric_guide()),
            Command::Help { command } => print_help(command.as_deref()),
            Command::Quit => return false,
        }
        true
    }

    fn open(&mut self, path: PathBuf) {
        match self.runtime.block_on(ImageFile::load(&path)) {
            Ok(image) => {
                println!(
                    "{} {} ({})",
                    "✓".green(),
                    image.name(),
                    crate::format_bytes(u64::try_from(image.len()).unwrap_or(u64::MAX))
                );
                self.controller.select_file(Some(image));
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Could not open image");
                let suggestions: Vec<&str> = e.suggestion().into_iter().collect();
                eprintln!("{}", format_error("Could not open image", &e.to_string(), &suggestions));
            }
        }
    }

    fn search(&mut self) {
        let spinner = self.spinner.then(render::searching_spinner);
        self.runtime.block_on(self.controller.submit_search());
        if let Some(spinner) = spinner {
            spinner.finish_and_clear();
        }
        self.print_view();
    }

    fn print_results(&self) {
        let results = self.controller.results();
        if results.is_empty() {
            println!("{}", "No results.".yellow());
            return;
        }
        for item in results {
            print!("{}", render::render_card(item));
        }
    }

    fn print_view(&self) {
        print!("{}", render::render_text(&ViewSnapshot::capture(&self.controller)));
    }
}

fn parse_command(input: &str) -> std::result::Result<Command, String> {
    let mut parts = input.split_whitespace();
    let Some(head) = parts.next() else {
        return Err(format_error("Empty command", "", &["Type 'help' for commands."]));
    };
    let rest: Vec<&str> = parts.collect();
    let arg = rest.join(" ");

    match head.to_lowercase().as_str() {
        "open" | "o" => {
            if arg.is_empty() {
                Err(format_error("Missing path", "Usage: open <path>", &[]))
            } else {
                Ok(Command::Open {
                    path: PathBuf::from(arg),
                })
            }
        }
        "close" => Ok(Command::Close),
        "k" | "topk" | "top-k" => parse_top_k(&arg).map(Command::TopK),
        "metric" | "m" => arg
            .parse::<Metric>()
            .map(Command::Metric)
            .map_err(|_| format_unknown_value_error("metric", &arg, VALID_METRICS)),
        "search" | "s" | "go" => Ok(Command::Search),
        "results" | "r" => Ok(Command::Results),
        "show" => Ok(Command::Show),
        "guide" => Ok(Command::Guide),
        "help" | "?" => Ok(Command::Help {
            command: (!arg.is_empty()).then_some(arg),
        }),
        "quit" | "exit" | "q" => Ok(Command::Quit),
        other => Err(format_unknown_value_error("command", other, VALID_REPL_COMMANDS)),
    }
}

fn parse_top_k(arg: &str) -> std::result::Result<u32, String> {
    let range_hint = format!("Top-K must be a whole number from {MIN_TOP_K} to {MAX_TOP_K}.");
    match arg.parse::<u32>() {
        Ok(k) if (MIN_TOP_K..=MAX_TOP_K).contains(&k) => Ok(k),
        _ => Err(format_error(&format!("Invalid Top-K: '{arg}'"), &range_hint, &[])),
    }
}

fn print_help(command: Option<&str>) {
    match command {
        Some("open") => println!("open <path>     Select the query image"),
        Some("k") => println!("k <n>           Number of results to request ({MIN_TOP_K}-{MAX_TOP_K})"),
        Some("metric") => println!("metric <name>   Similarity metric: l2 or cosine"),
        Some("search") => println!("search          Send the selected image to the service"),
        _ => {
            println!("{}", "Commands".bold());
            println!("  open <path>     Select the query image");
            println!("  close           Clear the selection");
            println!("  k <n>           Number of results ({MIN_TOP_K}-{MAX_TOP_K})");
            println!("  metric <name>   l2 or cosine");
            println!("  search          Run the search");
            println!("  results         Show the last results");
            println!("  show            Show query, status and results");
            println!("  guide           Explain L2 vs cosine");
            println!("  help [command]  Show help");
            println!("  quit            Leave");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::ControllerOptions;
    use crate::error::SearchError;
    use crate::model::{ResultItem, SearchResponse};
    use crate::service::SearchRequest;
    use std::cell::Cell;

    struct OneMatch {
        calls: Cell<usize>,
    }

    impl SearchService for OneMatch {
        async fn search(&self, _request: &SearchRequest) -> Result<SearchResponse, SearchError> {
            self.calls.set(self.calls.get() + 1);
            Ok(SearchResponse {
                results: vec![ResultItem {
                    index: 1,
                    rank: 1,
                    distance: 0.25,
                    image_url: "http://127.0.0.1:8000/static/1.jpg".to_string(),
                    filename: None,
                }],
            })
        }
    }

    fn runtime() -> Runtime {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
    }

    #[test]
    fn parse_known_commands() {
        assert_eq!(parse_command("search").unwrap(), Command::Search);
        assert_eq!(parse_command("k 7").unwrap(), Command::TopK(7));
        assert_eq!(parse_command("metric COSINE").unwrap(), Command::Metric(Metric::Cosine));
        assert_eq!(
            parse_command("open ./my photos/cat.png").unwrap(),
            Command::Open {
                path: PathBuf::from("./my photos/cat.png")
            }
        );
        assert_eq!(parse_command("exit").unwrap(), Command::Quit);
    }

    #[test]
    fn parse_rejects_out_of_range_top_k() {
        assert!(parse_command("k 0").is_err());
        assert!(parse_command("k 21").is_err());
        assert!(parse_command("k many").is_err());
    }

    #[test]
    fn parse_suggests_close_commands() {
        let err = parse_command("serch").unwrap_err();
        assert!(err.contains("serch"));
        let err = parse_command("metric cosin").unwrap_err();
        assert!(err.contains("Unknown metric"));
    }

    #[test]
    fn session_runs_a_search() {
        let rt = runtime();
        let service = OneMatch {
            calls: Cell::new(0),
        };
        let controller = SearchController::new(&service, ControllerOptions::default());
        let mut session = ReplSession::new(controller, &rt).without_spinner();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("q.png");
        std::fs::write(&path, [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]).unwrap();

        assert!(session.execute("search"));
        assert_eq!(
            session.controller().error_message().as_deref(),
            Some(crate::error::NO_IMAGE_MESSAGE)
        );
        assert_eq!(service.calls.get(), 0);

        assert!(session.execute(&format!("open {}", path.display())));
        assert!(session.controller().error_message().is_none());
        assert!(session.execute("k 3"));
        assert!(session.execute("search"));
        assert_eq!(service.calls.get(), 1);
        assert_eq!(session.controller().results().len(), 1);
        assert!(session.format_prompt().contains("k=3"));
        assert!(!session.execute("quit"));
    }
}
