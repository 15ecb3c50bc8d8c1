//! imgsearch - image similarity search CLI
//!
//! Main entry point for the imgsearch command-line tool.

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use colored::Colorize;
use std::io::{self, IsTerminal};
use std::process::ExitCode;
use tokio::runtime::Runtime;
use tracing::{debug, warn};

use imgsearch::logging::init_cli_logging;
use imgsearch::render::{self, ViewSnapshot};
use imgsearch::*;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let colors = !cli.no_color && std::env::var_os("NO_COLOR").is_none();
    init_cli_logging(cli.quiet, cli.verbose, colors && io::stderr().is_terminal());

    match run(&cli) {
        Ok(code) => code,
        Err(err) => {
            report_error(&err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<ExitCode> {
    let config = load_config(cli)?;
    if !config.output.colors {
        colored::control::set_override(false);
    }

    // One thread of control; the network call is the only suspension point.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    match &cli.command {
        Commands::Search(args) => cmd_search(&config, args, &runtime),
        Commands::Interactive => cmd_interactive(&config, &runtime),
        Commands::Config(args) => cmd_config(&config, args),
        Commands::Completions(args) => Ok(cmd_completions(args)),
    }
}

/// Layer CLI flags over the file and environment configuration.
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match Config::load() {
        Ok(config) => config,
        // A broken file must not block `config --init --force`.
        Err(e) if matches!(cli.command, Commands::Config(_)) => {
            warn!(error = %e, "Ignoring unreadable config file");
            Config::default()
        }
        Err(e) => return Err(e.into()),
    };

    if let Some(api_base) = &cli.api_base {
        config.service.api_base.clone_from(api_base);
    }
    if cli.no_metric {
        config.service.send_metric = false;
    }
    if let Some(timeout) = cli.timeout {
        config.service.timeout_secs = Some(timeout);
    }
    if let Some(format) = cli.format {
        config.output.format = format_name(format).to_string();
    }
    if cli.no_color {
        config.output.colors = false;
    }
    if cli.quiet {
        config.output.quiet = true;
    }

    debug!(api_base = %config.service.api_base, "Effective configuration");
    Ok(config)
}

fn output_format(config: &Config) -> OutputFormat {
    config.output.format.parse().unwrap_or_else(|_| {
        warn!(format = %config.output.format, "Unknown output format in config; using text");
        OutputFormat::Text
    })
}

const fn format_name(format: OutputFormat) -> &'static str {
    match format {
        OutputFormat::Text => "text",
        OutputFormat::Json => "json",
        OutputFormat::JsonPretty => "json-pretty",
        OutputFormat::Compact => "compact",
        OutputFormat::Csv => "csv",
    }
}

fn cmd_search(
    config: &Config,
    args: &cli::SearchArgs,
    runtime: &Runtime,
) -> Result<ExitCode> {
    let format = output_format(config);
    let image = runtime.block_on(ImageFile::load(&args.image))?;

    let client = HttpSearchClient::new(&config.service)?;
    let mut controller = SearchController::new(client, ControllerOptions::from_config(config));
    if let Some(top_k) = args.top_k {
        controller.set_top_k(top_k);
    }
    if let Some(metric) = args.metric {
        controller.set_metric(metric);
    }
    controller.select_file(Some(image));

    let spinner = show_spinner(config, format).then(render::searching_spinner);
    runtime.block_on(controller.submit_search());
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }

    let snapshot = ViewSnapshot::capture(&controller);
    let output = render::render(&snapshot, format)?;
    if matches!(format, OutputFormat::Json | OutputFormat::JsonPretty) {
        println!("{output}");
    } else {
        print!("{output}");
    }

    if args.guide && format == OutputFormat::Text {
        println!();
        print!("{}", render::render_metric_guide());
    }

    debug!(
        status = snapshot.status.as_str(),
        results = snapshot.results.len(),
        "Search finished"
    );

    // The view already shows the message; the error path adds the hint and exit code.
    match controller.state().error() {
        Some(err) => Err(ImgSearchError::Search(err.clone()).into()),
        None => Ok(ExitCode::SUCCESS),
    }
}

/// The spinner only goes to an interactive stderr, and never with `--quiet`.
fn show_spinner(config: &Config, format: OutputFormat) -> bool {
    format == OutputFormat::Text && !config.output.quiet && io::stderr().is_terminal()
}

fn cmd_interactive(config: &Config, runtime: &Runtime) -> Result<ExitCode> {
    let client = HttpSearchClient::new(&config.service)?;
    println!("Search service: {}", client.api_base().bold());
    let controller = SearchController::new(client, ControllerOptions::from_config(config));
    repl::run(controller, runtime, show_spinner(config, OutputFormat::Text))?;
    Ok(ExitCode::SUCCESS)
}

fn cmd_config(config: &Config, args: &cli::ConfigArgs) -> Result<ExitCode> {
    let path = args
        .path
        .clone()
        .or_else(Config::user_config_path)
        .context("Could not determine config directory")?;

    if args.init {
        if path.exists() && !args.force {
            anyhow::bail!(
                "Config file already exists at {}. Use --force to overwrite.",
                path.display()
            );
        }
        Config::default().save_to(&path)?;
        println!("{} Wrote default config to {}", "✓".green(), path.display());
        return Ok(ExitCode::SUCCESS);
    }

    // An explicit --path shows that file on its own, without env or flag overrides.
    let shown = match &args.path {
        Some(path) => Config::load_from_file(path)?.unwrap_or_default(),
        None => config.clone(),
    };
    let state = if path.exists() { "found" } else { "not found" };
    println!("{}", "Current Configuration".bold().cyan());
    println!("  Config file: {} ({state})", path.display());
    println!();
    print!("{}", toml::to_string_pretty(&shown).context("Failed to serialize config")?);
    Ok(ExitCode::SUCCESS)
}

fn cmd_completions(args: &cli::CompletionsArgs) -> ExitCode {
    let mut cmd = Cli::command();
    generate(args.shell, &mut cmd, "imgsearch", &mut io::stdout());
    ExitCode::SUCCESS
}

fn report_error(err: &anyhow::Error) {
    if let Some(e) = err.downcast_ref::<ImgSearchError>() {
        let suggestions: Vec<&str> = e.suggestion().into_iter().collect();
        eprintln!("{}", format_error("imgsearch failed", &e.to_string(), &suggestions));
    } else {
        eprintln!("{}", format_error("imgsearch failed", &format!("{err:#}"), &[]));
    }
}
