use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use mdbook::preprocess::{CmdPreprocessor, Preprocessor};
use snippet_check::{check_paths, CheckConfig, SnippetCheckPreprocessor};
use std::io;
use std::path::PathBuf;
use std::process::exit;

/// Exit code for configuration and I/O failures
const EXIT_FATAL: i32 = 2;

#[derive(Parser)]
#[command(version, about = "Check the code blocks of Markdown documents", long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    check: CheckArgs,
}

#[derive(Subcommand)]
enum Command {
    /// Check documents and directories (the default)
    Check(CheckArgs),
    /// Run as an mdBook preprocessor
    Mdbook {
        #[command(subcommand)]
        command: Option<MdbookCommand>,
    },
}

#[derive(Subcommand)]
enum MdbookCommand {
    /// Check whether a renderer is supported
    Supports { renderer: String },
}

#[derive(Args, Clone)]
struct CheckArgs {
    /// Files or directories to check (default: current directory)
    paths: Vec<PathBuf>,

    /// Configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// File of extra allowed symbols, one per line
    #[arg(long, value_name = "FILE")]
    allow_list: Option<PathBuf>,

    /// Markdown file extension to look for; may be repeated
    #[arg(long = "extension", value_name = "EXT")]
    extensions: Vec<String>,

    /// Report format
    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let result = match cli.command {
        Some(Command::Mdbook { command }) => handle_mdbook(command),
        Some(Command::Check(args)) => handle_check(args),
        None => handle_check(cli.check),
    };

    match result {
        Ok(code) => exit(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            exit(EXIT_FATAL);
        }
    }
}

fn handle_check(args: CheckArgs) -> Result<i32> {
    let mut config = CheckConfig::discover(args.config.as_deref())?;
    if let Some(allow_list) = args.allow_list {
        config.allow_list = Some(allow_list);
    }
    if !args.extensions.is_empty() {
        config.extensions = args
            .extensions
            .iter()
            .map(|ext| ext.trim_start_matches('.').to_string())
            .collect();
    }

    let paths = if args.paths.is_empty() {
        vec![PathBuf::from(".")]
    } else {
        args.paths
    };

    let runtime = tokio::runtime::Builder::new_current_thread().build()?;
    let report = runtime.block_on(check_paths(&paths, config))?;

    match args.format {
        Format::Text => print!("{}", report.render_text()),
        Format::Json => println!("{}", report.render_json()?),
    }
    report.print_statistics();

    Ok(report.exit_code())
}

fn handle_mdbook(command: Option<MdbookCommand>) -> Result<i32> {
    let preprocessor = SnippetCheckPreprocessor::new();

    if let Some(MdbookCommand::Supports { renderer }) = command {
        return Ok(if preprocessor.supports_renderer(&renderer) {
            0
        } else {
            1
        });
    }

    let (ctx, book) = CmdPreprocessor::parse_input(io::stdin())?;
    // Configuration problems are fatal; only findings fail with 1.
    let checker = SnippetCheckPreprocessor::load_checker(&ctx)?;

    let runtime = tokio::runtime::Builder::new_current_thread().build()?;
    match runtime.block_on(preprocessor.check_book(checker, &ctx, book)) {
        Ok(processed_book) => {
            serde_json::to_writer(io::stdout(), &processed_book)?;
            Ok(0)
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            Ok(1)
        }
    }
}
