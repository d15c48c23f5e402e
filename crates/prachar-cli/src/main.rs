//! Prachar CLI - campaign poster for artisan products
//!
//! Main entry point for the `prachar` binary.

mod app;
mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use app::{exit_code_for, InitOptions, EXIT_PRECONDITION};
use commands::post::PostArgs;
use commands::preview::PreviewArgs;

/// Publish product campaigns to a Telegram channel as threaded posts
#[derive(Parser, Debug)]
#[command(name = "prachar", version, about)]
struct Cli {
    /// More diagnostic output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Configuration file (default: ~/.prachar/config.toml)
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Post a campaign: head media with caption, then replies to it
    Post(PostArgs),
    /// Show captions and detected media without posting
    Preview(PreviewArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() { EXIT_PRECONDITION } else { 0 };
            let _ = e.print();
            return ExitCode::from(code);
        }
    };

    match run(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(exit_code_for(&e))
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<u8> {
    let options = InitOptions::new(cli.config.clone(), cli.verbose);
    let mut ctx = app::initialize(&options)?;

    match cli.command {
        Commands::Post(args) => commands::post::run(&mut ctx, args).await,
        Commands::Preview(args) => {
            ctx.start_logging(None)?;
            commands::preview::run(&ctx, args).await
        }
    }
}
