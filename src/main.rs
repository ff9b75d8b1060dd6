use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use reflink::{commands, diagnostics, watch};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "reflink", about = "Turn issue, merge request and label references in HTML into links")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Config file to use instead of ./.reflink.toml
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the records an HTML file references, as JSON
    Refs {
        /// Input file
        file: PathBuf,
    },
    /// Render an HTML file, or every .html file under a directory
    Render {
        /// Input file or directory
        path: PathBuf,
        /// Print the render result as JSON instead of HTML
        #[arg(long)]
        json: bool,
        /// Write output here instead of stdout (required for directories)
        #[arg(long, value_name = "DIR")]
        out_dir: Option<PathBuf>,
    },
    /// Re-render a file whenever it, the config or the store changes
    Watch {
        /// Input file
        file: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| return EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let config = cli.config.as_deref();
    let result = match &cli.command {
        Commands::Refs { file } => commands::refs(file, config),
        Commands::Render { path, json, out_dir } => commands::render(path, *json, out_dir.as_deref(), config),
        Commands::Watch { file } => watch::run(file, config),
    };

    return match result {
        Ok(code) => code,
        Err(e) => {
            diagnostics::print_error(&e);
            ExitCode::FAILURE
        },
    };
}
