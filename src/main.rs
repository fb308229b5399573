use clap::{Parser, Subcommand};
use identicon::{Identicon, IdenticonError, ServerConfig, ServerError, server};
use rayon::prelude::*;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::EnvFilter;

const WELCOME_SIGNATURE: &str = r#"
Usage of Identicon
_______________________________
	< Identicon >
-------------------------------

--name string:
	Set the name where you want to generate a identicon for

serve:
	Serve identicons over HTTP at /identicon/generate?name=<name>
"#;

const CREATE_FAILED: &str = "error: failed creating file for output png";
const WRITE_FAILED: &str = "error: failed writing image to file";

#[derive(Parser)]
#[command(name = "identicon")]
#[command(version)]
#[command(about = "Generate deterministic identicons from names", long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    /// Set the name where you want to generate a identicon for (repeatable)
    #[arg(short, long = "name", value_name = "NAME")]
    names: Vec<String>,

    /// Directory the <name>.png files are written to
    #[arg(short, long, default_value = ".")]
    out_dir: PathBuf,

    /// Print a JSON summary of every generated identicon
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve identicons over HTTP
    Serve {
        /// Address to listen on [env: IDENTICON_HOST]
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on [env: PORT]
        #[arg(short, long)]
        port: Option<u16>,

        /// Number of runtime worker threads [env: IDENTICON_WORKERS]
        #[arg(short, long)]
        workers: Option<usize>,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging();

    match cli.command {
        Some(Commands::Serve { host, port, workers }) => match serve(host, port, workers) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                error!("failed listening to web server because {}", e);
                ExitCode::FAILURE
            }
        },
        None => {
            let names = requested_names(cli.names);
            if names.is_empty() {
                println!("{}", WELCOME_SIGNATURE);
                return ExitCode::SUCCESS;
            }
            let failures = generate_all(&names, &cli.out_dir, cli.json, &mut io::stdout().lock());
            if failures == 0 { ExitCode::SUCCESS } else { ExitCode::FAILURE }
        }
    }
}

fn serve(
    host: Option<String>,
    port: Option<u16>,
    workers: Option<usize>,
) -> Result<(), ServerError> {
    let mut config = ServerConfig::from_env()?;
    if let Some(host) = host {
        config.host = host;
    }
    if let Some(port) = port {
        config.port = port;
    }
    if let Some(workers) = workers {
        config.workers = workers.max(1);
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.workers)
        .enable_all()
        .build()?;
    runtime.block_on(server::run(&config))
}

/// Drops empty names; an empty result means the usage banner is shown instead.
fn requested_names(names: Vec<String>) -> Vec<String> {
    names.into_iter().filter(|n| !n.is_empty()).collect()
}

fn diagnostic(e: &IdenticonError) -> &'static str {
    if e.is_create_failure() { CREATE_FAILED } else { WRITE_FAILED }
}

/// Renders every name in parallel and reports on `out` once all were tried.
///
/// Returns the number of names that could not be written.
fn generate_all<W: Write>(names: &[String], out_dir: &Path, json: bool, out: &mut W) -> usize {
    let results: Vec<Result<Identicon, IdenticonError>> = names
        .par_iter()
        .map(|name| {
            let identicon = Identicon::new(name);
            identicon.save(out_dir).map(|_| identicon)
        })
        .collect();

    let mut failures = 0;
    for result in results {
        let line = match result {
            Ok(identicon) if json => match serde_json::to_string_pretty(&identicon) {
                Ok(summary) => summary,
                Err(e) => {
                    error!(name = identicon.name(), error = %e, "failed serializing summary");
                    continue;
                }
            },
            Ok(_) => continue,
            Err(e) => {
                failures += 1;
                error!(error = %e, "identicon not written");
                diagnostic(&e).to_owned()
            }
        };
        if let Err(e) = writeln!(out, "{}", line) {
            error!(error = %e, "failed writing to stdout");
        }
    }
    failures
}
