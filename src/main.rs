//! Pack calculator: service entry point.
//!
//! Startup sequence:
//!   1. Load .env (if present)
//!   2. Parse CLI args
//!   3. Load config
//!   4. Init logger once (CLI `-v` flags > `RUST_LOG` > config)
//!   5. Open the pack-size store and seed defaults if it is empty
//!   6. Spawn the Ctrl-C / SIGTERM shutdown watcher
//!   7. Serve HTTP until shutdown

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use pack_calculator::config::{self, Config};
use pack_calculator::error::AppError;
use pack_calculator::http::HttpServer;
use pack_calculator::logger;
use pack_calculator::pack::{PackSizeConfig, PackSizeSet};
use pack_calculator::shutdown;
use pack_calculator::store;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    // Load .env if present; the file is optional.
    let _ = dotenvy::dotenv();

    let args = match parse_cli_args(std::env::args().skip(1)) {
        Ok(Cli::Run(args)) => args,
        Ok(Cli::Help) => {
            print!("{USAGE}");
            return Ok(());
        }
        Err(msg) => {
            eprint!("error: {msg}\n\n{USAGE}");
            std::process::exit(2);
        }
    };
    let config = config::load(args.config_path.as_deref())?;

    let (level, prefer_level) = logger::effective_level(args.verbosity, &config.log_level);
    logger::init(level, prefer_level)?;

    info!(
        bind = %config.server.bind,
        configured_log_level = %config.log_level,
        effective_log_level = %level,
        max_amount = config.packs.limits.max_amount,
        "config loaded"
    );

    let store = store::open(&config.store)?;
    let packs = Arc::new(PackSizeConfig::open(
        store,
        &config.packs.defaults,
        config.packs.limits,
    )?);

    print_startup_summary(&config, &packs.get());

    let stop = CancellationToken::new();
    shutdown::spawn_watcher(stop.clone())?;

    HttpServer::new(config.server.bind.clone(), packs)
        .run(stop)
        .await
}

fn print_startup_summary(config: &Config, sizes: &PackSizeSet) {
    let sizes = sizes
        .as_slice()
        .iter()
        .map(u64::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    println!("pack-calculator {}", env!("CARGO_PKG_VERSION"));
    println!("  listen     : http://{}", config.server.bind);
    println!("  store      : {:?} ({})", config.store.backend, config.store.path.display());
    println!("  pack sizes : {sizes}");
}

const USAGE: &str = "\
Usage: pack-calculator [-f PATH] [-v...]

Serves the pack calculator JSON API until Ctrl-C or SIGTERM.

  -f, --config PATH   TOML config (default: config/default.toml when present)
  -v, --verbose       Raise log verbosity; repeat for warn, info, debug, trace
  -h, --help          Show this text
";

#[derive(Debug, PartialEq, Eq)]
enum Cli {
    Run(CliArgs),
    Help,
}

#[derive(Debug, Default, PartialEq, Eq)]
struct CliArgs {
    verbosity: u8,
    config_path: Option<String>,
}

fn parse_cli_args(args: impl IntoIterator<Item = String>) -> Result<Cli, String> {
    let mut parsed = CliArgs::default();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => return Ok(Cli::Help),
            "-f" | "--config" => {
                let path = args.next().ok_or_else(|| format!("{arg} needs a path"))?;
                parsed.config_path = Some(path);
            }
            "--verbose" => parsed.verbosity = parsed.verbosity.saturating_add(1),
            flag if flag.len() > 1 && flag.strip_prefix('-').is_some_and(|v| v.bytes().all(|b| b == b'v')) => {
                let count = u8::try_from(flag.len() - 1).unwrap_or(u8::MAX);
                parsed.verbosity = parsed.verbosity.saturating_add(count);
            }
            other => return Err(format!("unexpected argument '{other}'")),
        }
    }

    Ok(Cli::Run(parsed))
}
