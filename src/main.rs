//! # beacon
//!
//! Command-line client for the live field binding engine. `watch` follows a
//! server's event stream, `replay` runs recorded messages offline, and
//! `check-page` reports which bound fields a page's markup provides.

#![deny(unsafe_code)]

mod page;
mod replay;
mod watch;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use beacon_core::{BindingTable, Dispatcher, FieldBoard, TracingSink};
use beacon_settings::BeaconSettings;
use beacon_stream::{CloseReason, StreamConnector};
use beacon_telemetry::{init_telemetry, TelemetryConfig};
use clap::{Parser, Subcommand};
use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;

use crate::replay::replay_lines;
use crate::watch::{stream_config, BoardHandler};

/// Live field binding client for server-sent event streams.
#[derive(Parser, Debug)]
#[command(name = "beacon", version, about)]
struct Cli {
    /// Settings file (defaults to `~/.beacon/settings.json`).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level (overrides settings; `RUST_LOG` still wins).
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Log format: `pretty` or `json`.
    #[arg(long, global = true)]
    log_format: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Connect to `<url>/events` and project updates onto the page fields.
    Watch {
        /// Server base URL (overrides settings).
        #[arg(long)]
        url: Option<String>,

        /// Page markup whose fields should be tracked.
        #[arg(long)]
        page: Option<PathBuf>,
    },

    /// Dispatch newline-delimited raw messages from a file or stdin.
    Replay {
        /// Input file, `-` for stdin.
        #[arg(default_value = "-")]
        input: PathBuf,

        /// Page markup whose fields should be tracked.
        #[arg(long)]
        page: Option<PathBuf>,

        /// Exit with status 1 if any message was rejected.
        #[arg(long)]
        strict: bool,
    },

    /// Report which bound fields a page provides.
    CheckPage {
        /// Page markup file.
        page: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let settings = load_settings(&cli)?;
    let telemetry = TelemetryConfig::from_names(&settings.logging.level, &settings.logging.format)
        .context("invalid logging settings")?;
    init_telemetry(&telemetry).context("failed to initialize logging")?;

    match cli.command {
        Command::Watch { page, .. } => run_watch(&settings, page.as_deref()).await,
        Command::Replay {
            input,
            page,
            strict,
        } => run_replay(&input, page.as_deref(), strict).await,
        Command::CheckPage { page } => run_check_page(&page),
    }
}

fn load_settings(cli: &Cli) -> Result<BeaconSettings> {
    let mut settings = match &cli.config {
        Some(path) => {
            if !path.exists() {
                bail!("settings file not found: {}", path.display());
            }
            beacon_settings::load_settings_from_path(path)
                .with_context(|| format!("failed to load settings: {}", path.display()))?
        }
        None => beacon_settings::load_settings().context("failed to load settings")?,
    };

    if let Some(level) = &cli.log_level {
        settings.logging.level.clone_from(level);
    }
    if let Some(format) = &cli.log_format {
        settings.logging.format.clone_from(format);
    }
    if let Command::Watch { url: Some(url), .. } = &cli.command {
        settings.stream.url.clone_from(url);
    }

    settings.validate().context("invalid settings")?;
    Ok(settings)
}

fn initial_board(table: &BindingTable, page: Option<&Path>) -> Result<FieldBoard> {
    match page {
        Some(path) => {
            let scan = page::load_page(path, table)?;
            for selector in &scan.missing {
                tracing::warn!(selector, page = %path.display(), "page has no element for bound field");
            }
            Ok(scan.to_board())
        }
        None => Ok(FieldBoard::from_table(table)),
    }
}

async fn run_watch(settings: &BeaconSettings, page: Option<&Path>) -> Result<ExitCode> {
    let dispatcher = Dispatcher::new(TracingSink);
    let board = initial_board(dispatcher.table(), page)?;
    let mut handler = BoardHandler::new(dispatcher, board);

    let config = stream_config(&settings.stream);
    let mut connector = StreamConnector::new(config)
        .with_context(|| format!("cannot connect to {}", settings.stream.url))?;

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    let _signal = tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("shutting down");
                shutdown.cancel();
            }
            Err(e) => tracing::warn!(error = %e, "failed to listen for ctrl-c"),
        }
    });

    let reason = connector.run(&mut handler, &cancel).await;

    print!("{}", handler.board());
    tracing::info!(
        applied = handler.applied(),
        dropped = handler.dropped(),
        transport_errors = handler.transport_errors(),
        "watch finished"
    );

    Ok(match reason {
        CloseReason::Cancelled | CloseReason::ServerClosed => ExitCode::SUCCESS,
        CloseReason::RetriesExhausted => ExitCode::FAILURE,
    })
}

async fn run_replay(input: &Path, page: Option<&Path>, strict: bool) -> Result<ExitCode> {
    let mut board = initial_board(&BindingTable::builtin(), page)?;

    let summary = if input == Path::new("-") {
        replay_lines(BufReader::new(tokio::io::stdin()), TracingSink, &mut board)
            .await
            .context("failed to read stdin")?
    } else {
        let file = tokio::fs::File::open(input)
            .await
            .with_context(|| format!("failed to open {}", input.display()))?;
        replay_lines(BufReader::new(file), TracingSink, &mut board)
            .await
            .with_context(|| format!("failed to read {}", input.display()))?
    };

    print!("{board}");
    println!("{summary}");

    Ok(if strict && summary.failed() > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn run_check_page(path: &Path) -> Result<ExitCode> {
    let scan = page::load_page(path, &BindingTable::builtin())?;

    for (selector, text) in &scan.present {
        println!("ok       {selector}  {text:?}");
    }
    for selector in &scan.missing {
        println!("missing  {selector}");
    }

    Ok(if scan.is_complete() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
