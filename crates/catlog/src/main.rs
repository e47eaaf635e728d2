mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use tokio::io::AsyncBufReadExt;
use tracing::{info, warn};

use catlog::{config, Level, LogRecord, LoggerFactory, Loggers};

use crate::cli::{Cli, Command};

/// One line of stdin input.
#[derive(Debug, Deserialize)]
struct InputLine {
    logger: String,
    level: Level,
    #[serde(flatten)]
    record: LogRecord,
}

/// Parse one input line and hand it to its logger. Bad input is reported and
/// skipped; it never stops the loop.
fn handle_line(loggers: &Loggers, line: &str) {
    if line.trim().is_empty() {
        return;
    }

    let input: InputLine = match serde_json::from_str(line) {
        Ok(input) => input,
        Err(err) => {
            warn!(%err, "skipping malformed input line");
            return;
        }
    };

    let Some(logger) = loggers.get(&input.logger) else {
        warn!(logger = %input.logger, "skipping entry for unknown logger");
        return;
    };

    if let Err(err) = logger.log(input.level, input.record) {
        warn!(
            logger = %err.logger,
            level = %err.level,
            missing = ?err.missing,
            "entry rejected"
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Parse CLI args.
    let cli = Cli::parse();

    // 2. Load config, then merge CLI overrides.
    let mut cfg = config::load(&cli.config)?;

    if let Some(ref schema) = cli.schema {
        cfg.schema_file = schema.clone();
    }
    if let Some(ref root) = cli.log_root {
        cfg.transport.log_root = root.clone();
    }

    // 3. Init tracing-subscriber with JSON format. Stdout belongs to the
    //    console transport, so diagnostics go to stderr.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cfg.logging.level));

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    info!(
        config_file = %cli.config.display(),
        schema_file = %cfg.schema_file.display(),
        log_root = %cfg.transport.log_root.display(),
        "catlog starting"
    );

    // 4. Load the schema. Any configuration error is fatal.
    let schema = log_schema::loader::load_schema(&cfg.schema_file)
        .with_context(|| format!("failed to load schema {}", cfg.schema_file.display()))?;

    let factory = LoggerFactory::new(cfg.transport.clone());

    // `check` validates only; it opens no files and spawns no workers.
    if cli.command == Some(Command::Check) {
        factory.check(&schema).context("invalid configuration")?;
        println!(
            "ok: {} logger(s), {} target(s) per category",
            schema.len(),
            cfg.transport.targets.len()
        );
        return Ok(());
    }

    // 5. Build loggers.
    let loggers = factory.build(&schema).context("failed to build loggers")?;

    // 6. Set up shutdown signal (ctrl_c + SIGTERM).
    let (shutdown_tx, mut shutdown_rx) = tokio::sync::broadcast::channel::<()>(1);

    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            let mut sigterm =
                tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                    .expect("failed to register SIGTERM handler");

            tokio::select! {
                _ = ctrl_c => {
                    info!("received SIGINT (ctrl-c)");
                }
                _ = sigterm.recv() => {
                    info!("received SIGTERM");
                }
            }
        }

        #[cfg(not(unix))]
        {
            ctrl_c.await.ok();
            info!("received SIGINT (ctrl-c)");
        }

        let _ = shutdown_tx.send(());
    });

    // 7. Feed stdin through the loggers until EOF or a signal.
    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    let mut processed: u64 = 0;

    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    handle_line(&loggers, &line);
                    processed += 1;
                }
                Ok(None) => {
                    info!("stdin closed");
                    break;
                }
                Err(err) => {
                    warn!(%err, "failed to read stdin");
                    break;
                }
            },
            _ = shutdown_rx.recv() => break,
        }
    }

    // 8. Drain buffered targets.
    info!(lines = processed, "catlog shutting down");

    loggers
        .shutdown(cfg.shutdown_timeout())
        .await
        .context("failed to drain flush workers")?;

    Ok(())
}
