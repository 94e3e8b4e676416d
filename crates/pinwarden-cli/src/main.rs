//! pinwarden - pin ガベージコレクタの運用 CLI
//!
//! 状態（upload、usage、directory、コンテンツサイズ）は JSON スナップショットから読み、
//! 状態を変えるコマンドの後に書き戻す。

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use pinwarden_core::app::{CollectOutcome, Engine, EngineBuilder};
use pinwarden_core::config::EngineConfig;
use pinwarden_core::impls::{
    FileAuditSink, InMemoryPinStore, LogMailer, StateSnapshot, StaticContentOracle,
};
use pinwarden_core::ports::UsageLedger;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pinwarden", about = "Pin lifecycle and garbage collection")]
struct Cli {
    /// Engine configuration (TOML). Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// JSON state snapshot
    #[arg(long, global = true, default_value = "pinwarden-state.json")]
    state: PathBuf,

    /// Debug-level logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one collection pass
    Collect,
    /// Audit what a collection pass would remove, without removing it
    CollectDry,
    /// Run the periodic collector until ctrl-c
    Serve,
    /// Build expiry reminders
    Remind {
        /// Look-ahead window in days (overrides config)
        #[arg(long)]
        days: Option<u32>,
        /// Hand the digests to the mailer instead of printing them
        #[arg(long)]
        send: bool,
    },
    /// Record a new pin for a user
    Pin {
        #[arg(long)]
        user: String,
        #[arg(long)]
        hash: String,
        /// Days until the pin becomes collectable
        #[arg(long, default_value = "30")]
        hold_days: u32,
    },
    /// Remove one pin owned by a user
    Refund {
        #[arg(long)]
        user: String,
        #[arg(long)]
        hash: String,
    },
}

fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

struct Backends {
    store: InMemoryPinStore,
    oracle: StaticContentOracle,
}

impl Backends {
    async fn load(path: &Path) -> anyhow::Result<Self> {
        let snapshot = if path.exists() {
            StateSnapshot::load(path)
                .await
                .with_context(|| format!("Failed to load state from {}", path.display()))?
        } else {
            tracing::warn!(path = %path.display(), "state file not found, starting empty");
            StateSnapshot::default()
        };
        let (store, oracle) = snapshot.into_backends().await;
        Ok(Self { store, oracle })
    }

    async fn save(&self, path: &Path) -> anyhow::Result<()> {
        StateSnapshot::capture(&self.store, &self.oracle)
            .await
            .save(path)
            .await
            .with_context(|| format!("Failed to save state to {}", path.display()))
    }

    fn engine(&self, config: EngineConfig) -> anyhow::Result<Engine> {
        let audit_dir = config.gc.audit_dir.clone();
        EngineBuilder::new()
            .config(config)
            .in_memory(self.store.clone())
            .oracle(Arc::new(self.oracle.clone()))
            .mailer(Arc::new(LogMailer))
            .audit(Arc::new(FileAuditSink::new(audit_dir)))
            .build()
            .context("Failed to build engine")
    }
}

fn print_outcome(outcome: &CollectOutcome) {
    match outcome {
        CollectOutcome::NothingExpired => println!("nothing expired"),
        CollectOutcome::ScanFailed(e) => println!("scan failed: {e}"),
        CollectOutcome::Collected {
            run,
            expired,
            report,
            audit_location,
        } => {
            println!(
                "run {run}: expired={expired} removed={} skipped={} anomalies={} bytes_debited={}",
                report.removed_count(),
                report.skipped.len(),
                report.anomalies(),
                report.bytes_debited(),
            );
            for skipped in &report.skipped {
                println!(
                    "  skipped {} ({}): {:?} {}",
                    skipped.upload.hash, skipped.upload.username, skipped.reason, skipped.detail
                );
            }
            println!("audit: {audit_location}");
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let config = EngineConfig::load(cli.config.as_deref()).context("Failed to load config")?;
    let backends = Backends::load(&cli.state).await?;
    let engine = backends.engine(config)?;

    match cli.command {
        Commands::Collect => {
            let mut collector = engine.collector();
            let outcome = collector.collect_once().await?;
            print_outcome(&outcome);
            backends.save(&cli.state).await?;
        }
        Commands::CollectDry => {
            let mut collector = engine.collector();
            let outcome = collector.collect_dry().await?;
            print_outcome(&outcome);
        }
        Commands::Serve => {
            let mut handle = engine.gc_loop()?.spawn();
            tracing::info!(
                interval_secs = engine.config().gc.interval_secs,
                "garbage collector running, ctrl-c to stop"
            );
            let finished = tokio::select! {
                signal = tokio::signal::ctrl_c() => {
                    signal.context("Failed to listen for ctrl-c")?;
                    None
                }
                result = handle.wait() => Some(result),
            };
            let removed = match finished {
                Some(result) => {
                    tracing::error!(status = ?handle.status(), "garbage collector stopped on its own");
                    result
                }
                None => handle.shutdown_and_join().await,
            };
            backends.save(&cli.state).await?;
            println!("removed {} uploads", removed?);
        }
        Commands::Remind { days, send } => {
            let window_days = days.unwrap_or(engine.config().reminder.window_days);
            let reminders = engine.reminders().remind(window_days).await?;
            if send {
                let report = engine.dispatcher().dispatch(&reminders).await;
                println!("sent {} reminders", report.sent.len());
                for (username, error) in &report.failed {
                    println!("  failed {username}: {error}");
                }
            } else {
                println!("{}", serde_json::to_string_pretty(&reminders)?);
            }
        }
        Commands::Pin {
            user,
            hash,
            hold_days,
        } => {
            let upload = engine.recorder().record(&user, &hash, hold_days).await?;
            backends.save(&cli.state).await?;
            println!("{}", serde_json::to_string_pretty(&upload)?);
        }
        Commands::Refund { user, hash } => {
            engine.refunds().remove_and_refund(&user, &hash).await?;
            backends.save(&cli.state).await?;
            match engine.ledger().find_usage(&user).await {
                Ok(usage) => println!("{}", serde_json::to_string_pretty(&usage)?),
                Err(e) => tracing::warn!(user = %user, error = %e, "no usage entry"),
            }
        }
    }

    Ok(())
}
