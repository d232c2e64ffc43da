//! rentledger main entry point

use anyhow::Context;
use clap::Parser;
use rentledger_api::start_server;
use rentledger_config::Config;
use rentledger_core::{LogReminderSink, ManagerData, RentalManager};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;
use tokio::sync::RwLock;

#[derive(Parser, Debug)]
#[command(name = "rentledger")]
#[command(version = "0.1.0")]
#[command(about = "Rent schedules, payment matching and overdue tracking for property rentals", long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Print the default configuration and exit
    #[arg(long)]
    print_default_config: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.print_default_config {
        print!("{}", Config::generate_default());
        return Ok(());
    }

    let config = if args.config.exists() {
        Some(
            Config::load(args.config.clone())
                .with_context(|| format!("Failed to load configuration from {}", args.config.display()))?,
        )
    } else {
        None
    };
    let config_found = config.is_some();
    let config = config.unwrap_or_default();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(config.logging.level.as_str()))
        .init();

    if config_found {
        log::info!("Config loaded from {}", args.config.display());
    } else {
        log::warn!(
            "Config file {} not found, using defaults",
            args.config.display()
        );
    }

    let mut manager = RentalManager::new(config.clone()).context("Failed to build rental manager")?;
    if let Some(path) = &config.data.snapshot {
        if path.exists() {
            let data = ManagerData::load(path)
                .with_context(|| format!("Failed to load snapshot {}", path.display()))?;
            log::info!(
                "Snapshot loaded: {} contracts, {} payments",
                data.contracts.len(),
                data.payments.len()
            );
            manager = manager.with_data(data);
        } else {
            log::warn!("Snapshot file not found: {}", path.display());
        }
    }
    let manager = Arc::new(RwLock::new(manager));

    let rt = Runtime::new()?;
    rt.block_on(async {
        if config.scheduler.enable {
            tokio::spawn(run_scheduler(config.clone(), manager.clone()));
        }

        start_server(config.clone(), manager.clone()).await?;

        if let Some(path) = &config.data.snapshot {
            let json = manager.read().await.data().to_json()?;
            std::fs::write(path, json)
                .with_context(|| format!("Failed to write snapshot {}", path.display()))?;
            log::info!("Snapshot saved to {}", path.display());
        }
        Ok::<(), anyhow::Error>(())
    })
}

/// Run the overdue pass and reminders every `scheduler.interval_secs`
async fn run_scheduler(config: Config, manager: Arc<RwLock<RentalManager>>) {
    let mut ticker = tokio::time::interval(Duration::from_secs(config.scheduler.interval_secs));

    loop {
        ticker.tick().await;
        let today = chrono::Local::now().date_naive();
        let mut manager = manager.write().await;

        let overdue = manager.mark_overdue(today);
        if config.reminders.enable {
            let reminders = manager.send_reminders(today, &LogReminderSink);
            log::debug!(
                "Scheduled run for {}: {} rows marked overdue, {} reminders sent",
                today,
                overdue.rows_marked,
                reminders.sent
            );
        }
    }
}
