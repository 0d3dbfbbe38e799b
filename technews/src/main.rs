/*
technews - weekly tech news digest
Collects the week's articles from NewsAPI, summarizes them with Gemini and
posts the digest to a Telegram chat, either once or on a cron schedule.
*/

use clap::Parser;
use common::Config;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use technews::agent::NewsAgent;
use technews::llm::gemini::GeminiProvider;
use technews::llm::LlmProvider;
use technews::schedule::CronSchedule;
use technews::worker::run_scheduled;

#[derive(Parser, Debug)]
#[command(name = "technews", about = "Weekly tech news digest: NewsAPI -> Gemini -> Telegram")]
struct Args {
    /// Run the pipeline once and exit
    #[arg(long, conflicts_with_all = ["test_connection", "list_models"])]
    test: bool,

    /// Send a test message to Telegram and exit
    #[arg(long, conflicts_with = "list_models")]
    test_connection: bool,

    /// Print the Gemini models available to the API key and exit
    #[arg(long)]
    list_models: bool,

    /// Path to config.toml
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override log level (info, debug, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    // A missing .env file is fine; the variables may come from the shell.
    dotenv::dotenv().ok();

    let config_path = if let Some(p) = args.config {
        if !p.exists() {
            error!(path = ?p, "specified config file not found");
            return Err(anyhow::anyhow!("Config file not found: {}", p.display()));
        }
        Some(p)
    } else {
        let p = PathBuf::from("config.toml");
        if p.exists() {
            Some(p)
        } else {
            None
        }
    };

    if args.list_models {
        return list_models(config_path.as_deref()).await;
    }

    let config = match Config::load(config_path.as_deref()).await {
        Ok(cfg) => cfg,
        Err(e) => {
            error!(%e, "failed to load configuration");
            return Err(e.into());
        }
    };
    let schedule = match CronSchedule::from_config(&config) {
        Ok(schedule) => schedule,
        Err(e) => {
            error!(%e, "invalid schedule");
            return Err(e.into());
        }
    };
    info!(path = ?config_path, "configuration loaded");

    let agent = match NewsAgent::from_config(&config).await {
        Ok(agent) => agent,
        Err(e) => {
            error!(%e, "failed to create news agent");
            return Err(e.into());
        }
    };

    if args.test_connection {
        agent.test_connection().await?;
        return Ok(());
    }

    if args.test {
        info!("Running in test mode (single execution)");
        let report = agent.run().await?;
        info!(
            articles = report.articles,
            mock = report.used_mock_data,
            "test run complete"
        );
        return Ok(());
    }

    info!("Tech News Agent started with schedule {:?}", config.cron_schedule);

    let shutdown_notify = Arc::new(Notify::new());
    let signal_notify = shutdown_notify.clone();
    tokio::spawn(async move {
        wait_for_signal().await;
        info!("shutdown signal received, stopping scheduler");
        // notify_one stores a permit if the scheduler is mid-iteration
        signal_notify.notify_one();
    });

    run_scheduled(&agent, &schedule, shutdown_notify).await?;

    info!("Shutdown complete");
    Ok(())
}

/// Only the Gemini settings are needed to list models.
async fn list_models(config_path: Option<&Path>) -> anyhow::Result<()> {
    let config = Config::load_unvalidated(config_path).await?;
    config.validate_gemini()?;

    let provider = GeminiProvider::from_config(&config);
    let models = provider.list_models().await?;
    println!("Available models ({}):", models.len());
    for model in models {
        println!("  {} [{}]", model.name, model.supported_methods.join(", "));
    }
    Ok(())
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {},
                _ = term.recv() => {},
            }
        }
        Err(e) => {
            error!(%e, "failed to install SIGTERM handler");
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
