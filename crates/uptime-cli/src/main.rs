mod config;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use clap::{Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::{fmt, EnvFilter};

use uptime_core::{
    build_alert_client, classify, format_duration, run_all, HttpProber, NtfyClient,
    PagerDutyClient, Prober, ServiceConfig, Watcher,
};

/// HTTP(S) uptime monitor with incident and push-notification alerting.
#[derive(Parser)]
#[command(name = "uptime-monitor", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch every configured service until interrupted.
    Run {
        /// Path to the services file (.json array or TOML).
        #[arg(short, long, default_value = "services.json")]
        config: PathBuf,
    },
    /// Probe a single URL once and print its status.
    Check {
        /// URL to probe.
        url: String,

        /// Request timeout in seconds (0 uses the default).
        #[arg(long, default_value_t = 10)]
        timeout: u64,

        /// Print the status as JSON instead of a styled line.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config } => run_services(config).await,
        Commands::Check { url, timeout, json } => {
            fmt()
                .with_env_filter(
                    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
                )
                .init();
            run_check(url, timeout, json).await
        }
    }
}

async fn run_services(config_path: PathBuf) -> ExitCode {
    let app_config = match config::AppConfig::load(&config_path) {
        Ok(c) => {
            init_tracing(&c.settings.log_format);
            tracing::info!(path = %config_path.display(), services = c.service.len(), "Loaded config file");
            c
        }
        Err(e) => {
            init_tracing("pretty");
            tracing::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let client = match build_alert_client() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "Failed to build alert client");
            return ExitCode::FAILURE;
        }
    };

    let incidents = Arc::new(
        PagerDutyClient::new(client.clone()).with_endpoint(&app_config.channels.pagerduty_endpoint),
    );
    let notifications =
        Arc::new(NtfyClient::new(client).with_base(&app_config.channels.ntfy_base));

    let mut watchers = Vec::new();
    for service in app_config.to_service_configs() {
        let url = service.url.clone();
        match Watcher::with_http_prober(service, incidents.clone(), notifications.clone()) {
            Ok(w) => watchers.push(w),
            Err(e) => {
                tracing::error!(url = %url, error = %e, "Failed to set up service watcher");
                return ExitCode::FAILURE;
            }
        }
    }

    tokio::select! {
        _ = run_all(watchers) => {
            tracing::error!("All service watchers stopped");
            ExitCode::FAILURE
        }
        _ = shutdown_signal() => {
            tracing::info!("Shutdown signal received, stopping");
            ExitCode::SUCCESS
        }
    }
}

/// One-shot service settings; a zero timeout falls back to the default like in config files.
fn check_config(url: &str, timeout_secs: u64) -> ServiceConfig {
    ServiceConfig::new(url).with_timeout(Duration::from_secs(timeout_secs))
}

async fn run_check(url: String, timeout_secs: u64, json: bool) -> ExitCode {
    let service = check_config(&url, timeout_secs);
    let timeout = service.timeout;
    let prober = match HttpProber::new(timeout) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("{} {}", style("error:").red().bold(), e);
            return ExitCode::FAILURE;
        }
    };

    let spinner = if json {
        ProgressBar::hidden()
    } else {
        let bar = ProgressBar::new_spinner();
        if let Ok(s) = ProgressStyle::with_template("{spinner} {msg}") {
            bar.set_style(s);
        }
        bar.set_message(format!(
            "Probing {} (timeout {})",
            style(&url).bold(),
            format_duration(timeout)
        ));
        bar.enable_steady_tick(Duration::from_millis(100));
        bar
    };

    let outcome = prober.probe(&url).await;
    spinner.finish_and_clear();

    let status = classify(&outcome, &service.certificates, Utc::now());

    if json {
        match serde_json::to_string(&status) {
            Ok(s) => println!("{s}"),
            Err(e) => {
                eprintln!("{} {}", style("error:").red().bold(), e);
                return ExitCode::FAILURE;
            }
        }
    } else {
        let symbol = if status.bad {
            style(status.symbol()).red().bold()
        } else {
            style(status.symbol()).green().bold()
        };
        println!("{} {} {}", symbol, style(&url).bold(), status.message);

        if let Ok(response) = &outcome {
            for cert in &response.certificates {
                println!(
                    "  {} {}  {} {}",
                    style("cert:").dim(),
                    cert.subject,
                    style("expires").dim(),
                    cert.not_after.format("%Y-%m-%d %H:%M UTC")
                );
            }
        }
    }

    if status.bad {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn init_tracing(log_format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match log_format {
        "json" => {
            fmt().with_env_filter(filter).json().init();
        }
        _ => {
            fmt().with_env_filter(filter).init();
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
