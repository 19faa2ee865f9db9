//! Corpus Translator - batch translation worker
//!
//! Start one process per GPU / model replica with the same input folder and
//! worker count and a distinct worker index. Each process:
//! - Translates its own contiguous shard of the folder
//! - Optionally serves health/progress/metrics endpoints
//! - Optionally writes a JSON run report

use anyhow::{Context, Result};
use clap::Parser;
use corpus_translator::backend::OpenAiClient;
use corpus_translator::config::{Cli, LogFormat, TranslatorConfig};
use corpus_translator::corpus::discover_inputs;
use corpus_translator::health::{self, AppState};
use corpus_translator::metrics::TranslatorMetrics;
use corpus_translator::report::{unix_millis, RunReport};
use corpus_translator::shard::ShardWorker;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration first to get log level
    let config = TranslatorConfig::load(&cli).context("Failed to load configuration")?;
    init_tracing(&config)?;

    let assignment = config.assignment()?;
    let profile = config.resolved_profile()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        worker_index = assignment.worker_index(),
        worker_count = assignment.worker_count(),
        profile = %config.profile,
        model = %config.backend.model,
        input_dir = %config.input_dir.display(),
        "Starting corpus translator"
    );

    let all_files = discover_inputs(&config.input_dir, &config.discovery)
        .await
        .context("Failed to list input files")?;
    let sink = config.sink()?;
    sink.check_targets(&all_files)
        .context("Input files collide on their output paths")?;

    let shard = assignment.range(all_files.len());
    let files = assignment.select(&all_files).to_vec();

    info!(
        files_found = all_files.len(),
        shard_start = shard.start,
        shard_end = shard.end,
        shard_files = files.len(),
        "Shard selected"
    );

    if cli.dry_run {
        for file in &files {
            println!("{}", file.display());
        }
        return Ok(());
    }

    // Only a served /metrics endpoint needs the global recorder
    let metrics = Arc::new(if config.http_port.is_some() {
        TranslatorMetrics::install()?
    } else {
        TranslatorMetrics::disabled()
    });

    let client = OpenAiClient::new(&config.backend)?;
    match client.list_models().await {
        Ok(models) if models.iter().any(|m| m == client.model()) => {
            info!(endpoint = client.endpoint(), model = client.model(), "Backend serves configured model");
        }
        Ok(models) => {
            warn!(model = client.model(), available = ?models, "Configured model not listed by backend");
        }
        Err(e) => {
            warn!(endpoint = client.endpoint(), error = %e.with_sources(), "Backend preflight failed");
        }
    }

    sink.prepare().await.context("Failed to prepare output location")?;

    let worker = ShardWorker::new(
        assignment,
        files,
        Arc::new(client),
        profile,
        sink,
        Arc::clone(&metrics),
    )
    .with_batch_size(config.max_batch_size)
    .with_trim(config.discovery.trim);

    let state = worker.state();

    // Start health server
    if let Some(port) = config.http_port {
        let app = health::router(AppState {
            shard_state: state.clone(),
            metrics: Arc::clone(&metrics),
        });
        let addr: SocketAddr = ([0, 0, 0, 0], port).into();
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind HTTP port {port}"))?;

        info!(port, "Starting HTTP server");
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                error!(error = %e, "HTTP server error");
            }
        });
    }

    let shutdown = worker.shutdown_handle();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Shutdown signal received, finishing current batch");
        let _ = shutdown.send(());
    });

    let started_at = unix_millis();
    let counts = worker.run().await;

    if let Some(ref path) = config.report_path {
        let report = RunReport::from_state(&state, &config.profile, &config.backend.model, started_at);
        report.write(path).await.context("Failed to write run report")?;
        info!(path = %path.display(), run_id = %report.run_id, "Run report written");
    }

    let unfinished = counts.unfinished();
    if unfinished > 0 {
        anyhow::bail!("{} of {} files failed", unfinished, counts.files_total);
    }
    if counts.pending > 0 {
        anyhow::bail!("interrupted with {} files not started", counts.pending);
    }

    info!(translated = counts.translated, "Translation complete");
    Ok(())
}

/// Initialize tracing with configured log level and format
fn init_tracing(config: &TranslatorConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(format!("corpus_translator={}", config.log_level).parse()?)
        .add_directive("reqwest=warn".parse()?)
        .add_directive("hyper=warn".parse()?);

    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    match config.log_format {
        LogFormat::Json => subscriber.json().init(),
        LogFormat::Text => subscriber.init(),
    }
    Ok(())
}

/// Wait for shutdown signal (SIGTERM or SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
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
