use anyhow::{Context, Result};
use clap::Parser;
use meeting_recorder::error::RecorderError;
use meeting_recorder::http::ActiveSession;
use meeting_recorder::{create_router, AppState, Config, NatsClient};
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "meeting-recorder")]
#[command(about = "Records multi-participant meeting audio into mixed WAV files")]
struct Args {
    /// Path to the config file, without extension
    #[arg(short, long, default_value = "config/meeting-recorder")]
    config: String,

    /// Listen address override, e.g. 0.0.0.0:9090
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config))?;

    let service_name = cfg.service.name.clone();
    info!("{} starting", service_name);

    let addr = args
        .bind
        .unwrap_or_else(|| format!("{}:{}", cfg.service.http.bind, cfg.service.http.port));

    let nats = NatsClient::connect(&cfg.nats.url).await?;
    let state = AppState::with_nats(cfg.recording, nats);

    let app = create_router(state.clone());
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind HTTP server to {}", addr))?;

    info!("HTTP server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Finalize anything still recording so no meeting is lost to a restart.
    let remaining: Vec<ActiveSession> = {
        let mut sessions = state.sessions.write().await;
        sessions.drain().map(|(_, active)| active).collect()
    };
    for active in remaining {
        let meeting_id = active.session.meeting_id().to_string();
        if let Some(bridge) = active.bridge {
            bridge.stop().await;
        }
        match active.session.stop().await {
            Ok(artifact) => info!(
                "Finalized meeting {} on shutdown: {:?}",
                meeting_id, artifact.path
            ),
            Err(RecorderError::NoAudioCaptured) => {
                info!("Meeting {} had no audio to finalize", meeting_id)
            }
            Err(e) => error!("Failed to finalize meeting {} on shutdown: {}", meeting_id, e),
        }
    }

    info!("{} shut down", service_name);
    Ok(())
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received SIGINT, shutting down"),
        () = terminate => info!("Received SIGTERM, shutting down"),
    }
}
