use anyhow::Result;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;
use trafficd::*;

#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .init();

    let app_config = config::AppConfig::load()?;

    let store = Arc::new(stats_store::StatsStore::new());
    let history_repo = Arc::new(history_repo::HistoryRepo::connect(&app_config.database.path).await?);
    history_repo.init().await?;

    // Capture failure is contained in its task; the rest keeps running.
    if app_config.capture.enabled {
        let engine = capture::CaptureEngine::new(app_config.port_registry(), store.clone());
        capture::spawn(app_config.capture.interface.clone(), engine);
    } else {
        tracing::info!("packet capture disabled by config");
    }

    let docker_repo = match docker_repo::DockerRepo::connect() {
        Ok(r) => r,
        Err(e) => {
            tracing::warn!(error = %e, "Docker unavailable at startup; will retry each polling cycle");
            docker_repo::DockerRepo::new()
        }
    };
    poller::spawn(
        poller::CounterPoller::new(docker_repo, store.clone()),
        app_config.polling.interval_secs,
    );
    archiver::spawn(
        archiver::HistoryArchiver::new(store.clone(), history_repo.clone()),
        app_config.archive.interval_secs,
    );
    stats_store::spawn_speed_sampler(store.clone(), app_config.speed.sample_interval_secs);

    let app = routes::app(store, history_repo);
    let addr = format!("{}:{}", app_config.server.host, app_config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("Received shutdown signal");
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(s) => s,
                Err(_) => {
                    let _ = tokio::signal::ctrl_c().await;
                    return;
                }
            };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
