//! huginnd: the Huginn daemon.
//!
//! Serves the render-caching proxy over HTTP.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, warn};

use huginn::server::config::{CacheBackendKind, Config, Secrets};
use huginn::server::{HttpState, build_router};
use huginn::{
    AccessGate, CacheStore, ChallengeVerifier, FetchLauncher, Huginn, HuginnError, MemoryStore,
    OpenGate, RenderProxy, RendererPool, TokenGate, TokenSigner,
};

/// Huginn daemon: render-caching proxy service.
#[derive(Parser)]
#[command(name = "huginnd")]
#[command(version = huginn::PKG_VERSION)]
#[command(about = "Huginn render-caching proxy daemon")]
struct Args {
    /// Path to configuration file.
    #[arg(short, long, env = "HUGINN_CONFIG")]
    config: Option<std::path::PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = Config::load(args.config.as_deref())?;
    let secrets = Secrets::load()?.with_env_fallbacks(|name| std::env::var(name).ok());
    huginn::telemetry::init(&config.logging)?;

    let addr: SocketAddr = config
        .server
        .address
        .parse()
        .map_err(|e| HuginnError::Configuration(format!("Invalid address: {e}")))?;

    let pool = Arc::new(RendererPool::new(
        Arc::new(FetchLauncher::new(&config.renderer.user_agent)),
        config.renderer.pool_config(config.server.debug),
    ));
    let proxy = build_proxy(&config, &secrets, pool.clone())?;

    let router = build_router(HttpState::new(Arc::new(proxy)).debug(config.server.debug));
    let listener = TcpListener::bind(addr).await?;

    info!(
        version = huginn::version_string(),
        built = huginn::version::BUILD_TIMESTAMP,
        %addr,
        "huginnd starting"
    );

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    pool.close().await;
    info!("huginnd stopped");
    Ok(())
}

/// Assemble the orchestrator from configuration.
fn build_proxy(
    config: &Config,
    secrets: &Secrets,
    pool: Arc<RendererPool>,
) -> Result<RenderProxy, HuginnError> {
    Huginn::builder()
        .renderer(pool)
        .cache(config.cache.cache_config())
        .cache_store(build_store(config, secrets)?)
        .access_gate(build_gate(config, secrets)?)
        .build()
}

fn build_store(config: &Config, secrets: &Secrets) -> Result<Arc<dyn CacheStore>, HuginnError> {
    match config.cache.backend {
        CacheBackendKind::Memory => Ok(Arc::new(MemoryStore::new(config.cache.max_entries))),
        #[cfg(feature = "redis")]
        CacheBackendKind::Redis => {
            let password = secrets.redis_password();
            let store = huginn::RedisStore::new(&config.cache.redis_url, password.as_deref())?;
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "redis"))]
        CacheBackendKind::Redis => {
            let _ = secrets;
            Err(HuginnError::Configuration(
                "cache.backend = \"redis\" requires the `redis` feature".to_string(),
            ))
        }
    }
}

fn build_gate(config: &Config, secrets: &Secrets) -> Result<Arc<dyn AccessGate>, HuginnError> {
    let Some(token_secret) = secrets.token_secret() else {
        warn!("no token secret configured, every cache miss is admitted");
        return Ok(Arc::new(OpenGate));
    };

    let signer =
        TokenSigner::new(token_secret)?.ttl(Duration::from_secs(config.access.token_ttl_secs));
    let mut gate = TokenGate::new(signer);
    match secrets.challenge_secret() {
        Some(challenge_secret) => {
            gate = gate.with_challenge(ChallengeVerifier::with_verify_url(
                challenge_secret,
                &config.access.challenge_verify_url,
            ));
        }
        None => warn!("no challenge secret configured, only session tokens are accepted"),
    }
    Ok(Arc::new(gate))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("shutdown signal received, draining connections");
}
