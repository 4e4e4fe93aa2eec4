use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use archadvisor_core::{KvBackend, MemoryBackend, RedisBackend, Settings};
use archadvisor_server::{serve, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let logs_dir = std::env::var_os("LOGS_DIR").map(PathBuf::from);
    let _log_guard = archadvisor_observability::init_logging(logs_dir.as_deref())?;

    let settings = Settings::from_env();

    let backend: Arc<dyn KvBackend> = match RedisBackend::connect(&settings.redis_url).await {
        Ok(backend) => {
            tracing::info!(url = %settings.redis_url, "redis_connected");
            Arc::new(backend)
        }
        Err(err) => {
            // Sessions survive only for this process's lifetime without Redis.
            tracing::warn!(error = %err, "redis unavailable; using in-memory session store");
            Arc::new(MemoryBackend::new())
        }
    };

    let addr: SocketAddr = format!("{}:{}", settings.host, settings.port).parse()?;
    let state = AppState::new(backend, settings);

    tracing::info!(%addr, "archadvisor_starting");
    serve(addr, state).await
}
