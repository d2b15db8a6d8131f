use killroom::prelude::*;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), KillroomError> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = ServerConfig::from_env()?;
    let server = KillroomServer::builder()
        .config(config)
        .build(MemoryStore::new())
        .await?;

    tracing::info!(
        http = %server.http_addr()?,
        events = %server.events_addr()?,
        "ready"
    );
    server.run().await
}
