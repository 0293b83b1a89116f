mod handlers;
mod protocol;
mod server;

use std::sync::Arc;

use agentprobe_core::config::AgentDefaults;
use agentprobe_core::http::HttpClient;
use anyhow::Context;
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

/// Listener settings, read from `AGENTPROBE_*` variables.
#[derive(Debug, Deserialize)]
struct ServerSettings {
    #[serde(default = "default_bind")]
    bind: String,
}

fn default_bind() -> String {
    "0.0.0.0:3000".to_string()
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if tracing_subscriber::fmt().with_env_filter(filter).try_init().is_err() {
        tracing::debug!("global tracing subscriber already set");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let settings: ServerSettings =
        envy::prefixed("AGENTPROBE_").from_env().context("reading AGENTPROBE_* settings")?;
    let defaults = AgentDefaults::from_env().context("reading agent defaults")?;
    let client = HttpClient::new().context("building HTTP client")?;

    let state = Arc::new(server::AppState::new(client, defaults));
    let app = server::router(state);

    let listener = tokio::net::TcpListener::bind(&settings.bind)
        .await
        .with_context(|| format!("binding {}", settings.bind))?;
    tracing::info!("agentprobe server listening on {}", settings.bind);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
