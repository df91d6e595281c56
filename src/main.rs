//! Trifecta Gate - request-time policy gate for AI agent tool calls
//!
//! Enforces the Rule of Two: a session may hold any two of the three
//! lethal-trifecta conditions (private data, untrusted content,
//! exfiltration vector); the call that would complete the third is blocked.

mod api;
mod audit;
mod gate;
mod policy;
mod registry;
mod store;

use api::{create_router, AppState};
use audit::{AuditSink, JsonlAuditSink, LogAuditSink};
use gate::Gate;
use registry::ToolRegistry;
use std::net::SocketAddr;
use std::sync::Arc;
use store::MemorySessionStore;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "trifecta_gate=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let port: u16 = std::env::var("GATE_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    // Tool registry: malformed data here is fatal, the process must not
    // serve traffic with a bad policy mapping.
    let registry = match std::env::var("GATE_TOOLS_PATH") {
        Ok(path) => {
            tracing::info!(%path, "loading tool registry");
            ToolRegistry::from_path(&path)?
        }
        Err(_) => {
            tracing::info!("loading embedded tool registry");
            ToolRegistry::embedded()?
        }
    };
    tracing::info!(tools = registry.len(), "tool registry loaded");

    // Audit sink: JSONL file when configured, structured log otherwise.
    let audit_sink: Arc<dyn AuditSink> = match std::env::var("GATE_AUDIT_PATH") {
        Ok(path) => {
            tracing::info!(%path, "audit records will be appended as JSONL");
            Arc::new(JsonlAuditSink::open(&path).await?)
        }
        Err(_) => Arc::new(LogAuditSink),
    };

    // In-memory session store; state is volatile across restarts.
    let store = Arc::new(MemorySessionStore::new());

    let gate = Gate::new(Arc::new(registry), store, audit_sink);
    let state = AppState::new(gate);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("trifecta gate listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
