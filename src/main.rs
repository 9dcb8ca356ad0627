use std::sync::Arc;

use anyhow::Context;

use assist_chat::chat::{CoordinatorDeps, SessionCoordinator, chat_routes};
use assist_chat::config::AssistConfig;
use assist_chat::settings::StaticSettings;
use assist_chat::transport::HttpTransport;
use assist_chat::workflow::{InMemoryWorkflow, WorkflowNode};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = AssistConfig::from_env().context("Invalid assistant configuration")?;

    eprintln!("🤖 Assist Chat v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Assistant API: {}", config.base_url);
    eprintln!("   Chat WS: ws://0.0.0.0:{}/ws", config.listen_port);
    eprintln!("   Chat API: http://0.0.0.0:{}/api/chat", config.listen_port);
    eprintln!(
        "   Assistant: {}",
        if config.enabled { "enabled" } else { "disabled" }
    );

    // ── Workflow ────────────────────────────────────────────────────────
    let workflow = match &config.workflow_path {
        Some(path) => {
            let raw = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read workflow file {}", path.display()))?;
            let nodes: Vec<WorkflowNode> = serde_json::from_str(&raw)
                .with_context(|| format!("Failed to parse workflow nodes in {}", path.display()))?;
            eprintln!("   Workflow: {} ({} nodes)", path.display(), nodes.len());
            InMemoryWorkflow::from_nodes(nodes)
        }
        None => {
            eprintln!("   Workflow: empty (set ASSIST_WORKFLOW_PATH to load nodes)");
            InMemoryWorkflow::new()
        }
    };

    // ── Coordinator ─────────────────────────────────────────────────────
    let transport = HttpTransport::new(&config).context("Failed to create HTTP transport")?;
    let settings = Arc::new(StaticSettings::from_config(&config));
    let coordinator = SessionCoordinator::with_capacity(
        CoordinatorDeps {
            transport: Arc::new(transport),
            workflow: Arc::new(workflow),
            settings: settings.clone(),
            users: settings,
        },
        config.event_capacity,
    );

    let app = chat_routes(coordinator);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.listen_port))
        .await
        .with_context(|| format!("Failed to bind port {}", config.listen_port))?;
    tracing::info!(port = config.listen_port, "Chat server started");
    axum::serve(listener, app).await?;

    Ok(())
}
