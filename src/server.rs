//! MCP server initialization for stdio and streamable HTTP transports.
//!
//! Provides [`serve_stdio`] and [`serve_http`] entry points that wire up the
//! database, agent parser, and MCP tool handler into a running server.

use crate::config::JournalConfig;
use crate::db::{self, SqliteStore};
use crate::journal::Journal;
use crate::parser::AgentParser;
use crate::tools::JournalTools;
use anyhow::Result;
use rmcp::ServiceExt;
use std::sync::Arc;

/// Open the configured database and build a [`Journal`] backed by it and by
/// the configured agent.
pub fn open_journal(config: &JournalConfig) -> Result<Journal> {
    let db_path = config.resolved_db_path();
    let conn = db::open_database(&db_path)?;
    tracing::debug!(db = %db_path.display(), "database ready");

    let ttl = config.storage.session_ttl_days;
    if ttl > 0 {
        db::sessions::expire_sessions(&conn, ttl)?;
    }

    let store = Arc::new(SqliteStore::new(conn));
    let parser = AgentParser::new(&config.agent);
    Ok(Journal::new(
        store.clone(),
        store,
        Arc::new(parser),
        config.journal.clone(),
    ))
}

/// Shared setup for both transports.
fn setup_shared_state(config: &JournalConfig) -> Result<Arc<Journal>> {
    if !config.agent.is_configured() {
        tracing::warn!(
            "agent_id or run_id not set; submitting entries will fail until [agent] is configured"
        );
    }
    let journal = open_journal(config)?;
    tracing::info!(endpoint = %config.agent.endpoint(), "journal ready");
    Ok(Arc::new(journal))
}

/// Start the MCP server over stdio transport. Clarifications are filed under
/// the configured default session.
pub async fn serve_stdio(config: JournalConfig) -> Result<()> {
    tracing::info!("starting ME Journal MCP server on stdio");

    let journal = setup_shared_state(&config)?;

    let tools = JournalTools::new(journal, config.storage.default_session.clone());
    let transport = rmcp::transport::stdio();

    let server = tools.serve(transport).await?;
    tracing::info!("MCP server running, waiting for client");

    server.waiting().await?;
    tracing::info!("MCP server shut down");

    Ok(())
}

/// Start the MCP server over streamable HTTP. Every MCP session gets its own
/// journal session id; clarifications a client abandons by reconnecting are
/// dropped after `storage.session_ttl_days`.
pub async fn serve_http(config: JournalConfig) -> Result<()> {
    let host = config.server.host.clone();
    let port = config.server.port;
    let bind_addr = format!("{host}:{port}");

    tracing::info!(addr = %bind_addr, "starting ME Journal MCP server on HTTP");

    let journal = setup_shared_state(&config)?;

    let service = rmcp::transport::streamable_http_server::StreamableHttpService::new(
        move || {
            let session = uuid::Uuid::now_v7().to_string();
            tracing::debug!(session = %session, "new MCP session");
            Ok(JournalTools::new(journal.clone(), session))
        },
        rmcp::transport::streamable_http_server::session::local::LocalSessionManager::default()
            .into(),
        Default::default(),
    );

    let router = axum::Router::new().nest_service("/mcp", service);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "MCP server listening at http://{bind_addr}/mcp");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
            }
            tracing::info!("shutting down HTTP server");
        })
        .await?;

    Ok(())
}
