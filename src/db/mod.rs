use anyhow::{Context, Result};
use scylla::client::session::Session;
use scylla::client::session_builder::SessionBuilder;
use std::sync::Arc;

use crate::config::Config;

// ============================================================================
// ScyllaDB Session & Schema
// ============================================================================

const SCHEMA_CQL: &str = include_str!("../../migrations/follow_counters.cql");

/// Per-stream read progress of the followers CDC reader
pub const CHECKPOINT_TABLE: &str = "cdc_checkpoints";

/// Connect, make sure the keyspace exists, and switch to it
pub async fn connect(config: &Config) -> Result<Arc<Session>> {
    tracing::info!(nodes = ?config.scylla_nodes, "Connecting to ScyllaDB...");

    let session: Session = SessionBuilder::new()
        .known_nodes(&config.scylla_nodes)
        .connection_timeout(config.connect_timeout)
        .build()
        .await
        .context("Failed to connect to ScyllaDB")?;

    session
        .query_unpaged(
            format!(
                "CREATE KEYSPACE IF NOT EXISTS {} WITH REPLICATION = \
                 {{'class': 'SimpleStrategy', 'replication_factor': 1}}",
                config.keyspace
            ),
            &[],
        )
        .await
        .with_context(|| format!("Failed to create keyspace {}", config.keyspace))?;

    session
        .use_keyspace(&config.keyspace, false)
        .await
        .with_context(|| format!("Failed to switch to keyspace {}", config.keyspace))?;

    Ok(Arc::new(session))
}

/// Apply the table definitions, one statement at a time
pub async fn run_migrations(session: &Session) -> Result<()> {
    let statements = schema_statements(SCHEMA_CQL);

    for statement in &statements {
        session
            .query_unpaged(statement.as_str(), &[])
            .await
            .map_err(|e| anyhow::anyhow!("Scylla migration error: {}", e))?;
    }

    tracing::info!(statements = statements.len(), "Schema migrations applied");
    Ok(())
}

fn schema_statements(cql: &str) -> Vec<String> {
    cql.split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| format!("{};", s))
        .collect()
}
