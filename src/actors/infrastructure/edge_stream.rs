use actix::prelude::*;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use scylla::client::session::Session;
use scylla_cdc::checkpoints::TableBackedCheckpointSaver;
use scylla_cdc::consumer::{CDCRow, Consumer, ConsumerFactory, OperationType};
use scylla_cdc::log_reader::{CDCLogReader, CDCLogReaderBuilder};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::actors::core::HealthStatus;
use crate::db::CHECKPOINT_TABLE;
use crate::domain::follow::{CounterError, EdgeEventKind, FollowEdge, FollowEdgeEvent, FollowEdgeHandlers};
use crate::metrics::Metrics;
use crate::utils::{retry_on_transient, RetryConfig, RetryResult};
use super::{AddToDlq, DlqActor, HealthMonitorActor, UpdateHealth};

// ============================================================================
// Follow Edge Stream - CDC on the followers table drives the counter handlers
// ============================================================================
//
// Every row written to or removed from `followers` shows up in its CDC log.
// The reader hands each change row to a FollowEdgeConsumer, which:
//
//   change row → FollowEdgeEvent → EdgeDispatcher (retry) → FollowEdgeHandlers
//                                        │
//                                        └─ gave up → Dead Letter Queue
//
// The handlers themselves never retry; redelivery is decided here, and only
// for transient failures. A consumer never returns an error to the reader:
// a failed event is parked in the DLQ so the stream keeps moving.
//
// Delivery is at-least-once. The reader saves per-stream progress in
// `cdc_checkpoints` and resumes from it after a restart, so edges written
// while the service was down are still delivered. Rows read after the last
// saved checkpoint are read again on restart and applied again; there is no
// dedup marker. With no checkpoint (first start, or one older than the
// lookback) reading starts `start_lookback` in the past.
//
// Changes that never reach the counters:
// - partition and range deletes, which cannot name the removed edges
// - `UPDATE followers ... WHERE target_uid = ? AND follower_uid = ?` on a
//   missing row, which creates the edge but is logged as a RowUpdate
// - re-inserting an existing edge, which is a RowInsert and counts again
//
// ============================================================================

const TABLE: &str = "followers";
const COMPONENT: &str = "edge_stream";

/// What a CDC change row means for the follow counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowDisposition {
    /// A single edge appeared or disappeared
    Edge(EdgeEventKind),
    /// Images and updates; an upserting UPDATE is not told apart
    Ignore,
    /// Removes edges the row cannot name (partition or range deletes)
    Unresolvable,
}

pub fn classify_operation(operation: &OperationType) -> RowDisposition {
    match operation {
        OperationType::RowInsert => RowDisposition::Edge(EdgeEventKind::Created),
        OperationType::RowDelete => RowDisposition::Edge(EdgeEventKind::Deleted),
        OperationType::PartitionDelete
        | OperationType::RowRangeDelInclLeft
        | OperationType::RowRangeDelExclLeft
        | OperationType::RowRangeDelInclRight
        | OperationType::RowRangeDelExclRight => RowDisposition::Unresolvable,
        _ => RowDisposition::Ignore,
    }
}

// ============================================================================
// Dispatcher
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    Applied {
        attempts: u32,
    },
    Failed {
        error: CounterError,
        attempts: u32,
        first_failed_at: DateTime<Utc>,
    },
}

/// Delivers edge events to the handlers, retrying transient failures
pub struct EdgeDispatcher {
    handlers: Arc<FollowEdgeHandlers>,
    retry_config: RetryConfig,
    metrics: Arc<Metrics>,
}

impl EdgeDispatcher {
    pub fn new(handlers: Arc<FollowEdgeHandlers>, retry_config: RetryConfig, metrics: Arc<Metrics>) -> Self {
        Self { handlers, retry_config, metrics }
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub async fn deliver(&self, event: &FollowEdgeEvent) -> DispatchOutcome {
        let started = Instant::now();
        let first_attempt_time = Utc::now();
        let handlers = &self.handlers;
        let metrics = &self.metrics;
        let mut attempts = 0;

        let result = retry_on_transient(self.retry_config.clone(), |attempt| {
            attempts = attempt;
            metrics.record_dispatch_attempt(attempt);

            tracing::debug!(
                attempt = attempt,
                event_id = %event.event_id,
                "Dispatching follow edge event"
            );

            async move { handlers.dispatch(event).await }
        })
        .await;

        let elapsed = started.elapsed().as_secs_f64();
        let kind = event.kind.as_str();

        match result {
            RetryResult::Success(()) => {
                self.metrics.record_edge_event(kind, elapsed, None);
                DispatchOutcome::Applied { attempts }
            }
            RetryResult::Failed(error) | RetryResult::PermanentFailure(error) => {
                self.metrics.record_edge_event(kind, elapsed, Some(error.reason()));
                DispatchOutcome::Failed {
                    error,
                    attempts,
                    first_failed_at: first_attempt_time,
                }
            }
        }
    }
}

// ============================================================================
// CDC Consumer
// ============================================================================

pub(crate) struct FollowEdgeConsumer {
    dispatcher: Arc<EdgeDispatcher>,
    dlq_actor: Option<Addr<DlqActor>>,
    health_monitor: Option<Addr<HealthMonitorActor>>,
    degraded: bool,
}

impl FollowEdgeConsumer {
    pub fn new(
        dispatcher: Arc<EdgeDispatcher>,
        dlq_actor: Option<Addr<DlqActor>>,
        health_monitor: Option<Addr<HealthMonitorActor>>,
    ) -> Self {
        Self {
            dispatcher,
            dlq_actor,
            health_monitor,
            degraded: false,
        }
    }

    /// Key columns are present on both inserts and row deletes
    fn extract_edge(data: &CDCRow<'_>) -> Result<FollowEdge, CounterError> {
        let target_uid = Self::key_text(data, "target_uid")?;
        let follower_uid = Self::key_text(data, "follower_uid")?;
        FollowEdge::parse(target_uid, follower_uid)
    }

    fn key_text<'a>(data: &'a CDCRow<'_>, column: &str) -> Result<&'a str, CounterError> {
        data.get_value(column)
            .as_ref()
            .and_then(|v| v.as_text())
            .map(|s| s.as_str())
            .ok_or_else(|| CounterError::InvalidEdge(format!("change row has no {}", column)))
    }

    fn report(&self, status: HealthStatus, details: Option<String>) {
        if let Some(ref health_monitor) = self.health_monitor {
            health_monitor.do_send(UpdateHealth {
                component: COMPONENT.to_string(),
                status,
                details,
            });
        }
    }

    fn dead_letter(&mut self, event: &FollowEdgeEvent, error: &CounterError, attempts: u32, first_failed_at: DateTime<Utc>) {
        if let Some(ref dlq) = self.dlq_actor {
            dlq.do_send(AddToDlq::from_event(event, error.to_string(), attempts, first_failed_at));
            self.dispatcher.metrics().record_dlq_message();
        }

        self.degraded = true;
        self.report(
            HealthStatus::Degraded(format!("edge event dead-lettered: {}", error.reason())),
            Some(format!(
                "target_uid={} follower_uid={}",
                event.edge.target_uid, event.edge.follower_uid
            )),
        );
    }
}

#[async_trait]
impl Consumer for FollowEdgeConsumer {
    async fn consume_cdc(&mut self, data: CDCRow<'_>) -> anyhow::Result<()> {
        tracing::debug!(
            stream_id = ?data.stream_id,
            operation = %data.operation,
            "Received CDC row"
        );

        let kind = match classify_operation(&data.operation) {
            RowDisposition::Edge(kind) => kind,
            RowDisposition::Ignore => return Ok(()),
            RowDisposition::Unresolvable => {
                // Counters of the affected users drift until reconciled
                tracing::warn!(
                    cdc_operation = %data.operation,
                    target_uid = ?data.get_value("target_uid").as_ref().and_then(|v| v.as_text()),
                    "⚠️ Bulk delete on followers cannot be mapped to edges, counters not adjusted"
                );
                return Ok(());
            }
        };

        let edge = match Self::extract_edge(&data) {
            Ok(edge) => edge,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    cdc_operation = %data.operation,
                    "Skipping malformed follow edge change row"
                );
                self.dispatcher.metrics().record_edge_event(kind.as_str(), 0.0, Some(e.reason()));
                return Ok(());
            }
        };

        let event = match kind {
            EdgeEventKind::Created => FollowEdgeEvent::created(edge),
            EdgeEventKind::Deleted => FollowEdgeEvent::deleted(edge),
        };

        match self.dispatcher.deliver(&event).await {
            DispatchOutcome::Applied { attempts } => {
                tracing::info!(
                    event_id = %event.event_id,
                    event = kind.as_str(),
                    target_uid = %event.edge.target_uid,
                    follower_uid = %event.edge.follower_uid,
                    attempts = attempts,
                    "✅ Follow counters updated"
                );

                if self.degraded {
                    self.degraded = false;
                    self.report(HealthStatus::Healthy, Some("edge events flowing again".to_string()));
                }
            }
            DispatchOutcome::Failed { error, attempts, first_failed_at } => {
                tracing::error!(
                    event_id = %event.event_id,
                    event = kind.as_str(),
                    target_uid = %event.edge.target_uid,
                    follower_uid = %event.edge.follower_uid,
                    error = %error,
                    attempts = attempts,
                    "❌ Follow edge event not applied, sending to DLQ"
                );

                self.dead_letter(&event, &error, attempts, first_failed_at);
            }
        }

        // Never stall the stream on one edge; the DLQ holds it
        Ok(())
    }
}

/// The reader creates one consumer per stream group
pub(crate) struct FollowEdgeConsumerFactory {
    dispatcher: Arc<EdgeDispatcher>,
    dlq_actor: Option<Addr<DlqActor>>,
    health_monitor: Option<Addr<HealthMonitorActor>>,
}

#[async_trait]
impl ConsumerFactory for FollowEdgeConsumerFactory {
    async fn new_consumer(&self) -> Box<dyn Consumer> {
        tracing::debug!("Creating new FollowEdgeConsumer instance");
        Box::new(FollowEdgeConsumer::new(
            self.dispatcher.clone(),
            self.dlq_actor.clone(),
            self.health_monitor.clone(),
        ))
    }
}

// ============================================================================
// Edge Stream Processor Actor
// ============================================================================

pub struct EdgeStreamProcessor {
    session: Arc<Session>,
    keyspace: String,
    start_lookback: Duration,
    dispatcher: Arc<EdgeDispatcher>,
    dlq_actor: Option<Addr<DlqActor>>,
    health_monitor: Option<Addr<HealthMonitorActor>>,
    reader: Option<CDCLogReader>,
}

impl EdgeStreamProcessor {
    pub fn new(
        session: Arc<Session>,
        keyspace: impl Into<String>,
        start_lookback: Duration,
        dispatcher: Arc<EdgeDispatcher>,
        dlq_actor: Option<Addr<DlqActor>>,
        health_monitor: Option<Addr<HealthMonitorActor>>,
    ) -> Self {
        Self {
            session,
            keyspace: keyspace.into(),
            start_lookback,
            dispatcher,
            dlq_actor,
            health_monitor,
            reader: None,
        }
    }

    fn report(&self, status: HealthStatus, details: Option<String>) {
        if let Some(ref health_monitor) = self.health_monitor {
            health_monitor.do_send(UpdateHealth {
                component: COMPONENT.to_string(),
                status,
                details,
            });
        }
    }
}

/// Reader start as time since the epoch, `lookback` before `now`
fn start_timestamp(now: DateTime<Utc>, lookback: Duration) -> chrono::Duration {
    let millis = chrono::Duration::from_std(lookback)
        .ok()
        .and_then(|lookback| now.checked_sub_signed(lookback))
        .map(|start| start.timestamp_millis())
        .unwrap_or(0);

    chrono::Duration::milliseconds(millis.max(0))
}

impl Actor for EdgeStreamProcessor {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        tracing::info!("🔄 Starting CDC streaming for {}.{}", self.keyspace, TABLE);

        let factory = Arc::new(FollowEdgeConsumerFactory {
            dispatcher: self.dispatcher.clone(),
            dlq_actor: self.dlq_actor.clone(),
            health_monitor: self.health_monitor.clone(),
        });
        let session = self.session.clone();
        let keyspace = self.keyspace.clone();
        let start = start_timestamp(Utc::now(), self.start_lookback);

        // Resumes from the saved checkpoint when it is newer than `start`
        let build = async move {
            let checkpoint_saver = Arc::new(
                TableBackedCheckpointSaver::new_with_default_ttl(
                    session.clone(),
                    &keyspace,
                    CHECKPOINT_TABLE,
                )
                .await?,
            );

            CDCLogReaderBuilder::new()
                .session(session)
                .keyspace(&keyspace)
                .table_name(TABLE)
                .consumer_factory(factory)
                .start_timestamp(start)
                .should_save_progress(true)
                .should_load_progress(true)
                .checkpoint_saver(checkpoint_saver)
                .build()
                .await
        };

        ctx.spawn(build.into_actor(self).map(|result, act, _ctx| match result {
            Ok((reader, handle)) => {
                tracing::info!("✅ CDC log reader started, listening for follow edges");
                act.reader = Some(reader);
                act.report(HealthStatus::Healthy, Some("CDC reader running".to_string()));

                let health_monitor = act.health_monitor.clone();
                actix::spawn(async move {
                    let status = match handle.await {
                        Ok(_) => {
                            tracing::info!("CDC reader completed");
                            HealthStatus::Unhealthy("CDC reader completed".to_string())
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "CDC reader failed");
                            HealthStatus::Unhealthy(format!("CDC reader failed: {}", e))
                        }
                    };

                    if let Some(health_monitor) = health_monitor {
                        health_monitor.do_send(UpdateHealth {
                            component: COMPONENT.to_string(),
                            status,
                            details: None,
                        });
                    }
                });
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to create CDC log reader");
                act.report(
                    HealthStatus::Unhealthy(format!("CDC reader not started: {}", e)),
                    None,
                );
            }
        }));
    }

    fn stopping(&mut self, _: &mut Self::Context) -> Running {
        if let Some(mut reader) = self.reader.take() {
            tracing::info!("Stopping CDC log reader");
            reader.stop();
        }
        Running::Stop
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
