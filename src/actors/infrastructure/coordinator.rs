use actix::prelude::*;
use scylla::client::session::Session;
use std::sync::Arc;
use std::time::Duration;
use crate::actors::core::HealthStatus;
use super::{
    DlqActor, EdgeDispatcher, EdgeStreamProcessor, GetDlqMessages, GetDlqStats,
    GetSystemHealth, HealthMonitorActor, UpdateHealth,
};

// ============================================================================
// Coordinator Actor - Orchestrates all system actors
// ============================================================================
//
// Responsibilities:
// - Manages lifecycle of child actors
// - Coordinates graceful shutdown
// - Reports system health and DLQ backlog
//
// Actor Hierarchy:
//   CoordinatorActor
//   ├── HealthMonitorActor
//   ├── DlqActor
//   └── EdgeStreamProcessor
//
// ============================================================================

const HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(30);
const DLQ_SAMPLE_SIZE: i32 = 10;

pub struct CoordinatorActor {
    session: Arc<Session>,
    keyspace: String,
    cdc_start_lookback: Duration,
    dispatcher: Arc<EdgeDispatcher>,
    edge_stream: Option<Addr<EdgeStreamProcessor>>,
    health_monitor: Option<Addr<HealthMonitorActor>>,
    dlq_actor: Option<Addr<DlqActor>>,
}

impl CoordinatorActor {
    pub fn new(
        session: Arc<Session>,
        keyspace: impl Into<String>,
        cdc_start_lookback: Duration,
        dispatcher: Arc<EdgeDispatcher>,
    ) -> Self {
        Self {
            session,
            keyspace: keyspace.into(),
            cdc_start_lookback,
            dispatcher,
            edge_stream: None,
            health_monitor: None,
            dlq_actor: None,
        }
    }

    fn start_child_actors(&mut self, _ctx: &mut Context<Self>) {
        tracing::info!("Starting child actors");

        let health_monitor = HealthMonitorActor::new().start();
        self.health_monitor = Some(health_monitor.clone());

        let dlq_actor = DlqActor::new(self.session.clone()).start();
        self.dlq_actor = Some(dlq_actor.clone());

        health_monitor.do_send(UpdateHealth {
            component: "dlq_actor".to_string(),
            status: HealthStatus::Healthy,
            details: Some("DLQ actor started".to_string()),
        });

        // Reports its own health once the CDC reader is up
        let edge_stream = EdgeStreamProcessor::new(
            self.session.clone(),
            self.keyspace.clone(),
            self.cdc_start_lookback,
            self.dispatcher.clone(),
            Some(dlq_actor),
            Some(health_monitor),
        )
        .start();
        self.edge_stream = Some(edge_stream);

        tracing::info!("✅ All child actors started successfully");
    }

    fn check_health(&self) {
        if let Some(ref health_monitor) = self.health_monitor {
            let health_monitor = health_monitor.clone();
            actix::spawn(async move {
                match health_monitor.send(GetSystemHealth).await {
                    Ok(health) => {
                        match health.overall_status {
                            HealthStatus::Healthy => {
                                tracing::debug!("System health check: Healthy");
                            }
                            HealthStatus::Degraded(ref msg) => {
                                tracing::warn!("System health check: Degraded - {}", msg);
                            }
                            HealthStatus::Unhealthy(ref msg) => {
                                tracing::error!("System health check: Unhealthy - {}", msg);
                            }
                        }

                        for component in health.components.values().filter(|c| !c.status.is_healthy()) {
                            tracing::warn!(
                                component = %component.name,
                                status = ?component.status,
                                details = ?component.details,
                                last_check = %component.last_check,
                                "Component not healthy"
                            );
                        }
                    }
                    Err(e) => {
                        tracing::error!("Failed to get system health: {}", e);
                    }
                }
            });
        }
    }

    fn check_dead_letters(&self) {
        if let Some(ref dlq_actor) = self.dlq_actor {
            let dlq_actor = dlq_actor.clone();
            actix::spawn(async move {
                let stats = match dlq_actor.send(GetDlqStats).await {
                    Ok(Ok(stats)) => stats,
                    Ok(Err(e)) => {
                        tracing::error!(error = %e, "Failed to read DLQ stats");
                        return;
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "DLQ actor unreachable");
                        return;
                    }
                };

                if stats.total_messages == 0 {
                    tracing::debug!("DLQ is empty");
                    return;
                }

                tracing::warn!(
                    total_messages = stats.total_messages,
                    "💀 Follow edge events waiting in DLQ, counters may be off"
                );

                if let Ok(Ok(messages)) = dlq_actor.send(GetDlqMessages { limit: DLQ_SAMPLE_SIZE }).await {
                    for msg in messages {
                        tracing::warn!(
                            event_id = %msg.id,
                            event_kind = %msg.event_kind,
                            target_uid = %msg.target_uid,
                            follower_uid = %msg.follower_uid,
                            error = %msg.error_message,
                            failure_count = msg.failure_count,
                            first_failed_at = %msg.first_failed_at,
                            last_failed_at = %msg.last_failed_at,
                            "Dead-lettered follow edge event"
                        );
                    }
                }
            });
        }
    }
}

impl Actor for CoordinatorActor {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        tracing::info!("🎯 CoordinatorActor started - follow counters via CDC");
        self.start_child_actors(ctx);

        ctx.run_interval(HEALTH_CHECK_INTERVAL, |act, _ctx| {
            act.check_health();
            act.check_dead_letters();
        });
    }

    fn stopping(&mut self, _: &mut Self::Context) -> Running {
        tracing::info!("🛑 CoordinatorActor stopping - initiating graceful shutdown");
        Running::Stop
    }

    fn stopped(&mut self, _: &mut Self::Context) {
        tracing::info!("🛑 CoordinatorActor stopped");
    }
}

// ============================================================================
// Messages
// ============================================================================

#[derive(Message)]
#[rtype(result = "Result<(), String>")]
pub struct Shutdown;

impl Handler<Shutdown> for CoordinatorActor {
    type Result = Result<(), String>;

    fn handle(&mut self, _msg: Shutdown, ctx: &mut Self::Context) -> Self::Result {
        tracing::info!("Received shutdown signal");

        // Stop the stream first so nothing new lands in the DLQ
        if let Some(ref edge_stream) = self.edge_stream {
            edge_stream.do_send(StopActor);
        }

        if let Some(ref dlq_actor) = self.dlq_actor {
            dlq_actor.do_send(StopActor);
        }

        if let Some(ref health_monitor) = self.health_monitor {
            health_monitor.do_send(StopActor);
        }

        ctx.stop();

        Ok(())
    }
}

/// Message to gracefully stop an actor
#[derive(Message)]
#[rtype(result = "()")]
struct StopActor;

impl Handler<StopActor> for EdgeStreamProcessor {
    type Result = ();

    fn handle(&mut self, _: StopActor, ctx: &mut Self::Context) {
        tracing::info!("EdgeStreamProcessor received stop signal");
        ctx.stop();
    }
}

impl Handler<StopActor> for HealthMonitorActor {
    type Result = ();

    fn handle(&mut self, _: StopActor, ctx: &mut Self::Context) {
        tracing::info!("HealthMonitorActor received stop signal");
        ctx.stop();
    }
}

impl Handler<StopActor> for DlqActor {
    type Result = ();

    fn handle(&mut self, _: StopActor, ctx: &mut Self::Context) {
        tracing::info!("DlqActor received stop signal");
        ctx.stop();
    }
}
