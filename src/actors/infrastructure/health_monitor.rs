use actix::prelude::*;
use std::collections::HashMap;
use crate::actors::core::{overall_status, ComponentHealth, HealthStatus};

// ============================================================================
// Health Monitor Actor - Monitors system health
// ============================================================================
//
// Responsibilities:
// - Track health status of all components
// - Aggregate system-wide health
//
// Components push their own status; the monitor never polls.
//
// ============================================================================

// ============================================================================
// Messages
// ============================================================================

#[derive(Message)]
#[rtype(result = "()")]
pub struct UpdateHealth {
    pub component: String,
    pub status: HealthStatus,
    pub details: Option<String>,
}

#[derive(Message)]
#[rtype(result = "SystemHealth")]
pub struct GetSystemHealth;

#[derive(Debug, Clone)]
pub struct SystemHealth {
    pub overall_status: HealthStatus,
    pub components: HashMap<String, ComponentHealth>,
}

// ============================================================================
// Health Monitor Actor
// ============================================================================

#[derive(Default)]
pub struct HealthMonitorActor {
    components: HashMap<String, ComponentHealth>,
}

impl HealthMonitorActor {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Actor for HealthMonitorActor {
    type Context = Context<Self>;

    fn started(&mut self, _ctx: &mut Self::Context) {
        tracing::info!("HealthMonitorActor started");
    }
}

impl Handler<UpdateHealth> for HealthMonitorActor {
    type Result = ();

    fn handle(&mut self, msg: UpdateHealth, _: &mut Self::Context) {
        tracing::debug!(
            component = %msg.component,
            status = ?msg.status,
            "Updated component health"
        );

        let health = ComponentHealth::new(msg.component.clone(), msg.status)
            .with_details(msg.details);

        self.components.insert(msg.component, health);
    }
}

impl Handler<GetSystemHealth> for HealthMonitorActor {
    type Result = MessageResult<GetSystemHealth>;

    fn handle(&mut self, _msg: GetSystemHealth, _: &mut Self::Context) -> Self::Result {
        MessageResult(SystemHealth {
            overall_status: overall_status(self.components.values()),
            components: self.components.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[actix::test]
    async fn test_latest_update_wins() {
        let monitor = HealthMonitorActor::new().start();

        monitor.do_send(UpdateHealth {
            component: "edge_stream".to_string(),
            status: HealthStatus::Degraded("2 edge events dead-lettered".to_string()),
            details: None,
        });
        monitor.do_send(UpdateHealth {
            component: "edge_stream".to_string(),
            status: HealthStatus::Healthy,
            details: Some("recovered".to_string()),
        });

        let health = monitor.send(GetSystemHealth).await.unwrap();

        assert!(health.overall_status.is_healthy());
        assert_eq!(health.components.len(), 1);
        assert_eq!(
            health.components["edge_stream"].details.as_deref(),
            Some("recovered")
        );
    }

    #[actix::test]
    async fn test_unhealthy_component_surfaces() {
        let monitor = HealthMonitorActor::new().start();

        monitor.do_send(UpdateHealth {
            component: "dlq_actor".to_string(),
            status: HealthStatus::Healthy,
            details: None,
        });
        monitor.do_send(UpdateHealth {
            component: "edge_stream".to_string(),
            status: HealthStatus::Unhealthy("CDC reader stopped".to_string()),
            details: None,
        });

        let health = monitor.send(GetSystemHealth).await.unwrap();
        assert_eq!(
            health.overall_status,
            HealthStatus::Unhealthy("edge_stream: CDC reader stopped".to_string())
        );
    }
}
