use actix::prelude::*;
use scylla::client::session::Session;
use std::sync::Arc;
use uuid::Uuid;
use chrono::{DateTime, Utc};

use crate::domain::follow::FollowEdgeEvent;

// ============================================================================
// Dead Letter Queue Actor
// ============================================================================
//
// Holds follow edge events the edge stream dispatcher gave up on: permanent
// failures (missing user, invalid edge) and transient failures that outlived
// the retry budget. Their counter deltas were NOT applied; an operator has to
// replay or reconcile them by hand. The exception is `outcome_unknown`: the
// write timed out and may have landed, so check the counters before replaying.
//
// ============================================================================

pub struct DlqActor {
    session: Arc<Session>,
}

impl DlqActor {
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }
}

impl Actor for DlqActor {
    type Context = Context<Self>;

    fn started(&mut self, _ctx: &mut Self::Context) {
        tracing::info!("DlqActor started - Dead Letter Queue ready");
    }
}

// ============================================================================
// Messages
// ============================================================================

#[derive(Message, Debug, Clone)]
#[rtype(result = "Result<(), String>")]
pub struct AddToDlq {
    pub id: Uuid,
    pub target_uid: String,
    pub follower_uid: String,
    pub event_kind: String,
    pub payload: String,
    pub error_message: String,
    pub failure_count: i32,
    pub first_failed_at: DateTime<Utc>,
}

impl AddToDlq {
    pub fn from_event(
        event: &FollowEdgeEvent,
        error_message: String,
        failure_count: u32,
        first_failed_at: DateTime<Utc>,
    ) -> Self {
        // FollowEdgeEvent only holds strings, uuids and timestamps
        let payload = serde_json::to_string(event).unwrap_or_default();

        Self {
            id: event.event_id,
            target_uid: event.edge.target_uid.to_string(),
            follower_uid: event.edge.follower_uid.to_string(),
            event_kind: event.kind.as_str().to_string(),
            payload,
            error_message,
            failure_count: failure_count as i32,
            first_failed_at,
        }
    }
}

#[derive(Message)]
#[rtype(result = "Result<Vec<DlqMessage>, String>")]
pub struct GetDlqMessages {
    pub limit: i32,
}

#[derive(Message)]
#[rtype(result = "Result<DlqStats, String>")]
pub struct GetDlqStats;

#[derive(Debug, Clone)]
pub struct DlqMessage {
    pub id: Uuid,
    pub target_uid: String,
    pub follower_uid: String,
    pub event_kind: String,
    pub error_message: String,
    pub failure_count: i32,
    pub first_failed_at: DateTime<Utc>,
    pub last_failed_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct DlqStats {
    pub total_messages: i64,
}

// ============================================================================
// Handlers
// ============================================================================

impl Handler<AddToDlq> for DlqActor {
    type Result = ResponseFuture<Result<(), String>>;

    fn handle(&mut self, msg: AddToDlq, _: &mut Self::Context) -> Self::Result {
        let session = self.session.clone();
        let now = Utc::now();

        tracing::error!(
            event_id = %msg.id,
            event_kind = %msg.event_kind,
            target_uid = %msg.target_uid,
            follower_uid = %msg.follower_uid,
            error = %msg.error_message,
            failure_count = msg.failure_count,
            "💀 Adding follow edge event to Dead Letter Queue"
        );

        Box::pin(async move {
            session
                .query_unpaged(
                    "INSERT INTO dead_letter_queue (
                        id, target_uid, follower_uid, event_kind, payload,
                        error_message, failure_count, first_failed_at,
                        last_failed_at, created_at
                    ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                    (
                        msg.id,
                        &msg.target_uid,
                        &msg.follower_uid,
                        &msg.event_kind,
                        &msg.payload,
                        &msg.error_message,
                        msg.failure_count,
                        msg.first_failed_at,
                        now,
                        now,
                    ),
                )
                .await
                .map_err(|e| format!("Failed to insert into DLQ: {}", e))?;

            tracing::info!(
                event_id = %msg.id,
                "Follow edge event stored in DLQ"
            );

            Ok(())
        })
    }
}

impl Handler<GetDlqMessages> for DlqActor {
    type Result = ResponseFuture<Result<Vec<DlqMessage>, String>>;

    fn handle(&mut self, msg: GetDlqMessages, _: &mut Self::Context) -> Self::Result {
        let session = self.session.clone();

        Box::pin(async move {
            let result = session
                .query_unpaged(
                    "SELECT id, target_uid, follower_uid, event_kind, error_message,
                            failure_count, first_failed_at, last_failed_at
                     FROM dead_letter_queue
                     LIMIT ?",
                    (msg.limit,),
                )
                .await
                .map_err(|e| format!("Failed to query DLQ: {}", e))?;

            let rows_result = result.into_rows_result()
                .map_err(|e| format!("Failed to parse DLQ results: {}", e))?;
            let rows = rows_result
                .rows::<(Uuid, String, String, String, String, i32, DateTime<Utc>, DateTime<Utc>)>()
                .map_err(|e| format!("Failed to get rows: {}", e))?;

            let mut messages = Vec::new();
            for row in rows {
                let (id, target_uid, follower_uid, event_kind, error_message,
                     failure_count, first_failed_at, last_failed_at) =
                    row.map_err(|e| format!("Failed to parse row: {}", e))?;

                messages.push(DlqMessage {
                    id,
                    target_uid,
                    follower_uid,
                    event_kind,
                    error_message,
                    failure_count,
                    first_failed_at,
                    last_failed_at,
                });
            }

            Ok(messages)
        })
    }
}

impl Handler<GetDlqStats> for DlqActor {
    type Result = ResponseFuture<Result<DlqStats, String>>;

    fn handle(&mut self, _msg: GetDlqStats, _: &mut Self::Context) -> Self::Result {
        let session = self.session.clone();

        Box::pin(async move {
            let count_result = session
                .query_unpaged("SELECT COUNT(*) FROM dead_letter_queue", &[])
                .await
                .map_err(|e| format!("Failed to count DLQ messages: {}", e))?;

            let total_messages = count_result
                .into_rows_result()
                .map_err(|e| format!("Failed to parse DLQ count: {}", e))?
                .maybe_first_row::<(i64,)>()
                .map_err(|e| format!("Failed to read DLQ count: {}", e))?
                .map(|(count,)| count)
                .unwrap_or(0);

            Ok(DlqStats { total_messages })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::follow::{EdgeEventKind, FollowEdge};

    #[test]
    fn test_dead_letter_carries_edge_and_payload() {
        let event = FollowEdgeEvent::created(FollowEdge::parse("U1", "U2").unwrap());
        let failed_at = Utc::now();

        let msg = AddToDlq::from_event(&event, "User record not found: U2".into(), 1, failed_at);

        assert_eq!(msg.id, event.event_id);
        assert_eq!(msg.target_uid, "U1");
        assert_eq!(msg.follower_uid, "U2");
        assert_eq!(msg.event_kind, "FollowEdgeCreated");
        assert_eq!(msg.failure_count, 1);
        assert_eq!(msg.first_failed_at, failed_at);

        let replay: FollowEdgeEvent = serde_json::from_str(&msg.payload).unwrap();
        assert_eq!(replay.kind, EdgeEventKind::Created);
        assert_eq!(replay.edge, event.edge);
    }
}
