//! Command interface for display surfaces
//!
//! One request (`startFocus`) and one query (`getStatus`), answered with
//! JSON-serializable responses. There is deliberately no stop request.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::clock::Clock;
use crate::coordinator::{Coordinator, Status};
use crate::store::{RuleStore, StateStore};

/// Requests accepted from a display surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Request {
    StartFocus,
    GetStatus,
}

/// Answer to `startFocus`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FocusResponse {
    pub success: bool,
    /// End of the session (epoch millis) on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FocusResponse {
    pub fn started(end_time: i64) -> Self {
        Self {
            success: true,
            end_time: Some(end_time),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            end_time: None,
            error: Some(error.into()),
        }
    }
}

/// Any response a display surface may receive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    Focus(FocusResponse),
    Status(Status),
    Error { error: String },
}

/// Dispatch a request against the coordinator
pub async fn handle<R, S, C>(coordinator: &Coordinator<R, S, C>, request: Request) -> Response
where
    R: RuleStore,
    S: StateStore,
    C: Clock,
{
    match request {
        Request::StartFocus => Response::Focus(start_focus(coordinator).await),
        Request::GetStatus => match coordinator.status().await {
            Ok(status) => Response::Status(status),
            Err(e) => {
                warn!("Status query failed: {}", e);
                Response::Error { error: e.to_string() }
            }
        },
    }
}

/// Start manual focus, folding any failure into a tagged response
pub async fn start_focus<R, S, C>(coordinator: &Coordinator<R, S, C>) -> FocusResponse
where
    R: RuleStore,
    S: StateStore,
    C: Clock,
{
    match coordinator.start_focus_mode().await {
        Ok(end) => FocusResponse::started(end.timestamp_millis()),
        Err(e) => {
            warn!("Failed to start focus mode: {}", e);
            FocusResponse::failed(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::BlockerConfig;
    use crate::store::{MemoryRuleStore, MemoryStateStore};
    use chrono::{FixedOffset, TimeZone};

    fn coordinator() -> Coordinator<MemoryRuleStore, MemoryStateStore, ManualClock> {
        // Saturday afternoon, outside the default schedule
        let now = FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2026, 10, 17, 16, 0, 0)
            .unwrap();
        Coordinator::with_clock(
            BlockerConfig::default(),
            "file:///blocked.html".to_string(),
            MemoryRuleStore::new(),
            MemoryStateStore::new(),
            ManualClock::new(now),
        )
    }

    #[test]
    fn test_request_wire_shape() {
        let request: Request = serde_json::from_str(r#"{"action":"startFocus"}"#).unwrap();
        assert_eq!(request, Request::StartFocus);
        let request: Request = serde_json::from_str(r#"{"action":"getStatus"}"#).unwrap();
        assert_eq!(request, Request::GetStatus);
        assert!(serde_json::from_str::<Request>(r#"{"action":"stopFocus"}"#).is_err());
    }

    #[tokio::test]
    async fn test_start_focus_success() {
        let coordinator = coordinator();
        let response = handle(&coordinator, Request::StartFocus).await;
        let Response::Focus(focus) = response else {
            panic!("expected focus response");
        };
        assert!(focus.success);
        assert!(focus.end_time.is_some());
        assert!(focus.error.is_none());

        let json = serde_json::to_value(&focus).unwrap();
        assert_eq!(json["success"], true);
        assert!(json.get("error").is_none());
    }

    #[tokio::test]
    async fn test_start_focus_failure_is_tagged() {
        let coordinator = coordinator();
        coordinator.state_store().set_failing_writes(true);

        let focus = start_focus(&coordinator).await;
        assert!(!focus.success);
        assert!(focus.end_time.is_none());
        assert!(focus.error.unwrap().contains("unavailable"));
    }

    #[tokio::test]
    async fn test_get_status() {
        let coordinator = coordinator();
        let Response::Status(status) = handle(&coordinator, Request::GetStatus).await else {
            panic!("expected status response");
        };
        assert!(!status.should_block);

        coordinator.state_store().set_failing_reads(true);
        assert!(matches!(
            handle(&coordinator, Request::GetStatus).await,
            Response::Error { .. }
        ));
    }
}
