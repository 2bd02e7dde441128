//! HTTP JSON API for station queries and triggers.
//!
//! Endpoints:
//! - `GET  /health`                    - Server status
//! - `GET  /stations/{id}/state`       - Current state
//! - `GET  /stations/{id}/info`        - Static table introspection
//! - `GET  /stations/{id}/triggers`    - Triggers permitted right now
//! - `GET  /stations/{id}/diagram`     - Mermaid rendering of the table
//! - `POST /stations/{id}/trigger`     - Attempt a transition
//!
//! All responses except the diagram use Content-Type: application/json.

use crate::error::ServerError;
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use reworkd_core::{StationTrigger, TableInfo};
use reworkd_station::{ControllerFactory, StationError, TriggerOutcome};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

/// Maximum trigger request body size.
const MAX_BODY_SIZE: usize = 64 * 1024;

/// Runs the HTTP API server until the shutdown channel fires.
pub async fn run_http_server(
    addr: SocketAddr,
    factory: ControllerFactory,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<(), ServerError> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("API server listening on http://{}", addr);

    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, _)) => {
                        let factory = factory.clone();
                        tokio::spawn(async move {
                            let io = TokioIo::new(stream);
                            let service = service_fn(move |req| {
                                let factory = factory.clone();
                                async move { handle_request(req, factory).await }
                            });
                            if let Err(e) = http1::Builder::new()
                                .serve_connection(io, service)
                                .await
                            {
                                tracing::debug!("Connection error: {}", e);
                            }
                        });
                    }
                    Err(e) => {
                        tracing::error!("API server accept error: {}", e);
                    }
                }
            }
            _ = shutdown.recv() => {
                tracing::info!("API server shutting down");
                break;
            }
        }
    }

    Ok(())
}

/// Body of `POST /stations/{id}/trigger`.
#[derive(Debug, Deserialize)]
struct TriggerRequest {
    trigger: String,
    #[serde(default)]
    parameters: HashMap<String, Value>,
}

/// Routes an HTTP request.
async fn handle_request(
    req: Request<hyper::body::Incoming>,
    factory: ControllerFactory,
) -> Result<Response<Full<Bytes>>, hyper::Error> {
    let method = req.method().as_str().to_string();
    let path = req.uri().path().to_string();
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    let response = match (method.as_str(), segments.as_slice()) {
        ("GET", ["health"]) => text_response(StatusCode::OK, "OK"),

        ("GET", ["stations", id, "state"]) => match parse_id(id) {
            Some(id) => station_state(&factory, id).await,
            None => bad_station_id(id),
        },

        ("GET", ["stations", id, "info"]) => match parse_id(id) {
            Some(id) => station_info(&factory, id).await,
            None => bad_station_id(id),
        },

        ("GET", ["stations", id, "triggers"]) => match parse_id(id) {
            Some(id) => station_triggers(&factory, id).await,
            None => bad_station_id(id),
        },

        ("GET", ["stations", id, "diagram"]) => match parse_id(id) {
            Some(id) => station_diagram(&factory, id).await,
            None => bad_station_id(id),
        },

        ("POST", ["stations", id, "trigger"]) => match parse_id(id) {
            Some(id) => {
                let body = req.into_body().collect().await?.to_bytes();
                station_trigger(&factory, id, &body).await
            }
            None => bad_station_id(id),
        },

        _ => json_response(StatusCode::NOT_FOUND, &json!({"error": "not found"})),
    };

    Ok(response)
}

fn parse_id(raw: &str) -> Option<u32> {
    raw.parse().ok()
}

fn bad_station_id(raw: &str) -> Response<Full<Bytes>> {
    json_response(
        StatusCode::BAD_REQUEST,
        &json!({"error": format!("invalid station id '{raw}'")}),
    )
}

async fn station_state(factory: &ControllerFactory, id: u32) -> Response<Full<Bytes>> {
    match factory.create(id).await {
        Ok(controller) => json_response(
            StatusCode::OK,
            &json!({"id": id, "state": controller.current_state()}),
        ),
        Err(e) => station_error_response(e),
    }
}

async fn station_info(factory: &ControllerFactory, id: u32) -> Response<Full<Bytes>> {
    match factory.create(id).await {
        Ok(controller) => {
            let info: TableInfo = controller.info();
            match serde_json::to_value(&info) {
                Ok(value) => json_response(StatusCode::OK, &value),
                Err(e) => json_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    &json!({"error": e.to_string()}),
                ),
            }
        }
        Err(e) => station_error_response(e),
    }
}

async fn station_triggers(factory: &ControllerFactory, id: u32) -> Response<Full<Bytes>> {
    match factory.create(id).await {
        Ok(controller) => json_response(
            StatusCode::OK,
            &json!({"id": id, "permitted": controller.permitted_triggers()}),
        ),
        Err(e) => station_error_response(e),
    }
}

async fn station_diagram(factory: &ControllerFactory, id: u32) -> Response<Full<Bytes>> {
    match factory.create(id).await {
        Ok(controller) => text_response(StatusCode::OK, &controller.diagram()),
        Err(e) => station_error_response(e),
    }
}

async fn station_trigger(
    factory: &ControllerFactory,
    id: u32,
    body: &[u8],
) -> Response<Full<Bytes>> {
    if body.len() > MAX_BODY_SIZE {
        return json_response(
            StatusCode::PAYLOAD_TOO_LARGE,
            &json!({"error": "request body too large"}),
        );
    }

    let request: TriggerRequest = match serde_json::from_slice(body) {
        Ok(request) => request,
        Err(e) => {
            return json_response(
                StatusCode::BAD_REQUEST,
                &json!({"error": format!("invalid request body: {e}")}),
            )
        }
    };

    let trigger = match StationTrigger::from_code(&request.trigger) {
        Ok(trigger) => trigger,
        Err(e) => {
            return json_response(StatusCode::BAD_REQUEST, &json!({"error": e.to_string()}))
        }
    };

    // Run the trigger in its own task: a dropped connection must not abort
    // the transition between state mutation and persistence.
    let factory = factory.clone();
    let handle = tokio::spawn(async move {
        let mut controller = factory.create(id).await?;
        Ok::<TriggerOutcome, StationError>(controller.trigger(trigger, request.parameters).await)
    });

    match handle.await {
        Ok(Ok(outcome)) => {
            let (status, body) = outcome_response(&outcome);
            json_response(status, &body)
        }
        Ok(Err(e)) => station_error_response(e),
        Err(e) => json_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            &json!({"error": format!("trigger task failed: {e}")}),
        ),
    }
}

/// Maps a trigger outcome to a status code and JSON body.
fn outcome_response(outcome: &TriggerOutcome) -> (StatusCode, Value) {
    match outcome {
        TriggerOutcome::Applied { from, to } => (
            StatusCode::OK,
            json!({"result": "applied", "from": from, "to": to}),
        ),
        TriggerOutcome::AppliedDegraded { from, to, faults } => (
            StatusCode::OK,
            json!({
                "result": "applied_degraded",
                "from": from,
                "to": to,
                "faults": faults,
            }),
        ),
        TriggerOutcome::Rejected { state, trigger } => (
            StatusCode::CONFLICT,
            json!({
                "result": "rejected",
                "state": state,
                "trigger": trigger,
                "error": format!("trigger '{trigger}' is not valid from state '{state}'"),
            }),
        ),
        TriggerOutcome::Cancelled { state, trigger } => (
            StatusCode::CONFLICT,
            json!({"result": "cancelled", "state": state, "trigger": trigger}),
        ),
    }
}

fn station_error_response(error: StationError) -> Response<Full<Bytes>> {
    tracing::error!("station error: {error}");
    json_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        &json!({"error": error.to_string()}),
    )
}

fn json_response(status: StatusCode, body: &Value) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap()
}

fn text_response(status: StatusCode, body: &str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header("Content-Type", "text/plain; charset=utf-8")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use reworkd_core::{SideEffectFault, StationState};

    #[test]
    fn test_trigger_request_parsing() {
        let request: TriggerRequest = serde_json::from_str(
            r#"{"trigger": "pallet_scanned", "parameters": {"barcode": "PAL-0042"}}"#,
        )
        .unwrap();
        assert_eq!(request.trigger, "pallet_scanned");
        assert_eq!(request.parameters["barcode"], "PAL-0042");

        // Parameters are optional.
        let request: TriggerRequest = serde_json::from_str(r#"{"trigger": "start"}"#).unwrap();
        assert!(request.parameters.is_empty());
    }

    #[test]
    fn test_outcome_response_applied() {
        let (status, body) = outcome_response(&TriggerOutcome::Applied {
            from: StationState::WaitPallet,
            to: StationState::ScanPallet,
        });
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["result"], "applied");
        assert_eq!(body["from"], "wait_pallet");
        assert_eq!(body["to"], "scan_pallet");
    }

    #[test]
    fn test_outcome_response_degraded_carries_faults() {
        let (status, body) = outcome_response(&TriggerOutcome::AppliedDegraded {
            from: StationState::WaitPallet,
            to: StationState::ScanPallet,
            faults: vec![SideEffectFault::Persistence {
                detail: "connection reset".to_string(),
            }],
        });
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["result"], "applied_degraded");
        assert_eq!(body["faults"][0]["kind"], "persistence");
    }

    #[test]
    fn test_outcome_response_rejected() {
        let (status, body) = outcome_response(&TriggerOutcome::Rejected {
            state: StationState::WaitPallet,
            trigger: reworkd_core::StationTrigger::TankChosen,
        });
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["result"], "rejected");
        assert_eq!(body["state"], "wait_pallet");
        assert_eq!(body["trigger"], "tank_chosen");
    }
}
