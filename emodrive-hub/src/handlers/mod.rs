//! HTTP/WebSocket route handlers for the emodrive hub
//!
//! Organized by listener:
//! - viewers (`EMODRIVE_WS_PORT`): `websocket`, `health`, `stats`
//! - ingestion (`EMODRIVE_HTTP_PORT`): `message`
//! - driver (`EMODRIVE_DRIVER_PORT`): `driver`

pub mod driver;
pub mod health;
pub mod message;
pub mod stats;
pub mod websocket;

use std::sync::Arc;
use warp::Filter;

use crate::driver::EmotionDriver;
use crate::forwarder::MessageForwarder;

/// Viewer-facing routes: `/live2d` WebSocket plus health and stats
pub fn viewer_routes(
    forwarder: Arc<MessageForwarder>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    websocket::route(forwarder.clone())
        .or(health::route())
        .or(stats::route(forwarder))
}

/// Control message ingestion at `/live2d`
pub fn ingest_routes(
    forwarder: Arc<MessageForwarder>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    message::routes(forwarder)
}

/// Text driver at `/driver`
pub fn driver_routes(
    forwarder: Arc<MessageForwarder>,
    driver: Arc<tokio::sync::Mutex<EmotionDriver>>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    driver::route(forwarder, driver)
}

/// Map a broadcast outcome to the JSON reply ingestion endpoints send
pub(crate) fn outcome_json(outcome: crate::forwarder::BroadcastOutcome) -> serde_json::Value {
    match outcome {
        crate::forwarder::BroadcastOutcome::Sent { recipients } => {
            serde_json::json!({"status": "sent", "recipients": recipients})
        }
        crate::forwarder::BroadcastOutcome::Suppressed => serde_json::json!({"status": "suppressed"}),
    }
}
