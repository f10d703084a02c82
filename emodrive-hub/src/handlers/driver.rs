//! Text driver endpoint
//!
//! POST /driver with plain text: analyze, map, diff, and broadcast whatever
//! changed.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::warn;
use warp::http::StatusCode;
use warp::Filter;

use super::outcome_json;
use crate::driver::EmotionDriver;
use crate::forwarder::MessageForwarder;

pub fn route(
    forwarder: Arc<MessageForwarder>,
    driver: Arc<Mutex<EmotionDriver>>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    warp::path("driver")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::content_length_limit(64 * 1024))
        .and(warp::body::bytes())
        .then(move |body: warp::hyper::body::Bytes| {
            let forwarder = forwarder.clone();
            let driver = driver.clone();
            async move { drive(&forwarder, &driver, &body).await }
        })
}

async fn drive(
    forwarder: &MessageForwarder,
    driver: &Mutex<EmotionDriver>,
    body: &[u8],
) -> warp::reply::WithStatus<warp::reply::Json> {
    let text = match std::str::from_utf8(body) {
        Ok(text) => text,
        Err(e) => return reply(StatusCode::BAD_REQUEST, serde_json::json!({ "error": e.to_string() })),
    };

    // the lock is held until the broadcast is queued: measurements reach
    // the mapper, and changes reach viewers, in the order the diff saw them
    let mut driver = driver.lock().await;
    let msg = match driver.drive(text).await {
        Ok(msg) => msg,
        Err(e) => {
            warn!("drive failed: {}", e);
            return reply(StatusCode::BAD_GATEWAY, serde_json::json!({ "error": e.to_string() }));
        }
    };

    if msg.is_empty() {
        return reply(StatusCode::BAD_REQUEST, serde_json::json!({ "warn": "empty drive result" }));
    }

    let payload = match msg.to_json() {
        Ok(payload) => payload,
        Err(e) => return reply(StatusCode::UNPROCESSABLE_ENTITY, serde_json::json!({ "error": e.to_string() })),
    };

    let outcome = forwarder.broadcast(payload).await;
    drop(driver);

    let mut body = outcome_json(outcome);
    body["message"] = serde_json::json!(msg);
    reply(StatusCode::OK, body)
}

fn reply(status: StatusCode, body: serde_json::Value) -> warp::reply::WithStatus<warp::reply::Json> {
    warp::reply::with_status(warp::reply::json(&body), status)
}
