//! Control message ingestion
//!
//! `GET /live2d?motion=..&expression=..` or `POST /live2d` with a JSON
//! control message. The message is decoded, re-serialized and broadcast.

use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;
use warp::http::StatusCode;
use warp::Filter;

use emodrive_core::ControlMessage;

use super::outcome_json;
use crate::forwarder::MessageForwarder;

/// Flat form of a control message, as a query string carries it
#[derive(Debug, Default, Deserialize)]
struct MessageQuery {
    model: Option<String>,
    motion: Option<String>,
    expression: Option<String>,
}

impl From<MessageQuery> for ControlMessage {
    fn from(q: MessageQuery) -> Self {
        ControlMessage {
            model: q.model,
            motion: q.motion,
            expression: q.expression,
            speak: None,
        }
    }
}

pub fn routes(
    forwarder: Arc<MessageForwarder>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    get_message(forwarder.clone()).or(post_message(forwarder))
}

/// GET /live2d - control message from the query string
fn get_message(
    forwarder: Arc<MessageForwarder>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    warp::path("live2d")
        .and(warp::path::end())
        .and(warp::get())
        .and(warp::query::<MessageQuery>())
        .then(move |query: MessageQuery| {
            let forwarder = forwarder.clone();
            async move { forward(&forwarder, query.into()).await }
        })
}

/// POST /live2d - control message as a JSON body
fn post_message(
    forwarder: Arc<MessageForwarder>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    warp::path("live2d")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::content_length_limit(1024 * 1024))
        .and(warp::body::bytes())
        .then(move |body: warp::hyper::body::Bytes| {
            let forwarder = forwarder.clone();
            async move {
                match serde_json::from_slice::<ControlMessage>(&body) {
                    Ok(msg) => forward(&forwarder, msg).await,
                    Err(e) => error_reply(StatusCode::BAD_REQUEST, e.to_string()),
                }
            }
        })
}

async fn forward(
    forwarder: &MessageForwarder,
    msg: ControlMessage,
) -> warp::reply::WithStatus<warp::reply::Json> {
    if msg.is_empty() {
        return error_reply(StatusCode::BAD_REQUEST, "empty control message".to_string());
    }

    let payload = match msg.to_json() {
        Ok(payload) => payload,
        Err(e) => return error_reply(StatusCode::UNPROCESSABLE_ENTITY, e.to_string()),
    };

    debug!("ingest: {}", payload);
    let outcome = forwarder.broadcast(payload).await;
    warp::reply::with_status(warp::reply::json(&outcome_json(outcome)), StatusCode::OK)
}

fn error_reply(status: StatusCode, error: String) -> warp::reply::WithStatus<warp::reply::Json> {
    warp::reply::with_status(
        warp::reply::json(&serde_json::json!({ "error": error })),
        status,
    )
}
