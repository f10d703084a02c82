//! Forwarder statistics endpoint

use std::sync::Arc;
use warp::Filter;

use crate::forwarder::MessageForwarder;

/// GET /stats - Session and broadcast counters
pub fn route(
    forwarder: Arc<MessageForwarder>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    warp::path("stats").and(warp::get()).then(move || {
        let forwarder = forwarder.clone();
        async move { warp::reply::json(&forwarder.stats().await) }
    })
}
