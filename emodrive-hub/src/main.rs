//! emodrive Hub - Avatar Control Relay
//!
//! Takes control messages from stdin, HTTP, or text run through the emotion
//! driver, and broadcasts them to every connected avatar viewer.

mod analyzer;
mod config;
mod driver;
mod forwarder;
mod handlers;
mod ingest;

use std::sync::Arc;

use tracing::{error, info, Level};

use analyzer::EmotextClient;
use config::{print_banner, HubConfig, USAGE};
use driver::EmotionDriver;
use forwarder::MessageForwarder;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut config = HubConfig::from_env()?;
    config.apply_args(std::env::args().skip(1))?;

    if config.help {
        println!("emodrive-hub v{}", VERSION);
        println!("{}", USAGE);
        return Ok(());
    }

    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(if config.verbose { Level::DEBUG } else { Level::INFO })
        .init();

    if let Err(e) = config.validate() {
        error!("{}", e);
        eprintln!("{}", USAGE);
        return Err(e.into());
    }

    let mapper = config.build_mapper()?;
    print_banner(&config, &mapper);

    let forwarder = Arc::new(MessageForwarder::new(config.suppression_policy()));

    // Message ingestion over HTTP
    if let Some(port) = config.http_port {
        let routes = handlers::ingest_routes(forwarder.clone());
        info!("📨 ingest: http://0.0.0.0:{}/live2d", port);
        tokio::spawn(warp::serve(routes).run(([0, 0, 0, 0], port)));
    }

    // Text driver: one driver, calls serialized by its mutex
    if let Some(port) = config.driver_port {
        let analyzer = Arc::new(EmotextClient::new(config.emotext_server.clone())?);
        info!("🎭 driver: http://0.0.0.0:{}/driver (emotext at {})", port, analyzer.endpoint());

        let driver = EmotionDriver::new(analyzer, mapper, config.reduce_emotions);
        let routes = handlers::driver_routes(forwarder.clone(), Arc::new(tokio::sync::Mutex::new(driver)));
        tokio::spawn(warp::serve(routes).run(([0, 0, 0, 0], port)));
    }

    // Stdin lines, broadcast as-is
    if config.stdin {
        let forwarder = forwarder.clone();
        tokio::spawn(ingest::stdin_loop(forwarder));
    }

    // Viewers
    let routes = handlers::viewer_routes(forwarder);
    info!("🖥️ viewers: ws://0.0.0.0:{}/live2d", config.ws_port);
    warp::serve(routes).run(([0, 0, 0, 0], config.ws_port)).await;

    Ok(())
}
