//! emodrive Viewer - Console Client
//!
//! Watches a hub's `/live2d` stream and prints every control message, or
//! with `--say` sends text typed on stdin to the hub's driver endpoint.

use std::io::{self, BufRead, Write};

use chrono::Local;
use futures_util::StreamExt;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use emodrive_core::ControlMessage;

const VERSION: &str = env!("CARGO_PKG_VERSION");

const DEFAULT_WS_URL: &str = "ws://localhost:9001/live2d";
const DEFAULT_DRIVER_URL: &str = "http://localhost:9004/driver";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();
    let say_mode = args.iter().any(|a| a == "--say" || a == "-s");

    println!();
    println!("╔═══════════════════════════════════════════════════════════╗");
    println!("║    emodrive Viewer v{:<38}║", VERSION);
    println!("╚═══════════════════════════════════════════════════════════╝");
    println!();

    if say_mode {
        run_say_mode().await
    } else {
        run_watch_mode().await
    }
}

async fn run_watch_mode() -> Result<(), Box<dyn std::error::Error>> {
    // Get hub URL
    let hub_url = std::env::var("EMODRIVE_WS_URL").unwrap_or_else(|_| {
        println!("Enter the hub URL (default: {}):", DEFAULT_WS_URL);
        print!("> ");
        io::stdout().flush().ok();
        let mut input = String::new();
        io::stdin().read_line(&mut input).ok();
        let input = input.trim();
        if input.is_empty() {
            DEFAULT_WS_URL.to_string()
        } else {
            input.to_string()
        }
    });

    println!();
    println!("Connecting to hub at {}...", hub_url);

    let (ws_stream, _) = match connect_async(&hub_url).await {
        Ok(stream) => stream,
        Err(e) => {
            eprintln!("Failed to connect: {}", e);
            eprintln!();
            eprintln!("Make sure emodrive-hub is running on the target machine.");
            eprintln!("Set EMODRIVE_WS_URL environment variable to the correct address.");
            return Err(e.into());
        }
    };

    println!("✓ Connected. Waiting for control messages (Ctrl-C to quit)");
    println!();

    let (_write, mut read) = ws_stream.split();

    while let Some(msg) = read.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                let stamp = Local::now().format("%H:%M:%S%.3f");
                println!("  \x1B[90m{}\x1B[0m {}", stamp, text);
                if let Some(summary) = describe(&text) {
                    println!("               \x1B[36m{}\x1B[0m", summary);
                }
            }
            Ok(Message::Close(_)) => break,
            Err(e) => {
                eprintln!("WebSocket error: {}", e);
                break;
            }
            _ => {}
        }
    }

    println!();
    println!("Hub closed the connection.");
    Ok(())
}

async fn run_say_mode() -> Result<(), Box<dyn std::error::Error>> {
    let driver_url =
        std::env::var("EMODRIVE_DRIVER_URL").unwrap_or_else(|_| DEFAULT_DRIVER_URL.to_string());
    let client = reqwest::Client::new();

    println!("Sending text to {}", driver_url);
    println!("Empty line or EOF to quit.");
    println!();

    let stdin = io::stdin();
    loop {
        print!("  \x1B[32mSay:\x1B[0m ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            break;
        }

        match client.post(&driver_url).body(line.to_string()).send().await {
            Ok(resp) => {
                let status = resp.status();
                let body = resp.text().await.unwrap_or_default();
                let color = if status.is_success() { "36" } else { "33" };
                println!("  \x1B[{}m{}\x1B[0m {}", color, status.as_u16(), body.trim());
            }
            Err(e) => eprintln!("  \x1B[31mrequest failed:\x1B[0m {}", e),
        }
    }

    println!();
    Ok(())
}

/// One-line summary of a control message; `None` when it does not decode
fn describe(text: &str) -> Option<String> {
    let msg = ControlMessage::from_json(text).ok()?;
    if msg.is_empty() {
        return None;
    }

    let mut parts = Vec::new();
    if let Some(model) = &msg.model {
        parts.push(format!("model={}", model));
    }
    if let Some(motion) = &msg.motion {
        parts.push(format!("motion={}", motion));
    }
    if let Some(expression) = &msg.expression {
        parts.push(format!("expression={}", expression));
    }
    if let Some(speak) = &msg.speak {
        let text = speak.text.as_deref().unwrap_or("(audio)");
        parts.push(format!("speak={:?}", text));
    }
    Some(parts.join(" "))
}
