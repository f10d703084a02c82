//! Line ingestion: every line read is broadcast verbatim

use std::io::Write;
use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{info, warn};

use crate::forwarder::{BroadcastOutcome, MessageForwarder};

const PROMPT: &str = "Enter a message to send: ";

/// Read stdin until EOF, broadcasting each line
pub async fn stdin_loop(forwarder: Arc<MessageForwarder>) {
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let sent = forward_lines(stdin, &forwarder, true).await;
    info!("stdin closed after {} messages", sent);
}

/// Broadcast every line of `reader`, returning how many went out.
///
/// Lines are sent as-is, without validation; blank lines are skipped.
pub async fn forward_lines<R>(reader: R, forwarder: &MessageForwarder, prompt: bool) -> usize
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut sent = 0;

    loop {
        if prompt {
            print!("{}", PROMPT);
            std::io::stdout().flush().ok();
        }

        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!("stdin read failed: {}", e);
                break;
            }
        };

        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }

        if let BroadcastOutcome::Sent { .. } = forwarder.broadcast(line).await {
            sent += 1;
        }
    }

    sent
}
