//! Viewer sessions and the transports they drain into

use async_trait::async_trait;
use tokio::sync::mpsc;

use emodrive_core::EmoResult;

use super::Payload;

/// Stable handle of a registered session
pub type SessionId = u64;

/// Lifecycle of a session: `Registered -> Delivering -> Closed`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// Mailbox is in the registry, nobody drains it yet
    Registered,
    /// A delivery task is draining the mailbox into the transport
    Delivering,
    /// Unregistered; terminal
    Closed,
}

/// One registered viewer: the receiving end of its mailbox
#[derive(Debug)]
pub struct Session {
    pub(super) id: SessionId,
    pub(super) mailbox: mpsc::Receiver<Payload>,
    pub(super) state: SessionState,
}

impl Session {
    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Take the next queued message, waiting for one.
    ///
    /// For consumers that pull instead of running `deliver`.
    pub async fn recv(&mut self) -> Option<Payload> {
        self.mailbox.recv().await
    }

    /// Take the next queued message if there is one
    pub fn try_recv(&mut self) -> Option<Payload> {
        self.mailbox.try_recv().ok()
    }

    /// Drop everything still queued, returning how many messages were lost
    pub(super) fn discard_pending(&mut self) -> usize {
        self.mailbox.close();
        let mut discarded = 0;
        while self.mailbox.try_recv().is_ok() {
            discarded += 1;
        }
        discarded
    }
}

/// Outbound byte stream to one viewer
///
/// Any write error counts as connection loss.
#[async_trait]
pub trait Transport: Send {
    /// Write one serialized control message
    async fn write(&mut self, payload: &str) -> EmoResult<()>;

    /// Resolves once the peer has gone away.
    ///
    /// Must be cancel safe: it is raced against the mailbox.
    async fn closed(&mut self) {
        std::future::pending::<()>().await
    }

    /// Close the transport; errors are ignored
    async fn close(&mut self);

    /// Peer description (for logging)
    fn peer(&self) -> String {
        "unknown".to_string()
    }
}
