//! Broadcast fanout forwarder
//!
//! Keeps the set of connected viewers and pushes every control message to
//! all of them.
//!
//! ```text
//! broadcast(msg) --suppression--> registry (read) --> mailbox 1 --> deliver --> viewer 1
//!                                                 \-> mailbox 2 --> deliver --> viewer 2
//! ```
//!
//! Each viewer gets a bounded mailbox drained by its own `deliver` task.
//! `broadcast` holds shared registry access for its whole pass and waits
//! on full mailboxes, so one stalled viewer stalls the pass for everyone.
//! That keeps every viewer on the same message order; it is a known
//! limitation of this design, not something to patch per call site.

mod session;
mod suppression;

pub use session::{Session, SessionId, SessionState, Transport};
pub use suppression::{FillerMotionPolicy, LastBroadcast, NoSuppression, SuppressionPolicy};

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};

/// A serialized control message, shared by every mailbox it is pushed to
pub type Payload = Arc<str>;

/// What happened to one broadcast
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BroadcastOutcome {
    /// Dropped by the suppression policy
    Suppressed,
    /// Pushed to this many mailboxes
    Sent { recipients: usize },
}

/// Forwarder counters, served on `/stats`
#[derive(Clone, Debug, Serialize)]
pub struct ForwarderStats {
    pub sessions: usize,
    pub total_sessions: u64,
    pub broadcasts: u64,
    pub suppressed: u64,
    pub policy: &'static str,
}

/// Fans control messages out to every registered viewer session
pub struct MessageForwarder {
    /// Registry: session id -> mailbox sender
    sessions: RwLock<BTreeMap<SessionId, mpsc::Sender<Payload>>>,
    next_id: AtomicU64,
    capacity: usize,

    /// Suppression ledger, guarded apart from the registry
    last_sent: parking_lot::Mutex<Option<LastBroadcast>>,
    policy: Box<dyn SuppressionPolicy>,

    broadcasts: AtomicU64,
    suppressed: AtomicU64,
}

/// Messages a viewer mailbox holds before `broadcast` waits on it
pub const MAILBOX_CAPACITY: usize = 8;

impl MessageForwarder {
    pub fn new(policy: Box<dyn SuppressionPolicy>) -> Self {
        Self::with_capacity(policy, MAILBOX_CAPACITY)
    }

    pub fn with_capacity(policy: Box<dyn SuppressionPolicy>, capacity: usize) -> Self {
        Self {
            sessions: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
            capacity: capacity.max(1),
            last_sent: parking_lot::Mutex::new(None),
            policy,
            broadcasts: AtomicU64::new(0),
            suppressed: AtomicU64::new(0),
        }
    }

    /// Create a mailbox for a new viewer and add it to the registry
    pub async fn register(&self) -> Session {
        let (tx, rx) = mpsc::channel(self.capacity);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        self.sessions.write().await.insert(id, tx);
        debug!("session {} registered", id);

        Session {
            id,
            mailbox: rx,
            state: SessionState::Registered,
        }
    }

    /// Remove a session's mailbox; queued messages are lost
    pub async fn unregister(&self, id: SessionId) -> bool {
        self.sessions.write().await.remove(&id).is_some()
    }

    /// Drain `session` into `transport` until the transport fails or closes.
    ///
    /// Messages are written one at a time in mailbox order; a slow
    /// transport only holds up this session. On exit the mailbox is
    /// closed (pending messages discarded), the transport closed and the
    /// session unregistered.
    pub async fn deliver<T: Transport>(&self, mut session: Session, mut transport: T) -> Session {
        let peer = transport.peer();
        session.state = SessionState::Delivering;
        info!("viewer {} connected (session {})", peer, session.id);

        loop {
            let payload = tokio::select! {
                next = session.mailbox.recv() => match next {
                    Some(payload) => payload,
                    None => break,
                },
                _ = transport.closed() => {
                    debug!("viewer {} went away (session {})", peer, session.id);
                    break;
                }
            };

            debug!("fwd msg: {} -> {} (session {})", ellipsize(&payload, 80), peer, session.id);
            if let Err(e) = transport.write(&payload).await {
                warn!("fwd msg to {} (session {}) failed: {}", peer, session.id, e);
                break;
            }
        }

        // close the mailbox first: a broadcast waiting on it gives up
        // instead of holding the registry against our unregister
        let discarded = session.discard_pending();
        transport.close().await;
        self.unregister(session.id).await;
        session.state = SessionState::Closed;

        if discarded > 0 {
            debug!("session {} discarded {} queued messages", session.id, discarded);
        }
        info!("viewer {} disconnected (session {})", peer, session.id);
        session
    }

    /// Send a message to every registered session, unless suppressed.
    ///
    /// Waits while any mailbox is full.
    pub async fn broadcast(&self, payload: impl Into<Payload>) -> BroadcastOutcome {
        let payload: Payload = payload.into();

        if self.check_suppressed(&payload) {
            self.suppressed.fetch_add(1, Ordering::Relaxed);
            warn!("suppressed by {} policy: {}", self.policy.name(), ellipsize(&payload, 80));
            return BroadcastOutcome::Suppressed;
        }
        self.broadcasts.fetch_add(1, Ordering::Relaxed);

        let sessions = self.sessions.read().await;
        let mut recipients = 0;
        for (id, mailbox) in sessions.iter() {
            match mailbox.send(payload.clone()).await {
                Ok(()) => recipients += 1,
                Err(_) => debug!("session {} is closing, skipped", id),
            }
        }

        debug!("broadcast to {} sessions: {}", recipients, ellipsize(&payload, 80));
        BroadcastOutcome::Sent { recipients }
    }

    /// Consult the policy; record the payload as last sent if it passes
    fn check_suppressed(&self, payload: &Payload) -> bool {
        let now = Instant::now();
        let mut last = self.last_sent.lock();

        if self.policy.should_suppress(last.as_ref(), payload, now) {
            return true;
        }

        *last = Some(LastBroadcast {
            payload: payload.clone(),
            at: now,
        });
        false
    }

    /// The last message that actually went out
    pub fn last_broadcast(&self) -> Option<LastBroadcast> {
        self.last_sent.lock().clone()
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn stats(&self) -> ForwarderStats {
        ForwarderStats {
            sessions: self.session_count().await,
            total_sessions: self.next_id.load(Ordering::Relaxed) - 1,
            broadcasts: self.broadcasts.load(Ordering::Relaxed),
            suppressed: self.suppressed.load(Ordering::Relaxed),
            policy: self.policy.name(),
        }
    }
}

/// Shorten `s` to at most `max` chars, keeping both ends
pub fn ellipsize(s: &str, max: usize) -> Cow<'_, str> {
    let len = s.chars().count();
    if len <= max || max < 5 {
        return Cow::Borrowed(s);
    }
    let keep = max - 3;
    let head = keep - keep / 2;
    let tail = keep / 2;
    let start: String = s.chars().take(head).collect();
    let end: String = s.chars().skip(len - tail).collect();
    Cow::Owned(format!("{}...{}", start, end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use emodrive_core::{EmoError, EmoResult};
    use std::sync::atomic::AtomicBool;
    use std::time::Duration;
    use tokio::time::timeout;

    /// In-memory transport: records writes, optionally fails after `fail_after`
    struct RecordingTransport {
        written: mpsc::UnboundedSender<String>,
        fail_after: Option<usize>,
        writes: usize,
        closed: Arc<AtomicBool>,
        hangup: Option<tokio::sync::oneshot::Receiver<()>>,
    }

    impl RecordingTransport {
        fn new() -> (Self, mpsc::UnboundedReceiver<String>, Arc<AtomicBool>) {
            let (tx, rx) = mpsc::unbounded_channel();
            let closed = Arc::new(AtomicBool::new(false));
            let transport = Self {
                written: tx,
                fail_after: None,
                writes: 0,
                closed: closed.clone(),
                hangup: None,
            };
            (transport, rx, closed)
        }
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        async fn write(&mut self, payload: &str) -> EmoResult<()> {
            if self.fail_after.is_some_and(|n| self.writes >= n) {
                return Err(EmoError::session_write("broken pipe"));
            }
            self.writes += 1;
            let _ = self.written.send(payload.to_string());
            Ok(())
        }

        async fn closed(&mut self) {
            match self.hangup.as_mut() {
                Some(rx) => {
                    let _ = rx.await;
                }
                None => std::future::pending::<()>().await,
            }
        }

        async fn close(&mut self) {
            self.closed.store(true, Ordering::SeqCst);
        }

        fn peer(&self) -> String {
            "test".to_string()
        }
    }

    async fn recv(rx: &mut mpsc::UnboundedReceiver<String>) -> String {
        timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("timed out waiting for delivery")
            .expect("transport dropped")
    }

    async fn wait_for_sessions(fwd: &MessageForwarder, n: usize) {
        for _ in 0..200 {
            if fwd.session_count().await == n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("expected {} sessions, have {}", n, fwd.session_count().await);
    }

    #[tokio::test]
    async fn test_broadcast_reaches_all_sessions() {
        let fwd = Arc::new(MessageForwarder::new(Box::new(NoSuppression)));

        let mut outputs = Vec::new();
        for _ in 0..3 {
            let session = fwd.register().await;
            assert_eq!(session.state(), SessionState::Registered);
            let (transport, rx, _) = RecordingTransport::new();
            outputs.push(rx);
            let fwd = fwd.clone();
            tokio::spawn(async move { fwd.deliver(session, transport).await });
        }

        let outcome = fwd.broadcast(r#"{"motion":"shake"}"#).await;
        assert_eq!(outcome, BroadcastOutcome::Sent { recipients: 3 });

        for rx in outputs.iter_mut() {
            assert_eq!(recv(rx).await, r#"{"motion":"shake"}"#);
        }
    }

    #[tokio::test]
    async fn test_messages_keep_fifo_order() {
        let fwd = Arc::new(MessageForwarder::new(Box::new(NoSuppression)));
        let session = fwd.register().await;
        let (transport, mut rx, _) = RecordingTransport::new();
        let task = {
            let fwd = fwd.clone();
            tokio::spawn(async move { fwd.deliver(session, transport).await })
        };

        for msg in ["hello", "world", "again"] {
            fwd.broadcast(msg).await;
        }
        assert_eq!(recv(&mut rx).await, "hello");
        assert_eq!(recv(&mut rx).await, "world");
        assert_eq!(recv(&mut rx).await, "again");
        task.abort();
    }

    #[tokio::test]
    async fn test_unregistered_session_gets_nothing() {
        let fwd = MessageForwarder::new(Box::new(NoSuppression));
        let mut kept = fwd.register().await;
        let mut dropped = fwd.register().await;

        assert!(fwd.unregister(dropped.id()).await);
        assert!(!fwd.unregister(dropped.id()).await);

        let outcome = fwd.broadcast("hello").await;
        assert_eq!(outcome, BroadcastOutcome::Sent { recipients: 1 });
        assert_eq!(kept.mailbox.recv().await.as_deref(), Some("hello"));
        // sender side is gone: the mailbox is closed and empty
        assert!(dropped.mailbox.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_write_failure_closes_only_that_session() {
        let fwd = Arc::new(MessageForwarder::new(Box::new(NoSuppression)));

        let healthy = fwd.register().await;
        let (transport, mut healthy_rx, _) = RecordingTransport::new();
        {
            let fwd = fwd.clone();
            tokio::spawn(async move { fwd.deliver(healthy, transport).await });
        }

        let broken = fwd.register().await;
        let (mut transport, _broken_rx, broken_closed) = RecordingTransport::new();
        transport.fail_after = Some(0);
        let broken_task = {
            let fwd = fwd.clone();
            tokio::spawn(async move { fwd.deliver(broken, transport).await })
        };

        fwd.broadcast("first").await;
        let broken = timeout(Duration::from_secs(2), broken_task).await.unwrap().unwrap();
        assert_eq!(broken.state(), SessionState::Closed);
        assert!(broken_closed.load(Ordering::SeqCst));
        assert_eq!(fwd.session_count().await, 1);

        fwd.broadcast("second").await;
        assert_eq!(recv(&mut healthy_rx).await, "first");
        assert_eq!(recv(&mut healthy_rx).await, "second");
    }

    #[tokio::test]
    async fn test_closed_transport_unregisters() {
        let fwd = Arc::new(MessageForwarder::new(Box::new(NoSuppression)));
        let session = fwd.register().await;
        let (mut transport, _rx, closed) = RecordingTransport::new();
        let (hangup_tx, hangup_rx) = tokio::sync::oneshot::channel();
        transport.hangup = Some(hangup_rx);

        let task = {
            let fwd = fwd.clone();
            tokio::spawn(async move { fwd.deliver(session, transport).await })
        };
        wait_for_sessions(&fwd, 1).await;

        hangup_tx.send(()).unwrap();
        let session = timeout(Duration::from_secs(2), task).await.unwrap().unwrap();
        assert_eq!(session.state(), SessionState::Closed);
        assert!(closed.load(Ordering::SeqCst));
        assert_eq!(fwd.session_count().await, 0);
    }

    #[tokio::test]
    async fn test_unregister_discards_queued_messages() {
        let fwd = Arc::new(MessageForwarder::new(Box::new(NoSuppression)));
        let session = fwd.register().await;

        // queue before anyone drains
        for msg in ["one", "two", "three"] {
            fwd.broadcast(msg).await;
        }

        let (mut transport, mut rx, _) = RecordingTransport::new();
        let (hangup_tx, hangup_rx) = tokio::sync::oneshot::channel();
        transport.hangup = Some(hangup_rx);
        transport.fail_after = Some(1);

        let session = fwd.deliver(session, transport).await;
        drop(hangup_tx);

        assert_eq!(session.state(), SessionState::Closed);
        assert_eq!(rx.recv().await.as_deref(), Some("one"));
        // "two" failed to write, "three" was still queued
        assert!(rx.try_recv().is_err(), "queued messages must be discarded, not delivered");
        assert_eq!(fwd.session_count().await, 0);
    }

    #[tokio::test]
    async fn test_full_mailbox_blocks_broadcast() {
        let fwd = Arc::new(MessageForwarder::with_capacity(Box::new(NoSuppression), 1));
        let mut session = fwd.register().await;

        fwd.broadcast("fills the mailbox").await;
        let blocked = {
            let fwd = fwd.clone();
            tokio::spawn(async move { fwd.broadcast("waits").await })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!blocked.is_finished());

        assert_eq!(session.mailbox.recv().await.as_deref(), Some("fills the mailbox"));
        let outcome = timeout(Duration::from_secs(2), blocked).await.unwrap().unwrap();
        assert_eq!(outcome, BroadcastOutcome::Sent { recipients: 1 });
    }

    #[tokio::test]
    async fn test_register_waits_out_blocked_broadcast() {
        let fwd = Arc::new(MessageForwarder::with_capacity(Box::new(NoSuppression), 1));
        let mut first = fwd.register().await;

        fwd.broadcast("fills the mailbox").await;
        let blocked = {
            let fwd = fwd.clone();
            tokio::spawn(async move { fwd.broadcast("waits").await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        // the stuck broadcast holds the registry read lock
        let joining = {
            let fwd = fwd.clone();
            tokio::spawn(async move { fwd.register().await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!joining.is_finished());
        assert!(!blocked.is_finished());

        assert_eq!(first.mailbox.recv().await.as_deref(), Some("fills the mailbox"));
        let outcome = timeout(Duration::from_secs(2), blocked).await.unwrap().unwrap();
        assert_eq!(outcome, BroadcastOutcome::Sent { recipients: 1 });

        let mut second = timeout(Duration::from_secs(2), joining).await.unwrap().unwrap();
        assert_eq!(fwd.session_count().await, 2);
        assert_eq!(first.mailbox.recv().await.as_deref(), Some("waits"));
        assert!(second.mailbox.try_recv().is_err());

        assert_eq!(fwd.broadcast("after").await, BroadcastOutcome::Sent { recipients: 2 });
        assert_eq!(second.mailbox.recv().await.as_deref(), Some("after"));
    }

    #[tokio::test]
    async fn test_default_mailbox_capacity() {
        let fwd = Arc::new(MessageForwarder::new(Box::new(NoSuppression)));
        let mut session = fwd.register().await;

        for i in 0..MAILBOX_CAPACITY {
            let outcome = timeout(Duration::from_secs(1), fwd.broadcast(format!("m{}", i)))
                .await
                .unwrap();
            assert_eq!(outcome, BroadcastOutcome::Sent { recipients: 1 });
        }
        let overflow = {
            let fwd = fwd.clone();
            tokio::spawn(async move { fwd.broadcast("one too many").await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!overflow.is_finished());

        assert_eq!(session.mailbox.recv().await.as_deref(), Some("m0"));
        timeout(Duration::from_secs(2), overflow).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_suppressed_message_reaches_nobody() {
        let policy = FillerMotionPolicy::new("flick_head", Duration::from_secs(60));
        let fwd = MessageForwarder::new(Box::new(policy));
        let mut session = fwd.register().await;

        let emotional = r#"{"motion":"tap_body","expression":"f04"}"#;
        assert_eq!(fwd.broadcast(emotional).await, BroadcastOutcome::Sent { recipients: 1 });
        let ledger_at = fwd.last_broadcast().unwrap().at;

        let filler = r#"{"motion":"flick_head"}"#;
        assert_eq!(fwd.broadcast(filler).await, BroadcastOutcome::Suppressed);

        let last = fwd.last_broadcast().unwrap();
        assert_eq!(&*last.payload, emotional);
        assert_eq!(last.at, ledger_at);

        assert_eq!(session.mailbox.recv().await.as_deref(), Some(emotional));
        assert!(session.mailbox.try_recv().is_err());

        let stats = fwd.stats().await;
        assert_eq!(stats.broadcasts, 1);
        assert_eq!(stats.suppressed, 1);
        assert_eq!(stats.policy, "filler-motion");
    }

    #[tokio::test]
    async fn test_stats() {
        let fwd = MessageForwarder::new(Box::new(NoSuppression));
        let a = fwd.register().await;
        let _b = fwd.register().await;
        fwd.unregister(a.id()).await;

        let stats = fwd.stats().await;
        assert_eq!(stats.sessions, 1);
        assert_eq!(stats.total_sessions, 2);
        assert_eq!(stats.policy, "none");
    }

    #[test]
    fn test_ellipsize() {
        assert_eq!(ellipsize("short", 80), "short");
        let long = "a".repeat(50) + &"b".repeat(50);
        let shown = ellipsize(&long, 21);
        assert_eq!(shown.chars().count(), 21);
        assert!(shown.starts_with("aaaaaaaaa"));
        assert!(shown.ends_with("bbbbbbbbb"));
        assert!(shown.contains("..."));
    }
}
