//! Broadcast suppression policies
//!
//! A policy sees the last message that actually went out and decides
//! whether a new candidate should be dropped.

use std::time::{Duration, Instant};

use emodrive_core::ControlMessage;

use super::Payload;

/// The last message the forwarder broadcast
#[derive(Clone, Debug)]
pub struct LastBroadcast {
    pub payload: Payload,
    pub at: Instant,
}

/// Decides whether a candidate broadcast is dropped
pub trait SuppressionPolicy: Send + Sync {
    /// `true` drops `candidate`; it is then delivered to nobody and the
    /// ledger keeps `last`.
    fn should_suppress(&self, last: Option<&LastBroadcast>, candidate: &str, now: Instant) -> bool;

    /// Name of this policy (for logging and stats)
    fn name(&self) -> &'static str;
}

/// Never drops anything
#[derive(Clone, Copy, Debug, Default)]
pub struct NoSuppression;

impl SuppressionPolicy for NoSuppression {
    fn should_suppress(&self, _: Option<&LastBroadcast>, _: &str, _: Instant) -> bool {
        false
    }

    fn name(&self) -> &'static str {
        "none"
    }
}

/// Drops the generic talking motion right after an emotional motion.
///
/// Speech usually triggers a filler motion (`{"motion":"flick_head"}` for
/// shizuku) just after the driver sent the motion for the sentence's
/// emotion; playing the filler would cut the emotional motion short.
///
/// Fires when all hold:
/// - the candidate is exactly the filler motion command
/// - the previous broadcast is less than `window` old
/// - the previous broadcast carried a `motion`
#[derive(Clone, Debug)]
pub struct FillerMotionPolicy {
    filler: String,
    window: Duration,
}

impl FillerMotionPolicy {
    pub const DEFAULT_WINDOW: Duration = Duration::from_secs(1);

    pub fn new(filler_motion: &str, window: Duration) -> Self {
        Self {
            filler: serde_json::json!({ "motion": filler_motion }).to_string(),
            window,
        }
    }

    /// The exact payload this policy may drop
    pub fn filler(&self) -> &str {
        &self.filler
    }
}

impl SuppressionPolicy for FillerMotionPolicy {
    fn should_suppress(&self, last: Option<&LastBroadcast>, candidate: &str, now: Instant) -> bool {
        let Some(last) = last else {
            return false;
        };

        candidate == self.filler
            && now.saturating_duration_since(last.at) < self.window
            && carries_motion(&last.payload)
    }

    fn name(&self) -> &'static str {
        "filler-motion"
    }
}

fn carries_motion(payload: &str) -> bool {
    ControlMessage::from_json(payload)
        .map(|msg| msg.motion.is_some())
        .unwrap_or(false)
}
