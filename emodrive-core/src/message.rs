//! Control messages sent to avatar viewers
//!
//! Wire format is JSON with every field optional and omitted when absent:
//!
//! ```json
//! {"motion": "tap_body", "expression": "f04"}
//! {"speak": {"audio": "https://.../a.wav", "text": "hi", "motion": "flick_head"}}
//! ```

use serde::{Deserialize, Serialize};

use crate::error::EmoResult;
use crate::mapper::Mapping;

/// One avatar control message
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ControlMessage {
    /// Model source to load
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Motion group to play
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub motion: Option<String>,

    /// Expression id (name or index)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,

    /// Speech with lip sync
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speak: Option<Speak>,
}

/// Speech payload: audio plus the controls to apply while speaking
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Speak {
    /// URL to a wav/mp3 file, or a `data:audio/...;base64,` URI
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub motion: Option<String>,
}

impl ControlMessage {
    /// A message that only plays `motion`
    pub fn motion(motion: impl Into<String>) -> Self {
        Self {
            motion: Some(motion.into()),
            ..Default::default()
        }
    }

    /// A message that only sets `expression`
    pub fn expression(expression: impl Into<String>) -> Self {
        Self {
            expression: Some(expression.into()),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.model.is_none()
            && self.motion.is_none()
            && self.expression.is_none()
            && self.speak.is_none()
    }

    /// Compact JSON, the form broadcast to viewers
    pub fn to_json(&self) -> EmoResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> EmoResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Labels last emitted by one driver, used to send only what changed
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ControlState {
    motion: Option<String>,
    expression: Option<String>,
}

impl ControlState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_motion(&self) -> Option<&str> {
        self.motion.as_deref()
    }

    pub fn current_expression(&self) -> Option<&str> {
        self.expression.as_deref()
    }

    /// Fold a mapping into the state, returning the fields that changed.
    ///
    /// An absent label leaves the remembered one alone and emits nothing.
    pub fn apply(&mut self, mapping: Mapping) -> ControlMessage {
        let mut msg = ControlMessage::default();

        if let Some(motion) = mapping.motion {
            if self.motion.as_deref() != Some(motion.as_str()) {
                self.motion = Some(motion.clone());
                msg.motion = Some(motion);
            }
        }

        if let Some(expression) = mapping.expression {
            if self.expression.as_deref() != Some(expression.as_str()) {
                self.expression = Some(expression.clone());
                msg.expression = Some(expression);
            }
        }

        msg
    }
}
