//! Text driver: text -> analyzer -> mapper -> diff
//!
//! Owns one mapper and the labels it last emitted. The hub keeps a single
//! driver behind a `tokio::sync::Mutex`, so a stateful mapper sees its
//! measurements in order.

use std::sync::Arc;

use tracing::{debug, info};

use emodrive_core::{ControlMessage, ControlState, EmoResult, EmotionMapper, Mapper};

use crate::analyzer::EmotionAnalyzer;

pub struct EmotionDriver {
    analyzer: Arc<dyn EmotionAnalyzer>,
    mapper: Mapper,
    state: ControlState,
    /// Reduce fine analyzer categories to the coarse ones before mapping
    reduce_emotions: bool,
}

impl EmotionDriver {
    pub fn new(analyzer: Arc<dyn EmotionAnalyzer>, mapper: Mapper, reduce_emotions: bool) -> Self {
        Self {
            analyzer,
            mapper,
            state: ControlState::new(),
            reduce_emotions,
        }
    }

    /// Analyze `text` and return the controls that changed.
    ///
    /// An analysis failure leaves the mapper and the remembered labels
    /// untouched. The returned message is empty when nothing changed.
    pub async fn drive(&mut self, text: &str) -> EmoResult<ControlMessage> {
        let measurement = self.analyzer.analyze(text).await?;
        let measurement = if self.reduce_emotions {
            measurement.with_coarse_emotions()
        } else {
            measurement
        };

        let mapping = self.mapper.map(&measurement);
        debug!(
            "{} mapper: motion={:?} expression={:?}",
            self.mapper.name(),
            mapping.motion,
            mapping.expression
        );

        let msg = self.state.apply(mapping);
        if !msg.is_empty() {
            info!("drive: motion={:?} expression={:?}", msg.motion, msg.expression);
        }
        Ok(msg)
    }

    pub fn mapper(&self) -> &Mapper {
        &self.mapper
    }

    pub fn state(&self) -> &ControlState {
        &self.state
    }
}
