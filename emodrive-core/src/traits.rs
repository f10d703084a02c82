//! # Traits - Abstractions for emodrive's components
//!
//! ## Key Traits
//!
//! - `EmotionMapper`: turns an emotion measurement into avatar controls

use crate::emotion::EmotionMeasurement;
use crate::mapper::Mapping;

/// Emotion -> (motion, expression) mapping
///
/// `map` is total: categories the tables do not cover produce an absent
/// label, never an error.
///
/// Implementations may keep history between calls (`&mut self`). Each
/// mapper has a single owner that calls `map` from one task at a time;
/// mappers do no internal locking.
pub trait EmotionMapper: Send {
    /// Map one measurement to control labels
    fn map(&mut self, measurement: &EmotionMeasurement) -> Mapping;

    /// Name of this mapper (for logging)
    fn name(&self) -> &'static str;
}
