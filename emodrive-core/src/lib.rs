//! # emodrive Core
//!
//! Emotion mapping for avatar control: turns an analyzer's emotion and
//! polarity readings into the motion and expression an avatar should play.
//!
//! This crate provides the building blocks:
//! - **IntensityVector**: category -> intensity, plus the 21 -> 7 reducer
//! - **Mapper**: stateless and stateful (smoothing) emotion mappers
//! - **MapperFactory**: builds a mapper from a JSON spec
//! - **ControlMessage**: the wire message viewers receive
//!
//! ## Example
//!
//! ```rust
//! use emodrive_core::{presets, EmotionMapper, EmotionMeasurement, MapperFactory, MapperKind};
//!
//! let mut mapper = MapperFactory::new(presets::shizuku(MapperKind::Stateless))
//!     .create()
//!     .unwrap();
//!
//! let mut m = EmotionMeasurement::default();
//! m.emotions.insert("happiness", 0.9);
//! m.polarity.insert("positive", 0.7);
//!
//! let mapping = mapper.map(&m);
//! assert_eq!(mapping.motion.as_deref(), Some("tap_body"));
//! assert_eq!(mapping.expression.as_deref(), Some("f04"));
//! ```

pub mod config;
pub mod emotion;
pub mod error;
pub mod factory;
pub mod mapper;
pub mod message;
pub mod smoothing;
pub mod traits;

// Re-export main types at crate root
pub use config::{presets, MapperKind, MapperSpec};
pub use emotion::{EmotionMeasurement, IntensityVector, EMOTION_TAXONOMY, POLARITY_KEYS};
pub use error::{EmoError, EmoResult};
pub use factory::MapperFactory;
pub use mapper::{LabelTables, Mapper, Mapping, StatefulMapper, StatelessMapper};
pub use message::{ControlMessage, ControlState, Speak};
pub use smoothing::RecurrentFilter;
pub use traits::*;
