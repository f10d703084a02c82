//! Emotion mapping engine
//!
//! Picks the dominant emotion and polarity category of a measurement and
//! looks their labels up in user-supplied tables:
//!
//! ```text
//! emotions --dominant--> "happiness" --motionFromEmotion-->      "tap_body"
//! polarity --dominant--> "positive"  --expressionFromPolarity--> "f04"
//! ```
//!
//! Two variants share the `EmotionMapper` interface:
//! - [`StatelessMapper`]: plain lookup, no history
//! - [`StatefulMapper`]: smooths both vectors with a [`RecurrentFilter`]
//!   before the lookup, so one odd sentence does not flip the avatar

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::emotion::{EmotionMeasurement, IntensityVector};
use crate::smoothing::RecurrentFilter;
use crate::traits::EmotionMapper;

/// Category -> label lookup tables
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelTables {
    /// Emotion => Motion, e.g. "happiness" => "tap_body"
    #[serde(default)]
    pub motion_from_emotion: BTreeMap<String, String>,

    /// Polarity => Expression, e.g. "positive" => "f04"
    #[serde(default)]
    pub expression_from_polarity: BTreeMap<String, String>,
}

impl LabelTables {
    pub fn new(
        motion_from_emotion: BTreeMap<String, String>,
        expression_from_polarity: BTreeMap<String, String>,
    ) -> Self {
        Self {
            motion_from_emotion,
            expression_from_polarity,
        }
    }

    fn motion_for(&self, emotions: &IntensityVector) -> Option<String> {
        emotions
            .dominant()
            .and_then(|category| self.motion_from_emotion.get(category))
            .cloned()
    }

    fn expression_for(&self, polarity: &IntensityVector) -> Option<String> {
        polarity
            .dominant()
            .and_then(|category| self.expression_from_polarity.get(category))
            .cloned()
    }

    /// Dominant-category lookup on both vectors
    pub fn lookup(&self, emotions: &IntensityVector, polarity: &IntensityVector) -> Mapping {
        Mapping {
            motion: self.motion_for(emotions),
            expression: self.expression_for(polarity),
        }
    }
}

/// Result of one mapping: labels for the avatar, absent when unmapped
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Mapping {
    pub motion: Option<String>,
    pub expression: Option<String>,
}

impl Mapping {
    pub fn is_empty(&self) -> bool {
        self.motion.is_none() && self.expression.is_none()
    }
}

/// Stateless maximum-a-posteriori mapper: dominant category -> label
#[derive(Clone, Debug, PartialEq)]
pub struct StatelessMapper {
    tables: LabelTables,
}

impl StatelessMapper {
    pub fn new(tables: LabelTables) -> Self {
        Self { tables }
    }

    pub fn tables(&self) -> &LabelTables {
        &self.tables
    }
}

impl EmotionMapper for StatelessMapper {
    fn map(&mut self, measurement: &EmotionMeasurement) -> Mapping {
        self.tables.lookup(&measurement.emotions, &measurement.polarity)
    }

    fn name(&self) -> &'static str {
        "stateless"
    }
}

/// Smoothing mapper: emotion and polarity each go through their own
/// recurrent filter, then the smoothed vectors are looked up.
#[derive(Clone, Debug)]
pub struct StatefulMapper {
    tables: LabelTables,
    emotions: RecurrentFilter,
    polarity: RecurrentFilter,
}

impl StatefulMapper {
    pub fn new(tables: LabelTables) -> Self {
        Self {
            tables,
            emotions: RecurrentFilter::new(),
            polarity: RecurrentFilter::new(),
        }
    }

    pub fn tables(&self) -> &LabelTables {
        &self.tables
    }

    /// Smoothed emotion vector after the last `map`
    pub fn smoothed_emotions(&self) -> &IntensityVector {
        self.emotions.state()
    }

    /// Smoothed polarity vector after the last `map`
    pub fn smoothed_polarity(&self) -> &IntensityVector {
        self.polarity.state()
    }
}

impl EmotionMapper for StatefulMapper {
    fn map(&mut self, measurement: &EmotionMeasurement) -> Mapping {
        let emotions = self.emotions.step(&measurement.emotions);
        let polarity = self.polarity.step(&measurement.polarity);
        self.tables.lookup(emotions, polarity)
    }

    fn name(&self) -> &'static str {
        "stateful"
    }
}

/// The closed set of mapper variants, as built by the factory
#[derive(Clone, Debug)]
pub enum Mapper {
    Stateless(StatelessMapper),
    Stateful(StatefulMapper),
}

impl Mapper {
    pub fn tables(&self) -> &LabelTables {
        match self {
            Mapper::Stateless(m) => m.tables(),
            Mapper::Stateful(m) => m.tables(),
        }
    }
}

impl EmotionMapper for Mapper {
    fn map(&mut self, measurement: &EmotionMeasurement) -> Mapping {
        match self {
            Mapper::Stateless(m) => m.map(measurement),
            Mapper::Stateful(m) => m.map(measurement),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Mapper::Stateless(m) => m.name(),
            Mapper::Stateful(m) => m.name(),
        }
    }
}
