//! # Emotion - Intensity vectors and the emotion taxonomy
//!
//! The analyzer reports two intensity vectors per text:
//! - **emotions**: 21 fine categories (`"PA"`, `"NB"`, ...) or the
//!   7 coarse ones they roll up into (`"happiness"`, `"sadness"`, ...)
//! - **polarity**: `neutrality`, `positive`, `negative`, `both`
//!
//! Keys absent from a vector are zero.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Coarse emotion categories and the fine categories they are made of
pub const EMOTION_TAXONOMY: [(&str, &[&str]); 7] = [
    ("happiness", &["PA", "PE"]),
    ("goodness", &["PD", "PH", "PG", "PB", "PK"]),
    ("anger", &["NA"]),
    ("sadness", &["NB", "NJ", "NH", "PF"]),
    ("fear", &["NI", "NC", "NG"]),
    ("dislike", &["NE", "ND", "NN", "NK", "NL"]),
    ("surprise", &["PC"]),
];

/// Polarity categories
pub const POLARITY_KEYS: [&str; 4] = ["neutrality", "positive", "negative", "both"];

/// Coarse category a fine category belongs to
pub fn coarse_category(fine: &str) -> Option<&'static str> {
    EMOTION_TAXONOMY
        .iter()
        .find(|(_, fines)| fines.contains(&fine))
        .map(|(coarse, _)| *coarse)
}

/// Is `key` one of the 7 coarse categories?
pub fn is_coarse_category(key: &str) -> bool {
    EMOTION_TAXONOMY.iter().any(|(coarse, _)| *coarse == key)
}

/// Category -> intensity mapping
///
/// Stored sorted so that iteration (and therefore tie-breaking) is stable.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IntensityVector(BTreeMap<String, f32>);

impl IntensityVector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intensity of `category`, zero when absent
    pub fn get(&self, category: &str) -> f32 {
        self.0.get(category).copied().unwrap_or(0.0)
    }

    pub fn insert(&mut self, category: impl Into<String>, value: f32) {
        self.0.insert(category.into(), value);
    }

    /// Add `value` to the intensity of `category`
    pub fn accumulate(&mut self, category: impl Into<String>, value: f32) {
        *self.0.entry(category.into()).or_insert(0.0) += value;
    }

    pub fn contains(&self, category: &str) -> bool {
        self.0.contains_key(category)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f32)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn sum(&self) -> f32 {
        self.0.values().sum()
    }

    /// The dominant category: the key with the highest intensity.
    ///
    /// Ties resolve to the lexicographically lowest key. Negative and NaN
    /// entries are never dominant. An empty vector has no dominant category.
    pub fn dominant(&self) -> Option<&str> {
        let mut best: Option<(&str, f32)> = None;
        for (key, value) in self.iter() {
            if !(value >= 0.0) {
                continue;
            }
            match best {
                Some((_, max)) if value <= max => {}
                _ => best = Some((key, value)),
            }
        }
        best.map(|(key, _)| key)
    }

    /// Collapse 21 fine emotion categories into the 7 coarse ones.
    ///
    /// Each coarse total is the sum of its fine constituents. Keys that are
    /// already coarse pass through (and add to the same total); keys outside
    /// the taxonomy are dropped.
    pub fn reduce_to_coarse(&self) -> IntensityVector {
        let mut coarse = IntensityVector::new();
        for (key, value) in self.iter() {
            if let Some(parent) = coarse_category(key) {
                coarse.accumulate(parent, value);
            } else if is_coarse_category(key) {
                coarse.accumulate(key, value);
            } else {
                tracing::debug!("dropping unknown emotion category {:?}", key);
            }
        }
        coarse
    }
}

impl<K: Into<String>> FromIterator<(K, f32)> for IntensityVector {
    fn from_iter<I: IntoIterator<Item = (K, f32)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// One analyzer result: emotion and polarity vectors for a single text
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EmotionMeasurement {
    #[serde(default)]
    pub emotions: IntensityVector,

    #[serde(default)]
    pub polarity: IntensityVector,
}

impl EmotionMeasurement {
    pub fn new(emotions: IntensityVector, polarity: IntensityVector) -> Self {
        Self { emotions, polarity }
    }

    /// Same measurement with the emotion vector reduced to 7 categories
    pub fn with_coarse_emotions(&self) -> Self {
        Self {
            emotions: self.emotions.reduce_to_coarse(),
            polarity: self.polarity.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.emotions.is_empty() && self.polarity.is_empty()
    }
}
