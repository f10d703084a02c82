//! # Configuration - Mapper specifications
//!
//! A mapper is described by an encodable spec, usually kept in a JSON file:
//!
//! ```json
//! {
//!   "type": "stateful",
//!   "config": {
//!     "motionFromEmotion": { "happiness": "tap_body", "sadness": "flick_head" },
//!     "expressionFromPolarity": { "positive": "f04" }
//!   }
//! }
//! ```
//!
//! Avatar-specific vocabularies live in [`presets`] as plain data.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{EmoError, EmoResult};
use crate::mapper::LabelTables;

/// Mapper variant selector
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MapperKind {
    Stateless,
    Stateful,
}

impl MapperKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MapperKind::Stateless => "stateless",
            MapperKind::Stateful => "stateful",
        }
    }
}

impl FromStr for MapperKind {
    type Err = EmoError;

    fn from_str(s: &str) -> EmoResult<Self> {
        match s {
            "stateless" => Ok(MapperKind::Stateless),
            "stateful" => Ok(MapperKind::Stateful),
            other => Err(EmoError::UnknownMapper(other.to_string())),
        }
    }
}

impl fmt::Display for MapperKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Encodable mapper description: variant tag + label tables.
///
/// The tag stays a plain string here so that an unknown variant is reported
/// by the factory, not as a decode error.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MapperSpec {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default)]
    pub config: LabelTables,
}

impl MapperSpec {
    pub fn new(kind: MapperKind, config: LabelTables) -> Self {
        Self {
            kind: kind.as_str().to_string(),
            config,
        }
    }

    /// Parse a spec from JSON text
    pub fn from_json(json: &str) -> EmoResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| EmoError::config(format!("invalid mapper spec: {}", e)))
    }

    /// Load a spec from a JSON file
    pub fn load(path: impl AsRef<Path>) -> EmoResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            EmoError::config(format!("cannot read mapper spec {}: {}", path.display(), e))
        })?;
        Self::from_json(&text)
    }

    pub fn to_json_pretty(&self) -> EmoResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Built-in vocabularies for known avatar models
pub mod presets {
    use super::{MapperKind, MapperSpec};
    use crate::mapper::LabelTables;

    /// Shizuku (pixi-live2d-display test model): polarity => expression
    pub const SHIZUKU_EXPRESSIONS: [(&str, &str); 4] = [
        ("neutrality", "f01"), // shy
        ("positive", "f04"),   // smile
        ("negative", "f02"),   // unhappy
        ("both", "f01"),       // shy
    ];

    /// Shizuku: coarse emotion => motion group
    pub const SHIZUKU_MOTIONS: [(&str, &str); 7] = [
        ("happiness", "tap_body"), // energetic
        ("goodness", "flick_head"),
        ("anger", "pinch_out"), // tsundere
        ("sadness", "flick_head"),
        ("fear", "pinch_in"), // shy
        ("dislike", "pinch_out"),
        ("surprise", "shake"),
    ];

    /// Shizuku idle/talk motion, broadcast while the avatar speaks
    pub const SHIZUKU_FILLER_MOTION: &str = "flick_head";

    pub fn shizuku(kind: MapperKind) -> MapperSpec {
        let tables = LabelTables::new(
            SHIZUKU_MOTIONS
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            SHIZUKU_EXPRESSIONS
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        );
        MapperSpec::new(kind, tables)
    }

    /// Look a preset up by model name
    pub fn by_name(name: &str, kind: MapperKind) -> Option<MapperSpec> {
        match name {
            "shizuku" => Some(shizuku(kind)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_kind_parsing() {
        assert_eq!("stateless".parse::<MapperKind>().unwrap(), MapperKind::Stateless);
        assert_eq!("stateful".parse::<MapperKind>().unwrap(), MapperKind::Stateful);
        assert!(matches!(
            "bayesian".parse::<MapperKind>(),
            Err(EmoError::UnknownMapper(tag)) if tag == "bayesian"
        ));
    }

    #[test]
    fn test_spec_from_json() {
        let spec = MapperSpec::from_json(
            r#"{
                "type": "stateless",
                "config": {
                    "motionFromEmotion": {"happiness": "tap_body", "sadness": "flick_head"},
                    "expressionFromPolarity": {"positive": "f04"}
                }
            }"#,
        )
        .unwrap();

        assert_eq!(spec.kind, "stateless");
        assert_eq!(spec.config.motion_from_emotion.len(), 2);
        assert_eq!(spec.config.expression_from_polarity["positive"], "f04");
    }

    #[test]
    fn test_unknown_kind_still_decodes() {
        let spec = MapperSpec::from_json(r#"{"type": "magic", "config": {}}"#).unwrap();
        assert_eq!(spec.kind, "magic");
        assert!(spec.config.motion_from_emotion.is_empty());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let spec = presets::shizuku(MapperKind::Stateful);
        write!(file, "{}", spec.to_json_pretty().unwrap()).unwrap();

        let loaded = MapperSpec::load(file.path()).unwrap();
        assert_eq!(loaded, spec);
    }

    #[test]
    fn test_load_missing_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = MapperSpec::load(dir.path().join("nope.json")).unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_presets() {
        let spec = presets::by_name("shizuku", MapperKind::Stateless).unwrap();
        assert_eq!(spec.config.motion_from_emotion["surprise"], "shake");
        assert_eq!(spec.config.expression_from_polarity.len(), 4);
        assert!(presets::by_name("hiyori", MapperKind::Stateless).is_none());
    }
}
