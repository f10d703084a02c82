//! Mapper factory: spec -> validated mapper

use crate::config::{MapperKind, MapperSpec};
use crate::error::{EmoError, EmoResult};
use crate::mapper::{LabelTables, Mapper, StatefulMapper, StatelessMapper};

/// Builds mappers from encodable specs
#[derive(Clone, Debug, PartialEq)]
pub struct MapperFactory {
    spec: MapperSpec,
}

impl MapperFactory {
    pub fn new(spec: MapperSpec) -> Self {
        Self { spec }
    }

    pub fn from_json(json: &str) -> EmoResult<Self> {
        MapperSpec::from_json(json).map(Self::new)
    }

    pub fn spec(&self) -> &MapperSpec {
        &self.spec
    }

    /// Validate the tables, then build the requested variant
    pub fn create(&self) -> EmoResult<Mapper> {
        validate(&self.spec.config)?;

        let tables = self.spec.config.clone();
        let mapper = match self.spec.kind.parse::<MapperKind>()? {
            MapperKind::Stateless => Mapper::Stateless(StatelessMapper::new(tables)),
            MapperKind::Stateful => Mapper::Stateful(StatefulMapper::new(tables)),
        };
        Ok(mapper)
    }
}

/// Both lookup tables must be non-empty
pub fn validate(tables: &LabelTables) -> EmoResult<()> {
    if tables.motion_from_emotion.is_empty() {
        return Err(EmoError::config("empty motionFromEmotion"));
    }
    if tables.expression_from_polarity.is_empty() {
        return Err(EmoError::config("empty expressionFromPolarity"));
    }
    Ok(())
}
