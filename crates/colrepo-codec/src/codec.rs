use colrepo_types::Entity;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{CodecError, CodecResult};

/// Discriminator field written by typed mode.
pub const TYPE_FIELD: &str = "$type";

/// Payload field used when a typed value does not encode as a JSON object.
pub const VALUE_FIELD: &str = "$value";

/// Document encoding policy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SerializerMode {
    /// Encode and decode exactly the declared type.
    #[default]
    Plain,
    /// Embed the concrete shape name and honor it on decode.
    Typed,
}

/// Encodes entities to JSON documents and decodes them back.
///
/// Decoding never attempts partial recovery: a malformed document or one
/// whose discriminator is not registered for the requested type fails.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct JsonCodec {
    mode: SerializerMode,
    indent: bool,
}

impl JsonCodec {
    pub fn new(mode: SerializerMode) -> Self {
        Self { mode, indent: false }
    }

    /// A codec in [`SerializerMode::Plain`].
    pub fn plain() -> Self {
        Self::new(SerializerMode::Plain)
    }

    /// A codec in [`SerializerMode::Typed`].
    pub fn typed() -> Self {
        Self::new(SerializerMode::Typed)
    }

    /// Write indented (pretty) documents instead of compact ones.
    pub fn with_indent(mut self, indent: bool) -> Self {
        self.indent = indent;
        self
    }

    pub fn mode(&self) -> SerializerMode {
        self.mode
    }

    /// Encode a value as a document.
    pub fn encode<V: Entity>(&self, value: &V) -> CodecResult<String> {
        match self.mode {
            SerializerMode::Plain => self.write(value),
            SerializerMode::Typed => self.write(&Self::tag(value)?),
        }
    }

    /// Decode a document into `V`.
    pub fn decode<V: Entity>(&self, document: &str) -> CodecResult<V> {
        match self.mode {
            SerializerMode::Plain => serde_json::from_str(document).map_err(CodecError::Decode),
            SerializerMode::Typed => {
                let doc: Value = serde_json::from_str(document).map_err(CodecError::Decode)?;
                let doc = Self::untag::<V>(doc)?;
                serde_json::from_value(doc).map_err(CodecError::Decode)
            }
        }
    }

    fn write<T: Serialize + ?Sized>(&self, value: &T) -> CodecResult<String> {
        let out = if self.indent {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        };
        out.map_err(CodecError::Encode)
    }

    /// Attach the discriminator. A serde-tagged enum already wrote it.
    fn tag<V: Entity>(value: &V) -> CodecResult<Value> {
        let shape = value.shape();
        match serde_json::to_value(value).map_err(CodecError::Encode)? {
            Value::Object(mut map) => {
                map.entry(TYPE_FIELD)
                    .or_insert_with(|| Value::String(shape.to_string()));
                Ok(Value::Object(map))
            }
            other => {
                let mut map = Map::new();
                map.insert(TYPE_FIELD.to_string(), Value::String(shape.to_string()));
                map.insert(VALUE_FIELD.to_string(), other);
                Ok(Value::Object(map))
            }
        }
    }

    /// Check the discriminator, if any, and strip what serde must not see.
    fn untag<V: Entity>(doc: Value) -> CodecResult<Value> {
        let Value::Object(mut map) = doc else {
            return Ok(doc);
        };
        let tag = match map.get(TYPE_FIELD) {
            None => return Ok(Value::Object(map)),
            Some(Value::String(tag)) => tag.clone(),
            Some(other) => return Err(CodecError::InvalidDiscriminator(other.to_string())),
        };
        if !V::accepts_shape(&tag) {
            return Err(CodecError::UnregisteredShape {
                found: tag,
                expected: V::TABLE_NAME,
            });
        }
        if map.len() == 2 {
            if let Some(payload) = map.remove(VALUE_FIELD) {
                return Ok(payload);
            }
        }
        // Tagged enums dispatch on the discriminator themselves.
        if !V::is_polymorphic() {
            map.remove(TYPE_FIELD);
        }
        Ok(Value::Object(map))
    }
}
