//! JSON document codec for colrepo.
//!
//! A stored value is a JSON document in the table's `json` column. The
//! [`JsonCodec`] turns an [`Entity`](colrepo_types::Entity) into that
//! document and back, in one of two modes:
//!
//! - [`SerializerMode::Plain`]: the document is exactly the serde encoding
//!   of the declared type. Interoperable, but carries no shape information.
//! - [`SerializerMode::Typed`]: the document carries a [`TYPE_FIELD`]
//!   discriminator naming the concrete shape of the value, and decoding
//!   checks it against the requested type's registered shapes.

pub mod codec;
pub mod error;

pub use codec::{JsonCodec, SerializerMode, TYPE_FIELD, VALUE_FIELD};
pub use error::{CodecError, CodecResult};
