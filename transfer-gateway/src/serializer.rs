//! Payload serializers
//!
//! A gateway stores outbound requests in its queue and inbound responses in
//! its cache as opaque bytes. [`DataSerializer`] is the conversion contract;
//! one serializer value may implement it for several payload types.

use crate::{Error, Result};
use serde::{de::DeserializeOwned, Serialize};

/// Converts a payload of type `T` to bytes and back
pub trait DataSerializer<T> {
    /// Encode `value`; fails with [`Error::Serialize`] on unsupported shapes
    fn serialize(&self, value: &T) -> Result<Vec<u8>>;

    /// Decode `bytes`; fails with [`Error::Unserialize`] on invalid input
    fn deserialize(&self, bytes: &[u8]) -> Result<T>;
}

/// Compact binary encoding for any serde type (default)
#[derive(Debug, Default, Clone, Copy)]
pub struct BincodeSerializer;

impl<T> DataSerializer<T> for BincodeSerializer
where
    T: Serialize + DeserializeOwned,
{
    fn serialize(&self, value: &T) -> Result<Vec<u8>> {
        bincode::serialize(value).map_err(|e| Error::Serialize(e.to_string()))
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<T> {
        bincode::deserialize(bytes).map_err(|e| Error::Unserialize(e.to_string()))
    }
}

/// JSON encoding for any serde type, readable when inspecting storage
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonSerializer;

impl<T> DataSerializer<T> for JsonSerializer
where
    T: Serialize + DeserializeOwned,
{
    fn serialize(&self, value: &T) -> Result<Vec<u8>> {
        serde_json::to_vec(value).map_err(|e| Error::Serialize(e.to_string()))
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<T> {
        serde_json::from_slice(bytes).map_err(|e| Error::Unserialize(e.to_string()))
    }
}
