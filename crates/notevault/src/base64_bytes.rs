//! Serde adapters that store binary payloads as base64 strings inside JSON records.
//!
//! Use with `#[serde(with = "crate::base64_bytes")]` for `Vec<u8>` fields and
//! `#[serde(with = "crate::base64_bytes::option")]` for `Option<Vec<u8>>`.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::de::{Error, Unexpected, Visitor};
use serde::{Deserialize, Deserializer, Serializer};
use std::fmt::Formatter;

pub fn serialize<S: Serializer>(data: impl AsRef<[u8]>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&STANDARD.encode(data.as_ref()))
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
    struct Base64Visitor;

    impl<'de> Visitor<'de> for Base64Visitor {
        type Value = Vec<u8>;

        fn expecting(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
            formatter.write_str("a base64 encoded string")
        }

        fn visit_str<E: Error>(self, v: &str) -> Result<Self::Value, E> {
            STANDARD
                .decode(v)
                .map_err(|_| Error::invalid_value(Unexpected::Str(v), &self))
        }
    }

    deserializer.deserialize_str(Base64Visitor)
}

pub mod option {
    use super::*;

    pub fn serialize<S: Serializer>(data: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error> {
        match data {
            Some(bytes) => serializer.serialize_some(&STANDARD.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Vec<u8>>, D::Error> {
        let encoded: Option<String> = Option::deserialize(deserializer)?;
        encoded
            .map(|s| {
                STANDARD
                    .decode(&s)
                    .map_err(|_| D::Error::invalid_value(Unexpected::Str(&s), &"a base64 encoded string"))
            })
            .transpose()
    }
}
