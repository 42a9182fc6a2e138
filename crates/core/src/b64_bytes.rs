// SPDX-License-Identifier: BUSL-1.1

//! `serde(with = ...)` helper for encoding an opaque [`bytes::Bytes`] payload
//! as base64 in JSON wire formats (lane message payloads, snapshots).

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use serde::{Deserialize, Deserializer, Serializer};

pub fn serialize<S: Serializer>(bytes: &Bytes, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&STANDARD.encode(bytes))
}

pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Bytes, D::Error> {
    let s = String::deserialize(d)?;
    STANDARD.decode(s.as_bytes()).map(Bytes::from).map_err(serde::de::Error::custom)
}
