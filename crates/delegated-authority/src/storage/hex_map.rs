//! Serde adapter for byte-keyed maps.
//!
//! JSON object keys must be strings, so app storage is written as
//! `{ "<hex key>": "<hex value>" }`. Binary formats get the map as-is.

use std::collections::BTreeMap;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::ledger::Storage;

pub fn serialize<S: Serializer>(map: &Storage, serializer: S) -> Result<S::Ok, S::Error> {
    if serializer.is_human_readable() {
        let encoded: BTreeMap<String, String> = map
            .iter()
            .map(|(k, v)| (hex::encode(k), hex::encode(v)))
            .collect();
        encoded.serialize(serializer)
    } else {
        map.serialize(serializer)
    }
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Storage, D::Error> {
    if deserializer.is_human_readable() {
        let encoded = BTreeMap::<String, String>::deserialize(deserializer)?;
        encoded
            .into_iter()
            .map(|(k, v)| {
                let key = hex::decode(&k).map_err(D::Error::custom)?;
                let value = hex::decode(&v).map_err(D::Error::custom)?;
                Ok((key, value))
            })
            .collect()
    } else {
        Storage::deserialize(deserializer)
    }
}
