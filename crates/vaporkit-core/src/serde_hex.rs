//! Serde helpers for byte fields carried as hex strings

use serde::{Deserialize, Deserializer, Serializer};

pub fn serialize<S, T>(bytes: T, s: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    T: AsRef<[u8]>,
{
    s.serialize_str(&hex::encode(bytes.as_ref()))
}

pub fn deserialize<'de, D>(d: D) -> Result<Vec<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(d)?;
    hex::decode(s).map_err(serde::de::Error::custom)
}

/// Same encoding for a `ScriptBuf`
pub mod script {
    use bitcoin::ScriptBuf;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(script: &ScriptBuf, s: S) -> Result<S::Ok, S::Error> {
        super::serialize(script.as_bytes(), s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<ScriptBuf, D::Error> {
        super::deserialize(d).map(ScriptBuf::from_bytes)
    }
}
