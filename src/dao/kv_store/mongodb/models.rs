use std::collections::{BTreeMap, BTreeSet};

use mongodb::bson::{Document, doc};
use serde::{Deserialize, Serialize};

use crate::dao::storage::StorageError;

/// One MongoDB document per logical key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoKeyDocument {
    #[serde(rename = "_id")]
    pub id: String,
    pub value: MongoValue,
}

/// Stored payload; sets are arrays so `$addToSet`/`$pull` can work on them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MongoValue {
    Text(String),
    Hash(BTreeMap<String, String>),
    Set(Vec<String>),
}

impl MongoValue {
    fn kind(&self) -> &'static str {
        match self {
            MongoValue::Text(_) => "string",
            MongoValue::Hash(_) => "hash",
            MongoValue::Set(_) => "set",
        }
    }

    pub fn into_text(self, key: &str) -> Result<String, StorageError> {
        match self {
            MongoValue::Text(value) => Ok(value),
            other => Err(other.mismatch(key, "string")),
        }
    }

    pub fn into_hash(self, key: &str) -> Result<BTreeMap<String, String>, StorageError> {
        match self {
            MongoValue::Hash(map) => Ok(map),
            other => Err(other.mismatch(key, "hash")),
        }
    }

    pub fn into_set(self, key: &str) -> Result<BTreeSet<String>, StorageError> {
        match self {
            MongoValue::Set(members) => Ok(members.into_iter().collect()),
            other => Err(other.mismatch(key, "set")),
        }
    }

    fn mismatch(&self, key: &str, expected: &'static str) -> StorageError {
        StorageError::WrongKind {
            key: key.to_owned(),
            expected,
            found: self.kind(),
        }
    }
}

pub fn key_filter(key: &str) -> Document {
    doc! { "_id": key }
}

/// Dotted path of a hash field. Fields are decimal numbers, so no escaping is needed.
pub fn hash_field_path(field: &str) -> String {
    format!("value.hash.{field}")
}

pub const SET_PATH: &str = "value.set";
pub const HASH_PATH: &str = "value.hash";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_values_are_stored_as_arrays() {
        let doc = MongoKeyDocument {
            id: "group:1:user_submissions:7".into(),
            value: MongoValue::Set(vec!["1".into(), "4".into()]),
        };

        let encoded = serde_json::to_value(&doc).unwrap();
        assert_eq!(encoded["_id"], "group:1:user_submissions:7");
        assert_eq!(encoded["value"]["set"].as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn hash_field_path_targets_nested_map() {
        assert_eq!(hash_field_path("12"), "value.hash.12");
    }
}
