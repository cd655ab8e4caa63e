use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::dao::storage::StorageError;

/// Upper bound used to turn a key prefix into an `_all_docs` range.
pub const END_SUFFIX: &str = "\u{ffff}";

#[derive(Debug, Deserialize)]
pub struct AllDocsResponse {
    pub rows: Vec<AllDocsRow>,
}

#[derive(Debug, Deserialize)]
pub struct AllDocsRow {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct RevisionOnly {
    #[serde(rename = "_rev")]
    pub rev: String,
}

/// One CouchDB document per logical key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchKeyDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    pub value: CouchValue,
}

/// Stored payload, tagged by shape so mismatched accesses can be reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CouchValue {
    Text(String),
    Hash(BTreeMap<String, String>),
    Set(BTreeSet<String>),
}

impl CouchValue {
    fn kind(&self) -> &'static str {
        match self {
            CouchValue::Text(_) => "string",
            CouchValue::Hash(_) => "hash",
            CouchValue::Set(_) => "set",
        }
    }

    pub fn into_text(self, key: &str) -> Result<String, StorageError> {
        match self {
            CouchValue::Text(value) => Ok(value),
            other => Err(other.mismatch(key, "string")),
        }
    }

    pub fn into_hash(self, key: &str) -> Result<BTreeMap<String, String>, StorageError> {
        match self {
            CouchValue::Hash(map) => Ok(map),
            other => Err(other.mismatch(key, "hash")),
        }
    }

    pub fn into_set(self, key: &str) -> Result<BTreeSet<String>, StorageError> {
        match self {
            CouchValue::Set(set) => Ok(set),
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

/// Outcome of a read-modify-write step.
#[derive(Debug)]
pub enum Change {
    /// Leave the document untouched.
    Keep,
    /// Replace (or create) the document with this payload.
    Write(CouchValue),
    /// Delete the document.
    Remove,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_serializes_with_shape_tag() {
        let doc = CouchKeyDocument {
            id: "group:1:message_history".into(),
            rev: None,
            value: CouchValue::Hash(BTreeMap::from([("1".into(), "link".into())])),
        };

        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["_id"], "group:1:message_history");
        assert!(json.get("_rev").is_none());
        assert_eq!(json["value"]["hash"]["1"], "link");
    }

    #[test]
    fn shape_mismatch_is_reported() {
        let err = CouchValue::Text("x".into())
            .into_set("group:1:user_submissions:2")
            .unwrap_err();
        assert!(matches!(
            err,
            StorageError::WrongKind {
                expected: "set",
                found: "string",
                ..
            }
        ));
    }
}
