//! Document conversion helpers.

use bson::{Bson, Document, oid::ObjectId};
use chrono::{DateTime, Utc};
use serde::{Serialize, de::DeserializeOwned};

use crate::error::{MongoError, MongoResult};

/// Typed accessors over raw BSON documents.
pub trait DocumentExt {
    /// Get a string value.
    fn get_str(&self, key: &str) -> MongoResult<&str>;

    /// Get an i64 value, widening from i32 when needed.
    fn get_i64(&self, key: &str) -> MongoResult<i64>;

    /// Get an f64 value.
    fn get_f64(&self, key: &str) -> MongoResult<f64>;

    /// Get a bool value.
    fn get_bool(&self, key: &str) -> MongoResult<bool>;

    /// Get an ObjectId value.
    fn get_object_id(&self, key: &str) -> MongoResult<ObjectId>;

    /// Get a datetime value as UTC.
    fn get_datetime_utc(&self, key: &str) -> MongoResult<DateTime<Utc>>;

    /// Get a nested document.
    fn get_document(&self, key: &str) -> MongoResult<&Document>;

    /// Get an array value.
    fn get_array(&self, key: &str) -> MongoResult<&Vec<Bson>>;

    /// Deserialize the whole document into a typed value.
    fn to_struct<T: DeserializeOwned>(&self) -> MongoResult<T>;

    /// Get the `_id` field as an ObjectId.
    fn id(&self) -> MongoResult<ObjectId>;
}

fn type_error(key: &str, expected: &str) -> MongoError {
    MongoError::query(format!("field '{key}' is not {expected}"))
}

impl DocumentExt for Document {
    fn get_str(&self, key: &str) -> MongoResult<&str> {
        self.get_str(key).map_err(|_| type_error(key, "a string"))
    }

    fn get_i64(&self, key: &str) -> MongoResult<i64> {
        match self.get(key) {
            Some(Bson::Int64(n)) => Ok(*n),
            Some(Bson::Int32(n)) => Ok(i64::from(*n)),
            _ => Err(type_error(key, "an integer")),
        }
    }

    fn get_f64(&self, key: &str) -> MongoResult<f64> {
        self.get_f64(key).map_err(|_| type_error(key, "a double"))
    }

    fn get_bool(&self, key: &str) -> MongoResult<bool> {
        self.get_bool(key).map_err(|_| type_error(key, "a bool"))
    }

    fn get_object_id(&self, key: &str) -> MongoResult<ObjectId> {
        self.get_object_id(key)
            .map_err(|_| type_error(key, "an ObjectId"))
    }

    fn get_datetime_utc(&self, key: &str) -> MongoResult<DateTime<Utc>> {
        self.get_datetime(key)
            .map(|dt| dt.to_chrono())
            .map_err(|_| type_error(key, "a datetime"))
    }

    fn get_document(&self, key: &str) -> MongoResult<&Document> {
        self.get_document(key)
            .map_err(|_| type_error(key, "a document"))
    }

    fn get_array(&self, key: &str) -> MongoResult<&Vec<Bson>> {
        self.get_array(key).map_err(|_| type_error(key, "an array"))
    }

    fn to_struct<T: DeserializeOwned>(&self) -> MongoResult<T> {
        Ok(bson::from_document(self.clone())?)
    }

    fn id(&self) -> MongoResult<ObjectId> {
        DocumentExt::get_object_id(self, "_id")
    }
}

/// Serialize a typed value into a BSON document.
pub fn to_document<T: Serialize>(value: &T) -> MongoResult<Document> {
    Ok(bson::to_document(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use pretty_assertions::assert_eq;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct RegionTotal {
        #[serde(rename = "_id")]
        region: String,
        total: i64,
    }

    #[test]
    fn test_typed_accessors() {
        let oid = ObjectId::new();
        let doc = doc! {
            "_id": oid,
            "name": "Alice",
            "count": 41_i32,
            "big": 5_000_000_000_i64,
            "ratio": 0.5,
            "active": true,
        };

        assert_eq!(DocumentExt::get_str(&doc, "name").unwrap(), "Alice");
        assert_eq!(DocumentExt::get_i64(&doc, "count").unwrap(), 41);
        assert_eq!(DocumentExt::get_i64(&doc, "big").unwrap(), 5_000_000_000);
        assert_eq!(DocumentExt::get_f64(&doc, "ratio").unwrap(), 0.5);
        assert!(DocumentExt::get_bool(&doc, "active").unwrap());
        assert_eq!(doc.id().unwrap(), oid);
    }

    #[test]
    fn test_type_mismatch_error() {
        let doc = doc! { "name": 42 };
        let err = DocumentExt::get_str(&doc, "name").unwrap_err();
        assert_eq!(err.to_string(), "query error: field 'name' is not a string");
    }

    #[test]
    fn test_round_trip_struct() {
        let value = RegionTotal {
            region: "emea".into(),
            total: 120,
        };
        let doc = to_document(&value).unwrap();
        assert_eq!(doc.get_str("_id").unwrap(), "emea");

        let back: RegionTotal = doc.to_struct().unwrap();
        assert_eq!(back, value);
    }
}
