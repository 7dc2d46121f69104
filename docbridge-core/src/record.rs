//! The canonical document shape returned by every backend.
//!
//! A [`Record`] couples the backend-native identity with the caller-supplied
//! [`Fields`] and the store-managed `createdAt`/`updatedAt` pair. Backends keep
//! the identity out of band and persist the fields and timestamps as one BSON
//! document (see [`Record::to_stored`]).

use bson::{Bson, DateTime, Document, de::deserialize_from_bson};
use serde::{Serialize, Serializer, de::DeserializeOwned, ser::SerializeMap};
use serde_json::{Value, to_value};

use crate::error::{DocumentStoreError, DocumentStoreResult};

/// Caller-supplied document fields: an ordered map of tagged values.
pub type Fields = Document;

/// Key under which the identity is surfaced in serialized records.
pub const ID_FIELD: &str = "id";
/// Primary key used natively by flat collection stores.
pub const NATIVE_ID_FIELD: &str = "_id";
/// Creation timestamp key.
pub const CREATED_AT_FIELD: &str = "createdAt";
/// Last-update timestamp key.
pub const UPDATED_AT_FIELD: &str = "updatedAt";

/// Keys the store owns; they are stripped from caller payloads.
pub const RESERVED_FIELDS: [&str; 4] = [ID_FIELD, NATIVE_ID_FIELD, CREATED_AT_FIELD, UPDATED_AT_FIELD];

/// A document as a backend holds it: the native identity plus the persisted
/// fields and timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: String,
    pub document: Document,
}

impl StoredDocument {
    pub fn new(id: impl Into<String>, document: Document) -> Self {
        Self { id: id.into(), document }
    }

    /// Converts into the canonical shape. See [`Record::from_stored`].
    pub fn into_record(self) -> DocumentStoreResult<Record> {
        Record::from_stored(self.id, self.document)
    }
}

impl From<&Record> for StoredDocument {
    fn from(record: &Record) -> Self {
        Self::new(record.id.clone(), record.to_stored())
    }
}

/// A stored document with its identity and timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Backend-native reference. Immutable after creation.
    pub id: String,
    /// Caller-supplied fields, never containing a reserved key.
    pub fields: Fields,
    /// Set exactly once, when the document is created.
    pub created_at: DateTime,
    /// Re-stamped on every update; never earlier than `created_at`.
    pub updated_at: DateTime,
}

impl Record {
    /// Creates a record, stripping reserved keys from `fields`.
    pub fn new(id: impl Into<String>, fields: Fields, created_at: DateTime, updated_at: DateTime) -> Self {
        Self {
            id: id.into(),
            fields: strip_reserved(fields),
            created_at,
            updated_at,
        }
    }

    /// Rebuilds a record from the identity and the document a backend stored.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::InvalidDocument`] if either timestamp is
    /// missing or is not a datetime.
    pub fn from_stored(id: impl Into<String>, mut stored: Document) -> DocumentStoreResult<Self> {
        let id = id.into();
        let created_at = take_timestamp(&mut stored, CREATED_AT_FIELD, &id)?;
        let updated_at = take_timestamp(&mut stored, UPDATED_AT_FIELD, &id)?;

        Ok(Self::new(id, stored, created_at, updated_at))
    }

    /// Returns the document a backend should persist: fields plus timestamps,
    /// without the identity.
    pub fn to_stored(&self) -> Document {
        let mut stored = self.fields.clone();
        stored.insert(CREATED_AT_FIELD, self.created_at);
        stored.insert(UPDATED_AT_FIELD, self.updated_at);
        stored
    }

    /// Returns the flat representation `{ id, ...fields, createdAt, updatedAt }`.
    pub fn to_bson(&self) -> Bson {
        let mut flat = Document::new();
        flat.insert(ID_FIELD, self.id.clone());
        flat.extend(self.to_stored());
        Bson::Document(flat)
    }

    /// Converts this record to a flat JSON value.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> DocumentStoreResult<Value> {
        Ok(to_value(self)?)
    }

    /// Deserializes the flat representation into a caller type.
    ///
    /// # Errors
    ///
    /// Returns an error if the record does not match the shape of `T`.
    pub fn deserialize<T: DeserializeOwned>(&self) -> DocumentStoreResult<T> {
        Ok(deserialize_from_bson(self.to_bson())?)
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len() + 3))?;
        map.serialize_entry(ID_FIELD, &self.id)?;
        for (key, value) in &self.fields {
            map.serialize_entry(key, value)?;
        }
        map.serialize_entry(CREATED_AT_FIELD, &self.created_at)?;
        map.serialize_entry(UPDATED_AT_FIELD, &self.updated_at)?;
        map.end()
    }
}

/// Removes every reserved key from a caller payload.
pub fn strip_reserved(mut fields: Fields) -> Fields {
    for key in RESERVED_FIELDS {
        fields.remove(key);
    }
    fields
}

/// Returns a timestamp strictly later than `previous`, preferring the current time.
///
/// BSON datetimes have millisecond resolution, so two writes inside the same
/// millisecond would otherwise share a timestamp.
pub fn next_timestamp(previous: DateTime) -> DateTime {
    let now = DateTime::now();

    if now > previous {
        now
    } else {
        DateTime::from_millis(previous.timestamp_millis() + 1)
    }
}

fn take_timestamp(stored: &mut Document, key: &str, id: &str) -> DocumentStoreResult<DateTime> {
    match stored.remove(key) {
        Some(Bson::DateTime(value)) => Ok(value),
        Some(other) => Err(DocumentStoreError::InvalidDocument(format!(
            "{} of document {} is not a datetime: {}",
            key, id, other
        ))),
        None => Err(DocumentStoreError::InvalidDocument(format!(
            "document {} has no {}",
            id, key
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use serde::Deserialize;

    fn sample() -> Record {
        Record::new(
            "abc",
            doc! { "title": "Hello", "views": 3 },
            DateTime::from_millis(1_000),
            DateTime::from_millis(2_000),
        )
    }

    #[test]
    fn reserved_keys_are_stripped() {
        let record = Record::new(
            "abc",
            doc! { "id": "forged", "_id": 1, "createdAt": 0, "name": "x" },
            DateTime::from_millis(0),
            DateTime::from_millis(0),
        );

        assert_eq!(record.fields, doc! { "name": "x" });
    }

    #[test]
    fn stored_form_round_trips() {
        let record = sample();
        let restored = Record::from_stored("abc", record.to_stored()).unwrap();

        assert_eq!(restored, record);
    }

    #[test]
    fn missing_timestamp_is_invalid() {
        let err = Record::from_stored("abc", doc! { "title": "x" }).unwrap_err();

        assert!(matches!(err, DocumentStoreError::InvalidDocument(_)));
    }

    #[test]
    fn flat_form_surfaces_identity() {
        let flat = sample().to_bson();
        let flat = flat.as_document().unwrap();

        assert_eq!(flat.get_str("id").unwrap(), "abc");
        assert_eq!(flat.get_str("title").unwrap(), "Hello");
        assert!(flat.get_datetime("updatedAt").is_ok());
    }

    #[test]
    fn json_form_is_flat() {
        let json = sample().to_json().unwrap();

        assert_eq!(json["id"], "abc");
        assert_eq!(json["title"], "Hello");
        assert_eq!(json["views"], 3);
        assert!(json.get("createdAt").is_some());
        assert!(json.get("updatedAt").is_some());
    }

    #[test]
    fn deserializes_into_caller_type() {
        #[derive(Deserialize)]
        struct Post {
            id: String,
            title: String,
        }

        let post: Post = sample().deserialize().unwrap();

        assert_eq!(post.id, "abc");
        assert_eq!(post.title, "Hello");
    }

    #[test]
    fn next_timestamp_is_strictly_later() {
        let future = DateTime::from_millis(DateTime::now().timestamp_millis() + 60_000);

        assert_eq!(next_timestamp(future).timestamp_millis(), future.timestamp_millis() + 1);
        assert!(next_timestamp(DateTime::from_millis(0)) > DateTime::from_millis(0));
    }
}
