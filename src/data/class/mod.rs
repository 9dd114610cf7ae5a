use bson::oid::ObjectId;
use bson::{doc, Bson, Document};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use utoipa::ToSchema;

use crate::util::lenient;

pub mod db;

pub static CLASS_COLLECTION_NAME: &str = "classes";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ClassStatus {
    #[default]
    Pending,
    Approved,
    /// Never written; rejected classes are deleted.
    Denied,
}

impl Display for ClassStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ClassStatus::Pending => write!(f, "pending"),
            ClassStatus::Approved => write!(f, "approved"),
            ClassStatus::Denied => write!(f, "denied"),
        }
    }
}

/// Class identifier as seen by clients.
///
/// Store-generated ids are 24 hex digits and are matched against `_id` as an ObjectId.
/// Anything else is matched as a plain string so it can never hit a generated id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassId(String);

impl ClassId {
    pub fn new(id: impl Into<String>) -> ClassId {
        ClassId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn key(&self) -> Bson {
        match ObjectId::parse_str(&self.0) {
            Ok(oid) => Bson::ObjectId(oid),
            Err(_) => Bson::String(self.0.clone()),
        }
    }

    pub fn filter(&self) -> Document {
        doc! { "_id": self.key() }
    }
}

impl From<&str> for ClassId {
    fn from(id: &str) -> Self {
        ClassId::new(id)
    }
}

impl From<ObjectId> for ClassId {
    fn from(id: ObjectId) -> Self {
        ClassId(id.to_hex())
    }
}

impl Display for ClassId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Inclusion projection over `fields`.
pub fn projection<S: AsRef<str>>(fields: &[S]) -> Document {
    fields
        .iter()
        .map(|field| (field.as_ref().to_string(), Bson::Int32(1)))
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Class {
    #[serde(
        rename = "_id",
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "crate::util::object_id_hex::serialize"
    )]
    #[schema(value_type = Option<String>)]
    pub id: Option<ObjectId>,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::f64")]
    pub price: f64,
    #[serde(default)]
    pub img: String,
    #[serde(default)]
    pub status: ClassStatus,
    #[serde(default, deserialize_with = "lenient::i64")]
    pub seats: i64,
    #[serde(default, deserialize_with = "lenient::i64")]
    pub attended: i64,
    #[serde(default)]
    pub instructor_email: String,
    #[serde(default)]
    pub instructor_name: Option<String>,
}

/// Projected class returned by student listings. Fields outside the projection are
/// omitted.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ClassSummary {
    #[serde(
        rename = "_id",
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "crate::util::object_id_hex::serialize"
    )]
    #[schema(value_type = Option<String>)]
    pub id: Option<ObjectId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub img: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::option_f64"
    )]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ClassStatus>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::option_i64"
    )]
    pub seats: Option<i64>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::option_i64"
    )]
    pub attended: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructor_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructor_email: Option<String>,
}
