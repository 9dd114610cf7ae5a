use bson::oid::ObjectId;
use bson::{doc, Document};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::role::Role;

pub mod db;

pub static USER_COLLECTION_NAME: &str = "users";

pub const SELECTED_CLASSES: &str = "selectedClasses";
pub const ENROLLED_CLASSES: &str = "enrolledClasses";

/// Class id list kept on a user document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassList {
    Selected,
    Enrolled,
}

impl ClassList {
    pub fn field(self) -> &'static str {
        match self {
            ClassList::Selected => SELECTED_CLASSES,
            ClassList::Enrolled => ENROLLED_CLASSES,
        }
    }
}

#[inline]
pub fn by_email(email: impl AsRef<str>) -> Document {
    doc! { "email": email.as_ref() }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub id: Option<ObjectId>,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub selected_classes: Vec<String>,
    #[serde(default)]
    pub enrolled_classes: Vec<String>,
}

impl User {
    pub fn new(email: impl ToString, name: Option<String>, role: Role) -> User {
        User {
            id: None,
            email: email.to_string(),
            name,
            role,
            selected_classes: vec![],
            enrolled_classes: vec![],
        }
    }
}
