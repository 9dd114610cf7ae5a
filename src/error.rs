use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("configuration file not found in '{0}'")]
    NotFound(PathBuf),
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Failure of a single document store call.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Database(#[from] mongodb::error::Error),
    #[error(transparent)]
    BsonSerialization(#[from] bson::ser::Error),
    #[error(transparent)]
    BsonDeserialization(#[from] bson::de::Error),

    #[error("unsupported {kind} '{operator}'")]
    Unsupported {
        kind: &'static str,
        operator: String,
    },
    #[error("field '{0}' is not an array")]
    NotAnArray(String),
    #[error("field '{0}' is not numeric")]
    NotNumeric(String),
    #[error("write to '{0}' matched no document; transaction rolled back")]
    Unmatched(String),
    #[error("write to '{0}' rejected")]
    Rejected(String),
    #[error("read from '{0}' rejected")]
    Unreadable(String),
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("no user with email '{0}'")]
    NotFound(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum BackendError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    // External errors
    #[error(transparent)]
    Database(#[from] mongodb::error::Error),
    #[error(transparent)]
    Cors(#[from] rocket_cors::Error),
}
