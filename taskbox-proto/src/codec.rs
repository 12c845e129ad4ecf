//! Text encoding for persisted `TaskBox` state.
//!
//! Store snapshots are written as JSON so that the persisted payload stays a
//! stable, human-readable string. The layout carries no version field: a
//! project snapshot is a bare JSON array of [`Project`] records.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::project::Project;

/// Storage key holding the project collection.
pub const PROJECT_STORAGE_KEY: &str = "project-storage";

/// Error type for codec encode/decode operations.
#[derive(Debug, thiserror::Error)]
#[error("serialization error: {0}")]
pub struct CodecError(#[from] serde_json::Error);

/// Encodes any serializable value as a JSON string.
///
/// # Errors
///
/// Returns [`CodecError`] if the value cannot be serialized.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<String, CodecError> {
    Ok(serde_json::to_string(value)?)
}

/// Decodes a JSON string into `T`.
///
/// # Errors
///
/// Returns [`CodecError`] if the text is not valid JSON for `T`.
pub fn decode<T: DeserializeOwned>(text: &str) -> Result<T, CodecError> {
    Ok(serde_json::from_str(text)?)
}

/// Encodes a project collection in its persisted layout.
///
/// # Errors
///
/// Returns [`CodecError`] if serialization fails.
pub fn encode_projects(projects: &[Project]) -> Result<String, CodecError> {
    encode(projects)
}

/// Decodes a persisted project collection.
///
/// # Errors
///
/// Returns [`CodecError`] if the text is not a JSON array of projects.
pub fn decode_projects(text: &str) -> Result<Vec<Project>, CodecError> {
    decode(text)
}
