//! # Manifest Decoder
//!
//! Turns raw manifest bytes (JSON or YAML, one document) into an untyped
//! [`GenericObject`] plus its type identity.

use kube::api::DynamicObject;
use kube::core::GroupVersionKind;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors raised while decoding a manifest or reading fields out of it
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("manifest is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("manifest is not valid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("manifest must be a single object, found {found}")]
    NotAnObject { found: &'static str },
    #[error("manifest is missing required field `{0}`")]
    MissingField(&'static str),
    #[error("field `{field}` must be {expected}")]
    FieldType {
        field: &'static str,
        expected: &'static str,
    },
    #[error("invalid apiVersion `{0}`")]
    InvalidApiVersion(String),
}

/// One Kubernetes object without compile-time knowledge of its schema
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GenericObject(Map<String, Value>);

impl GenericObject {
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// `metadata.name`, or the empty string when the object carries no name
    ///
    /// # Errors
    ///
    /// Fails when `metadata` is not a mapping or `name` is not a string.
    pub fn name(&self) -> Result<&str, ManifestError> {
        Ok(self.metadata_str("name", "metadata.name")?.unwrap_or_default())
    }

    /// `metadata.namespace`, if set
    ///
    /// # Errors
    ///
    /// Fails when `metadata` is not a mapping or `namespace` is not a string.
    pub fn namespace(&self) -> Result<Option<&str>, ManifestError> {
        self.metadata_str("namespace", "metadata.namespace")
    }

    /// Group, version and kind read from `apiVersion` / `kind`
    ///
    /// # Errors
    ///
    /// Fails when either field is absent, not a string, or `apiVersion` is malformed.
    pub fn type_identity(&self) -> Result<GroupVersionKind, ManifestError> {
        let api_version = self.required_str("apiVersion")?;
        let kind = self.required_str("kind")?;
        if kind.is_empty() {
            return Err(ManifestError::MissingField("kind"));
        }
        let (group, version) = parse_api_version(api_version)?;
        Ok(GroupVersionKind::gvk(group, version, kind))
    }

    fn required_str(&self, field: &'static str) -> Result<&str, ManifestError> {
        match self.0.get(field) {
            None | Some(Value::Null) => Err(ManifestError::MissingField(field)),
            Some(Value::String(s)) => Ok(s),
            Some(_) => Err(ManifestError::FieldType {
                field,
                expected: "a string",
            }),
        }
    }

    fn metadata_str(
        &self,
        key: &str,
        field: &'static str,
    ) -> Result<Option<&str>, ManifestError> {
        let metadata = match self.0.get("metadata") {
            None | Some(Value::Null) => return Ok(None),
            Some(Value::Object(m)) => m,
            Some(_) => {
                return Err(ManifestError::FieldType {
                    field: "metadata",
                    expected: "a mapping",
                })
            }
        };
        match metadata.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(_) => Err(ManifestError::FieldType {
                field,
                expected: "a string",
            }),
        }
    }
}

impl TryFrom<Value> for GenericObject {
    type Error = ManifestError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(fields) => Ok(Self(fields)),
            other => Err(ManifestError::NotAnObject {
                found: value_kind(&other),
            }),
        }
    }
}

impl TryFrom<DynamicObject> for GenericObject {
    type Error = ManifestError;

    fn try_from(object: DynamicObject) -> Result<Self, Self::Error> {
        Self::try_from(serde_json::to_value(object)?)
    }
}

/// A decoded manifest: its type identity and the object itself
#[derive(Debug, Clone)]
pub struct DecodedManifest {
    pub type_identity: GroupVersionKind,
    pub object: GenericObject,
}

/// Decode one manifest from raw bytes
///
/// JSON input (first non-blank byte `{`) goes through `serde_json` for precise
/// errors; anything else is read as a single YAML document.
///
/// # Errors
///
/// Returns a [`ManifestError`] when the bytes are not structured data, hold
/// something other than one object, or lack `apiVersion` / `kind`.
pub fn decode_manifest(data: &[u8]) -> Result<DecodedManifest, ManifestError> {
    let looks_like_json = data
        .iter()
        .find(|b| !b.is_ascii_whitespace())
        .is_some_and(|b| *b == b'{');

    let value: Value = if looks_like_json {
        serde_json::from_slice(data)?
    } else {
        serde_yaml::from_slice(data)?
    };

    let object = GenericObject::try_from(value)?;
    let type_identity = object.type_identity()?;
    Ok(DecodedManifest {
        type_identity,
        object,
    })
}

/// Split an `apiVersion` into group and version; the core group has no prefix
fn parse_api_version(api_version: &str) -> Result<(&str, &str), ManifestError> {
    let (group, version) = match api_version.split_once('/') {
        Some((group, version)) if !group.is_empty() => (group, version),
        Some(_) => return Err(ManifestError::InvalidApiVersion(api_version.to_string())),
        None => ("", api_version),
    };
    if version.is_empty() || version.contains('/') {
        return Err(ManifestError::InvalidApiVersion(api_version.to_string()));
    }
    Ok((group, version))
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a mapping",
    }
}
