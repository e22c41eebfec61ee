//! Field paths and accumulated field errors
//!
//! Every validation rule reports into a [`FieldErrorList`] instead of
//! returning early, so a single rejected request lists every violation.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Dotted path to a field, e.g. `spec.subclusters[1].serviceType`
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldPath(String);

impl FieldPath {
    pub fn new(root: &str) -> Self {
        Self(root.to_string())
    }

    pub fn spec() -> Self {
        Self::new("spec")
    }

    /// `metadata.annotations[<key>]`
    pub fn annotation(key: &str) -> Self {
        Self::new("metadata").child("annotations").key(key)
    }

    pub fn child(&self, name: &str) -> Self {
        if self.0.is_empty() {
            return Self::new(name);
        }
        Self(format!("{}.{}", self.0, name))
    }

    pub fn index(&self, i: usize) -> Self {
        Self(format!("{}[{}]", self.0, i))
    }

    pub fn key(&self, key: &str) -> Self {
        Self(format!("{}[{}]", self.0, key))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Category of a field violation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum FieldErrorKind {
    /// Required field is missing
    Required,
    /// Value fails a rule
    Invalid,
    /// Value is not in the allowed set
    NotSupported,
    /// Value repeats another entry
    Duplicate,
    /// Field may not be set in this context
    Forbidden,
    /// Field may not change after creation
    Immutable,
}

impl fmt::Display for FieldErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FieldErrorKind::Required => "Required value",
            FieldErrorKind::Invalid => "Invalid value",
            FieldErrorKind::NotSupported => "Unsupported value",
            FieldErrorKind::Duplicate => "Duplicate value",
            FieldErrorKind::Forbidden => "Forbidden",
            FieldErrorKind::Immutable => "Immutable value",
        };
        f.write_str(s)
    }
}

/// A single (path, offending value, reason) triple
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldError {
    pub path: FieldPath,
    pub kind: FieldErrorKind,
    pub value: serde_json::Value,
    pub message: String,
}

impl FieldError {
    pub fn new(
        kind: FieldErrorKind,
        path: FieldPath,
        value: impl Serialize,
        message: impl Into<String>,
    ) -> Self {
        Self {
            path,
            kind,
            value: serde_json::to_value(value).unwrap_or(serde_json::Value::Null),
            message: message.into(),
        }
    }

    pub fn invalid(path: FieldPath, value: impl Serialize, message: impl Into<String>) -> Self {
        Self::new(FieldErrorKind::Invalid, path, value, message)
    }

    pub fn required(path: FieldPath, message: impl Into<String>) -> Self {
        Self::new(
            FieldErrorKind::Required,
            path,
            serde_json::Value::Null,
            message,
        )
    }

    pub fn not_supported(
        path: FieldPath,
        value: impl Serialize,
        message: impl Into<String>,
    ) -> Self {
        Self::new(FieldErrorKind::NotSupported, path, value, message)
    }

    pub fn duplicate(path: FieldPath, value: impl Serialize, message: impl Into<String>) -> Self {
        Self::new(FieldErrorKind::Duplicate, path, value, message)
    }

    pub fn forbidden(path: FieldPath, value: impl Serialize, message: impl Into<String>) -> Self {
        Self::new(FieldErrorKind::Forbidden, path, value, message)
    }

    pub fn immutable(path: FieldPath, value: impl Serialize, message: impl Into<String>) -> Self {
        Self::new(FieldErrorKind::Immutable, path, value, message)
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            FieldErrorKind::Required => write!(f, "{}: {}: {}", self.path, self.kind, self.message),
            _ => write!(
                f,
                "{}: {}: {}: {}",
                self.path, self.kind, self.value, self.message
            ),
        }
    }
}

/// Ordered, append-only collection of field errors.
///
/// An empty list is the only success signal; there is no separate "nil".
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldErrorList(Vec<FieldError>);

impl FieldErrorList {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, err: FieldError) {
        self.0.push(err);
    }

    pub fn append(&mut self, mut other: FieldErrorList) {
        self.0.append(&mut other.0);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FieldError> {
        self.0.iter()
    }

    /// True when any error was reported at exactly `path`
    pub fn has_path(&self, path: &str) -> bool {
        self.0.iter().any(|e| e.path.as_str() == path)
    }

    /// True when any error message contains `needle`
    pub fn mentions(&self, needle: &str) -> bool {
        self.0.iter().any(|e| e.message.contains(needle))
    }
}

impl fmt::Display for FieldErrorList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        f.write_str(&rendered.join("; "))
    }
}

impl From<Vec<FieldError>> for FieldErrorList {
    fn from(errors: Vec<FieldError>) -> Self {
        Self(errors)
    }
}

impl FromIterator<FieldError> for FieldErrorList {
    fn from_iter<I: IntoIterator<Item = FieldError>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Extend<FieldError> for FieldErrorList {
    fn extend<I: IntoIterator<Item = FieldError>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

impl IntoIterator for FieldErrorList {
    type Item = FieldError;
    type IntoIter = std::vec::IntoIter<FieldError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a FieldErrorList {
    type Item = &'a FieldError;
    type IntoIter = std::slice::Iter<'a, FieldError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_builder_renders_kubernetes_style() {
        let p = FieldPath::spec().child("subclusters").index(2).child("name");
        assert_eq!(p.as_str(), "spec.subclusters[2].name");

        let a = FieldPath::annotation("vertica.com/k-safety");
        assert_eq!(a.as_str(), "metadata.annotations[vertica.com/k-safety]");
    }

    #[test]
    fn error_display_includes_value_and_message() {
        let e = FieldError::invalid(FieldPath::spec().child("shardCount"), 0, "Shard count must be > 0");
        assert_eq!(
            e.to_string(),
            "spec.shardCount: Invalid value: 0: Shard count must be > 0"
        );

        let r = FieldError::required(FieldPath::spec().child("verticaDBName"), "must be set");
        assert_eq!(r.to_string(), "spec.verticaDBName: Required value: must be set");
    }

    #[test]
    fn list_accumulates_and_joins() {
        let mut errs = FieldErrorList::new();
        assert!(errs.is_empty());
        errs.push(FieldError::invalid(FieldPath::new("a"), "x", "bad a"));
        errs.append(vec![FieldError::invalid(FieldPath::new("b"), "y", "bad b")].into());
        assert_eq!(errs.len(), 2);
        assert!(errs.has_path("b"));
        assert!(errs.mentions("bad a"));
        assert_eq!(
            errs.to_string(),
            "a: Invalid value: \"x\": bad a; b: Invalid value: \"y\": bad b"
        );
    }
}
