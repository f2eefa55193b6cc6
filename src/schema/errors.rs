//! Validation error collection keyed by field path.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

/// Field path → messages, ordered by path for deterministic output.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Path used when the input itself has the wrong shape.
pub const ROOT_PATH: &str = "_root";

// == Validation Errors ==
/// Every failing field of one validation pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    fields: FieldErrors,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a message for `path`. Duplicate messages for the same path are kept once.
    pub fn add(&mut self, path: impl Into<String>, message: impl Into<String>) {
        let message = message.into();
        let messages = self.fields.entry(path.into()).or_default();
        if !messages.contains(&message) {
            messages.push(message);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Number of failing fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.fields.contains_key(path)
    }

    /// Messages recorded for `path`, empty if the field passed.
    pub fn messages(&self, path: &str) -> &[String] {
        self.fields.get(path).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn fields(&self) -> &FieldErrors {
        &self.fields
    }

    pub fn into_fields(self) -> FieldErrors {
        self.fields
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (path, messages) in &self.fields {
            if !first {
                write!(f, "; ")?;
            }
            first = false;
            write!(f, "{}: {}", path, messages.join(", "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_deduplicates_messages() {
        let mut errors = ValidationErrors::new();
        errors.add("name", "Required");
        errors.add("name", "Required");
        errors.add("name", "Too short");

        assert_eq!(errors.len(), 1);
        assert_eq!(errors.messages("name"), ["Required", "Too short"]);
    }

    #[test]
    fn test_display_lists_every_field() {
        let mut errors = ValidationErrors::new();
        errors.add("price", "Must be at least 0");
        errors.add("name", "Required");

        assert_eq!(errors.to_string(), "name: Required; price: Must be at least 0");
    }

    #[test]
    fn test_messages_for_passing_field_is_empty() {
        let errors = ValidationErrors::new();
        assert!(errors.messages("anything").is_empty());
        assert!(errors.is_empty());
    }
}
