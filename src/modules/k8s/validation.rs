//! Validation error collection.
//!
//! Resource validators run every rule over a built definition and record one
//! [`ValidationError`] per violated rule. The collected errors become a single
//! [`ModuleError::Validation`] whose message joins them with `"; "`.

use crate::modules::{ModuleError, ModuleResult};
use std::fmt;

/// One violated rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Parameter path of the offending field, e.g. `containers[0].ports[1].name`.
    pub field: String,
    /// Full user-facing message.
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Ordered list of violations from one validation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<ValidationError>);

impl ValidationErrors {
    pub fn as_slice(&self) -> &[ValidationError] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ValidationError> {
        self.0.iter()
    }
}

impl From<Vec<ValidationError>> for ValidationErrors {
    fn from(errors: Vec<ValidationError>) -> Self {
        Self(errors)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}", error)?;
        }
        Ok(())
    }
}

/// Collector for validation errors.
#[derive(Debug, Clone, Default)]
pub struct Validation {
    errors: Vec<ValidationError>,
}

impl Validation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error.
    pub fn error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ValidationError::new(field, message));
    }

    /// Record `message` against `field` unless `ok` holds.
    pub fn check(&mut self, ok: bool, field: impl Into<String>, message: impl Into<String>) {
        if !ok {
            self.error(field, message);
        }
    }

    /// Record `"{field} {rule}"` unless `ok` holds.
    ///
    /// This is the common shape for grammar violations such as
    /// `ports[0].name should be a lowercase DNS-1123 Label Name...`.
    pub fn check_field(&mut self, ok: bool, field: impl Into<String>, rule: &str) {
        if !ok {
            let field = field.into();
            let message = format!("{} {}", field, rule);
            self.errors.push(ValidationError { field, message });
        }
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    /// Merge another collector into this one, preserving order.
    pub fn merge(&mut self, other: Validation) {
        self.errors.extend(other.errors);
    }

    /// Convert into a module result, failing with every collected error.
    pub fn into_result(self) -> ModuleResult<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ModuleError::Validation(ValidationErrors(self.errors)))
        }
    }
}
