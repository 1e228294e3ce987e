//! Form checking shared by the checkout, auth and account pages.
//!
//! A form may continue only when its own constraints hold (required fields
//! filled in, values within length limits) and every field passes its
//! validation rule. Failures are never errors: the handler re-renders the
//! form with the failing fields marked.

use tienda_core::validation::{FieldContext, can_continue, invalid_fields};

/// Longest value any text input accepts.
const MAX_FIELD_LEN: usize = 255;

/// Names of the fields that failed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(Vec<String>);

impl FieldErrors {
    /// A single failing field.
    #[must_use]
    pub fn single(field: &str) -> Self {
        Self(vec![field.to_string()])
    }

    /// Whether `field` failed. Used by templates.
    #[must_use]
    pub fn has(&self, field: &str) -> bool {
        self.0.iter().any(|name| name == field)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn push(&mut self, field: &str) {
        if !self.has(field) {
            self.0.push(field.to_string());
        }
    }
}

/// Check a submitted form.
///
/// Values are checked as given; callers trim text inputs first. Blank
/// optional fields are skipped; blank required fields fail the form's
/// constraints.
///
/// # Errors
///
/// Returns the failing field names.
pub fn check(
    fields: &[(&str, &str)],
    required: &[&str],
    ctx: &FieldContext<'_>,
) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::default();

    for (name, value) in fields {
        if (value.trim().is_empty() && required.contains(name)) || value.len() > MAX_FIELD_LEN {
            errors.push(name);
        }
    }

    let present: Vec<(&str, &str)> = fields
        .iter()
        .filter(|(_, value)| !value.trim().is_empty())
        .copied()
        .collect();

    if can_continue(&present, ctx, errors.is_empty()) {
        return Ok(());
    }

    for name in invalid_fields(&present, ctx) {
        errors.push(name);
    }
    Err(errors)
}

/// Trimmed value, `None` when blank.
#[must_use]
pub fn optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(String::from)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_form_continues() {
        let fields = [("email", "ana@example.cl"), ("first_name", "Ana")];
        assert!(check(&fields, &["email", "first_name"], &FieldContext::default()).is_ok());
    }

    #[test]
    fn test_blank_required_field_blocks() {
        let fields = [("email", "  "), ("first_name", "Ana")];
        let errors = check(&fields, &["email"], &FieldContext::default()).unwrap_err();
        assert!(errors.has("email"));
        assert!(!errors.has("first_name"));
    }

    #[test]
    fn test_blank_optional_field_is_skipped() {
        let fields = [("email", "ana@example.cl"), ("rut", "")];
        assert!(check(&fields, &["email"], &FieldContext::default()).is_ok());

        let fields = [("email", "ana@example.cl"), ("rut", "12.345.678-0")];
        let errors = check(&fields, &["email"], &FieldContext::default()).unwrap_err();
        assert!(errors.has("rut"));
    }

    #[test]
    fn test_rule_failures_are_reported_with_constraint_failures() {
        let fields = [("email", "no-at-sign"), ("first_name", "")];
        let errors = check(&fields, &["email", "first_name"], &FieldContext::default()).unwrap_err();
        assert!(errors.has("email"));
        assert!(errors.has("first_name"));
    }

    #[test]
    fn test_confirm_password_uses_context() {
        let fields = [("password", "Abcdefg1"), ("confirm_password", "Abcdefg1")];
        let ctx = FieldContext::with_password("Abcdefg1");
        assert!(check(&fields, &["password", "confirm_password"], &ctx).is_ok());

        let fields = [("password", "Abcdefg1"), ("confirm_password", "Abcdefg2")];
        let errors = check(&fields, &["password", "confirm_password"], &ctx).unwrap_err();
        assert_eq!(errors, FieldErrors::single("confirm_password"));
    }

    #[test]
    fn test_overlong_value_blocks() {
        let long = "a".repeat(MAX_FIELD_LEN + 1);
        let fields = [("street_notes", long.as_str())];
        assert!(check(&fields, &[], &FieldContext::default()).is_err());
    }

    #[test]
    fn test_optional() {
        assert_eq!(optional(Some("  depto 4 ")), Some("depto 4".to_string()));
        assert_eq!(optional(Some("   ")), None);
        assert_eq!(optional(None), None);
    }
}
