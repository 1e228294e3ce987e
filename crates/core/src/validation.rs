//! Form field validators.
//!
//! Each known field name maps to a [`FieldRule`]: a pattern, optionally built
//! per call from other fields of the same form, plus an optional predicate for
//! checks a regular expression cannot express. Unknown fields always pass.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::types::Rut;

/// Other values of the form being validated.
///
/// Only `password` is consulted today, by `confirm_password`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldContext<'a> {
    pub password: Option<&'a str>,
}

impl<'a> FieldContext<'a> {
    #[must_use]
    pub const fn with_password(password: &'a str) -> Self {
        Self {
            password: Some(password),
        }
    }
}

/// Validation rule for one field.
pub struct FieldRule {
    pattern: Regex,
    dynamic_pattern: Option<fn(&FieldContext<'_>) -> String>,
    predicate: Option<fn(&str) -> bool>,
}

impl FieldRule {
    fn pattern(pattern: &str) -> Self {
        Self {
            pattern: Regex::new(pattern).expect("Invalid regex"),
            dynamic_pattern: None,
            predicate: None,
        }
    }

    fn with_predicate(mut self, predicate: fn(&str) -> bool) -> Self {
        self.predicate = Some(predicate);
        self
    }

    fn with_dynamic_pattern(mut self, build: fn(&FieldContext<'_>) -> String) -> Self {
        self.dynamic_pattern = Some(build);
        self
    }

    /// Whether `value` satisfies this rule.
    #[must_use]
    pub fn accepts(&self, value: &str, ctx: &FieldContext<'_>) -> bool {
        let matches = match self.dynamic_pattern {
            Some(build) => Regex::new(&build(ctx)).is_ok_and(|re| re.is_match(value)),
            None => self.pattern.is_match(value),
        };
        matches && self.predicate.is_none_or(|check| check(value))
    }
}

fn password_strength(value: &str) -> bool {
    value.chars().any(|c| c.is_ascii_lowercase())
        && value.chars().any(|c| c.is_ascii_uppercase())
        && value.chars().any(|c| c.is_ascii_digit())
}

fn rut_check_digit(value: &str) -> bool {
    Rut::parse(value).is_ok()
}

fn confirm_password_pattern(ctx: &FieldContext<'_>) -> String {
    format!("^{}$", regex::escape(ctx.password.unwrap_or_default()))
}

static RULES: LazyLock<HashMap<&'static str, FieldRule>> = LazyLock::new(|| {
    HashMap::from([
        ("email", FieldRule::pattern(r"^[^\s@]+@[^\s@]+\.[^\s@]+$")),
        ("phone", FieldRule::pattern(r"^(\+?56)?\s?9\s?\d{4}\s?\d{4}$")),
        (
            "rut",
            FieldRule::pattern(r"^\d{1,2}\.?\d{3}\.?\d{3}-?[\dkK]$").with_predicate(rut_check_digit),
        ),
        (
            "password",
            FieldRule::pattern(r"^\S{8,64}$").with_predicate(password_strength),
        ),
        (
            "confirm_password",
            FieldRule::pattern(r"^$").with_dynamic_pattern(confirm_password_pattern),
        ),
        ("first_name", FieldRule::pattern(r"^\p{L}[\p{L}' -]{1,49}$")),
        ("last_name", FieldRule::pattern(r"^\p{L}[\p{L}' -]{1,49}$")),
        ("address", FieldRule::pattern(r"^[\p{L}\d][\p{L}\d .,'#-]{2,99}$")),
        ("address_number", FieldRule::pattern(r"^(\d{1,6}[a-zA-Z]?|[sS]/[nN])$")),
        ("apartment", FieldRule::pattern(r"^[\p{L}\d #-]{0,20}$")),
    ])
});

/// The rule for `name`, if one exists.
#[must_use]
pub fn rule(name: &str) -> Option<&'static FieldRule> {
    RULES.get(name)
}

/// Whether `value` is valid for the field `name`.
///
/// Fields without a rule are always valid.
#[must_use]
pub fn is_valid_field(name: &str, value: &str, ctx: &FieldContext<'_>) -> bool {
    rule(name).is_none_or(|rule| rule.accepts(value, ctx))
}

/// Names of the fields in `fields` that fail their rule.
#[must_use]
pub fn invalid_fields<'f>(fields: &[(&'f str, &str)], ctx: &FieldContext<'_>) -> Vec<&'f str> {
    fields
        .iter()
        .filter(|(name, value)| !is_valid_field(name, value, ctx))
        .map(|(name, _)| *name)
        .collect()
}

/// Gate for a step's "continue" action.
///
/// `form_valid` is the form's own constraint check (required fields present,
/// length limits). Both it and every field rule must pass.
#[must_use]
pub fn can_continue(fields: &[(&str, &str)], ctx: &FieldContext<'_>, form_valid: bool) -> bool {
    form_valid && invalid_fields(fields, ctx).is_empty()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn valid(name: &str, value: &str) -> bool {
        is_valid_field(name, value, &FieldContext::default())
    }

    #[test]
    fn test_password() {
        assert!(valid("password", "Abcdefg1"));
        assert!(!valid("password", "abcdefg"));
        assert!(!valid("password", "abcdefg1"));
        assert!(!valid("password", "ABCDEFG1"));
        assert!(!valid("password", "Abcdefgh"));
        assert!(!valid("password", "Abc defg1"));
        assert!(!valid("password", &format!("Aa1{}", "x".repeat(62))));
    }

    #[test]
    fn test_confirm_password_uses_context() {
        assert!(is_valid_field("confirm_password", "X", &FieldContext::with_password("X")));
        assert!(!is_valid_field("confirm_password", "X", &FieldContext::with_password("Y")));
        // Metacharacters in the password are literal
        assert!(is_valid_field(
            "confirm_password",
            "a.b*c",
            &FieldContext::with_password("a.b*c")
        ));
        assert!(!is_valid_field(
            "confirm_password",
            "axbbc",
            &FieldContext::with_password("a.b*c")
        ));
        // Without a password only an empty confirmation matches
        assert!(valid("confirm_password", ""));
        assert!(!valid("confirm_password", "X"));
    }

    #[test]
    fn test_unknown_field_is_valid() {
        assert!(valid("favourite_colour", ""));
    }

    #[test]
    fn test_phone() {
        assert!(valid("phone", "+56912345678"));
        assert!(valid("phone", "+56 9 1234 5678"));
        assert!(valid("phone", "912345678"));
        assert!(!valid("phone", "221234567"));
        assert!(!valid("phone", "+56 9 1234"));
    }

    #[test]
    fn test_rut_requires_check_digit() {
        assert!(valid("rut", "12.345.678-5"));
        assert!(valid("rut", "123456785"));
        assert!(!valid("rut", "12.345.678-9"));
        assert!(!valid("rut", "12-345"));
    }

    #[test]
    fn test_names_and_address() {
        assert!(valid("first_name", "José"));
        assert!(valid("last_name", "O'Higgins Riquelme"));
        assert!(!valid("first_name", "J"));
        assert!(!valid("first_name", "R2D2"));
        assert!(valid("address", "Av. Libertador Bernardo O'Higgins"));
        assert!(valid("address_number", "1234"));
        assert!(valid("address_number", "S/N"));
        assert!(!valid("address_number", "12-34"));
        assert!(valid("apartment", ""));
        assert!(valid("apartment", "Depto 402-B"));
    }

    #[test]
    fn test_email() {
        assert!(valid("email", "ana@example.cl"));
        assert!(!valid("email", "ana@example"));
        assert!(!valid("email", "ana example.cl"));
    }

    #[test]
    fn test_gate_requires_both_checks() {
        let fields = [("email", "ana@example.cl"), ("phone", "+56912345678")];
        let ctx = FieldContext::default();
        assert!(can_continue(&fields, &ctx, true));
        assert!(!can_continue(&fields, &ctx, false));

        let bad = [("email", "ana@example.cl"), ("phone", "123")];
        assert!(!can_continue(&bad, &ctx, true));
        assert_eq!(invalid_fields(&bad, &ctx), vec!["phone"]);
    }
}
