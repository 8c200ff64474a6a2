//! Input validation.
//!
//! Payloads are checked field by field and every failure is collected, so a
//! single response tells the caller everything that is wrong with a request.

use std::fmt;

use serde::Serialize;
use url::Url;

use bilemo_core::Email;

/// A single failed constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    /// Path of the offending field, e.g. `configurations[0].color`.
    pub property_path: String,
    /// Human-readable message.
    pub message: String,
}

/// Every constraint a payload failed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Violations(Vec<Violation>);

impl Violations {
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Record a violation.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.push(Violation {
            property_path: field.into(),
            message: message.into(),
        });
    }

    /// Check that `value` has between `min` and `max` characters once
    /// surrounding whitespace is trimmed.
    pub fn check_length(&mut self, field: &str, value: &str, min: usize, max: usize) {
        let len = value.trim().chars().count();
        if len == 0 {
            self.add(field, "This value should not be blank.");
        } else if len < min {
            self.add(field, format!("This value is too short. It should have {min} characters or more."));
        } else if len > max {
            self.add(field, format!("This value is too long. It should have {max} characters or less."));
        }
    }

    /// Parse an email, recording a violation when it is malformed.
    pub fn check_email(&mut self, field: &str, value: &str) -> Option<Email> {
        match Email::parse(value) {
            Ok(email) => Some(email),
            Err(e) => {
                self.add(field, format!("This value is not a valid email address: {e}."));
                None
            }
        }
    }

    /// Check that a measurement is a finite, strictly positive number.
    pub fn check_positive(&mut self, field: &str, value: f64) {
        if !value.is_finite() || value <= 0.0 {
            self.add(field, "This value should be positive.");
        }
    }

    /// Check that `value` is an absolute `http` or `https` URL.
    pub fn check_url(&mut self, field: &str, value: &str) {
        let valid = Url::parse(value)
            .is_ok_and(|url| matches!(url.scheme(), "http" | "https") && url.has_host());
        if !valid {
            self.add(field, "This value is not a valid URL.");
        }
    }

    /// Merge violations from a nested payload under `prefix`.
    pub fn nest(&mut self, prefix: &str, nested: Self) {
        for violation in nested.0 {
            self.0.push(Violation {
                property_path: format!("{prefix}.{}", violation.property_path),
                message: violation.message,
            });
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Failed constraints, in the order they were found.
    #[must_use]
    pub fn as_slice(&self) -> &[Violation] {
        &self.0
    }

    /// `Ok(value)` when nothing failed.
    ///
    /// # Errors
    ///
    /// Returns `self` when at least one constraint failed.
    pub fn finish<T>(self, value: T) -> Result<T, Self> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}

impl fmt::Display for Violations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for violation in &self.0 {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", violation.property_path, violation.message)?;
            first = false;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_length_bounds_count_chars() {
        let mut v = Violations::new();
        v.check_length("company", "Ab", 2, 50);
        v.check_length("company", "Éé", 2, 50);
        assert!(v.is_empty());

        v.check_length("firstname", "J", 2, 30);
        v.check_length("lastname", &"x".repeat(31), 2, 30);
        v.check_length("company", "   ", 2, 50);
        let paths: Vec<_> = v.as_slice().iter().map(|x| x.property_path.as_str()).collect();
        assert_eq!(paths, ["firstname", "lastname", "company"]);
        assert!(v.as_slice()[2].message.contains("blank"));
    }

    #[test]
    fn test_length_bounds_ignore_surrounding_whitespace() {
        let mut v = Violations::new();
        v.check_length("lastname", &format!("{} ", "x".repeat(30)), 2, 30);
        v.check_length("firstname", &format!("  {}\t", "y".repeat(2)), 2, 30);
        assert!(v.is_empty());

        v.check_length("lastname", &format!(" {} ", "x".repeat(31)), 2, 30);
        assert_eq!(v.as_slice().len(), 1);
        assert!(v.as_slice()[0].message.contains("too long"));
    }

    #[test]
    fn test_check_email() {
        let mut v = Violations::new();
        assert!(v.check_email("email", "c@x.com").is_some());
        assert!(v.check_email("email", "not-an-email").is_none());
        assert_eq!(v.as_slice().len(), 1);
    }

    #[test]
    fn test_check_positive_rejects_nan_and_zero() {
        let mut v = Violations::new();
        v.check_positive("screen", 6.1);
        assert!(v.is_empty());
        v.check_positive("weight", 0.0);
        v.check_positive("height", f64::NAN);
        v.check_positive("width", -1.0);
        assert_eq!(v.as_slice().len(), 3);
    }

    #[test]
    fn test_check_url() {
        let mut v = Violations::new();
        v.check_url("url", "https://cdn.bilemo.com/p/1.jpg");
        v.check_url("url", "http://localhost/a.png");
        assert!(v.is_empty());
        v.check_url("url", "ftp://example.com/a.png");
        v.check_url("url", "/relative.png");
        assert_eq!(v.as_slice().len(), 2);
    }

    #[test]
    fn test_nest_prefixes_paths() {
        let mut inner = Violations::new();
        inner.add("color", "too short");
        let mut outer = Violations::new();
        outer.nest("configurations[1]", inner);
        assert_eq!(outer.as_slice()[0].property_path, "configurations[1].color");
    }

    #[test]
    fn test_finish() {
        assert_eq!(Violations::new().finish(7).unwrap(), 7);
        let mut v = Violations::new();
        v.add("name", "bad");
        assert_eq!(v.clone().finish(7).unwrap_err(), v);
        assert_eq!(v.to_string(), "name: bad");
    }
}
