//! Field-level checks shared by the entity validators. Each helper pushes a
//! `FieldError` into the caller's list instead of failing fast, so a single
//! request reports every problem at once.

use crate::error::FieldError;

pub fn length_between(
    errors: &mut Vec<FieldError>,
    field: &str,
    value: &str,
    min: usize,
    max: usize,
    label: &str,
) {
    let len = value.trim().chars().count();
    if len < min || len > max {
        errors.push(FieldError::new(
            field,
            format!("{} must be between {} and {} characters", label, min, max),
        ));
    }
}

pub fn letters_and_spaces(errors: &mut Vec<FieldError>, field: &str, value: &str, label: &str) {
    if !value
        .trim()
        .chars()
        .all(|c| c.is_ascii_alphabetic() || c == ' ')
    {
        errors.push(FieldError::new(
            field,
            format!("{} can only contain letters and spaces", label),
        ));
    }
}

pub fn is_valid_email(value: &str) -> bool {
    let value = value.trim();
    let mut parts = value.splitn(2, '@');
    let (Some(local), Some(domain)) = (parts.next(), parts.next()) else {
        return false;
    };
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return false;
    }
    // Domain needs at least one dot with a 2+ char final label.
    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2
        && labels.iter().all(|l| !l.is_empty())
        && labels.last().is_some_and(|tld| tld.len() >= 2)
        && !value.contains(char::is_whitespace)
}

/// Optional leading `+`, first digit non-zero, at most 16 digits.
pub fn is_valid_phone(value: &str) -> bool {
    let value = value.trim();
    let digits = value.strip_prefix('+').unwrap_or(value);
    !digits.is_empty()
        && digits.len() <= 16
        && digits.chars().all(|c| c.is_ascii_digit())
        && !digits.starts_with('0')
}

pub fn check_password(errors: &mut Vec<FieldError>, field: &str, value: &str) {
    if value.len() < 6 || value.len() > 128 {
        errors.push(FieldError::new(
            field,
            "Password must be between 6 and 128 characters",
        ));
        return;
    }
    let has_lower = value.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = value.chars().any(|c| c.is_ascii_uppercase());
    let has_digit = value.chars().any(|c| c.is_ascii_digit());
    if !(has_lower && has_upper && has_digit) {
        errors.push(FieldError::new(
            field,
            "Password must contain at least one lowercase letter, one uppercase letter, and one number",
        ));
    }
}

/// Uppercase letters, digits, and hyphens only (bus registration plates).
pub fn is_bus_number(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-')
}

/// 24-hour `HH:MM` schedule entry.
pub fn is_hh_mm(value: &str) -> bool {
    let mut parts = value.splitn(2, ':');
    let (Some(h), Some(m)) = (parts.next(), parts.next()) else {
        return false;
    };
    let ok_h = matches!(h.parse::<u32>(), Ok(n) if n < 24) && !h.is_empty() && h.len() <= 2;
    let ok_m = m.len() == 2 && matches!(m.parse::<u32>(), Ok(n) if n < 60);
    ok_h && ok_m
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shapes() {
        assert!(is_valid_email("ram@example.com"));
        assert!(is_valid_email("a.b-c@mail.example.np"));
        assert!(!is_valid_email("no-at-sign"));
        assert!(!is_valid_email("x@nodot"));
        assert!(!is_valid_email("x@dot."));
        assert!(!is_valid_email("a b@example.com"));
    }

    #[test]
    fn phone_shapes() {
        assert!(is_valid_phone("+9779812345678"));
        assert!(is_valid_phone("9812345678"));
        assert!(!is_valid_phone("0812345678"));
        assert!(!is_valid_phone("+977-98-1234"));
        assert!(!is_valid_phone("98123456789012345"));
    }

    #[test]
    fn password_policy() {
        let mut errors = Vec::new();
        check_password(&mut errors, "password", "Abc123");
        assert!(errors.is_empty());

        let mut errors = Vec::new();
        check_password(&mut errors, "password", "abc123");
        assert_eq!(errors.len(), 1);

        let mut errors = Vec::new();
        check_password(&mut errors, "password", "Ab1");
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn schedule_times() {
        assert!(is_hh_mm("06:30"));
        assert!(is_hh_mm("23:59"));
        assert!(!is_hh_mm("24:00"));
        assert!(!is_hh_mm("7:5"));
        assert!(!is_hh_mm("noon"));
    }
}
