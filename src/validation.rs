use chrono::{Datelike, NaiveDate, Utc};

use crate::error::{ApiError, FieldError};

const CI_WEIGHTS: [u32; 7] = [2, 9, 8, 7, 6, 3, 4];

/// Removes the (single) hyphen separating a CI's check digit.
pub fn clean_ci(ci: &str) -> String {
    ci.trim().replacen('-', "", 1)
}

/// `12345678` -> `1234567-8`.
pub fn format_ci(ci: &str) -> String {
    let clean = clean_ci(ci);
    match clean.char_indices().nth(7) {
        Some((split, _)) => format!("{}-{}", &clean[..split], &clean[split..]),
        None => clean,
    }
}

pub fn ci_check_digit(first_seven: &[u32; 7]) -> u32 {
    let sum: u32 = first_seven
        .iter()
        .zip(CI_WEIGHTS)
        .map(|(digit, weight)| digit * weight)
        .sum();
    (10 - sum % 10) % 10
}

/// is_valid_ci
///
/// Uruguayan identity number: seven digits plus a check digit, optionally
/// written `1234567-8`. The check digit is the weighted sum of the first seven
/// digits (weights 2,9,8,7,6,3,4) rounded up to the next multiple of ten.
pub fn is_valid_ci(ci: &str) -> bool {
    let trimmed = ci.trim();
    let shape_ok = match trimmed.len() {
        8 => trimmed.chars().all(|c| c.is_ascii_digit()),
        9 => {
            trimmed.as_bytes()[7] == b'-'
                && trimmed
                    .char_indices()
                    .all(|(i, c)| if i == 7 { c == '-' } else { c.is_ascii_digit() })
        }
        _ => false,
    };
    if !shape_ok {
        return false;
    }

    let digits: Vec<u32> = clean_ci(trimmed)
        .chars()
        .filter_map(|c| c.to_digit(10))
        .collect();
    let Ok(first_seven) = <[u32; 7]>::try_from(&digits[..7]) else {
        return false;
    };
    ci_check_digit(&first_seven) == digits[7]
}

pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !email.chars().any(char::is_whitespace)
        && domain
            .split_once('.')
            .is_some_and(|(host, _)| !host.is_empty())
        && !domain.ends_with('.')
}

/// E.164: `+` followed by up to fifteen digits, no leading zero.
pub fn is_e164_phone(phone: &str) -> bool {
    let Some(digits) = phone.strip_prefix('+') else {
        return false;
    };
    (2..=15).contains(&digits.len())
        && digits.chars().all(|c| c.is_ascii_digit())
        && !digits.starts_with('0')
}

/// Looser format accepted for patients: digits, spaces, hyphens, parentheses
/// and an optional leading `+`.
pub fn is_loose_phone(phone: &str) -> bool {
    let body = phone.strip_prefix('+').unwrap_or(phone);
    !body.is_empty()
        && body
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '-' | '(' | ')'))
}

/// `#RRGGBB`.
pub fn is_hex_color(color: &str) -> bool {
    color.len() == 7
        && color.starts_with('#')
        && color[1..].chars().all(|c| c.is_ascii_hexdigit())
}

/// Parses a `YYYY-MM-DD` date of birth strictly before `today`.
pub fn parse_past_date(raw: &str, today: NaiveDate) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.len() != 10 {
        return None;
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .filter(|date| *date < today)
}

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Empty or whitespace-only strings mean "not provided".
pub fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Validator
///
/// Collects every failing rule of a request so the client gets all field
/// errors at once instead of one per round trip.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(&mut self, field: &str, ok: bool, message: &str) -> &mut Self {
        if !ok {
            self.errors.push(FieldError {
                field: field.to_string(),
                message: message.to_string(),
            });
        }
        self
    }

    pub fn required(&mut self, field: &str, value: &str, message: &str) -> &mut Self {
        self.check(field, !value.trim().is_empty(), message)
    }

    /// Length in characters, inclusive bounds.
    pub fn length(&mut self, field: &str, value: &str, min: usize, max: usize) -> &mut Self {
        let len = value.trim().chars().count();
        let message = if len < min {
            format!("{field} es requerido")
        } else {
            format!("{field} debe tener como máximo {max} caracteres")
        };
        self.check(field, (min..=max).contains(&len), &message)
    }

    pub fn email(&mut self, field: &str, value: &str) -> &mut Self {
        self.check(field, is_valid_email(value.trim()), "El email no es válido")
    }

    pub fn phone(&mut self, field: &str, value: &str) -> &mut Self {
        self.check(
            field,
            is_e164_phone(value.trim()),
            "El formato del teléfono no es válido",
        )
    }

    pub fn color(&mut self, field: &str, value: &str) -> &mut Self {
        self.check(
            field,
            is_hex_color(value),
            "El color debe tener el formato #RRGGBB",
        )
    }

    /// Validates a date of birth and returns it when valid.
    pub fn date_of_birth(&mut self, field: &str, raw: &str, max_age: Option<i32>) -> Option<NaiveDate> {
        let today = today();
        let parsed = parse_past_date(raw, today);
        self.check(
            field,
            parsed.is_some(),
            "La fecha de nacimiento debe tener el formato YYYY-MM-DD y ser anterior a hoy",
        );
        if let (Some(date), Some(max_age)) = (parsed, max_age) {
            self.check(
                field,
                today.year() - date.year() <= max_age,
                "Fecha de nacimiento inválida",
            );
        }
        parsed
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn finish(self) -> Result<(), ApiError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(self.errors))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ci_check_digit_matches_known_documents() {
        assert!(is_valid_ci("12345672"));
        assert!(is_valid_ci("1234567-2"));
        assert!(!is_valid_ci("12345678"));
        assert!(!is_valid_ci("1234567"));
        assert!(!is_valid_ci("123456-72"));
        assert!(!is_valid_ci("abcdefgh"));
        // Sum is a multiple of ten, so the check digit is zero.
        assert_eq!(ci_check_digit(&[0, 0, 0, 0, 0, 0, 0]), 0);
    }

    #[test]
    fn ci_formatting() {
        assert_eq!(clean_ci(" 1234567-2 "), "12345672");
        assert_eq!(format_ci("12345672"), "1234567-2");
        assert_eq!(format_ci("123"), "123");
    }

    #[test]
    fn phones() {
        assert!(is_e164_phone("+59899123456"));
        assert!(!is_e164_phone("099123456"));
        assert!(!is_e164_phone("+0599"));
        assert!(is_loose_phone("+598 (99) 123-456"));
        assert!(!is_loose_phone("099-abc"));
    }

    #[test]
    fn emails_and_colors() {
        assert!(is_valid_email("ana@clinica.com.uy"));
        assert!(!is_valid_email("ana@clinica"));
        assert!(!is_valid_email("ana clinica@x.com"));
        assert!(is_hex_color("#3B82F6"));
        assert!(!is_hex_color("#3B82F"));
        assert!(!is_hex_color("3B82F6A"));
    }

    #[test]
    fn dates_must_be_in_the_past() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        assert!(parse_past_date("1990-01-31", today).is_some());
        assert!(parse_past_date("2025-06-01", today).is_none());
        assert!(parse_past_date("1990-1-31", today).is_none());
        assert!(parse_past_date("1990-02-30", today).is_none());
    }

    #[test]
    fn validator_collects_every_failure() {
        let mut v = Validator::new();
        v.required("firstName", " ", "El nombre es requerido")
            .email("email", "nope")
            .color("backgroundColor", "#FFFFFF");
        let Err(ApiError::Validation(fields)) = v.finish() else {
            panic!("expected validation error");
        };
        let names: Vec<_> = fields.iter().map(|f| f.field.as_str()).collect();
        assert_eq!(names, ["firstName", "email"]);
    }

    #[test]
    fn empty_strings_mean_absent() {
        assert_eq!(non_empty(Some("  ".into())), None);
        assert_eq!(non_empty(Some(" x ".into())), Some("x".into()));
    }
}
