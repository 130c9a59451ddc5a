use email_address::EmailAddress;
use regex::Regex;

use crate::outcome::Outcome;
use crate::validator::Validator;

pub struct EmailValidator {
    message: String,
}

impl EmailValidator {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Validator<String> for EmailValidator {
    fn validate(&self, value: String) -> Outcome<String> {
        if EmailAddress::is_valid(value.trim()) {
            Outcome::ok(value)
        } else {
            Outcome::error(self.message.clone())
        }
    }
}

pub struct NotEmptyValidator {
    message: String,
}

impl NotEmptyValidator {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Validator<String> for NotEmptyValidator {
    fn validate(&self, value: String) -> Outcome<String> {
        if value.is_empty() {
            Outcome::error(self.message.clone())
        } else {
            Outcome::ok(value)
        }
    }
}

pub struct StringLengthValidator {
    message: String,
    min: Option<usize>,
    max: Option<usize>,
}

impl StringLengthValidator {
    pub fn new(message: impl Into<String>, min: Option<usize>, max: Option<usize>) -> Self {
        Self {
            message: message.into(),
            min,
            max,
        }
    }
}

impl Validator<String> for StringLengthValidator {
    fn validate(&self, value: String) -> Outcome<String> {
        let length = value.chars().count();
        let below = self.min.is_some_and(|min| length < min);
        let above = self.max.is_some_and(|max| length > max);
        if below || above {
            Outcome::error(self.message.clone())
        } else {
            Outcome::ok(value)
        }
    }
}

pub struct RangeValidator<T> {
    message: String,
    min: Option<T>,
    max: Option<T>,
}

impl<T> RangeValidator<T> {
    pub fn new(message: impl Into<String>, min: Option<T>, max: Option<T>) -> Self {
        Self {
            message: message.into(),
            min,
            max,
        }
    }
}

impl<T> Validator<T> for RangeValidator<T>
where
    T: PartialOrd + Send + Sync,
{
    fn validate(&self, value: T) -> Outcome<T> {
        let below = self.min.as_ref().is_some_and(|min| value < *min);
        let above = self.max.as_ref().is_some_and(|max| value > *max);
        if below || above {
            Outcome::error(self.message.clone())
        } else {
            Outcome::ok(value)
        }
    }
}

pub struct PatternValidator {
    message: String,
    pattern: Regex,
}

impl PatternValidator {
    /// Fails on an invalid pattern: a broken regex is a configuration error,
    /// not user input.
    pub fn new(message: impl Into<String>, pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            message: message.into(),
            pattern: Regex::new(pattern)?,
        })
    }
}

impl Validator<String> for PatternValidator {
    fn validate(&self, value: String) -> Outcome<String> {
        if self.pattern.is_match(&value) {
            Outcome::ok(value)
        } else {
            Outcome::error(self.message.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_validator_accepts_addresses_and_rejects_garbage() {
        let validator = EmailValidator::new("bad addr");
        assert!(!validator.validate("abc@x.com".to_string()).is_error());
        assert_eq!(
            validator.validate("not-email".to_string()).message(),
            Some("bad addr")
        );
    }

    #[test]
    fn string_length_validator_checks_bounds() {
        let validator = StringLengthValidator::new("length out of bounds", Some(2), Some(4));
        assert!(validator.validate("a".to_string()).is_error());
        assert!(validator.validate("abcde".to_string()).is_error());
        assert!(!validator.validate("abc".to_string()).is_error());
    }

    #[test]
    fn range_validator_is_inclusive() {
        let validator = RangeValidator::new("out of range", Some(1900), Some(2000));
        assert!(!validator.validate(1900).is_error());
        assert!(!validator.validate(2000).is_error());
        assert!(validator.validate(1899).is_error());
        assert!(validator.validate(2001).is_error());
    }

    #[test]
    fn pattern_validator_matches_full_input_per_pattern() {
        let validator =
            PatternValidator::new("digits only", r"^\d+$").expect("pattern must compile");
        assert!(!validator.validate("123".to_string()).is_error());
        assert!(validator.validate("12a".to_string()).is_error());
    }

    #[test]
    fn pattern_validator_rejects_invalid_pattern_at_construction() {
        assert!(PatternValidator::new("broken", "[").is_err());
    }
}
