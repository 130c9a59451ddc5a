use crate::outcome::Outcome;

/// A pure pass/fail check. The value flows through unchanged on success so
/// validators can be sequenced inside a conversion pipeline.
pub trait Validator<T>: Send + Sync {
    fn validate(&self, value: T) -> Outcome<T>;
}

impl<T, F> Validator<T> for F
where
    F: Fn(T) -> Outcome<T> + Send + Sync,
{
    fn validate(&self, value: T) -> Outcome<T> {
        (self)(value)
    }
}

pub fn from<T, P>(predicate: P, message: impl Into<String>) -> impl Validator<T>
where
    P: Fn(&T) -> bool + Send + Sync,
{
    let message = message.into();
    move |value: T| {
        if predicate(&value) {
            Outcome::ok(value)
        } else {
            Outcome::error(message.clone())
        }
    }
}

pub fn from_with<T, P, M>(predicate: P, message: M) -> impl Validator<T>
where
    P: Fn(&T) -> bool + Send + Sync,
    M: Fn(&T) -> String + Send + Sync,
{
    move |value: T| {
        if predicate(&value) {
            Outcome::ok(value)
        } else {
            let message = message(&value);
            Outcome::error(message)
        }
    }
}

pub struct And<A, B> {
    first: A,
    second: B,
}

impl<T, A, B> Validator<T> for And<A, B>
where
    A: Validator<T>,
    B: Validator<T>,
{
    fn validate(&self, value: T) -> Outcome<T> {
        self.first
            .validate(value)
            .and_then(|value| self.second.validate(value))
    }
}

pub trait ValidatorExt<T>: Validator<T> + Sized {
    /// AND sequencing with fail-fast semantics: the second validator only
    /// runs when the first passed, and only the first failure is surfaced.
    fn and<V>(self, next: V) -> And<Self, V>
    where
        V: Validator<T>,
    {
        And {
            first: self,
            second: next,
        }
    }
}

impl<T, V> ValidatorExt<T> for V where V: Validator<T> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_builds_predicate_validator_with_fixed_message() {
        let validator = from(|name: &String| name.len() >= 3, "too short");
        assert_eq!(
            validator.validate("ab".to_string()).message(),
            Some("too short")
        );
        assert!(!validator.validate("abc".to_string()).is_error());
    }

    #[test]
    fn from_with_derives_message_from_value() {
        let validator = from_with(
            |value: &i32| *value >= 0,
            |value| format!("{value} is negative"),
        );
        assert_eq!(validator.validate(-4).message(), Some("-4 is negative"));
    }

    #[test]
    fn and_surfaces_only_first_failure() {
        let validator = from(|value: &i32| *value > 0, "not positive")
            .and(from(|value: &i32| *value < 10, "too large"));
        assert_eq!(validator.validate(-1).message(), Some("not positive"));
        assert_eq!(validator.validate(11).message(), Some("too large"));
        assert_eq!(validator.validate(5), Outcome::ok(5));
    }
}
