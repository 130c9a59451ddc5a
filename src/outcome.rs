#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Outcome<T> {
    Ok(T),
    Error(String),
}

impl<T> Outcome<T> {
    pub fn ok(value: T) -> Self {
        Self::Ok(value)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(message.into())
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Ok(_) => None,
            Self::Error(message) => Some(message),
        }
    }

    pub fn value(self) -> T {
        match self {
            Self::Ok(value) => value,
            Self::Error(message) => {
                panic!("outcome value read while in error state: {message}")
            }
        }
    }

    pub fn into_result(self) -> Result<T, String> {
        match self {
            Self::Ok(value) => Ok(value),
            Self::Error(message) => Err(message),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Self::Ok(value) => Outcome::Ok(f(value)),
            Self::Error(message) => Outcome::Error(message),
        }
    }

    pub fn and_then<U>(self, f: impl FnOnce(T) -> Outcome<U>) -> Outcome<U> {
        match self {
            Self::Ok(value) => f(value),
            Self::Error(message) => Outcome::Error(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_outcome_exposes_value_and_no_message() {
        let outcome = Outcome::ok(7);
        assert!(!outcome.is_error());
        assert_eq!(outcome.message(), None);
        assert_eq!(outcome.value(), 7);
    }

    #[test]
    fn error_outcome_exposes_message() {
        let outcome = Outcome::<i32>::error("not a number");
        assert!(outcome.is_error());
        assert_eq!(outcome.message(), Some("not a number"));
    }

    #[test]
    #[should_panic(expected = "outcome value read while in error state")]
    fn reading_value_of_error_outcome_panics() {
        let _ = Outcome::<i32>::error("boom").value();
    }

    #[test]
    fn and_then_short_circuits_on_error() {
        let outcome = Outcome::<i32>::error("first")
            .and_then(|value| Outcome::<i32>::error(format!("second {value}")));
        assert_eq!(outcome.message(), Some("first"));
    }
}
