#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Locale {
    tag: String,
}

impl Locale {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into().trim().to_string(),
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    #[cfg(feature = "i18n")]
    pub fn system() -> Self {
        sys_locale::get_locale()
            .map(Self::new)
            .unwrap_or_default()
    }
}

impl Default for Locale {
    fn default() -> Self {
        Self::new("en-US")
    }
}

impl From<&str> for Locale {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Locale {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locale_trims_and_defaults() {
        assert_eq!(Locale::new("  fi-FI ").tag(), "fi-FI");
        assert_eq!(Locale::default().tag(), "en-US");
    }
}
