pub mod binder;
pub mod contracts;
pub mod converter;
pub mod locale;
pub mod outcome;
pub mod prelude;
pub mod validator;
pub mod validators;

#[cfg(test)]
mod test_public_api;

pub use binder::{BeanBinder, BindError, BindResult, Binder};
pub use locale::Locale;
pub use outcome::Outcome;
