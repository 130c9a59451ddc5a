pub use crate::binder::{
    BeanBinder, BeanModel, BindError, BindResult, Binder, BinderStatus, Binding, BindingId,
    BoundTarget, ConstraintDescriptor, ConstraintKind, StatusHandler, ValidationError,
    ValidationStatus, ValidationStatusChange,
};
pub use crate::contracts::{Field, StatusTarget, ValueChangeListener};
pub use crate::converter::{Converter, StringToDecimalConverter, StringToIntegerConverter};
pub use crate::locale::Locale;
pub use crate::outcome::Outcome;
pub use crate::validator::{Validator, ValidatorExt};
pub use crate::validators::{
    EmailValidator, NotEmptyValidator, PatternValidator, RangeValidator, StringLengthValidator,
};
