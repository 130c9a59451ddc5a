mod bean;
mod binding;
mod controller;
mod status;


pub use bean::{
    BeanBinder, BeanBindingBuilder, BeanModel, BuiltinTranslator, ConstraintCheck,
    ConstraintDescriptor, ConstraintKind, ConstraintTranslator, DEFAULT_GROUP, DynProperty,
    PropertySet,
};
pub use bindery_bean_derive::BeanModel;
pub use binding::{Binding, BindingBuilder, BindingId};
pub use controller::{BindError, BindResult, Binder, BoundTarget};
pub use status::{
    BinderStatus, StatusHandler, ValidationError, ValidationStatus, ValidationStatusChange,
};
