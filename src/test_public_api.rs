use std::sync::{Arc, RwLock};

use rust_decimal::Decimal;

use crate::contracts::{Field, StatusTarget, ValueChangeListener};

struct SmokeField {
    value: RwLock<String>,
    listeners: RwLock<Vec<ValueChangeListener<String>>>,
}

impl SmokeField {
    fn new(value: &str) -> Arc<Self> {
        Arc::new(Self {
            value: RwLock::new(value.to_string()),
            listeners: RwLock::new(Vec::new()),
        })
    }
}

impl Field for SmokeField {
    type Value = String;

    fn value(&self) -> String {
        self.value.read().expect("field value lock").clone()
    }

    fn set_value(&self, value: String) {
        *self.value.write().expect("field value lock") = value.clone();
        let listeners = self.listeners.read().expect("field listener lock").clone();
        for listener in listeners {
            listener(&value);
        }
    }

    fn add_value_change_listener(&self, listener: ValueChangeListener<String>) {
        self.listeners
            .write()
            .expect("field listener lock")
            .push(listener);
    }
}

struct SmokeLabel;

impl StatusTarget for SmokeLabel {
    fn set_message(&self, _message: &str) {}
    fn set_visible(&self, _visible: bool) {}
}

#[derive(Clone, crate::binder::BeanModel)]
struct ApiSmokeBean {
    email: String,
    amount: Decimal,
}

#[test]
fn prelude_smoke_builds_a_binder_pipeline() {
    use crate::prelude::*;

    let binder = Binder::<ApiSmokeBean>::new();
    let email_field = SmokeField::new("someone@example.com");
    let binding = binder
        .for_field(email_field.clone())
        .with_validator(EmailValidator::new("invalid address"))
        .bind(
            |bean: &ApiSmokeBean| bean.email.clone(),
            |bean, value| bean.email = value,
        );

    let mut bean = ApiSmokeBean {
        email: String::new(),
        amount: Decimal::ZERO,
    };
    binder.save(&mut bean).expect("save valid bean");
    assert_eq!(bean.email, "someone@example.com");
    assert!(!binding.validate().expect("validate").is_error());
}

#[test]
fn bean_binder_public_api_smoke_compiles() {
    let bean_binder = crate::binder::BeanBinder::<ApiSmokeBean>::new();
    bean_binder
        .set_status_target(Arc::new(SmokeLabel))
        .expect("install status target");
    bean_binder
        .add_status_change_listener(|_status| {})
        .expect("register status listener");
    bean_binder
        .register_form_validator(crate::validator::from(
            |bean: &ApiSmokeBean| !bean.email.is_empty(),
            "email required",
        ))
        .expect("register form validator");

    let email_field = SmokeField::new("a@b.se");
    let _binding = bean_binder
        .for_field(email_field)
        .with_validator_fn(|value: &String| !value.is_empty(), "required")
        .bind("email")
        .expect("bind email property");

    let names = bean_binder.property_names();
    assert_eq!(names, vec!["amount".to_string(), "email".to_string()]);

    let target = Arc::new(RwLock::new(ApiSmokeBean {
        email: "a@b.se".to_string(),
        amount: Decimal::ZERO,
    }));
    let bound = bean_binder.bind_to(target).expect("attach auto-save");
    assert!(bean_binder.is_valid().expect("is_valid"));
    bound.cancel().expect("cancel auto-save");
}

#[test]
fn converter_and_validator_facades_export_core_types() {
    use crate::prelude::*;

    let locale = Locale::default();
    let converter = StringToIntegerConverter::new("not a number");
    assert_eq!(converter.to_model("7".to_string(), &locale), Outcome::ok(7));

    let validator = NotEmptyValidator::new("required")
        .and(StringLengthValidator::new("too long", None, Some(8)));
    assert!(!validator.validate("ok".to_string()).is_error());
}
