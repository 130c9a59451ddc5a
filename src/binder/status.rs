use std::sync::Arc;

use crate::contracts::StatusTarget;

use super::binding::BindingId;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ValidationStatus {
    Ok,
    Error,
}

/// Per-binding status change, delivered to the binding's own subscriber and
/// to binder-wide field value listeners. There is no "unvalidated" state at
/// this boundary: the event only exists once a validation pass has run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ValidationStatusChange {
    pub binding: BindingId,
    pub status: ValidationStatus,
    pub message: Option<String>,
}

impl ValidationStatusChange {
    pub(super) fn new(binding: BindingId, message: Option<String>) -> Self {
        let status = if message.is_some() {
            ValidationStatus::Error
        } else {
            ValidationStatus::Ok
        };
        Self {
            binding,
            status,
            message,
        }
    }
}

/// One validation failure in a binder-level report. Field-scoped entries
/// carry the owning binding's id; form-level entries carry none and are only
/// ever routed to the binder-wide status sink.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ValidationError {
    pub binding: Option<BindingId>,
    pub message: String,
}

impl ValidationError {
    pub fn field(binding: BindingId, message: impl Into<String>) -> Self {
        Self {
            binding: Some(binding),
            message: message.into(),
        }
    }

    pub fn form(message: impl Into<String>) -> Self {
        Self {
            binding: None,
            message: message.into(),
        }
    }

    pub fn is_form_level(&self) -> bool {
        self.binding.is_none()
    }
}

/// The aggregate (valid, changed) tuple published through status change
/// listeners whenever it actually changes.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct BinderStatus {
    pub is_valid: bool,
    pub has_changes: bool,
}

/// Pluggable sink for a whole-form validation report.
pub trait StatusHandler: Send + Sync + 'static {
    fn handle(&self, errors: &[ValidationError]);
}

impl<F> StatusHandler for F
where
    F: Fn(&[ValidationError]) + Send + Sync + 'static,
{
    fn handle(&self, errors: &[ValidationError]) {
        (self)(errors)
    }
}

/// Default routing: field-scoped errors are already displayed by their own
/// bindings, so only form-level messages are pushed to the binder-wide
/// target, first failure wins.
pub(super) fn route_form_errors(
    target: Option<&Arc<dyn StatusTarget>>,
    errors: &[ValidationError],
) {
    let Some(target) = target else {
        return;
    };
    match errors.iter().find(|error| error.is_form_level()) {
        Some(error) => {
            target.set_message(&error.message);
            target.set_visible(true);
        }
        None => {
            target.set_message("");
            target.set_visible(false);
        }
    }
}
