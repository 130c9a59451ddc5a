use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::contracts::{Field, StatusTarget};
use crate::locale::Locale;
use crate::validator::Validator;

use super::binding::{BindingBuilder, BindingId, BindingSlot};
use super::status::{
    BinderStatus, StatusHandler, ValidationError, ValidationStatusChange, route_form_errors,
};

#[derive(Debug)]
pub enum BindError {
    StatePoisoned(&'static str),
    Invalid(Vec<ValidationError>),
    UnknownProperty(String),
    TypeMismatch {
        property: String,
        property_type: &'static str,
        pipeline_type: &'static str,
    },
}

impl fmt::Display for BindError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StatePoisoned(context) => {
                write!(formatter, "binder state lock poisoned while {context}")
            }
            Self::Invalid(errors) => {
                write!(formatter, "validation failed with {} error(s)", errors.len())
            }
            Self::UnknownProperty(name) => {
                write!(formatter, "no bindable property named `{name}`")
            }
            Self::TypeMismatch {
                property,
                property_type,
                pipeline_type,
            } => write!(
                formatter,
                "property `{property}` stores {property_type} but the binding produces {pipeline_type}"
            ),
        }
    }
}

impl std::error::Error for BindError {}

pub type BindResult<T> = Result<T, BindError>;

pub(crate) fn read_lock<'a, T>(
    lock: &'a RwLock<T>,
    context: &'static str,
) -> BindResult<RwLockReadGuard<'a, T>> {
    lock.read().map_err(|_| BindError::StatePoisoned(context))
}

pub(crate) fn write_lock<'a, T>(
    lock: &'a RwLock<T>,
    context: &'static str,
) -> BindResult<RwLockWriteGuard<'a, T>> {
    lock.write().map_err(|_| BindError::StatePoisoned(context))
}

pub(super) struct BinderInner<B>
where
    B: Clone + Send + Sync + 'static,
{
    pub(super) locale: RwLock<Locale>,
    pub(super) bindings: RwLock<Vec<Arc<dyn BindingSlot<B>>>>,
    pub(super) form_validators: RwLock<Vec<Arc<dyn Validator<B>>>>,
    pub(super) bound: RwLock<Option<Arc<RwLock<B>>>>,
    pub(super) save_when_invalid: AtomicBool,
    pub(super) status_handler: RwLock<Option<Arc<dyn StatusHandler>>>,
    pub(super) form_status_target: RwLock<Option<Arc<dyn StatusTarget>>>,
    pub(super) status_listeners: RwLock<Vec<Arc<dyn Fn(&BinderStatus) + Send + Sync>>>,
    pub(super) field_listeners: RwLock<Vec<Arc<dyn Fn(&ValidationStatusChange) + Send + Sync>>>,
    pub(super) status: RwLock<Option<BinderStatus>>,
    pub(super) notifying: AtomicBool,
}

/// Coordinates a set of field bindings against one model type. Clones share
/// state, so a binder handle can be captured by UI callbacks freely.
pub struct Binder<B>
where
    B: Clone + Send + Sync + 'static,
{
    inner: Arc<BinderInner<B>>,
}

impl<B> Clone for Binder<B>
where
    B: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B> Default for Binder<B>
where
    B: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<B> Binder<B>
where
    B: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            inner: Arc::new(BinderInner {
                locale: RwLock::new(Locale::default()),
                bindings: RwLock::new(Vec::new()),
                form_validators: RwLock::new(Vec::new()),
                bound: RwLock::new(None),
                save_when_invalid: AtomicBool::new(false),
                status_handler: RwLock::new(None),
                form_status_target: RwLock::new(None),
                status_listeners: RwLock::new(Vec::new()),
                field_listeners: RwLock::new(Vec::new()),
                status: RwLock::new(None),
                notifying: AtomicBool::new(false),
            }),
        }
    }

    pub(super) fn from_inner(inner: Arc<BinderInner<B>>) -> Self {
        Self { inner }
    }

    pub(super) fn inner(&self) -> &Arc<BinderInner<B>> {
        &self.inner
    }

    pub(super) fn register_slot(&self, slot: Arc<dyn BindingSlot<B>>) {
        if let Ok(mut bindings) = self.inner.bindings.write() {
            log::trace!("registered binding {:?}", slot.id());
            bindings.push(slot);
        }
    }

    pub fn for_field<F>(&self, field: Arc<F>) -> BindingBuilder<B, F, F::Value>
    where
        F: Field,
    {
        BindingBuilder::new(self.clone(), field)
    }

    pub fn register_form_validator<V>(&self, validator: V) -> BindResult<()>
    where
        V: Validator<B> + 'static,
    {
        write_lock(&self.inner.form_validators, "registering form validator")?
            .push(Arc::new(validator));
        Ok(())
    }

    pub fn locale(&self) -> BindResult<Locale> {
        Ok(read_lock(&self.inner.locale, "reading binder locale")?.clone())
    }

    pub fn set_locale(&self, locale: Locale) -> BindResult<()> {
        *write_lock(&self.inner.locale, "updating binder locale")? = locale;
        Ok(())
    }

    pub fn set_status_handler<H>(&self, handler: H) -> BindResult<()>
    where
        H: StatusHandler,
    {
        *write_lock(&self.inner.status_handler, "installing status handler")? =
            Some(Arc::new(handler));
        Ok(())
    }

    pub fn set_status_target(&self, target: Arc<dyn StatusTarget>) -> BindResult<()> {
        *write_lock(&self.inner.form_status_target, "installing form status target")? =
            Some(target);
        Ok(())
    }

    pub fn add_status_change_listener<L>(&self, listener: L) -> BindResult<()>
    where
        L: Fn(&BinderStatus) + Send + Sync + 'static,
    {
        write_lock(&self.inner.status_listeners, "registering status listener")?
            .push(Arc::new(listener));
        Ok(())
    }

    pub fn add_field_value_change_listener<L>(&self, listener: L) -> BindResult<()>
    where
        L: Fn(&ValidationStatusChange) + Send + Sync + 'static,
    {
        write_lock(&self.inner.field_listeners, "registering field listener")?
            .push(Arc::new(listener));
        Ok(())
    }

    /// Unregisters a binding. The binding's field keeps its change listener
    /// (fields hand out no unsubscribe handle) but the detached binding
    /// ignores every subsequent change.
    pub fn remove_binding(&self, id: BindingId) -> BindResult<bool> {
        let removed = {
            let mut bindings = write_lock(&self.inner.bindings, "removing binding")?;
            match bindings.iter().position(|slot| slot.id() == id) {
                Some(index) => Some(bindings.remove(index)),
                None => None,
            }
        };
        match removed {
            Some(slot) => {
                slot.detach()?;
                self.refresh_status()?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn load(&self, source: &B) -> BindResult<()> {
        let slots = self.slots()?;
        for slot in &slots {
            slot.load_from(source)?;
        }
        log::debug!("loaded {} binding(s) from source object", slots.len());
        self.refresh_status()
    }

    /// Runs every binding's pipeline in registration order, then form-level
    /// validators when all fields passed and an auto-save target is attached.
    /// Errors are displayed and reported; an empty report means valid.
    pub fn validate(&self) -> BindResult<Vec<ValidationError>> {
        let slots = self.slots()?;
        let mut errors = Vec::new();
        for slot in &slots {
            if let Some(message) = slot.validate_displayed()? {
                errors.push(ValidationError::field(slot.id(), message));
            }
        }
        if errors.is_empty() {
            if let Some(object) = self.bound_value()? {
                errors.extend(self.run_form_validators(&object)?);
            }
        }
        self.handle_report(&errors)?;
        self.refresh_status()?;
        Ok(errors)
    }

    /// Writes all bindings into `target`, all or nothing. A field failure
    /// gates the save unless that binding (or the whole binder) opted into
    /// saving invalid values; a form-level failure rolls back every property
    /// written by a passing binding.
    pub fn save(&self, target: &mut B) -> BindResult<()> {
        let slots = self.slots()?;
        let binder_save_when_invalid = self.inner.save_when_invalid.load(Ordering::SeqCst);
        let mut errors = Vec::new();
        let mut gated = false;
        for slot in &slots {
            if let Some(message) = slot.validate_displayed()? {
                if !(binder_save_when_invalid || slot.save_when_invalid()?) {
                    gated = true;
                }
                errors.push(ValidationError::field(slot.id(), message));
            }
        }
        if gated {
            log::debug!("save aborted: {} field validation error(s)", errors.len());
            self.handle_report(&errors)?;
            self.refresh_status()?;
            return Err(BindError::Invalid(errors));
        }
        let mut restores = Vec::new();
        for slot in &slots {
            if slot.is_ok_lazy()? {
                restores.push(slot.snapshot(target)?);
            }
        }
        for slot in &slots {
            slot.write_to(target)?;
        }
        let form_errors = self.run_form_validators(target)?;
        if !form_errors.is_empty() {
            for restore in restores.into_iter().rev() {
                restore(target);
            }
            log::debug!("save reverted: form-level validation failed");
            errors.extend(form_errors);
            self.handle_report(&errors)?;
            self.refresh_status()?;
            return Err(BindError::Invalid(errors));
        }
        self.handle_report(&errors)?;
        self.refresh_status()?;
        log::debug!("saved {} binding(s)", slots.len());
        Ok(())
    }

    /// Like `save`, but validation failures go to `handler` instead of being
    /// returned as an error.
    pub fn save_with_handler<H>(&self, target: &mut B, handler: H) -> BindResult<()>
    where
        H: FnOnce(&[ValidationError]),
    {
        match self.save(target) {
            Ok(()) => Ok(()),
            Err(BindError::Invalid(errors)) => {
                handler(&errors);
                Ok(())
            }
            Err(other) => Err(other),
        }
    }

    pub fn save_if_valid(&self, target: &mut B) -> BindResult<bool> {
        match self.save(target) {
            Ok(()) => Ok(true),
            Err(BindError::Invalid(_)) => Ok(false),
            Err(other) => Err(other),
        }
    }

    /// Attaches an auto-save target: the current value is loaded into all
    /// fields and every subsequent valid field change writes straight
    /// through. Form-level validators do not gate write-through.
    pub fn bind_to(&self, target: Arc<RwLock<B>>) -> BindResult<BoundTarget<B>> {
        self.attach(target)?;
        Ok(BoundTarget {
            binder: self.clone(),
        })
    }

    fn attach(&self, target: Arc<RwLock<B>>) -> BindResult<()> {
        let object = read_lock(&target, "reading auto-save target")?.clone();
        *write_lock(&self.inner.bound, "attaching auto-save target")? = Some(target);
        self.load(&object)
    }

    pub fn is_valid(&self) -> BindResult<bool> {
        for slot in &self.slots()? {
            if !slot.is_ok_lazy()? {
                return Ok(false);
            }
        }
        if let Some(object) = self.bound_value()? {
            if !self.run_form_validators(&object)?.is_empty() {
                return Ok(false);
            }
        }
        Ok(true)
    }

    pub fn has_changes(&self) -> BindResult<bool> {
        for slot in &self.slots()? {
            if slot.is_edited()? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub fn status(&self) -> BindResult<BinderStatus> {
        Ok(BinderStatus {
            is_valid: self.is_valid()?,
            has_changes: self.has_changes()?,
        })
    }

    pub(super) fn refresh_status(&self) -> BindResult<()> {
        let next = self.status()?;
        let changed = {
            let mut status = write_lock(&self.inner.status, "updating aggregate status")?;
            if *status == Some(next) {
                false
            } else {
                *status = Some(next);
                true
            }
        };
        if !changed {
            return Ok(());
        }
        // Re-entrant refresh from inside a listener is coalesced into the
        // already-running dispatch; the loop re-reads the cache afterwards so
        // a tuple change made during dispatch still reaches the listeners.
        if self.inner.notifying.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let mut pending = next;
        loop {
            let listeners =
                read_lock(&self.inner.status_listeners, "reading status listeners")?.clone();
            for listener in listeners {
                listener(&pending);
            }
            self.inner.notifying.store(false, Ordering::SeqCst);
            let latest = *read_lock(&self.inner.status, "re-reading aggregate status")?;
            match latest {
                Some(latest) if latest != pending => {
                    if self.inner.notifying.swap(true, Ordering::SeqCst) {
                        break;
                    }
                    pending = latest;
                }
                _ => break,
            }
        }
        Ok(())
    }

    fn slots(&self) -> BindResult<Vec<Arc<dyn BindingSlot<B>>>> {
        Ok(read_lock(&self.inner.bindings, "reading registered bindings")?.clone())
    }

    fn bound_value(&self) -> BindResult<Option<B>> {
        let bound = read_lock(&self.inner.bound, "reading auto-save target")?.clone();
        match bound {
            Some(target) => Ok(Some(
                read_lock(&target, "reading auto-save target value")?.clone(),
            )),
            None => Ok(None),
        }
    }

    fn run_form_validators(&self, object: &B) -> BindResult<Vec<ValidationError>> {
        let validators =
            read_lock(&self.inner.form_validators, "reading form validators")?.clone();
        let mut errors = Vec::new();
        for validator in validators {
            let outcome = validator.validate(object.clone());
            if let Some(message) = outcome.message() {
                errors.push(ValidationError::form(message));
            }
        }
        Ok(errors)
    }

    fn handle_report(&self, errors: &[ValidationError]) -> BindResult<()> {
        let handler = read_lock(&self.inner.status_handler, "reading status handler")?.clone();
        match handler {
            Some(handler) => handler.handle(errors),
            None => {
                let target =
                    read_lock(&self.inner.form_status_target, "reading form status target")?
                        .clone();
                route_form_errors(target.as_ref(), errors);
            }
        }
        Ok(())
    }
}

/// Handle to an attached auto-save target.
pub struct BoundTarget<B>
where
    B: Clone + Send + Sync + 'static,
{
    binder: Binder<B>,
}

impl<B> BoundTarget<B>
where
    B: Clone + Send + Sync + 'static,
{
    /// Retargets auto-save at another object, loading its values first.
    pub fn bind(&self, target: Arc<RwLock<B>>) -> BindResult<()> {
        self.binder.attach(target)
    }

    /// Stops write-through. Fields keep their current values and edits.
    pub fn cancel(&self) -> BindResult<()> {
        *write_lock(&self.binder.inner.bound, "detaching auto-save target")? = None;
        log::debug!("auto-save target detached");
        Ok(())
    }

    /// Binder-wide override letting `save` proceed past field failures.
    pub fn set_save_when_invalid(&self, value: bool) {
        self.binder
            .inner
            .save_when_invalid
            .store(value, Ordering::SeqCst);
    }
}
