use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, Weak};

use crate::contracts::{Field, StatusTarget};
use crate::converter::{self, Converter};
use crate::locale::Locale;
use crate::outcome::Outcome;
use crate::validator::Validator;

use super::controller::{BindResult, Binder, BinderInner, read_lock, write_lock};
use super::status::ValidationStatusChange;

static BINDING_ID_ALLOCATOR: AtomicU64 = AtomicU64::new(1);

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct BindingId(pub u64);

impl BindingId {
    pub fn next() -> Self {
        Self(BINDING_ID_ALLOCATOR.fetch_add(1, Ordering::SeqCst))
    }
}

pub(super) type ToModelFn<P, M> = Arc<dyn Fn(P, &Locale) -> Outcome<M> + Send + Sync>;
pub(super) type ToPresentationFn<M, P> = Arc<dyn Fn(M, &Locale) -> P + Send + Sync>;
pub(super) type StatusListenerFn = Arc<dyn Fn(&ValidationStatusChange) + Send + Sync>;

pub(super) struct PropertyAccessor<B, M> {
    pub(super) get: Arc<dyn Fn(&B) -> M + Send + Sync>,
    pub(super) set: Arc<dyn Fn(&mut B, M) + Send + Sync>,
}

/// Fluent configuration for one field-to-property link. Accumulates the
/// validator/converter pipeline in declaration order; nothing is registered
/// with the owning binder until the terminating `bind` call, so an abandoned
/// builder has no effect.
pub struct BindingBuilder<B, F, M>
where
    B: Clone + Send + Sync + 'static,
    F: Field,
    M: Clone + Send + Sync + 'static,
{
    binder: Binder<B>,
    field: Arc<F>,
    to_model: ToModelFn<F::Value, M>,
    to_presentation: ToPresentationFn<M, F::Value>,
    status_target: Option<Arc<dyn StatusTarget>>,
    status_listener: Option<StatusListenerFn>,
    save_when_invalid: bool,
}

impl<B, F> BindingBuilder<B, F, F::Value>
where
    B: Clone + Send + Sync + 'static,
    F: Field,
{
    pub(super) fn new(binder: Binder<B>, field: Arc<F>) -> Self {
        let to_model: ToModelFn<F::Value, F::Value> =
            Arc::new(|value, _locale: &Locale| Outcome::ok(value));
        let to_presentation: ToPresentationFn<F::Value, F::Value> =
            Arc::new(|value, _locale: &Locale| value);
        Self {
            binder,
            field,
            to_model,
            to_presentation,
            status_target: None,
            status_listener: None,
            save_when_invalid: false,
        }
    }
}

impl<B, F, M> BindingBuilder<B, F, M>
where
    B: Clone + Send + Sync + 'static,
    F: Field,
    M: Clone + Send + Sync + 'static,
{
    pub fn with_validator<V>(mut self, validator: V) -> Self
    where
        V: Validator<M> + 'static,
    {
        let previous = Arc::clone(&self.to_model);
        self.to_model = Arc::new(move |value, locale| {
            previous(value, locale).and_then(|value| validator.validate(value))
        });
        self
    }

    pub fn with_validator_fn<P>(self, predicate: P, message: impl Into<String> + 'static) -> Self
    where
        P: Fn(&M) -> bool + Send + Sync + 'static,
    {
        self.with_validator(crate::validator::from(predicate, message))
    }

    pub fn with_converter<M2, C>(self, converter: C) -> BindingBuilder<B, F, M2>
    where
        M2: Clone + Send + Sync + 'static,
        C: Converter<M, M2> + 'static,
    {
        let converter = Arc::new(converter);
        let previous_to_model = self.to_model;
        let previous_to_presentation = self.to_presentation;
        let forward = Arc::clone(&converter);
        BindingBuilder {
            binder: self.binder,
            field: self.field,
            to_model: Arc::new(move |value, locale| {
                previous_to_model(value, locale)
                    .and_then(|value| forward.to_model(value, locale))
            }),
            to_presentation: Arc::new(move |value, locale| {
                previous_to_presentation(converter.to_presentation(value, locale), locale)
            }),
            status_target: self.status_target,
            status_listener: self.status_listener,
            save_when_invalid: self.save_when_invalid,
        }
    }

    pub fn with_converter_fns<M2, TM, TP>(
        self,
        to_model: TM,
        to_presentation: TP,
    ) -> BindingBuilder<B, F, M2>
    where
        M2: Clone + Send + Sync + 'static,
        TM: Fn(M) -> M2 + Send + Sync + 'static,
        TP: Fn(M2) -> M + Send + Sync + 'static,
    {
        self.with_converter(converter::from_fns(to_model, to_presentation))
    }

    pub fn with_fallible_converter<M2, E, Ps, Fm>(
        self,
        parse: Ps,
        format: Fm,
        message: impl Into<String> + 'static,
    ) -> BindingBuilder<B, F, M2>
    where
        M2: Clone + Send + Sync + 'static,
        E: 'static,
        Ps: Fn(&M) -> Result<M2, E> + Send + Sync + 'static,
        Fm: Fn(&M2) -> M + Send + Sync + 'static,
    {
        self.with_converter(converter::from_fallible(parse, format, message))
    }

    pub fn with_status_target(mut self, target: Arc<dyn StatusTarget>) -> Self {
        self.status_target = Some(target);
        self
    }

    pub fn with_status_listener<L>(mut self, listener: L) -> Self
    where
        L: Fn(&ValidationStatusChange) + Send + Sync + 'static,
    {
        self.status_listener = Some(Arc::new(listener));
        self
    }

    pub fn with_save_when_invalid(mut self, value: bool) -> Self {
        self.save_when_invalid = value;
        self
    }

    pub fn bind<G, S>(self, get: G, set: S) -> Binding<B, F, M>
    where
        G: Fn(&B) -> M + Send + Sync + 'static,
        S: Fn(&mut B, M) + Send + Sync + 'static,
    {
        self.bind_with_accessor(PropertyAccessor {
            get: Arc::new(get),
            set: Arc::new(set),
        })
    }

    pub(super) fn bind_with_accessor(self, accessor: PropertyAccessor<B, M>) -> Binding<B, F, M> {
        let binder = self.binder.clone();
        let inner = Arc::new(BindingInner {
            id: BindingId::next(),
            field: self.field,
            to_model: self.to_model,
            to_presentation: self.to_presentation,
            status_target: self.status_target,
            status_listener: self.status_listener,
            accessor: RwLock::new(accessor),
            state: RwLock::new(BindingState {
                last_outcome: None,
                edited: false,
                suppress_change: false,
                save_when_invalid: self.save_when_invalid,
                notifying: false,
                detached: false,
            }),
            binder: Arc::downgrade(binder.inner()),
        });
        binder.register_slot(inner.clone());
        let weak = Arc::downgrade(&inner);
        // Registration must not run the pipeline: the first validation pass
        // happens on the first edit, load, or explicit validate call.
        inner
            .field
            .add_value_change_listener(Arc::new(move |_value| {
                if let Some(binding) = weak.upgrade() {
                    drop(binding.on_field_change());
                }
            }));
        Binding { inner }
    }
}

struct BindingState<M> {
    last_outcome: Option<Outcome<M>>,
    edited: bool,
    suppress_change: bool,
    save_when_invalid: bool,
    notifying: bool,
    detached: bool,
}

pub(super) struct BindingInner<B, F, M>
where
    B: Clone + Send + Sync + 'static,
    F: Field,
    M: Clone + Send + Sync + 'static,
{
    id: BindingId,
    field: Arc<F>,
    to_model: ToModelFn<F::Value, M>,
    to_presentation: ToPresentationFn<M, F::Value>,
    status_target: Option<Arc<dyn StatusTarget>>,
    status_listener: Option<StatusListenerFn>,
    accessor: RwLock<PropertyAccessor<B, M>>,
    state: RwLock<BindingState<M>>,
    binder: Weak<BinderInner<B>>,
}

impl<B, F, M> BindingInner<B, F, M>
where
    B: Clone + Send + Sync + 'static,
    F: Field,
    M: Clone + Send + Sync + 'static,
{
    fn current_locale(&self) -> BindResult<Locale> {
        match self.binder.upgrade() {
            Some(binder) => Ok(read_lock(&binder.locale, "reading binder locale")?.clone()),
            None => Ok(Locale::default()),
        }
    }

    fn run_pipeline(&self) -> BindResult<Outcome<M>> {
        let locale = self.current_locale()?;
        Ok((self.to_model)(self.field.value(), &locale))
    }

    fn store_outcome(&self, outcome: &Outcome<M>) -> BindResult<()> {
        let mut state = write_lock(&self.state, "caching validation outcome")?;
        state.last_outcome = Some(outcome.clone());
        Ok(())
    }

    fn apply_display(&self, outcome: &Outcome<M>) {
        if let Some(target) = &self.status_target {
            match outcome.message() {
                Some(message) => {
                    target.set_message(message);
                    target.set_visible(true);
                }
                None => {
                    target.set_message("");
                    target.set_visible(false);
                }
            }
        }
    }

    fn clear_display(&self) {
        if let Some(target) = &self.status_target {
            target.set_message("");
            target.set_visible(false);
        }
    }

    fn status_event(&self, outcome: &Outcome<M>) -> ValidationStatusChange {
        ValidationStatusChange::new(self.id, outcome.message().map(str::to_string))
    }

    fn dispatch_status(&self, event: &ValidationStatusChange) -> BindResult<()> {
        let Some(listener) = &self.status_listener else {
            return Ok(());
        };
        // Coalesce re-entrant validation triggered from inside the listener.
        let entered = {
            let mut state = write_lock(&self.state, "entering status notification")?;
            if state.notifying {
                false
            } else {
                state.notifying = true;
                true
            }
        };
        if !entered {
            return Ok(());
        }
        listener(event);
        write_lock(&self.state, "leaving status notification")?.notifying = false;
        Ok(())
    }

    pub(super) fn validate_displayed_outcome(&self) -> BindResult<Outcome<M>> {
        let outcome = self.run_pipeline()?;
        self.store_outcome(&outcome)?;
        self.apply_display(&outcome);
        let event = self.status_event(&outcome);
        self.dispatch_status(&event)?;
        Ok(outcome)
    }

    pub(super) fn replace_accessor(&self, accessor: PropertyAccessor<B, M>) -> BindResult<()> {
        *write_lock(&self.accessor, "replacing binding accessors")? = accessor;
        Ok(())
    }

    pub(super) fn set_save_when_invalid(&self, value: bool) -> BindResult<()> {
        write_lock(&self.state, "updating save-when-invalid flag")?.save_when_invalid = value;
        Ok(())
    }

    pub(super) fn binder_handle(&self) -> Option<Binder<B>> {
        self.binder.upgrade().map(Binder::from_inner)
    }

    fn on_field_change(&self) -> BindResult<()> {
        {
            let state = read_lock(&self.state, "checking change suppression")?;
            if state.suppress_change || state.detached {
                return Ok(());
            }
        }
        write_lock(&self.state, "marking binding as edited")?.edited = true;
        let outcome = self.validate_displayed_outcome()?;
        let Some(binder) = self.binder.upgrade() else {
            return Ok(());
        };
        if !outcome.is_error() {
            let bound = read_lock(&binder.bound, "reading auto-save target")?.clone();
            if let Some(target) = bound {
                let set = read_lock(&self.accessor, "reading accessors for auto-save")?
                    .set
                    .clone();
                let value = outcome.clone().value();
                set(
                    &mut *write_lock(&target, "writing through to auto-save target")?,
                    value,
                );
                log::trace!("binding {:?} wrote through to auto-save target", self.id);
            }
        }
        let event = self.status_event(&outcome);
        let listeners = read_lock(&binder.field_listeners, "reading field value listeners")?.clone();
        for listener in listeners {
            listener(&event);
        }
        Binder::from_inner(binder).refresh_status()
    }
}

/// The erased face a binding shows to its owning binder.
pub(super) trait BindingSlot<B>: Send + Sync {
    fn id(&self) -> BindingId;
    fn validate_displayed(&self) -> BindResult<Option<String>>;
    fn is_ok_lazy(&self) -> BindResult<bool>;
    fn load_from(&self, source: &B) -> BindResult<()>;
    fn write_to(&self, target: &mut B) -> BindResult<bool>;
    fn snapshot(&self, source: &B) -> BindResult<Box<dyn FnOnce(&mut B) + Send>>;
    fn is_edited(&self) -> BindResult<bool>;
    fn save_when_invalid(&self) -> BindResult<bool>;
    fn detach(&self) -> BindResult<()>;
}

impl<B, F, M> BindingSlot<B> for BindingInner<B, F, M>
where
    B: Clone + Send + Sync + 'static,
    F: Field,
    M: Clone + Send + Sync + 'static,
{
    fn id(&self) -> BindingId {
        self.id
    }

    fn validate_displayed(&self) -> BindResult<Option<String>> {
        let outcome = self.validate_displayed_outcome()?;
        Ok(outcome.message().map(str::to_string))
    }

    fn is_ok_lazy(&self) -> BindResult<bool> {
        let cached = read_lock(&self.state, "reading cached validation outcome")?
            .last_outcome
            .clone();
        let outcome = match cached {
            Some(outcome) => outcome,
            None => {
                let outcome = self.run_pipeline()?;
                self.store_outcome(&outcome)?;
                outcome
            }
        };
        Ok(!outcome.is_error())
    }

    fn load_from(&self, source: &B) -> BindResult<()> {
        let value = {
            let accessor = read_lock(&self.accessor, "reading accessors for load")?;
            (accessor.get)(source)
        };
        let locale = self.current_locale()?;
        let presentation = (self.to_presentation)(value, &locale);
        write_lock(&self.state, "suppressing load notification")?.suppress_change = true;
        self.field.set_value(presentation);
        {
            let mut state = write_lock(&self.state, "finishing load")?;
            state.suppress_change = false;
            state.edited = false;
        }
        let outcome = self.run_pipeline()?;
        self.store_outcome(&outcome)?;
        self.clear_display();
        Ok(())
    }

    fn write_to(&self, target: &mut B) -> BindResult<bool> {
        let outcome = self.run_pipeline()?;
        self.store_outcome(&outcome)?;
        match outcome {
            Outcome::Ok(value) => {
                let set = read_lock(&self.accessor, "reading accessors for save")?
                    .set
                    .clone();
                set(target, value);
                Ok(true)
            }
            Outcome::Error(_) => Ok(false),
        }
    }

    fn snapshot(&self, source: &B) -> BindResult<Box<dyn FnOnce(&mut B) + Send>> {
        let (get, set) = {
            let accessor = read_lock(&self.accessor, "reading accessors for snapshot")?;
            (accessor.get.clone(), accessor.set.clone())
        };
        let previous = get(source);
        Ok(Box::new(move |target: &mut B| set(target, previous)))
    }

    fn is_edited(&self) -> BindResult<bool> {
        Ok(read_lock(&self.state, "reading edited flag")?.edited)
    }

    fn save_when_invalid(&self) -> BindResult<bool> {
        Ok(read_lock(&self.state, "reading save-when-invalid flag")?.save_when_invalid)
    }

    fn detach(&self) -> BindResult<()> {
        write_lock(&self.state, "detaching binding")?.detached = true;
        Ok(())
    }
}

/// Registered field-to-property link. Cheap to clone; `validate` is public
/// precisely so one field's change listener can force revalidation of
/// another field's binding.
pub struct Binding<B, F, M>
where
    B: Clone + Send + Sync + 'static,
    F: Field,
    M: Clone + Send + Sync + 'static,
{
    inner: Arc<BindingInner<B, F, M>>,
}

impl<B, F, M> Clone for Binding<B, F, M>
where
    B: Clone + Send + Sync + 'static,
    F: Field,
    M: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B, F, M> Binding<B, F, M>
where
    B: Clone + Send + Sync + 'static,
    F: Field,
    M: Clone + Send + Sync + 'static,
{
    pub fn id(&self) -> BindingId {
        self.inner.id
    }

    pub fn validate(&self) -> BindResult<Outcome<M>> {
        let outcome = self.inner.validate_displayed_outcome()?;
        if let Some(binder) = self.inner.binder_handle() {
            binder.refresh_status()?;
        }
        Ok(outcome)
    }

    /// Atomically replaces the accessor pair and reloads the field from the
    /// new target.
    pub fn rebind<G, S>(&self, get: G, set: S, source: &B) -> BindResult<()>
    where
        G: Fn(&B) -> M + Send + Sync + 'static,
        S: Fn(&mut B, M) + Send + Sync + 'static,
    {
        self.inner.replace_accessor(PropertyAccessor {
            get: Arc::new(get),
            set: Arc::new(set),
        })?;
        self.inner.load_from(source)?;
        if let Some(binder) = self.inner.binder_handle() {
            binder.refresh_status()?;
        }
        Ok(())
    }

    pub fn set_save_when_invalid(&self, value: bool) -> BindResult<()> {
        self.inner.set_save_when_invalid(value)
    }
}
