use std::any::{Any, TypeId, type_name};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, RwLock};

use regex::Regex;

use crate::contracts::{Field, StatusTarget};
use crate::converter::{self, Converter};
use crate::outcome::Outcome;
use crate::validator::Validator;

use super::binding::{Binding, BindingBuilder, PropertyAccessor};
use super::controller::{BindError, BindResult, Binder, BoundTarget};
use super::status::{BinderStatus, StatusHandler, ValidationError, ValidationStatusChange};

pub const DEFAULT_GROUP: &str = "default";

/// Bindable-property table for a model type, usually produced by the
/// `BeanModel` derive. Nested tables compose under dotted paths.
pub struct PropertySet<B> {
    properties: BTreeMap<String, DynProperty<B>>,
}

impl<B> PropertySet<B>
where
    B: 'static,
{
    pub fn new() -> Self {
        Self {
            properties: BTreeMap::new(),
        }
    }

    pub fn insert<M, G, S>(&mut self, name: &str, get: G, set: S)
    where
        M: Send + Sync + 'static,
        G: Fn(&B) -> M + Send + Sync + 'static,
        S: Fn(&mut B, M) + Send + Sync + 'static,
    {
        let erased_get: Arc<dyn Fn(&B) -> Box<dyn Any + Send + Sync> + Send + Sync> =
            Arc::new(move |model| Box::new(get(model)));
        let erased_set: Arc<dyn Fn(&mut B, Box<dyn Any + Send + Sync>) + Send + Sync> =
            Arc::new(move |model, value| {
                let value = value
                    .downcast::<M>()
                    .expect("property value type checked at bind time");
                set(model, *value);
            });
        self.properties.insert(
            name.to_string(),
            DynProperty {
                type_id: TypeId::of::<M>(),
                type_name: type_name::<M>(),
                get: erased_get,
                set: erased_set,
            },
        );
    }

    /// Grafts a child table under `prefix`, exposing its properties as
    /// dotted paths like `address.city`.
    pub fn nest<C, G, S>(&mut self, prefix: &str, get: G, set: S, child: PropertySet<C>)
    where
        C: Send + Sync + 'static,
        G: Fn(&B) -> C + Send + Sync + 'static,
        S: Fn(&mut B, C) + Send + Sync + 'static,
    {
        let get = Arc::new(get);
        let set = Arc::new(set);
        for (name, property) in child.properties {
            let path = format!("{prefix}.{name}");
            let child_get = property.get;
            let child_set = property.set;
            let parent_get = Arc::clone(&get);
            let composed_get: Arc<dyn Fn(&B) -> Box<dyn Any + Send + Sync> + Send + Sync> =
                Arc::new(move |model| child_get(&parent_get(model)));
            let parent_get = Arc::clone(&get);
            let parent_set = Arc::clone(&set);
            let composed_set: Arc<dyn Fn(&mut B, Box<dyn Any + Send + Sync>) + Send + Sync> =
                Arc::new(move |model, value| {
                    let mut nested = parent_get(model);
                    child_set(&mut nested, value);
                    parent_set(model, nested);
                });
            self.properties.insert(
                path,
                DynProperty {
                    type_id: property.type_id,
                    type_name: property.type_name,
                    get: composed_get,
                    set: composed_set,
                },
            );
        }
    }

    pub fn get(&self, path: &str) -> Option<&DynProperty<B>> {
        self.properties.get(path)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

impl<B> Default for PropertySet<B>
where
    B: 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Type-erased accessor pair for one property. The stored `TypeId` lets a
/// binding recover typed closures without unchecked downcasts at call time.
pub struct DynProperty<B> {
    type_id: TypeId,
    type_name: &'static str,
    get: Arc<dyn Fn(&B) -> Box<dyn Any + Send + Sync> + Send + Sync>,
    set: Arc<dyn Fn(&mut B, Box<dyn Any + Send + Sync>) + Send + Sync>,
}

impl<B> Clone for DynProperty<B> {
    fn clone(&self) -> Self {
        Self {
            type_id: self.type_id,
            type_name: self.type_name,
            get: Arc::clone(&self.get),
            set: Arc::clone(&self.set),
        }
    }
}

impl<B> DynProperty<B>
where
    B: 'static,
{
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn is<M>(&self) -> bool
    where
        M: 'static,
    {
        self.type_id == TypeId::of::<M>()
    }

    fn typed<M>(
        &self,
    ) -> Option<(
        Arc<dyn Fn(&B) -> M + Send + Sync>,
        Arc<dyn Fn(&mut B, M) + Send + Sync>,
    )>
    where
        M: Send + Sync + 'static,
    {
        if !self.is::<M>() {
            return None;
        }
        let erased_get = Arc::clone(&self.get);
        let get: Arc<dyn Fn(&B) -> M + Send + Sync> = Arc::new(move |model| {
            *erased_get(model)
                .downcast::<M>()
                .expect("property value type checked at bind time")
        });
        let erased_set = Arc::clone(&self.set);
        let set: Arc<dyn Fn(&mut B, M) + Send + Sync> =
            Arc::new(move |model, value| erased_set(model, Box::new(value)));
        Some((get, set))
    }
}

/// Declarative constraint attached to a property (or to the whole bean when
/// `property` is `None`). Descriptors with no groups belong to the default
/// group.
#[derive(Clone)]
pub struct ConstraintDescriptor {
    pub property: Option<String>,
    pub kind: ConstraintKind,
    pub message: String,
    pub groups: BTreeSet<String>,
}

impl ConstraintDescriptor {
    pub fn for_property(
        property: impl Into<String>,
        kind: ConstraintKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            property: Some(property.into()),
            kind,
            message: message.into(),
            groups: BTreeSet::new(),
        }
    }

    pub fn for_bean(kind: ConstraintKind, message: impl Into<String>) -> Self {
        Self {
            property: None,
            kind,
            message: message.into(),
            groups: BTreeSet::new(),
        }
    }

    pub fn in_group(mut self, group: impl Into<String>) -> Self {
        self.groups.insert(group.into());
        self
    }
}

/// A check against a type-erased value. `None` means the value passed (or
/// the check does not apply to the value's type); `Some` carries the
/// user-facing failure message.
pub type ConstraintCheck = Arc<dyn Fn(&dyn Any) -> Option<String> + Send + Sync>;

#[derive(Clone)]
pub enum ConstraintKind {
    NotEmpty,
    MinLength(usize),
    MaxLength(usize),
    Min(i64),
    Max(i64),
    Email,
    Pattern(String),
    Custom(ConstraintCheck),
}

/// Turns constraint descriptors into runnable checks. Implementations may
/// return `None` to skip constraints they do not understand.
pub trait ConstraintTranslator: Send + Sync + 'static {
    fn translate(&self, descriptor: &ConstraintDescriptor) -> Option<ConstraintCheck>;
}

/// Built-in translation covering string and integer properties. Values of
/// other types pass unchecked rather than failing spuriously.
pub struct BuiltinTranslator;

impl ConstraintTranslator for BuiltinTranslator {
    fn translate(&self, descriptor: &ConstraintDescriptor) -> Option<ConstraintCheck> {
        let message = descriptor.message.clone();
        Some(match &descriptor.kind {
            ConstraintKind::NotEmpty => Arc::new(move |value| {
                string_value(value)
                    .filter(|text| text.is_empty())
                    .map(|_| message.clone())
            }),
            ConstraintKind::MinLength(min) => {
                let min = *min;
                Arc::new(move |value| {
                    string_value(value)
                        .filter(|text| text.chars().count() < min)
                        .map(|_| message.clone())
                })
            }
            ConstraintKind::MaxLength(max) => {
                let max = *max;
                Arc::new(move |value| {
                    string_value(value)
                        .filter(|text| text.chars().count() > max)
                        .map(|_| message.clone())
                })
            }
            ConstraintKind::Min(bound) => {
                let bound = *bound;
                Arc::new(move |value| {
                    int_value(value)
                        .filter(|number| *number < bound)
                        .map(|_| message.clone())
                })
            }
            ConstraintKind::Max(bound) => {
                let bound = *bound;
                Arc::new(move |value| {
                    int_value(value)
                        .filter(|number| *number > bound)
                        .map(|_| message.clone())
                })
            }
            ConstraintKind::Email => Arc::new(move |value| {
                string_value(value)
                    .filter(|text| !email_address::EmailAddress::is_valid(text.trim()))
                    .map(|_| message.clone())
            }),
            ConstraintKind::Pattern(pattern) => match Regex::new(pattern) {
                Ok(regex) => Arc::new(move |value| {
                    string_value(value)
                        .filter(|text| !regex.is_match(text))
                        .map(|_| message.clone())
                }),
                Err(error) => {
                    log::warn!("constraint pattern failed to compile: {error}");
                    let report = format!("invalid constraint pattern: {pattern}");
                    Arc::new(move |_value| Some(report.clone()))
                }
            },
            ConstraintKind::Custom(check) => Arc::clone(check),
        })
    }
}

fn string_value(value: &dyn Any) -> Option<&str> {
    value.downcast_ref::<String>().map(String::as_str)
}

fn int_value(value: &dyn Any) -> Option<i64> {
    if let Some(number) = value.downcast_ref::<i64>() {
        Some(*number)
    } else if let Some(number) = value.downcast_ref::<i32>() {
        Some(i64::from(*number))
    } else if let Some(number) = value.downcast_ref::<u32>() {
        Some(i64::from(*number))
    } else {
        None
    }
}

/// A model type whose bindable properties are known by name. Implemented via
/// `#[derive(BeanModel)]`; `constraints` may be overridden to declare
/// validation metadata alongside the property table.
pub trait BeanModel: Clone + Send + Sync + Sized + 'static {
    fn property_set() -> PropertySet<Self>;

    fn constraints() -> Vec<ConstraintDescriptor> {
        Vec::new()
    }
}

fn groups_active(active: &Arc<RwLock<BTreeSet<String>>>, groups: &BTreeSet<String>) -> bool {
    let active = match active.read() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    if groups.is_empty() {
        active.contains(DEFAULT_GROUP)
    } else {
        groups.iter().any(|group| active.contains(group))
    }
}

/// Binder that resolves properties by name from the model's `BeanModel`
/// table and appends declared constraints to each binding's pipeline.
/// Constraint set and translator are fixed at construction; only the active
/// groups change afterwards.
pub struct BeanBinder<B>
where
    B: BeanModel,
{
    binder: Binder<B>,
    properties: Arc<PropertySet<B>>,
    constraints: Arc<Vec<ConstraintDescriptor>>,
    translator: Arc<dyn ConstraintTranslator>,
    active_groups: Arc<RwLock<BTreeSet<String>>>,
}

impl<B> Clone for BeanBinder<B>
where
    B: BeanModel,
{
    fn clone(&self) -> Self {
        Self {
            binder: self.binder.clone(),
            properties: Arc::clone(&self.properties),
            constraints: Arc::clone(&self.constraints),
            translator: Arc::clone(&self.translator),
            active_groups: Arc::clone(&self.active_groups),
        }
    }
}

impl<B> Default for BeanBinder<B>
where
    B: BeanModel,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<B> BeanBinder<B>
where
    B: BeanModel,
{
    pub fn new() -> Self {
        Self::configured(Vec::new(), Arc::new(BuiltinTranslator))
    }

    pub fn with_constraints(extra: Vec<ConstraintDescriptor>) -> Self {
        Self::configured(extra, Arc::new(BuiltinTranslator))
    }

    pub fn configured(
        extra: Vec<ConstraintDescriptor>,
        translator: Arc<dyn ConstraintTranslator>,
    ) -> Self {
        let mut constraints = B::constraints();
        constraints.extend(extra);
        let bean = Self {
            binder: Binder::new(),
            properties: Arc::new(B::property_set()),
            constraints: Arc::new(constraints),
            translator,
            active_groups: Arc::new(RwLock::new(BTreeSet::from([DEFAULT_GROUP.to_string()]))),
        };
        bean.register_bean_constraints();
        bean
    }

    fn register_bean_constraints(&self) {
        let mut checks = Vec::new();
        for descriptor in self.constraints.iter() {
            if descriptor.property.is_some() {
                continue;
            }
            if let Some(check) = self.translator.translate(descriptor) {
                checks.push((descriptor.groups.clone(), check));
            }
        }
        if checks.is_empty() {
            return;
        }
        let active = Arc::clone(&self.active_groups);
        let result = self.binder.register_form_validator(move |bean: B| {
            for (groups, check) in &checks {
                if !groups_active(&active, groups) {
                    continue;
                }
                if let Some(message) = check(&bean as &dyn Any) {
                    return Outcome::error(message);
                }
            }
            Outcome::ok(bean)
        });
        drop(result);
    }

    /// Replaces the active constraint groups. Descriptors with no explicit
    /// group are active while the default group is.
    pub fn set_constraint_groups<I>(&self, groups: I)
    where
        I: IntoIterator<Item = String>,
    {
        let mut active = match self.active_groups.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *active = groups.into_iter().collect();
    }

    pub fn active_groups(&self) -> BTreeSet<String> {
        match self.active_groups.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn property_names(&self) -> Vec<String> {
        self.properties.names().map(str::to_string).collect()
    }

    pub fn for_field<F>(&self, field: Arc<F>) -> BeanBindingBuilder<B, F, F::Value>
    where
        F: Field,
    {
        BeanBindingBuilder {
            bean: self.clone(),
            builder: self.binder.for_field(field),
        }
    }

    pub fn binder(&self) -> &Binder<B> {
        &self.binder
    }

    pub fn register_form_validator<V>(&self, validator: V) -> BindResult<()>
    where
        V: Validator<B> + 'static,
    {
        self.binder.register_form_validator(validator)
    }

    pub fn load(&self, source: &B) -> BindResult<()> {
        self.binder.load(source)
    }

    pub fn validate(&self) -> BindResult<Vec<ValidationError>> {
        self.binder.validate()
    }

    pub fn save(&self, target: &mut B) -> BindResult<()> {
        self.binder.save(target)
    }

    pub fn save_if_valid(&self, target: &mut B) -> BindResult<bool> {
        self.binder.save_if_valid(target)
    }

    pub fn save_with_handler<H>(&self, target: &mut B, handler: H) -> BindResult<()>
    where
        H: FnOnce(&[ValidationError]),
    {
        self.binder.save_with_handler(target, handler)
    }

    pub fn bind_to(&self, target: Arc<RwLock<B>>) -> BindResult<BoundTarget<B>> {
        self.binder.bind_to(target)
    }

    pub fn is_valid(&self) -> BindResult<bool> {
        self.binder.is_valid()
    }

    pub fn has_changes(&self) -> BindResult<bool> {
        self.binder.has_changes()
    }

    pub fn set_status_handler<H>(&self, handler: H) -> BindResult<()>
    where
        H: StatusHandler,
    {
        self.binder.set_status_handler(handler)
    }

    pub fn set_status_target(&self, target: Arc<dyn StatusTarget>) -> BindResult<()> {
        self.binder.set_status_target(target)
    }

    pub fn add_status_change_listener<L>(&self, listener: L) -> BindResult<()>
    where
        L: Fn(&BinderStatus) + Send + Sync + 'static,
    {
        self.binder.add_status_change_listener(listener)
    }
}

/// Builder variant that terminates in `bind("property.path")` instead of an
/// explicit accessor pair.
pub struct BeanBindingBuilder<B, F, M>
where
    B: BeanModel,
    F: Field,
    M: Clone + Send + Sync + 'static,
{
    bean: BeanBinder<B>,
    builder: BindingBuilder<B, F, M>,
}

impl<B, F, M> BeanBindingBuilder<B, F, M>
where
    B: BeanModel,
    F: Field,
    M: Clone + Send + Sync + 'static,
{
    pub fn with_validator<V>(mut self, validator: V) -> Self
    where
        V: Validator<M> + 'static,
    {
        self.builder = self.builder.with_validator(validator);
        self
    }

    pub fn with_validator_fn<P>(
        mut self,
        predicate: P,
        message: impl Into<String> + 'static,
    ) -> Self
    where
        P: Fn(&M) -> bool + Send + Sync + 'static,
    {
        self.builder = self.builder.with_validator_fn(predicate, message);
        self
    }

    pub fn with_converter<M2, C>(self, converter: C) -> BeanBindingBuilder<B, F, M2>
    where
        M2: Clone + Send + Sync + 'static,
        C: Converter<M, M2> + 'static,
    {
        BeanBindingBuilder {
            bean: self.bean,
            builder: self.builder.with_converter(converter),
        }
    }

    pub fn with_converter_fns<M2, TM, TP>(
        self,
        to_model: TM,
        to_presentation: TP,
    ) -> BeanBindingBuilder<B, F, M2>
    where
        M2: Clone + Send + Sync + 'static,
        TM: Fn(M) -> M2 + Send + Sync + 'static,
        TP: Fn(M2) -> M + Send + Sync + 'static,
    {
        self.with_converter(converter::from_fns(to_model, to_presentation))
    }

    pub fn with_status_target(mut self, target: Arc<dyn StatusTarget>) -> Self {
        self.builder = self.builder.with_status_target(target);
        self
    }

    pub fn with_status_listener<L>(mut self, listener: L) -> Self
    where
        L: Fn(&ValidationStatusChange) + Send + Sync + 'static,
    {
        self.builder = self.builder.with_status_listener(listener);
        self
    }

    pub fn with_save_when_invalid(mut self, value: bool) -> Self {
        self.builder = self.builder.with_save_when_invalid(value);
        self
    }

    /// Resolves `property` in the model's table, appends that property's
    /// declared constraints after any explicitly configured validators, and
    /// registers the binding.
    pub fn bind(self, property: &str) -> BindResult<Binding<B, F, M>> {
        let Some(dyn_property) = self.bean.properties.get(property) else {
            return Err(BindError::UnknownProperty(property.to_string()));
        };
        let Some((get, set)) = dyn_property.typed::<M>() else {
            return Err(BindError::TypeMismatch {
                property: property.to_string(),
                property_type: dyn_property.type_name(),
                pipeline_type: type_name::<M>(),
            });
        };
        let mut builder = self.builder;
        for descriptor in self.bean.constraints.iter() {
            if descriptor.property.as_deref() != Some(property) {
                continue;
            }
            let Some(check) = self.bean.translator.translate(descriptor) else {
                continue;
            };
            let groups = descriptor.groups.clone();
            let active = Arc::clone(&self.bean.active_groups);
            builder = builder.with_validator(move |value: M| {
                if !groups_active(&active, &groups) {
                    return Outcome::ok(value);
                }
                match check(&value as &dyn Any) {
                    Some(message) => Outcome::error(message),
                    None => Outcome::ok(value),
                }
            });
        }
        Ok(builder.bind_with_accessor(PropertyAccessor { get, set }))
    }
}
