use std::marker::PhantomData;
use std::str::FromStr;

use rust_decimal::Decimal;

use crate::locale::Locale;
use crate::outcome::Outcome;

/// Bidirectional transform between a field's presentation type and a model
/// property type. Conversion towards the model may fail; the reverse
/// direction always succeeds, since values already accepted into the model
/// are assumed presentable.
pub trait Converter<P, M>: Send + Sync {
    fn to_model(&self, value: P, locale: &Locale) -> Outcome<M>;
    fn to_presentation(&self, value: M, locale: &Locale) -> P;
}

pub fn from_fns<P, M, TM, TP>(to_model: TM, to_presentation: TP) -> impl Converter<P, M>
where
    TM: Fn(P) -> M + Send + Sync,
    TP: Fn(M) -> P + Send + Sync,
{
    FnConverter {
        to_model,
        to_presentation,
    }
}

/// Builds a converter from a fallible parse function. Any parse error is
/// reported as the configured fallback message, mirroring how an
/// exception-throwing conversion surfaces a single user-facing message.
pub fn from_fallible<P, M, E, Ps, Fm>(
    parse: Ps,
    format: Fm,
    message: impl Into<String>,
) -> impl Converter<P, M>
where
    Ps: Fn(&P) -> Result<M, E> + Send + Sync,
    Fm: Fn(&M) -> P + Send + Sync,
{
    FallibleConverter {
        parse,
        format,
        message: message.into(),
        _marker: PhantomData,
    }
}

struct FnConverter<TM, TP> {
    to_model: TM,
    to_presentation: TP,
}

impl<P, M, TM, TP> Converter<P, M> for FnConverter<TM, TP>
where
    TM: Fn(P) -> M + Send + Sync,
    TP: Fn(M) -> P + Send + Sync,
{
    fn to_model(&self, value: P, _locale: &Locale) -> Outcome<M> {
        Outcome::ok((self.to_model)(value))
    }

    fn to_presentation(&self, value: M, _locale: &Locale) -> P {
        (self.to_presentation)(value)
    }
}

struct FallibleConverter<Ps, Fm, E> {
    parse: Ps,
    format: Fm,
    message: String,
    _marker: PhantomData<fn() -> E>,
}

impl<P, M, E, Ps, Fm> Converter<P, M> for FallibleConverter<Ps, Fm, E>
where
    Ps: Fn(&P) -> Result<M, E> + Send + Sync,
    Fm: Fn(&M) -> P + Send + Sync,
{
    fn to_model(&self, value: P, _locale: &Locale) -> Outcome<M> {
        match (self.parse)(&value) {
            Ok(converted) => Outcome::ok(converted),
            Err(_) => Outcome::error(self.message.clone()),
        }
    }

    fn to_presentation(&self, value: M, _locale: &Locale) -> P {
        (self.format)(&value)
    }
}

pub struct StringToIntegerConverter {
    message: String,
}

impl StringToIntegerConverter {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Converter<String, i32> for StringToIntegerConverter {
    fn to_model(&self, value: String, _locale: &Locale) -> Outcome<i32> {
        match value.trim().parse::<i32>() {
            Ok(parsed) => Outcome::ok(parsed),
            Err(_) => Outcome::error(self.message.clone()),
        }
    }

    fn to_presentation(&self, value: i32, _locale: &Locale) -> String {
        value.to_string()
    }
}

pub struct StringToDecimalConverter {
    message: String,
}

impl StringToDecimalConverter {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Converter<String, Decimal> for StringToDecimalConverter {
    fn to_model(&self, value: String, _locale: &Locale) -> Outcome<Decimal> {
        match Decimal::from_str(value.trim()) {
            Ok(parsed) => Outcome::ok(parsed),
            Err(_) => Outcome::error(self.message.clone()),
        }
    }

    fn to_presentation(&self, value: Decimal, _locale: &Locale) -> String {
        value.to_string()
    }
}
