use std::collections::BTreeMap;

use super::controller::{FormError, FormResult};
use super::schema::{FieldKey, FieldKind, FieldSpec, FormSchema, WhitespacePolicy};

pub type RawValues = BTreeMap<FieldKey, String>;
pub type FieldErrors = BTreeMap<FieldKey, String>;

pub trait FieldLens<T>: Copy + Send + Sync + 'static {
    type Value: Clone + PartialEq + Send + Sync + 'static;

    fn key(self) -> FieldKey;
    fn get<'a>(self, model: &'a T) -> &'a Self::Value;
    fn set(self, model: &mut T, value: Self::Value);
}

/// A typed model assembled from validated text values.
pub trait FormModel: Clone + Send + Sync + 'static {
    type Fields;

    fn fields() -> Self::Fields;
    fn field_keys() -> &'static [FieldKey];
    fn from_values(values: &FieldValues) -> FormResult<Self>;
}

/// Values that passed every constraint of their schema.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct FieldValues(BTreeMap<FieldKey, String>);

impl FieldValues {
    pub fn get(&self, key: FieldKey) -> Option<&str> {
        self.0.get(&key).map(String::as_str)
    }

    pub fn require(&self, key: FieldKey) -> FormResult<&str> {
        self.get(key).ok_or(FormError::MissingField(key))
    }

    pub fn iter(&self) -> impl Iterator<Item = (FieldKey, &str)> {
        self.0.iter().map(|(key, value)| (*key, value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(FieldKey, String)> for FieldValues {
    fn from_iter<I: IntoIterator<Item = (FieldKey, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Validation {
    Valid(FieldValues),
    Invalid(FieldErrors),
}

impl Validation {
    pub fn is_valid(&self) -> bool {
        matches!(self, Validation::Valid(_))
    }

    pub fn errors(&self) -> Option<&FieldErrors> {
        match self {
            Validation::Valid(_) => None,
            Validation::Invalid(errors) => Some(errors),
        }
    }
}

/// Checks every declared field in schema order. Each field reports at most its
/// first failing constraint. Undeclared raw values are ignored and missing ones
/// count as the field default.
pub fn validate(schema: &FormSchema, raw: &RawValues) -> Validation {
    let mut values = BTreeMap::new();
    let mut errors = FieldErrors::new();

    for spec in schema.fields() {
        let raw_value = raw
            .get(&spec.key())
            .map(String::as_str)
            .unwrap_or(spec.default_value());
        match check_field(spec, schema.whitespace_policy(), raw_value) {
            Ok(value) => {
                values.insert(spec.key(), value.to_owned());
            }
            Err(message) => {
                errors.insert(spec.key(), message.to_owned());
            }
        }
    }

    if errors.is_empty() {
        Validation::Valid(FieldValues(values))
    } else {
        Validation::Invalid(errors)
    }
}

/// Checks a single field. `Ok(None)` means the value passed.
pub fn validate_field(
    schema: &FormSchema,
    key: FieldKey,
    raw: &str,
) -> FormResult<Option<String>> {
    let spec = schema.field(key).ok_or(FormError::UnknownField(key))?;
    Ok(check_field(spec, schema.whitespace_policy(), raw)
        .err()
        .map(str::to_owned))
}

fn check_field<'a>(
    spec: &'a FieldSpec,
    policy: WhitespacePolicy,
    raw: &'a str,
) -> Result<&'a str, &'a str> {
    let value = normalize(spec.kind(), policy, raw);
    match spec
        .constraints()
        .iter()
        .find(|constraint| !constraint.check(value))
    {
        Some(failed) => Err(failed.message()),
        None => Ok(value),
    }
}

fn normalize(kind: FieldKind, policy: WhitespacePolicy, raw: &str) -> &str {
    match (policy, kind) {
        (WhitespacePolicy::TrimText, FieldKind::Text) => raw.trim(),
        _ => raw,
    }
}
