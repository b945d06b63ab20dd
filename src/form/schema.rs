use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};

use super::controller::{FormError, FormResult};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct FieldKey(&'static str);

impl FieldKey {
    pub const fn new(value: &'static str) -> Self {
        Self(value)
    }

    pub const fn as_str(self) -> &'static str {
        self.0
    }
}

impl Display for FieldKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FieldKind {
    Text,
    /// Masked input. Never trimmed and never logged.
    Secret,
}

/// A single length rule. Lengths count `char`s, not bytes.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Constraint {
    MinChars { min: usize, message: String },
    MaxChars { max: usize, message: String },
}

impl Constraint {
    pub fn check(&self, value: &str) -> bool {
        let len = value.chars().count();
        match self {
            Constraint::MinChars { min, .. } => len >= *min,
            Constraint::MaxChars { max, .. } => len <= *max,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Constraint::MinChars { message, .. } | Constraint::MaxChars { message, .. } => message,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum WhitespacePolicy {
    /// Values are checked exactly as typed, so `"   "` passes a one-char minimum.
    #[default]
    Preserve,
    /// `Text` fields are trimmed before checking and in the validated values.
    TrimText,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FieldSpec {
    key: FieldKey,
    kind: FieldKind,
    constraints: Vec<Constraint>,
}

impl FieldSpec {
    pub fn new(key: FieldKey, kind: FieldKind) -> Self {
        Self {
            key,
            kind,
            constraints: Vec::new(),
        }
    }

    pub fn text(key: &'static str) -> Self {
        Self::new(FieldKey::new(key), FieldKind::Text)
    }

    pub fn secret(key: &'static str) -> Self {
        Self::new(FieldKey::new(key), FieldKind::Secret)
    }

    pub fn constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn min_chars(self, min: usize, message: impl Into<String>) -> Self {
        self.constraint(Constraint::MinChars {
            min,
            message: message.into(),
        })
    }

    pub fn max_chars(self, max: usize, message: impl Into<String>) -> Self {
        self.constraint(Constraint::MaxChars {
            max,
            message: message.into(),
        })
    }

    pub fn key(&self) -> FieldKey {
        self.key
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn default_value(&self) -> &'static str {
        ""
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FormSchema {
    fields: Vec<FieldSpec>,
    whitespace: WhitespacePolicy,
}

impl FormSchema {
    pub fn builder() -> FormSchemaBuilder {
        FormSchemaBuilder::default()
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn field(&self, key: FieldKey) -> Option<&FieldSpec> {
        self.fields.iter().find(|spec| spec.key == key)
    }

    /// Resolves a presentation-supplied name to the declared key.
    pub fn key_for_name(&self, name: &str) -> Option<FieldKey> {
        self.fields
            .iter()
            .map(FieldSpec::key)
            .find(|key| key.as_str() == name)
    }

    pub fn constraints(&self, key: FieldKey) -> Option<&[Constraint]> {
        self.field(key).map(FieldSpec::constraints)
    }

    pub fn keys(&self) -> impl Iterator<Item = FieldKey> + '_ {
        self.fields.iter().map(FieldSpec::key)
    }

    pub fn whitespace_policy(&self) -> WhitespacePolicy {
        self.whitespace
    }
}

#[derive(Clone, Debug, Default)]
pub struct FormSchemaBuilder {
    fields: Vec<FieldSpec>,
    whitespace: WhitespacePolicy,
}

impl FormSchemaBuilder {
    pub fn field(mut self, spec: FieldSpec) -> Self {
        self.fields.push(spec);
        self
    }

    pub fn whitespace_policy(mut self, policy: WhitespacePolicy) -> Self {
        self.whitespace = policy;
        self
    }

    pub fn build(self) -> FormResult<FormSchema> {
        if self.fields.is_empty() {
            return Err(FormError::EmptySchema);
        }
        let mut seen = BTreeSet::new();
        for spec in &self.fields {
            if !seen.insert(spec.key) {
                return Err(FormError::DuplicateField(spec.key));
            }
            // An unconstrained field would always pass.
            if spec.constraints.is_empty() {
                return Err(FormError::EmptyConstraints(spec.key));
            }
        }
        Ok(FormSchema {
            fields: self.fields,
            whitespace: self.whitespace,
        })
    }
}
