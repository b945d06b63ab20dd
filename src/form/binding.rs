use tracing::debug;

use super::controller::{
    FormController, FormError, FormResult, SubmitState, ValidationMode, read_lock, write_lock,
};
use super::schema::{FieldKey, FieldKind};
use super::validation::{FieldLens, FormModel, validate_field};

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct FieldState {
    pub raw_value: String,
    pub error: Option<String>,
    pub touched: bool,
    /// The raw value differs from the schema default.
    pub dirty: bool,
}

impl FieldState {
    pub(super) fn new(default_value: &str) -> Self {
        Self {
            raw_value: default_value.to_owned(),
            ..Self::default()
        }
    }
}

/// What the presentation layer needs to render one field.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FieldView {
    pub key: FieldKey,
    pub kind: FieldKind,
    pub raw_value: String,
    pub error: Option<String>,
    pub touched: bool,
    pub dirty: bool,
    pub disabled: bool,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FormView {
    pub status: SubmitState,
    pub busy: bool,
    pub root_error: Option<String>,
    pub submit_count: u32,
    /// In schema order.
    pub fields: Vec<FieldView>,
}

impl FormView {
    pub fn field(&self, key: FieldKey) -> Option<&FieldView> {
        self.fields.iter().find(|field| field.key == key)
    }
}

impl<T> FormController<T>
where
    T: FormModel,
{
    /// Stores a new raw value and marks the field touched.
    ///
    /// Errors stay as they were unless the validation mode is `OnChange`; the
    /// default mode only re-validates on submit.
    pub fn update(&self, key: FieldKey, value: impl Into<String>) -> FormResult<()> {
        self.ensure_alive()?;
        let value = value.into();
        let spec = self.schema.field(key).ok_or(FormError::UnknownField(key))?;
        let revalidated = match self.options.validate_mode {
            ValidationMode::OnChange => Some(validate_field(&self.schema, key, &value)?),
            ValidationMode::OnBlur | ValidationMode::OnSubmit => None,
        };

        let mut state = write_lock(&self.state, "updating field value")?;
        if state.submit_state == SubmitState::Submitting {
            debug!(field = %key, "field update refused while submitting");
            return Err(FormError::FieldLocked(key));
        }
        let field = state
            .fields
            .get_mut(&key)
            .ok_or(FormError::UnknownField(key))?;
        field.dirty = value != spec.default_value();
        field.raw_value = value;
        field.touched = true;
        if let Some(error) = revalidated {
            field.error = error;
        }
        Ok(())
    }

    /// `onChange(name, value)` entry point for presentation layers that only
    /// know field names.
    pub fn update_by_name(&self, name: &str, value: impl Into<String>) -> FormResult<()> {
        let key = self
            .schema
            .key_for_name(name)
            .ok_or_else(|| FormError::UnknownFieldName(name.to_owned()))?;
        self.update(key, value)
    }

    pub fn update_lens<L>(&self, lens: L, value: impl Into<String>) -> FormResult<()>
    where
        L: FieldLens<T>,
    {
        self.update(lens.key(), value)
    }

    /// Blur. Re-validates the field when the validation mode is `OnBlur`.
    pub fn touch(&self, key: FieldKey) -> FormResult<()> {
        self.ensure_alive()?;
        let mut state = write_lock(&self.state, "touching field")?;
        if state.submit_state == SubmitState::Submitting {
            return Err(FormError::FieldLocked(key));
        }
        let field = state
            .fields
            .get_mut(&key)
            .ok_or(FormError::UnknownField(key))?;
        field.touched = true;
        if self.options.validate_mode == ValidationMode::OnBlur {
            field.error = validate_field(&self.schema, key, &field.raw_value)?;
        }
        Ok(())
    }

    pub fn field_state(&self, key: FieldKey) -> FormResult<FieldState> {
        read_lock(&self.state, "reading field state")?
            .fields
            .get(&key)
            .cloned()
            .ok_or(FormError::UnknownField(key))
    }

    pub fn raw_value(&self, key: FieldKey) -> FormResult<String> {
        Ok(self.field_state(key)?.raw_value)
    }

    pub fn current_error(&self, key: FieldKey) -> FormResult<Option<String>> {
        Ok(self.field_state(key)?.error)
    }

    /// Hides errors for fields the user has not reached yet, until a submit
    /// has been attempted.
    pub fn field_error_for_display(&self, key: FieldKey) -> FormResult<Option<String>> {
        let state = read_lock(&self.state, "reading display error message")?;
        let field = state.fields.get(&key).ok_or(FormError::UnknownField(key))?;
        if !field.touched && state.submit_count == 0 {
            return Ok(None);
        }
        Ok(field.error.clone())
    }

    pub fn view(&self) -> FormResult<FormView> {
        let state = read_lock(&self.state, "creating form view")?;
        let busy = state.submit_state == SubmitState::Submitting;
        let fields = self
            .schema
            .fields()
            .iter()
            .filter_map(|spec| {
                let field = state.fields.get(&spec.key())?;
                Some(FieldView {
                    key: spec.key(),
                    kind: spec.kind(),
                    raw_value: field.raw_value.clone(),
                    error: field.error.clone(),
                    touched: field.touched,
                    dirty: field.dirty,
                    disabled: busy,
                })
            })
            .collect();
        Ok(FormView {
            status: state.submit_state,
            busy,
            root_error: state.root_error.clone(),
            submit_count: state.submit_count,
            fields,
        })
    }
}
