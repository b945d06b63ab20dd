mod binding;
mod controller;
mod schema;
mod validation;


pub use calmform_derive::FormModel;
pub use binding::{FieldState, FieldView, FormView};
pub use controller::{
    DEFAULT_ROOT_ERROR, FormController, FormError, FormOptions, FormResult, SignUpDispatch,
    SubmitError, SubmitOutcome, SubmitState, ValidationMode,
};
pub use schema::{
    Constraint, FieldKey, FieldKind, FieldSpec, FormSchema, FormSchemaBuilder, WhitespacePolicy,
};
pub use validation::{
    FieldErrors, FieldLens, FieldValues, FormModel, RawValues, Validation, validate,
    validate_field,
};
