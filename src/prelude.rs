pub use crate::form::{
    FieldKey, FieldLens, FormController, FormError, FormModel, FormOptions, FormResult,
    FormSchema, FormView, SignUpDispatch, SubmitError, SubmitOutcome, SubmitState,
    ValidationMode,
};
pub use crate::login::{
    LoginForm, LoginValues, PASSWORD, SimulatedLoginService, USERNAME, login_form, login_schema,
};
