//! The username/password form.

use std::fmt::{Debug, Formatter};
use std::time::Duration;

use futures::future::BoxFuture;
use futures_timer::Delay;
use tracing::info;

use crate::form::{
    FieldKey, FieldSpec, FormController, FormModel, FormOptions, FormResult, FormSchema,
    SubmitError, WhitespacePolicy,
};

pub const USERNAME: FieldKey = FieldKey::new("username");
pub const PASSWORD: FieldKey = FieldKey::new("password");

pub const USERNAME_REQUIRED: &str = "Username is required.";
pub const USERNAME_TOO_LONG: &str = "Username must be 50 characters or less.";
pub const PASSWORD_TOO_SHORT: &str = "Password must be at least 6 characters.";
pub const PASSWORD_TOO_LONG: &str = "Password must be 100 characters or less.";

pub const USERNAME_MAX_CHARS: usize = 50;
pub const PASSWORD_MIN_CHARS: usize = 6;
pub const PASSWORD_MAX_CHARS: usize = 100;

pub type LoginForm = FormController<LoginValues>;

#[derive(Clone, Eq, PartialEq, FormModel)]
pub struct LoginValues {
    pub username: String,
    pub password: String,
}

impl LoginValues {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl Debug for LoginValues {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginValues")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Whitespace-only usernames pass the required check under this schema.
pub fn login_schema() -> FormResult<FormSchema> {
    login_schema_with(WhitespacePolicy::Preserve)
}

pub fn login_schema_with(policy: WhitespacePolicy) -> FormResult<FormSchema> {
    FormSchema::builder()
        .whitespace_policy(policy)
        .field(
            FieldSpec::text(USERNAME.as_str())
                .min_chars(1, USERNAME_REQUIRED)
                .max_chars(USERNAME_MAX_CHARS, USERNAME_TOO_LONG),
        )
        .field(
            FieldSpec::secret(PASSWORD.as_str())
                .min_chars(PASSWORD_MIN_CHARS, PASSWORD_TOO_SHORT)
                .max_chars(PASSWORD_MAX_CHARS, PASSWORD_TOO_LONG),
        )
        .build()
}

pub fn login_form(options: FormOptions) -> FormResult<LoginForm> {
    FormController::new(login_schema()?, options)
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SimulatedOutcome {
    Accept,
    /// `None` leaves the root error to the form's fallback message.
    Reject(Option<String>),
}

/// Stand-in for a real authentication backend: waits, then settles with a
/// fixed outcome.
#[derive(Clone, Debug)]
pub struct SimulatedLoginService {
    delay: Duration,
    outcome: SimulatedOutcome,
}

impl SimulatedLoginService {
    pub const DEFAULT_DELAY: Duration = Duration::from_millis(1000);

    pub fn new(delay: Duration, outcome: SimulatedOutcome) -> Self {
        Self { delay, outcome }
    }

    pub fn accepting(delay: Duration) -> Self {
        Self::new(delay, SimulatedOutcome::Accept)
    }

    pub fn rejecting(delay: Duration, message: Option<&str>) -> Self {
        Self::new(delay, SimulatedOutcome::Reject(message.map(str::to_owned)))
    }

    pub fn attempt(&self, values: &LoginValues) -> BoxFuture<'static, Result<(), SubmitError>> {
        info!(username = %values.username, "login attempt");
        let delay = self.delay;
        let outcome = self.outcome.clone();
        Box::pin(async move {
            if !delay.is_zero() {
                Delay::new(delay).await;
            }
            match outcome {
                SimulatedOutcome::Accept => Ok(()),
                SimulatedOutcome::Reject(Some(message)) => Err(SubmitError::rejected(message)),
                SimulatedOutcome::Reject(None) => Err(SubmitError::unspecified()),
            }
        })
    }
}

impl Default for SimulatedLoginService {
    fn default() -> Self {
        Self::accepting(Self::DEFAULT_DELAY)
    }
}
