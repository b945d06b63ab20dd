use std::any::Any;
use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::fmt::{Display, Formatter};
use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use futures::FutureExt;
use tracing::{debug, error, info, warn};

use super::binding::FieldState;
use super::schema::{FieldKey, FormSchema};
use super::validation::{FieldErrors, FormModel, RawValues, Validation, validate};

pub const DEFAULT_ROOT_ERROR: &str = "An unexpected error occurred. Please try again.";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SubmitState {
    Idle,
    Validating,
    Submitting,
    Succeeded,
    Failed,
}

impl Display for SubmitState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            SubmitState::Idle => "idle",
            SubmitState::Validating => "validating",
            SubmitState::Submitting => "submitting",
            SubmitState::Succeeded => "succeeded",
            SubmitState::Failed => "failed",
        };
        f.write_str(label)
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ValidationMode {
    OnChange,
    OnBlur,
    #[default]
    OnSubmit,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FormOptions {
    pub validate_mode: ValidationMode,
    /// Root error shown when a rejected submission carries no message.
    pub fallback_root_error: String,
}

impl Default for FormOptions {
    fn default() -> Self {
        Self {
            validate_mode: ValidationMode::OnSubmit,
            fallback_root_error: DEFAULT_ROOT_ERROR.to_owned(),
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
pub enum FormError {
    #[error("form state lock poisoned while {0}")]
    StatePoisoned(&'static str),
    #[error("invalid submit state transition: {from} -> {to}")]
    InvalidStateTransition { from: SubmitState, to: SubmitState },
    #[error("form schema declares no fields")]
    EmptySchema,
    #[error("field `{0}` is declared more than once")]
    DuplicateField(FieldKey),
    #[error("field `{0}` has no constraints")]
    EmptyConstraints(FieldKey),
    #[error("field `{0}` is not declared by the form schema")]
    UnknownField(FieldKey),
    #[error("unknown field name `{0}`")]
    UnknownFieldName(String),
    #[error("field `{0}` is missing from the validated values")]
    MissingField(FieldKey),
    #[error("field `{0}` is locked while the form is submitting")]
    FieldLocked(FieldKey),
    #[error("form is busy submitting")]
    Busy,
    #[error("form has been destroyed")]
    Disposed,
}

pub type FormResult<T> = Result<T, FormError>;

/// Rejection reported by the caller-supplied submit operation.
#[derive(Debug, thiserror::Error)]
#[error("{}", .message.as_deref().unwrap_or("submission rejected"))]
pub struct SubmitError {
    message: Option<String>,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl SubmitError {
    /// A rejection whose message is shown to the user as the root error.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            source: None,
        }
    }

    pub fn unspecified() -> Self {
        Self {
            message: None,
            source: None,
        }
    }

    /// Wraps a transport failure. The source is logged, never shown.
    pub fn from_source(source: impl StdError + Send + Sync + 'static) -> Self {
        Self {
            message: None,
            source: Some(Box::new(source)),
        }
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SubmitOutcome<T> {
    /// A submission was already in flight.
    Ignored,
    Invalid(FieldErrors),
    Succeeded(T),
    /// Carries the root error now shown by the form.
    Failed(String),
    /// The form was destroyed before the submit operation settled.
    Discarded,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SignUpDispatch {
    Handled,
    /// No handler was registered; a log line was emitted instead.
    Fallback,
    Ignored,
}

pub(super) type SuccessHandler<T> = Arc<dyn Fn(&T) + Send + Sync>;
pub(super) type SignUpHandler = Arc<dyn Fn() + Send + Sync>;

pub(super) struct FormState {
    pub(super) submit_state: SubmitState,
    pub(super) submit_count: u32,
    pub(super) root_error: Option<String>,
    pub(super) fields: BTreeMap<FieldKey, FieldState>,
}

impl FormState {
    pub(super) fn new(schema: &FormSchema) -> Self {
        Self {
            submit_state: SubmitState::Idle,
            submit_count: 0,
            root_error: None,
            fields: schema
                .fields()
                .iter()
                .map(|spec| (spec.key(), FieldState::new(spec.default_value())))
                .collect(),
        }
    }

    fn raw_values(&self) -> RawValues {
        self.fields
            .iter()
            .map(|(key, field)| (*key, field.raw_value.clone()))
            .collect()
    }

    fn apply_errors(&mut self, errors: &FieldErrors) {
        for (key, field) in self.fields.iter_mut() {
            field.error = errors.get(key).cloned();
        }
    }
}

#[derive(Clone)]
pub struct FormController<T>
where
    T: FormModel,
{
    pub(super) options: FormOptions,
    pub(super) schema: Arc<FormSchema>,
    pub(super) state: Arc<RwLock<FormState>>,
    pub(super) alive: Arc<AtomicBool>,
    pub(super) success_handler: Arc<RwLock<Option<SuccessHandler<T>>>>,
    pub(super) sign_up_handler: Arc<RwLock<Option<SignUpHandler>>>,
}

impl<T> FormController<T>
where
    T: FormModel,
{
    /// Fails when the model reads a field the schema does not declare.
    pub fn new(schema: FormSchema, options: FormOptions) -> FormResult<Self> {
        if let Some(missing) = T::field_keys()
            .iter()
            .find(|key| schema.field(**key).is_none())
        {
            return Err(FormError::MissingField(*missing));
        }

        Ok(Self {
            options,
            state: Arc::new(RwLock::new(FormState::new(&schema))),
            schema: Arc::new(schema),
            alive: Arc::new(AtomicBool::new(true)),
            success_handler: Arc::new(RwLock::new(None)),
            sign_up_handler: Arc::new(RwLock::new(None)),
        })
    }

    pub fn schema(&self) -> &FormSchema {
        &self.schema
    }

    pub fn options(&self) -> &FormOptions {
        &self.options
    }

    pub fn register_success_handler(
        &self,
        handler: impl Fn(&T) + Send + Sync + 'static,
    ) -> FormResult<()> {
        let mut slot = write_lock(&self.success_handler, "registering success handler")?;
        *slot = Some(Arc::new(handler));
        Ok(())
    }

    pub fn register_sign_up_handler(
        &self,
        handler: impl Fn() + Send + Sync + 'static,
    ) -> FormResult<()> {
        let mut slot = write_lock(&self.sign_up_handler, "registering sign up handler")?;
        *slot = Some(Arc::new(handler));
        Ok(())
    }

    pub fn status(&self) -> FormResult<SubmitState> {
        Ok(read_lock(&self.state, "reading submit state")?.submit_state)
    }

    pub fn is_busy(&self) -> FormResult<bool> {
        Ok(self.status()? == SubmitState::Submitting)
    }

    pub fn root_error(&self) -> FormResult<Option<String>> {
        Ok(read_lock(&self.state, "reading root error")?
            .root_error
            .clone())
    }

    pub fn submit_count(&self) -> FormResult<u32> {
        Ok(read_lock(&self.state, "reading submit count")?.submit_count)
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Marks the form as gone. A submission still in flight settles into
    /// [`SubmitOutcome::Discarded`] without touching state or callbacks.
    pub fn destroy(&self) {
        if self.alive.swap(false, Ordering::SeqCst) {
            debug!("form destroyed");
        }
    }

    /// Validates every field and, when valid, awaits `f` with the typed model.
    ///
    /// Returns [`SubmitOutcome::Ignored`] without touching state while another
    /// submission is active. Validation and submission failures are recorded in
    /// the form state and reported through the outcome, never as `Err`.
    pub async fn submit<F, Fut>(&self, f: F) -> FormResult<SubmitOutcome<T>>
    where
        F: FnOnce(&T) -> Fut,
        Fut: Future<Output = Result<(), SubmitError>>,
    {
        self.ensure_alive()?;
        // Snapshot, validation and the move to `Submitting` share one lock so
        // no edit can land between the values checked and the values sent.
        let model = {
            let mut state = write_lock(&self.state, "preparing submit")?;
            if state.submit_state != SubmitState::Idle {
                debug!(state = %state.submit_state, "submit ignored while a submission is active");
                return Ok(SubmitOutcome::Ignored);
            }
            transition_submit_state(&mut state, SubmitState::Validating)?;
            state.submit_count = state.submit_count.saturating_add(1);
            state.root_error = None;

            let values = match validate(&self.schema, &state.raw_values()) {
                Validation::Valid(values) => values,
                Validation::Invalid(errors) => {
                    state.apply_errors(&errors);
                    transition_submit_state(&mut state, SubmitState::Idle)?;
                    debug!(
                        fields = ?errors.keys().map(|key| key.as_str()).collect::<Vec<_>>(),
                        "submit blocked by field errors"
                    );
                    return Ok(SubmitOutcome::Invalid(errors));
                }
            };

            state.apply_errors(&FieldErrors::new());
            match T::from_values(&values) {
                Ok(model) => {
                    transition_submit_state(&mut state, SubmitState::Submitting)?;
                    model
                }
                Err(error) => {
                    transition_submit_state(&mut state, SubmitState::Idle)?;
                    return Err(error);
                }
            }
        };

        let mut in_flight = InFlightGuard {
            state: self.state.clone(),
            alive: self.alive.clone(),
            fallback_root_error: self.options.fallback_root_error.clone(),
            armed: true,
        };
        let settled = AssertUnwindSafe(async { f(&model).await })
            .catch_unwind()
            .await;

        in_flight.disarm();

        if !self.is_alive() {
            debug!("discarding submit settlement for a destroyed form");
            return Ok(SubmitOutcome::Discarded);
        }

        match settled {
            Ok(Ok(())) => {
                {
                    let mut state = write_lock(&self.state, "completing submit")?;
                    transition_submit_state(&mut state, SubmitState::Succeeded)?;
                }
                let notified = self.notify_success(&model);
                if let Err(error) = &notified {
                    error!(%error, "success handler could not be invoked");
                }
                let mut state = write_lock(&self.state, "returning to idle after success")?;
                transition_submit_state(&mut state, SubmitState::Idle)?;
                notified.map(|()| SubmitOutcome::Succeeded(model))
            }
            Ok(Err(rejection)) => {
                match rejection.source() {
                    Some(source) => warn!(%rejection, %source, "submission rejected"),
                    None => warn!(%rejection, "submission rejected"),
                }
                let message = rejection
                    .message()
                    .map_or_else(|| self.options.fallback_root_error.clone(), str::to_owned);
                self.fail_submit(message)
            }
            Err(panic) => {
                warn!(
                    panic = panic_message(panic.as_ref()),
                    "submit operation panicked"
                );
                self.fail_submit(self.options.fallback_root_error.clone())
            }
        }
    }

    /// Forwards the secondary "sign up" action while the form is not busy.
    pub fn trigger_sign_up(&self) -> FormResult<SignUpDispatch> {
        self.ensure_alive()?;
        if self.is_busy()? {
            debug!("sign up ignored while submitting");
            return Ok(SignUpDispatch::Ignored);
        }
        let handler = read_lock(&self.sign_up_handler, "reading sign up handler")?.clone();
        let Some(handler) = handler else {
            info!("sign up requested but no handler is registered");
            return Ok(SignUpDispatch::Fallback);
        };
        if let Err(panic) = catch_unwind(AssertUnwindSafe(|| handler())) {
            error!(
                panic = panic_message(panic.as_ref()),
                "sign up handler panicked"
            );
        }
        Ok(SignUpDispatch::Handled)
    }

    /// Restores every field to its default and clears all errors.
    pub fn reset(&self) -> FormResult<()> {
        self.ensure_alive()?;
        let mut state = write_lock(&self.state, "resetting form")?;
        if state.submit_state != SubmitState::Idle {
            return Err(FormError::Busy);
        }
        for spec in self.schema.fields() {
            state
                .fields
                .insert(spec.key(), FieldState::new(spec.default_value()));
        }
        state.root_error = None;
        state.submit_count = 0;
        Ok(())
    }

    pub(super) fn ensure_alive(&self) -> FormResult<()> {
        if self.is_alive() {
            Ok(())
        } else {
            Err(FormError::Disposed)
        }
    }

    fn notify_success(&self, model: &T) -> FormResult<()> {
        let handler = read_lock(&self.success_handler, "reading success handler")?.clone();
        let Some(handler) = handler else {
            debug!("submission succeeded without a success handler");
            return Ok(());
        };
        if let Err(panic) = catch_unwind(AssertUnwindSafe(|| handler(model))) {
            error!(
                panic = panic_message(panic.as_ref()),
                "success handler panicked"
            );
        }
        Ok(())
    }

    fn fail_submit(&self, message: String) -> FormResult<SubmitOutcome<T>> {
        let mut state = write_lock(&self.state, "recording submit failure")?;
        transition_submit_state(&mut state, SubmitState::Failed)?;
        state.root_error = Some(message.clone());
        transition_submit_state(&mut state, SubmitState::Idle)?;
        Ok(SubmitOutcome::Failed(message))
    }
}

/// Returns the form to `Idle` when a submit future is dropped before its
/// operation settles.
struct InFlightGuard {
    state: Arc<RwLock<FormState>>,
    alive: Arc<AtomicBool>,
    fallback_root_error: String,
    armed: bool,
}

impl InFlightGuard {
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if !self.armed || !self.alive.load(Ordering::SeqCst) {
            return;
        }
        let mut state = match self.state.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if state.submit_state != SubmitState::Submitting {
            return;
        }
        warn!("submit dropped before the operation settled");
        if transition_submit_state(&mut state, SubmitState::Failed).is_ok() {
            state.root_error = Some(std::mem::take(&mut self.fallback_root_error));
            let _ = transition_submit_state(&mut state, SubmitState::Idle);
        }
    }
}

pub(super) fn transition_submit_state(
    state: &mut FormState,
    next: SubmitState,
) -> FormResult<()> {
    let current = state.submit_state;
    let allowed = matches!(
        (current, next),
        (SubmitState::Idle, SubmitState::Validating)
            | (SubmitState::Validating, SubmitState::Submitting)
            | (SubmitState::Validating, SubmitState::Idle)
            | (SubmitState::Submitting, SubmitState::Succeeded)
            | (SubmitState::Submitting, SubmitState::Failed)
            | (SubmitState::Succeeded, SubmitState::Idle)
            | (SubmitState::Failed, SubmitState::Idle)
    );
    if !allowed {
        return Err(FormError::InvalidStateTransition {
            from: current,
            to: next,
        });
    }
    debug!(from = %current, to = %next, "submit state transition");
    state.submit_state = next;
    Ok(())
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}

pub(super) fn read_lock<'a, T>(
    lock: &'a RwLock<T>,
    context: &'static str,
) -> FormResult<RwLockReadGuard<'a, T>> {
    lock.read().map_err(|_| FormError::StatePoisoned(context))
}

pub(super) fn write_lock<'a, T>(
    lock: &'a RwLock<T>,
    context: &'static str,
) -> FormResult<RwLockWriteGuard<'a, T>> {
    lock.write().map_err(|_| FormError::StatePoisoned(context))
}
