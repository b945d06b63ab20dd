//! Drives the login form the way a page would: wires the callbacks, feeds
//! input events and renders the resulting view as log lines.
//!
//! Run with `RUST_LOG=debug` to see every state transition.

use std::time::Duration;

use calmform::form::{FormOptions, FormView, SubmitOutcome};
use calmform::login::{PASSWORD, SimulatedLoginService, USERNAME, login_form};
use calmform::{LoginForm, LoginValues};
use futures::executor::block_on;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn render(view: &FormView) {
    for field in &view.fields {
        let shown = match field.kind {
            calmform::form::FieldKind::Secret => "*".repeat(field.raw_value.chars().count()),
            calmform::form::FieldKind::Text => field.raw_value.clone(),
        };
        info!(
            field = %field.key,
            value = %shown,
            error = field.error.as_deref().unwrap_or("-"),
            disabled = field.disabled,
            "render field"
        );
    }
    let button = if view.busy { "Logging in..." } else { "Log in" };
    info!(
        %button,
        root_error = view.root_error.as_deref().unwrap_or("-"),
        "render form"
    );
}

fn attempt(
    form: &LoginForm,
    service: &SimulatedLoginService,
) -> Result<(), Box<dyn std::error::Error>> {
    let outcome = block_on(form.submit(|values: &LoginValues| service.attempt(values)))?;
    match outcome {
        SubmitOutcome::Invalid(errors) => {
            info!(count = errors.len(), "fix the highlighted fields")
        }
        SubmitOutcome::Failed(message) => info!(%message, "login failed"),
        SubmitOutcome::Succeeded(_) | SubmitOutcome::Ignored | SubmitOutcome::Discarded => {}
    }
    render(&form.view()?);
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let form = login_form(FormOptions::default())?;
    form.register_success_handler(|values: &LoginValues| {
        info!(username = %values.username, "Welcome, login successful");
    })?;
    render(&form.view()?);

    form.update(USERNAME, "")?;
    form.update(PASSWORD, "abc")?;
    attempt(&form, &SimulatedLoginService::default())?;

    form.update_by_name("username", "alice")?;
    form.update_by_name("password", "secret1")?;
    attempt(
        &form,
        &SimulatedLoginService::rejecting(Duration::from_millis(300), Some("Invalid credentials")),
    )?;
    attempt(&form, &SimulatedLoginService::default())?;

    // No sign-up handler is registered, so this only logs.
    form.trigger_sign_up()?;
    form.register_sign_up_handler(|| info!("Redirecting to the sign up page"))?;
    form.trigger_sign_up()?;

    form.destroy();
    Ok(())
}
