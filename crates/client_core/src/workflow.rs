//! Sign-up confirmation form: code submission, throttled resend and the view it renders.
//!
//! Two orthogonal state machines live here. The form phase moves
//! `Idle -> Submitting -> {Idle | Done}`; the resend countdown moves
//! `idle -> counting down -> idle`. Resend is only reachable while the form is
//! `Idle`, no request is outstanding and the countdown is not running.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use shared::protocol::ConfirmSignUpRequest;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use crate::{
    auth::{AuthContext, AuthService},
    countdown::{CountdownState, CountdownTimer, RESEND_TIMEOUT_SECONDS},
    otp::{OtpCode, OtpInput, OtpValidationError, OTP_LENGTH},
};

pub const SUBMIT_LABEL: &str = "Verify and Sign Up";
pub const SUBMIT_BUSY_LABEL: &str = "Processing, please wait";
pub const RESEND_LABEL: &str = "Resend code";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormPhase {
    Idle,
    Submitting,
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Client-side validation failed; nothing was sent.
    Invalid(OtpValidationError),
    /// Submission is disabled right now (request outstanding, already done, or disposed).
    Ignored,
    Rejected(String),
    Confirmed,
    /// The form was disposed while the request was in flight.
    Discarded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResendOutcome {
    Ignored,
    Sent,
    Failed(String),
    Discarded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormView {
    pub phase: FormPhase,
    pub description: String,
    pub slots: [Option<char>; OTP_LENGTH],
    pub field_error: Option<String>,
    pub alert: Option<String>,
    pub countdown: CountdownState,
    pub resend_label: String,
    pub resend_enabled: bool,
    pub submit_label: &'static str,
    pub submit_enabled: bool,
    /// The last confirmation failed because the code lapsed; only a resend helps.
    pub code_expired: bool,
}

struct FormState {
    phase: FormPhase,
    input: OtpInput,
    field_error: Option<OtpValidationError>,
    resend_in_flight: bool,
    code_expired: bool,
    countdown: CountdownTimer,
}

impl FormState {
    fn request_outstanding(&self) -> bool {
        self.phase == FormPhase::Submitting || self.resend_in_flight
    }

    fn can_submit(&self) -> bool {
        self.phase == FormPhase::Idle && !self.resend_in_flight
    }

    fn can_resend(&self) -> bool {
        self.phase == FormPhase::Idle && !self.request_outstanding() && !self.countdown.is_active()
    }
}

pub struct OtpWorkflow {
    email: String,
    auth: Arc<dyn AuthService>,
    context: Arc<AuthContext>,
    disposed: AtomicBool,
    countdown_updates: watch::Receiver<CountdownState>,
    state: Mutex<FormState>,
}

impl OtpWorkflow {
    pub fn new(
        email: impl Into<String>,
        auth: Arc<dyn AuthService>,
        context: Arc<AuthContext>,
    ) -> Self {
        Self::with_resend_cooldown(email, auth, context, RESEND_TIMEOUT_SECONDS)
    }

    pub fn with_resend_cooldown(
        email: impl Into<String>,
        auth: Arc<dyn AuthService>,
        context: Arc<AuthContext>,
        cooldown_seconds: u32,
    ) -> Self {
        let countdown = CountdownTimer::new(cooldown_seconds);
        Self {
            email: email.into(),
            auth,
            context,
            disposed: AtomicBool::new(false),
            countdown_updates: countdown.subscribe(),
            state: Mutex::new(FormState {
                phase: FormPhase::Idle,
                input: OtpInput::default(),
                field_error: None,
                resend_in_flight: false,
                code_expired: false,
                countdown,
            }),
        }
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn context(&self) -> &Arc<AuthContext> {
        &self.context
    }

    pub fn countdown_updates(&self) -> watch::Receiver<CountdownState> {
        self.countdown_updates.clone()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// Once a submission has been blocked, every edit re-validates so the inline
    /// message tracks the current code.
    pub async fn enter_code(&self, raw: &str) {
        let mut state = self.state.lock().await;
        state.input.set(raw);
        if state.field_error.is_some() {
            state.field_error = OtpCode::parse(state.input.value()).err();
        }
    }

    pub async fn submit(&self) -> SubmitOutcome {
        let request = {
            let mut state = self.state.lock().await;
            if self.is_disposed() || !state.can_submit() {
                return SubmitOutcome::Ignored;
            }
            match OtpCode::parse(state.input.value()) {
                Ok(code) => {
                    state.field_error = None;
                    state.phase = FormPhase::Submitting;
                    ConfirmSignUpRequest {
                        username: self.email.clone(),
                        confirmation_code: code.into_inner(),
                    }
                }
                Err(err) => {
                    debug!(email = %self.email, "otp: submission blocked by validation");
                    state.field_error = Some(err.clone());
                    return SubmitOutcome::Invalid(err);
                }
            }
        };

        self.context.begin();
        let result = self.auth.confirm_sign_up(request).await;
        self.context.settle(&result);

        let mut state = self.state.lock().await;
        if self.is_disposed() {
            debug!(email = %self.email, "otp: confirm result discarded after dispose");
            return SubmitOutcome::Discarded;
        }
        match result {
            Ok(()) => {
                info!(email = %self.email, "otp: sign up confirmed");
                state.phase = FormPhase::Done;
                state.input.clear();
                state.countdown.cancel();
                SubmitOutcome::Confirmed
            }
            Err(err) => {
                warn!(email = %self.email, "otp: confirm failed: {err}");
                state.phase = FormPhase::Idle;
                state.code_expired = err.needs_new_code();
                SubmitOutcome::Rejected(err.user_message())
            }
        }
    }

    /// Requests a new code. The countdown starts before the request resolves, so
    /// repeated presses during a slow request cannot queue more resends.
    pub async fn resend(&self) -> ResendOutcome {
        {
            let mut state = self.state.lock().await;
            if self.is_disposed() || !state.can_resend() {
                return ResendOutcome::Ignored;
            }
            state.resend_in_flight = true;
            state.countdown.start();
        }

        self.context.begin();
        let result = self.auth.resend_sign_up_code(&self.email).await;
        self.context.settle(&result);

        let mut state = self.state.lock().await;
        if self.is_disposed() {
            debug!(email = %self.email, "otp: resend result discarded after dispose");
            return ResendOutcome::Discarded;
        }
        state.resend_in_flight = false;
        match result {
            Ok(()) => {
                state.code_expired = false;
                ResendOutcome::Sent
            }
            Err(err) => {
                warn!(email = %self.email, "otp: resend failed: {err}");
                state.countdown.cancel();
                ResendOutcome::Failed(err.user_message())
            }
        }
    }

    pub async fn view(&self) -> FormView {
        let state = self.state.lock().await;
        let auth = self.context.snapshot();
        let countdown = state.countdown.state();

        let resend_label = if countdown.active {
            format!("Resend in {}s", countdown.remaining)
        } else {
            RESEND_LABEL.to_string()
        };
        let busy = state.request_outstanding();

        FormView {
            phase: state.phase,
            description: format!(
                "Please enter the verification code sent to {}.",
                self.email
            ),
            slots: state.input.slots(),
            field_error: state.field_error.as_ref().map(ToString::to_string),
            alert: auth.error,
            countdown,
            resend_label,
            resend_enabled: state.can_resend(),
            submit_label: if busy { SUBMIT_BUSY_LABEL } else { SUBMIT_LABEL },
            submit_enabled: state.can_submit(),
            code_expired: state.code_expired,
        }
    }

    /// Tears the form down: stops the countdown, drops the entered code and makes
    /// any in-flight request's result a no-op for this form.
    pub async fn dispose(&self) {
        self.disposed.store(true, Ordering::SeqCst);
        let mut state = self.state.lock().await;
        state.countdown.cancel();
        state.input.clear();
    }
}

#[cfg(test)]
#[path = "tests/workflow_tests.rs"]
mod tests;
