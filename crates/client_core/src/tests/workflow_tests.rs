use super::*;

use std::{collections::VecDeque, time::Duration};

use async_trait::async_trait;
use shared::{
    error::{ApiException, ErrorCode},
    protocol::{SignInResponse, SignUpResponse},
};
use tokio::{sync::Notify, time::sleep};

use crate::error::{ClientError, ClientResult};

#[derive(Default)]
struct FakeAuth {
    confirms: std::sync::Mutex<Vec<ConfirmSignUpRequest>>,
    resends: std::sync::Mutex<Vec<String>>,
    confirm_failures: std::sync::Mutex<VecDeque<Option<String>>>,
    resend_failure: Option<String>,
    confirm_error_code: Option<ErrorCode>,
    gate: Option<Arc<Notify>>,
}

impl FakeAuth {
    fn gated(gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::default()
        }
    }

    fn failing_confirms(results: &[Option<&str>]) -> Self {
        Self {
            confirm_failures: std::sync::Mutex::new(
                results.iter().map(|r| r.map(str::to_string)).collect(),
            ),
            ..Self::default()
        }
    }

    fn expired_confirm() -> Self {
        Self {
            confirm_error_code: Some(ErrorCode::ExpiredCode),
            ..Self::failing_confirms(&[Some("")])
        }
    }

    fn failing_resend(message: &str) -> Self {
        Self {
            resend_failure: Some(message.to_string()),
            ..Self::default()
        }
    }

    fn confirm_calls(&self) -> Vec<ConfirmSignUpRequest> {
        self.confirms.lock().expect("confirms").clone()
    }

    fn resend_calls(&self) -> Vec<String> {
        self.resends.lock().expect("resends").clone()
    }

    async fn wait_for_gate(&self) {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
    }
}

fn rejection(code: Option<ErrorCode>, message: String) -> ClientError {
    ClientError::Api(ApiException::new(
        code.unwrap_or(ErrorCode::CodeMismatch),
        message,
    ))
}

#[async_trait]
impl AuthService for FakeAuth {
    async fn sign_up(&self, _email: &str, _password: &str) -> ClientResult<SignUpResponse> {
        Ok(SignUpResponse {
            user_confirmed: false,
        })
    }

    async fn sign_in(&self, _email: &str, _password: &str) -> ClientResult<SignInResponse> {
        Ok(SignInResponse {
            access_token: "token".into(),
        })
    }

    async fn confirm_sign_up(&self, request: ConfirmSignUpRequest) -> ClientResult<()> {
        self.confirms.lock().expect("confirms").push(request);
        self.wait_for_gate().await;
        let failure = self
            .confirm_failures
            .lock()
            .expect("failures")
            .pop_front()
            .flatten();
        match failure {
            Some(message) => Err(rejection(self.confirm_error_code, message)),
            None => Ok(()),
        }
    }

    async fn resend_sign_up_code(&self, email: &str) -> ClientResult<()> {
        self.resends.lock().expect("resends").push(email.to_string());
        self.wait_for_gate().await;
        match &self.resend_failure {
            Some(message) => Err(ClientError::GraphQl(message.clone())),
            None => Ok(()),
        }
    }
}

fn workflow_with(auth: Arc<FakeAuth>) -> Arc<OtpWorkflow> {
    Arc::new(OtpWorkflow::new(
        "user@example.com",
        auth,
        Arc::new(AuthContext::new()),
    ))
}

async fn settle() {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test(start_paused = true)]
async fn valid_code_confirms_with_email_as_username() {
    let auth = Arc::new(FakeAuth::default());
    let workflow = workflow_with(auth.clone());

    workflow.enter_code("123456").await;
    assert_eq!(workflow.submit().await, SubmitOutcome::Confirmed);

    assert_eq!(
        auth.confirm_calls(),
        vec![ConfirmSignUpRequest {
            username: "user@example.com".into(),
            confirmation_code: "123456".into(),
        }]
    );
    let view = workflow.view().await;
    assert_eq!(view.phase, FormPhase::Done);
    assert_eq!(view.slots, [None; OTP_LENGTH]);
    assert!(!view.submit_enabled);
    assert!(!view.resend_enabled);
}

#[tokio::test(start_paused = true)]
async fn short_code_never_reaches_the_network() {
    let auth = Arc::new(FakeAuth::default());
    let workflow = workflow_with(auth.clone());

    for raw in ["", "1", "123", "12345"] {
        workflow.enter_code(raw).await;
        assert!(matches!(
            workflow.submit().await,
            SubmitOutcome::Invalid(OtpValidationError::TooShort { .. })
        ));
    }

    assert!(auth.confirm_calls().is_empty());
    let view = workflow.view().await;
    assert_eq!(view.phase, FormPhase::Idle);
    assert_eq!(
        view.field_error.as_deref(),
        Some("Your verification code must be 6 characters.")
    );
    assert!(!workflow.context().snapshot().loading);
}

#[tokio::test(start_paused = true)]
async fn field_error_clears_once_code_is_complete() {
    let workflow = workflow_with(Arc::new(FakeAuth::default()));

    workflow.enter_code("123").await;
    assert!(matches!(workflow.submit().await, SubmitOutcome::Invalid(_)));

    workflow.enter_code("1234").await;
    assert_eq!(
        workflow.view().await.field_error.as_deref(),
        Some("Your verification code must be 6 characters.")
    );

    workflow.enter_code("123456").await;
    let view = workflow.view().await;
    assert_eq!(view.field_error, None);
    assert!(view.slots.iter().all(Option::is_some));
}

#[tokio::test(start_paused = true)]
async fn edits_before_first_submit_show_no_field_error() {
    let workflow = workflow_with(Arc::new(FakeAuth::default()));
    workflow.enter_code("12").await;
    assert_eq!(workflow.view().await.field_error, None);
}

#[tokio::test(start_paused = true)]
async fn failed_confirm_shows_alert_until_next_success() {
    let auth = Arc::new(FakeAuth::failing_confirms(&[
        Some("Invalid verification code provided, please try again."),
        None,
    ]));
    let workflow = workflow_with(auth.clone());

    workflow.enter_code("654321").await;
    assert_eq!(
        workflow.submit().await,
        SubmitOutcome::Rejected("Invalid verification code provided, please try again.".into())
    );
    let view = workflow.view().await;
    assert_eq!(view.phase, FormPhase::Idle);
    assert_eq!(
        view.alert.as_deref(),
        Some("Invalid verification code provided, please try again.")
    );
    assert!(view.submit_enabled);

    workflow.enter_code("123456").await;
    assert_eq!(workflow.submit().await, SubmitOutcome::Confirmed);
    assert_eq!(workflow.view().await.alert, None);
}

#[tokio::test(start_paused = true)]
async fn expired_code_points_to_resend_until_new_code_is_sent() {
    let workflow = workflow_with(Arc::new(FakeAuth::expired_confirm()));

    workflow.enter_code("123456").await;
    assert_eq!(
        workflow.submit().await,
        SubmitOutcome::Rejected(
            "Your verification code has expired. Please request a new one.".into()
        )
    );
    let view = workflow.view().await;
    assert!(view.code_expired);
    assert!(view.resend_enabled);

    assert_eq!(workflow.resend().await, ResendOutcome::Sent);
    assert!(!workflow.view().await.code_expired);
}

#[tokio::test(start_paused = true)]
async fn resend_while_idle_starts_sixty_second_countdown() {
    let auth = Arc::new(FakeAuth::default());
    let workflow = workflow_with(auth.clone());

    let before = workflow.view().await;
    assert!(before.resend_enabled);
    assert_eq!(before.resend_label, "Resend code");

    assert_eq!(workflow.resend().await, ResendOutcome::Sent);
    assert_eq!(auth.resend_calls(), vec!["user@example.com".to_string()]);

    let view = workflow.view().await;
    assert_eq!(view.countdown.remaining, 60);
    assert!(view.countdown.active);
    assert!(!view.resend_enabled);
    assert_eq!(view.resend_label, "Resend in 60s");

    sleep(Duration::from_millis(1_500)).await;
    assert_eq!(workflow.view().await.resend_label, "Resend in 59s");
}

#[tokio::test(start_paused = true)]
async fn resend_during_countdown_has_no_effect() {
    let auth = Arc::new(FakeAuth::default());
    let workflow = workflow_with(auth.clone());

    assert_eq!(workflow.resend().await, ResendOutcome::Sent);
    sleep(Duration::from_millis(5_500)).await;

    assert_eq!(workflow.resend().await, ResendOutcome::Ignored);
    assert_eq!(auth.resend_calls().len(), 1);
    assert_eq!(workflow.view().await.countdown.remaining, 55);
}

#[tokio::test(start_paused = true)]
async fn resend_becomes_available_once_countdown_reaches_zero() {
    let auth = Arc::new(FakeAuth::default());
    let workflow = workflow_with(auth.clone());

    workflow.resend().await;
    sleep(Duration::from_millis(60_500)).await;

    let view = workflow.view().await;
    assert_eq!(view.countdown, CountdownState::idle(0));
    assert!(view.resend_enabled);
    assert_eq!(view.resend_label, "Resend code");

    assert_eq!(workflow.resend().await, ResendOutcome::Sent);
    assert_eq!(workflow.view().await.countdown.remaining, 60);
    assert_eq!(auth.resend_calls().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn failed_resend_surfaces_error_and_cancels_countdown() {
    let auth = Arc::new(FakeAuth::failing_resend("Attempt limit exceeded"));
    let workflow = workflow_with(auth.clone());

    assert_eq!(
        workflow.resend().await,
        ResendOutcome::Failed("Attempt limit exceeded".into())
    );

    let view = workflow.view().await;
    assert!(!view.countdown.active);
    assert!(view.resend_enabled);
    assert_eq!(view.alert.as_deref(), Some("Attempt limit exceeded"));
}

#[tokio::test(start_paused = true)]
async fn outstanding_confirm_disables_submit_and_resend() {
    let gate = Arc::new(Notify::new());
    let auth = Arc::new(FakeAuth::gated(gate.clone()));
    let workflow = workflow_with(auth.clone());
    workflow.enter_code("123456").await;

    let pending = tokio::spawn({
        let workflow = Arc::clone(&workflow);
        async move { workflow.submit().await }
    });
    settle().await;

    let view = workflow.view().await;
    assert_eq!(view.phase, FormPhase::Submitting);
    assert!(!view.submit_enabled);
    assert!(!view.resend_enabled);
    assert_eq!(view.submit_label, SUBMIT_BUSY_LABEL);
    assert!(workflow.context().snapshot().loading);

    assert_eq!(workflow.resend().await, ResendOutcome::Ignored);
    assert_eq!(workflow.submit().await, SubmitOutcome::Ignored);
    assert!(auth.resend_calls().is_empty());

    gate.notify_one();
    assert_eq!(pending.await.expect("join"), SubmitOutcome::Confirmed);
    assert_eq!(auth.confirm_calls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn countdown_starts_before_slow_resend_resolves() {
    let gate = Arc::new(Notify::new());
    let auth = Arc::new(FakeAuth::gated(gate.clone()));
    let workflow = workflow_with(auth.clone());

    let pending = tokio::spawn({
        let workflow = Arc::clone(&workflow);
        async move { workflow.resend().await }
    });
    settle().await;

    let view = workflow.view().await;
    assert!(view.countdown.active);
    assert!(!view.resend_enabled);
    assert!(!view.submit_enabled);
    assert_eq!(workflow.resend().await, ResendOutcome::Ignored);

    gate.notify_one();
    assert_eq!(pending.await.expect("join"), ResendOutcome::Sent);
    assert!(workflow.view().await.submit_enabled);
}

#[tokio::test(start_paused = true)]
async fn dispose_discards_in_flight_result_and_stops_countdown() {
    let gate = Arc::new(Notify::new());
    let auth = Arc::new(FakeAuth::gated(gate.clone()));
    let workflow = workflow_with(auth.clone());
    workflow.enter_code("123456").await;

    let pending = tokio::spawn({
        let workflow = Arc::clone(&workflow);
        async move { workflow.submit().await }
    });
    settle().await;

    workflow.dispose().await;
    gate.notify_one();
    assert_eq!(pending.await.expect("join"), SubmitOutcome::Discarded);

    let view = workflow.view().await;
    assert_ne!(view.phase, FormPhase::Done);
    assert_eq!(view.slots, [None; OTP_LENGTH]);
    assert!(!workflow.context().snapshot().loading);
    assert_eq!(workflow.submit().await, SubmitOutcome::Ignored);
    assert_eq!(workflow.resend().await, ResendOutcome::Ignored);
}

#[tokio::test(start_paused = true)]
async fn resend_resolving_after_dispose_leaves_form_untouched() {
    let gate = Arc::new(Notify::new());
    let auth = Arc::new(FakeAuth::gated(gate.clone()));
    let workflow = workflow_with(auth.clone());

    let pending = tokio::spawn({
        let workflow = Arc::clone(&workflow);
        async move { workflow.resend().await }
    });
    settle().await;
    sleep(Duration::from_millis(1_500)).await;

    workflow.dispose().await;
    gate.notify_one();
    assert_eq!(pending.await.expect("join"), ResendOutcome::Discarded);

    sleep(Duration::from_secs(5)).await;
    let view = workflow.view().await;
    assert_eq!(view.countdown, CountdownState::idle(59));
    assert_eq!(view.phase, FormPhase::Idle);
    assert!(!workflow.context().snapshot().loading);
    assert_eq!(workflow.resend().await, ResendOutcome::Ignored);
    assert_eq!(auth.resend_calls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn dispose_cancels_running_countdown() {
    let workflow = workflow_with(Arc::new(FakeAuth::default()));
    workflow.resend().await;
    sleep(Duration::from_millis(2_500)).await;

    workflow.dispose().await;
    sleep(Duration::from_secs(10)).await;

    assert_eq!(workflow.view().await.countdown, CountdownState::idle(58));
}

#[tokio::test(start_paused = true)]
async fn description_names_the_email() {
    let workflow = workflow_with(Arc::new(FakeAuth::default()));
    assert_eq!(
        workflow.view().await.description,
        "Please enter the verification code sent to user@example.com."
    );
}
